use std::cmp::Reverse;
use std::time::Duration;

use chrono::{DateTime, Days, TimeZone, Utc};
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::client::NotionApi;
use crate::collect::{collect_page_ids, is_listing};
use crate::properties::page_properties;
use crate::types::{canonical_id, Block, BlogError, Post, RecordMap, Result, Schema};

#[derive(Debug, Clone)]
pub struct PostsConfig {
    /// Member pages hydrated concurrently per batch.
    pub batch_size: usize,
    /// Pause between batches, not after the last one.
    pub batch_pause: Duration,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_pause: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOptions {
    pub accepted_statuses: Vec<String>,
    pub accepted_types: Vec<String>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            accepted_statuses: vec!["Published".to_string()],
            accepted_types: vec!["Post".to_string()],
        }
    }
}

/// Fetches the collection behind `page_id` and hydrates every member page
/// into a post, newest first. A root that is not a collection page yields an
/// empty list.
pub async fn get_posts(
    api: &dyn NotionApi,
    page_id: &str,
    config: &PostsConfig,
) -> Result<Vec<Post>> {
    let root_id = canonical_id(page_id)?;
    let record_map = api.get_page(&root_id).await?;

    let root = match record_map
        .block
        .get(&root_id)
        .and_then(|record| record.value.as_ref())
    {
        Some(block) if is_listing(&block.block_type) => block,
        _ => {
            info!("Page {} is not a collection page, no posts", root_id);
            return Ok(Vec::new());
        }
    };

    let schema = resolve_schema(&record_map, root);
    let page_ids = collect_page_ids(&record_map, &root_id);
    debug!("Collection holds {} member pages", page_ids.len());

    let mut posts = Vec::with_capacity(page_ids.len());
    let mut batches = page_ids.chunks(config.batch_size.max(1)).peekable();
    while let Some(batch) = batches.next() {
        let hydrated = try_join_all(
            batch
                .iter()
                .map(|id| member_post(api, &record_map, id, &schema)),
        )
        .await?;
        posts.extend(hydrated);
        if batches.peek().is_some() {
            tokio::time::sleep(config.batch_pause).await;
        }
    }

    posts.sort_by_cached_key(|post| Reverse(post.effective_date()));
    info!("Aggregated {} posts from page {}", posts.len(), root_id);
    Ok(posts)
}

/// Keeps posts that carry a title and slug, match the accepted status and
/// type, and are not dated past tomorrow's midnight.
pub fn filter_posts(posts: &[Post], options: &FilterOptions) -> Vec<Post> {
    let cutoff = Utc::now()
        .date_naive()
        .checked_add_days(Days::new(1))
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive));

    posts
        .iter()
        .filter(|post| {
            let named = post.title().map_or(false, |title| !title.is_empty())
                && post.slug().map_or(false, |slug| !slug.is_empty());
            if !named {
                return false;
            }
            let status_ok = post.status().map_or(false, |status| {
                options.accepted_statuses.iter().any(|s| s == status)
            });
            let type_ok = post.post_type().map_or(false, |kind| {
                options.accepted_types.iter().any(|t| t == kind)
            });
            if !(status_ok && type_ok) {
                return false;
            }
            cutoff.map_or(true, |cutoff| post.effective_date() <= cutoff)
        })
        .cloned()
        .collect()
}

fn resolve_schema(record_map: &RecordMap, root: &Block) -> Schema {
    root.collection_id
        .as_ref()
        .and_then(|id| record_map.collection.get(id))
        .or_else(|| record_map.collection.values().next())
        .and_then(|record| record.value.as_ref())
        .map(|collection| collection.schema.clone())
        .unwrap_or_default()
}

/// Hydrates one member page: extracted properties plus creation time and the
/// full-width layout flag from the block itself.
async fn member_post(
    api: &dyn NotionApi,
    record_map: &RecordMap,
    page_id: &str,
    schema: &Schema,
) -> Result<Post> {
    let block = record_map
        .block
        .get(page_id)
        .ok_or_else(|| BlogError::MissingBlock {
            id: page_id.to_string(),
        })?
        .value
        .as_ref();

    let page = page_properties(api, record_map, page_id, schema).await?;

    let created_time = block
        .and_then(|b| b.created_time)
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .to_rfc3339();
    let full_width = block
        .and_then(|b| b.format.as_ref())
        .and_then(|format| format.page_full_width)
        .unwrap_or(false);

    Ok(Post {
        id: page.id,
        properties: page.properties,
        created_time,
        full_width,
    })
}
