use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::collect::is_listing;
use crate::retry::{with_retry, RetryPolicy};
use crate::types::{canonical_id, BlogError, CollectionQueryResult, NotionUser, RecordMap, Result};

const CHUNK_LIMIT: u32 = 100;
const MEMBER_LIMIT: u32 = 9999;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.notion.so/api/v3".to_string(),
            user_agent: "notion-blog/0.1".to_string(),
            timeout_seconds: 30,
            retry: RetryPolicy::default(),
        }
    }
}

/// The two upstream reads the blog needs. Trait object so tests can stand in
/// a canned implementation.
#[async_trait]
pub trait NotionApi: Send + Sync {
    /// Full record map for a page: every content chunk plus the collection
    /// query results for each view of a collection root.
    async fn get_page(&self, page_id: &str) -> Result<RecordMap>;

    /// One user record by id. `Ok(None)` when the upstream has no record.
    async fn get_user(&self, user_id: &str) -> Result<Option<NotionUser>>;
}

pub struct NotionClient {
    client: Client,
    config: ClientConfig,
}

#[derive(Debug, Deserialize)]
struct PageChunk {
    #[serde(rename = "recordMap", default)]
    record_map: RecordMap,
    #[serde(default)]
    cursor: Value,
}

#[derive(Debug, Deserialize)]
struct CollectionQueryResponse {
    result: Option<QueryResult>,
    #[serde(rename = "recordMap", default)]
    record_map: RecordMap,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(rename = "reducerResults")]
    reducer_results: Option<CollectionQueryResult>,
}

impl NotionClient {
    pub fn new(config: ClientConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// POSTs a JSON body to one API endpoint, retrying per the policy.
    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/{}", self.config.api_base, endpoint);
        with_retry(&self.config.retry, || {
            let request = self.client.post(url.as_str()).json(body);
            async move {
                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(BlogError::UpstreamStatus {
                        status: status.as_u16(),
                    });
                }
                let payload = response.json::<Value>().await?;
                Ok(payload)
            }
        })
        .await
    }

    /// Pages through loadPageChunk until the returned cursor stack is empty.
    async fn load_page_chunks(&self, page_id: &str) -> Result<RecordMap> {
        let mut record_map = RecordMap::default();
        let mut cursor = json!({ "stack": [] });
        let mut chunk_number = 0u32;

        loop {
            let body = json!({
                "pageId": page_id,
                "limit": CHUNK_LIMIT,
                "cursor": cursor,
                "chunkNumber": chunk_number,
                "verticalColumns": false,
            });
            let payload = self.post_json("loadPageChunk", &body).await?;
            let chunk: PageChunk = serde_json::from_value(payload)?;
            record_map.merge(chunk.record_map);
            chunk_number += 1;

            let more = chunk
                .cursor
                .get("stack")
                .and_then(Value::as_array)
                .map_or(false, |stack| !stack.is_empty());
            if !more {
                break;
            }
            cursor = chunk.cursor;
        }

        debug!("Loaded {} chunks for page {}", chunk_number, page_id);
        Ok(record_map)
    }

    async fn query_collection(
        &self,
        collection_id: &str,
        view_id: &str,
    ) -> Result<CollectionQueryResponse> {
        let body = json!({
            "collection": { "id": collection_id },
            "collectionView": { "id": view_id },
            "loader": {
                "type": "reducer",
                "reducers": {
                    "collection_group_results": { "type": "results", "limit": MEMBER_LIMIT },
                },
                "sort": [],
                "searchQuery": "",
                "userTimeZone": "UTC",
            },
        });
        let payload = self.post_json("queryCollection", &body).await?;
        Ok(serde_json::from_value(payload)?)
    }
}

#[async_trait]
impl NotionApi for NotionClient {
    async fn get_page(&self, page_id: &str) -> Result<RecordMap> {
        let page_id = canonical_id(page_id)?;
        debug!("Loading page {}", page_id);
        let mut record_map = self.load_page_chunks(&page_id).await?;

        let root = record_map
            .block
            .get(&page_id)
            .and_then(|record| record.value.as_ref())
            .filter(|block| is_listing(&block.block_type));
        let (collection_id, view_ids) = match root {
            Some(block) => {
                let collection_id = block
                    .collection_id
                    .clone()
                    .or_else(|| record_map.collection.keys().next().cloned());
                (collection_id, block.view_ids.clone())
            }
            None => (None, Vec::new()),
        };

        if let Some(collection_id) = collection_id {
            for view_id in view_ids {
                let response = self.query_collection(&collection_id, &view_id).await?;
                if let Some(results) = response.result.and_then(|r| r.reducer_results) {
                    record_map
                        .collection_query
                        .entry(collection_id.clone())
                        .or_default()
                        .insert(view_id, results);
                }
                record_map.merge(response.record_map);
            }
        }

        info!(
            "Loaded page {} ({} blocks)",
            page_id,
            record_map.block.len()
        );
        Ok(record_map)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<NotionUser>> {
        debug!("Resolving user {}", user_id);
        let body = json!({
            "requests": [{ "table": "notion_user", "id": user_id }],
        });
        let payload = self.post_json("getRecordValues", &body).await?;

        let pointer = format!("/recordMapWithRoles/notion_user/{}/value", user_id);
        match payload.pointer(&pointer) {
            Some(Value::Null) | None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }
}
