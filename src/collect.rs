use std::collections::HashSet;

use crate::types::RecordMap;

/// Block types that front a collection and can be walked for member pages.
pub(crate) fn is_listing(block_type: &str) -> bool {
    block_type == "collection_view_page" || block_type == "collection_view"
}

/// Gathers the member page ids of the root page's collection by walking its
/// views in order. Duplicates across views and the root id itself are
/// dropped. Non-collection roots yield nothing.
pub fn collect_page_ids(record_map: &RecordMap, root_id: &str) -> Vec<String> {
    let root = match record_map
        .block
        .get(root_id)
        .and_then(|record| record.value.as_ref())
    {
        Some(block) if is_listing(&block.block_type) => block,
        _ => return Vec::new(),
    };

    let collection_id = root
        .collection_id
        .clone()
        .or_else(|| record_map.collection_query.keys().next().cloned());
    let views = match collection_id.and_then(|id| record_map.collection_query.get(&id)) {
        Some(views) => views,
        None => return Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut page_ids = Vec::new();
    for view_id in &root.view_ids {
        let block_ids = views
            .get(view_id)
            .and_then(|result| result.collection_group_results.as_ref())
            .map(|group| group.block_ids.as_slice())
            .unwrap_or(&[]);
        for block_id in block_ids {
            if block_id != root_id && seen.insert(block_id.clone()) {
                page_ids.push(block_id.clone());
            }
        }
    }
    page_ids
}
