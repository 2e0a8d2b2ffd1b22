use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::client::NotionApi;
use crate::image::map_image_url;
use crate::types::{
    Author, NotionUser, PageProperties, PostDate, PropertyKind, PropertyValue, RecordMap, Result,
    Schema,
};

/// Extracts one page's properties into normalized values keyed by the
/// schema's display names. Properties the schema does not describe are
/// dropped. Person references are resolved through `api` one by one.
pub async fn page_properties(
    api: &dyn NotionApi,
    record_map: &RecordMap,
    page_id: &str,
    schema: &Schema,
) -> Result<PageProperties> {
    let mut properties = BTreeMap::new();
    let block = match record_map
        .block
        .get(page_id)
        .and_then(|record| record.value.as_ref())
    {
        Some(block) => block,
        None => {
            return Ok(PageProperties {
                id: page_id.to_string(),
                properties,
            })
        }
    };

    for (key, raw) in &block.properties {
        let entry = match schema.get(key) {
            Some(entry) => entry,
            None => continue,
        };
        let value = match PropertyKind::from_type(&entry.kind) {
            PropertyKind::Unknown => None,
            PropertyKind::Text => Some(PropertyValue::Text(text_content(raw))),
            PropertyKind::Date => extract_date(raw),
            PropertyKind::Select | PropertyKind::MultiSelect => extract_selects(raw),
            PropertyKind::File => extract_file(raw, &block.id),
            PropertyKind::Person => {
                Some(PropertyValue::People(resolve_people(api, raw).await?))
            }
        };
        if let Some(value) = value {
            properties.insert(entry.name.clone(), value);
        }
    }

    debug!("Extracted {} properties for page {}", properties.len(), page_id);

    Ok(PageProperties {
        id: page_id.to_string(),
        properties,
    })
}

/// Concatenates the plain-text pieces of a decoration list. Equation and
/// mention placeholders contribute nothing.
fn text_content(raw: &Value) -> String {
    let spans = match raw.as_array() {
        Some(spans) => spans,
        None => return String::new(),
    };
    let mut text = String::new();
    for span in spans {
        if let Some(piece) = span.get(0).and_then(Value::as_str) {
            if piece != "⁍" && piece != "‣" {
                text.push_str(piece);
            }
        }
    }
    text
}

/// Finds the `["d", {...}]` payload anywhere in the decoration tree.
fn find_date(value: &Value) -> Option<&Value> {
    let items = value.as_array()?;
    if items.first().and_then(Value::as_str) == Some("d") {
        return items.get(1);
    }
    items.iter().find_map(find_date)
}

fn extract_date(raw: &Value) -> Option<PropertyValue> {
    let payload = find_date(raw)?;
    serde_json::from_value::<PostDate>(payload.clone())
        .ok()
        .map(PropertyValue::Date)
}

fn extract_selects(raw: &Value) -> Option<PropertyValue> {
    let text = text_content(raw);
    if text.is_empty() {
        return None;
    }
    Some(PropertyValue::List(
        text.split(',').map(str::to_string).collect(),
    ))
}

fn extract_file(raw: &Value, block_id: &str) -> Option<PropertyValue> {
    let url = raw.pointer("/0/1/0/1").and_then(Value::as_str)?;
    if url.is_empty() {
        return None;
    }
    Some(PropertyValue::Text(map_image_url(url, block_id)))
}

/// Resolves each mention in a person decoration list to an author. Mentions
/// with no user id are skipped; mentions whose lookup finds no record still
/// produce an author with every field absent.
async fn resolve_people(api: &dyn NotionApi, raw: &Value) -> Result<Vec<Author>> {
    let spans = match raw.as_array() {
        Some(spans) => spans,
        None => return Ok(Vec::new()),
    };

    let mut authors = Vec::new();
    for item in spans.iter().filter_map(Value::as_array).flatten() {
        let user_id = match item
            .get(0)
            .and_then(|pair| pair.get(1))
            .and_then(Value::as_str)
        {
            Some(id) => id,
            None => continue,
        };
        let author = match api.get_user(user_id).await? {
            Some(user) => Author {
                id: user.id.clone(),
                name: display_name(&user),
                profile_photo: user.profile_photo.clone(),
            },
            None => Author {
                id: None,
                name: None,
                profile_photo: None,
            },
        };
        authors.push(author);
    }
    Ok(authors)
}

/// The record's own name wins, even when empty. Otherwise family and given
/// names concatenate, and a record with neither has no display name.
fn display_name(user: &NotionUser) -> Option<String> {
    if let Some(name) = &user.name {
        return Some(name.clone());
    }
    match (&user.family_name, &user.given_name) {
        (None, None) => None,
        (family, given) => Some(format!(
            "{}{}",
            family.as_deref().unwrap_or(""),
            given.as_deref().unwrap_or("")
        )),
    }
}
