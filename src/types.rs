use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::retry::RetryableError;

/// Everything the upstream returns for one page tree, keyed by opaque ids.
/// Any of the maps may be missing from a given response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordMap {
    #[serde(default)]
    pub block: HashMap<String, BlockRecord>,
    #[serde(default)]
    pub collection: HashMap<String, CollectionRecord>,
    #[serde(default)]
    pub collection_view: HashMap<String, Value>,
    #[serde(default)]
    pub notion_user: HashMap<String, Value>,
    #[serde(default)]
    pub collection_query: HashMap<String, HashMap<String, CollectionQueryResult>>,
}

impl RecordMap {
    pub fn merge(&mut self, other: RecordMap) {
        self.block.extend(other.block);
        self.collection.extend(other.collection);
        self.collection_view.extend(other.collection_view);
        self.notion_user.extend(other.notion_user);
        for (collection_id, views) in other.collection_query {
            self.collection_query
                .entry(collection_id)
                .or_default()
                .extend(views);
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockRecord {
    pub value: Option<Block>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub properties: HashMap<String, Value>, // raw decoration lists, typed per schema
    #[serde(default)]
    pub view_ids: Vec<String>,
    pub collection_id: Option<String>,
    pub created_time: Option<i64>,
    pub format: Option<BlockFormat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockFormat {
    pub page_full_width: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionRecord {
    pub value: Option<Collection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    pub id: String,
    #[serde(default)]
    pub schema: Schema,
}

/// Property key -> {display name, declared type}, immutable per fetch.
pub type Schema = HashMap<String, SchemaEntry>;

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionQueryResult {
    pub collection_group_results: Option<GroupResults>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupResults {
    #[serde(rename = "blockIds", default)]
    pub block_ids: Vec<String>,
}

/// Raw user record as the upstream stores it.
#[derive(Debug, Clone, Deserialize)]
pub struct NotionUser {
    pub id: Option<String>,
    pub name: Option<String>,
    pub family_name: Option<String>,
    pub given_name: Option<String>,
    pub profile_photo: Option<String>,
}

/// Resolved author reference carried by person-typed properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: Option<String>,
    pub name: Option<String>,
    pub profile_photo: Option<String>,
}

/// Structured date range with the upstream discriminator stripped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDate {
    pub start_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Closed set of property types the extractor understands. `Unknown` covers
/// properties the schema does not describe; any other declared type outside
/// the special set extracts as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Text,
    Date,
    Select,
    MultiSelect,
    Person,
    File,
    Unknown,
}

impl PropertyKind {
    pub fn from_type(declared: &str) -> Self {
        match declared {
            "date" => PropertyKind::Date,
            "select" => PropertyKind::Select,
            "multi_select" => PropertyKind::MultiSelect,
            "person" => PropertyKind::Person,
            "file" => PropertyKind::File,
            "" => PropertyKind::Unknown,
            _ => PropertyKind::Text,
        }
    }
}

/// Normalized value stored under a property's display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Date(PostDate),
    List(Vec<String>),
    People(Vec<Author>),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&PostDate> {
        match self {
            PropertyValue::Date(date) => Some(date),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_people(&self) -> Option<&[Author]> {
        match self {
            PropertyValue::People(people) => Some(people),
            _ => None,
        }
    }
}

/// Flat extraction result for one page: display names mapped to normalized
/// values, plus the page id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageProperties {
    pub id: String,
    #[serde(flatten)]
    pub properties: BTreeMap<String, PropertyValue>,
}

/// A fully decorated post: extracted properties plus the injected creation
/// timestamp and layout flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(flatten)]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(rename = "createdTime")]
    pub created_time: String,
    #[serde(rename = "fullWidth")]
    pub full_width: bool,
}

impl Post {
    fn text_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key)?.as_text()
    }

    fn first_of(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)?
            .as_list()?
            .first()
            .map(String::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.text_property("title")
    }

    pub fn slug(&self) -> Option<&str> {
        self.text_property("slug")
    }

    pub fn summary(&self) -> Option<&str> {
        self.text_property("summary")
    }

    pub fn status(&self) -> Option<&str> {
        self.first_of("status")
    }

    pub fn post_type(&self) -> Option<&str> {
        self.first_of("type")
    }

    pub fn tags(&self) -> &[String] {
        self.properties
            .get("tags")
            .and_then(PropertyValue::as_list)
            .unwrap_or(&[])
    }

    pub fn date(&self) -> Option<&PostDate> {
        self.properties.get("date")?.as_date()
    }

    pub fn authors(&self) -> &[Author] {
        self.properties
            .get("author")
            .and_then(PropertyValue::as_people)
            .unwrap_or(&[])
    }

    /// The date posts sort and publish by: the structured date's start when
    /// present and well formed, otherwise the injected creation timestamp.
    pub fn effective_date(&self) -> DateTime<Utc> {
        if let Some(date) = self.date() {
            if let Ok(day) = NaiveDate::parse_from_str(&date.start_date, "%Y-%m-%d") {
                if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
                    return Utc.from_utc_datetime(&midnight);
                }
            }
        }
        self.created_time
            .parse::<DateTime<Utc>>()
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// Normalizes a page id (hyphenated or compact hex) to canonical UUID form.
pub fn canonical_id(id: &str) -> Result<String> {
    let compact: String = id.chars().filter(|c| *c != '-').collect();
    let uuid =
        Uuid::parse_str(&compact).map_err(|_| BlogError::InvalidPageId(id.to_string()))?;
    Ok(uuid.hyphenated().to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum BlogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {status}")]
    UpstreamStatus { status: u16 },

    #[error("Invalid page id: {0}")]
    InvalidPageId(String),

    #[error("Block missing from record map: {id}")]
    MissingBlock { id: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RetryableError for BlogError {
    fn is_rate_limit(&self) -> bool {
        match self {
            BlogError::UpstreamStatus { status } => *status == 429,
            BlogError::Http(err) => err.status().map_or(false, |s| s.as_u16() == 429),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BlogError>;
