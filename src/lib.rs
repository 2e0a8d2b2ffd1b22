pub mod types;
pub mod config;
pub mod retry;
pub mod client;
pub mod collect;
pub mod image;
pub mod properties;
pub mod posts;
pub mod feed;
pub mod server;

pub use types::*;
pub use config::{Profile, SiteConfig};
pub use retry::{retry_delay, with_retry, RetryPolicy, RetryableError};
pub use client::{ClientConfig, NotionApi, NotionClient};
pub use collect::collect_page_ids;
pub use image::map_image_url;
pub use properties::page_properties;
pub use posts::{filter_posts, get_posts, FilterOptions, PostsConfig};
pub use feed::{Feed, FeedFormat, FeedItem};
pub use server::{build_app, AppState};
