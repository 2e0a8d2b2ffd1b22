use std::collections::BTreeMap;

use chrono::{Datelike, Utc};
use serde_json::Value;
use tracing::info;

use notion_blog::{types::*, Feed, FeedFormat, Profile, SiteConfig};

fn site_config() -> SiteConfig {
    SiteConfig {
        title: "Example Blog".to_string(),
        description: "Notes from the field".to_string(),
        link: "https://blog.example.com".to_string(),
        lang: "en-US".to_string(),
        profile: Profile {
            name: "Ada Lovelace".to_string(),
            email: Some("ada@example.com".to_string()),
        },
        notion_page_id: "11111111111111111111111111111111".to_string(),
        port: 8080,
    }
}

fn make_post(
    title: &str,
    slug: &str,
    status: &str,
    post_type: &str,
    summary: Option<&str>,
    tags: &[&str],
) -> Post {
    let mut properties = BTreeMap::new();
    properties.insert(
        "title".to_string(),
        PropertyValue::Text(title.to_string()),
    );
    properties.insert("slug".to_string(), PropertyValue::Text(slug.to_string()));
    properties.insert(
        "status".to_string(),
        PropertyValue::List(vec![status.to_string()]),
    );
    properties.insert(
        "type".to_string(),
        PropertyValue::List(vec![post_type.to_string()]),
    );
    if let Some(summary) = summary {
        properties.insert(
            "summary".to_string(),
            PropertyValue::Text(summary.to_string()),
        );
    }
    if !tags.is_empty() {
        properties.insert(
            "tags".to_string(),
            PropertyValue::List(tags.iter().map(|t| t.to_string()).collect()),
        );
    }
    properties.insert(
        "date".to_string(),
        PropertyValue::Date(PostDate {
            start_date: "2024-01-02".to_string(),
            end_date: None,
        }),
    );
    Post {
        id: format!("post-{}", slug),
        properties,
        created_time: "2024-01-01T00:00:00+00:00".to_string(),
        full_width: false,
    }
}

#[tokio::test]
async fn test_feed_keeps_published_posts_only() {
    // Initialize tracing
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    info!("Testing feed item selection");

    let posts = vec![
        make_post(
            "First post",
            "first",
            "Published",
            "Post",
            Some("A short summary"),
            &["rust", "web"],
        ),
        make_post("Hidden draft", "draft", "Draft", "Post", None, &[]),
        make_post("About", "about", "Published", "Page", None, &[]),
        make_post("No slug", "", "Published", "Post", None, &[]),
    ];

    let feed = Feed::from_posts(&site_config(), &posts);

    assert_eq!(feed.items.len(), 1, "Only published posts with a slug");
    assert_eq!(feed.items[0].url, "https://blog.example.com/first");
    assert_eq!(feed.items[0].description, "A short summary");
    assert_eq!(feed.items[0].categories, vec!["rust", "web"]);
    assert!(
        feed.copyright.contains(&Utc::now().year().to_string()),
        "Copyright should carry the current year"
    );
    assert!(feed.copyright.contains("Ada Lovelace"));
}

#[tokio::test]
async fn test_description_falls_back_to_title() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    let posts = vec![make_post(
        "First post",
        "first",
        "Published",
        "Post",
        None,
        &[],
    )];
    let feed = Feed::from_posts(&site_config(), &posts);

    assert_eq!(feed.items[0].description, "First post");
}

#[tokio::test]
async fn test_rss_rendering() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    info!("Testing RSS 2.0 output");

    let posts = vec![make_post(
        "First post",
        "first",
        "Published",
        "Post",
        Some("A short summary"),
        &["rust"],
    )];
    let feed = Feed::from_posts(&site_config(), &posts);
    let body = feed.render(FeedFormat::Rss2)?;

    assert!(body.contains("<rss"), "Missing rss envelope: {}", body);
    assert!(body.contains("<title>Example Blog</title>"));
    assert!(body.contains("<language>en-US</language>"));
    assert!(body.contains("<generator>notion-blog</generator>"));
    assert!(body.contains("<link>https://blog.example.com/first</link>"));
    assert!(body.contains("https://blog.example.com/avatar.svg"));
    assert!(body.contains("A short summary"));
    assert!(
        body.contains("<author>ada@example.com (Ada Lovelace)</author>"),
        "Items should carry the configured author: {}",
        body
    );

    info!("RSS rendering test completed successfully!");
    Ok(())
}

#[tokio::test]
async fn test_rss_item_author_requires_email() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    let mut config = site_config();
    config.profile.email = None;

    let posts = vec![make_post(
        "First post",
        "first",
        "Published",
        "Post",
        None,
        &[],
    )];
    let feed = Feed::from_posts(&config, &posts);
    let body = feed.render(FeedFormat::Rss2)?;

    assert!(
        !body.contains("<author>"),
        "No author element without an email: {}",
        body
    );
    Ok(())
}

#[tokio::test]
async fn test_atom_rendering() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    let posts = vec![make_post(
        "First post",
        "first",
        "Published",
        "Post",
        Some("A short summary"),
        &[],
    )];
    let feed = Feed::from_posts(&site_config(), &posts);
    let body = feed.render(FeedFormat::Atom)?;

    assert!(
        body.contains("http://www.w3.org/2005/Atom"),
        "Missing atom namespace: {}",
        body
    );
    assert!(body.contains("Example Blog"));
    assert!(body.contains("<entry>"));
    assert!(body.contains("https://blog.example.com/first"));
    assert!(body.contains("<name>Ada Lovelace</name>"));
    assert!(body.contains("ada@example.com"));
    Ok(())
}

#[tokio::test]
async fn test_json_rendering() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    let posts = vec![make_post(
        "First post",
        "first",
        "Published",
        "Post",
        Some("A short summary"),
        &["rust"],
    )];
    let feed = Feed::from_posts(&site_config(), &posts);
    let body = feed.render(FeedFormat::Json)?;
    let value: Value = serde_json::from_str(&body)?;

    assert_eq!(value["version"], "https://jsonfeed.org/version/1");
    assert_eq!(value["title"], "Example Blog");
    assert_eq!(value["feed_url"], "https://blog.example.com/api/feed?format=json");
    assert_eq!(value["author"]["name"], "Ada Lovelace");
    assert_eq!(value["items"][0]["url"], "https://blog.example.com/first");
    assert_eq!(value["items"][0]["summary"], "A short summary");
    assert_eq!(value["items"][0]["tags"][0], "rust");
    assert_eq!(
        value["items"][0]["date_modified"],
        "2024-01-02T00:00:00+00:00"
    );
    Ok(())
}

#[test]
fn test_format_parsing_and_content_types() {
    assert_eq!(FeedFormat::from_param(None), FeedFormat::Rss2);
    assert_eq!(FeedFormat::from_param(Some("json")), FeedFormat::Json);
    assert_eq!(FeedFormat::from_param(Some("atom")), FeedFormat::Atom);
    assert_eq!(
        FeedFormat::from_param(Some("weird")),
        FeedFormat::Rss2,
        "Unknown formats fall back to RSS 2.0"
    );

    assert_eq!(FeedFormat::Rss2.content_type(), "application/rss+xml");
    assert_eq!(FeedFormat::Atom.content_type(), "application/atom+xml");
    assert_eq!(FeedFormat::Json.content_type(), "application/json");
}
