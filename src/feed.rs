use atom_syndication::{
    Category as AtomCategory, Entry, Feed as AtomFeed, Generator, Link, Person, Text,
};
use chrono::{DateTime, Datelike, Utc};
use rss::{CategoryBuilder, ChannelBuilder, GuidBuilder, ImageBuilder, ItemBuilder};
use serde::Serialize;

use crate::config::SiteConfig;
use crate::types::{Post, Result};

const GENERATOR: &str = "notion-blog";
const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1";

/// Output flavors of the feed endpoint. Anything unrecognized in the query
/// parameter, including its absence, falls back to RSS 2.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss2,
    Atom,
    Json,
}

impl FeedFormat {
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("json") => FeedFormat::Json,
            Some("atom") => FeedFormat::Atom,
            _ => FeedFormat::Rss2,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FeedFormat::Rss2 => "application/rss+xml",
            FeedFormat::Atom => "application/atom+xml",
            FeedFormat::Json => "application/json",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub url: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub categories: Vec<String>,
}

/// Channel metadata plus the publishable items, ready to render in any
/// supported format.
#[derive(Debug, Clone)]
pub struct Feed {
    pub title: String,
    pub description: String,
    pub link: String,
    pub language: String,
    pub image: String,
    pub favicon: String,
    pub copyright: String,
    pub author_name: String,
    pub author_email: Option<String>,
    pub items: Vec<FeedItem>,
}

impl Feed {
    /// Builds the channel from site metadata and keeps only published posts
    /// of type Post that carry a slug.
    pub fn from_posts(config: &SiteConfig, posts: &[Post]) -> Feed {
        let mut items = Vec::new();
        for post in posts {
            if post.status() != Some("Published") || post.post_type() != Some("Post") {
                continue;
            }
            let slug = match post.slug() {
                Some(slug) if !slug.is_empty() => slug,
                _ => continue,
            };
            let title = post.title().unwrap_or("").to_string();
            let description = match post.summary() {
                Some(summary) if !summary.is_empty() => summary.to_string(),
                _ => title.clone(),
            };
            items.push(FeedItem {
                title,
                url: format!("{}/{}", config.link, slug),
                description,
                date: post.effective_date(),
                categories: post.tags().to_vec(),
            });
        }

        Feed {
            title: config.title.clone(),
            description: config.description.clone(),
            link: config.link.clone(),
            language: config.lang.clone(),
            image: format!("{}/avatar.svg", config.link),
            favicon: format!("{}/favicon.ico", config.link),
            copyright: format!(
                "All rights reserved {}, {}",
                Utc::now().year(),
                config.profile.name
            ),
            author_name: config.profile.name.clone(),
            author_email: config.profile.email.clone(),
            items,
        }
    }

    pub fn render(&self, format: FeedFormat) -> Result<String> {
        match format {
            FeedFormat::Rss2 => Ok(self.to_rss2()),
            FeedFormat::Atom => Ok(self.to_atom()),
            FeedFormat::Json => self.to_json(),
        }
    }

    fn to_rss2(&self) -> String {
        // RSS carries author identity per item, as "email (name)", and only
        // when an email is configured.
        let author = self
            .author_email
            .as_ref()
            .map(|email| format!("{} ({})", email, self.author_name));
        let items: Vec<rss::Item> = self
            .items
            .iter()
            .map(|item| {
                let categories: Vec<rss::Category> = item
                    .categories
                    .iter()
                    .map(|tag| CategoryBuilder::default().name(tag.clone()).build())
                    .collect();
                ItemBuilder::default()
                    .title(Some(item.title.clone()))
                    .link(Some(item.url.clone()))
                    .guid(Some(
                        GuidBuilder::default()
                            .value(item.url.clone())
                            .permalink(true)
                            .build(),
                    ))
                    .description(Some(item.description.clone()))
                    .author(author.clone())
                    .pub_date(Some(item.date.to_rfc2822()))
                    .categories(categories)
                    .build()
            })
            .collect();

        let image = ImageBuilder::default()
            .url(self.image.clone())
            .title(self.title.clone())
            .link(self.link.clone())
            .build();

        ChannelBuilder::default()
            .title(self.title.clone())
            .link(self.link.clone())
            .description(self.description.clone())
            .language(Some(self.language.clone()))
            .copyright(Some(self.copyright.clone()))
            .generator(Some(GENERATOR.to_string()))
            .image(Some(image))
            .items(items)
            .build()
            .to_string()
    }

    fn to_atom(&self) -> String {
        let entries: Vec<Entry> = self
            .items
            .iter()
            .map(|item| Entry {
                title: Text::plain(item.title.clone()),
                id: item.url.clone(),
                updated: item.date.fixed_offset(),
                links: vec![Link {
                    href: item.url.clone(),
                    rel: "alternate".to_string(),
                    ..Default::default()
                }],
                summary: Some(Text::plain(item.description.clone())),
                categories: item
                    .categories
                    .iter()
                    .map(|tag| AtomCategory {
                        term: tag.clone(),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            })
            .collect();

        let updated = self
            .items
            .iter()
            .map(|item| item.date)
            .max()
            .unwrap_or_else(Utc::now)
            .fixed_offset();

        let feed = AtomFeed {
            title: Text::plain(self.title.clone()),
            id: self.link.clone(),
            updated,
            subtitle: Some(Text::plain(self.description.clone())),
            icon: Some(self.favicon.clone()),
            logo: Some(self.image.clone()),
            rights: Some(Text::plain(self.copyright.clone())),
            generator: Some(Generator {
                value: GENERATOR.to_string(),
                ..Default::default()
            }),
            authors: vec![Person {
                name: self.author_name.clone(),
                email: self.author_email.clone(),
                uri: Some(self.link.clone()),
                ..Default::default()
            }],
            links: vec![
                Link {
                    href: self.link.clone(),
                    rel: "alternate".to_string(),
                    ..Default::default()
                },
                Link {
                    href: format!("{}/api/feed?format=atom", self.link),
                    rel: "self".to_string(),
                    ..Default::default()
                },
            ],
            entries,
            ..Default::default()
        };
        feed.to_string()
    }

    fn to_json(&self) -> Result<String> {
        let feed = JsonFeed {
            version: JSON_FEED_VERSION,
            title: &self.title,
            home_page_url: &self.link,
            feed_url: format!("{}/api/feed?format=json", self.link),
            description: &self.description,
            icon: &self.image,
            favicon: &self.favicon,
            author: JsonAuthor {
                name: &self.author_name,
                url: &self.link,
            },
            items: self
                .items
                .iter()
                .map(|item| JsonItem {
                    id: &item.url,
                    url: &item.url,
                    title: &item.title,
                    summary: &item.description,
                    content_html: &item.description,
                    date_modified: item.date.to_rfc3339(),
                    tags: &item.categories,
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&feed)?)
    }
}

#[derive(Serialize)]
struct JsonFeed<'a> {
    version: &'static str,
    title: &'a str,
    home_page_url: &'a str,
    feed_url: String,
    description: &'a str,
    icon: &'a str,
    favicon: &'a str,
    author: JsonAuthor<'a>,
    items: Vec<JsonItem<'a>>,
}

#[derive(Serialize)]
struct JsonAuthor<'a> {
    name: &'a str,
    url: &'a str,
}

#[derive(Serialize)]
struct JsonItem<'a> {
    id: &'a str,
    url: &'a str,
    title: &'a str,
    summary: &'a str,
    content_html: &'a str,
    date_modified: String,
    tags: &'a [String],
}
