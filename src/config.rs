use std::env;

use anyhow::{Context, Result};
use dotenvy::dotenv;

/// Site owner shown as the feed author.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub email: Option<String>,
}

/// Site configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub title: String,
    pub description: String,
    pub link: String,
    pub lang: String,
    pub profile: Profile,
    pub notion_page_id: String,
    pub port: u16,
}

impl SiteConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            title: env::var("SITE_TITLE").unwrap_or_else(|_| "notion-blog".to_string()),
            description: env::var("SITE_DESCRIPTION")
                .unwrap_or_else(|_| "A personal blog".to_string()),
            link: env::var("SITE_LINK").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            lang: env::var("SITE_LANG").unwrap_or_else(|_| "en-US".to_string()),
            profile: Profile {
                name: env::var("AUTHOR_NAME").unwrap_or_else(|_| "Anonymous".to_string()),
                email: env::var("AUTHOR_EMAIL").ok(),
            },
            notion_page_id: env::var("NOTION_PAGE_ID")
                .context("NOTION_PAGE_ID must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
        })
    }
}
