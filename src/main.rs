use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notion_blog::{
    build_app, AppState, ClientConfig, NotionApi, NotionClient, PostsConfig, SiteConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,notion_blog=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SiteConfig::from_env().context("Failed to load configuration")?;
    let port = config.port;

    let api: Arc<dyn NotionApi> = Arc::new(NotionClient::new(ClientConfig::default()));
    let state = AppState {
        config: Arc::new(config),
        api,
        posts: PostsConfig::default(),
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
