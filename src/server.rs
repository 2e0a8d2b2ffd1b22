use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::client::NotionApi;
use crate::config::SiteConfig;
use crate::feed::{Feed, FeedFormat};
use crate::posts::{filter_posts, get_posts, FilterOptions, PostsConfig};
use crate::types::Result;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SiteConfig>,
    pub api: Arc<dyn NotionApi>,
    pub posts: PostsConfig,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub format: Option<String>,
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/api/feed", get(feed_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Serves the site feed in the requested format. Any failure along the way
/// becomes a 500 with a JSON error body, never a truncated document.
async fn feed_handler(State(state): State<AppState>, Query(query): Query<FeedQuery>) -> Response {
    let format = FeedFormat::from_param(query.format.as_deref());
    match generate_feed(&state, format).await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, format.content_type())],
            body,
        )
            .into_response(),
        Err(err) => {
            error!("Feed generation failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to generate feed" })),
            )
                .into_response()
        }
    }
}

async fn generate_feed(state: &AppState, format: FeedFormat) -> Result<String> {
    let posts = get_posts(
        state.api.as_ref(),
        &state.config.notion_page_id,
        &state.posts,
    )
    .await?;
    let visible = filter_posts(&posts, &FilterOptions::default());
    info!("Rendering {} posts as {:?}", visible.len(), format);
    let feed = Feed::from_posts(&state.config, &visible);
    feed.render(format)
}
