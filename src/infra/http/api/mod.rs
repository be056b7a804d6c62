pub mod error;
pub mod handlers;

use axum::{Router, middleware as axum_middleware, routing::get};

use crate::infra::http::HttpState;
use crate::infra::http::middleware::api_cors;

pub fn build_api_router() -> Router<HttpState> {
    Router::new()
        .route("/api/posts", get(handlers::list_posts))
        .route("/api/posts/", get(handlers::missing_slug))
        .route("/api/posts/{slug}", get(handlers::get_post))
        .route("/api/blocks/{block_id}", get(handlers::table_blocks))
        .layer(axum_middleware::from_fn(api_cors))
}
