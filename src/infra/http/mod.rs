pub mod api;
mod middleware;
mod public;

use std::sync::Arc;

use axum::{Router, http::Uri, middleware as axum_middleware};
use percent_encoding::percent_decode_str;

use crate::{
    application::{chrome::ChromeService, posts::PostService},
    config::SiteSettings,
};

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub posts: Arc<PostService>,
    pub chrome: Arc<ChromeService>,
}

impl HttpState {
    pub fn new(posts: Arc<PostService>, site: SiteSettings) -> Self {
        let chrome = Arc::new(ChromeService::new(Arc::clone(&posts), site));
        Self { posts, chrome }
    }
}

/// Public pages and the JSON API behind the shared request-context and
/// response-logging layers.
pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .merge(api::build_api_router())
        .merge(public::build_public_router())
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

/// Last path segment exactly as the client sent it. Handlers read slugs
/// from here instead of `Path`, whose extractor rejects segments that do not
/// decode to UTF-8 before the handler runs.
pub fn raw_segment(uri: &Uri) -> &str {
    uri.path().rsplit('/').next().unwrap_or_default()
}

/// One percent-decoding pass; a segment that does not decode to UTF-8 is
/// used as given.
pub fn decode_segment(segment: &str) -> String {
    if !segment.contains('%') {
        return segment.to_string();
    }
    match percent_decode_str(segment).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(err) => {
            tracing::warn!(
                target = "notion_blog::http::slug",
                segment,
                error = %err,
                "path segment could not be percent-decoded; using it as given"
            );
            segment.to_string()
        }
    }
}

/// Slugs that still contain `%` after the first pass were encoded twice
/// upstream and get one more.
pub fn decode_slug(segment: &str) -> String {
    let once = decode_segment(segment);
    if once.contains('%') {
        decode_segment(&once)
    } else {
        once
    }
}
