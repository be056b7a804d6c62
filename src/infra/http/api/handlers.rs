use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::Uri;
use serde::{Deserialize, Serialize};

use crate::domain::{blocks::Block, posts::Post};
use crate::infra::http::{HttpState, decode_slug, raw_segment};

use super::error::ApiError;

const MISSING_SLUG: &str = "Slug is required";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostListQuery {
    pub published: Option<String>,
}

impl PostListQuery {
    /// Only the literal `false` lifts the published filter.
    pub fn published_only(&self) -> bool {
        self.published.as_deref() != Some("false")
    }
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub success: bool,
    pub data: Vec<Post>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct PostDetailResponse {
    pub success: bool,
    pub data: Post,
}

pub async fn list_posts(
    State(state): State<HttpState>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<PostListResponse>, ApiError> {
    let posts = state
        .posts
        .list_posts(query.published_only())
        .await
        .map_err(|err| ApiError::posts_failed(&err))?;

    Ok(Json(PostListResponse {
        success: true,
        count: posts.len(),
        data: posts,
    }))
}

pub async fn get_post(
    State(state): State<HttpState>,
    uri: Uri,
) -> Result<Json<PostDetailResponse>, ApiError> {
    let slug = decode_slug(raw_segment(&uri));
    if slug.trim().is_empty() {
        return Err(ApiError::bad_request(MISSING_SLUG));
    }

    match state.posts.find_by_slug(&slug).await {
        Ok(Some(post)) => Ok(Json(PostDetailResponse {
            success: true,
            data: post,
        })),
        Ok(None) => Err(ApiError::post_not_found(&slug)),
        Err(err) => Err(ApiError::posts_failed(&err)),
    }
}

/// `/api/posts/` with nothing after the slash.
pub async fn missing_slug() -> ApiError {
    ApiError::bad_request(MISSING_SLUG)
}

pub async fn table_blocks(
    State(state): State<HttpState>,
    Path(block_id): Path<String>,
) -> Result<Json<Vec<Block>>, ApiError> {
    state
        .posts
        .table_rows(&block_id)
        .await
        .map(Json)
        .map_err(|err| ApiError::blocks_failed(&err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_filter_defaults_on() {
        let query = |value: Option<&str>| PostListQuery {
            published: value.map(str::to_string),
        };
        assert!(query(None).published_only());
        assert!(query(Some("true")).published_only());
        assert!(query(Some("False")).published_only());
        assert!(query(Some("0")).published_only());
        assert!(!query(Some("false")).published_only());
    }
}
