use axum::{
    Router,
    extract::State,
    http::{StatusCode, Uri},
    response::Response,
    routing::get,
};

use crate::{
    application::{error::HttpError, posts::PostError},
    domain::{posts::Post, tags::TagKind},
    presentation::views::{
        IndexTemplate, IndexView, LayoutChrome, LayoutContext, PostCard, PostDetailView,
        PostListTemplate, PostListView, PostTemplate, TagBadge, render_error_response,
        render_not_found_response, render_template_response,
    },
};

use super::{HttpState, decode_segment, decode_slug, raw_segment};

const RECENT_POSTS: usize = 10;

pub fn build_public_router() -> Router<HttpState> {
    Router::new()
        .route("/", get(index))
        .route("/posts", get(posts_index))
        .route("/posts/{slug}", get(post_detail))
        .route("/tags/{tag}", get(tag_index))
        .route("/_health", get(health))
        .fallback(fallback)
}

/// Chrome for a page, or the finished error response when Notion is down.
async fn load_chrome(state: &HttpState) -> Result<LayoutChrome, Response> {
    state
        .chrome
        .load()
        .await
        .map_err(|err| render_error_response(state.chrome.fallback(), err))
}

fn post_error_response(chrome: LayoutChrome, err: PostError) -> Response {
    render_error_response(chrome, HttpError::from(err))
}

async fn index(State(state): State<HttpState>) -> Response {
    let chrome = match load_chrome(&state).await {
        Ok(chrome) => chrome,
        Err(response) => return response,
    };

    match state.posts.list_posts(true).await {
        Ok(posts) => {
            let view = LayoutContext::new(chrome, index_view(&posts));
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => post_error_response(chrome, err),
    }
}

fn index_view(posts: &[Post]) -> IndexView {
    IndexView {
        featured: posts
            .iter()
            .filter(|post| post.is_featured)
            .map(PostCard::from)
            .collect(),
        recent: posts.iter().take(RECENT_POSTS).map(PostCard::from).collect(),
    }
}

async fn posts_index(State(state): State<HttpState>) -> Response {
    let chrome = match load_chrome(&state).await {
        Ok(chrome) => chrome,
        Err(response) => return response,
    };

    match state.posts.list_posts(true).await {
        Ok(posts) => {
            let meta = chrome.meta.clone().with_content("Posts", None);
            let content = PostListView {
                heading: "All posts".to_string(),
                active_tag: None,
                posts: posts.iter().map(PostCard::from).collect(),
            };
            let view = LayoutContext::new(chrome.with_meta(meta), content);
            render_template_response(PostListTemplate { view }, StatusCode::OK)
        }
        Err(err) => post_error_response(chrome, err),
    }
}

async fn tag_index(State(state): State<HttpState>, uri: Uri) -> Response {
    let tag = decode_segment(raw_segment(&uri));
    let chrome = match load_chrome(&state).await {
        Ok(chrome) => chrome,
        Err(response) => return response,
    };

    let posts = match state.posts.posts_tagged(&tag).await {
        Ok(posts) => posts,
        Err(err) => return post_error_response(chrome, err),
    };
    if posts.is_empty() {
        return render_not_found_response(chrome);
    }

    let kind = if posts
        .iter()
        .any(|post| post.main_tags.iter().any(|main| main.eq_ignore_ascii_case(&tag)))
    {
        TagKind::Main
    } else {
        TagKind::Sub
    };
    let meta = chrome
        .meta
        .clone()
        .with_content(&format!("#{tag}"), None);
    let content = PostListView {
        heading: format!("Posts tagged “{tag}”"),
        active_tag: Some(TagBadge::new(kind, &tag).with_count(posts.len())),
        posts: posts.iter().map(PostCard::from).collect(),
    };
    let view = LayoutContext::new(chrome.with_meta(meta), content);
    render_template_response(PostListTemplate { view }, StatusCode::OK)
}

async fn post_detail(State(state): State<HttpState>, uri: Uri) -> Response {
    let chrome = match load_chrome(&state).await {
        Ok(chrome) => chrome,
        Err(response) => return response,
    };

    let slug = decode_slug(raw_segment(&uri));
    if slug.trim().is_empty() {
        return render_not_found_response(chrome);
    }

    match state.posts.find_by_slug(&slug).await {
        Ok(Some(post)) => {
            let content_html = state.posts.render_content(&post).await;
            let meta = chrome
                .meta
                .clone()
                .with_content(&post.title, post.summary.as_deref());
            let view = LayoutContext::new(
                chrome.with_meta(meta),
                PostDetailView::new(&post, content_html),
            );
            render_template_response(PostTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(chrome),
        Err(err) => post_error_response(chrome, err),
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fallback(State(state): State<HttpState>) -> Response {
    let chrome = state
        .chrome
        .load()
        .await
        .unwrap_or_else(|_| state.chrome.fallback());
    render_not_found_response(chrome)
}
