mod support;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use support::{Workspace, blog};

async fn get_html(app: &Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn home_lists_featured_and_recent_posts() {
    let app = blog().router();
    let (status, html) = get_html(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<title>Tech Blog</title>"));
    assert!(html.contains("Featured"));
    assert!(html.contains("Rust 시작하기"));
    assert!(!html.contains("Draft post"));
    assert!(html.contains("href=\"/tags/backend\""));
}

#[tokio::test]
async fn post_page_renders_content_server_side() {
    let app = blog().router();
    let (status, html) = get_html(&app, "/posts/rust-%EC%8B%9C%EC%9E%91%ED%95%98%EA%B8%B0").await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Hello from Notion"));
    assert!(html.contains("Hidden detail"));
    // Table rows are fetched before rendering.
    assert!(html.contains("edition"));
    assert!(!html.contains("data-rows-src=\"/api/blocks/t1\""));
}

#[tokio::test]
async fn table_rows_failure_leaves_deferred_placeholder() {
    let app = blog().failing("t1").router();
    let (status, html) = get_html(&app, "/posts/rust-%EC%8B%9C%EC%9E%91%ED%95%98%EA%B8%B0").await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("data-rows-src=\"/api/blocks/t1\""));
    assert!(html.contains("Hello from Notion"));
}

#[tokio::test]
async fn tag_page_filters_posts() {
    let app = blog().router();
    let (status, html) = get_html(&app, "/tags/frontend").await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(">Featured</a>"));
    assert!(!html.contains("Rust 시작하기</a>"));
}

#[tokio::test]
async fn unknown_pages_render_not_found() {
    let app = blog().router();

    let (status, html) = get_html(&app, "/posts/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("Page Not Found"));

    let (status, _) = get_html(&app, "/tags/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, html) = get_html(&app, "/posts/%FF").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("Page Not Found"));

    let (status, _) = get_html(&app, "/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upstream_failure_renders_error_page() {
    let app = Workspace::default().query_fails().router();
    let (status, html) = get_html(&app, "/").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(html.contains("Failed to load content"));
}

#[tokio::test]
async fn health_check_is_empty() {
    let app = Workspace::default().router();
    let (status, body) = get_html(&app, "/_health").await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}
