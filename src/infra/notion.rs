//! HTTP client for the Notion REST API.

use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, Method, StatusCode, Url, header};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    application::source::{NotionSource, SourceError},
    config::NotionSettings,
};

use super::error::InfraError;

pub const METRIC_NOTION_REQUESTS: &str = "notion_requests_total";
pub const METRIC_NOTION_REQUEST_FAILURES: &str = "notion_request_failures_total";
pub const METRIC_NOTION_REQUEST_MS: &str = "notion_request_ms";

const PAGE_SIZE: u32 = 100;

/// Knobs for cursor handling, lifted from [`NotionSettings`].
#[derive(Debug, Clone, Copy)]
pub struct PaginationPolicy {
    pub follow: bool,
    pub max_pages: u32,
}

impl PaginationPolicy {
    fn allows_another(&self, fetched: u32) -> bool {
        self.follow && fetched < self.max_pages
    }
}

/// Notion client authenticated with an integration token.
#[derive(Clone)]
pub struct NotionClient {
    client: Client,
    base: Url,
    token: String,
    version: String,
    pagination: PaginationPolicy,
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("base", &self.base.as_str())
            .field("version", &self.version)
            .field("pagination", &self.pagination)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ListPage {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

impl ListPage {
    fn continuation(&self) -> Option<&str> {
        if self.has_more {
            self.next_cursor.as_deref().filter(|cursor| !cursor.is_empty())
        } else {
            None
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl NotionClient {
    pub fn new(token: &str, settings: &NotionSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| InfraError::http(format!("failed to build Notion client: {err}")))?;

        Ok(Self {
            client,
            base: settings.api_base_url.clone(),
            token: token.to_string(),
            version: settings.api_version.clone(),
            pagination: PaginationPolicy {
                follow: settings.follow_pagination,
                max_pages: settings.max_pages.get(),
            },
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("notion-blog/", env!("CARGO_PKG_VERSION"))
    }

    /// Resolve `segments` under the API base; each segment is percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::transport("Notion base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        endpoint: &'static str,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<Value, SourceError> {
        counter!(METRIC_NOTION_REQUESTS, "endpoint" => endpoint).increment(1);
        let started = Instant::now();

        let result = self.send_inner(method, url, body).await;

        histogram!(METRIC_NOTION_REQUEST_MS, "endpoint" => endpoint)
            .record(started.elapsed().as_secs_f64() * 1000.0);
        if let Err(err) = &result
            && !matches!(err, SourceError::NotFound)
        {
            counter!(METRIC_NOTION_REQUEST_FAILURES, "endpoint" => endpoint).increment(1);
            tracing::warn!(
                target = "notion_blog::infra::notion",
                endpoint,
                error = %err,
                "Notion request failed"
            );
        }
        result
    }

    async fn send_inner(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<Value, SourceError> {
        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Notion-Version", self.version.as_str())
            .header(header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(SourceError::transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(SourceError::transport)?;

        if !status.is_success() {
            return Err(status_error(status, &bytes));
        }

        serde_json::from_slice(&bytes).map_err(SourceError::decode)
    }

    /// Drain a cursor-paginated list endpoint. `fetch` receives the cursor
    /// for the next page, `None` for the first.
    async fn collect_pages<'a, F, Fut>(
        &'a self,
        what: &'static str,
        mut fetch: F,
    ) -> Result<Vec<Value>, SourceError>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: std::future::Future<Output = Result<Value, SourceError>> + 'a,
    {
        let mut results = Vec::new();
        let mut cursor: Option<String> = None;
        let mut fetched = 0_u32;

        loop {
            let payload = fetch(cursor.take()).await?;
            let page: ListPage = serde_json::from_value(payload).map_err(SourceError::decode)?;
            fetched += 1;
            results.extend(page.results.iter().cloned());

            let Some(next) = page.continuation() else {
                break;
            };
            if !self.pagination.allows_another(fetched) {
                if self.pagination.follow {
                    tracing::warn!(
                        target = "notion_blog::infra::notion",
                        what,
                        max_pages = self.pagination.max_pages,
                        "stopped following Notion pagination at the page limit"
                    );
                }
                break;
            }
            cursor = Some(next.to_string());
        }

        Ok(results)
    }
}

fn status_error(status: StatusCode, bytes: &[u8]) -> SourceError {
    if status == StatusCode::NOT_FOUND {
        return SourceError::NotFound;
    }
    let body: ErrorBody = serde_json::from_slice(bytes).unwrap_or_default();
    let message = match (body.code, body.message) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (None, Some(message)) => message,
        (Some(code), None) => code,
        (None, None) => String::from_utf8_lossy(bytes).chars().take(200).collect(),
    };
    SourceError::Upstream {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl NotionSource for NotionClient {
    async fn query_all_pages(&self, database_id: &str) -> Result<Vec<Value>, SourceError> {
        let url = self.endpoint(&["databases", database_id, "query"])?;
        self.collect_pages("database_query", move |cursor| {
            let mut body = json!({ "page_size": PAGE_SIZE });
            if let Some(cursor) = cursor {
                body["start_cursor"] = Value::String(cursor);
            }
            self.send("database_query", Method::POST, url.clone(), Some(body))
        })
        .await
    }

    async fn list_child_blocks(&self, block_id: &str) -> Result<Vec<Value>, SourceError> {
        let base = self.endpoint(&["blocks", block_id, "children"])?;
        self.collect_pages("block_children", move |cursor| {
            let mut url = base.clone();
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("page_size", &PAGE_SIZE.to_string());
                if let Some(cursor) = cursor.as_deref() {
                    query.append_pair("start_cursor", cursor);
                }
            }
            self.send("block_children", Method::GET, url, None)
        })
        .await
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<Value, SourceError> {
        let url = self.endpoint(&["pages", page_id])?;
        self.send("page", Method::GET, url, None).await
    }
}

#[cfg(test)]
mod tests {
    use std::{num::NonZeroU32, time::Duration};

    use super::*;

    fn settings(base: &str, follow: bool, max_pages: u32) -> NotionSettings {
        NotionSettings {
            token: Some("secret".to_string()),
            database_id: Some("db".to_string()),
            api_base_url: Url::parse(base).expect("url"),
            api_version: "2022-06-28".to_string(),
            request_timeout: Duration::from_secs(30),
            follow_pagination: follow,
            max_pages: NonZeroU32::new(max_pages).expect("non-zero"),
            log_schema: false,
        }
    }

    fn client(follow: bool, max_pages: u32) -> NotionClient {
        NotionClient::new("secret", &settings("https://api.notion.com/v1/", follow, max_pages))
            .expect("client")
    }

    #[test]
    fn endpoint_appends_encoded_segments() {
        let client = client(true, 5);
        let url = client
            .endpoint(&["blocks", "abc-123", "children"])
            .expect("url");
        assert_eq!(url.as_str(), "https://api.notion.com/v1/blocks/abc-123/children");

        let url = client.endpoint(&["pages", "../databases"]).expect("url");
        assert_eq!(url.as_str(), "https://api.notion.com/v1/pages/..%2Fdatabases");
    }

    #[test]
    fn continuation_requires_has_more_and_cursor() {
        let page: ListPage = serde_json::from_value(json!({
            "object": "list",
            "results": [{"id": "a"}],
            "has_more": true,
            "next_cursor": "c1"
        }))
        .expect("page");
        assert_eq!(page.continuation(), Some("c1"));

        let page: ListPage =
            serde_json::from_value(json!({"results": [], "has_more": false, "next_cursor": "c2"}))
                .expect("page");
        assert_eq!(page.continuation(), None);

        let page: ListPage =
            serde_json::from_value(json!({"results": [], "has_more": true, "next_cursor": null}))
                .expect("page");
        assert_eq!(page.continuation(), None);
    }

    #[test]
    fn status_errors_map_to_source_errors() {
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, b"{}"),
            SourceError::NotFound
        ));

        let body = br#"{"object":"error","status":401,"code":"unauthorized","message":"API token is invalid."}"#;
        match status_error(StatusCode::UNAUTHORIZED, body) {
            SourceError::Upstream { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "unauthorized: API token is invalid.");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        match status_error(StatusCode::BAD_GATEWAY, b"gateway down") {
            SourceError::Upstream { message, .. } => assert_eq!(message, "gateway down"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn collect_pages_follows_cursors_until_exhausted() {
        let client = client(true, 10);
        let pages = [
            json!({"results": [{"id": "1"}], "has_more": true, "next_cursor": "a"}),
            json!({"results": [{"id": "2"}], "has_more": true, "next_cursor": "b"}),
            json!({"results": [{"id": "3"}], "has_more": false, "next_cursor": null}),
        ];
        let mut seen = Vec::new();

        let results = client
            .collect_pages("test", |cursor| {
                seen.push(cursor.clone());
                let index = seen.len() - 1;
                let page = pages[index].clone();
                async move { Ok(page) }
            })
            .await
            .expect("results");

        assert_eq!(results.len(), 3);
        assert_eq!(
            seen,
            vec![None, Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[tokio::test]
    async fn collect_pages_respects_policy() {
        let page = json!({"results": [{"id": "1"}], "has_more": true, "next_cursor": "more"});

        let single = client(false, 10);
        let mut calls = 0;
        let results = single
            .collect_pages("test", |_| {
                calls += 1;
                let page = page.clone();
                async move { Ok(page) }
            })
            .await
            .expect("results");
        assert_eq!((calls, results.len()), (1, 1));

        let capped = client(true, 3);
        let mut calls = 0;
        let results = capped
            .collect_pages("test", |_| {
                calls += 1;
                let page = page.clone();
                async move { Ok(page) }
            })
            .await
            .expect("results");
        assert_eq!((calls, results.len()), (3, 3));
    }

    #[tokio::test]
    async fn collect_pages_propagates_errors() {
        let client = client(true, 10);
        let err = client
            .collect_pages("test", |_| async {
                Err(SourceError::Upstream {
                    status: 500,
                    message: "boom".to_string(),
                })
            })
            .await
            .expect_err("error");
        assert!(matches!(err, SourceError::Upstream { status: 500, .. }));
    }
}
