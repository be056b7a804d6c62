//! In-memory Notion workspace shared by the integration tests.
#![allow(dead_code)]

use std::{collections::HashMap, num::NonZeroUsize, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::{Value, json};

use notion_blog::{
    application::{
        posts::{PostService, PostServiceConfig},
        source::{NotionSource, SourceError},
    },
    config::SiteSettings,
    infra::http::{HttpState, build_router},
};

pub const DATABASE_ID: &str = "db";

#[derive(Default)]
pub struct Workspace {
    pages: Vec<Value>,
    children: HashMap<String, Vec<Value>>,
    failing: Vec<String>,
    query_fails: bool,
}

impl Workspace {
    pub fn page(mut self, page: Value) -> Self {
        self.pages.push(page);
        self
    }

    pub fn children(mut self, parent: &str, blocks: Vec<Value>) -> Self {
        self.children.insert(parent.to_string(), blocks);
        self
    }

    pub fn failing(mut self, block_id: &str) -> Self {
        self.failing.push(block_id.to_string());
        self
    }

    pub fn query_fails(mut self) -> Self {
        self.query_fails = true;
        self
    }

    pub fn router(self) -> axum::Router {
        let posts = PostService::new(
            Arc::new(self),
            PostServiceConfig {
                database_id: DATABASE_ID.to_string(),
                list_ttl: Duration::ZERO,
                post_capacity: NonZeroUsize::new(8).expect("non-zero"),
                log_schema: false,
            },
        );
        let site = SiteSettings {
            title: "Tech Blog".to_string(),
            description: "Notes on software".to_string(),
        };
        build_router(HttpState::new(Arc::new(posts), site))
    }
}

#[async_trait]
impl NotionSource for Workspace {
    async fn query_all_pages(&self, database_id: &str) -> Result<Vec<Value>, SourceError> {
        assert_eq!(database_id, DATABASE_ID);
        if self.query_fails {
            return Err(SourceError::Upstream {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(self.pages.clone())
    }

    async fn list_child_blocks(&self, block_id: &str) -> Result<Vec<Value>, SourceError> {
        if self.failing.iter().any(|failing| failing == block_id) {
            return Err(SourceError::Transport(format!("{block_id} timed out")));
        }
        Ok(self.children.get(block_id).cloned().unwrap_or_default())
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<Value, SourceError> {
        self.pages
            .iter()
            .find(|page| page["id"] == page_id)
            .cloned()
            .ok_or(SourceError::NotFound)
    }
}

pub fn page(id: &str, title: &str, created: &str, extra: Value) -> Value {
    let mut properties = json!({
        "Title": {"type": "title", "title": [{"plain_text": title}]},
    });
    if let (Some(target), Some(extra)) = (properties.as_object_mut(), extra.as_object()) {
        target.extend(extra.clone());
    }
    json!({
        "object": "page",
        "id": id,
        "created_time": created,
        "last_edited_time": created,
        "properties": properties,
    })
}

pub fn checkbox(value: bool) -> Value {
    json!({"type": "checkbox", "checkbox": value})
}

pub fn tags(names: &[&str]) -> Value {
    let options: Vec<Value> = names.iter().map(|name| json!({"name": name})).collect();
    json!({"type": "multi_select", "multi_select": options})
}

pub fn paragraph(id: &str, text: &str) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": "paragraph",
        "has_children": false,
        "paragraph": {"rich_text": [{"plain_text": text, "annotations": {}}]}
    })
}

pub fn table(id: &str) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": "table",
        "has_children": true,
        "table": {"table_width": 2, "has_column_header": true, "has_row_header": false}
    })
}

pub fn table_row(id: &str, cells: [&str; 2]) -> Value {
    let cells: Vec<Value> = cells
        .iter()
        .map(|cell| json!([{"plain_text": cell}]))
        .collect();
    json!({
        "object": "block",
        "id": id,
        "type": "table_row",
        "table_row": {"cells": cells}
    })
}

pub fn toggle(id: &str, text: &str) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": "toggle",
        "has_children": true,
        "toggle": {"rich_text": [{"plain_text": text}]}
    })
}

/// Three posts: a published Korean-titled post with a table, an unpublished
/// draft, and a featured post with an explicit slug.
pub fn blog() -> Workspace {
    Workspace::default()
        .page(page(
            "p1",
            "Rust 시작하기",
            "2024-03-01T09:00:00.000Z",
            json!({
                "Published": checkbox(true),
                "MainTags": tags(&["backend"]),
                "SubTags": tags(&["Rust"]),
            }),
        ))
        .page(page(
            "p2",
            "Draft post",
            "2024-04-01T09:00:00.000Z",
            json!({ "Releasable": checkbox(true) }),
        ))
        .page(page(
            "p3",
            "Featured",
            "2024-02-01T09:00:00.000Z",
            json!({
                "Featured": checkbox(true),
                "Slug": {"type": "rich_text", "rich_text": [{"plain_text": "featured-one"}]},
                "MainTags": tags(&["frontend"]),
            }),
        ))
        .children(
            "p1",
            vec![paragraph("b1", "Hello from Notion"), table("t1"), toggle("tg", "More")],
        )
        .children(
            "t1",
            vec![
                table_row("r1", ["Name", "Value"]),
                table_row("r2", ["edition", "2024"]),
            ],
        )
        .children("tg", vec![paragraph("b2", "Hidden detail")])
        .children("p3", vec![paragraph("b3", "Featured body")])
}
