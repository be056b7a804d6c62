//! Boundary to the external document store.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("upstream responded with status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream payload could not be decoded: {0}")]
    Decode(String),
    #[error("object not found upstream")]
    NotFound,
}

impl SourceError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Read-only access to a Notion workspace. Results are raw JSON objects;
/// typing happens in the domain layer.
#[async_trait]
pub trait NotionSource: Send + Sync {
    /// Every page of a database, unfiltered and unsorted.
    async fn query_all_pages(&self, database_id: &str) -> Result<Vec<Value>, SourceError>;

    /// Immediate children of a block or page.
    async fn list_child_blocks(&self, block_id: &str) -> Result<Vec<Value>, SourceError>;

    async fn retrieve_page(&self, page_id: &str) -> Result<Value, SourceError>;
}

/// Source used when no credentials are configured: an empty workspace.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

#[async_trait]
impl NotionSource for EmptySource {
    async fn query_all_pages(&self, _database_id: &str) -> Result<Vec<Value>, SourceError> {
        Ok(Vec::new())
    }

    async fn list_child_blocks(&self, _block_id: &str) -> Result<Vec<Value>, SourceError> {
        Ok(Vec::new())
    }

    async fn retrieve_page(&self, _page_id: &str) -> Result<Value, SourceError> {
        Err(SourceError::NotFound)
    }
}
