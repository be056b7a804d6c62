//! Recursive block-tree resolution.
//!
//! Container blocks (toggles, callouts, quotes, columns, ...) get their
//! subtrees fetched eagerly so a page renders from one tree. Sibling
//! subtrees are requested concurrently and reassembled in upstream order.
//! A failure below the top level only costs that branch its children.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, join_all};
use metrics::counter;
use tracing::warn;

use crate::{
    application::source::{NotionSource, SourceError},
    domain::blocks::{Block, BlockKind},
};

pub const METRIC_BRANCH_FETCH_FAILURES: &str = "notion_branch_fetch_failures_total";

#[derive(Clone)]
pub struct BlockTreeFetcher {
    source: Arc<dyn NotionSource>,
}

impl BlockTreeFetcher {
    pub fn new(source: Arc<dyn NotionSource>) -> Self {
        Self { source }
    }

    /// Children of `block_id` with container subtrees attached. Only a
    /// failure to list the top level is returned as an error.
    pub async fn fetch_tree(&self, block_id: &str) -> Result<Vec<Block>, SourceError> {
        let children = self.source.list_child_blocks(block_id).await?;
        let blocks = Block::from_values(children);
        Ok(join_all(blocks.into_iter().map(|block| self.fetch_branch(block))).await)
    }

    /// Immediate children of a table block, i.e. its rows.
    pub async fn fetch_table_rows(&self, block_id: &str) -> Result<Vec<Block>, SourceError> {
        let rows = self.source.list_child_blocks(block_id).await?;
        Ok(Block::from_values(rows))
    }

    /// Attach rows to every table in `blocks` that has none yet. Tables whose
    /// rows cannot be fetched are left untouched.
    pub fn hydrate_tables(&self, blocks: Vec<Block>) -> BoxFuture<'_, Vec<Block>> {
        async move { join_all(blocks.into_iter().map(|block| self.hydrate_block(block))).await }
            .boxed()
    }

    fn fetch_branch(&self, block: Block) -> BoxFuture<'_, Block> {
        async move {
            if !block.is_container() {
                return block;
            }

            match self.fetch_tree(&block.id).await {
                Ok(children) => block.with_children(children),
                Err(err) => {
                    record_branch_failure(&block, &err);
                    block
                }
            }
        }
        .boxed()
    }

    async fn hydrate_block(&self, mut block: Block) -> Block {
        if matches!(block.kind, BlockKind::Table(_)) && block.children.is_none() {
            return match self.fetch_table_rows(&block.id).await {
                Ok(rows) => block.with_children(rows),
                Err(err) => {
                    record_branch_failure(&block, &err);
                    block
                }
            };
        }

        if let Some(children) = block.children.take() {
            block.children = Some(self.hydrate_tables(children).await);
        }
        block
    }
}

fn record_branch_failure(block: &Block, err: &SourceError) {
    counter!(METRIC_BRANCH_FETCH_FAILURES).increment(1);
    warn!(
        target = "notion_blog::application::fetcher",
        block_id = %block.id,
        block_type = block.block_type().unwrap_or("unknown"),
        error = %err,
        "failed to fetch block children; rendering without them"
    );
}
