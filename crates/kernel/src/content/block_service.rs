//! Block service.
//!
//! Create, update, delete and reorder the blocks of a document. Positions
//! are sparse: deletes leave gaps, appends go to `max + 1`, and only a
//! reorder rewrites a document's positions to `0..n-1`.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::block::{Block, BlockKind, Content, default_content, validate_content};
use super::store::{BlockPatch, ContentStore, ReorderOutcome};
use crate::error::{ContentError, ContentResult};

/// Partial block update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockUpdate {
    /// Shallow-merged into the existing content.
    #[serde(default)]
    pub content: Option<Content>,

    #[serde(default)]
    pub position: Option<i32>,

    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// Updated block plus advisory notices about values that render clamped.
#[derive(Debug, Clone, Serialize)]
pub struct BlockUpdateOutcome {
    pub block: Block,
    pub notices: Vec<String>,
}

/// Service for a document's blocks.
#[derive(Clone)]
pub struct BlockService {
    store: Arc<dyn ContentStore>,
}

impl BlockService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Blocks of a document in document order.
    pub async fn list_blocks(&self, document_id: Uuid) -> ContentResult<Vec<Block>> {
        self.require_document(document_id).await?;
        Ok(self.store.list_blocks(document_id).await?)
    }

    /// Load a single block.
    pub async fn get_block(&self, block_id: Uuid) -> ContentResult<Block> {
        self.store
            .find_block(block_id)
            .await?
            .ok_or_else(|| ContentError::block_not_found(block_id))
    }

    /// Add a block with its type's default content.
    ///
    /// Without an explicit position the block is appended after the current
    /// highest position, or at 0 when the document has no blocks.
    pub async fn add_block(
        &self,
        document_id: Uuid,
        kind: BlockKind,
        position: Option<i32>,
    ) -> ContentResult<Block> {
        if !kind.is_known() {
            return Err(ContentError::Validation(format!(
                "cannot add block of unknown type '{kind}'"
            )));
        }
        self.require_document(document_id).await?;

        let position = match position {
            Some(position) => position,
            None => match self.store.max_position(document_id).await? {
                Some(max) => max.checked_add(1).ok_or_else(|| {
                    ContentError::Validation("block position overflow".to_string())
                })?,
                None => 0,
            },
        };

        let now = chrono::Utc::now().timestamp();
        let block = Block {
            id: Uuid::now_v7(),
            document_id,
            content: default_content(&kind),
            block_type: kind,
            position,
            parent_id: None,
            seq: 0,
            created: now,
            changed: now,
        };

        let block = self.store.insert_block(&block).await?;

        info!(
            document_id = %document_id,
            block_id = %block.id,
            block_type = %block.block_type,
            position = block.position,
            "block added"
        );
        Ok(block)
    }

    /// Apply a partial update to a block.
    ///
    /// Only the fields present in `update` are written.
    pub async fn update_block(
        &self,
        block_id: Uuid,
        update: BlockUpdate,
    ) -> ContentResult<BlockUpdateOutcome> {
        let patch = BlockPatch {
            content: update.content,
            position: update.position,
            parent_id: update.parent_id,
            changed: chrono::Utc::now().timestamp(),
        };

        let block = self
            .store
            .update_block(block_id, &patch)
            .await?
            .ok_or_else(|| ContentError::block_not_found(block_id))?;

        let notices = validate_content(&block.block_type, &block.content);
        debug!(
            block_id = %block_id,
            notices = notices.len(),
            "block updated"
        );
        Ok(BlockUpdateOutcome { block, notices })
    }

    /// Delete a block. Sibling positions are not renumbered.
    pub async fn delete_block(&self, block_id: Uuid) -> ContentResult<()> {
        if !self.store.delete_block(block_id).await? {
            return Err(ContentError::block_not_found(block_id));
        }
        info!(block_id = %block_id, "block deleted");
        Ok(())
    }

    /// Rewrite positions to `0..n-1` following `ordered`.
    ///
    /// `ordered` must name every block of the document exactly once.
    pub async fn reorder(&self, document_id: Uuid, ordered: &[Uuid]) -> ContentResult<Vec<Block>> {
        self.require_document(document_id).await?;

        let mut seen = HashSet::with_capacity(ordered.len());
        if let Some(duplicate) = ordered.iter().find(|id| !seen.insert(**id)) {
            return Err(ContentError::Validation(format!(
                "block {duplicate} appears more than once in the order"
            )));
        }

        match self.store.reorder_blocks(document_id, ordered).await? {
            ReorderOutcome::Applied => {}
            ReorderOutcome::Mismatch { unknown, .. } if !unknown.is_empty() => {
                return Err(ContentError::NotFound {
                    entity: "block",
                    id: format!("{} (in document {document_id})", unknown[0]),
                });
            }
            ReorderOutcome::Mismatch { missing, .. } => {
                return Err(ContentError::Validation(format!(
                    "order is missing {} block(s) of the document",
                    missing.len()
                )));
            }
        }

        info!(document_id = %document_id, count = ordered.len(), "blocks reordered");
        Ok(self.store.list_blocks(document_id).await?)
    }

    async fn require_document(&self, document_id: Uuid) -> ContentResult<()> {
        match self.store.find_document(document_id).await? {
            Some(_) => Ok(()),
            None => Err(ContentError::document_not_found(document_id)),
        }
    }
}
