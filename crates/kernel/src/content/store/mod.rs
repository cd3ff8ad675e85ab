//! Persistence seam for documents and their blocks.
//!
//! All document and block reads/writes go through [`ContentStore`]. Two
//! implementations exist:
//!
//! - [`MemoryContentStore`]: process-local, used by tests and by the server
//!   when no database is configured
//! - [`PgContentStore`]: PostgreSQL via sqlx
//!
//! Stores enforce nothing about positions or defaults; that is
//! `BlockService`'s job. They do guarantee that `reorder_blocks` is applied
//! as one write, and that `insert_block` assigns a strictly increasing `seq`.

mod memory;
mod pg;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub use memory::MemoryContentStore;
pub use pg::PgContentStore;

use crate::content::block::{Block, Content};
use crate::content::document::{Document, DocumentKind};

/// Field-level block write. `None` fields keep whatever is stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockPatch {
    /// Shallow-merged into the stored content.
    pub content: Option<Content>,
    pub position: Option<i32>,
    pub parent_id: Option<Uuid>,
    pub changed: i64,
}

/// Result of a reorder attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Positions were rewritten to `0..n-1`.
    Applied,
    /// The id list did not match the document's blocks; nothing was written.
    Mismatch {
        /// Blocks of the document absent from the list.
        missing: Vec<Uuid>,
        /// Ids in the list that are not blocks of the document.
        unknown: Vec<Uuid>,
    },
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist a new document.
    async fn insert_document(&self, document: &Document) -> Result<()>;

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>>;

    async fn find_document_by_slug(
        &self,
        kind: DocumentKind,
        slug: &str,
    ) -> Result<Option<Document>>;

    /// Overwrite a document's metadata. Returns false if it does not exist.
    async fn update_document(&self, document: &Document) -> Result<bool>;

    /// Slugs of `kind` equal to `base` or of the form `base-<digits>`,
    /// excluding document `exclude`. Every match is returned.
    async fn slugs_with_base(
        &self,
        kind: DocumentKind,
        base: &str,
        exclude: Option<Uuid>,
    ) -> Result<Vec<String>>;

    /// Blocks of a document in document order (position, then seq).
    async fn list_blocks(&self, document_id: Uuid) -> Result<Vec<Block>>;

    async fn find_block(&self, id: Uuid) -> Result<Option<Block>>;

    /// Highest position among a document's blocks, `None` when it has none.
    async fn max_position(&self, document_id: Uuid) -> Result<Option<i32>>;

    /// Persist a new block. The store assigns and returns `seq`.
    async fn insert_block(&self, block: &Block) -> Result<Block>;

    /// Apply `patch` to the stored block in one write and return the result,
    /// `None` if the block does not exist. Fields the patch leaves unset are
    /// never written, so a concurrent reorder survives a content edit.
    async fn update_block(&self, id: Uuid, patch: &BlockPatch) -> Result<Option<Block>>;

    /// Delete a block. Returns false if it did not exist.
    async fn delete_block(&self, id: Uuid) -> Result<bool>;

    /// Rewrite positions to `0..n-1` following `ordered`, in one write.
    ///
    /// `ordered` must contain no duplicates; callers check that first.
    async fn reorder_blocks(&self, document_id: Uuid, ordered: &[Uuid])
    -> Result<ReorderOutcome>;
}

/// Compare an ordered id list with a document's actual block ids.
pub(crate) fn reorder_mismatch(existing: &[Uuid], ordered: &[Uuid]) -> Option<ReorderOutcome> {
    let missing: Vec<Uuid> = existing
        .iter()
        .filter(|id| !ordered.contains(id))
        .copied()
        .collect();
    let unknown: Vec<Uuid> = ordered
        .iter()
        .filter(|id| !existing.contains(id))
        .copied()
        .collect();

    if missing.is_empty() && unknown.is_empty() {
        None
    } else {
        Some(ReorderOutcome::Mismatch { missing, unknown })
    }
}

/// True for `base` itself and for `base-1`, `base-2`, etc.
pub(crate) fn is_numbered_variant(slug: &str, base: &str) -> bool {
    match slug.strip_prefix(base) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('-')
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_variants_of_a_base() {
        assert!(is_numbered_variant("hiring", "hiring"));
        assert!(is_numbered_variant("hiring-12", "hiring"));
        assert!(!is_numbered_variant("hiring-manager", "hiring"));
        assert!(!is_numbered_variant("hiring-", "hiring"));
        assert!(!is_numbered_variant("hiring2", "hiring"));
        assert!(!is_numbered_variant("hire", "hiring"));
    }

    #[test]
    fn matching_sets_have_no_mismatch() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert_eq!(reorder_mismatch(&[a, b], &[b, a]), None);
    }

    #[test]
    fn mismatch_reports_both_sides() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let stranger = Uuid::now_v7();
        assert_eq!(
            reorder_mismatch(&[a, b], &[a, stranger]),
            Some(ReorderOutcome::Mismatch {
                missing: vec![b],
                unknown: vec![stranger],
            })
        );
    }
}
