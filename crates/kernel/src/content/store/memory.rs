//! In-process content store.

use std::collections::HashMap;

use anyhow::{Result, bail};
use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{BlockPatch, ContentStore, ReorderOutcome, is_numbered_variant, reorder_mismatch};
use crate::content::block::{Block, merge_content, sort_blocks};
use crate::content::document::{Document, DocumentKind};

/// Content store backed by process memory.
///
/// Every operation takes the lock once, so a reorder is never observed half
/// applied.
#[derive(Default)]
pub struct MemoryContentStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    documents: HashMap<Uuid, Document>,
    blocks: HashMap<Uuid, Block>,
    next_seq: i64,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn document_blocks(&self, document_id: Uuid) -> Vec<&Block> {
        self.blocks
            .values()
            .filter(|b| b.document_id == document_id)
            .collect()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn insert_document(&self, document: &Document) -> Result<()> {
        let mut inner = self.inner.write();
        let slug_taken = inner
            .documents
            .values()
            .any(|d| d.kind == document.kind && d.slug == document.slug);
        if slug_taken {
            bail!("duplicate slug '{}' for {}", document.slug, document.kind);
        }
        inner.documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>> {
        Ok(self.inner.read().documents.get(&id).cloned())
    }

    async fn find_document_by_slug(
        &self,
        kind: DocumentKind,
        slug: &str,
    ) -> Result<Option<Document>> {
        Ok(self
            .inner
            .read()
            .documents
            .values()
            .find(|d| d.kind == kind && d.slug == slug)
            .cloned())
    }

    async fn update_document(&self, document: &Document) -> Result<bool> {
        let mut inner = self.inner.write();
        let slug_taken = inner.documents.values().any(|d| {
            d.id != document.id && d.kind == document.kind && d.slug == document.slug
        });
        if slug_taken {
            bail!("duplicate slug '{}' for {}", document.slug, document.kind);
        }
        match inner.documents.get_mut(&document.id) {
            Some(existing) => {
                *existing = document.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn slugs_with_base(
        &self,
        kind: DocumentKind,
        base: &str,
        exclude: Option<Uuid>,
    ) -> Result<Vec<String>> {
        Ok(self
            .inner
            .read()
            .documents
            .values()
            .filter(|d| {
                d.kind == kind && Some(d.id) != exclude && is_numbered_variant(&d.slug, base)
            })
            .map(|d| d.slug.clone())
            .collect())
    }

    async fn list_blocks(&self, document_id: Uuid) -> Result<Vec<Block>> {
        let mut blocks: Vec<Block> = self
            .inner
            .read()
            .document_blocks(document_id)
            .into_iter()
            .cloned()
            .collect();
        sort_blocks(&mut blocks);
        Ok(blocks)
    }

    async fn find_block(&self, id: Uuid) -> Result<Option<Block>> {
        Ok(self.inner.read().blocks.get(&id).cloned())
    }

    async fn max_position(&self, document_id: Uuid) -> Result<Option<i32>> {
        Ok(self
            .inner
            .read()
            .document_blocks(document_id)
            .iter()
            .map(|b| b.position)
            .max())
    }

    async fn insert_block(&self, block: &Block) -> Result<Block> {
        let mut inner = self.inner.write();
        if !inner.documents.contains_key(&block.document_id) {
            bail!("document {} does not exist", block.document_id);
        }
        inner.next_seq += 1;
        let stored = Block {
            seq: inner.next_seq,
            ..block.clone()
        };
        inner.blocks.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_block(&self, id: Uuid, patch: &BlockPatch) -> Result<Option<Block>> {
        let mut inner = self.inner.write();
        let Some(existing) = inner.blocks.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(content) = &patch.content {
            merge_content(&mut existing.content, content.clone());
        }
        if let Some(position) = patch.position {
            existing.position = position;
        }
        if patch.parent_id.is_some() {
            existing.parent_id = patch.parent_id;
        }
        existing.changed = patch.changed;
        Ok(Some(existing.clone()))
    }

    async fn delete_block(&self, id: Uuid) -> Result<bool> {
        Ok(self.inner.write().blocks.remove(&id).is_some())
    }

    async fn reorder_blocks(
        &self,
        document_id: Uuid,
        ordered: &[Uuid],
    ) -> Result<ReorderOutcome> {
        let mut inner = self.inner.write();
        let existing: Vec<Uuid> = inner
            .document_blocks(document_id)
            .iter()
            .map(|b| b.id)
            .collect();
        if let Some(mismatch) = reorder_mismatch(&existing, ordered) {
            return Ok(mismatch);
        }

        let now = chrono::Utc::now().timestamp();
        for (position, id) in (0i32..).zip(ordered) {
            if let Some(block) = inner.blocks.get_mut(id) {
                block.position = position;
                block.changed = now;
            }
        }
        Ok(ReorderOutcome::Applied)
    }
}
