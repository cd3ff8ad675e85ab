//! PostgreSQL content store.
//!
//! Expects two tables:
//!
//! ```sql
//! CREATE TABLE content_document (
//!     id UUID PRIMARY KEY,
//!     kind TEXT NOT NULL,
//!     title TEXT NOT NULL,
//!     slug TEXT NOT NULL,
//!     slug_customized BOOLEAN NOT NULL DEFAULT FALSE,
//!     status TEXT NOT NULL DEFAULT 'draft',
//!     created BIGINT NOT NULL,
//!     changed BIGINT NOT NULL,
//!     UNIQUE (kind, slug)
//! );
//!
//! CREATE TABLE content_block (
//!     id UUID PRIMARY KEY,
//!     document_id UUID NOT NULL REFERENCES content_document (id) ON DELETE CASCADE,
//!     parent_id UUID NULL,
//!     type TEXT NOT NULL,
//!     content JSONB NOT NULL DEFAULT '{}',
//!     position INTEGER NOT NULL,
//!     seq BIGINT GENERATED ALWAYS AS IDENTITY,
//!     created BIGINT NOT NULL,
//!     changed BIGINT NOT NULL
//! );
//! ```

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::{BlockPatch, ContentStore, ReorderOutcome, reorder_mismatch};
use crate::content::block::{Block, BlockKind};
use crate::content::document::{Document, DocumentKind};

const DOCUMENT_COLUMNS: &str =
    "id, kind, title, slug, slug_customized, status, created, changed";

const BLOCK_COLUMNS: &str =
    "id, document_id, parent_id, type, content, position, seq, created, changed";

/// Content store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    kind: String,
    title: String,
    slug: String,
    slug_customized: bool,
    status: String,
    created: i64,
    changed: i64,
}

impl TryFrom<DocumentRow> for Document {
    type Error = anyhow::Error;

    fn try_from(row: DocumentRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            kind: row.kind.parse().map_err(|e: String| anyhow!(e))?,
            title: row.title,
            slug: row.slug,
            slug_customized: row.slug_customized,
            status: row.status.parse().map_err(|e: String| anyhow!(e))?,
            created: row.created,
            changed: row.changed,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BlockRow {
    id: Uuid,
    document_id: Uuid,
    parent_id: Option<Uuid>,
    #[sqlx(rename = "type")]
    block_type: String,
    content: Value,
    position: i32,
    seq: i64,
    created: i64,
    changed: i64,
}

impl From<BlockRow> for Block {
    fn from(row: BlockRow) -> Self {
        Self {
            id: row.id,
            document_id: row.document_id,
            block_type: BlockKind::parse(&row.block_type),
            content: match row.content {
                Value::Object(map) => map,
                _ => Default::default(),
            },
            position: row.position,
            parent_id: row.parent_id,
            seq: row.seq,
            created: row.created,
            changed: row.changed,
        }
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn insert_document(&self, document: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO content_document (id, kind, title, slug, slug_customized, status, created, changed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(document.id)
        .bind(document.kind.as_str())
        .bind(&document.title)
        .bind(&document.slug)
        .bind(document.slug_customized)
        .bind(document.status.as_str())
        .bind(document.created)
        .bind(document.changed)
        .execute(&self.pool)
        .await
        .context("failed to insert document")?;

        Ok(())
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM content_document WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch document by id")?;

        row.map(Document::try_from).transpose()
    }

    async fn find_document_by_slug(
        &self,
        kind: DocumentKind,
        slug: &str,
    ) -> Result<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM content_document WHERE kind = $1 AND slug = $2"
        ))
        .bind(kind.as_str())
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch document by slug")?;

        row.map(Document::try_from).transpose()
    }

    async fn update_document(&self, document: &Document) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE content_document
            SET title = $1, slug = $2, slug_customized = $3, status = $4, changed = $5
            WHERE id = $6
            "#,
        )
        .bind(&document.title)
        .bind(&document.slug)
        .bind(document.slug_customized)
        .bind(document.status.as_str())
        .bind(document.changed)
        .bind(document.id)
        .execute(&self.pool)
        .await
        .context("failed to update document")?;

        Ok(result.rows_affected() > 0)
    }

    async fn slugs_with_base(
        &self,
        kind: DocumentKind,
        base: &str,
        exclude: Option<Uuid>,
    ) -> Result<Vec<String>> {
        let numbered = format!("^{}-[0-9]+$", regex::escape(base));

        let slugs: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT slug FROM content_document
            WHERE kind = $1
              AND (slug = $2 OR slug ~ $3)
              AND ($4::uuid IS NULL OR id <> $4)
            "#,
        )
        .bind(kind.as_str())
        .bind(base)
        .bind(&numbered)
        .bind(exclude)
        .fetch_all(&self.pool)
        .await
        .context("failed to check slug uniqueness")?;

        Ok(slugs.into_iter().map(|(s,)| s).collect())
    }

    async fn list_blocks(&self, document_id: Uuid) -> Result<Vec<Block>> {
        let rows = sqlx::query_as::<_, BlockRow>(&format!(
            "SELECT {BLOCK_COLUMNS} FROM content_block WHERE document_id = $1 ORDER BY position ASC, seq ASC"
        ))
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to list blocks")?;

        Ok(rows.into_iter().map(Block::from).collect())
    }

    async fn find_block(&self, id: Uuid) -> Result<Option<Block>> {
        let row = sqlx::query_as::<_, BlockRow>(&format!(
            "SELECT {BLOCK_COLUMNS} FROM content_block WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch block by id")?;

        Ok(row.map(Block::from))
    }

    async fn max_position(&self, document_id: Uuid) -> Result<Option<i32>> {
        let (max,): (Option<i32>,) =
            sqlx::query_as("SELECT MAX(position) FROM content_block WHERE document_id = $1")
                .bind(document_id)
                .fetch_one(&self.pool)
                .await
                .context("failed to read max block position")?;

        Ok(max)
    }

    async fn insert_block(&self, block: &Block) -> Result<Block> {
        let (seq,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO content_block (id, document_id, parent_id, type, content, position, created, changed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING seq
            "#,
        )
        .bind(block.id)
        .bind(block.document_id)
        .bind(block.parent_id)
        .bind(block.block_type.as_str())
        .bind(Value::Object(block.content.clone()))
        .bind(block.position)
        .bind(block.created)
        .bind(block.changed)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert block")?;

        Ok(Block {
            seq,
            ..block.clone()
        })
    }

    async fn update_block(&self, id: Uuid, patch: &BlockPatch) -> Result<Option<Block>> {
        // jsonb `||` is the same shallow merge the service promises.
        let row = sqlx::query_as::<_, BlockRow>(&format!(
            r#"
            UPDATE content_block
            SET content = content || COALESCE($1::jsonb, '{{}}'::jsonb),
                position = COALESCE($2, position),
                parent_id = COALESCE($3, parent_id),
                changed = $4
            WHERE id = $5
            RETURNING {BLOCK_COLUMNS}
            "#
        ))
        .bind(patch.content.clone().map(Value::Object))
        .bind(patch.position)
        .bind(patch.parent_id)
        .bind(patch.changed)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to update block")?;

        Ok(row.map(Block::from))
    }

    async fn delete_block(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM content_block WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete block")?;

        Ok(result.rows_affected() > 0)
    }

    async fn reorder_blocks(
        &self,
        document_id: Uuid,
        ordered: &[Uuid],
    ) -> Result<ReorderOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to start transaction")?;

        let existing: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM content_block WHERE document_id = $1 FOR UPDATE")
                .bind(document_id)
                .fetch_all(&mut *tx)
                .await
                .context("failed to lock document blocks")?;
        let existing: Vec<Uuid> = existing.into_iter().map(|(id,)| id).collect();

        if let Some(mismatch) = reorder_mismatch(&existing, ordered) {
            // Dropping the transaction rolls it back.
            return Ok(mismatch);
        }

        // One statement rewrites every sibling's position.
        sqlx::query(
            r#"
            UPDATE content_block AS b
            SET position = (o.ord - 1)::int, changed = $3
            FROM UNNEST($1::uuid[]) WITH ORDINALITY AS o(id, ord)
            WHERE b.id = o.id AND b.document_id = $2
            "#,
        )
        .bind(ordered.to_vec())
        .bind(document_id)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await
        .context("failed to reorder blocks")?;

        tx.commit().await.context("failed to commit reorder")?;

        Ok(ReorderOutcome::Applied)
    }
}
