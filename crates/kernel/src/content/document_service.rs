//! Document service.
//!
//! Creates and edits newsletters and blog posts. Slugs are unique per
//! document kind and follow the title until an editor sets one explicitly.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::document::{Document, DocumentKind, DocumentStatus, slugify};
use super::store::ContentStore;
use crate::error::{ContentError, ContentResult};

/// Slug used when a title has no slug-worthy characters.
const FALLBACK_SLUG: &str = "untitled";

/// Input for creating a document.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub title: String,

    /// Explicit slug. When present the slug no longer follows the title.
    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pub status: Option<DocumentStatus>,
}

/// Partial document update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentUpdate {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pub status: Option<DocumentStatus>,
}

/// Service for document metadata.
#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn ContentStore>,
}

impl DocumentService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Create a document. It must exist before blocks can be attached.
    pub async fn create_document(&self, input: NewDocument) -> ContentResult<Document> {
        let title = required_title(&input.title)?;

        let (base, slug_customized) = match input.slug.as_deref() {
            Some(slug) => (explicit_slug(slug)?, true),
            None => (slugify(&title), false),
        };
        let slug = self.unique_slug(input.kind, &base, None).await?;

        let now = chrono::Utc::now().timestamp();
        let document = Document {
            id: Uuid::now_v7(),
            kind: input.kind,
            title,
            slug,
            slug_customized,
            status: input.status.unwrap_or_default(),
            created: now,
            changed: now,
        };

        self.store.insert_document(&document).await?;

        info!(
            document_id = %document.id,
            kind = %document.kind,
            slug = %document.slug,
            "document created"
        );
        Ok(document)
    }

    pub async fn get_document(&self, id: Uuid) -> ContentResult<Document> {
        self.store
            .find_document(id)
            .await?
            .ok_or_else(|| ContentError::document_not_found(id))
    }

    /// Update title, slug or status.
    ///
    /// A title edit regenerates the slug unless the slug was set explicitly,
    /// now or earlier.
    pub async fn update_document(
        &self,
        id: Uuid,
        update: DocumentUpdate,
    ) -> ContentResult<Document> {
        let mut document = self.get_document(id).await?;

        if let Some(slug) = update.slug.as_deref() {
            let base = explicit_slug(slug)?;
            document.slug = self.unique_slug(document.kind, &base, Some(id)).await?;
            document.slug_customized = true;
        }

        if let Some(title) = update.title.as_deref() {
            document.title = required_title(title)?;
            if update.slug.is_none() && document.slug_follows_title() {
                let base = slugify(&document.title);
                document.slug = self.unique_slug(document.kind, &base, Some(id)).await?;
            }
        }

        if let Some(status) = update.status {
            document.status = status;
        }

        document.changed = chrono::Utc::now().timestamp();

        if !self.store.update_document(&document).await? {
            return Err(ContentError::document_not_found(id));
        }

        info!(document_id = %id, slug = %document.slug, status = document.status.as_str(), "document updated");
        Ok(document)
    }

    /// Published document of `kind` at `slug`. Drafts and archived
    /// documents are reported as not found.
    pub async fn find_published(&self, kind: DocumentKind, slug: &str) -> ContentResult<Document> {
        match self.store.find_document_by_slug(kind, slug).await? {
            Some(document) if document.is_published() => Ok(document),
            _ => Err(ContentError::NotFound {
                entity: "document",
                id: format!("{kind}/{slug}"),
            }),
        }
    }

    /// Make `base` unique within `kind`.
    ///
    /// If `weekly` is taken, tries `weekly-1`, `weekly-2`, etc. and finally
    /// appends a UUID fragment.
    async fn unique_slug(
        &self,
        kind: DocumentKind,
        base: &str,
        exclude: Option<Uuid>,
    ) -> ContentResult<String> {
        let base = if base.is_empty() { FALLBACK_SLUG } else { base };

        let existing = self.store.slugs_with_base(kind, base, exclude).await?;
        let existing: HashSet<&str> = existing.iter().map(String::as_str).collect();

        if !existing.contains(base) {
            return Ok(base.to_string());
        }

        for i in 1..100 {
            let candidate = format!("{base}-{i}");
            if !existing.contains(candidate.as_str()) {
                return Ok(candidate);
            }
        }

        let id = Uuid::now_v7().simple().to_string();
        let fragment = &id[id.len() - 8..];
        Ok(format!("{base}-{fragment}"))
    }
}

fn required_title(title: &str) -> ContentResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ContentError::Validation("title must not be empty".to_string()));
    }
    Ok(title.to_string())
}

fn explicit_slug(slug: &str) -> ContentResult<String> {
    let slug = slugify(slug);
    if slug.is_empty() {
        return Err(ContentError::Validation(
            "slug must contain at least one letter or digit".to_string(),
        ));
    }
    Ok(slug)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::content::store::MemoryContentStore;

    fn service() -> DocumentService {
        DocumentService::new(Arc::new(MemoryContentStore::new()))
    }

    fn new_doc(kind: DocumentKind, title: &str) -> NewDocument {
        NewDocument {
            kind,
            title: title.to_string(),
            slug: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn create_derives_slug_from_title() {
        let service = service();
        let doc = service
            .create_document(new_doc(DocumentKind::Newsletter, "March Update!"))
            .await
            .unwrap();
        assert_eq!(doc.slug, "march-update");
        assert!(!doc.slug_customized);
        assert_eq!(doc.status, DocumentStatus::Draft);
    }

    #[tokio::test]
    async fn duplicate_titles_get_numeric_suffixes() {
        let service = service();
        let mut slugs = Vec::new();
        for _ in 0..3 {
            let doc = service
                .create_document(new_doc(DocumentKind::BlogPost, "Hiring"))
                .await
                .unwrap();
            slugs.push(doc.slug);
        }
        assert_eq!(slugs, vec!["hiring", "hiring-1", "hiring-2"]);
    }

    #[tokio::test]
    async fn longer_slugs_sharing_a_prefix_do_not_hide_the_base() {
        let service = service();
        for i in 0..250 {
            service
                .create_document(new_doc(DocumentKind::BlogPost, &format!("Hiring Manager {i}")))
                .await
                .unwrap();
        }
        let doc = service
            .create_document(new_doc(DocumentKind::BlogPost, "Hiring"))
            .await
            .unwrap();
        assert_eq!(doc.slug, "hiring");

        let again = service
            .create_document(new_doc(DocumentKind::BlogPost, "Hiring"))
            .await
            .unwrap();
        assert_eq!(again.slug, "hiring-1");
    }

    #[tokio::test]
    async fn slugs_are_unique_per_kind_only() {
        let service = service();
        let post = service
            .create_document(new_doc(DocumentKind::BlogPost, "News"))
            .await
            .unwrap();
        let letter = service
            .create_document(new_doc(DocumentKind::Newsletter, "News"))
            .await
            .unwrap();
        assert_eq!(post.slug, "news");
        assert_eq!(letter.slug, "news");
    }

    #[tokio::test]
    async fn empty_title_is_rejected() {
        let err = service()
            .create_document(new_doc(DocumentKind::BlogPost, "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Validation(_)));
    }

    #[tokio::test]
    async fn symbol_only_title_falls_back_to_untitled() {
        let doc = service()
            .create_document(new_doc(DocumentKind::BlogPost, "!!!"))
            .await
            .unwrap();
        assert_eq!(doc.slug, "untitled");
    }

    #[tokio::test]
    async fn title_edit_regenerates_uncustomized_slug() {
        let service = service();
        let doc = service
            .create_document(new_doc(DocumentKind::Newsletter, "Draft Title"))
            .await
            .unwrap();
        let updated = service
            .update_document(
                doc.id,
                DocumentUpdate {
                    title: Some("Final Title".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, "final-title");
    }

    #[tokio::test]
    async fn explicit_slug_sticks_across_title_edits() {
        let service = service();
        let doc = service
            .create_document(new_doc(DocumentKind::Newsletter, "Draft Title"))
            .await
            .unwrap();
        let updated = service
            .update_document(
                doc.id,
                DocumentUpdate {
                    slug: Some("Spring Issue".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, "spring-issue");
        assert!(updated.slug_customized);

        let updated = service
            .update_document(
                doc.id,
                DocumentUpdate {
                    title: Some("Another Title".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, "spring-issue");
        assert_eq!(updated.title, "Another Title");
    }

    #[tokio::test]
    async fn retitling_to_same_slug_keeps_it() {
        let service = service();
        let doc = service
            .create_document(new_doc(DocumentKind::BlogPost, "Hello World"))
            .await
            .unwrap();
        let updated = service
            .update_document(
                doc.id,
                DocumentUpdate {
                    title: Some("Hello, World".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, "hello-world");
    }

    #[tokio::test]
    async fn find_published_hides_drafts() {
        let service = service();
        let doc = service
            .create_document(new_doc(DocumentKind::BlogPost, "Open Roles"))
            .await
            .unwrap();

        let err = service
            .find_published(DocumentKind::BlogPost, "open-roles")
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NotFound { .. }));

        service
            .update_document(
                doc.id,
                DocumentUpdate {
                    status: Some(DocumentStatus::Published),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let found = service
            .find_published(DocumentKind::BlogPost, "open-roles")
            .await
            .unwrap();
        assert_eq!(found.id, doc.id);

        let err = service
            .find_published(DocumentKind::Newsletter, "open-roles")
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_missing_document_is_not_found() {
        let err = service()
            .update_document(Uuid::now_v7(), DocumentUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NotFound { entity: "document", .. }));
    }
}
