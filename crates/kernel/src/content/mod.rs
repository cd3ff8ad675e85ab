//! Block-based content for newsletters and blog posts.
//!
//! This module provides:
//! - Sanitizer: allow-list HTML cleaning and the formatted-text mini syntax
//! - Block: block kinds, content payloads with defaults and clamping
//! - BlockRenderer: block to safe HTML, for public pages and the editor
//! - ContentStore: persistence seam (memory or PostgreSQL)
//! - BlockService / DocumentService: the operations the editor calls

pub mod block;
pub mod block_render;
pub mod block_service;
pub mod document;
pub mod document_service;
pub mod sanitize;
pub mod store;

pub use block::{Block, BlockKind, Content};
pub use block_render::{render_block, render_blocks, render_editor_preview};
pub use block_service::{BlockService, BlockUpdate, BlockUpdateOutcome};
pub use document::{Document, DocumentKind, DocumentStatus};
pub use document_service::{DocumentService, DocumentUpdate, NewDocument};
pub use sanitize::{SanitizeOptions, has_unsafe_content, sanitize_formatted_text, sanitize_html};
pub use store::{ContentStore, MemoryContentStore, PgContentStore};
