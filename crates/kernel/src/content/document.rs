//! Documents (newsletters and blog posts) that own an ordered set of blocks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum slug length.
const MAX_SLUG_LENGTH: usize = 128;

/// Kind of document. Slugs are unique per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Newsletter,
    BlogPost,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newsletter => "newsletter",
            Self::BlogPost => "blog_post",
        }
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newsletter" => Ok(Self::Newsletter),
            "blog_post" => Ok(Self::BlogPost),
            other => Err(format!("unknown document kind '{other}'")),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown document status '{other}'")),
        }
    }
}

/// Document record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    pub kind: DocumentKind,

    pub title: String,

    /// URL-safe slug, unique per kind.
    pub slug: String,

    /// Set once an editor picks the slug explicitly. While false, the slug
    /// follows the title.
    pub slug_customized: bool,

    pub status: DocumentStatus,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

impl Document {
    /// Check if this document is visible on the public site.
    pub fn is_published(&self) -> bool {
        self.status == DocumentStatus::Published
    }

    /// Whether a title edit should regenerate the slug.
    pub fn slug_follows_title(&self) -> bool {
        !self.slug_customized
    }

    /// Public path of this document.
    pub fn public_path(&self) -> String {
        match self.kind {
            DocumentKind::Newsletter => format!("/newsletters/{}", self.slug),
            DocumentKind::BlogPost => format!("/blog/{}", self.slug),
        }
    }
}

/// Convert text into a URL-safe slug.
///
/// Transforms to lowercase, replaces non-alphanumeric characters with hyphens,
/// collapses consecutive hyphens, and trims leading/trailing hyphens.
pub fn slugify(text: &str) -> String {
    let slug: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();

    let mut result = String::with_capacity(slug.len());
    let mut prev_was_hyphen = true;
    for c in slug.chars() {
        if c == '-' {
            if !prev_was_hyphen {
                result.push('-');
            }
            prev_was_hyphen = true;
        } else {
            result.push(c);
            prev_was_hyphen = false;
        }
    }

    while result.ends_with('-') {
        result.pop();
    }

    // Output is pure ASCII, so byte slicing is safe.
    if result.len() > MAX_SLUG_LENGTH {
        let truncated = &result[..MAX_SLUG_LENGTH];
        if let Some(last_hyphen) = truncated.rfind('-') {
            return truncated[..last_hyphen].to_string();
        }
        return truncated.to_string();
    }

    result
}
