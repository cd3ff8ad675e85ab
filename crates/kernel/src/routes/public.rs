//! Public document pages.
//!
//! Published newsletters and blog posts rendered block by block. Drafts
//! and archived documents answer 404.

use axum::{
    Router,
    extract::{Path, State},
    response::Html,
    routing::get,
};

use crate::content::sanitize::html_escape;
use crate::content::{Document, DocumentKind, render_blocks};
use crate::error::AppResult;
use crate::state::AppState;

/// Create the public page router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/newsletters/{slug}", get(view_newsletter))
        .route("/blog/{slug}", get(view_blog_post))
}

async fn view_newsletter(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Html<String>> {
    render_published(&state, DocumentKind::Newsletter, &slug).await
}

async fn view_blog_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Html<String>> {
    render_published(&state, DocumentKind::BlogPost, &slug).await
}

async fn render_published(
    state: &AppState,
    kind: DocumentKind,
    slug: &str,
) -> AppResult<Html<String>> {
    let document = state.documents().find_published(kind, slug).await?;
    let blocks = state.blocks().list_blocks(document.id).await?;
    Ok(Html(render_page(&document, &render_blocks(&blocks))))
}

fn render_page(document: &Document, body: &str) -> String {
    let title = html_escape(&document.title);
    let kind = document.kind.as_str().replace('_', "-");
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body>
<article class="document document--{kind}">
<h1 class="document__title">{title}</h1>
<div class="document__body">{body}</div>
</article>
</body>
</html>"#
    )
}
