//! JSON API for documents and their blocks.
//!
//! This is the surface the block editor talks to: document metadata,
//! block CRUD, reorder, the editor preview and the HTML advisory check.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    routing::{get, patch, post, put},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::block::default_content;
use crate::content::{
    Block, BlockKind, BlockUpdate, BlockUpdateOutcome, Content, Document, DocumentUpdate,
    NewDocument, has_unsafe_content, render_editor_preview,
};
use crate::error::AppResult;
use crate::state::AppState;

/// Document with its blocks in document order.
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: Document,
    pub public_url: String,
    pub blocks: Vec<Block>,
}

/// Request for adding a block.
#[derive(Debug, Deserialize)]
pub struct AddBlockRequest {
    #[serde(rename = "type")]
    pub block_type: String,
    pub position: Option<i32>,
}

/// Request for reordering a document's blocks.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub block_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct HtmlCheckRequest {
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct HtmlCheckResponse {
    pub has_unsafe_content: bool,
}

/// Entry in the editor's block palette.
#[derive(Debug, Serialize)]
pub struct BlockTypeInfo {
    #[serde(rename = "type")]
    pub block_type: String,
    pub label: String,
    pub default_content: Content,
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/documents", post(create_document))
        .route(
            "/api/documents/{id}",
            get(get_document).patch(update_document),
        )
        .route(
            "/api/documents/{id}/blocks",
            get(list_blocks).post(add_block),
        )
        .route("/api/documents/{id}/blocks/order", put(reorder_blocks))
        .route("/api/documents/{id}/preview", get(preview_document))
        .route("/api/blocks/types", get(block_types))
        .route("/api/blocks/html-check", post(check_html))
        .route(
            "/api/blocks/{id}",
            get(get_block).patch(update_block).delete(delete_block),
        )
}

async fn document_response(state: &AppState, document: Document) -> AppResult<DocumentResponse> {
    let blocks = state.blocks().list_blocks(document.id).await?;
    Ok(DocumentResponse {
        public_url: format!("{}{}", state.site_url(), document.public_path()),
        document,
        blocks,
    })
}

async fn create_document(
    State(state): State<AppState>,
    Json(input): Json<NewDocument>,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    let document = state.documents().create_document(input).await?;
    let response = document_response(&state, document).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentResponse>> {
    let document = state.documents().get_document(id).await?;
    Ok(Json(document_response(&state, document).await?))
}

async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<DocumentUpdate>,
) -> AppResult<Json<DocumentResponse>> {
    let document = state.documents().update_document(id, update).await?;
    Ok(Json(document_response(&state, document).await?))
}

async fn list_blocks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Block>>> {
    Ok(Json(state.blocks().list_blocks(id).await?))
}

async fn add_block(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddBlockRequest>,
) -> AppResult<(StatusCode, Json<Block>)> {
    let kind = BlockKind::parse(&request.block_type);
    let block = state.blocks().add_block(id, kind, request.position).await?;
    Ok((StatusCode::CREATED, Json(block)))
}

async fn reorder_blocks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReorderRequest>,
) -> AppResult<Json<Vec<Block>>> {
    Ok(Json(state.blocks().reorder(id, &request.block_ids).await?))
}

async fn get_block(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Block>> {
    Ok(Json(state.blocks().get_block(id).await?))
}

async fn update_block(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<BlockUpdate>,
) -> AppResult<Json<BlockUpdateOutcome>> {
    Ok(Json(state.blocks().update_block(id, update).await?))
}

async fn delete_block(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.blocks().delete_block(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Editor preview: every block wrapped in editor chrome, in document order.
async fn preview_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Html<String>> {
    let blocks = state.blocks().list_blocks(id).await?;
    let body: String = blocks.iter().map(render_editor_preview).collect();
    Ok(Html(format!(
        "<div class=\"editor-canvas\" data-document-id=\"{id}\">{body}</div>"
    )))
}

async fn check_html(Json(request): Json<HtmlCheckRequest>) -> Json<HtmlCheckResponse> {
    Json(HtmlCheckResponse {
        has_unsafe_content: has_unsafe_content(&request.html),
    })
}

/// Block types the editor can create, with their starting content.
async fn block_types() -> Json<Vec<BlockTypeInfo>> {
    Json(
        BlockKind::STANDARD
            .iter()
            .map(|kind| BlockTypeInfo {
                block_type: kind.as_str().to_string(),
                label: kind.label().to_string(),
                default_content: default_content(kind),
            })
            .collect(),
    )
}
