//! Document indexing handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate;
use crate::AppState;
use cocounsel_common::{errors::Result, models::SourceKind};
use cocounsel_ingestion::processor::citation_key;
use cocounsel_ingestion::{CaseDocumentInput, CaseLawInput, DocumentInput, StatuteInput};

/// Something to index, tagged by `kind`
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexRequest {
    Document(DocumentBody),
    CaseLaw(CitedBody),
    Statute(CitedBody),
    Wiki(WikiBody),
    CaseDocument(CaseDocumentBody),
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBody {
    #[validate(length(min = 1, max = 200))]
    pub document_id: String,
    #[validate(length(min = 1))]
    pub text: String,
    #[serde(default = "default_source_kind")]
    pub source_kind: SourceKind,
    pub case_id: Option<String>,
    pub title: Option<String>,
    pub citation: Option<String>,
    pub page_number: Option<u32>,
}

fn default_source_kind() -> SourceKind {
    SourceKind::Document
}

/// Case law or statute: the citation names the document
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CitedBody {
    #[validate(length(min = 1, max = 500))]
    pub citation: String,
    #[validate(length(min = 1, max = 1000))]
    pub title: String,
    #[validate(length(min = 1))]
    pub text: String,
    pub court: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WikiBody {
    #[validate(length(min = 1, max = 200))]
    pub entry_id: String,
    #[validate(length(min = 1, max = 1000))]
    pub title: String,
    #[validate(length(min = 1))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CaseDocumentBody {
    #[validate(length(min = 1, max = 200))]
    pub id: String,
    #[validate(length(min = 1, max = 200))]
    pub case_id: String,
    #[validate(length(min = 1))]
    pub content: String,
    pub filename: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexResponse {
    pub document_id: String,
    pub chunks_indexed: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveResponse {
    pub document_id: String,
    pub chunks_removed: usize,
}

/// Chunk, embed and index one document
pub async fn index_document(
    State(state): State<AppState>,
    Json(request): Json<IndexRequest>,
) -> Result<(StatusCode, Json<IndexResponse>)> {
    let engine = &state.engine;

    let (document_id, chunks_indexed) = match request {
        IndexRequest::Document(body) => {
            validate(&body)?;
            let chunks = engine
                .index_document(DocumentInput {
                    document_id: body.document_id.clone(),
                    text: body.text,
                    source_kind: body.source_kind,
                    case_id: body.case_id,
                    title: body.title,
                    citation: body.citation,
                    page_number: body.page_number,
                })
                .await?;
            (body.document_id, chunks.len())
        }
        IndexRequest::CaseLaw(body) => {
            validate(&body)?;
            let document_id = format!("case_{}", citation_key(&body.citation));
            let chunks = engine
                .index_case_law(CaseLawInput {
                    citation: body.citation,
                    title: body.title,
                    text: body.text,
                    court: body.court,
                    date: body.date,
                })
                .await?;
            (document_id, chunks.len())
        }
        IndexRequest::Statute(body) => {
            validate(&body)?;
            let document_id = format!("statute_{}", citation_key(&body.citation));
            let chunks = engine
                .index_statute(StatuteInput {
                    citation: body.citation,
                    title: body.title,
                    text: body.text,
                })
                .await?;
            (document_id, chunks.len())
        }
        IndexRequest::Wiki(body) => {
            validate(&body)?;
            let chunks = engine
                .index_wiki_entry(&body.entry_id, &body.title, &body.content)
                .await?;
            (format!("wiki_{}", body.entry_id), chunks.len())
        }
        IndexRequest::CaseDocument(body) => {
            validate(&body)?;
            let count = engine
                .index_case_document(CaseDocumentInput {
                    id: body.id.clone(),
                    case_id: body.case_id,
                    content: body.content,
                    filename: body.filename,
                })
                .await?;
            (body.id, count)
        }
    };

    tracing::info!(document_id = %document_id, chunks = chunks_indexed, "Indexed via API");

    Ok((
        StatusCode::CREATED,
        Json(IndexResponse {
            document_id,
            chunks_indexed,
        }),
    ))
}

/// Drop a document from the index and the store
pub async fn remove_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RemoveResponse>> {
    let chunks_removed = state.engine.remove_document(&id).await?;
    Ok(Json(RemoveResponse {
        document_id: id,
        chunks_removed,
    }))
}
