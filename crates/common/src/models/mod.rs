//! Core retrieval models
//!
//! A [`Chunk`] is immutable once built: re-ingesting a document supersedes
//! its chunks instead of mutating them. [`SearchResult`]s are produced per
//! query and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

/// Where a chunk's text came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Case materials uploaded by the user (discovery, pleadings, ...)
    Document,
    /// Reported decisions
    CaseLaw,
    /// Statutes and regulations
    Statute,
    /// Knowledge-base entries
    Wiki,
    /// Crowdsourced legal database
    Crowdsourced,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Document => "document",
            SourceKind::CaseLaw => "case_law",
            SourceKind::Statute => "statute",
            SourceKind::Wiki => "wiki",
            SourceKind::Crowdsourced => "crowdsourced",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(SourceKind::Document),
            "case_law" => Ok(SourceKind::CaseLaw),
            "statute" => Ok(SourceKind::Statute),
            "wiki" => Ok(SourceKind::Wiki),
            "crowdsourced" => Ok(SourceKind::Crowdsourced),
            other => Err(AppError::Validation {
                message: format!("unknown source kind '{other}'"),
                field: Some("source_kind".to_string()),
            }),
        }
    }
}

/// Provenance carried by every chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub source_kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Position of this chunk within its document
    pub chunk_index: usize,
    /// Total chunks produced for the document
    pub chunk_count: usize,
    /// SHA-256 of the chunk text
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A bounded passage of a source document plus its embedding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: String,
    pub source_document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    pub text: String,
    /// Kept out of API responses
    #[serde(skip_serializing, default)]
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Deterministic chunk id for a document position
    pub fn make_id(document_id: &str, index: usize) -> String {
        format!("{document_id}_chunk_{index}")
    }

    /// Label used when rendering this chunk as a citation.
    ///
    /// The explicit citation wins; otherwise `source: title` with the
    /// document id standing in for a missing title.
    pub fn citation_label(&self) -> String {
        match &self.metadata.citation {
            Some(citation) => citation.clone(),
            None => format!(
                "{}: {}",
                self.metadata.source_kind,
                self.metadata
                    .title
                    .as_deref()
                    .unwrap_or(&self.source_document_id)
            ),
        }
    }
}

/// SHA-256 hex digest of chunk text
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// A chunk paired with its cosine similarity to a query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Cosine similarity in `[-1, 1]`
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(citation: Option<&str>, title: Option<&str>) -> Chunk {
        Chunk {
            id: Chunk::make_id("doc-1", 0),
            source_document_id: "doc-1".to_string(),
            case_id: None,
            text: "text".to_string(),
            vector: vec![1.0],
            metadata: ChunkMetadata {
                source_kind: SourceKind::CaseLaw,
                title: title.map(str::to_string),
                citation: citation.map(str::to_string),
                page_number: None,
                chunk_index: 0,
                chunk_count: 1,
                content_hash: content_hash("text"),
                created_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_citation_label_prefers_citation() {
        assert_eq!(
            chunk(Some("People v. Smith, 12 N.Y.3d 45"), Some("Smith")).citation_label(),
            "People v. Smith, 12 N.Y.3d 45"
        );
        assert_eq!(chunk(None, Some("Smith")).citation_label(), "case_law: Smith");
        assert_eq!(chunk(None, None).citation_label(), "case_law: doc-1");
    }

    #[test]
    fn test_source_kind_parse() {
        assert_eq!("case_law".parse::<SourceKind>().unwrap(), SourceKind::CaseLaw);
        assert!("podcast".parse::<SourceKind>().is_err());
        assert_eq!(SourceKind::Crowdsourced.to_string(), "crowdsourced");
    }

    #[test]
    fn test_chunk_id_and_hash() {
        assert_eq!(Chunk::make_id("statute_42", 3), "statute_42_chunk_3");
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_eq!(content_hash("abc").len(), 64);
    }
}
