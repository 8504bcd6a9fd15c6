//! CoCounsel ingestion library
//!
//! Turns already-extracted plain text into indexed chunks:
//! chunk → embed → index (one atomic write per document) → persist.

pub mod chunker;
pub mod errors;
pub mod processor;

pub use chunker::{chunk_text, ChunkingConfig};
pub use errors::IngestionError;
pub use processor::{CaseDocumentInput, CaseLawInput, DocumentIndexer, DocumentInput, StatuteInput};
