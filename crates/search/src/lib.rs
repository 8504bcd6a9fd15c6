//! CoCounsel search library
//!
//! Holds the in-memory [`VectorIndex`] and the retrieval layer over it.
//! The index is an explicit value: callers construct one, pass it where it
//! is needed, and may hydrate it from a [`ChunkStore`].

pub mod index;
pub mod retrieval;

pub use index::{ChunkFilter, ChunkStore, InMemoryChunkStore, VectorIndex};
pub use retrieval::{cosine_similarity, Retriever, SearchOptions, VectorRetriever};
