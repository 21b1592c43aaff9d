// LanceDB vector database module
// Handles vector storage and similarity search for chunk embeddings


pub mod vector_store;

use serde::{Deserialize, Serialize};

use crate::embeddings::Chunk;

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Positional id (`chunk_<i>`), unique within one indexing run
    pub id: String,
    /// The vector embedding (384 dimensions for all-minilm)
    pub vector: Vec<f32>,
    /// The chunk text and its provenance
    pub chunk: Chunk,
    /// Position of this chunk within the indexing run
    pub chunk_index: u32,
    /// RFC 3339 timestamp of the indexing run
    pub indexed_at: String,
}

impl EmbeddingRecord {
    /// Pair a chunk with its vector, deriving the id from its position
    #[inline]
    pub fn new(index: u32, chunk: Chunk, vector: Vec<f32>, indexed_at: &str) -> Self {
        Self {
            id: format!("chunk_{}", index),
            vector,
            chunk,
            chunk_index: index,
            indexed_at: indexed_at.to_string(),
        }
    }
}
