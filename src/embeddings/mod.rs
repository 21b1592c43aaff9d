// Embeddings module
// Chunk assembly for indexing and the embedding model client

pub mod chunking;
pub mod ollama;

use anyhow::{Result, anyhow};

pub use chunking::{Chunk, ChunkMetadata, ChunkingConfig, UNKNOWN_SECTION, chunk_document};
pub use ollama::OllamaClient;

/// Maps texts to fixed-length vectors
///
/// Implementations must be deterministic for a fixed model version so that query
/// vectors are comparable with the vectors written at index time.
pub trait Embedder: Send + Sync {
    /// Identifier of the model producing the vectors
    fn model_name(&self) -> &str;

    /// Embed every text, preserving input order
    ///
    /// # Errors
    /// Returns an error when the model cannot produce embeddings
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    ///
    /// # Errors
    /// Returns an error when the model cannot produce an embedding
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow!("Embedding model returned no vector"))
    }
}
