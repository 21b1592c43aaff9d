// Database module
// Per-project vector storage backed by LanceDB

pub mod lancedb;

pub use self::lancedb::EmbeddingRecord;
pub use self::lancedb::vector_store::{SearchResult, VectorStore};
