// Indexer module
// Chunks a project's documents, embeds them, and replaces the project's collection


use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::database::{EmbeddingRecord, VectorStore};
use crate::embeddings::Embedder;
use crate::embeddings::chunking::{Chunk, chunk_paginated};
use crate::extraction::{PaginatedDocument, PdfDocument};
use crate::projects::Project;
use crate::{RagError, Result};

/// Chunks gathered from a set of documents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedDocuments {
    pub chunks: Vec<Chunk>,
    /// Documents that contributed at least one chunk
    pub documents: usize,
    /// Ids of documents that were unreadable or empty
    pub skipped: Vec<String>,
}

/// Outcome of an indexing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub project: String,
    pub documents_indexed: usize,
    pub documents_skipped: Vec<String>,
    pub chunks_indexed: usize,
}

/// Builds a project's vector collection from its documents
pub struct Indexer<'a, E: Embedder + ?Sized> {
    config: &'a Config,
    embedder: &'a E,
}

impl<'a, E: Embedder + ?Sized> Indexer<'a, E> {
    #[inline]
    pub fn new(config: &'a Config, embedder: &'a E) -> Self {
        Self { config, embedder }
    }

    /// Chunk every document in order
    ///
    /// Documents without content are logged and skipped. Unreadable documents
    /// abort the run unless `indexing.skip_unreadable` is set.
    ///
    /// # Errors
    /// Returns `RagError::Extraction` for an unreadable document when skipping is off
    #[inline]
    pub fn chunk_documents<D: PaginatedDocument>(&self, documents: &[D]) -> Result<ChunkedDocuments> {
        let bar = progress_bar(documents.len());
        let mut chunked = ChunkedDocuments::default();

        for document in documents {
            let document_id = document.document_id();
            bar.set_message(document_id.clone());

            match chunk_paginated(document, &self.config.chunking) {
                Ok(chunks) => {
                    debug!("{} produced {} chunks", document_id, chunks.len());
                    chunked.chunks.extend(chunks);
                    chunked.documents += 1;
                }
                Err(RagError::NoContent { document }) => {
                    warn!("Skipping '{}': no extractable text", document);
                    chunked.skipped.push(document);
                }
                Err(RagError::Extraction { document, message })
                    if self.config.indexing.skip_unreadable =>
                {
                    warn!("Skipping unreadable '{}': {}", document, message);
                    chunked.skipped.push(document);
                }
                Err(e) => {
                    bar.abandon();
                    return Err(e);
                }
            }
            bar.inc(1);
        }

        bar.finish_and_clear();
        Ok(chunked)
    }

    /// Embed `chunks` and replace the project's collection with them
    ///
    /// Ids are `chunk_0 … chunk_{n-1}` in the given order. Embedding happens
    /// before the store is opened, so a failed run leaves the previous index intact.
    /// An empty input drops the collection. Returns the number of chunks stored.
    ///
    /// # Errors
    /// Returns `RagError::IndexWrite` if embedding fails, a vector does not match
    /// the configured embedding dimension, or the store write fails
    #[inline]
    pub async fn index_chunks(&self, project: &Project, chunks: Vec<Chunk>) -> Result<usize> {
        let index_error = |message: String| RagError::IndexWrite {
            project: project.name().to_string(),
            message,
        };

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        if !texts.is_empty() {
            info!(
                "Embedding {} chunks for '{}' with {}",
                texts.len(),
                project.name(),
                self.embedder.model_name()
            );
        }

        let vectors = self
            .embedder
            .embed_batch(&texts)
            .map_err(|e| index_error(format!("embedding failed: {:#}", e)))?;

        if vectors.len() != chunks.len() {
            return Err(index_error(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let dimension = self.config.ollama.embedding_dimension;
        if let Some(vector) = vectors
            .iter()
            .find(|v| u32::try_from(v.len()).ok() != Some(dimension))
        {
            return Err(index_error(format!(
                "embedder returned {}-dimensional vectors, ollama.embedding_dimension is {}",
                vector.len(),
                dimension
            )));
        }

        let indexed_at = Utc::now().to_rfc3339();
        let records = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (chunk, vector))| {
                let index = u32::try_from(i)
                    .map_err(|_| index_error("too many chunks for one collection".to_string()))?;
                Ok(EmbeddingRecord::new(index, chunk, vector, &indexed_at))
            })
            .collect::<Result<Vec<_>>>()?;

        let store = VectorStore::open(project.index_dir())
            .await
            .map_err(|e| index_error(e.to_string()))?;
        let stored = store
            .replace_collection(&self.config.retrieval.collection_name, &records)
            .await
            .map_err(|e| {
                error!("Index write for '{}' failed: {}", project.name(), e);
                index_error(e.to_string())
            })?;

        Ok(stored)
    }

    /// Rebuild the project's index from the PDFs in its papers directory
    ///
    /// # Errors
    /// Returns extraction errors (when not skipped) and `RagError::IndexWrite`
    #[inline]
    pub async fn index_project(&self, project: &Project) -> Result<IndexSummary> {
        let documents: Vec<PdfDocument> = project
            .paper_paths()?
            .into_iter()
            .map(PdfDocument::new)
            .collect();
        info!(
            "Indexing {} papers in project '{}'",
            documents.len(),
            project.name()
        );

        let chunked = self.chunk_documents(&documents)?;
        let chunks_indexed = self.index_chunks(project, chunked.chunks).await?;

        info!(
            "Indexed {} chunks from {} papers in '{}' ({} skipped)",
            chunks_indexed,
            chunked.documents,
            project.name(),
            chunked.skipped.len()
        );

        Ok(IndexSummary {
            project: project.name().to_string(),
            documents_indexed: chunked.documents,
            documents_skipped: chunked.skipped,
            chunks_indexed,
        })
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    if console::user_attended_stderr() && len > 1 {
        ProgressBar::new(len as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Chunking {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    }
}
