// Query module
// Nearest-neighbour retrieval over a project's collection and grounded answers


use anyhow::Context;
use itertools::Itertools;
use tracing::{debug, info};

use crate::config::Config;
use crate::database::{SearchResult, VectorStore};
use crate::embeddings::Embedder;
use crate::llm::{ChatModel, build_prompts};
use crate::projects::Project;
use crate::{RagError, Result};

/// Retrieved context and the model's reply
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub answer: String,
    pub context: String,
    pub results: Vec<SearchResult>,
}

/// Embeds questions and searches a project's collection
pub struct Retriever<'a, E: Embedder + ?Sized> {
    config: &'a Config,
    embedder: &'a E,
}

impl<'a, E: Embedder + ?Sized> Retriever<'a, E> {
    #[inline]
    pub fn new(config: &'a Config, embedder: &'a E) -> Self {
        Self { config, embedder }
    }

    /// The `k` chunks closest to `query`, nearest first
    ///
    /// Fewer than `k` results come back when the collection is smaller.
    ///
    /// # Errors
    /// Returns `RagError::EmptyQuestion` for a blank query and
    /// `RagError::ProjectNotIndexed` when the project has no collection, both
    /// before any embedding or store access. Returns `RagError::DimensionMismatch`
    /// when the query vector does not fit the stored vectors.
    #[inline]
    pub async fn retrieve(&self, project: &Project, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let query = require_question(query)?;
        let collection = &self.config.retrieval.collection_name;
        if !project.is_indexed(collection) {
            return Err(RagError::ProjectNotIndexed {
                project: project.name().to_string(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed(query)
            .context("Failed to embed query")?;

        let store = VectorStore::open(project.index_dir()).await?;
        let expected = store.vector_dimension(collection).await?;
        if vector.len() != expected {
            return Err(RagError::DimensionMismatch {
                collection: collection.clone(),
                expected,
                found: vector.len(),
            });
        }
        let results = store.search(collection, &vector, k).await?;

        debug!(
            "Retrieved {} of {} requested chunks from '{}'",
            results.len(),
            k,
            project.name()
        );
        Ok(results)
    }

    /// Retrieve context for `question` and have `chat` answer from it
    ///
    /// # Errors
    /// Propagates retrieval errors and `RagError::Upstream` from the model
    #[inline]
    pub async fn ask<M: ChatModel + ?Sized>(
        &self,
        chat: &M,
        project: &Project,
        question: &str,
        k: usize,
    ) -> Result<Answer> {
        let results = self.retrieve(project, question, k).await?;
        let context = format_results(&results);
        info!(
            "Answering question over {} chunks from '{}'",
            results.len(),
            project.name()
        );
        let answer = answer(chat, &context, question)?;
        Ok(Answer {
            answer,
            context,
            results,
        })
    }
}

/// The question with surrounding whitespace removed
///
/// # Errors
/// Returns `RagError::EmptyQuestion` when nothing is left
#[inline]
pub fn require_question(question: &str) -> Result<&str> {
    let question = question.trim();
    if question.is_empty() {
        return Err(RagError::EmptyQuestion);
    }
    Ok(question)
}

/// Render hits as context text, one paragraph per hit
#[inline]
pub fn format_results(results: &[SearchResult]) -> String {
    results.iter().map(format_result).join("\n\n")
}

fn format_result(result: &SearchResult) -> String {
    format!(
        "{} (From: {}, Page(s): {}, Similarity: {:.4})",
        result.chunk.text,
        result.chunk.metadata.source,
        result.chunk.metadata.pages,
        result.distance
    )
}

/// Ask the model to answer `question` from `context` only
///
/// # Errors
/// Returns `RagError::Upstream` when the model call fails
#[inline]
pub fn answer<M: ChatModel + ?Sized>(chat: &M, context: &str, question: &str) -> Result<String> {
    let (system, user) = build_prompts(context, question);
    chat.complete(&system, &user)
}
