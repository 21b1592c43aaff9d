use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Failed to extract text from '{document}': {message}")]
    Extraction { document: String, message: String },

    #[error("Document '{document}' produced no chunks")]
    NoContent { document: String },

    #[error("Project '{project}' has not been indexed")]
    ProjectNotIndexed { project: String },

    #[error("Project '{project}' not found")]
    ProjectNotFound { project: String },

    #[error("Project '{project}' already exists")]
    ProjectExists { project: String },

    #[error("Invalid project name: '{0}'")]
    InvalidProjectName(String),

    #[error("Failed to index project '{project}': {message}")]
    IndexWrite { project: String, message: String },

    #[error("Collection '{collection}' holds {expected}-dimensional vectors, query has {found}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        found: usize,
    },

    #[error("Question must not be empty")]
    EmptyQuestion,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod extraction;
pub mod indexer;
pub mod llm;
pub mod projects;
pub mod pubmed;
pub mod query;
