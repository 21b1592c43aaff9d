// PubMed ingestion
// Searches E-utilities for a question, fetches the abstracts, and indexes them


pub mod article;

use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::config::{Config, PubmedConfig};
use crate::embeddings::Embedder;
use crate::indexer::Indexer;
use crate::projects::Project;
use crate::{RagError, Result};

pub use article::{PubmedArticle, parse_articles};

/// Project that receives PubMed abstracts unless another is named
pub const DEFAULT_QUEUE_PROJECT: &str = "pubmed_queue";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    esearchresult: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// Blocking client for the esearch and efetch endpoints
#[derive(Debug, Clone)]
pub struct PubmedClient {
    base_url: String,
    agent: ureq::Agent,
}

impl PubmedClient {
    #[inline]
    pub fn new(config: &PubmedConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ids of up to `k` articles matching `query`, in relevance order
    ///
    /// # Errors
    /// Returns `RagError::Upstream` if the request fails or the reply is not a search result
    #[inline]
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let retmax = k.to_string();
        let body = self
            .get(
                "esearch.fcgi",
                &[
                    ("db", "pubmed"),
                    ("term", query),
                    ("retmode", "json"),
                    ("retmax", &retmax),
                ],
            )
            .map_err(upstream)?;

        let response: SearchResponse = serde_json::from_str(&body)
            .context("Failed to parse esearch response")
            .map_err(upstream)?;
        debug!(
            "esearch returned {} ids for {:?}",
            response.esearchresult.idlist.len(),
            query
        );
        Ok(response.esearchresult.idlist)
    }

    /// Raw efetch XML for the given ids
    ///
    /// # Errors
    /// Returns `RagError::Upstream` if the request fails
    #[inline]
    pub fn fetch(&self, ids: &[String]) -> Result<String> {
        let id_list = ids.join(",");
        self.get(
            "efetch.fcgi",
            &[("db", "pubmed"), ("id", &id_list), ("retmode", "xml")],
        )
        .map_err(upstream)
    }

    fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> anyhow::Result<String> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, endpoint))
            .with_context(|| format!("Invalid PubMed base URL: {}", self.base_url))?;
        url.query_pairs_mut().extend_pairs(params);

        debug!("GET {}", url);
        self.agent
            .get(url.as_str())
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| match e {
                ureq::Error::StatusCode(status) => {
                    anyhow!("{} request failed with HTTP {}", endpoint, status)
                }
                other => anyhow!("{} request failed: {}", endpoint, other),
            })
    }
}

fn upstream(error: anyhow::Error) -> RagError {
    RagError::Upstream(format!("{:#}", error))
}

/// Pull the `k` best PubMed matches for `query` into `project_name` and reindex it
///
/// A search with no hits returns 0 without creating the project or touching its
/// collection. Otherwise the project is created if needed and its collection is
/// replaced with the fetched abstracts. Returns the number of parsed articles.
///
/// # Errors
/// Returns `RagError::Upstream` for PubMed failures and `RagError::IndexWrite`
/// when the collection cannot be rebuilt
#[inline]
pub async fn update_queue<E: Embedder + ?Sized>(
    config: &Config,
    client: &PubmedClient,
    embedder: &E,
    query: &str,
    k: usize,
    project_name: &str,
) -> Result<usize> {
    info!("Searching PubMed for the top {} papers on {:?}", k, query);
    let ids = client.search(query, k)?;
    if ids.is_empty() {
        info!("No PubMed papers found for {:?}", query);
        return Ok(0);
    }
    info!("Found {} PubMed papers: {}", ids.len(), ids.join(", "));

    let xml = client.fetch(&ids)?;
    let articles = parse_articles(&xml)?;
    info!("Parsed {} PubMed articles", articles.len());

    let project = Project::open_or_create(config, project_name)?;
    if config.pubmed.save_papers {
        save_articles(&project, &articles)?;
    }

    let indexer = Indexer::new(config, embedder);
    let chunked = indexer.chunk_documents(&articles)?;
    let chunks = indexer.index_chunks(&project, chunked.chunks).await?;
    info!(
        "Indexed {} chunks from {} PubMed articles into '{}'",
        chunks,
        chunked.documents,
        project.name()
    );

    Ok(articles.len())
}

fn save_articles(project: &Project, articles: &[PubmedArticle]) -> Result<()> {
    let papers_dir = project.papers_dir();
    std::fs::create_dir_all(&papers_dir)?;
    for article in articles {
        let path = papers_dir.join(article.file_name());
        std::fs::write(&path, article.full_text())?;
        debug!("Saved {}", path.display());
    }
    Ok(())
}
