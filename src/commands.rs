use std::path::PathBuf;

use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;
use tracing::{error, info};

use crate::config::Config;
use crate::embeddings::OllamaClient;
use crate::indexer::Indexer;
use crate::llm::ChatClient;
use crate::projects::{self, Project};
use crate::pubmed::{self, PubmedClient};
use crate::query::{Retriever, format_results, require_question};

/// Create an empty project
#[inline]
pub fn create_project(config: &Config, name: &str) -> Result<()> {
    let project = Project::create(config, name)?;
    println!(
        "{} Created project {}",
        style("✓").green(),
        style(project.name()).bold()
    );
    println!("Papers directory: {}", project.papers_dir().display());
    Ok(())
}

/// Print every project with its paper count and index state
#[inline]
pub fn list_projects(config: &Config) -> Result<()> {
    let summaries = projects::list_projects(config)?;

    if summaries.is_empty() {
        println!("No projects have been created yet.");
        println!("Use 'paper-rag create <name>' to start one.");
        return Ok(());
    }

    println!("Projects ({} total):", summaries.len());
    println!();
    for summary in &summaries {
        let state = if summary.indexed {
            style("indexed").green()
        } else {
            style("not indexed").yellow()
        };
        println!(
            "📚 {}  {} papers, {}",
            style(&summary.name).bold(),
            summary.paper_count,
            state
        );
    }
    Ok(())
}

/// Delete a project and everything in it, asking first unless `assume_yes`
#[inline]
pub fn delete_project(config: &Config, name: &str, assume_yes: bool) -> Result<()> {
    let project = Project::open(config, name)?;

    if !assume_yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete project '{}' with {} papers and its index? This cannot be undone.",
                project.name(),
                project.paper_count()?
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let project_name = project.name().to_string();
    project.delete()?;
    println!("{} Deleted project {}", style("✓").green(), project_name);
    Ok(())
}

/// Copy PDF files into a project
#[inline]
pub fn add_papers(config: &Config, name: &str, files: &[PathBuf]) -> Result<()> {
    let project = Project::open(config, name)?;
    let report = project.add_papers(files)?;

    for file in &report.added {
        println!("  {} {}", style("+").green(), file);
    }
    for file in &report.skipped {
        println!("  {} {} (not a PDF)", style("-").yellow(), file.display());
    }
    println!(
        "Added {} papers to {}. Run 'paper-rag index {}' to update the index.",
        report.added.len(),
        project.name(),
        project.name()
    );
    Ok(())
}

fn embedding_client(config: &Config) -> Result<OllamaClient> {
    let client = OllamaClient::new(&config.ollama)?;
    client
        .validate_model()
        .with_context(|| format!("Embedding model '{}' is not usable", config.ollama.model))?;
    Ok(client)
}

/// Rebuild a project's index from its papers
#[inline]
pub async fn index_project(config: &Config, name: &str) -> Result<()> {
    let project = Project::open(config, name)?;
    let embedder = embedding_client(config)?;

    println!("Indexing {}...", style(project.name()).bold());
    let summary = Indexer::new(config, &embedder)
        .index_project(&project)
        .await
        .inspect_err(|e| error!("Indexing '{}' failed: {}", project.name(), e))?;

    println!(
        "{} Indexed {} chunks from {} papers",
        style("✓").green(),
        summary.chunks_indexed,
        summary.documents_indexed
    );
    if !summary.documents_skipped.is_empty() {
        println!(
            "{} Skipped: {}",
            style("⚠").yellow(),
            summary.documents_skipped.join(", ")
        );
    }
    Ok(())
}

/// Answer a question from a project's papers
///
/// With `context_only` the retrieved context is printed and no language model is called.
#[inline]
pub async fn query_project(
    config: &Config,
    name: &str,
    question: &str,
    k: Option<usize>,
    context_only: bool,
) -> Result<()> {
    let question = require_question(question)?;
    let project = Project::open(config, name)?;
    let k = k.unwrap_or(config.retrieval.k);
    let embedder = OllamaClient::new(&config.ollama)?;
    let retriever = Retriever::new(config, &embedder);

    if context_only {
        let results = retriever.retrieve(&project, question, k).await?;
        println!("{}", format_results(&results));
        return Ok(());
    }

    let chat = ChatClient::from_config(&config.llm)?;
    let answer = retriever.ask(&chat, &project, question, k).await?;
    info!("Answered from {} chunks", answer.results.len());
    println!("{}", answer.answer);
    Ok(())
}

/// Pull PubMed abstracts for a question into a project, then answer from them
#[inline]
pub async fn pubmed_query(
    config: &Config,
    question: &str,
    papers: Option<usize>,
    project_name: &str,
) -> Result<()> {
    let question = require_question(question)?;
    let papers = papers.unwrap_or(config.retrieval.k);
    let client = PubmedClient::new(&config.pubmed);
    let embedder = embedding_client(config)?;

    let found = pubmed::update_queue(config, &client, &embedder, question, papers, project_name).await?;
    if found == 0 {
        println!("No PubMed papers found for this question.");
        return Ok(());
    }
    println!(
        "{} Indexed {} PubMed papers into {}",
        style("✓").green(),
        found,
        style(project_name).bold()
    );

    query_project(config, project_name, question, None, false).await
}
