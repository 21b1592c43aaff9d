use std::path::PathBuf;

use clap::{Parser, Subcommand};
use paper_rag::Result;
use paper_rag::commands::{
    add_papers, create_project, delete_project, index_project, list_projects, pubmed_query,
    query_project,
};
use paper_rag::config::{Config, run_interactive_config, show_config};
use paper_rag::pubmed::DEFAULT_QUEUE_PROJECT;

#[derive(Parser)]
#[command(name = "paper-rag")]
#[command(about = "Index research papers per project and answer questions from them")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the projects (defaults to the user data directory)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding model, language model and chunking
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Create a new project
    Create {
        /// Project name
        name: String,
    },
    /// List all projects
    List,
    /// Delete a project with its papers and index
    Delete {
        /// Project name
        name: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Copy PDF papers into a project
    Add {
        /// Project name
        name: String,
        /// PDF files to add
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Rebuild a project's index from its papers
    Index {
        /// Project name
        name: String,
    },
    /// Ask a question about a project's papers
    Query {
        /// Project name
        name: String,
        /// The question
        question: String,
        /// Number of chunks to retrieve
        #[arg(long)]
        k: Option<usize>,
        /// Print the retrieved context without calling the language model
        #[arg(long)]
        context_only: bool,
    },
    /// Fetch PubMed abstracts for a question, index them and answer
    Pubmed {
        /// The question, also used as the PubMed search term
        question: String,
        /// Number of papers to fetch
        #[arg(long)]
        k: Option<usize>,
        /// Project receiving the abstracts
        #[arg(long, default_value = DEFAULT_QUEUE_PROJECT)]
        project: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => Config::default_base_dir().map_err(|e| paper_rag::RagError::Config(e.to_string()))?,
    };

    if let Commands::Config { show } = cli.command {
        if show {
            show_config(&Config::load(&base_dir)?);
        } else {
            run_interactive_config(&base_dir)?;
        }
        return Ok(());
    }

    let config = Config::load(&base_dir)?;
    match cli.command {
        Commands::Config { .. } => {}
        Commands::Create { name } => create_project(&config, &name)?,
        Commands::List => list_projects(&config)?,
        Commands::Delete { name, yes } => delete_project(&config, &name, yes)?,
        Commands::Add { name, files } => add_papers(&config, &name, &files)?,
        Commands::Index { name } => index_project(&config, &name).await?,
        Commands::Query {
            name,
            question,
            k,
            context_only,
        } => query_project(&config, &name, &question, k, context_only).await?,
        Commands::Pubmed {
            question,
            k,
            project,
        } => pubmed_query(&config, &question, k, &project).await?,
    }

    Ok(())
}
