// Project store
// Each project owns a papers/ directory and a vector_index/ directory

#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::database::lancedb::vector_store::collection_path;
use crate::{RagError, Result};

const PAPERS_DIR: &str = "papers";
const INDEX_DIR: &str = "vector_index";

/// Make a user-supplied name safe to use as a single path component
///
/// Non-ASCII characters are dropped, path separators become spaces, whitespace
/// runs become `_`, anything outside `[A-Za-z0-9_.-]` is removed and leading or
/// trailing `.`/`_` are stripped.
///
/// # Errors
/// Returns `RagError::InvalidProjectName` if nothing usable remains
#[inline]
pub fn sanitize_name(name: &str) -> Result<String> {
    let spaced: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let sanitized = kept.trim_matches(['.', '_']);

    if sanitized.is_empty() {
        return Err(RagError::InvalidProjectName(name.to_string()));
    }
    Ok(sanitized.to_string())
}

/// Summary row for project listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub name: String,
    pub paper_count: usize,
    pub indexed: bool,
}

/// Outcome of copying files into a project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    /// Stored file names
    pub added: Vec<String>,
    /// Inputs that were not PDFs
    pub skipped: Vec<PathBuf>,
}

/// A project directory on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    name: String,
    root: PathBuf,
}

impl Project {
    /// Create a new, empty project
    ///
    /// # Errors
    /// Returns `RagError::ProjectExists` if the project is already present
    #[inline]
    pub fn create(config: &Config, name: &str) -> Result<Self> {
        let name = sanitize_name(name)?;
        let root = config.projects_dir().join(&name);
        if root.exists() {
            return Err(RagError::ProjectExists { project: name });
        }

        fs::create_dir_all(root.join(PAPERS_DIR))?;
        info!("Created project '{}' at {}", name, root.display());
        Ok(Self { name, root })
    }

    /// # Errors
    /// Returns `RagError::ProjectNotFound` if the project directory is missing
    #[inline]
    pub fn open(config: &Config, name: &str) -> Result<Self> {
        let name = sanitize_name(name)?;
        let root = config.projects_dir().join(&name);
        if !root.is_dir() {
            return Err(RagError::ProjectNotFound { project: name });
        }
        Ok(Self { name, root })
    }

    /// # Errors
    /// Returns an error if the name is invalid or the directory cannot be created
    #[inline]
    pub fn open_or_create(config: &Config, name: &str) -> Result<Self> {
        match Self::open(config, name) {
            Err(RagError::ProjectNotFound { .. }) => Self::create(config, name),
            other => other,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn papers_dir(&self) -> PathBuf {
        self.root.join(PAPERS_DIR)
    }

    #[inline]
    pub fn index_dir(&self) -> PathBuf {
        self.root.join(INDEX_DIR)
    }

    /// Whether the collection's table exists on disk
    #[inline]
    pub fn is_indexed(&self, collection: &str) -> bool {
        collection_path(&self.index_dir(), collection).is_dir()
    }

    /// Sorted paths of the project's PDF files
    ///
    /// # Errors
    /// Returns an I/O error if the papers directory cannot be read
    #[inline]
    pub fn paper_paths(&self) -> Result<Vec<PathBuf>> {
        let papers_dir = self.papers_dir();
        if !papers_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&papers_dir)? {
            let path = entry?.path();
            if path.is_file() && is_pdf(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// # Errors
    /// Returns an I/O error if the papers directory cannot be read
    #[inline]
    pub fn paper_count(&self) -> Result<usize> {
        Ok(self.paper_paths()?.len())
    }

    /// Copy PDF files into the project under sanitized names
    ///
    /// Files without a `.pdf` extension are reported as skipped.
    ///
    /// # Errors
    /// Returns an I/O error if a PDF cannot be copied
    #[inline]
    pub fn add_papers<P: AsRef<Path>>(&self, files: &[P]) -> Result<AddReport> {
        let papers_dir = self.papers_dir();
        fs::create_dir_all(&papers_dir)?;

        let mut report = AddReport::default();
        for file in files {
            let source = file.as_ref();
            let file_name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .and_then(|n| sanitize_name(&n).ok());

            let Some(file_name) = file_name.filter(|n| is_pdf(Path::new(n))) else {
                warn!("Skipping non-PDF file {}", source.display());
                report.skipped.push(source.to_path_buf());
                continue;
            };

            fs::copy(source, papers_dir.join(&file_name))?;
            debug!("Added {} to project '{}'", file_name, self.name);
            report.added.push(file_name);
        }

        info!(
            "Added {} papers to project '{}' ({} skipped)",
            report.added.len(),
            self.name,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Remove the project directory and everything in it
    ///
    /// # Errors
    /// Returns an I/O error if the directory cannot be removed
    #[inline]
    pub fn delete(self) -> Result<()> {
        fs::remove_dir_all(&self.root)?;
        info!("Deleted project '{}'", self.name);
        Ok(())
    }
}

/// Every project with its paper count and indexed flag, sorted by name
///
/// # Errors
/// Returns an I/O error if the projects directory cannot be read
#[inline]
pub fn list_projects(config: &Config) -> Result<Vec<ProjectSummary>> {
    let projects_dir = config.projects_dir();
    if !projects_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut summaries = Vec::new();
    for entry in fs::read_dir(&projects_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let project = Project {
            name: entry.file_name().to_string_lossy().into_owned(),
            root: entry.path(),
        };
        summaries.push(ProjectSummary {
            paper_count: project.paper_count()?,
            indexed: project.is_indexed(&config.retrieval.collection_name),
            name: project.name,
        });
    }

    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(summaries)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
