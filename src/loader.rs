//! Directory document loader.
//!
//! Walks `[documents].root`, keeps files matching the include globs and not
//! matching the exclude globs, and turns each into documents:
//!
//! | File | Documents | Metadata |
//! |------|-----------|----------|
//! | `*.pdf` | one per page | `source`, `page` (0-based), `page_label` (1-based), `total_pages` |
//! | anything else | one | `source` |
//!
//! `source` is the file path as reached from the configured root, so ids
//! stay stable as long as the root setting does. Files are visited in
//! sorted path order. A file that cannot be read or parsed is skipped with a
//! warning.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use pagerag_core::models::Document;
use pagerag_core::source::DocumentSource;

use crate::config::DocumentsConfig;

pub struct DirectoryLoader {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
    follow_symlinks: bool,
}

impl DirectoryLoader {
    pub fn new(config: &DocumentsConfig) -> Result<Self> {
        let mut excludes = vec!["**/.git/**".to_string()];
        excludes.extend(config.exclude_globs.iter().cloned());
        Ok(Self {
            root: config.root.clone(),
            include: build_globset(&config.include_globs)?,
            exclude: build_globset(&excludes)?,
            follow_symlinks: config.follow_symlinks,
        })
    }

    fn matching_files(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            bail!("Documents root does not exist: {}", self.root.display());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(self.follow_symlinks) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            let rel_str = relative.to_string_lossy();
            if self.exclude.is_match(rel_str.as_ref()) || !self.include.is_match(rel_str.as_ref())
            {
                continue;
            }
            files.push(path.to_path_buf());
        }
        files.sort();
        Ok(files)
    }
}

impl DocumentSource for DirectoryLoader {
    fn load(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for path in self.matching_files()? {
            match load_file(&path) {
                Ok(docs) => {
                    debug!(path = %path.display(), documents = docs.len(), "loaded file");
                    documents.extend(docs);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
            }
        }
        Ok(documents)
    }
}

fn load_file(path: &Path) -> Result<Vec<Document>> {
    let source = path.display().to_string();
    if is_pdf(path) {
        let bytes = std::fs::read(path)?;
        let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|e| anyhow::anyhow!("PDF extraction failed: {}", e))?;
        Ok(pdf_pages_to_documents(&source, pages))
    } else {
        let text = std::fs::read_to_string(path)?;
        Ok(vec![Document::new(text, source)])
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// One document per page, labelled with its 1-based page number.
pub fn pdf_pages_to_documents(source: &str, pages: Vec<String>) -> Vec<Document> {
    let total = pages.len();
    pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            Document::new(text, source)
                .with_metadata("page", Value::from(i))
                .with_page_label((i + 1).to_string())
                .with_metadata("total_pages", Value::from(total))
        })
        .collect()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
