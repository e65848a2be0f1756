//! Repository traversal.
//!
//! The [`Scanner`] walks a repository through a [`ContentProvider`] level by
//! level, classifies every file, and hands supported files to the
//! [`FileAnalyzer`]. Directory listings and file analyses both run
//! concurrently up to `concurrency` at a time.

use futures::stream::{self, StreamExt};
use globset::GlobSet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analysis::{AnalyzeError, FileAnalysis, FileAnalyzer};
use crate::config::ScanConfig;
use crate::language::{classify, Language};
use crate::provider::{ContentProvider, Entry, ProviderError};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot list repository root: {0}")]
    Root(#[source] ProviderError),
}

/// Pipeline stage at which a file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Listing,
    Reading,
    Parsing,
    Generation,
    Insertion,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Listing => "listing",
            FailureStage::Reading => "reading",
            FailureStage::Parsing => "parsing",
            FailureStage::Generation => "generation",
            FailureStage::Insertion => "insertion",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A file-scoped error. The rest of the scan carries on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub stage: FailureStage,
    pub message: String,
}

impl FileFailure {
    pub fn new(path: impl Into<String>, stage: FailureStage, message: impl fmt::Display) -> Self {
        Self {
            path: path.into(),
            stage,
            message: message.to_string(),
        }
    }
}

/// Result of scanning one repository.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub repository: String,
    /// Analyses of supported files, keyed by path.
    pub analyses: BTreeMap<String, FileAnalysis>,
    pub failures: Vec<FileFailure>,
    /// Files skipped because their language is unsupported.
    pub unsupported: usize,
    /// Files skipped for exceeding the size limit.
    pub oversized: usize,
}

impl ScanReport {
    pub fn needs_docs(&self) -> bool {
        self.analyses.values().any(|a| a.needs_docs)
    }

    /// Analyses with at least one undocumented item, in path order.
    pub fn files_needing_docs(&self) -> impl Iterator<Item = &FileAnalysis> {
        self.analyses.values().filter(|a| a.needs_docs)
    }

    pub fn undocumented_count(&self) -> usize {
        self.analyses
            .values()
            .map(|a| a.undocumented_items.len())
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub concurrency: usize,
    pub excluded: GlobSet,
    pub max_file_bytes: u64,
}

impl ScanOptions {
    pub fn from_config(config: &ScanConfig) -> anyhow::Result<Self> {
        Ok(Self {
            concurrency: config.concurrency.max(1),
            excluded: config.excluded_globset()?,
            max_file_bytes: config.max_file_bytes,
        })
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            excluded: GlobSet::empty(),
            max_file_bytes: 1024 * 1024,
        }
    }
}

pub struct Scanner {
    provider: Arc<dyn ContentProvider>,
    analyzer: Arc<FileAnalyzer>,
    options: ScanOptions,
}

/// Entries of one listing, sorted into what to do next.
#[derive(Default)]
struct Partition {
    dirs: Vec<Entry>,
    files: Vec<(Entry, Language)>,
    unsupported: usize,
    oversized: usize,
}

impl Scanner {
    pub fn new(
        provider: Arc<dyn ContentProvider>,
        analyzer: Arc<FileAnalyzer>,
        options: ScanOptions,
    ) -> Self {
        Self {
            provider,
            analyzer,
            options,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.options.concurrency.max(1)
    }

    fn partition(&self, entries: Vec<Entry>, into: &mut Partition) {
        for entry in entries {
            if self.options.excluded.is_match(&entry.path) {
                debug!(path = %entry.path, "excluded");
                continue;
            }
            if entry.is_dir() {
                into.dirs.push(entry);
                continue;
            }

            let language = classify(&entry.path);
            if !language.is_supported() {
                into.unsupported += 1;
                continue;
            }
            if entry.size.is_some_and(|s| s > self.options.max_file_bytes) {
                debug!(path = %entry.path, size = ?entry.size, "skipping oversized file");
                into.oversized += 1;
                continue;
            }
            into.files.push((entry, language));
        }
    }

    /// Scan `repository` from its root.
    pub async fn scan(&self, repository: &str) -> Result<ScanReport, ScanError> {
        info!(repository, "scanning repository");
        let root = self
            .provider
            .list_contents("")
            .await
            .map_err(ScanError::Root)?;

        let mut report = ScanReport {
            repository: repository.to_string(),
            ..ScanReport::default()
        };
        let mut found = Partition::default();
        self.partition(root, &mut found);

        // Breadth first: each round lists every directory found in the last.
        while !found.dirs.is_empty() {
            let dirs = std::mem::take(&mut found.dirs);
            let listings: Vec<(String, Result<Vec<Entry>, ProviderError>)> = stream::iter(dirs)
                .map(|dir| async move {
                    let listing = self.provider.list_contents(&dir.path).await;
                    (dir.path, listing)
                })
                .buffer_unordered(self.concurrency())
                .collect()
                .await;

            for (path, listing) in listings {
                match listing {
                    Ok(entries) => self.partition(entries, &mut found),
                    Err(e) => {
                        warn!(path = %path, error = %e, "cannot list directory");
                        report
                            .failures
                            .push(FileFailure::new(path, FailureStage::Listing, e));
                    }
                }
            }
        }
        report.unsupported = found.unsupported;
        report.oversized = found.oversized;

        debug!(repository, files = found.files.len(), "analyzing files");
        let results: Vec<(String, Result<FileAnalysis, AnalyzeError>)> =
            stream::iter(found.files)
                .map(|(entry, language)| async move {
                    let result = self
                        .analyzer
                        .analyze(repository, self.provider.as_ref(), &entry, language)
                        .await;
                    (entry.path, result)
                })
                .buffer_unordered(self.concurrency())
                .collect()
                .await;

        for (path, result) in results {
            match result {
                Ok(analysis) => {
                    report.analyses.insert(path, analysis);
                }
                Err(e) => {
                    let stage = match e {
                        AnalyzeError::Provider(_) => FailureStage::Reading,
                        AnalyzeError::Extract { .. } => FailureStage::Parsing,
                    };
                    warn!(path = %path, %stage, error = %e, "file analysis failed");
                    report.failures.push(FileFailure::new(path, stage, e));
                }
            }
        }
        report.failures.sort_by(|a, b| a.path.cmp(&b.path));

        info!(
            repository,
            files = report.analyses.len(),
            needing_docs = report.files_needing_docs().count(),
            undocumented = report.undocumented_count(),
            failures = report.failures.len(),
            "scan complete"
        );
        Ok(report)
    }
}
