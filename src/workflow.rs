//! Scan-and-document workflow.
//!
//! One run scans a repository, asks the generator for documentation of every
//! undocumented item, inserts it, and publishes the rewritten files as a
//! single change. A file is only published when every one of its items was
//! generated and inserted.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::analysis::{FileAnalysis, TableExtractor, UndocumentedItem, UnitExtractor};
use crate::generate::{build_prompt, clean_response, Generator};
use crate::insert::apply_insertions;
use crate::publish::{branch_name, ChangePublisher, ChangeRequest, PublishError};
use crate::walker::{FailureStage, FileFailure, ScanError, Scanner};

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("publishing failed: {0}")]
    Publish(#[from] PublishError),
}

/// What started the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Push,
    PullRequest,
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trigger::Push => "push",
            Trigger::PullRequest => "pull_request",
            Trigger::Manual => "manual",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedChange {
    pub url: String,
    pub branch: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "count", rename_all = "snake_case")]
pub enum WorkflowStatus {
    NoDocumentationNeeded,
    Documented,
    DocumentedWithErrors(usize),
    Failed(usize),
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    pub repository: String,
    pub trigger: Trigger,
    pub scanned_files: usize,
    pub documented_items: usize,
    pub change: Option<PublishedChange>,
    pub failures: Vec<FileFailure>,
}

impl WorkflowOutcome {
    pub fn status(&self) -> WorkflowStatus {
        match (&self.change, self.failures.len()) {
            (Some(_), 0) => WorkflowStatus::Documented,
            (Some(_), n) => WorkflowStatus::DocumentedWithErrors(n),
            (None, 0) => WorkflowStatus::NoDocumentationNeeded,
            (None, n) => WorkflowStatus::Failed(n),
        }
    }
}

pub struct DocumentationWorkflow {
    scanner: Scanner,
    generator: Arc<dyn Generator>,
    publisher: Arc<dyn ChangePublisher>,
    branch_prefix: String,
}

impl DocumentationWorkflow {
    pub fn new(
        scanner: Scanner,
        generator: Arc<dyn Generator>,
        publisher: Arc<dyn ChangePublisher>,
        branch_prefix: impl Into<String>,
    ) -> Self {
        Self {
            scanner,
            generator,
            publisher,
            branch_prefix: branch_prefix.into(),
        }
    }

    pub async fn run(
        &self,
        repository: &str,
        trigger: Trigger,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        info!(repository, %trigger, "documentation workflow started");
        let report = self.scanner.scan(repository).await?;

        let mut outcome = WorkflowOutcome {
            repository: repository.to_string(),
            trigger,
            scanned_files: report.analyses.len(),
            documented_items: 0,
            change: None,
            failures: report.failures.clone(),
        };

        let targets: Vec<&FileAnalysis> = report.files_needing_docs().collect();
        if targets.is_empty() {
            info!(repository, "no documentation needed");
            return Ok(outcome);
        }

        let results: Vec<(String, usize, Result<String, FileFailure>)> = stream::iter(targets)
            .map(|analysis| async move {
                let result = self.document_file(analysis).await;
                (
                    analysis.path.clone(),
                    analysis.undocumented_items.len(),
                    result,
                )
            })
            .buffer_unordered(self.scanner.concurrency())
            .collect()
            .await;

        let mut changes = BTreeMap::new();
        for (path, items, result) in results {
            match result {
                Ok(content) => {
                    outcome.documented_items += items;
                    changes.insert(path, content);
                }
                Err(failure) => outcome.failures.push(failure),
            }
        }
        outcome.failures.sort_by(|a, b| a.path.cmp(&b.path));

        if changes.is_empty() {
            warn!(repository, failures = outcome.failures.len(), "no file could be documented");
            return Ok(outcome);
        }

        let request = ChangeRequest {
            repository: repository.to_string(),
            branch_name: branch_name(&self.branch_prefix),
            changes,
        };
        let url = self.publisher.publish(&request).await?;
        outcome.change = Some(PublishedChange {
            url,
            branch: request.branch_name,
            files: request.changes.into_keys().collect(),
        });

        info!(
            repository,
            status = ?outcome.status(),
            documented = outcome.documented_items,
            "documentation workflow finished"
        );
        Ok(outcome)
    }

    /// Generate and insert documentation for every item of one file.
    ///
    /// Items are generated in source order; the first failure abandons the
    /// file so it is never published half-documented.
    async fn document_file(&self, analysis: &FileAnalysis) -> Result<String, FileFailure> {
        let language = analysis.language;
        let path = analysis.path.as_str();

        let mut docs: Vec<(UndocumentedItem, String)> =
            Vec::with_capacity(analysis.undocumented_items.len());
        for item in &analysis.undocumented_items {
            let prompt = build_prompt(language, item).ok_or_else(|| {
                FileFailure::new(path, FailureStage::Generation, format!("no prompt for {}", language))
            })?;

            let raw = self.generator.generate(&prompt).await.map_err(|e| {
                warn!(path, item = %item.name, error = %e, "generation failed");
                FileFailure::new(path, FailureStage::Generation, format!("{}: {}", item.name, e))
            })?;

            let text = clean_response(language, &raw);
            if text.is_empty() {
                warn!(path, item = %item.name, "generator returned only delimiters");
                return Err(FileFailure::new(
                    path,
                    FailureStage::Generation,
                    format!("{}: empty documentation", item.name),
                ));
            }
            debug!(path, item = %item.name, "documentation generated");
            docs.push((item.clone(), text));
        }

        let documented = apply_insertions(language, &analysis.original_content, &docs)
            .map_err(|e| {
                error!(path, error = %e, "insertion failed");
                FileFailure::new(path, FailureStage::Insertion, e)
            })?;

        // The rewritten file must still parse.
        TableExtractor.extract(language, &documented).map_err(|e| {
            error!(path, error = %e, "documented file no longer parses");
            FileFailure::new(
                path,
                FailureStage::Insertion,
                format!("documented content no longer parses: {}", e),
            )
        })?;

        info!(path, items = docs.len(), "file documented");
        Ok(documented)
    }
}
