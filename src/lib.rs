//! docsmith - documentation gap filler.
//!
//! docsmith scans a repository for Python, JavaScript and TypeScript
//! functions and classes that lack documentation, asks a text generation
//! service to write it, inserts the result at the right place in each file,
//! and publishes the rewritten files as one reviewable change.
//!
//! # Architecture
//!
//! - `language`: extension-based classification and the per-language handler table
//! - `analysis`: unit extraction (tree-sitter for Python, structural matching
//!   for JS/TS) and documentation-need evaluation
//! - `cache`: two-tier analysis cache keyed by content identity
//! - `provider`: repository content access (`LocalProvider` for directories)
//! - `walker`: concurrent repository traversal producing a `ScanReport`
//! - `insert`: documentation insertion preserving every untouched line
//! - `generate`: prompts and the OpenAI-compatible generator
//! - `publish`: change publication
//! - `workflow`: the scan-generate-insert-publish pipeline
//! - `config`: YAML settings
//! - `report`: output formatting (text, JSON)

pub mod analysis;
pub mod cache;
pub mod cli;
pub mod config;
pub mod generate;
pub mod insert;
pub mod language;
pub mod provider;
pub mod publish;
pub mod report;
pub mod walker;
pub mod workflow;

pub use analysis::{FileAnalysis, FileAnalyzer, UndocumentedItem, Unit, UnitExtractor, UnitKind};
pub use cache::{AnalysisCache, CacheKey, ContentIdentity};
pub use config::Settings;
pub use insert::{apply_insertions, insert};
pub use language::{classify, Language};
pub use provider::{ContentProvider, Entry, LocalProvider};
pub use walker::{ScanReport, Scanner};
pub use workflow::{DocumentationWorkflow, Trigger, WorkflowOutcome, WorkflowStatus};
