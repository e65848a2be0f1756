//! Unit extraction and documentation-need analysis.
//!
//! This module turns the text of a single source file into a
//! [`FileAnalysis`]: the functions and classes it declares, and which of them
//! lack adequate documentation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ File content    │────▶│ Extractors   │────▶│ Units         │
//! └─────────────────┘     │ (Python,     │     │ (kind, name,  │
//!                         │  JS/TS)      │     │  line, code)  │
//!                         └──────────────┘     └───────────────┘
//!                                                      │
//!                                                      ▼
//!                         ┌──────────────┐     ┌───────────────┐
//!                         │ FileAnalysis │◀────│ Evaluator     │
//!                         │ (cached)     │     │ (has-doc)     │
//!                         └──────────────┘     └───────────────┘
//! ```
//!
//! # Adding a New Language
//!
//! 1. Create a new module in `src/analysis/languages/`
//! 2. Provide an `extract` function and a has-doc predicate
//! 3. Add an insertion routine to `crate::insert`
//! 4. Register the three in the handler table in `crate::language`

mod context;
mod evaluate;
mod facts;
pub mod languages;
mod traits;

use thiserror::Error;

pub use context::{AnalyzeError, FileAnalyzer};
pub use evaluate::{assemble, evaluate};
pub use facts::{FileAnalysis, UndocumentedItem, Unit, UnitKind};
pub use traits::{TableExtractor, UnitExtractor};

/// Errors from unit extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("syntax error near line {line}")]
    Syntax { line: usize },

    #[error("parser unavailable: {0}")]
    Parser(String),
}
