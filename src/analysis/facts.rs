//! Fact structures produced by unit extraction.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::language::Language;

/// Kind of documentable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Function,
    Class,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Function => "function",
            UnitKind::Class => "class",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A function or class found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub kind: UnitKind,
    pub name: String,
    /// Declaration line (1-indexed). For Python this is the `def`/`class`
    /// line, never a decorator line.
    pub line: usize,
    /// Exact source text of the unit.
    pub code: String,
    /// Documentation attached to the unit, in the form the language's
    /// predicate inspects: the cleaned docstring for Python, the preceding
    /// comment run for JavaScript/TypeScript.
    pub doc: Option<String>,
}

impl Unit {
    /// Whether the unit counts as documented for `language`.
    pub fn has_doc(&self, language: Language) -> bool {
        language
            .handler()
            .map(|h| (h.has_doc)(self))
            .unwrap_or(false)
    }
}

/// A unit that lacks adequate documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndocumentedItem {
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub name: String,
    pub line: usize,
    pub code: String,
}

impl From<&Unit> for UndocumentedItem {
    fn from(unit: &Unit) -> Self {
        Self {
            kind: unit.kind,
            name: unit.name.clone(),
            line: unit.line,
            code: unit.code.clone(),
        }
    }
}

/// Analysis result for one file.
///
/// Serves both as the cache payload and as a JSON report row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAnalysis {
    /// Repository-relative path.
    pub path: String,
    pub language: Language,
    pub needs_docs: bool,
    pub original_content: String,
    /// Undocumented units in source order.
    pub undocumented_items: Vec<UndocumentedItem>,
}

impl FileAnalysis {
    /// Copy of this analysis attributed to another path.
    ///
    /// Used when cached content shows up under a new name.
    pub fn with_path(&self, path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..self.clone()
        }
    }
}
