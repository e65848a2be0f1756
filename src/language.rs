//! Language classification by file extension.
//!
//! Classification is the single point where a file is bound to a language.
//! Everything downstream (extraction, the has-doc predicate, insertion) is
//! resolved through the [`LanguageHandler`] table returned by
//! [`Language::handler`].

use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::analysis::languages::{javascript, python};
use crate::analysis::{ExtractError, Unit, UndocumentedItem};
use crate::insert::{self, InsertError};

/// Languages the scanner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Unsupported,
}

/// Extension (lowercase, without dot) to language.
static EXTENSIONS: phf::Map<&'static str, Language> = phf_map! {
    "py" => Language::Python,
    "js" => Language::JavaScript,
    "jsx" => Language::JavaScript,
    "ts" => Language::TypeScript,
    "tsx" => Language::TypeScript,
};

/// Per-language operations.
pub struct LanguageHandler {
    /// Extract documentable units from file content.
    pub extract: fn(&str) -> Result<Vec<Unit>, ExtractError>,
    /// Whether a unit carries adequate documentation.
    pub has_doc: fn(&Unit) -> bool,
    /// Insert a documentation block for one item.
    pub insert: fn(&str, &UndocumentedItem, &str) -> Result<String, InsertError>,
}

static PYTHON: LanguageHandler = LanguageHandler {
    extract: python::extract,
    has_doc: python::has_docstring,
    insert: insert::insert_docstring,
};

static JAVASCRIPT: LanguageHandler = LanguageHandler {
    extract: javascript::extract,
    has_doc: javascript::has_jsdoc,
    insert: insert::insert_block_comment,
};

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Unsupported => "unsupported",
        }
    }

    /// Look up the language for a bare extension (`"py"`, `"TSX"`).
    pub fn from_extension(ext: &str) -> Self {
        EXTENSIONS
            .get(ext.to_ascii_lowercase().as_str())
            .copied()
            .unwrap_or(Language::Unsupported)
    }

    pub fn is_supported(&self) -> bool {
        *self != Language::Unsupported
    }

    /// Operations for this language. `None` for unsupported files.
    ///
    /// TypeScript shares the JavaScript handler: the structural matcher and
    /// the TSDoc block format are the same.
    pub fn handler(&self) -> Option<&'static LanguageHandler> {
        match self {
            Language::Python => Some(&PYTHON),
            Language::JavaScript | Language::TypeScript => Some(&JAVASCRIPT),
            Language::Unsupported => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a path by its extension. Unknown extensions are `Unsupported`.
pub fn classify<P: AsRef<Path>>(path: P) -> Language {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(Language::from_extension)
        .unwrap_or(Language::Unsupported)
}
