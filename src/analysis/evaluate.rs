//! Documentation-need evaluation and file analysis assembly.

use crate::language::Language;

use super::{FileAnalysis, UndocumentedItem, Unit};

/// Apply the language's has-doc predicate to every unit.
///
/// Returns whether any unit needs documentation, plus the undocumented ones in
/// the order they were given.
pub fn evaluate(language: Language, units: &[Unit]) -> (bool, Vec<UndocumentedItem>) {
    let items: Vec<UndocumentedItem> = units
        .iter()
        .filter(|u| !u.has_doc(language))
        .map(UndocumentedItem::from)
        .collect();
    (!items.is_empty(), items)
}

/// Build the [`FileAnalysis`] for one file from its extracted units.
pub fn assemble(path: &str, language: Language, content: &str, units: &[Unit]) -> FileAnalysis {
    let (needs_docs, undocumented_items) = evaluate(language, units);
    FileAnalysis {
        path: path.to_string(),
        language,
        needs_docs,
        original_content: content.to_string(),
        undocumented_items,
    }
}
