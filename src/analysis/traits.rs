//! Core traits for unit extraction.

use crate::language::Language;

use super::{ExtractError, Unit};

/// Turns file content into documentable units.
///
/// The default implementation is [`TableExtractor`], which dispatches through
/// the language handler table. The trait exists so the analyzer can be handed
/// an instrumented extractor.
pub trait UnitExtractor: Send + Sync {
    /// Extract units in source order. Unsupported languages yield nothing.
    fn extract(&self, language: Language, content: &str) -> Result<Vec<Unit>, ExtractError>;
}

/// Extractor backed by [`Language::handler`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TableExtractor;

impl UnitExtractor for TableExtractor {
    fn extract(&self, language: Language, content: &str) -> Result<Vec<Unit>, ExtractError> {
        match language.handler() {
            Some(handler) => (handler.extract)(content),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_yields_nothing() {
        let units = TableExtractor
            .extract(Language::Unsupported, "def foo():\n    pass\n")
            .unwrap();
        assert!(units.is_empty());
    }

    #[test]
    fn test_dispatches_by_language() {
        let py = TableExtractor
            .extract(Language::Python, "def foo():\n    pass\n")
            .unwrap();
        assert_eq!(py.len(), 1);

        let ts = TableExtractor
            .extract(Language::TypeScript, "export class Foo {}\n")
            .unwrap();
        assert_eq!(ts.len(), 1);
        assert_eq!(ts[0].name, "Foo");
    }
}
