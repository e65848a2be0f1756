//! Python unit extraction using tree-sitter.

use once_cell::sync::OnceCell;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, Tree};

use crate::analysis::{ExtractError, Unit, UnitKind};

const DECLARATION_QUERY: &str = r#"
; Function definitions, sync and async, at any depth
(function_definition
  name: (identifier) @func_name
) @function

; Class definitions
(class_definition
  name: (identifier) @class_name
) @class
"#;

/// Docstrings at or below this many characters do not count as documentation.
pub const MIN_DOCSTRING_CHARS: usize = 10;

pub struct PythonExtractor {
    language: Language,
    query: Query,
}

static EXTRACTOR: OnceCell<PythonExtractor> = OnceCell::new();

impl PythonExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let query = Query::new(&language, DECLARATION_QUERY)
            .map_err(|e| ExtractError::Parser(e.to_string()))?;
        Ok(Self { language, query })
    }

    /// Shared instance. The grammar and query are built once.
    pub fn shared() -> Result<&'static PythonExtractor, ExtractError> {
        EXTRACTOR.get_or_try_init(PythonExtractor::new)
    }

    fn parse(&self, source: &str) -> Result<Tree, ExtractError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ExtractError::Parser(e.to_string()))?;
        parser
            .parse(source, None)
            .ok_or_else(|| ExtractError::Parser("parser returned no tree".to_string()))
    }

    pub fn extract(&self, source: &str) -> Result<Vec<Unit>, ExtractError> {
        let tree = self.parse(source)?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(ExtractError::Syntax {
                line: first_error_line(root),
            });
        }

        let bytes = source.as_bytes();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.query, root, bytes);

        let mut units = Vec::new();
        let mut seen = std::collections::HashSet::new();

        while let Some(m) = matches.next() {
            let mut name = String::new();
            let mut kind = UnitKind::Function;
            let mut decl_node = None;

            for capture in m.captures {
                let capture_name = self.query.capture_names()[capture.index as usize];
                match capture_name {
                    "func_name" => {
                        name = node_text(capture.node, bytes).to_string();
                        kind = UnitKind::Function;
                    }
                    "class_name" => {
                        name = node_text(capture.node, bytes).to_string();
                        kind = UnitKind::Class;
                    }
                    "function" | "class" => decl_node = Some(capture.node),
                    _ => {}
                }
            }

            let Some(node) = decl_node else { continue };
            if name.is_empty() || !seen.insert(node.start_byte()) {
                continue;
            }

            units.push((
                node.start_byte(),
                Unit {
                    kind,
                    name,
                    line: node.start_position().row + 1,
                    code: node_text(node, bytes).to_string(),
                    doc: docstring(node, bytes),
                },
            ));
        }

        units.sort_by_key(|(start, _)| *start);
        Ok(units.into_iter().map(|(_, u)| u).collect())
    }
}

/// Extract units from Python source.
pub fn extract(source: &str) -> Result<Vec<Unit>, ExtractError> {
    PythonExtractor::shared()?.extract(source)
}

/// A unit is documented when its cleaned docstring is longer than
/// [`MIN_DOCSTRING_CHARS`].
pub fn has_docstring(unit: &Unit) -> bool {
    unit.doc
        .as_deref()
        .map(|d| d.trim().chars().count() > MIN_DOCSTRING_CHARS)
        .unwrap_or(false)
}

fn node_text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// Line (1-indexed) of the first error or missing node, depth first.
fn first_error_line(root: Node) -> usize {
    let mut node = root;
    'descend: loop {
        if node.is_error() || node.is_missing() {
            return node.start_position().row + 1;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.is_error() || child.is_missing() || child.has_error() {
                node = child;
                continue 'descend;
            }
        }
        return node.start_position().row + 1;
    }
}

/// Cleaned docstring of a function or class node, if its body opens with one.
fn docstring(decl: Node, source: &[u8]) -> Option<String> {
    let body = decl.child_by_field_name("body")?;
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }

    let expr = first.named_child(0)?;
    let raw = match expr.kind() {
        "string" => string_value(node_text(expr, source))?,
        "concatenated_string" => {
            let mut cursor = expr.walk();
            let mut joined = String::new();
            for part in expr.named_children(&mut cursor) {
                if part.kind() == "string" {
                    joined.push_str(&string_value(node_text(part, source))?);
                }
            }
            joined
        }
        _ => return None,
    };
    Some(clean_docstring(&raw))
}

/// Body of a string literal with its prefix and quotes removed.
///
/// Bytes and f-strings are not docstrings and yield `None`.
fn string_value(literal: &str) -> Option<String> {
    let quote_at = literal.find(['"', '\''])?;
    let prefix = literal[..quote_at].to_ascii_lowercase();
    if prefix.contains('b') || prefix.contains('f') {
        return None;
    }
    let quoted = &literal[quote_at..];
    for delim in ["\"\"\"", "'''", "\"", "'"] {
        if quoted.len() >= delim.len() * 2 && quoted.starts_with(delim) && quoted.ends_with(delim)
        {
            return Some(quoted[delim.len()..quoted.len() - delim.len()].to_string());
        }
    }
    None
}

/// Normalize docstring indentation: tabs expanded, the first line stripped,
/// the common indentation of the remaining lines removed, and leading and
/// trailing blank lines dropped.
pub fn clean_docstring(raw: &str) -> String {
    let expanded = raw.replace('\t', "        ");
    let lines: Vec<&str> = expanded.lines().collect();
    if lines.is_empty() {
        return String::new();
    }

    let margin = lines[1..]
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
    cleaned.push(lines[0].trim_start().to_string());
    for line in &lines[1..] {
        let cut = margin.min(line.len() - line.trim_start().len());
        cleaned.push(line[cut..].trim_end().to_string());
    }

    while cleaned.first().is_some_and(|l| l.trim().is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|l| l.trim().is_empty()) {
        cleaned.pop();
    }
    cleaned.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(source: &str) -> Vec<Unit> {
        extract(source).unwrap()
    }

    #[test]
    fn test_undocumented_function() {
        let found = units("def foo():\n    return 1\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "foo");
        assert_eq!(found[0].kind, UnitKind::Function);
        assert_eq!(found[0].line, 1);
        assert_eq!(found[0].code, "def foo():\n    return 1");
        assert!(!has_docstring(&found[0]));
    }

    #[test]
    fn test_docstring_length_boundary() {
        // exactly 10 characters
        let short = units("def a():\n    \"\"\"0123456789\"\"\"\n    return 1\n");
        assert!(!has_docstring(&short[0]));

        // 11 characters
        let long = units("def a():\n    \"\"\"0123456789X\"\"\"\n    return 1\n");
        assert!(has_docstring(&long[0]));
    }

    #[test]
    fn test_docstring_is_cleaned_before_counting() {
        let source = "def a():\n    \"\"\"\n    short\n    \"\"\"\n";
        let found = units(source);
        assert_eq!(found[0].doc.as_deref(), Some("short"));
        assert!(!has_docstring(&found[0]));
    }

    #[test]
    fn test_classes_nested_and_async() {
        let source = r#"
class Service:
    """Coordinates the background jobs."""

    async def run(self):
        def helper():
            return 2
        return helper()
"#;
        let found = units(source);
        let names: Vec<_> = found.iter().map(|u| (u.name.as_str(), u.kind)).collect();
        assert_eq!(
            names,
            vec![
                ("Service", UnitKind::Class),
                ("run", UnitKind::Function),
                ("helper", UnitKind::Function),
            ]
        );
        assert!(has_docstring(&found[0]));
        assert_eq!(found[1].line, 5);
        assert!(found[1].code.starts_with("async def run"));
    }

    #[test]
    fn test_decorator_line_excluded() {
        let source = "@cache\n@other(1)\ndef cached():\n    pass\n";
        let found = units(source);
        assert_eq!(found[0].line, 3);
        assert!(found[0].code.starts_with("def cached"));
    }

    #[test]
    fn test_comment_before_docstring() {
        let source = "def a():\n    # note\n    \"\"\"Explains what a does.\"\"\"\n";
        assert!(has_docstring(&units(source)[0]));
    }

    #[test]
    fn test_non_docstring_strings() {
        let fstring = units("def a():\n    f\"value {x} is long enough\"\n");
        assert!(fstring[0].doc.is_none());

        let assigned = units("def a():\n    x = \"not a docstring at all\"\n");
        assert!(assigned[0].doc.is_none());

        let raw = units("def a():\n    r'''Raw docstrings count too.'''\n");
        assert!(has_docstring(&raw[0]));
    }

    #[test]
    fn test_no_units() {
        assert!(units("import os\n\nVALUE = 3\n").is_empty());
        assert!(units("").is_empty());
    }

    #[test]
    fn test_syntax_error_is_hard_error() {
        let err = extract("def broken(:\n    pass\n").unwrap_err();
        assert!(matches!(err, ExtractError::Syntax { line: 1 }));
    }

    #[test]
    fn test_clean_docstring_margin() {
        let cleaned = clean_docstring("Summary.\n\n        Args:\n            x: value\n    ");
        assert_eq!(cleaned, "Summary.\n\nArgs:\n    x: value");
    }
}
