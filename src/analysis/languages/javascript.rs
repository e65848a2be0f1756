//! JavaScript and TypeScript unit extraction.
//!
//! Declarations are matched structurally with line-anchored regular
//! expressions rather than a full parse. Class methods, decorated
//! declarations and declarations that do not start a line are not
//! recognized.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::analysis::{ExtractError, Unit, UnitKind};

/// `[export] [default] [async] function[*] name(`
static FUNCTION_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:async[ \t]+)?function\b[ \t]*\*?[ \t]*(?P<name>[A-Za-z_$][\w$]*)[ \t]*(?:<[^>\n]*>[ \t]*)?\(",
    )
    .unwrap()
});

/// `[export] const|let|var name = [async] function(...)`, `(params) =>` or `param =>`
static FUNCTION_ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:const|let|var)[ \t]+(?P<name>[A-Za-z_$][\w$]*)[ \t]*(?::[^=\n]+)?=[ \t]*(?:async[ \t]+)?(?:function\b[ \t]*\*?[ \t]*[\w$]*[ \t]*\(|(?:<[^>\n]*>[ \t]*)?\([^)]*\)[ \t]*(?::[^=\n]+)?=>|[A-Za-z_$][\w$]*[ \t]*=>)",
    )
    .unwrap()
});

/// `[export] [default] [abstract] class Name`
static CLASS_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:abstract[ \t]+)?class[ \t]+(?P<name>[A-Za-z_$][\w$]*)",
    )
    .unwrap()
});

static JSDOC_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*\*.*?\*/").unwrap());

/// Extract functions and classes from JavaScript or TypeScript source.
///
/// Never fails; the `Result` matches the other extractors.
pub fn extract(source: &str) -> Result<Vec<Unit>, ExtractError> {
    let patterns = [
        (&*FUNCTION_DECL, UnitKind::Function),
        (&*FUNCTION_ASSIGN, UnitKind::Function),
        (&*CLASS_DECL, UnitKind::Class),
    ];

    let mut found: Vec<(usize, Unit)> = Vec::new();
    for (pattern, kind) in patterns {
        for caps in pattern.captures_iter(source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) else {
                continue;
            };
            let line_start = whole.start();
            if found.iter().any(|(start, _)| *start == line_start) {
                continue;
            }

            let indent = source[line_start..]
                .len()
                .saturating_sub(source[line_start..].trim_start_matches([' ', '\t']).len());
            let code_start = line_start + indent;
            let opens_params = whole.as_str().ends_with('(');
            let code_end = declaration_end(source, whole.end(), opens_params);

            found.push((
                line_start,
                Unit {
                    kind,
                    name: name.as_str().to_string(),
                    line: source[..line_start].matches('\n').count() + 1,
                    code: source[code_start..code_end].trim_end().to_string(),
                    doc: preceding_run(source, line_start),
                },
            ));
        }
    }

    found.sort_by_key(|(start, _)| *start);
    Ok(found.into_iter().map(|(_, u)| u).collect())
}

/// A unit is documented when the comment run directly above it holds a
/// `/** ... */` block.
pub fn has_jsdoc(unit: &Unit) -> bool {
    unit.doc
        .as_deref()
        .map(|d| JSDOC_BLOCK.is_match(d))
        .unwrap_or(false)
}

/// Non-blank lines directly above `line_start`, oldest first.
///
/// The run stops at a blank line, the start of the file, or a code line that
/// ends a previous statement (`;` or `}`), so a neighbour's block comment is
/// never attributed to the next declaration. Lines inside a `/* ... */`
/// block never end the run, whatever they end with.
fn preceding_run(source: &str, line_start: usize) -> Option<String> {
    let mut run: Vec<&str> = Vec::new();
    // walking upward: whether the lines above are inside a block comment
    let mut in_block = false;
    for line in source[..line_start].lines().rev() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        let is_comment = in_block
            || trimmed.starts_with('*')
            || trimmed.starts_with("/*")
            || trimmed.starts_with("//");
        if !is_comment && (trimmed.ends_with(';') || trimmed.ends_with('}')) {
            break;
        }
        run.push(line);
        in_block = opens_inside_block(trimmed, in_block);
    }
    if run.is_empty() {
        return None;
    }
    run.reverse();
    Some(run.join("\n"))
}

/// Whether `line` starts inside a block comment, given whether its end is
/// inside one.
fn opens_inside_block(line: &str, ends_inside: bool) -> bool {
    let open = line.find("/*");
    let close = line.find("*/");
    match (open, close) {
        (None, None) => ends_inside,
        (Some(_), None) => false,
        (None, Some(_)) => true,
        (Some(o), Some(c)) => c < o,
    }
}

/// End offset of a declaration starting its scan at `from`.
///
/// Returns the end of the balanced `{...}` body when one opens on the
/// declaration, otherwise the end of the declaration line.
fn declaration_end(source: &str, from: usize, opens_params: bool) -> usize {
    let bytes = source.as_bytes();
    let line_end = |at: usize| source[at..].find('\n').map(|i| at + i).unwrap_or(source.len());

    let mut parens: usize = usize::from(opens_params);
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => i = skip_string(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = line_end(i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            b'(' => {
                parens += 1;
                i += 1;
            }
            b')' => {
                parens = parens.saturating_sub(1);
                i += 1;
            }
            b'{' if parens == 0 => {
                return match balanced_close(bytes, i) {
                    Some(end) => end,
                    None => line_end(from),
                };
            }
            b'\n' | b';' if parens == 0 => return line_end(from),
            _ => i += 1,
        }
    }
    source.len()
}

/// Offset just past the `}` matching the `{` at `open`.
fn balanced_close(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_block_comment(bytes, i);
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Offset just past the string literal opening at `start`.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' if quote != b'`' => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}
