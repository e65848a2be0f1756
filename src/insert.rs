//! Documentation insertion.
//!
//! Rewrites file content so each undocumented item carries a documentation
//! block: a docstring as the first statement of a Python body, or a `/** */`
//! block directly above a JavaScript/TypeScript declaration. Every line not
//! touched by an insertion is reproduced byte for byte, including its line
//! ending, and the presence of a final newline is preserved.

use thiserror::Error;

use crate::analysis::UndocumentedItem;
use crate::language::Language;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InsertError {
    #[error("{name}: line {line} is outside the file ({line_count} lines)")]
    LineOutOfRange {
        name: String,
        line: usize,
        line_count: usize,
    },

    #[error("{name}: no header terminator found from line {line}")]
    HeaderNotFound { name: String, line: usize },

    #[error("cannot insert documentation into {0} files")]
    UnsupportedLanguage(Language),
}

/// Insert documentation `text` for one item.
pub fn insert(
    language: Language,
    original: &str,
    item: &UndocumentedItem,
    text: &str,
) -> Result<String, InsertError> {
    let handler = language
        .handler()
        .ok_or(InsertError::UnsupportedLanguage(language))?;
    (handler.insert)(original, item, text)
}

/// Insert documentation for several items of one file.
///
/// Items are applied bottom-up (descending line) so earlier insertions never
/// shift the lines of later ones.
pub fn apply_insertions(
    language: Language,
    original: &str,
    items: &[(UndocumentedItem, String)],
) -> Result<String, InsertError> {
    let mut ordered: Vec<&(UndocumentedItem, String)> = items.iter().collect();
    ordered.sort_by(|a, b| b.0.line.cmp(&a.0.line));

    let mut content = original.to_string();
    for (item, text) in ordered {
        content = insert(language, &content, item, text)?;
    }
    Ok(content)
}

/// Lines with their own terminators.
fn split_lines(content: &str) -> Vec<&str> {
    content.split_inclusive('\n').collect()
}

fn dominant_eol(content: &str) -> &'static str {
    let crlf = content.matches("\r\n").count();
    let lf = content.matches('\n').count();
    if crlf > 0 && crlf * 2 >= lf {
        "\r\n"
    } else {
        "\n"
    }
}

fn line_eol<'a>(line: &'a str, fallback: &'a str) -> &'a str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        fallback
    }
}

fn strip_eol(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

fn leading_ws(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

fn check_line(item: &UndocumentedItem, line_count: usize) -> Result<usize, InsertError> {
    if item.line == 0 || item.line > line_count {
        return Err(InsertError::LineOutOfRange {
            name: item.name.clone(),
            line: item.line,
            line_count,
        });
    }
    Ok(item.line - 1)
}

/// Insert a JSDoc/TSDoc block directly above the declaration line.
pub fn insert_block_comment(
    original: &str,
    item: &UndocumentedItem,
    text: &str,
) -> Result<String, InsertError> {
    let lines = split_lines(original);
    let idx = check_line(item, lines.len())?;
    let eol = line_eol(lines[idx], dominant_eol(original));
    let indent = leading_ws(lines[idx]);

    let mut block = format!("{indent}/**{eol}");
    for line in text.trim().replace("*/", "*\\/").lines() {
        let line = line.trim_end();
        if line.is_empty() {
            block.push_str(&format!("{indent} *{eol}"));
        } else {
            block.push_str(&format!("{indent} * {line}{eol}"));
        }
    }
    block.push_str(&format!("{indent} */{eol}"));

    let mut out = String::with_capacity(original.len() + block.len());
    for (i, line) in lines.iter().enumerate() {
        if i == idx {
            out.push_str(&block);
        }
        out.push_str(line);
    }
    Ok(out)
}

/// Insert a docstring as the first statement of a Python function or class.
pub fn insert_docstring(
    original: &str,
    item: &UndocumentedItem,
    text: &str,
) -> Result<String, InsertError> {
    let lines = split_lines(original);
    let idx = check_line(item, lines.len())?;
    let fallback_eol = dominant_eol(original);
    let decl_indent = leading_ws(lines[idx]);

    let (colon_line, colon_at) =
        find_header_colon(&lines, idx).ok_or_else(|| InsertError::HeaderNotFound {
            name: item.name.clone(),
            line: item.line,
        })?;

    let header = strip_eol(lines[colon_line]);
    let inline_body = header[colon_at + 1..].trim();
    let is_inline = !inline_body.is_empty() && !inline_body.starts_with('#');

    let body_indent = if is_inline {
        nested_indent(decl_indent)
    } else {
        body_indent(&lines, colon_line, decl_indent)
    };
    let eol = line_eol(lines[colon_line], fallback_eol);
    let docstring = render_docstring(text, &body_indent, eol);

    let mut out = String::with_capacity(original.len() + docstring.len() + 1);
    for (i, line) in lines.iter().enumerate() {
        if i != colon_line {
            out.push_str(line);
            continue;
        }
        if is_inline {
            // `def f(): return 1` becomes a header, the docstring, and the body
            out.push_str(header[..=colon_at].trim_end());
            out.push_str(eol);
            out.push_str(&docstring);
            out.push_str(&body_indent);
            out.push_str(inline_body);
            out.push_str(&line[strip_eol(line).len()..]);
        } else {
            out.push_str(line);
            if strip_eol(line).len() == line.len() {
                out.push_str(eol);
            }
            out.push_str(&docstring);
        }
    }
    Ok(out)
}

fn nested_indent(decl_indent: &str) -> String {
    if decl_indent.contains('\t') {
        format!("{decl_indent}\t")
    } else {
        format!("{decl_indent}    ")
    }
}

/// Indentation of the first code line after the header when it is deeper
/// than the declaration, otherwise one level below the declaration.
fn body_indent(lines: &[&str], colon_line: usize, decl_indent: &str) -> String {
    let next_code = lines[colon_line + 1..].iter().find(|l| {
        let trimmed = l.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#')
    });
    match next_code {
        Some(line) if leading_ws(line).len() > decl_indent.len() => leading_ws(line).to_string(),
        _ => nested_indent(decl_indent),
    }
}

/// Locate the `:` ending a `def`/`class` header starting at line `start`.
///
/// Brackets, string literals and comments are skipped so annotations,
/// defaults and multi-line signatures are handled. Returns the line index
/// and byte offset of the colon within that line.
fn find_header_colon(lines: &[&str], start: usize) -> Option<(usize, usize)> {
    let mut depth: i32 = 0;
    // open string delimiter, if inside one
    let mut in_string: Option<&'static str> = None;

    for (idx, line) in lines.iter().enumerate().skip(start) {
        let bytes = line.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if let Some(delim) = in_string {
                if bytes[i] == b'\\' {
                    i += 2;
                    continue;
                }
                if line[i..].starts_with(delim) {
                    in_string = None;
                    i += delim.len();
                    continue;
                }
                if delim.len() == 1 && bytes[i] == b'\n' {
                    in_string = None;
                }
                i += 1;
                continue;
            }

            match bytes[i] {
                b'#' => break,
                b'"' | b'\'' => {
                    let rest = &line[i..];
                    let delim = match (bytes[i], rest.starts_with("\"\"\""), rest.starts_with("'''")) {
                        (b'"', true, _) => "\"\"\"",
                        (b'\'', _, true) => "'''",
                        (b'"', _, _) => "\"",
                        _ => "'",
                    };
                    in_string = Some(delim);
                    i += delim.len();
                    continue;
                }
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                b':' if depth == 0 => return Some((idx, i)),
                _ => {}
            }
            i += 1;
        }
    }
    None
}

/// Render `text` as an indented docstring, one string per line with `eol`.
///
/// Backslashes are doubled before `"""` is escaped, so the literal holds only
/// the escapes `\\` and `\"`.
fn render_docstring(text: &str, indent: &str, eol: &str) -> String {
    let body = text
        .trim()
        .replace('\\', "\\\\")
        .replace("\"\"\"", "\\\"\\\"\\\"");
    let lines: Vec<&str> = body.lines().map(str::trim_end).collect();

    let single = lines.len() <= 1 && !body.ends_with('"') && !body.ends_with('\\');
    if single {
        return format!("{indent}\"\"\"{body}\"\"\"{eol}");
    }

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            out.push_str(&format!("{indent}\"\"\"{line}{eol}"));
        } else if line.is_empty() {
            out.push_str(eol);
        } else {
            out.push_str(&format!("{indent}{line}{eol}"));
        }
    }
    out.push_str(&format!("{indent}\"\"\"{eol}"));
    out
}
