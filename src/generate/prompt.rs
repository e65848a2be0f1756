//! Prompt construction and response cleanup.

use crate::analysis::languages::python::clean_docstring;
use crate::analysis::UndocumentedItem;
use crate::language::Language;

pub const SYSTEM_PROMPT: &str =
    "You are a senior developer adding professional documentation to code.";

const PYTHON_REQUIREMENTS: &[&str] = &[
    "Google-style docstring format",
    "Describe purpose clearly",
    "Document all parameters with types",
    "Document return value with type",
    "Include 1-2 usage examples",
    "Mention exceptions if applicable",
];

const JAVASCRIPT_REQUIREMENTS: &[&str] = &[
    "Proper JSDoc syntax with @ tags",
    "Describe function purpose",
    "Document all parameters with @param",
    "Document return value with @returns",
    "Include type information where possible",
    "Add 1 usage example",
];

const TYPESCRIPT_REQUIREMENTS: &[&str] = &[
    "TSDoc format with type information",
    "Describe function/class purpose",
    "Document all parameters with types",
    "Document return type",
    "Include generics if applicable",
    "Add 1 usage example",
    "Mark @public/@private appropriately",
];

/// Build the user prompt asking for documentation of `item`.
///
/// Returns `None` for unsupported languages.
pub fn build_prompt(language: Language, item: &UndocumentedItem) -> Option<String> {
    let (what, requirements) = match language {
        Language::Python => ("a comprehensive Python docstring", PYTHON_REQUIREMENTS),
        Language::JavaScript => ("comprehensive JSDoc documentation", JAVASCRIPT_REQUIREMENTS),
        Language::TypeScript => ("comprehensive TypeScript documentation", TYPESCRIPT_REQUIREMENTS),
        Language::Unsupported => return None,
    };

    let mut prompt = format!(
        "Add {what} to this {kind} `{name}`:\n\n{code}\n\nRequirements:\n",
        kind = item.kind,
        name = item.name,
        code = item.code,
    );
    for (i, req) in requirements.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, req));
    }
    prompt.push_str(
        "\nReply with the documentation text only, without comment delimiters, \
         quotes or the code itself.\n",
    );
    Some(prompt)
}

/// Reduce a model reply to bare documentation text.
///
/// Models often wrap the answer in a code fence or echo the comment
/// delimiters; both are removed so the insertion engine adds its own.
pub fn clean_response(language: Language, raw: &str) -> String {
    let mut text = strip_fence(raw.trim()).trim().to_string();

    match language {
        Language::Python => {
            for quote in ["\"\"\"", "'''"] {
                if let Some(inner) = text.strip_prefix(quote) {
                    text = inner.strip_suffix(quote).unwrap_or(inner).to_string();
                    break;
                }
            }
        }
        Language::JavaScript | Language::TypeScript => {
            if let Some(inner) = text.strip_prefix("/**") {
                let inner = inner.trim_end().strip_suffix("*/").unwrap_or(inner);
                text = inner
                    .lines()
                    .map(|l| {
                        let l = l.trim();
                        l.strip_prefix("* ")
                            .or_else(|| l.strip_prefix('*'))
                            .unwrap_or(l)
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
            }
        }
        Language::Unsupported => {}
    }

    clean_docstring(&text)
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop the info string (```python)
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body)
}
