use serde::Serialize;

use super::OutputFormat;
use crate::analysis::classes::ClassLists;
use crate::analysis::{DisplayNode, TreeKind};
use crate::mapping::{MappingStore, Renamed};
use crate::model::Entry;
use crate::session::{CaretState, InfoRow};
use crate::source::Token;

/// Format any serializable value as JSON.
pub fn format_json<T: Serialize>(value: &T, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Json | OutputFormat::Text => {
            serde_json::to_string_pretty(value).unwrap_or_default()
        }
        OutputFormat::Compact => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Format both class lists.
pub fn format_class_lists(lists: &ClassLists, names: &MappingStore, format: &OutputFormat) -> String {
    #[derive(Serialize)]
    struct ClassRow {
        name: String,
        display: String,
    }

    #[derive(Serialize)]
    struct ClassesResult {
        command: &'static str,
        obfuscated: Vec<ClassRow>,
        deobfuscated: Vec<ClassRow>,
    }

    let rows = |classes: &[crate::model::ClassEntry]| -> Vec<ClassRow> {
        classes
            .iter()
            .map(|c| ClassRow {
                name: c.name.clone(),
                display: names.name_of(&Entry::Class(c.clone())),
            })
            .collect()
    };
    let result = ClassesResult {
        command: "classes",
        obfuscated: rows(&lists.obfuscated),
        deobfuscated: rows(&lists.deobfuscated),
    };

    match format {
        OutputFormat::Text => {
            let mut output = format!("Obfuscated classes ({}):\n", result.obfuscated.len());
            for row in &result.obfuscated {
                output.push_str(&format!("  {}\n", row.name));
            }
            output.push_str(&format!(
                "\nDeobfuscated classes ({}):\n",
                result.deobfuscated.len()
            ));
            for row in &result.deobfuscated {
                output.push_str(&format!("  {:<40} <- {}\n", row.display, row.name));
            }
            output
        }
        _ => format_json(&result, format),
    }
}

fn format_info_rows(rows: &[InfoRow]) -> String {
    let mut output = String::new();
    for row in rows {
        output.push_str(&format!("{:<12} {}\n", format!("{}:", row.label), row.value));
    }
    output
}

/// Format the info panel and available actions for a symbol.
pub fn format_caret(state: &CaretState, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let Some(reference) = &state.reference else {
                return "No symbol at this position\n".to_string();
            };
            let mut output = format_info_rows(&state.info);
            if let Some(context) = &reference.context {
                output.push_str(&format!("{:<12} {}\n", "Used in:", context));
            }
            let actions = state.actions;
            let available: Vec<&str> = [
                ("rename", actions.rename),
                ("inheritance", actions.inheritance),
                ("implementations", actions.implementations),
                ("calls", actions.calls),
                ("open-declaration", actions.open_declaration),
                ("back", actions.back),
            ]
            .into_iter()
            .filter_map(|(name, on)| on.then_some(name))
            .collect();
            output.push_str(&format!("{:<12} {}\n", "Actions:", available.join(", ")));
            output
        }
        _ => format_json(state, format),
    }
}

/// Format a relationship tree.
pub fn format_tree(
    kind: TreeKind,
    entry: &Entry,
    tree: Option<&DisplayNode>,
    format: &OutputFormat,
) -> String {
    #[derive(Serialize)]
    struct TreeOutput<'a> {
        command: &'static str,
        entry: String,
        tree: Option<&'a DisplayNode>,
    }

    match format {
        OutputFormat::Text => match tree {
            Some(root) => {
                let mut output = String::new();
                write_tree_lines(root, 0, &mut output);
                output
            }
            None => format!("No {} for {}\n", kind, entry),
        },
        _ => format_json(
            &TreeOutput {
                command: kind.as_str(),
                entry: entry.identity(),
                tree,
            },
            format,
        ),
    }
}

fn write_tree_lines(node: &DisplayNode, depth: usize, output: &mut String) {
    let marker = if node.focused { "* " } else { "  " };
    output.push_str(&"  ".repeat(depth));
    output.push_str(marker);
    output.push_str(&node.label);
    if let Some(note) = &node.note {
        output.push_str(&format!(" ({})", note));
    }
    output.push('\n');
    for child in &node.children {
        write_tree_lines(child, depth + 1, output);
    }
}

#[derive(Serialize)]
struct TokenRow<'a> {
    start: usize,
    end: usize,
    text: &'a str,
    entry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
}

fn token_row<'a>(token: &Token, text: &'a str) -> TokenRow<'a> {
    TokenRow {
        start: token.span.start,
        end: token.span.end,
        text,
        entry: token.reference.entry.identity(),
        context: token.reference.context.as_ref().map(Entry::identity),
    }
}

/// Format a token jump list as `(token, source text)` pairs.
pub fn format_tokens(tokens: &[(&Token, &str)], format: &OutputFormat) -> String {
    let rows: Vec<TokenRow> = tokens.iter().map(|(t, text)| token_row(t, text)).collect();
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            for row in &rows {
                output.push_str(&format!(
                    "{:>6}..{:<6} {:<20} {}\n",
                    row.start, row.end, row.text, row.entry
                ));
            }
            output
        }
        _ => format_json(&rows, format),
    }
}

/// Format the highlight partition.
pub fn format_highlights(
    obfuscated: &[(&Token, &str)],
    deobfuscated: &[(&Token, &str)],
    format: &OutputFormat,
) -> String {
    #[derive(Serialize)]
    struct HighlightsResult<'a> {
        command: &'static str,
        obfuscated: Vec<TokenRow<'a>>,
        deobfuscated: Vec<TokenRow<'a>>,
    }

    let result = HighlightsResult {
        command: "highlights",
        obfuscated: obfuscated.iter().map(|(t, text)| token_row(t, text)).collect(),
        deobfuscated: deobfuscated.iter().map(|(t, text)| token_row(t, text)).collect(),
    };
    match format {
        OutputFormat::Text => format!(
            "{} obfuscated, {} deobfuscated tokens\n",
            result.obfuscated.len(),
            result.deobfuscated.len()
        ),
        _ => format_json(&result, format),
    }
}

/// Format a committed rename.
pub fn format_renamed(renamed: &Renamed, format: &OutputFormat) -> String {
    #[derive(Serialize)]
    struct RenameResult<'a> {
        command: &'static str,
        entry: String,
        previous: &'a str,
        current: &'a str,
    }

    match format {
        OutputFormat::Text => format!(
            "Renamed {}: {} -> {}\n",
            renamed.entry, renamed.previous, renamed.current
        ),
        _ => format_json(
            &RenameResult {
                command: "rename",
                entry: renamed.entry.identity(),
                previous: &renamed.previous,
                current: &renamed.current,
            },
            format,
        ),
    }
}
