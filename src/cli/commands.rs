use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::classes::class_lists;
use crate::analysis::TreeKind;
use crate::config::Config;
use crate::mapping::{MappingBinding, MappingStore};
use crate::model::program::{Program, ProgramSnapshot};
use crate::model::{Entry, EntryReference};
use crate::session::Session;
use crate::source::{SourceView, Token};

use super::output::{
    format_caret, format_class_lists, format_highlights, format_renamed, format_tokens,
    format_tree,
};
use super::OutputFormat;

/// Files and settings shared by every command.
pub struct Workspace {
    pub snapshot: PathBuf,
    pub mappings: Option<PathBuf>,
    pub config: Config,
    pub format: OutputFormat,
}

/// A decompiled source file together with its token annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub text: String,
    #[serde(default)]
    pub tokens: Vec<Token>,
}

/// Load the program snapshot written by the decompiler.
pub fn load_program(path: &Path) -> Result<Program> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let snapshot: ProgramSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
    let program = Program::from_snapshot(snapshot);
    tracing::debug!(
        classes = program.class_count(),
        references = program.reference_count(),
        "loaded program snapshot"
    );
    Ok(program)
}

/// Load the mapping file. A missing file is an empty mapping.
pub fn load_mappings(path: Option<&Path>) -> Result<MappingStore> {
    let Some(path) = path else {
        return Ok(MappingStore::new());
    };
    if !path.exists() {
        tracing::debug!(path = %path.display(), "mapping file not found, starting empty");
        return Ok(MappingStore::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mappings {}", path.display()))?;
    let bindings: Vec<MappingBinding> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse mappings {}", path.display()))?;
    Ok(MappingStore::from_bindings(bindings))
}

/// Write the bindings to the mapping file.
pub fn save_mappings(path: &Path, bindings: &[MappingBinding]) -> Result<()> {
    let content = serde_json::to_string_pretty(bindings)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write mappings {}", path.display()))
}

/// Read a rendered source file.
pub fn read_source_file(path: &Path) -> Result<SourceFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read source {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse source {}", path.display()))
}

/// Read a rendered source file and build its token index.
pub fn load_source(path: &Path) -> Result<SourceView> {
    let file = read_source_file(path)?;
    SourceView::new(file.text, file.tokens)
        .with_context(|| format!("Malformed token annotations in {}", path.display()))
}

fn with_text<'a>(view: &'a SourceView, tokens: &[&'a Token]) -> Vec<(&'a Token, &'a str)> {
    tokens.iter().map(|t| (*t, view.token_text(t))).collect()
}

fn parse_entry(entry: &str) -> Result<Entry> {
    entry.parse::<Entry>().map_err(anyhow::Error::from)
}

fn open_session(workspace: &Workspace) -> Result<Session> {
    let program = load_program(&workspace.snapshot)?;
    let names = load_mappings(workspace.mappings.as_deref())?;
    Ok(Session::new(Arc::new(program), names, &workspace.config))
}

/// Run the `classes` command.
pub fn run_classes(workspace: &Workspace) -> Result<String> {
    let session = open_session(workspace)?;
    let names = session.names();
    let lists = class_lists(session.program(), &names);
    Ok(format_class_lists(&lists, &names, &workspace.format))
}

/// Run the `info` command.
pub fn run_info(workspace: &Workspace, entry: &str) -> Result<String> {
    let entry = parse_entry(entry)?;
    let mut session = open_session(workspace)?;
    let state = session.select(EntryReference::declaration(entry));
    Ok(format_caret(&state, &workspace.format))
}

/// Run the `at` command.
pub fn run_at(workspace: &Workspace, source: &Path, position: usize) -> Result<String> {
    let file = read_source_file(source)?;
    let mut session = open_session(workspace)?;
    session
        .publish_source(file.text, file.tokens)
        .with_context(|| format!("Malformed token annotations in {}", source.display()))?;
    let state = session.caret_moved(position);
    Ok(format_caret(&state, &workspace.format))
}

/// Run the `inheritance`, `implementations` or `calls` command.
pub fn run_tree(workspace: &Workspace, kind: TreeKind, entry: &str) -> Result<String> {
    let entry = parse_entry(entry)?;
    let mut session = open_session(workspace)?;
    let actions = session.select(EntryReference::declaration(entry.clone())).actions;
    if !actions.allows(kind) {
        bail!("{} is not available for {} entries", kind, entry.kind());
    }

    let result = session
        .request_tree(kind)?
        .wait()
        .context("Tree build was superseded")?;
    Ok(format_tree(kind, &entry, result.display.as_ref(), &workspace.format))
}

/// Run the `tokens` command.
pub fn run_tokens(workspace: &Workspace, source: &Path, entry: &str) -> Result<String> {
    let entry = parse_entry(entry)?;
    let view = load_source(source)?;
    let tokens = with_text(&view, &view.index().tokens_for(&entry));
    Ok(format_tokens(&tokens, &workspace.format))
}

/// Run the `highlights` command.
pub fn run_highlights(workspace: &Workspace, source: &Path) -> Result<String> {
    let view = load_source(source)?;
    let names = load_mappings(workspace.mappings.as_deref())?;
    let highlights = view.index().highlights(&names);
    Ok(format_highlights(
        &with_text(&view, &highlights.obfuscated),
        &with_text(&view, &highlights.deobfuscated),
        &workspace.format,
    ))
}

/// Run the `rename` command and save the mapping file.
pub fn run_rename(workspace: &Workspace, entry: &str, new_name: &str) -> Result<String> {
    let Some(mappings) = workspace.mappings.as_deref() else {
        bail!("rename needs a mapping file to write; pass --mappings");
    };
    let entry = parse_entry(entry)?;
    let mut session = open_session(workspace)?;
    session.select(EntryReference::declaration(entry));

    let renamed = session.rename(new_name)?;
    session.save_with(|bindings| save_mappings(mappings, bindings))?;
    Ok(format_renamed(&renamed, &workspace.format))
}
