//! One user's navigation session over a loaded program.
//!
//! The session owns the current source view, the reference under the caret,
//! the navigation history and a shared handle on the mapping store. Tree
//! builds run on the rayon pool and hold a read lock on the store, so a
//! rename waits for in-flight builds and a build never sees half a rename.

use std::collections::HashSet;
use std::sync::mpsc;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use thiserror::Error;

use crate::analysis::{
    BuildAbandoned, BuildGenerations, BuildToken, DisplayNode, Relations, TreeBuilder, TreeKind,
};
use crate::config::Config;
use crate::history::NavigationHistory;
use crate::mapping::{MappingBinding, MappingStore, RenameError, RenameValidator, Renamed};
use crate::model::program::ClassHierarchy;
use crate::model::{BehaviorEntry, ClassEntry, Entry, EntryReference};
use crate::source::{MalformedSourceError, SourceView, Token};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no symbol is selected")]
    NoSelection,
    #[error(transparent)]
    Rename(#[from] RenameError),
}

/// One labeled row of the symbol info panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoRow {
    pub label: &'static str,
    pub value: String,
}

/// Which commands make sense for the symbol under the caret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Actions {
    pub rename: bool,
    pub inheritance: bool,
    pub implementations: bool,
    pub calls: bool,
    pub open_declaration: bool,
    pub back: bool,
}

impl Actions {
    pub fn for_entry(entry: &Entry, has_previous: bool) -> Self {
        let (inheritance, implementations, calls, open_declaration) = match entry {
            Entry::Class(_) => (true, true, false, true),
            Entry::Field(_) => (false, false, true, true),
            Entry::Method(_) => (true, true, true, true),
            Entry::Constructor(_) => (true, false, true, true),
            Entry::Argument(_) => (false, false, false, false),
        };
        Self {
            rename: true,
            inheritance,
            implementations,
            calls,
            open_declaration,
            back: has_previous,
        }
    }

    pub fn allows(&self, kind: TreeKind) -> bool {
        match kind {
            TreeKind::Inheritance => self.inheritance,
            TreeKind::Implementations => self.implementations,
            TreeKind::Calls => self.calls,
        }
    }
}

/// What the UI shows after the caret moves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaretState {
    pub reference: Option<EntryReference>,
    pub info: Vec<InfoRow>,
    pub actions: Actions,
}

/// A class to render and the reference to reveal in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub class: ClassEntry,
    pub reference: EntryReference,
}

/// A finished tree build.
#[derive(Debug, Clone)]
pub struct TreeResult {
    pub kind: TreeKind,
    pub relations: Relations,
    /// Labeled with the names current when the build finished.
    pub display: Option<DisplayNode>,
}

/// A tree build running off-thread.
pub struct PendingTree {
    token: BuildToken,
    receiver: mpsc::Receiver<Result<TreeResult, BuildAbandoned>>,
}

impl PendingTree {
    /// Block until the build finishes. `None` if a newer request superseded it.
    pub fn wait(self) -> Option<TreeResult> {
        match self.receiver.recv() {
            Ok(Ok(result)) if !self.token.is_superseded() => Some(result),
            Ok(_) => {
                tracing::debug!(generation = self.token.generation(), "discarding superseded tree");
                None
            }
            Err(_) => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        self.token.is_superseded()
    }
}

pub struct Session {
    program: Arc<dyn ClassHierarchy>,
    names: Arc<RwLock<MappingStore>>,
    validator: RenameValidator,
    history: NavigationHistory,
    source: Arc<SourceView>,
    current: Option<EntryReference>,
    generations: BuildGenerations,
}

impl Session {
    pub fn new(program: Arc<dyn ClassHierarchy>, names: MappingStore, config: &Config) -> Self {
        Self {
            program,
            names: Arc::new(RwLock::new(names)),
            validator: config.rename_validator(),
            history: config.navigation_history(),
            source: Arc::new(SourceView::default()),
            current: None,
            generations: BuildGenerations::new(),
        }
    }

    pub fn program(&self) -> &dyn ClassHierarchy {
        self.program.as_ref()
    }

    pub fn names(&self) -> RwLockReadGuard<'_, MappingStore> {
        self.names.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn names_mut(&self) -> RwLockWriteGuard<'_, MappingStore> {
        self.names.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn source(&self) -> Arc<SourceView> {
        Arc::clone(&self.source)
    }

    pub fn current(&self) -> Option<&EntryReference> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    /// Replace the source view. On error the previous view stays in place.
    pub fn publish_source(
        &mut self,
        text: impl Into<String>,
        annotations: Vec<Token>,
    ) -> Result<(), MalformedSourceError> {
        let view = SourceView::new(text, annotations)?;
        self.source = Arc::new(view);
        Ok(())
    }

    /// Resolve the caret position and describe the symbol under it.
    pub fn caret_moved(&mut self, pos: usize) -> CaretState {
        self.current = self
            .source
            .index()
            .token_at(pos)
            .map(|token| token.reference.clone());
        self.caret_state()
    }

    /// Select a reference directly, e.g. from a tree node.
    pub fn select(&mut self, reference: EntryReference) -> CaretState {
        self.current = Some(reference);
        self.caret_state()
    }

    pub fn caret_state(&self) -> CaretState {
        let Some(reference) = &self.current else {
            return CaretState {
                actions: Actions {
                    back: self.history.has_previous(),
                    ..Actions::default()
                },
                ..CaretState::default()
            };
        };
        CaretState {
            reference: Some(reference.clone()),
            info: self.info_rows(&reference.entry),
            actions: Actions::for_entry(&reference.entry, self.history.has_previous()),
        }
    }

    /// Info panel rows for `entry`, with current display names.
    pub fn info_rows(&self, entry: &Entry) -> Vec<InfoRow> {
        let names = self.names();
        let row = |label: &'static str, value: String| InfoRow { label, value };
        let class_name = names.name_of(&Entry::Class(entry.class_entry().clone()));
        match entry {
            Entry::Class(_) => vec![row("Class", class_name)],
            Entry::Field(_) => vec![row("Field", names.name_of(entry)), row("Class", class_name)],
            Entry::Method(method) => vec![
                row("Method", names.name_of(entry)),
                row("Class", class_name),
                row("Signature", method.descriptor.clone()),
            ],
            Entry::Constructor(ctor) => vec![
                row("Constructor", class_name),
                row("Signature", ctor.descriptor.clone()),
            ],
            Entry::Argument(arg) => {
                let owner = match &arg.behavior {
                    BehaviorEntry::Method(_) => names.name_of(&arg.behavior.clone().into()),
                    BehaviorEntry::Constructor(_) => "<init>".to_string(),
                };
                vec![
                    row("Argument", names.name_of(entry)),
                    row("Class", class_name),
                    row("Method", owner),
                    row("Index", arg.index.to_string()),
                ]
            }
        }
    }

    /// Jump to the declaration of the selected symbol.
    pub fn open_declaration(&mut self) -> Result<Navigation, SessionError> {
        let entry = self
            .current
            .as_ref()
            .ok_or(SessionError::NoSelection)?
            .entry
            .clone();
        Ok(self.navigate_to(EntryReference::declaration(entry)))
    }

    /// Remember the current reference and make `reference` current.
    pub fn navigate_to(&mut self, reference: EntryReference) -> Navigation {
        if let Some(previous) = self.current.take() {
            self.history.push(previous);
        }
        self.current = Some(reference.clone());
        self.navigation(reference)
    }

    /// Return to the most recently left reference.
    pub fn go_back(&mut self) -> Option<Navigation> {
        let reference = self.history.pop()?;
        self.current = Some(reference.clone());
        Some(self.navigation(reference))
    }

    fn navigation(&self, reference: EntryReference) -> Navigation {
        let class = self.outermost_class(reference.entry.class_entry());
        Navigation { class, reference }
    }

    /// Nested classes are rendered as part of their top-level class.
    fn outermost_class(&self, class: &ClassEntry) -> ClassEntry {
        let mut current = class.clone();
        let mut seen = HashSet::new();
        while let Some(outer) = self.program.outer_class(&current) {
            if !seen.insert(current.clone()) {
                break;
            }
            current = outer;
        }
        current
    }

    /// Tokens in the current view for `reference`.
    pub fn locate(&self, reference: &EntryReference) -> Vec<Token> {
        self.source
            .index()
            .tokens()
            .iter()
            .filter(|t| &t.reference == reference)
            .cloned()
            .collect()
    }

    /// Rename the selected symbol.
    pub fn rename(&mut self, new_name: &str) -> Result<Renamed, SessionError> {
        let entry = self
            .current
            .as_ref()
            .ok_or(SessionError::NoSelection)?
            .entry
            .clone();
        let renamed =
            self.names_mut()
                .rename_with(&self.validator, self.program.as_ref(), &entry, new_name)?;
        Ok(renamed)
    }

    /// Start building a tree for the selected symbol. Any build still running
    /// from an earlier request is superseded.
    pub fn request_tree(&self, kind: TreeKind) -> Result<PendingTree, SessionError> {
        let entry = self
            .current
            .as_ref()
            .ok_or(SessionError::NoSelection)?
            .entry
            .clone();
        let token = self.generations.next();
        let (sender, receiver) = mpsc::channel();

        let program = Arc::clone(&self.program);
        let names = Arc::clone(&self.names);
        let build_token = token.clone();
        rayon::spawn(move || {
            let names = names.read().unwrap_or_else(PoisonError::into_inner);
            let result = TreeBuilder::new(program.as_ref(), &names)
                .with_token(build_token)
                .build(kind, &entry)
                .map(|relations| TreeResult {
                    kind,
                    display: relations.render(&names),
                    relations,
                });
            if result.is_err() {
                tracing::debug!(kind = %kind, entry = %entry, "tree build abandoned");
            }
            // the receiver may already be gone
            let _ = sender.send(result);
        });

        Ok(PendingTree { token, receiver })
    }

    pub fn is_dirty(&self) -> bool {
        self.names().is_dirty()
    }

    /// Hand the mapping to the persistence hook.
    pub fn save_with<E>(
        &self,
        hook: impl FnOnce(&[MappingBinding]) -> Result<(), E>,
    ) -> Result<(), E> {
        self.names_mut().save_with(hook)
    }
}
