//! The in-memory deobfuscation mapping: entry identity -> chosen name.
//!
//! Loading and saving the mapping file belong to the caller; the store only
//! hands bindings in and out.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::program::ClassHierarchy;
use crate::model::Entry;
use crate::source::{Token, TokenIndex};

pub mod validate;

pub use validate::{RenameError, RenameErrorKind, RenameValidator};

/// One persisted binding, as exchanged with the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingBinding {
    pub entry: Entry,
    pub name: String,
}

#[derive(Debug, Clone)]
struct Binding {
    name: String,
    /// Changed since the last successful save.
    dirty: bool,
}

/// A committed rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    /// The entry whose binding changed (a constructor rename reports its class).
    pub entry: Entry,
    pub previous: String,
    pub current: String,
}

impl Renamed {
    /// Tokens in `index` whose label changed with this rename.
    pub fn affected_tokens<'a>(&self, index: &'a TokenIndex) -> Vec<&'a Token> {
        index.tokens_renamed_by(&self.entry)
    }
}

#[derive(Debug, Default)]
pub struct MappingStore {
    bindings: HashMap<Entry, Binding>,
    modified: bool,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from previously saved bindings. The result is not dirty.
    pub fn from_bindings(bindings: impl IntoIterator<Item = MappingBinding>) -> Self {
        let bindings = bindings
            .into_iter()
            .map(|b| {
                (
                    b.entry.rename_target(),
                    Binding {
                        name: b.name,
                        dirty: false,
                    },
                )
            })
            .collect();
        Self {
            bindings,
            modified: false,
        }
    }

    /// Current display name: the bound name, or the raw obfuscated name.
    pub fn name_of(&self, entry: &Entry) -> String {
        match self.bindings.get(&entry.rename_target()) {
            Some(binding) => binding.name.clone(),
            None => entry.obf_name(),
        }
    }

    pub fn has_binding(&self, entry: &Entry) -> bool {
        self.bindings.contains_key(&entry.rename_target())
    }

    /// Validate and commit with the default rules.
    pub fn rename(
        &mut self,
        hierarchy: &dyn ClassHierarchy,
        entry: &Entry,
        new_name: &str,
    ) -> Result<Renamed, RenameError> {
        self.rename_with(&RenameValidator::default(), hierarchy, entry, new_name)
    }

    /// Validate and commit. On error nothing changes, including the dirty flag.
    pub fn rename_with(
        &mut self,
        validator: &RenameValidator,
        hierarchy: &dyn ClassHierarchy,
        entry: &Entry,
        new_name: &str,
    ) -> Result<Renamed, RenameError> {
        if let Err(err) = validator.validate(hierarchy, self, entry, new_name) {
            tracing::debug!(entry = %entry, name = new_name, kind = %err.kind, "rename rejected");
            return Err(err);
        }

        let target = entry.rename_target();
        let previous = self.name_of(&target);
        self.bindings.insert(
            target.clone(),
            Binding {
                name: new_name.to_string(),
                dirty: true,
            },
        );
        self.modified = true;
        tracing::info!(entry = %target, from = %previous, to = new_name, "renamed");

        Ok(Renamed {
            entry: target,
            previous,
            current: new_name.to_string(),
        })
    }

    /// True once any rename succeeded since load or the last save.
    pub fn is_dirty(&self) -> bool {
        self.modified
    }

    /// Bindings sorted by entry identity.
    pub fn bindings(&self) -> Vec<MappingBinding> {
        let mut out: Vec<MappingBinding> = self
            .bindings
            .iter()
            .map(|(entry, b)| MappingBinding {
                entry: entry.clone(),
                name: b.name.clone(),
            })
            .collect();
        out.sort_by_key(|b| b.entry.identity());
        out
    }

    /// Bindings changed since the last save.
    pub fn dirty_bindings(&self) -> Vec<MappingBinding> {
        let mut out: Vec<MappingBinding> = self
            .bindings
            .iter()
            .filter(|(_, b)| b.dirty)
            .map(|(entry, b)| MappingBinding {
                entry: entry.clone(),
                name: b.name.clone(),
            })
            .collect();
        out.sort_by_key(|b| b.entry.identity());
        out
    }

    /// Hand every binding to the save hook; dirty state clears only if it succeeds.
    pub fn save_with<E>(
        &mut self,
        hook: impl FnOnce(&[MappingBinding]) -> Result<(), E>,
    ) -> Result<(), E> {
        let bindings = self.bindings();
        hook(&bindings)?;
        for binding in self.bindings.values_mut() {
            binding.dirty = false;
        }
        self.modified = false;
        tracing::info!(bindings = bindings.len(), "mappings saved");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
