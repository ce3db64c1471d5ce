//! The two class lists shown beside the source view.

use std::cmp::Ordering;

use serde::Serialize;

use crate::mapping::MappingStore;
use crate::model::program::ClassHierarchy;
use crate::model::{ClassEntry, Entry};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassLists {
    /// Classes without a binding yet, shortest names first.
    pub obfuscated: Vec<ClassEntry>,
    /// Renamed classes, ordered by package then simple name.
    pub deobfuscated: Vec<ClassEntry>,
}

/// Split the program's top-level classes by whether they have been renamed.
/// Nested and anonymous classes are listed through their outer class only.
pub fn class_lists(hierarchy: &dyn ClassHierarchy, names: &MappingStore) -> ClassLists {
    let mut lists = ClassLists::default();
    for class in hierarchy.classes() {
        if hierarchy.outer_class(&class).is_some() {
            continue;
        }
        if names.has_binding(&Entry::Class(class.clone())) {
            lists.deobfuscated.push(class);
        } else {
            lists.obfuscated.push(class);
        }
    }

    lists.obfuscated.sort_by(obfuscated_order);
    lists.deobfuscated.sort_by_cached_key(|class| {
        let label = names.name_of(&Entry::Class(class.clone()));
        let segments: Vec<String> = label.split('.').map(str::to_string).collect();
        (segments, class.name.clone())
    });
    lists
}

/// Obfuscators hand out short names first, so `a` < `b` < `aa`.
fn obfuscated_order(a: &ClassEntry, b: &ClassEntry) -> Ordering {
    a.name
        .len()
        .cmp(&b.name.len())
        .then_with(|| a.name.cmp(&b.name))
}
