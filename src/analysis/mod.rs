//! Relationship trees over the loaded program: inheritance, implementations
//! and call sites.
//!
//! Builders produce immutable [`RelationTree`]s of plain data. Nodes store
//! entries, not names, so a tree stays valid across renames; only its labels
//! change, which [`render`] resolves against the mapping store at display time.
//!
//! Children at every level are ordered by display name, ties broken by the
//! raw identity string. Ordering is byte-wise, so `Banana` < `Zebra` < `apple`.

pub mod calls;
pub mod classes;
pub mod implementations;
pub mod inheritance;
pub mod render;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mapping::MappingStore;
use crate::model::program::ClassHierarchy;
use crate::model::{ClassEntry, Entry, MethodEntry};

pub use calls::CallNode;
pub use inheritance::MethodInheritanceNode;
pub use render::DisplayNode;

/// A tree node that owns its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode<T> {
    pub value: T,
    pub children: Vec<TreeNode<T>>,
}

impl<T> TreeNode<T> {
    pub fn leaf(value: T) -> Self {
        Self {
            value,
            children: Vec::new(),
        }
    }

    pub fn with_children(value: T, children: Vec<TreeNode<T>>) -> Self {
        Self { value, children }
    }

    /// Child-index path from this node to the first node matching `pred`.
    pub fn find_path(&self, pred: &impl Fn(&T) -> bool) -> Option<Vec<usize>> {
        if pred(&self.value) {
            return Some(Vec::new());
        }
        for (i, child) in self.children.iter().enumerate() {
            if let Some(mut path) = child.find_path(pred) {
                path.insert(0, i);
                return Some(path);
            }
        }
        None
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }
}

/// A built relationship tree. `focus` is the child-index path from the root to
/// the node for the queried symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationTree<T> {
    pub root: Option<TreeNode<T>>,
    pub focus: Vec<usize>,
}

impl<T> RelationTree<T> {
    /// No relationships to show. A valid result, not an error.
    pub fn empty() -> Self {
        Self {
            root: None,
            focus: Vec::new(),
        }
    }

    pub fn new(root: TreeNode<T>, focus: Vec<usize>) -> Self {
        Self {
            root: Some(root),
            focus,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Nodes from the root down to the focused node.
    pub fn focus_path(&self) -> Vec<&TreeNode<T>> {
        let mut path = Vec::new();
        let Some(mut node) = self.root.as_ref() else {
            return path;
        };
        path.push(node);
        for &i in &self.focus {
            match node.children.get(i) {
                Some(child) => {
                    node = child;
                    path.push(node);
                }
                None => break,
            }
        }
        path
    }

    pub fn focused(&self) -> Option<&TreeNode<T>> {
        self.focus_path().last().copied()
    }

    pub fn node_count(&self) -> usize {
        self.root.as_ref().map(|r| r.node_count()).unwrap_or(0)
    }
}

/// Payload of a relationship tree node.
pub trait RelationNode {
    /// Display label, resolved against the current mapping.
    fn label(&self, names: &MappingStore) -> String;

    /// Rename-independent key used to break label ties.
    fn identity(&self) -> String;

    /// Extra annotation shown next to the label.
    fn note(&self) -> Option<String> {
        None
    }
}

impl RelationNode for ClassEntry {
    fn label(&self, names: &MappingStore) -> String {
        names.name_of(&Entry::Class(self.clone()))
    }

    fn identity(&self) -> String {
        self.name.clone()
    }
}

impl RelationNode for MethodEntry {
    fn label(&self, names: &MappingStore) -> String {
        render::qualified_label(&Entry::Method(self.clone()), names)
    }

    fn identity(&self) -> String {
        Entry::Method(self.clone()).identity()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("tree build superseded by a newer request")]
pub struct BuildAbandoned;

/// Issues build tokens; issuing a new one supersedes every earlier token.
#[derive(Debug, Clone, Default)]
pub struct BuildGenerations {
    latest: Arc<AtomicU64>,
}

impl BuildGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> BuildToken {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        BuildToken {
            generation,
            latest: Arc::clone(&self.latest),
        }
    }
}

/// Cooperative cancellation for a tree build.
#[derive(Debug, Clone)]
pub struct BuildToken {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl BuildToken {
    /// A token nothing can supersede.
    pub fn detached() -> Self {
        BuildGenerations::new().next()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_superseded(&self) -> bool {
        self.latest.load(Ordering::SeqCst) != self.generation
    }

    pub fn check(&self) -> Result<(), BuildAbandoned> {
        if self.is_superseded() {
            Err(BuildAbandoned)
        } else {
            Ok(())
        }
    }
}

/// Which relationship view to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeKind {
    Inheritance,
    Implementations,
    Calls,
}

impl TreeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreeKind::Inheritance => "inheritance",
            TreeKind::Implementations => "implementations",
            TreeKind::Calls => "calls",
        }
    }
}

impl std::fmt::Display for TreeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a [`TreeBuilder::build`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relations {
    ClassInheritance(RelationTree<ClassEntry>),
    MethodInheritance(RelationTree<MethodInheritanceNode>),
    ClassImplementations(RelationTree<ClassEntry>),
    MethodImplementations(RelationTree<MethodEntry>),
    Calls(RelationTree<CallNode>),
    /// The view does not apply to this kind of entry.
    NotApplicable,
}

impl Relations {
    pub fn is_empty(&self) -> bool {
        match self {
            Relations::ClassInheritance(t) | Relations::ClassImplementations(t) => t.is_empty(),
            Relations::MethodInheritance(t) => t.is_empty(),
            Relations::MethodImplementations(t) => t.is_empty(),
            Relations::Calls(t) => t.is_empty(),
            Relations::NotApplicable => true,
        }
    }

    /// Label the tree with current names.
    pub fn render(&self, names: &MappingStore) -> Option<DisplayNode> {
        match self {
            Relations::ClassInheritance(t) | Relations::ClassImplementations(t) => {
                render::render(t, names)
            }
            Relations::MethodInheritance(t) => render::render(t, names),
            Relations::MethodImplementations(t) => render::render(t, names),
            Relations::Calls(t) => render::render(t, names),
            Relations::NotApplicable => None,
        }
    }
}

/// Read-only tree construction over a hierarchy and a view of the mapping.
pub struct TreeBuilder<'a> {
    hierarchy: &'a dyn ClassHierarchy,
    names: &'a MappingStore,
    token: BuildToken,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(hierarchy: &'a dyn ClassHierarchy, names: &'a MappingStore) -> Self {
        Self {
            hierarchy,
            names,
            token: BuildToken::detached(),
        }
    }

    pub fn with_token(mut self, token: BuildToken) -> Self {
        self.token = token;
        self
    }

    /// Build the `kind` view for `entry`.
    pub fn build(&self, kind: TreeKind, entry: &Entry) -> Result<Relations, BuildAbandoned> {
        tracing::debug!(kind = %kind, entry = %entry, "building relationship tree");
        let relations = match (kind, entry) {
            (TreeKind::Inheritance, Entry::Class(class)) => {
                Relations::ClassInheritance(self.class_inheritance(class)?)
            }
            (TreeKind::Inheritance, Entry::Constructor(ctor)) => {
                Relations::ClassInheritance(self.class_inheritance(&ctor.class)?)
            }
            (TreeKind::Inheritance, Entry::Method(method)) => {
                Relations::MethodInheritance(self.method_inheritance(method)?)
            }
            (TreeKind::Implementations, Entry::Class(class)) => {
                Relations::ClassImplementations(self.class_implementations(class)?)
            }
            (TreeKind::Implementations, Entry::Method(method)) => {
                Relations::MethodImplementations(self.method_implementations(method)?)
            }
            (TreeKind::Calls, Entry::Field(_) | Entry::Method(_) | Entry::Constructor(_)) => {
                Relations::Calls(self.calls(entry)?)
            }
            (TreeKind::Inheritance, Entry::Field(_) | Entry::Argument(_))
            | (
                TreeKind::Implementations,
                Entry::Field(_) | Entry::Constructor(_) | Entry::Argument(_),
            )
            | (TreeKind::Calls, Entry::Class(_) | Entry::Argument(_)) => Relations::NotApplicable,
        };
        Ok(relations)
    }

    fn check(&self) -> Result<(), BuildAbandoned> {
        self.token.check()
    }

    /// Order nodes by label, then identity.
    fn sort_nodes<T: RelationNode>(&self, nodes: &mut [T]) {
        nodes.sort_by_cached_key(|n| (n.label(self.names), n.identity()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_path_and_focus() {
        let tree = TreeNode::with_children(
            "root",
            vec![
                TreeNode::leaf("a"),
                TreeNode::with_children("b", vec![TreeNode::leaf("c")]),
            ],
        );
        let path = tree.find_path(&|v: &&str| *v == "c").unwrap();
        assert_eq!(path, vec![1, 0]);

        let relation = RelationTree::new(tree, path);
        let labels: Vec<&str> = relation.focus_path().iter().map(|n| n.value).collect();
        assert_eq!(labels, vec!["root", "b", "c"]);
        assert_eq!(relation.focused().unwrap().value, "c");
        assert_eq!(relation.node_count(), 4);
    }

    #[test]
    fn test_empty_tree() {
        let tree: RelationTree<ClassEntry> = RelationTree::empty();
        assert!(tree.is_empty());
        assert!(tree.focus_path().is_empty());
        assert_eq!(tree.node_count(), 0);
    }

    #[test]
    fn test_newer_token_supersedes_older() {
        let generations = BuildGenerations::new();
        let first = generations.next();
        assert!(!first.is_superseded());

        let second = generations.next();
        assert!(first.is_superseded());
        assert_eq!(first.check(), Err(BuildAbandoned));
        assert!(second.check().is_ok());
    }

    #[test]
    fn test_superseded_builder_abandons() {
        use crate::model::program::{ClassInfo, Program};

        let mut program = Program::new();
        program.add_class(ClassInfo {
            name: "a".to_string(),
            superclass: None,
            interfaces: vec![],
            is_interface: false,
            outer: None,
            fields: vec![],
            methods: vec![],
            constructors: vec![],
        });
        let names = MappingStore::new();
        let generations = BuildGenerations::new();
        let token = generations.next();
        generations.next();

        let builder = TreeBuilder::new(&program, &names).with_token(token);
        let class = Entry::Class(ClassEntry::new("a"));
        assert_eq!(builder.build(TreeKind::Inheritance, &class), Err(BuildAbandoned));
        // views that do not apply never start a build
        assert_eq!(
            builder.build(TreeKind::Calls, &class),
            Ok(Relations::NotApplicable)
        );
    }
}
