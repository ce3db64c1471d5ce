use std::collections::BTreeMap;

use serde::Serialize;

use super::{render, BuildAbandoned, RelationNode, RelationTree, TreeBuilder, TreeNode};
use crate::mapping::MappingStore;
use crate::model::{ClassEntry, Entry, EntryReference};

/// A node in a call-site tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum CallNode {
    /// The queried field, method or constructor.
    Target { reference: EntryReference },
    /// The class whose code contains the grouped call sites.
    Class { class: ClassEntry },
    /// One occurrence, carrying the reference to jump to.
    Site { reference: EntryReference },
}

impl CallNode {
    /// The reference to navigate to when this node is activated.
    pub fn reference(&self) -> Option<&EntryReference> {
        match self {
            CallNode::Target { reference } | CallNode::Site { reference } => Some(reference),
            CallNode::Class { .. } => None,
        }
    }
}

impl RelationNode for CallNode {
    fn label(&self, names: &MappingStore) -> String {
        match self {
            CallNode::Target { reference } => render::qualified_label(&reference.entry, names),
            CallNode::Class { class } => class.label(names),
            CallNode::Site { reference } => match &reference.context {
                Some(context) => render::qualified_label(context, names),
                None => render::qualified_label(&reference.entry, names),
            },
        }
    }

    fn identity(&self) -> String {
        match self {
            CallNode::Target { reference } => reference.entry.identity(),
            CallNode::Class { class } => class.identity(),
            CallNode::Site { reference } => reference
                .context
                .as_ref()
                .map(Entry::identity)
                .unwrap_or_default(),
        }
    }
}

impl TreeBuilder<'_> {
    /// Every method or constructor in the loaded program that uses `entry`,
    /// grouped by the class declaring it. Uses inside nested or anonymous
    /// classes are grouped under that nested class, not its outer class.
    /// References from a class header (`extends`, field types) are not calls.
    pub fn calls(&self, entry: &Entry) -> Result<RelationTree<CallNode>, BuildAbandoned> {
        self.check()?;
        let references = self.hierarchy.references_to(entry);
        if references.is_empty() {
            return Ok(RelationTree::empty());
        }

        let mut groups: BTreeMap<ClassEntry, Vec<CallNode>> = BTreeMap::new();
        for reference in references {
            if !matches!(
                reference.context,
                Some(Entry::Method(_) | Entry::Constructor(_))
            ) {
                continue;
            }
            let Some(class) = reference.context_class().cloned() else {
                continue;
            };
            groups
                .entry(class)
                .or_default()
                .push(CallNode::Site { reference });
        }
        if groups.is_empty() {
            return Ok(RelationTree::empty());
        }

        let mut classes: Vec<CallNode> = groups
            .keys()
            .map(|class| CallNode::Class {
                class: class.clone(),
            })
            .collect();
        self.sort_nodes(&mut classes);

        let mut children = Vec::with_capacity(classes.len());
        for group in classes {
            self.check()?;
            let CallNode::Class { class } = &group else {
                continue;
            };
            let mut sites = groups.remove(class).unwrap_or_default();
            self.sort_nodes(&mut sites);
            children.push(TreeNode::with_children(
                group,
                sites.into_iter().map(TreeNode::leaf).collect(),
            ));
        }

        let root = CallNode::Target {
            reference: EntryReference::declaration(entry.clone()),
        };
        Ok(RelationTree::new(
            TreeNode::with_children(root, children),
            Vec::new(),
        ))
    }
}
