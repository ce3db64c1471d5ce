//! Turns relationship trees into labeled display trees.
//!
//! Labels are looked up in the mapping store on every render, so a tree built
//! before a rename shows the new names without being rebuilt.

use serde::Serialize;

use super::{RelationNode, RelationTree, TreeNode};
use crate::mapping::MappingStore;
use crate::model::Entry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayNode {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub focused: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DisplayNode>,
}

pub fn render<T: RelationNode>(tree: &RelationTree<T>, names: &MappingStore) -> Option<DisplayNode> {
    let root = tree.root.as_ref()?;
    Some(render_node(root, Some(&tree.focus), names))
}

fn render_node<T: RelationNode>(
    node: &TreeNode<T>,
    focus: Option<&[usize]>,
    names: &MappingStore,
) -> DisplayNode {
    let children = node
        .children
        .iter()
        .enumerate()
        .map(|(i, child)| {
            let child_focus = match focus {
                Some([first, rest @ ..]) if *first == i => Some(rest),
                _ => None,
            };
            render_node(child, child_focus, names)
        })
        .collect();

    DisplayNode {
        label: node.value.label(names),
        note: node.value.note(),
        focused: matches!(focus, Some([])),
        children,
    }
}

/// Display name with its owner: `Class`, `Class.member`, `Class.<init>`,
/// `Class.member:arg`.
pub fn qualified_label(entry: &Entry, names: &MappingStore) -> String {
    let class = names.name_of(&Entry::Class(entry.class_entry().clone()));
    match entry {
        Entry::Class(_) => class,
        Entry::Constructor(_) => format!("{}.<init>", class),
        Entry::Field(_) | Entry::Method(_) => format!("{}.{}", class, names.name_of(entry)),
        Entry::Argument(arg) => {
            let owner = qualified_label(&arg.behavior.clone().into(), names);
            format!("{}:{}", owner, names.name_of(entry))
        }
    }
}

impl DisplayNode {
    /// The focused node's label, if any node is focused.
    pub fn focused_label(&self) -> Option<&str> {
        if self.focused {
            return Some(&self.label);
        }
        self.children.iter().find_map(|c| c.focused_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::program::{ClassInfo, Program};
    use crate::model::{
        ArgumentEntry, BehaviorEntry, ClassEntry, ConstructorEntry, FieldEntry, MethodEntry,
    };

    fn make_class(name: &str) -> ClassInfo {
        ClassInfo {
            name: name.to_string(),
            superclass: None,
            interfaces: vec![],
            is_interface: false,
            outer: None,
            fields: vec![],
            methods: vec![],
            constructors: vec![],
        }
    }

    #[test]
    fn test_render_marks_focus_and_relabels_after_rename() {
        let tree = RelationTree::new(
            TreeNode::with_children(
                ClassEntry::new("a"),
                vec![TreeNode::leaf(ClassEntry::new("b")), TreeNode::leaf(ClassEntry::new("c"))],
            ),
            vec![1],
        );
        let mut program = Program::new();
        program.add_class(make_class("c"));
        let mut names = MappingStore::new();

        let before = render(&tree, &names).unwrap();
        assert_eq!(before.focused_label(), Some("c"));
        assert!(!before.focused);
        assert!(!before.children[0].focused);

        names
            .rename(&program, &Entry::Class(ClassEntry::new("c")), "Circle")
            .unwrap();
        let after = render(&tree, &names).unwrap();
        assert_eq!(after.focused_label(), Some("Circle"));
    }

    #[test]
    fn test_empty_tree_renders_nothing() {
        let tree: RelationTree<ClassEntry> = RelationTree::empty();
        assert!(render(&tree, &MappingStore::new()).is_none());
    }

    #[test]
    fn test_qualified_labels() {
        let names = MappingStore::new();
        let class = ClassEntry::new("p.a");
        let method = MethodEntry::new(class.clone(), "m", "(I)V");
        let ctor = ConstructorEntry::new(class.clone(), "()V");

        assert_eq!(qualified_label(&Entry::Class(class.clone()), &names), "p.a");
        assert_eq!(
            qualified_label(&Entry::Field(FieldEntry::new(class.clone(), "f", "I")), &names),
            "p.a.f"
        );
        assert_eq!(qualified_label(&Entry::Method(method.clone()), &names), "p.a.m");
        assert_eq!(qualified_label(&Entry::Constructor(ctor.clone()), &names), "p.a.<init>");
        let arg = ArgumentEntry::new(BehaviorEntry::Method(method), 0);
        assert_eq!(qualified_label(&Entry::Argument(arg), &names), "p.a.m:arg0");
        let arg = ArgumentEntry::new(BehaviorEntry::Constructor(ctor), 1);
        assert_eq!(qualified_label(&Entry::Argument(arg), &names), "p.a.<init>:arg1");
    }

    #[test]
    fn test_serialized_shape_omits_defaults() {
        let node = DisplayNode {
            label: "a".to_string(),
            note: None,
            focused: false,
            children: vec![],
        };
        assert_eq!(serde_json::to_string(&node).unwrap(), r#"{"label":"a"}"#);
    }
}
