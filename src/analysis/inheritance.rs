use std::collections::HashSet;

use serde::Serialize;

use super::{render, BuildAbandoned, RelationNode, RelationTree, TreeBuilder, TreeNode};
use crate::mapping::MappingStore;
use crate::model::{ClassEntry, Entry, MethodEntry};

/// One class's view of a method signature in the inheritance tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodInheritanceNode {
    pub method: MethodEntry,
    /// The class declares the method with a body, rather than inheriting it
    /// or declaring it abstract.
    pub implemented: bool,
}

impl RelationNode for MethodInheritanceNode {
    fn label(&self, names: &MappingStore) -> String {
        render::qualified_label(&Entry::Method(self.method.clone()), names)
    }

    fn identity(&self) -> String {
        Entry::Method(self.method.clone()).identity()
    }

    fn note(&self) -> Option<String> {
        (!self.implemented).then(|| "not implemented".to_string())
    }
}

impl TreeBuilder<'_> {
    /// The whole single-inheritance tree containing `class`, rooted at its
    /// topmost loaded ancestor and focused on `class`.
    pub fn class_inheritance(
        &self,
        class: &ClassEntry,
    ) -> Result<RelationTree<ClassEntry>, BuildAbandoned> {
        self.check()?;
        if !self.hierarchy.contains(class) {
            return Ok(RelationTree::empty());
        }

        let root = self
            .hierarchy
            .ancestors(class)
            .pop()
            .unwrap_or_else(|| class.clone());
        let mut seen = HashSet::new();
        let tree = self.class_subtree(root, &mut seen)?;
        let focus = tree.find_path(&|c: &ClassEntry| c == class).unwrap_or_default();
        Ok(RelationTree::new(tree, focus))
    }

    fn class_subtree(
        &self,
        class: ClassEntry,
        seen: &mut HashSet<ClassEntry>,
    ) -> Result<TreeNode<ClassEntry>, BuildAbandoned> {
        self.check()?;
        seen.insert(class.clone());

        let mut subclasses: Vec<ClassEntry> = self
            .hierarchy
            .subclasses(&class)
            .into_iter()
            .filter(|c| !seen.contains(c))
            .collect();
        self.sort_nodes(&mut subclasses);

        let mut children = Vec::with_capacity(subclasses.len());
        for sub in subclasses {
            children.push(self.class_subtree(sub, seen)?);
        }
        Ok(TreeNode::with_children(class, children))
    }

    /// Every class under the topmost declaration of the method's signature,
    /// each marked with whether it implements the method itself.
    pub fn method_inheritance(
        &self,
        method: &MethodEntry,
    ) -> Result<RelationTree<MethodInheritanceNode>, BuildAbandoned> {
        self.check()?;
        if !self.hierarchy.contains(&method.class) {
            return Ok(RelationTree::empty());
        }

        let declaring = std::iter::once(method.class.clone())
            .chain(self.hierarchy.ancestors(&method.class))
            .filter(|c| self.hierarchy.declares_method(&method.on_class(c.clone())))
            .last();
        let Some(root) = declaring else {
            return Ok(RelationTree::empty());
        };

        let mut seen = HashSet::new();
        let tree = self.method_subtree(method, root, &mut seen)?;
        let focus = tree
            .find_path(&|n: &MethodInheritanceNode| n.method == *method)
            .unwrap_or_default();
        Ok(RelationTree::new(tree, focus))
    }

    fn method_subtree(
        &self,
        method: &MethodEntry,
        class: ClassEntry,
        seen: &mut HashSet<ClassEntry>,
    ) -> Result<TreeNode<MethodInheritanceNode>, BuildAbandoned> {
        self.check()?;
        seen.insert(class.clone());

        let mut subclasses: Vec<MethodInheritanceNode> = self
            .hierarchy
            .subclasses(&class)
            .into_iter()
            .filter(|c| !seen.contains(c))
            .map(|c| self.method_node(method, c))
            .collect();
        self.sort_nodes(&mut subclasses);

        let mut children = Vec::with_capacity(subclasses.len());
        for node in subclasses {
            children.push(self.method_subtree(method, node.method.class, seen)?);
        }
        Ok(TreeNode::with_children(self.method_node(method, class), children))
    }

    fn method_node(&self, method: &MethodEntry, class: ClassEntry) -> MethodInheritanceNode {
        let method = method.on_class(class);
        let implemented = self.hierarchy.implements_method(&method);
        MethodInheritanceNode {
            method,
            implemented,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::program::{ClassInfo, MethodInfo, Program};

    fn make_class(name: &str, superclass: Option<&str>) -> ClassInfo {
        ClassInfo {
            name: name.to_string(),
            superclass: superclass.map(str::to_string),
            interfaces: vec![],
            is_interface: false,
            outer: None,
            fields: vec![],
            methods: vec![],
            constructors: vec![],
        }
    }

    fn with_method(mut class: ClassInfo, name: &str, has_body: bool) -> ClassInfo {
        class.methods.push(MethodInfo {
            name: name.to_string(),
            descriptor: "()V".to_string(),
            has_body,
        });
        class
    }

    fn labels(node: &TreeNode<ClassEntry>) -> Vec<&str> {
        node.children.iter().map(|c| c.value.name.as_str()).collect()
    }

    #[test]
    fn test_class_tree_rooted_at_topmost_ancestor() {
        let mut program = Program::new();
        program.add_class(make_class("a", Some("java.lang.Object")));
        program.add_class(make_class("b", Some("a")));
        program.add_class(make_class("c", Some("b")));
        program.add_class(make_class("d", Some("a")));
        let names = MappingStore::new();

        let tree = TreeBuilder::new(&program, &names)
            .class_inheritance(&ClassEntry::new("c"))
            .unwrap();
        let root = tree.root.as_ref().unwrap();
        assert_eq!(root.value, ClassEntry::new("a"));
        assert_eq!(labels(root), vec!["b", "d"]);
        assert_eq!(tree.focus, vec![0, 0]);
        assert_eq!(tree.focused().unwrap().value, ClassEntry::new("c"));
    }

    #[test]
    fn test_children_use_byte_order_of_display_names() {
        let mut program = Program::new();
        program.add_class(make_class("root", None));
        program.add_class(make_class("x1", Some("root")));
        program.add_class(make_class("x2", Some("root")));
        program.add_class(make_class("x3", Some("root")));

        let mut names = MappingStore::new();
        for (obf, deobf) in [("x1", "Zebra"), ("x2", "apple"), ("x3", "Banana")] {
            names
                .rename(&program, &Entry::Class(ClassEntry::new(obf)), deobf)
                .unwrap();
        }

        let tree = TreeBuilder::new(&program, &names)
            .class_inheritance(&ClassEntry::new("root"))
            .unwrap();
        let root = tree.root.as_ref().unwrap();
        let ordered: Vec<String> = root.children.iter().map(|c| c.value.label(&names)).collect();
        assert_eq!(ordered, vec!["Banana", "Zebra", "apple"]);
        assert!(tree.focus.is_empty());
    }

    #[test]
    fn test_equal_labels_fall_back_to_identity() {
        let mut program = Program::new();
        program.add_class(make_class("r", None));
        program.add_class(make_class("p.b", Some("r")));
        program.add_class(make_class("q.a", Some("r")));
        let names = MappingStore::from_bindings(vec![
            crate::mapping::MappingBinding {
                entry: Entry::Class(ClassEntry::new("p.b")),
                name: "Same".to_string(),
            },
            crate::mapping::MappingBinding {
                entry: Entry::Class(ClassEntry::new("q.a")),
                name: "Same".to_string(),
            },
        ]);

        let tree = TreeBuilder::new(&program, &names)
            .class_inheritance(&ClassEntry::new("r"))
            .unwrap();
        assert_eq!(labels(tree.root.as_ref().unwrap()), vec!["p.b", "q.a"]);
    }

    #[test]
    fn test_unknown_class_gives_empty_tree() {
        let program = Program::new();
        let names = MappingStore::new();
        let tree = TreeBuilder::new(&program, &names)
            .class_inheritance(&ClassEntry::new("missing"))
            .unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_method_tree_marks_implementations() {
        let mut program = Program::new();
        program.add_class(with_method(make_class("a", None), "m", false));
        program.add_class(with_method(make_class("b", Some("a")), "m", true));
        program.add_class(make_class("c", Some("a")));
        program.add_class(with_method(make_class("d", Some("c")), "m", true));
        let names = MappingStore::new();

        let target = MethodEntry::new(ClassEntry::new("d"), "m", "()V");
        let tree = TreeBuilder::new(&program, &names)
            .method_inheritance(&target)
            .unwrap();

        let root = tree.root.as_ref().unwrap();
        assert_eq!(root.value.method.class, ClassEntry::new("a"));
        assert!(!root.value.implemented);
        assert_eq!(root.value.note().as_deref(), Some("not implemented"));

        let b = &root.children[0];
        let c = &root.children[1];
        assert!(b.value.implemented);
        assert!(!c.value.implemented);
        assert!(c.children[0].value.implemented);
        assert_eq!(tree.focused().unwrap().value.method, target);
        assert_eq!(b.value.label(&names), "b.m");
    }

    #[test]
    fn test_undeclared_method_gives_empty_tree() {
        let mut program = Program::new();
        program.add_class(make_class("a", None));
        let names = MappingStore::new();
        let tree = TreeBuilder::new(&program, &names)
            .method_inheritance(&MethodEntry::new(ClassEntry::new("a"), "m", "()V"))
            .unwrap();
        assert!(tree.is_empty());
    }
}
