use std::collections::{HashSet, VecDeque};
use std::iter;

use super::{BuildAbandoned, RelationTree, TreeBuilder, TreeNode};
use crate::model::{ClassEntry, MethodEntry};

impl TreeBuilder<'_> {
    /// Classes implementing an interface, descending through sub-interfaces
    /// and through the subclasses of implementing classes, which implement
    /// the interface by inheritance. Anything that is not a loaded interface
    /// has no implementations.
    pub fn class_implementations(
        &self,
        interface: &ClassEntry,
    ) -> Result<RelationTree<ClassEntry>, BuildAbandoned> {
        self.check()?;
        if !self.hierarchy.is_interface(interface) {
            return Ok(RelationTree::empty());
        }

        let mut seen = HashSet::new();
        let tree = self.implementer_subtree(interface.clone(), &mut seen)?;
        if tree.children.is_empty() {
            return Ok(RelationTree::empty());
        }
        Ok(RelationTree::new(tree, Vec::new()))
    }

    fn implementer_subtree(
        &self,
        class: ClassEntry,
        seen: &mut HashSet<ClassEntry>,
    ) -> Result<TreeNode<ClassEntry>, BuildAbandoned> {
        self.check()?;
        seen.insert(class.clone());
        let below = if self.hierarchy.is_interface(&class) {
            self.hierarchy.implementers(&class)
        } else {
            self.hierarchy.subclasses(&class)
        };

        let mut implementers: Vec<ClassEntry> =
            below.into_iter().filter(|c| !seen.contains(c)).collect();
        self.sort_nodes(&mut implementers);

        let mut children = Vec::with_capacity(implementers.len());
        for implementer in implementers {
            children.push(self.implementer_subtree(implementer, seen)?);
        }
        Ok(TreeNode::with_children(class, children))
    }

    /// Concrete implementations of an interface or abstract method.
    ///
    /// A concrete method is resolved to the first interface that declares the
    /// same signature, searching the interfaces of its class, then of each
    /// superclass, each with its super-interfaces. The result is empty when nothing in the
    /// loaded program implements the method.
    pub fn method_implementations(
        &self,
        method: &MethodEntry,
    ) -> Result<RelationTree<MethodEntry>, BuildAbandoned> {
        self.check()?;
        if !self.hierarchy.contains(&method.class) {
            return Ok(RelationTree::empty());
        }

        let root = if self.hierarchy.is_interface(&method.class) {
            method.clone()
        } else if let Some(interface) = self.declaring_interface(method) {
            method.on_class(interface)
        } else if self.hierarchy.declares_method(method) && !self.hierarchy.implements_method(method)
        {
            method.clone()
        } else {
            return Ok(RelationTree::empty());
        };

        let mut implementations = Vec::new();
        for class in self.implementing_classes(&root.class) {
            self.check()?;
            let candidate = root.on_class(class);
            if self.hierarchy.implements_method(&candidate) {
                implementations.push(candidate);
            }
        }
        if implementations.is_empty() {
            return Ok(RelationTree::empty());
        }
        self.sort_nodes(&mut implementations);

        let tree = TreeNode::with_children(
            root,
            implementations.into_iter().map(TreeNode::leaf).collect(),
        );
        let focus = tree
            .find_path(&|m: &MethodEntry| m == method)
            .unwrap_or_default();
        Ok(RelationTree::new(tree, focus))
    }

    fn declaring_interface(&self, method: &MethodEntry) -> Option<ClassEntry> {
        let chain = iter::once(method.class.clone())
            .chain(self.hierarchy.ancestors(&method.class));
        let mut seen = HashSet::new();
        for class in chain {
            let mut queue: VecDeque<ClassEntry> = self.hierarchy.interfaces(&class).into();
            while let Some(interface) = queue.pop_front() {
                if !seen.insert(interface.clone()) {
                    continue;
                }
                if self.hierarchy.declares_method(&method.on_class(interface.clone())) {
                    return Some(interface);
                }
                queue.extend(self.hierarchy.interfaces(&interface));
            }
        }
        None
    }

    /// Every loaded class below `owner`: subclasses for classes; implementers,
    /// their sub-interfaces and the implementers' subclasses for interfaces.
    fn implementing_classes(&self, owner: &ClassEntry) -> Vec<ClassEntry> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(owner.clone());
        let mut stack = vec![owner.clone()];
        while let Some(current) = stack.pop() {
            let mut next = self.hierarchy.subclasses(&current);
            if self.hierarchy.is_interface(&current) {
                next.extend(self.hierarchy.implementers(&current));
            }
            for class in next {
                if seen.insert(class.clone()) {
                    out.push(class.clone());
                    stack.push(class);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingStore;
    use crate::model::program::{ClassInfo, MethodInfo, Program};

    fn make_class(name: &str, superclass: Option<&str>, interfaces: &[&str]) -> ClassInfo {
        ClassInfo {
            name: name.to_string(),
            superclass: superclass.map(str::to_string),
            interfaces: interfaces.iter().map(|i| i.to_string()).collect(),
            is_interface: false,
            outer: None,
            fields: vec![],
            methods: vec![],
            constructors: vec![],
        }
    }

    fn make_interface(name: &str, extends: &[&str]) -> ClassInfo {
        let mut info = make_class(name, None, extends);
        info.is_interface = true;
        info
    }

    fn with_method(mut class: ClassInfo, has_body: bool) -> ClassInfo {
        class.methods.push(MethodInfo {
            name: "run".to_string(),
            descriptor: "()V".to_string(),
            has_body,
        });
        class
    }

    fn run_on(class: &str) -> MethodEntry {
        MethodEntry::new(ClassEntry::new(class), "run", "()V")
    }

    fn make_program() -> Program {
        let mut program = Program::new();
        program.add_class(with_method(make_interface("i", &[]), false));
        program.add_class(make_interface("j", &["i"]));
        program.add_class(with_method(make_class("x", None, &["i"]), true));
        program.add_class(with_method(make_class("y", None, &["j"]), true));
        program.add_class(make_class("z", None, &["i"]));
        program
    }

    #[test]
    fn test_class_implementations_descend_sub_interfaces() {
        let program = make_program();
        let names = MappingStore::new();
        let tree = TreeBuilder::new(&program, &names)
            .class_implementations(&ClassEntry::new("i"))
            .unwrap();

        let root = tree.root.as_ref().unwrap();
        let children: Vec<&str> = root.children.iter().map(|c| c.value.name.as_str()).collect();
        assert_eq!(children, vec!["j", "x", "z"]);
        assert_eq!(root.children[0].children[0].value, ClassEntry::new("y"));
    }

    #[test]
    fn test_class_implementations_reach_subclasses_of_implementers() {
        let mut program = make_program();
        program.add_class(make_class("base", None, &["i"]));
        program.add_class(make_class("square", Some("base"), &[]));
        program.add_class(make_class("circle", Some("base"), &[]));
        program.add_class(make_class("unit", Some("circle"), &[]));
        let names = MappingStore::new();

        let tree = TreeBuilder::new(&program, &names)
            .class_implementations(&ClassEntry::new("i"))
            .unwrap();
        let root = tree.root.as_ref().unwrap();
        let base = &root.children[0];
        assert_eq!(base.value, ClassEntry::new("base"));
        let below: Vec<&str> = base.children.iter().map(|c| c.value.name.as_str()).collect();
        assert_eq!(below, vec!["circle", "square"]);
        assert_eq!(base.children[0].children[0].value, ClassEntry::new("unit"));
        assert_eq!(tree.node_count(), 9);
    }

    #[test]
    fn test_class_implementations_of_concrete_class_is_empty() {
        let program = make_program();
        let names = MappingStore::new();
        let tree = TreeBuilder::new(&program, &names)
            .class_implementations(&ClassEntry::new("x"))
            .unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_interface_method_implementations() {
        let program = make_program();
        let names = MappingStore::new();
        let tree = TreeBuilder::new(&program, &names)
            .method_implementations(&run_on("i"))
            .unwrap();

        let root = tree.root.as_ref().unwrap();
        assert_eq!(root.value, run_on("i"));
        let children: Vec<&MethodEntry> = root.children.iter().map(|c| &c.value).collect();
        assert_eq!(children, vec![&run_on("x"), &run_on("y")]);
        assert!(tree.focus.is_empty());
    }

    #[test]
    fn test_concrete_method_resolves_through_interface() {
        let program = make_program();
        let names = MappingStore::new();
        let tree = TreeBuilder::new(&program, &names)
            .method_implementations(&run_on("x"))
            .unwrap();
        assert_eq!(tree.root.as_ref().unwrap().value, run_on("i"));
        assert_eq!(tree.focused().unwrap().value, run_on("x"));
    }

    #[test]
    fn test_inherited_interface_resolves_concrete_method() {
        let mut program = Program::new();
        program.add_class(make_interface("top", &[]));
        program.add_class(with_method(make_interface("shape", &["top"]), false));
        program.add_class(with_method(make_class("base", None, &["shape"]), false));
        program.add_class(with_method(make_class("square", Some("base"), &[]), true));
        program.add_class(with_method(make_class("circle", Some("base"), &[]), true));
        let names = MappingStore::new();

        let tree = TreeBuilder::new(&program, &names)
            .method_implementations(&run_on("square"))
            .unwrap();
        let root = tree.root.as_ref().unwrap();
        assert_eq!(root.value, run_on("shape"));
        let children: Vec<&MethodEntry> = root.children.iter().map(|c| &c.value).collect();
        assert_eq!(children, vec![&run_on("circle"), &run_on("square")]);
        assert_eq!(tree.focused().unwrap().value, run_on("square"));
    }

    #[test]
    fn test_abstract_method_implementations() {
        let mut program = Program::new();
        program.add_class(with_method(make_class("base", None, &[]), false));
        program.add_class(with_method(make_class("impl", Some("base"), &[]), true));
        program.add_class(make_class("plain", Some("base"), &[]));
        let names = MappingStore::new();

        let tree = TreeBuilder::new(&program, &names)
            .method_implementations(&run_on("base"))
            .unwrap();
        let root = tree.root.as_ref().unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].value, run_on("impl"));
    }

    #[test]
    fn test_method_with_zero_overriders_is_empty() {
        let mut program = Program::new();
        program.add_class(with_method(make_class("base", None, &[]), false));
        program.add_class(make_class("child", Some("base"), &[]));
        let names = MappingStore::new();

        let builder = TreeBuilder::new(&program, &names);
        let tree = builder.method_implementations(&run_on("base")).unwrap();
        assert!(tree.is_empty());

        // a concrete method outside any interface has nothing to implement
        let mut program = Program::new();
        program.add_class(with_method(make_class("solo", None, &[]), true));
        let builder = TreeBuilder::new(&program, &names);
        assert!(builder.method_implementations(&run_on("solo")).unwrap().is_empty());
    }
}
