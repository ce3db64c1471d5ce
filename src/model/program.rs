use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::{ClassEntry, Entry, EntryReference, MethodEntry};

/// Class-hierarchy data handed over by the decompiler for the loaded program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramSnapshot {
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
    /// Every non-declaration occurrence found while decompiling method bodies.
    #[serde(default)]
    pub references: Vec<EntryReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub is_interface: bool,
    /// Enclosing class for nested and anonymous classes.
    #[serde(default)]
    pub outer: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
    #[serde(default)]
    pub methods: Vec<MethodInfo>,
    #[serde(default)]
    pub constructors: Vec<ConstructorInfo>,
}

impl ClassInfo {
    pub fn entry(&self) -> ClassEntry {
        ClassEntry::new(self.name.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub descriptor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    pub descriptor: String,
    /// False for abstract and interface methods.
    #[serde(default = "default_has_body")]
    pub has_body: bool,
}

fn default_has_body() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructorInfo {
    pub descriptor: String,
}

/// Query interface over the loaded program's class hierarchy.
///
/// Links that point outside the loaded program (library classes) are never
/// returned.
pub trait ClassHierarchy: Send + Sync {
    fn class_info(&self, class: &ClassEntry) -> Option<&ClassInfo>;

    /// Direct superclass, if it is part of the loaded program.
    fn superclass(&self, class: &ClassEntry) -> Option<ClassEntry>;

    /// Direct known subclasses.
    fn subclasses(&self, class: &ClassEntry) -> Vec<ClassEntry>;

    /// Directly implemented (or, for interfaces, extended) interfaces.
    fn interfaces(&self, class: &ClassEntry) -> Vec<ClassEntry>;

    /// Classes and interfaces that list `interface` among their direct interfaces.
    fn implementers(&self, interface: &ClassEntry) -> Vec<ClassEntry>;

    fn classes(&self) -> Vec<ClassEntry>;

    /// Non-declaration references whose entry is `entry`.
    fn references_to(&self, entry: &Entry) -> Vec<EntryReference>;

    fn contains(&self, class: &ClassEntry) -> bool {
        self.class_info(class).is_some()
    }

    fn is_interface(&self, class: &ClassEntry) -> bool {
        self.class_info(class).is_some_and(|c| c.is_interface)
    }

    fn outer_class(&self, class: &ClassEntry) -> Option<ClassEntry> {
        self.class_info(class)
            .and_then(|c| c.outer.as_ref())
            .map(|outer| ClassEntry::new(outer.clone()))
    }

    fn method_info(&self, method: &MethodEntry) -> Option<&MethodInfo> {
        self.class_info(&method.class).and_then(|c| {
            c.methods
                .iter()
                .find(|m| m.name == method.name && m.descriptor == method.descriptor)
        })
    }

    fn declares_method(&self, method: &MethodEntry) -> bool {
        self.method_info(method).is_some()
    }

    /// Whether the method is declared on its class with a body.
    fn implements_method(&self, method: &MethodEntry) -> bool {
        self.method_info(method).is_some_and(|m| m.has_body)
    }

    /// Every transitive subclass, breadth first.
    fn descendants(&self, class: &ClassEntry) -> Vec<ClassEntry> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(class.clone());
        let mut queue = VecDeque::from(self.subclasses(class));
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            queue.extend(self.subclasses(&next));
            out.push(next);
        }
        out
    }

    /// Superclass chain from the direct superclass upwards.
    fn ancestors(&self, class: &ClassEntry) -> Vec<ClassEntry> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(class.clone());
        let mut current = self.superclass(class);
        while let Some(next) = current {
            if !seen.insert(next.clone()) {
                break;
            }
            current = self.superclass(&next);
            chain.push(next);
        }
        chain
    }
}

fn remove_edge(
    edges: &mut HashMap<ClassEntry, Vec<ClassEntry>>,
    parent: &str,
    child: &ClassEntry,
) {
    let key = ClassEntry::new(parent);
    if let Some(children) = edges.get_mut(&key) {
        children.retain(|c| c != child);
        if children.is_empty() {
            edges.remove(&key);
        }
    }
}

/// In-memory class hierarchy built from a [`ProgramSnapshot`].
#[derive(Debug, Default)]
pub struct Program {
    classes: HashMap<ClassEntry, ClassInfo>,
    /// superclass -> direct subclasses
    subclasses: HashMap<ClassEntry, Vec<ClassEntry>>,
    /// interface -> direct implementers
    implementers: HashMap<ClassEntry, Vec<ClassEntry>>,
    references_to: HashMap<Entry, Vec<EntryReference>>,
    reference_count: usize,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: ProgramSnapshot) -> Self {
        let mut program = Self::new();
        for class in snapshot.classes {
            program.add_class(class);
        }
        for reference in snapshot.references {
            program.add_reference(reference);
        }
        program
    }

    /// Add or replace a class. Replacing drops the edges of the old definition.
    pub fn add_class(&mut self, info: ClassInfo) {
        let entry = info.entry();
        if let Some(previous) = self.classes.remove(&entry) {
            self.unlink(&entry, &previous);
        }
        if let Some(superclass) = &info.superclass {
            self.subclasses
                .entry(ClassEntry::new(superclass.clone()))
                .or_default()
                .push(entry.clone());
        }
        for interface in &info.interfaces {
            self.implementers
                .entry(ClassEntry::new(interface.clone()))
                .or_default()
                .push(entry.clone());
        }
        self.classes.insert(entry, info);
    }

    fn unlink(&mut self, entry: &ClassEntry, previous: &ClassInfo) {
        if let Some(superclass) = &previous.superclass {
            remove_edge(&mut self.subclasses, superclass, entry);
        }
        for interface in &previous.interfaces {
            remove_edge(&mut self.implementers, interface, entry);
        }
    }

    /// Record a reference; declarations carry no call-site information and are skipped.
    pub fn add_reference(&mut self, reference: EntryReference) {
        if reference.is_declaration() {
            return;
        }
        self.references_to
            .entry(reference.entry.clone())
            .or_default()
            .push(reference);
        self.reference_count += 1;
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn reference_count(&self) -> usize {
        self.reference_count
    }

    fn loaded(&self, names: Option<&Vec<ClassEntry>>) -> Vec<ClassEntry> {
        names
            .map(|list| {
                list.iter()
                    .filter(|c| self.classes.contains_key(*c))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ClassHierarchy for Program {
    fn class_info(&self, class: &ClassEntry) -> Option<&ClassInfo> {
        self.classes.get(class)
    }

    fn superclass(&self, class: &ClassEntry) -> Option<ClassEntry> {
        let name = self.classes.get(class)?.superclass.as_ref()?;
        let superclass = ClassEntry::new(name.clone());
        self.classes.contains_key(&superclass).then_some(superclass)
    }

    fn subclasses(&self, class: &ClassEntry) -> Vec<ClassEntry> {
        self.loaded(self.subclasses.get(class))
    }

    fn interfaces(&self, class: &ClassEntry) -> Vec<ClassEntry> {
        self.classes
            .get(class)
            .map(|info| {
                info.interfaces
                    .iter()
                    .map(|name| ClassEntry::new(name.clone()))
                    .filter(|c| self.classes.contains_key(c))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn implementers(&self, interface: &ClassEntry) -> Vec<ClassEntry> {
        self.loaded(self.implementers.get(interface))
    }

    fn classes(&self) -> Vec<ClassEntry> {
        self.classes.keys().cloned().collect()
    }

    fn references_to(&self, entry: &Entry) -> Vec<EntryReference> {
        self.references_to.get(entry).cloned().unwrap_or_default()
    }
}

/// Number of parameters in a JVM method descriptor such as `(I[JLa/b;)V`.
pub fn argument_count(descriptor: &str) -> usize {
    let params = match descriptor
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
    {
        Some((params, _)) => params,
        None => return 0,
    };

    let mut count = 0;
    let mut chars = params.chars();
    while let Some(c) = chars.next() {
        match c {
            '[' => continue,
            'L' => {
                for inner in chars.by_ref() {
                    if inner == ';' {
                        break;
                    }
                }
                count += 1;
            }
            _ => count += 1,
        }
    }
    count
}
