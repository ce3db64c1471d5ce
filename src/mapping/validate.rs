use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::model::program::{argument_count, ClassHierarchy};
use crate::model::{ArgumentEntry, ClassEntry, ConstructorEntry, Entry, FieldEntry, MethodEntry};

use super::MappingStore;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());
static QUALIFIED_CLASS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$").unwrap()
});

/// Java keywords and literals that can never be used as a name or package segment.
pub const JAVA_RESERVED_WORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameErrorKind {
    EmptyName,
    IllegalCharacters,
    ReservedWord,
    Collision,
}

impl RenameErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenameErrorKind::EmptyName => "empty_name",
            RenameErrorKind::IllegalCharacters => "illegal_characters",
            RenameErrorKind::ReservedWord => "reserved_word",
            RenameErrorKind::Collision => "collision",
        }
    }
}

impl fmt::Display for RenameErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rejected rename. Returned to the caller for inline display; the store is
/// left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{detail}")]
pub struct RenameError {
    pub kind: RenameErrorKind,
    pub detail: String,
}

impl RenameError {
    fn new(kind: RenameErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Kind-specific naming rules plus collision checks against the current mapping.
#[derive(Debug, Clone, Default)]
pub struct RenameValidator {
    extra_reserved: Vec<String>,
}

impl RenameValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject these words in addition to the Java reserved words.
    pub fn with_reserved(mut self, words: impl IntoIterator<Item = String>) -> Self {
        self.extra_reserved.extend(words);
        self
    }

    fn is_reserved(&self, word: &str) -> bool {
        JAVA_RESERVED_WORDS.contains(&word) || self.extra_reserved.iter().any(|w| w == word)
    }

    /// Check `new_name` for the entry a rename of `entry` would rebind.
    pub fn validate(
        &self,
        hierarchy: &dyn ClassHierarchy,
        store: &MappingStore,
        entry: &Entry,
        new_name: &str,
    ) -> Result<(), RenameError> {
        if new_name.is_empty() {
            return Err(RenameError::new(
                RenameErrorKind::EmptyName,
                "name cannot be empty",
            ));
        }

        let target = entry.rename_target();
        let qualified = matches!(target, Entry::Class(_) | Entry::Constructor(_));
        let pattern = if qualified {
            &QUALIFIED_CLASS_NAME
        } else {
            &IDENTIFIER
        };
        if !pattern.is_match(new_name) {
            let detail = if qualified {
                format!("'{}' is not a valid class name", new_name)
            } else {
                format!("'{}' is not a valid {} name", new_name, target.kind())
            };
            return Err(RenameError::new(RenameErrorKind::IllegalCharacters, detail));
        }

        let segments: Vec<&str> = if qualified {
            new_name.split('.').collect()
        } else {
            vec![new_name]
        };
        if let Some(word) = segments.iter().find(|s| self.is_reserved(s)) {
            return Err(RenameError::new(
                RenameErrorKind::ReservedWord,
                format!("'{}' is a reserved word", word),
            ));
        }

        match &target {
            Entry::Class(class) | Entry::Constructor(ConstructorEntry { class, .. }) => {
                check_class(hierarchy, store, class, new_name)
            }
            Entry::Field(field) => check_field(hierarchy, store, field, new_name),
            Entry::Method(method) => check_method(hierarchy, store, method, new_name),
            Entry::Argument(argument) => check_argument(store, argument, new_name),
        }
    }
}

fn collision(detail: String) -> Result<(), RenameError> {
    Err(RenameError::new(RenameErrorKind::Collision, detail))
}

fn check_class(
    hierarchy: &dyn ClassHierarchy,
    store: &MappingStore,
    class: &ClassEntry,
    new_name: &str,
) -> Result<(), RenameError> {
    for other in hierarchy.classes() {
        if &other == class {
            continue;
        }
        if store.name_of(&Entry::Class(other)) == new_name {
            return collision(format!("a class named {} already exists", new_name));
        }
    }
    Ok(())
}

fn check_field(
    hierarchy: &dyn ClassHierarchy,
    store: &MappingStore,
    field: &FieldEntry,
    new_name: &str,
) -> Result<(), RenameError> {
    let Some(info) = hierarchy.class_info(&field.class) else {
        return Ok(());
    };
    for other in &info.fields {
        if other.name == field.name && other.descriptor == field.descriptor {
            continue;
        }
        let sibling = Entry::Field(FieldEntry::new(
            field.class.clone(),
            other.name.clone(),
            other.descriptor.clone(),
        ));
        if store.name_of(&sibling) == new_name {
            return collision(format!(
                "class {} already has a field named {}",
                store.name_of(&Entry::Class(field.class.clone())),
                new_name
            ));
        }
    }
    Ok(())
}

fn check_method(
    hierarchy: &dyn ClassHierarchy,
    store: &MappingStore,
    method: &MethodEntry,
    new_name: &str,
) -> Result<(), RenameError> {
    let Some(info) = hierarchy.class_info(&method.class) else {
        return Ok(());
    };
    for other in info
        .methods
        .iter()
        .filter(|m| m.descriptor == method.descriptor && m.name != method.name)
    {
        let sibling = Entry::Method(MethodEntry::new(
            method.class.clone(),
            other.name.clone(),
            other.descriptor.clone(),
        ));
        if store.name_of(&sibling) == new_name {
            return collision(format!(
                "class {} already has a method {}{}",
                store.name_of(&Entry::Class(method.class.clone())),
                new_name,
                method.descriptor
            ));
        }
    }
    Ok(())
}

fn check_argument(
    store: &MappingStore,
    argument: &ArgumentEntry,
    new_name: &str,
) -> Result<(), RenameError> {
    let count = argument_count(argument.behavior.descriptor());
    for index in (0..count).filter(|i| *i != argument.index) {
        let sibling = Entry::Argument(ArgumentEntry::new(argument.behavior.clone(), index));
        if store.name_of(&sibling) == new_name {
            return collision(format!("argument {} is already named {}", index, new_name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::program::{ClassInfo, FieldInfo, MethodInfo, Program};
    use crate::model::BehaviorEntry;

    fn make_class(name: &str, fields: &[&str], methods: &[(&str, &str)]) -> ClassInfo {
        ClassInfo {
            name: name.to_string(),
            superclass: None,
            interfaces: vec![],
            is_interface: false,
            outer: None,
            fields: fields
                .iter()
                .map(|f| FieldInfo {
                    name: f.to_string(),
                    descriptor: "I".to_string(),
                })
                .collect(),
            methods: methods
                .iter()
                .map(|(n, d)| MethodInfo {
                    name: n.to_string(),
                    descriptor: d.to_string(),
                    has_body: true,
                })
                .collect(),
            constructors: vec![],
        }
    }

    fn make_program() -> Program {
        let mut program = Program::new();
        program.add_class(make_class("a", &["f", "g"], &[("m", "()V"), ("n", "()V"), ("o", "(I)V")]));
        program.add_class(make_class("b", &["f"], &[]));
        program.add_class(make_class("com.x.c", &[], &[]));
        program
    }

    fn field(owner: &str, name: &str) -> Entry {
        Entry::Field(FieldEntry::new(ClassEntry::new(owner), name, "I"))
    }

    fn method(owner: &str, name: &str, desc: &str) -> Entry {
        Entry::Method(MethodEntry::new(ClassEntry::new(owner), name, desc))
    }

    fn check(entry: &Entry, name: &str) -> Result<(), RenameError> {
        let program = make_program();
        let store = MappingStore::new();
        RenameValidator::new().validate(&program, &store, entry, name)
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(check(&field("a", "f"), "").unwrap_err().kind, RenameErrorKind::EmptyName);
    }

    #[test]
    fn test_illegal_characters() {
        for bad in ["1abc", "has space", "dash-ed", "a.b"] {
            assert_eq!(
                check(&field("a", "f"), bad).unwrap_err().kind,
                RenameErrorKind::IllegalCharacters,
                "{bad} should be rejected for a field"
            );
        }
        assert!(check(&field("a", "f"), "$ok_name1").is_ok());
    }

    #[test]
    fn test_class_names_allow_packages() {
        let class = Entry::Class(ClassEntry::new("b"));
        assert!(check(&class, "com.example.Widget").is_ok());
        assert_eq!(
            check(&class, "com..Widget").unwrap_err().kind,
            RenameErrorKind::IllegalCharacters
        );
        assert_eq!(
            check(&class, "com.example.").unwrap_err().kind,
            RenameErrorKind::IllegalCharacters
        );
    }

    #[test]
    fn test_reserved_words() {
        assert_eq!(check(&field("a", "f"), "class").unwrap_err().kind, RenameErrorKind::ReservedWord);
        assert_eq!(check(&field("a", "f"), "null").unwrap_err().kind, RenameErrorKind::ReservedWord);
        let class = Entry::Class(ClassEntry::new("b"));
        assert_eq!(
            check(&class, "com.new.Widget").unwrap_err().kind,
            RenameErrorKind::ReservedWord
        );
        assert!(check(&field("a", "f"), "Class").is_ok());
    }

    #[test]
    fn test_extra_reserved_words() {
        let program = make_program();
        let store = MappingStore::new();
        let validator = RenameValidator::new().with_reserved(vec!["record".to_string()]);
        let err = validator
            .validate(&program, &store, &field("a", "f"), "record")
            .unwrap_err();
        assert_eq!(err.kind, RenameErrorKind::ReservedWord);
    }

    #[test]
    fn test_field_collision_is_class_scoped() {
        // sibling field on the same class
        let err = check(&field("a", "f"), "g").unwrap_err();
        assert_eq!(err.kind, RenameErrorKind::Collision);
        assert_eq!(
            check(&field("a", "g"), "f").unwrap_err().kind,
            RenameErrorKind::Collision
        );
        // `g` is only taken on the unrelated class `a`
        assert!(check(&field("b", "f"), "g").is_ok());
    }

    #[test]
    fn test_field_collision_sees_renamed_siblings() {
        let program = make_program();
        let mut store = MappingStore::new();
        store.rename(&program, &field("a", "g"), "count").unwrap();

        let validator = RenameValidator::new();
        let err = validator
            .validate(&program, &store, &field("a", "f"), "count")
            .unwrap_err();
        assert_eq!(err.kind, RenameErrorKind::Collision);
        // the old obfuscated name is free again
        assert!(validator.validate(&program, &store, &field("a", "f"), "g").is_ok());
    }

    #[test]
    fn test_method_collision_compares_descriptor() {
        assert_eq!(
            check(&method("a", "m", "()V"), "n").unwrap_err().kind,
            RenameErrorKind::Collision
        );
        // `o` has a different descriptor, so an overload is fine
        assert!(check(&method("a", "m", "()V"), "o").is_ok());
        // renaming to its own name is not a collision
        assert!(check(&method("a", "m", "()V"), "m").is_ok());
    }

    #[test]
    fn test_class_collision() {
        let err = check(&Entry::Class(ClassEntry::new("b")), "com.x.c").unwrap_err();
        assert_eq!(err.kind, RenameErrorKind::Collision);
        assert!(check(&Entry::Class(ClassEntry::new("b")), "com.y.c").is_ok());
    }

    #[test]
    fn test_constructor_rename_validates_as_class() {
        let ctor = Entry::Constructor(ConstructorEntry::new(ClassEntry::new("b"), "()V"));
        assert!(check(&ctor, "com.example.Thing").is_ok());
        assert_eq!(check(&ctor, "com.x.c").unwrap_err().kind, RenameErrorKind::Collision);
    }

    #[test]
    fn test_argument_collision() {
        let program = make_program();
        let mut store = MappingStore::new();
        let behavior = BehaviorEntry::Method(MethodEntry::new(ClassEntry::new("a"), "p", "(II)V"));
        let first = Entry::Argument(ArgumentEntry::new(behavior.clone(), 0));
        let second = Entry::Argument(ArgumentEntry::new(behavior, 1));
        store.rename(&program, &first, "width").unwrap();

        let err = RenameValidator::new()
            .validate(&program, &store, &second, "width")
            .unwrap_err();
        assert_eq!(err.kind, RenameErrorKind::Collision);
        // default name of the other argument is also taken
        let err = RenameValidator::new()
            .validate(&program, &store, &first, "arg1")
            .unwrap_err();
        assert_eq!(err.kind, RenameErrorKind::Collision);
    }
}
