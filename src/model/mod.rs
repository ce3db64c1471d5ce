use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod program;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Class,
    Field,
    Method,
    Constructor,
    Argument,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Class => "class",
            EntryKind::Field => "field",
            EntryKind::Method => "method",
            EntryKind::Constructor => "constructor",
            EntryKind::Argument => "argument",
        }
    }

    /// Whether an entry of this kind may appear as the context of a reference.
    pub fn can_be_context(&self) -> bool {
        matches!(
            self,
            EntryKind::Class | EntryKind::Method | EntryKind::Constructor
        )
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "class" => Ok(EntryKind::Class),
            "field" => Ok(EntryKind::Field),
            "method" => Ok(EntryKind::Method),
            "constructor" => Ok(EntryKind::Constructor),
            "argument" => Ok(EntryKind::Argument),
            _ => Err(format!("unknown entry kind: {}", s)),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A class, identified by its fully-qualified obfuscated name (`a.b.C`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassEntry {
    pub name: String,
}

impl ClassEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Package portion of the name, if the class is not in the default package.
    pub fn package(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(package, _)| package)
    }

    pub fn simple_name(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(_, simple)| simple)
            .unwrap_or(&self.name)
    }
}

/// Members refer to their owning class by bare name in serialized form.
mod class_name {
    use super::ClassEntry;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(class: &ClassEntry, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&class.name)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ClassEntry, D::Error> {
        String::deserialize(d).map(ClassEntry::new)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldEntry {
    #[serde(with = "class_name")]
    pub class: ClassEntry,
    pub name: String,
    pub descriptor: String,
}

impl FieldEntry {
    pub fn new(class: ClassEntry, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            class,
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodEntry {
    #[serde(with = "class_name")]
    pub class: ClassEntry,
    pub name: String,
    pub descriptor: String,
}

impl MethodEntry {
    pub fn new(class: ClassEntry, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            class,
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// The same signature declared on another class.
    pub fn on_class(&self, class: ClassEntry) -> Self {
        Self {
            class,
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConstructorEntry {
    #[serde(with = "class_name")]
    pub class: ClassEntry,
    pub descriptor: String,
}

impl ConstructorEntry {
    pub fn new(class: ClassEntry, descriptor: impl Into<String>) -> Self {
        Self {
            class,
            descriptor: descriptor.into(),
        }
    }
}

/// The owner of an argument: either a method or a constructor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BehaviorEntry {
    Method(MethodEntry),
    Constructor(ConstructorEntry),
}

impl BehaviorEntry {
    pub fn class(&self) -> &ClassEntry {
        match self {
            BehaviorEntry::Method(m) => &m.class,
            BehaviorEntry::Constructor(c) => &c.class,
        }
    }

    pub fn descriptor(&self) -> &str {
        match self {
            BehaviorEntry::Method(m) => &m.descriptor,
            BehaviorEntry::Constructor(c) => &c.descriptor,
        }
    }
}

impl From<BehaviorEntry> for Entry {
    fn from(behavior: BehaviorEntry) -> Self {
        match behavior {
            BehaviorEntry::Method(m) => Entry::Method(m),
            BehaviorEntry::Constructor(c) => Entry::Constructor(c),
        }
    }
}

/// A method or constructor argument, identified by owner and position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArgumentEntry {
    pub behavior: BehaviorEntry,
    pub index: usize,
}

impl ArgumentEntry {
    pub fn new(behavior: BehaviorEntry, index: usize) -> Self {
        Self { behavior, index }
    }
}

/// Any program symbol the navigator can point at.
///
/// Equality and hashing are structural over the obfuscated identity only;
/// display names live in the mapping store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Class(ClassEntry),
    Field(FieldEntry),
    Method(MethodEntry),
    Constructor(ConstructorEntry),
    Argument(ArgumentEntry),
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Class(_) => EntryKind::Class,
            Entry::Field(_) => EntryKind::Field,
            Entry::Method(_) => EntryKind::Method,
            Entry::Constructor(_) => EntryKind::Constructor,
            Entry::Argument(_) => EntryKind::Argument,
        }
    }

    /// The class that owns this entry (the class itself for class entries).
    pub fn class_entry(&self) -> &ClassEntry {
        match self {
            Entry::Class(c) => c,
            Entry::Field(f) => &f.class,
            Entry::Method(m) => &m.class,
            Entry::Constructor(c) => &c.class,
            Entry::Argument(a) => a.behavior.class(),
        }
    }

    /// Raw obfuscated name, shown when the mapping store has no binding.
    pub fn obf_name(&self) -> String {
        match self {
            Entry::Class(c) => c.name.clone(),
            Entry::Field(f) => f.name.clone(),
            Entry::Method(m) => m.name.clone(),
            Entry::Constructor(c) => c.class.name.clone(),
            Entry::Argument(a) => format!("arg{}", a.index),
        }
    }

    /// Canonical identity string, e.g. `a.b.m(I)V` or `a.b.m(I)V#0`.
    pub fn identity(&self) -> String {
        self.to_string()
    }

    /// The entry whose binding a rename of this entry changes.
    ///
    /// Constructors are named after their class, so renaming one renames the class.
    pub fn rename_target(&self) -> Entry {
        match self {
            Entry::Constructor(c) => Entry::Class(c.class.clone()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Class(c) => write!(f, "{}", c.name),
            Entry::Field(field) => write!(f, "{}.{}:{}", field.class.name, field.name, field.descriptor),
            Entry::Method(m) => write!(f, "{}.{}{}", m.class.name, m.name, m.descriptor),
            Entry::Constructor(c) => write!(f, "{}.<init>{}", c.class.name, c.descriptor),
            Entry::Argument(a) => {
                let owner = Entry::from(a.behavior.clone());
                write!(f, "{}#{}", owner, a.index)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid entry identity: {0}")]
pub struct ParseEntryError(pub String);

/// Parses the identity strings produced by `Display`.
impl FromStr for Entry {
    type Err = ParseEntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseEntryError(s.to_string());

        if let Some((owner, index)) = s.rsplit_once('#') {
            let index: usize = index.parse().map_err(|_| invalid())?;
            let behavior = match owner.parse::<Entry>()? {
                Entry::Method(m) => BehaviorEntry::Method(m),
                Entry::Constructor(c) => BehaviorEntry::Constructor(c),
                _ => return Err(invalid()),
            };
            return Ok(Entry::Argument(ArgumentEntry::new(behavior, index)));
        }

        if let Some(paren) = s.find('(') {
            let (head, descriptor) = s.split_at(paren);
            let (class, name) = head.rsplit_once('.').ok_or_else(invalid)?;
            if class.is_empty() || name.is_empty() {
                return Err(invalid());
            }
            let class = ClassEntry::new(class);
            return Ok(if name == "<init>" {
                Entry::Constructor(ConstructorEntry::new(class, descriptor))
            } else {
                Entry::Method(MethodEntry::new(class, name, descriptor))
            });
        }

        if let Some((head, descriptor)) = s.split_once(':') {
            let (class, name) = head.rsplit_once('.').ok_or_else(invalid)?;
            if class.is_empty() || name.is_empty() || descriptor.is_empty() {
                return Err(invalid());
            }
            return Ok(Entry::Field(FieldEntry::new(ClassEntry::new(class), name, descriptor)));
        }

        if s.is_empty() || s.starts_with('.') || s.ends_with('.') {
            return Err(invalid());
        }
        Ok(Entry::Class(ClassEntry::new(s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} entry {context} cannot be the context of a reference")]
pub struct InvalidContextError {
    pub kind: EntryKind,
    pub context: String,
}

/// An occurrence of an entry in source, tagged with the method, constructor or
/// class it was found in. No context means a declaration site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawEntryReference")]
pub struct EntryReference {
    pub entry: Entry,
    pub context: Option<Entry>,
}

#[derive(Deserialize)]
struct RawEntryReference {
    entry: Entry,
    #[serde(default)]
    context: Option<Entry>,
}

impl TryFrom<RawEntryReference> for EntryReference {
    type Error = InvalidContextError;

    fn try_from(raw: RawEntryReference) -> Result<Self, Self::Error> {
        EntryReference::new(raw.entry, raw.context)
    }
}

impl EntryReference {
    pub fn new(entry: Entry, context: Option<Entry>) -> Result<Self, InvalidContextError> {
        if let Some(ctx) = &context {
            if !ctx.kind().can_be_context() {
                return Err(InvalidContextError {
                    kind: ctx.kind(),
                    context: ctx.identity(),
                });
            }
        }
        Ok(Self { entry, context })
    }

    pub fn declaration(entry: Entry) -> Self {
        Self {
            entry,
            context: None,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.context.is_none()
    }

    /// The class containing the referencing context, if any.
    pub fn context_class(&self) -> Option<&ClassEntry> {
        self.context.as_ref().map(|c| c.class_entry())
    }
}

/// Half-open character span `[start, end)` in rendered source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}
