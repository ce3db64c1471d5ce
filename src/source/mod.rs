//! Caret-to-reference resolution over one rendered source text.
//!
//! A [`TokenIndex`] is built once per render from the decompiler's token
//! annotations and never changes afterwards. [`SourceView`] keeps the text and
//! its index together so an index can never be queried against another text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mapping::MappingStore;
use crate::model::{Entry, EntryReference, Span};

/// A source span bound to the reference it denotes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub span: Span,
    pub reference: EntryReference,
}

impl Token {
    pub fn new(span: Span, reference: EntryReference) -> Self {
        Self { span, reference }
    }
}

/// Structural problems in the token annotations. Fatal to the build that
/// found them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedSourceError {
    #[error("token at {start}..{end} is empty")]
    EmptySpan { start: usize, end: usize },
    #[error("token at {start}..{end} extends past the end of the source ({len} characters)")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("token at {first_start}..{first_end} overlaps token at {second_start}..{second_end}")]
    Overlap {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },
}

/// Sorted, non-overlapping token spans with O(log n) point lookup.
#[derive(Debug, Clone, Default)]
pub struct TokenIndex {
    tokens: Vec<Token>,
}

impl TokenIndex {
    /// Build an index for a source of `source_len` characters.
    pub fn build(
        source_len: usize,
        mut annotations: Vec<Token>,
    ) -> Result<Self, MalformedSourceError> {
        for token in &annotations {
            let Span { start, end } = token.span;
            if token.span.is_empty() {
                return Err(MalformedSourceError::EmptySpan { start, end });
            }
            if end > source_len {
                return Err(MalformedSourceError::OutOfBounds {
                    start,
                    end,
                    len: source_len,
                });
            }
        }

        annotations.sort_by_key(|t| t.span);
        for pair in annotations.windows(2) {
            let (first, second) = (&pair[0].span, &pair[1].span);
            if second.start < first.end {
                return Err(MalformedSourceError::Overlap {
                    first_start: first.start,
                    first_end: first.end,
                    second_start: second.start,
                    second_end: second.end,
                });
            }
        }

        tracing::debug!(tokens = annotations.len(), "built token index");
        Ok(Self {
            tokens: annotations,
        })
    }

    /// The token covering character position `pos`, if any.
    pub fn token_at(&self, pos: usize) -> Option<&Token> {
        let idx = self.tokens.partition_point(|t| t.span.start <= pos);
        let candidate = self.tokens.get(idx.checked_sub(1)?)?;
        candidate.span.contains(pos).then_some(candidate)
    }

    pub fn reference_of<'a>(&self, token: &'a Token) -> &'a EntryReference {
        &token.reference
    }

    /// Every occurrence of `entry`, in source order.
    pub fn tokens_for(&self, entry: &Entry) -> Vec<&Token> {
        self.tokens
            .iter()
            .filter(|t| &t.reference.entry == entry)
            .collect()
    }

    /// The declaration-site token of `entry`, if this render contains it.
    pub fn declaration_token(&self, entry: &Entry) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.reference.is_declaration() && &t.reference.entry == entry)
    }

    /// Tokens whose label comes from the binding of `target`.
    pub fn tokens_renamed_by(&self, target: &Entry) -> Vec<&Token> {
        self.tokens
            .iter()
            .filter(|t| &t.reference.entry.rename_target() == target)
            .collect()
    }

    /// Split tokens by whether their entry has been given a name yet.
    pub fn highlights(&self, store: &MappingStore) -> Highlights<'_> {
        let (deobfuscated, obfuscated) = self
            .tokens
            .iter()
            .partition(|t| store.has_binding(&t.reference.entry.rename_target()));
        Highlights {
            obfuscated,
            deobfuscated,
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Highlights<'a> {
    pub obfuscated: Vec<&'a Token>,
    pub deobfuscated: Vec<&'a Token>,
}

/// A rendered source text and the index built from its annotations.
#[derive(Debug, Clone, Default)]
pub struct SourceView {
    text: String,
    index: TokenIndex,
}

impl SourceView {
    pub fn new(text: impl Into<String>, annotations: Vec<Token>) -> Result<Self, MalformedSourceError> {
        let text = text.into();
        let index = TokenIndex::build(text.chars().count(), annotations)?;
        Ok(Self { text, index })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn index(&self) -> &TokenIndex {
        &self.index
    }

    /// Source text covered by `token`.
    pub fn token_text(&self, token: &Token) -> &str {
        let byte_at = |chars: usize| {
            self.text
                .char_indices()
                .nth(chars)
                .map(|(i, _)| i)
                .unwrap_or(self.text.len())
        };
        &self.text[byte_at(token.span.start)..byte_at(token.span.end)]
    }
}
