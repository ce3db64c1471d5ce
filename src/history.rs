use std::collections::VecDeque;

use crate::model::EntryReference;

/// Back-stack of visited references, most recent first.
///
/// Unbounded unless a cap is set; with a cap, the oldest entry is dropped
/// (and logged) when a push would exceed it.
#[derive(Debug, Default)]
pub struct NavigationHistory {
    stack: VecDeque<EntryReference>,
    max_depth: Option<usize>,
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            stack: VecDeque::new(),
            max_depth: Some(max_depth.max(1)),
        }
    }

    /// Record `reference` as the place to return to. Duplicates are kept.
    pub fn push(&mut self, reference: EntryReference) {
        self.stack.push_front(reference);
        if let Some(max) = self.max_depth {
            while self.stack.len() > max {
                if let Some(dropped) = self.stack.pop_back() {
                    tracing::warn!(
                        entry = %dropped.entry,
                        max_depth = max,
                        "navigation history full, dropping oldest entry"
                    );
                }
            }
        }
    }

    pub fn pop(&mut self) -> Option<EntryReference> {
        self.stack.pop_front()
    }

    pub fn peek(&self) -> Option<&EntryReference> {
        self.stack.front()
    }

    pub fn has_previous(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}
