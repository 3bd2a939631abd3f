use std::collections::HashMap;
use std::hash::Hash;

/// The always-present empty input at the end of a container. It has no id
/// and is never part of a [`Collection`](super::collection::Collection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftItem<K> {
    pub container: K,
    pub text: String,
}

/// One rendered line of a container.
#[derive(Debug, Clone, PartialEq)]
pub enum Row<'a, E, K> {
    Persisted(&'a E),
    Draft(DraftItem<K>),
}

impl<E, K> Row<'_, E, K> {
    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft(_))
    }
}

/// Draft text per container, one draft each.
#[derive(Debug, Clone)]
pub struct Drafts<K> {
    texts: HashMap<K, String>,
}

impl<K> Default for Drafts<K> {
    fn default() -> Self {
        Self {
            texts: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> Drafts<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, container: K) -> DraftItem<K> {
        DraftItem {
            container,
            text: self.texts.get(&container).cloned().unwrap_or_default(),
        }
    }

    pub fn set_text(&mut self, container: K, text: impl Into<String>) {
        self.texts.insert(container, text.into());
    }

    pub fn clear(&mut self, container: K) {
        self.texts.remove(&container);
    }

    /// Persisted rows followed by the container's draft.
    pub fn rows<'a, E>(&self, container: K, items: &'a [E]) -> Vec<Row<'a, E, K>> {
        let mut rows: Vec<Row<'a, E, K>> = items.iter().map(Row::Persisted).collect();
        rows.push(Row::Draft(self.get(container)));
        rows
    }
}
