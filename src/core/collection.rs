use std::collections::BTreeMap;

use super::item::Entity;

/// Local cache of server state: container key → ordered entities.
///
/// Only containers that were fetched (or explicitly opened) are present.
/// Order inside a container is the list order; the `index` field the
/// server sends is never consulted.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<E: Entity> {
    groups: BTreeMap<E::Key, Vec<E>>,
}

impl<E: Entity> Default for Collection<E> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }
}

impl<E: Entity> Collection<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole cache with a fetched scope. Requested keys with no
    /// items in the response still become (empty) loaded containers.
    pub fn reset(&mut self, keys: &[E::Key], mut fetched: BTreeMap<E::Key, Vec<E>>) {
        self.groups.clear();
        for key in keys {
            let items = fetched.remove(key).unwrap_or_default();
            self.groups.insert(*key, items);
        }
    }

    /// Overwrite only the fetched containers, keeping the rest.
    pub fn merge(&mut self, keys: &[E::Key], mut fetched: BTreeMap<E::Key, Vec<E>>) {
        for key in keys {
            let items = fetched.remove(key).unwrap_or_default();
            self.groups.insert(*key, items);
        }
    }

    pub fn is_loaded(&self, key: E::Key) -> bool {
        self.groups.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = E::Key> + '_ {
        self.groups.keys().copied()
    }

    pub fn items(&self, key: E::Key) -> &[E] {
        self.groups.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.groups.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: E::Id) -> Option<&E> {
        self.iter().find(|e| e.id() == id)
    }

    /// Container and position of an entity.
    pub fn locate(&self, id: E::Id) -> Option<(E::Key, usize)> {
        self.groups.iter().find_map(|(key, items)| {
            items
                .iter()
                .position(|e| e.id() == id)
                .map(|pos| (*key, pos))
        })
    }

    pub fn order(&self, key: E::Key) -> Vec<E::Id> {
        self.items(key).iter().map(Entity::id).collect()
    }

    /// Append to the end of the entity's container, opening it if needed.
    pub fn append(&mut self, entity: E) {
        self.groups.entry(entity.key()).or_default().push(entity);
    }

    pub fn remove(&mut self, id: E::Id) -> Option<E> {
        let (key, pos) = self.locate(id)?;
        self.groups.get_mut(&key).map(|items| items.remove(pos))
    }

    /// Replace an entity with a newer version of itself. When the new
    /// version changed container it moves to the end of the new container,
    /// or drops out of the cache if that container is not loaded.
    pub fn replace(&mut self, entity: E) {
        match self.locate(entity.id()) {
            Some((key, pos)) if key == entity.key() => {
                if let Some(items) = self.groups.get_mut(&key) {
                    items[pos] = entity;
                }
            }
            Some(_) => {
                self.remove(entity.id());
                if self.is_loaded(entity.key()) {
                    self.append(entity);
                }
            }
            None => {
                if self.is_loaded(entity.key()) {
                    self.append(entity);
                }
            }
        }
    }

    /// Apply `f` to one entity in place.
    pub fn update_with(&mut self, id: E::Id, f: impl FnOnce(&mut E)) -> bool {
        match self.groups.values_mut().flatten().find(|e| e.id() == id) {
            Some(entity) => {
                f(entity);
                true
            }
            None => false,
        }
    }

    /// Pull `id` out of its container and reinsert it at `to`. Returns
    /// whether the order changed.
    pub fn move_within(&mut self, key: E::Key, id: E::Id, to: usize) -> bool {
        let Some(items) = self.groups.get_mut(&key) else {
            return false;
        };
        let Some(from) = items.iter().position(|e| e.id() == id) else {
            return false;
        };
        let to = to.min(items.len() - 1);
        if from == to {
            return false;
        }
        let dragged = items.remove(from);
        items.insert(to, dragged);
        true
    }
}
