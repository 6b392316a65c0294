//! Typed identifiers backed by index arenas

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Identifier that addresses one slot of an [`Arena`]
pub trait EntityId: Copy + Eq + Ord + fmt::Debug {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl EntityId for $name {
            fn from_index(index: usize) -> Self {
                Self(index)
            }

            fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Index of a person candidate within one request
    PersonId
);
entity_id!(
    /// Index of a motorcycle candidate within one request
    MotorcycleId
);
entity_id!(
    /// Index of a deduplicated head detection within one request
    HeadId
);

/// Append-only storage whose slots are addressed by a typed id
#[derive(Debug, Clone, PartialEq)]
pub struct Arena<I: EntityId, T> {
    items: Vec<T>,
    _id: PhantomData<I>,
}

impl<I: EntityId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            _id: PhantomData,
        }
    }
}

impl<I: EntityId, T> Arena<I, T> {
    /// Insert a value built from its freshly allocated id
    pub fn alloc_with(&mut self, build: impl FnOnce(I) -> T) -> I {
        let id = I::from_index(self.items.len());
        self.items.push(build(id));
        id
    }

    pub fn get(&self, id: I) -> Option<&T> {
        self.items.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn values(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

/// Dense per-entity table keyed by id, sized to match an arena
#[derive(Debug, Clone, PartialEq)]
pub struct IdMap<I: EntityId, V> {
    slots: Vec<V>,
    _id: PhantomData<I>,
}

impl<I: EntityId, V: Clone> IdMap<I, V> {
    pub fn filled(len: usize, value: V) -> Self {
        Self {
            slots: vec![value; len],
            _id: PhantomData,
        }
    }
}

impl<I: EntityId, V> IdMap<I, V> {
    pub fn get(&self, id: I) -> Option<&V> {
        self.slots.get(id.index())
    }

    pub fn get_mut(&mut self, id: I) -> Option<&mut V> {
        self.slots.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (I, &V)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, value)| (I::from_index(index), value))
    }
}
