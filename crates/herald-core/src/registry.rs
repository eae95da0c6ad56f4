//! Bijective map between native handles and tracked notifications.
//!
//! Two hash maps are kept in lock-step. Every mutating call checks both sides
//! before touching either, so a failed call leaves the registry unchanged.

use std::{borrow::Borrow, collections::HashMap, hash::Hash};

use thiserror::Error;

/// Errors produced by [`IdentityRegistry`] operations.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The first value of the pair is already mapped.
    #[error("first value is already registered")]
    DuplicateFirst,
    /// The second value of the pair is already mapped.
    #[error("second value is already registered")]
    DuplicateSecond,
    /// No entry matches the lookup key.
    #[error("no registered entry matches the key")]
    NotFound,
}

/// One-to-one mapping between `F` and `S` values.
#[derive(Debug, Clone)]
pub struct IdentityRegistry<F, S> {
    first_to_second: HashMap<F, S>,
    second_to_first: HashMap<S, F>,
}

impl<F, S> Default for IdentityRegistry<F, S> {
    fn default() -> Self {
        Self {
            first_to_second: HashMap::new(),
            second_to_first: HashMap::new(),
        }
    }
}

impl<F, S> IdentityRegistry<F, S>
where
    F: Clone + Eq + Hash,
    S: Clone + Eq + Hash,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with room for `capacity` pairs.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            first_to_second: HashMap::with_capacity(capacity),
            second_to_first: HashMap::with_capacity(capacity),
        }
    }

    /// Number of live pairs.
    pub fn len(&self) -> usize {
        self.first_to_second.len()
    }

    /// Whether the registry holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.first_to_second.is_empty()
    }

    /// Inserts a pair, failing if either side is already present.
    pub fn add(&mut self, first: F, second: S) -> Result<(), RegistryError> {
        if self.first_to_second.contains_key(&first) {
            return Err(RegistryError::DuplicateFirst);
        }
        if self.second_to_first.contains_key(&second) {
            return Err(RegistryError::DuplicateSecond);
        }

        self.first_to_second.insert(first.clone(), second.clone());
        self.second_to_first.insert(second, first);
        Ok(())
    }

    /// Inserts a pair unless either side is already present.
    ///
    /// Returns `false` on conflict, with the registry unchanged.
    pub fn try_add(&mut self, first: F, second: S) -> bool {
        self.add(first, second).is_ok()
    }

    /// Looks up the second value mapped to `first`.
    pub fn get_by_first<Q>(&self, first: &Q) -> Result<&S, RegistryError>
    where
        F: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.try_get_by_first(first).ok_or(RegistryError::NotFound)
    }

    /// Looks up the first value mapped to `second`.
    pub fn get_by_second<Q>(&self, second: &Q) -> Result<&F, RegistryError>
    where
        S: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.try_get_by_second(second).ok_or(RegistryError::NotFound)
    }

    /// Like [`get_by_first`](Self::get_by_first), without an error.
    pub fn try_get_by_first<Q>(&self, first: &Q) -> Option<&S>
    where
        F: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.first_to_second.get(first)
    }

    /// Like [`get_by_second`](Self::get_by_second), without an error.
    pub fn try_get_by_second<Q>(&self, second: &Q) -> Option<&F>
    where
        S: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.second_to_first.get(second)
    }

    /// Whether `first` is mapped.
    pub fn contains_first<Q>(&self, first: &Q) -> bool
    where
        F: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.first_to_second.contains_key(first)
    }

    /// Whether `second` is mapped.
    pub fn contains_second<Q>(&self, second: &Q) -> bool
    where
        S: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.second_to_first.contains_key(second)
    }

    /// Removes the pair whose first value matches, returning it.
    pub fn remove_by_first<Q>(&mut self, first: &Q) -> Option<(F, S)>
    where
        F: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (first, second) = self.first_to_second.remove_entry(first)?;
        self.second_to_first.remove(&second);
        Some((first, second))
    }

    /// Removes the pair whose second value matches, returning it.
    pub fn remove_by_second<Q>(&mut self, second: &Q) -> Option<(F, S)>
    where
        S: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (second, first) = self.second_to_first.remove_entry(second)?;
        self.first_to_second.remove(&first);
        Some((first, second))
    }

    /// Empties both directions, returning how many pairs were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.first_to_second.len();
        self.first_to_second.clear();
        self.second_to_first.clear();
        dropped
    }

    /// First values, in no particular order.
    pub fn firsts(&self) -> impl Iterator<Item = &F> {
        self.first_to_second.keys()
    }

    /// Second values, in no particular order.
    pub fn seconds(&self) -> impl Iterator<Item = &S> {
        self.second_to_first.keys()
    }

    /// Live pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&F, &S)> {
        self.first_to_second.iter()
    }
}
