//! Typed, open-ended configuration maps.
//!
//! A [`Key<T>`] is a name plus a phantom value type. Keys are plain
//! `const` items with author-chosen names; two keys with the same name are
//! the same key, so names must be unique across a program.
//!
//! Maps are immutable once built. Refinement produces a new map with
//! [`PropertyMap::with`] and friends, so readers holding an older map are
//! never disturbed.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::ScriptError;

pub struct Key<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.name)
    }
}

type Entry = Arc<dyn Any + Send + Sync>;

#[derive(Clone, Default)]
pub struct PropertyMap {
    entries: Arc<HashMap<&'static str, Entry>>,
}

pub type CompileConfiguration = PropertyMap;
pub type EvaluationConfiguration = PropertyMap;
pub type ProcessedScriptData = PropertyMap;

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new map with every entry of `self` and `key` set to `value`.
    pub fn with<T>(&self, key: Key<T>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        let mut entries = (*self.entries).clone();
        entries.insert(key.name, Arc::new(value));
        Self {
            entries: Arc::new(entries),
        }
    }

    /// A new map with every entry of `self`, overridden by `other`.
    pub fn with_all(&self, other: &PropertyMap) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        let mut entries = (*self.entries).clone();
        for (name, value) in other.entries.iter() {
            entries.insert(*name, Arc::clone(value));
        }
        Self {
            entries: Arc::new(entries),
        }
    }

    /// # Panics
    /// Panics if the key is absent or holds a value of another type.
    /// Use this only for keys established upstream; otherwise see
    /// [`PropertyMap::get_optional`] or [`PropertyMap::require`].
    pub fn get<T: 'static>(&self, key: Key<T>) -> &T {
        match self.get_optional(key) {
            Some(value) => value,
            None => panic!("configuration key `{}` is not set", key.name),
        }
    }

    /// # Panics
    /// Panics if the key is present with a value of another type; that is
    /// a key-naming bug, not a missing setting.
    pub fn get_optional<T: 'static>(&self, key: Key<T>) -> Option<&T> {
        let value = self.entries.get(key.name)?;
        match value.downcast_ref::<T>() {
            Some(value) => Some(value),
            None => panic!(
                "configuration key `{}` holds a value of another type than {}",
                key.name,
                std::any::type_name::<T>()
            ),
        }
    }

    /// Like [`PropertyMap::get`], but a missing key is a configuration
    /// error instead of a panic.
    pub fn require<T: 'static>(&self, key: Key<T>) -> Result<&T, ScriptError> {
        self.get_optional(key).ok_or_else(|| {
            ScriptError::configuration(format!(
                "required configuration key `{}` is not set",
                key.name
            ))
        })
    }

    pub fn contains<T>(&self, key: Key<T>) -> bool {
        self.entries.contains_key(key.name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether both maps share the same storage, i.e. one is an unchanged
    /// clone of the other.
    pub fn ptr_eq(&self, other: &PropertyMap) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

impl fmt::Debug for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("PropertyMap").field("keys", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: Key<String> = Key::new("test.name");
    const COUNT: Key<u32> = Key::new("test.count");
    const COUNT_AS_TEXT: Key<String> = Key::new("test.count");

    #[test]
    fn with_does_not_touch_the_original() {
        let base = PropertyMap::new().with(NAME, "a".to_string());
        let derived = base.with(NAME, "b".to_string()).with(COUNT, 3);

        assert_eq!(base.get(NAME), "a");
        assert!(!base.contains(COUNT));
        assert_eq!(derived.get(NAME), "b");
        assert_eq!(*derived.get(COUNT), 3);
        assert!(!base.ptr_eq(&derived));
    }

    #[test]
    fn clones_share_storage() {
        let base = PropertyMap::new().with(COUNT, 1);
        let copy = base.clone();
        assert!(base.ptr_eq(&copy));
    }

    #[test]
    fn optional_and_required_lookups() {
        let map = PropertyMap::new().with(COUNT, 9);
        assert_eq!(map.get_optional(COUNT), Some(&9));
        assert_eq!(map.get_optional(NAME), None);

        let err = map.require(NAME).unwrap_err();
        assert!(err.to_string().contains("test.name"));
    }

    #[test]
    #[should_panic(expected = "is not set")]
    fn get_missing_key_panics() {
        PropertyMap::new().get(NAME);
    }

    #[test]
    #[should_panic(expected = "holds a value of another type")]
    fn same_name_different_type_panics() {
        let map = PropertyMap::new().with(COUNT, 1);
        map.get_optional(COUNT_AS_TEXT);
    }

    #[test]
    fn with_all_overrides_by_key() {
        let base = PropertyMap::new()
            .with(NAME, "base".to_string())
            .with(COUNT, 1);
        let overrides = PropertyMap::new().with(COUNT, 2);
        let merged = base.with_all(&overrides);
        assert_eq!(merged.get(NAME), "base");
        assert_eq!(*merged.get(COUNT), 2);
        assert!(base.with_all(&PropertyMap::new()).ptr_eq(&base));
    }
}
