//! Typed access to a single key.
//!
//! Commands resolve their key through [`State::guard`], which fails with `WRONGTYPE` before any
//! handler runs when the key holds another type. The guard then runs the handler for the branch
//! that applies (the key exists or it's absent) and finally drops the key if the handler left an
//! empty container behind.

use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::marker::PhantomData;

use crate::commands::CommandError;
use crate::sorted_set::SortedSet;
use crate::store::{State, Value, ValueType};

/// A Rust type that a [`Value`] variant holds.
pub trait Typed: Default {
    const TYPE: ValueType;

    fn from_value(value: &Value) -> Option<&Self>;
    fn from_value_mut(value: &mut Value) -> Option<&mut Self>;
    fn into_value(self) -> Value;

    /// Whether the value must be removed from the keyspace. Only containers can be vacant, an
    /// empty string is still a value.
    fn is_vacant(&self) -> bool;
}

macro_rules! typed {
    ($t:ty, $variant:ident, $value_type:expr, $vacant:expr) => {
        impl Typed for $t {
            const TYPE: ValueType = $value_type;

            fn from_value(value: &Value) -> Option<&Self> {
                match value {
                    Value::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_value_mut(value: &mut Value) -> Option<&mut Self> {
                match value {
                    Value::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn is_vacant(&self) -> bool {
                $vacant(self)
            }
        }
    };
}

typed!(Bytes, String, ValueType::String, |_: &Bytes| false);
typed!(VecDeque<Bytes>, List, ValueType::List, VecDeque::is_empty);
typed!(HashSet<String>, Set, ValueType::Set, HashSet::is_empty);
typed!(SortedSet, SortedSet, ValueType::SortedSet, SortedSet::is_empty);
typed!(HashMap<String, Bytes>, Hash, ValueType::Hash, HashMap::is_empty);

pub struct Guard<'s, T> {
    state: &'s mut State,
    key: String,
    exists: bool,
    _type: PhantomData<T>,
}

impl State {
    /// Resolves `key` for a command working on values of type `T`.
    pub fn guard<T: Typed>(&mut self, key: &str) -> Result<Guard<'_, T>, CommandError> {
        let exists = match self.get_value(key) {
            Some(value) if value.value_type() != T::TYPE => return Err(CommandError::WrongType),
            Some(_) => true,
            None => false,
        };

        Ok(Guard {
            state: self,
            key: key.to_string(),
            exists,
            _type: PhantomData,
        })
    }

    /// Typed read access to `key`, `None` when absent.
    pub fn view<T: Typed>(&mut self, key: &str) -> Result<Option<&T>, CommandError> {
        match self.get_value(key) {
            Some(value) => T::from_value(value).map(Some).ok_or(CommandError::WrongType),
            None => Ok(None),
        }
    }
}

impl<'s, T: Typed> Guard<'s, T> {
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Runs `exists` with the value, or `absent` when there is no such key.
    pub fn read<R>(
        self,
        exists: impl FnOnce(&T) -> Result<R, CommandError>,
        absent: impl FnOnce() -> Result<R, CommandError>,
    ) -> Result<R, CommandError> {
        match self.state.raw_get(&self.key).and_then(T::from_value) {
            Some(value) => exists(value),
            None => absent(),
        }
    }

    /// Like [`Guard::read`] with mutable access. A value emptied by `exists` is removed.
    pub fn update<R>(
        self,
        exists: impl FnOnce(&mut T) -> Result<R, CommandError>,
        absent: impl FnOnce() -> Result<R, CommandError>,
    ) -> Result<R, CommandError> {
        let Guard { state, key, .. } = self;

        let result = match state.raw_get_mut(&key).and_then(T::from_value_mut) {
            Some(value) => exists(value),
            None => absent(),
        };

        remove_if_vacant::<T>(state, &key);
        result
    }

    /// Runs `f` with the value, materializing an empty one when the key is absent. Nothing is
    /// left behind if `f` fails or leaves the value empty.
    pub fn upsert<R>(self, f: impl FnOnce(&mut T) -> Result<R, CommandError>) -> Result<R, CommandError> {
        let Guard {
            state, key, exists, ..
        } = self;

        let value = state.raw_get_or_insert(&key, || T::default().into_value());
        let result = match T::from_value_mut(value) {
            Some(value) => f(value),
            None => Err(CommandError::WrongType),
        };

        if result.is_err() && !exists {
            state.remove(&key);
        } else {
            remove_if_vacant::<T>(state, &key);
        }
        result
    }
}

fn remove_if_vacant<T: Typed>(state: &mut State, key: &str) {
    if state
        .raw_get(key)
        .and_then(T::from_value)
        .is_some_and(T::is_vacant)
    {
        state.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[tokio::test]
    async fn wrong_type_fails_before_handlers() {
        let store = Store::new();
        let mut state = store.lock();
        state.set("key".to_string(), Bytes::from("v"));

        let result = state.guard::<HashSet<String>>("key");
        assert!(matches!(result, Err(CommandError::WrongType)));
    }

    #[tokio::test]
    async fn read_branches() {
        let store = Store::new();
        let mut state = store.lock();

        let len = state
            .guard::<VecDeque<Bytes>>("list")
            .unwrap()
            .read(|list| Ok(list.len()), || Ok(0));
        assert_eq!(len, Ok(0));
        assert!(!state.exists("list"));

        state.insert(
            "list".to_string(),
            Value::List(VecDeque::from(vec![Bytes::from("a"), Bytes::from("b")])),
        );
        let len = state
            .guard::<VecDeque<Bytes>>("list")
            .unwrap()
            .read(|list| Ok(list.len()), || Ok(0));
        assert_eq!(len, Ok(2));
    }

    #[tokio::test]
    async fn emptied_containers_are_removed() {
        let store = Store::new();
        let mut state = store.lock();
        state.insert(
            "set".to_string(),
            Value::Set(HashSet::from(["a".to_string()])),
        );

        let removed = state
            .guard::<HashSet<String>>("set")
            .unwrap()
            .update(|set| Ok(set.remove("a")), || Ok(false));

        assert_eq!(removed, Ok(true));
        assert!(!state.exists("set"));
    }

    #[tokio::test]
    async fn failed_upsert_leaves_nothing_behind() {
        let store = Store::new();
        let mut state = store.lock();

        let result: Result<(), _> = state
            .guard::<HashMap<String, Bytes>>("hash")
            .unwrap()
            .upsert(|_| Err(CommandError::NoSuchKey));

        assert_eq!(result, Err(CommandError::NoSuchKey));
        assert!(!state.exists("hash"));

        state
            .guard::<HashMap<String, Bytes>>("hash")
            .unwrap()
            .upsert(|hash| {
                hash.insert("field".to_string(), Bytes::from("value"));
                Ok(())
            })
            .unwrap();
        assert_eq!(state.type_of("hash"), Some(ValueType::Hash));
    }

    #[tokio::test]
    async fn empty_string_is_kept() {
        let store = Store::new();
        let mut state = store.lock();

        state
            .guard::<Bytes>("key")
            .unwrap()
            .upsert(|_| Ok(()))
            .unwrap();

        assert_eq!(state.get("key"), Ok(Some(Bytes::new())));
    }
}
