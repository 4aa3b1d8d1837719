use bytes::Bytes;
use lazy_static::lazy_static;
use parking_lot::{Mutex, MutexGuard};
use rand::Rng;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};
use strum_macros::{AsRefStr, Display, EnumString};
use tokio::sync::Notify;
use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::commands::CommandError;
use crate::config::Config;
use crate::glob::Pattern;
use crate::pubsub::Registry;
use crate::sorted_set::SortedSet;

lazy_static! {
    static ref GLOBAL: Store = Store::new();
}

/// The Store owns the whole keyspace together with the per-key expirations, the watch table used
/// by transactions and the pub/sub registry. It automatically handles the expiration and removal
/// of keys when their TTLs elapse.
///
/// A store is cheap to clone: clones share the same keyspace through reference counting. Use
/// [`Store::new`] or [`Store::deep_copy`] to get an isolated keyspace.
#[derive(Clone)]
pub struct Store {
    inner: Arc<InnerStore>,
}

impl Store {
    pub fn new() -> Store {
        Store::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Store {
        let active_expire = config.active_expire;
        let inner = Arc::new(InnerStore {
            state: Mutex::new(State::new(config)),
            waker: Arc::new(Notify::new()),
            shutdown: CancellationToken::new(),
        });

        if active_expire {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(remove_expired_keys(
                        Arc::downgrade(&inner),
                        inner.waker.clone(),
                        inner.shutdown.clone(),
                    ));
                }
                Err(_) => debug!("No tokio runtime available, keys only expire lazily"),
            }
        }

        Self { inner }
    }

    /// The process wide store shared by every client created with [`crate::client::Client::new`].
    pub fn global() -> Store {
        GLOBAL.clone()
    }

    /// Creates a new store holding a copy of this store's keys and expirations. Watches and
    /// subscriptions are not copied.
    pub fn deep_copy(&self) -> Store {
        let (config, keys, expirations) = {
            let state = self.lock();
            (
                state.config.clone(),
                state.keys.clone(),
                state.expirations.clone(),
            )
        };

        let copy = Store::with_config(config);
        {
            let mut state = copy.lock();
            state.keys = keys;
            for (key, expires_at) in expirations {
                state.set_expiration(key, expires_at);
            }
        }
        copy.waker.notify_one();
        copy
    }

    /// Whether both handles point to the same keyspace.
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InnerStore {
    state: Mutex<State>,
    waker: Arc<Notify>,
    shutdown: CancellationToken,
}

impl Drop for InnerStore {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub struct InnerStoreLocked<'a> {
    state: MutexGuard<'a, State>,
    waker: &'a Notify,
}

impl<'a> InnerStoreLocked<'a> {
    pub fn set_with_ttl(&mut self, key: String, data: Bytes, ttl: Duration) {
        self.state.insert(key.clone(), Value::String(data));
        self.expire_at(&key, Instant::now() + ttl);
    }

    /// Sets the key's time to live in milliseconds. A non positive duration deletes the key
    /// right away. Returns whether a time to live was set.
    pub fn expire_in(&mut self, key: &str, millis: i64) -> bool {
        if !self.state.exists(key) {
            return false;
        }

        if millis <= 0 {
            self.state.remove(key);
            return false;
        }

        self.expire_at(key, Instant::now() + Duration::from_millis(millis as u64))
    }

    /// Expires the key at the given unix time in milliseconds. Times in the past delete the key.
    pub fn expire_at_unix(&mut self, key: &str, unix_millis: i64) -> bool {
        self.expire_in(key, unix_millis.saturating_sub(unix_time_millis()))
    }

    pub fn expire_at(&mut self, key: &str, expires_at: Instant) -> bool {
        if !self.state.exists(key) {
            return false;
        }

        self.state.set_expiration(key.to_string(), expires_at);

        let next_to_expire = self.state.ttls.iter().next().map(|(_, key)| key.as_str());
        if next_to_expire == Some(key) {
            self.waker.notify_one();
        }

        true
    }
}

impl<'a> Deref for InnerStoreLocked<'a> {
    type Target = State;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl<'a> DerefMut for InnerStoreLocked<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.state
    }
}

impl Deref for Store {
    type Target = InnerStore;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl InnerStore {
    pub fn lock(&self) -> InnerStoreLocked<'_> {
        InnerStoreLocked {
            state: self.state.lock(),
            waker: &self.waker,
        }
    }
}

type Key = String;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(Bytes),
    List(VecDeque<Bytes>),
    Set(HashSet<String>),
    SortedSet(SortedSet),
    Hash(HashMap<String, Bytes>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::List(_) => ValueType::List,
            Value::Set(_) => ValueType::Set,
            Value::SortedSet(_) => ValueType::SortedSet,
            Value::Hash(_) => ValueType::Hash,
        }
    }
}

/// The type of a stored value, named as the `TYPE` command reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ValueType {
    String,
    List,
    Set,
    #[strum(serialize = "zset")]
    SortedSet,
    Hash,
}

pub struct State {
    keys: HashMap<Key, Value>,
    expirations: HashMap<Key, Instant>,
    ttls: BTreeSet<(Instant, Key)>,
    // Watched key -> clients watching it.
    watched: HashMap<Key, HashSet<Uuid>>,
    // Clients with at least one watched key modified since they started watching.
    dirty: HashSet<Uuid>,
    pub(crate) pubsub: Registry,
    config: Config,
}

impl State {
    fn new(config: Config) -> State {
        State {
            keys: HashMap::new(),
            expirations: HashMap::new(),
            ttls: BTreeSet::new(),
            watched: HashMap::new(),
            dirty: HashSet::new(),
            pubsub: Registry::default(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Removes the key if its expiration elapsed. Every access goes through here first.
    fn evict_if_expired(&mut self, key: &str) -> bool {
        let expired = self
            .expirations
            .get(key)
            .is_some_and(|expires_at| *expires_at <= Instant::now());

        if expired {
            debug!(key, "Evicting expired key");
            self.remove(key);
            self.touch(key);
        }

        expired
    }

    pub fn get_value(&mut self, key: &str) -> Option<&Value> {
        self.evict_if_expired(key);
        self.keys.get(key)
    }

    pub fn get_value_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.evict_if_expired(key);
        self.keys.get_mut(key)
    }

    /// Value of a string key.
    pub fn get(&mut self, key: &str) -> Result<Option<Bytes>, CommandError> {
        match self.get_value(key) {
            Some(Value::String(data)) => Ok(Some(data.clone())),
            Some(_) => Err(CommandError::WrongType),
            None => Ok(None),
        }
    }

    /// Stores a string, discarding any previous value and time to live.
    pub fn set(&mut self, key: String, data: Bytes) {
        self.insert(key, Value::String(data));
    }

    /// Stores `value`, discarding any previous value and time to live.
    pub fn insert(&mut self, key: String, value: Value) {
        self.remove_ttl(&key);
        self.keys.insert(key, value);
    }

    /// Stores `value` keeping the key's time to live, if any.
    pub fn replace(&mut self, key: String, value: Value) {
        self.evict_if_expired(&key);
        self.keys.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.remove_ttl(key);
        self.keys.remove(key)
    }

    /// Removes `key` unless it already expired. Returns whether a live key was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.evict_if_expired(key);
        self.remove(key).is_some()
    }

    pub fn exists(&mut self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    pub fn type_of(&mut self, key: &str) -> Option<ValueType> {
        self.get_value(key).map(Value::value_type)
    }

    pub fn size(&mut self) -> usize {
        self.remove_expired_keys();
        self.keys.len()
    }

    pub fn keys(&mut self) -> impl Iterator<Item = &String> {
        self.remove_expired_keys();
        self.keys.keys()
    }

    pub fn iter(&mut self) -> impl Iterator<Item = (&String, &Value)> {
        self.remove_expired_keys();
        self.keys.iter()
    }

    /// Live keys matching `pattern`, sorted.
    pub fn matching_keys(&mut self, pattern: &Pattern) -> Vec<String> {
        let mut keys: Vec<String> = self
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Moves the value (and time to live) of `from` into `to`, overwriting `to`.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), CommandError> {
        if !self.exists(from) {
            return Err(CommandError::NoSuchKey);
        }

        if from == to {
            return Ok(());
        }

        let expires_at = self.expirations.get(from).copied();
        let Some(value) = self.remove(from) else {
            return Err(CommandError::NoSuchKey);
        };

        self.insert(to.to_string(), value);
        if let Some(expires_at) = expires_at {
            self.set_expiration(to.to_string(), expires_at);
        }

        Ok(())
    }

    /// Picks a live key with uniform probability using reservoir sampling: the n-th key replaces
    /// the current pick with probability 1/n.
    pub fn random_key(&mut self) -> Option<String> {
        let mut rng = rand::thread_rng();
        let mut pick = None;

        for (seen, key) in self.keys().enumerate() {
            if rng.gen_range(0..=seen) == 0 {
                pick = Some(key);
            }
        }

        pick.cloned()
    }

    /// Deletes every key. Watching clients of existing keys are flagged.
    pub fn flush(&mut self) {
        self.remove_expired_keys();

        let watched: Vec<Key> = self
            .watched
            .keys()
            .filter(|key| self.keys.contains_key(*key))
            .cloned()
            .collect();
        for key in watched {
            self.touch(&key);
        }

        self.keys.clear();
        self.expirations.clear();
        self.ttls.clear();
    }

    pub fn get_ttl(&mut self, key: &str) -> Option<Duration> {
        self.evict_if_expired(key);
        self.expirations
            .get(key)
            .map(|expires_at| expires_at.saturating_duration_since(Instant::now()))
    }

    /// Removes the key's time to live. Returns whether the key had one.
    pub fn remove_ttl(&mut self, key: &str) -> bool {
        match self.expirations.remove(key) {
            Some(expires_at) => {
                self.ttls.remove(&(expires_at, key.to_string()));
                true
            }
            None => false,
        }
    }

    /// Like [`State::remove_ttl`] but only for live keys.
    pub fn persist(&mut self, key: &str) -> bool {
        self.evict_if_expired(key);
        self.remove_ttl(key)
    }

    fn set_expiration(&mut self, key: Key, expires_at: Instant) {
        self.remove_ttl(&key);
        self.ttls.insert((expires_at, key.clone()));
        self.expirations.insert(key, expires_at);
    }

    pub fn remove_expired_keys(&mut self) -> Option<Instant> {
        let now = Instant::now();

        let expired_keys: Vec<(Instant, String)> = self
            .ttls
            .iter()
            .take_while(|(expires_at, _)| expires_at <= &now)
            .cloned()
            .collect();

        if !expired_keys.is_empty() {
            debug!(count = expired_keys.len(), "Removing expired keys");
        }

        for (_, key) in expired_keys {
            self.remove(&key);
            self.touch(&key);
        }

        self.ttls.iter().next().map(|&(expires_at, _)| expires_at)
    }

    /// Flags every client watching `key` as dirty.
    pub fn touch(&mut self, key: &str) {
        if let Some(clients) = self.watched.get(key) {
            self.dirty.extend(clients.iter().copied());
        }
    }

    pub fn watch(&mut self, client: Uuid, key: String) {
        self.watched.entry(key).or_default().insert(client);
    }

    /// Forgets every key watched by `client`, returning whether any of them was modified.
    pub fn unwatch(&mut self, client: Uuid) -> bool {
        self.watched.retain(|_, clients| {
            clients.remove(&client);
            !clients.is_empty()
        });
        self.dirty.remove(&client)
    }

    pub fn is_dirty(&self, client: Uuid) -> bool {
        self.dirty.contains(&client)
    }

    pub(crate) fn raw_get(&self, key: &str) -> Option<&Value> {
        self.keys.get(key)
    }

    pub(crate) fn raw_get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.keys.get_mut(key)
    }

    pub(crate) fn raw_get_or_insert(&mut self, key: &str, value: impl FnOnce() -> Value) -> &mut Value {
        self.keys.entry(key.to_string()).or_insert_with(value)
    }
}

pub fn unix_time_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

async fn remove_expired_keys(store: Weak<InnerStore>, waker: Arc<Notify>, shutdown: CancellationToken) {
    info!("Starting background expiration");

    loop {
        let next_expiration = match store.upgrade() {
            Some(store) => store.lock().remove_expired_keys(),
            None => break,
        };

        if let Some(next_expiration) = next_expiration {
            tokio::select! {
                _ = sleep_until(next_expiration) => {}
                _ = waker.notified() => {}
                _ = shutdown.cancelled() => break,
            }
        } else {
            tokio::select! {
                _ = waker.notified() => {}
                _ = shutdown.cancelled() => break,
            }
        }
    }

    debug!("Background expiration stopped");
}
