use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser, ScanOptions};
use crate::frame::Frame;
use crate::glob::Pattern;
use crate::store::InnerStoreLocked;
use crate::utils::scan_page;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    /// `amount` of this unit in milliseconds, `None` on overflow.
    pub fn to_millis(self, amount: i64) -> Option<i64> {
        match self {
            TimeUnit::Seconds => amount.checked_mul(1000),
            TimeUnit::Milliseconds => Some(amount),
        }
    }
}

pub(crate) fn invalid_expire_time(command: &str) -> CommandError {
    CommandError::InvalidArgument(format!("invalid expire time in '{}' command", command))
}

/// Removes the specified keys. A key is ignored if it does not exist. `UNLINK` is an alias.
///
/// Ref: <https://redis.io/docs/latest/commands/del/>
#[derive(Debug, PartialEq)]
pub struct Del {
    pub keys: Vec<String>,
}

impl Executable for Del {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let removed = self.keys.iter().filter(|key| store.delete(key)).count();
        Ok(Frame::from(removed))
    }
}

impl TryFrom<&mut CommandParser> for Del {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let keys = parser.remaining_strings()?;
        Ok(Self { keys })
    }
}

/// Returns how many of the given keys exist. A key mentioned twice is counted twice.
///
/// Ref: <https://redis.io/docs/latest/commands/exists/>
#[derive(Debug, PartialEq)]
pub struct Exists {
    pub keys: Vec<String>,
}

impl Executable for Exists {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let count = self.keys.iter().filter(|key| store.exists(key)).count();
        Ok(Frame::from(count))
    }
}

impl TryFrom<&mut CommandParser> for Exists {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let keys = parser.remaining_strings()?;
        Ok(Self { keys })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/type/>
#[derive(Debug, PartialEq)]
pub struct Type {
    pub key: String,
}

impl Executable for Type {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let name = store
            .type_of(&self.key)
            .map(|value_type| value_type.to_string())
            .unwrap_or_else(|| "none".to_string());

        Ok(Frame::Simple(name))
    }
}

impl TryFrom<&mut CommandParser> for Type {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}

/// `RENAME` and `RENAMENX`. The time to live travels with the value.
///
/// Ref: <https://redis.io/docs/latest/commands/rename/>
#[derive(Debug, PartialEq)]
pub struct Rename {
    pub key: String,
    pub new_key: String,
    pub only_if_absent: bool,
}

impl Executable for Rename {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        if !self.only_if_absent {
            store.rename(&self.key, &self.new_key)?;
            return Ok(Frame::ok());
        }

        if !store.exists(&self.key) {
            return Err(CommandError::NoSuchKey.into());
        }

        if store.exists(&self.new_key) {
            return Ok(Frame::Integer(0));
        }

        store.rename(&self.key, &self.new_key)?;
        Ok(Frame::Integer(1))
    }
}

impl TryFrom<&mut CommandParser> for Rename {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let only_if_absent = parser.name() == "renamenx";
        let key = parser.next_string()?;
        let new_key = parser.next_string()?;

        Ok(Self {
            key,
            new_key,
            only_if_absent,
        })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/randomkey/>
#[derive(Debug, PartialEq)]
pub struct RandomKey;

impl Executable for RandomKey {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        Ok(Frame::optional(store.random_key().map(Bytes::from)))
    }
}

impl TryFrom<&mut CommandParser> for RandomKey {
    type Error = CommandError;

    fn try_from(_parser: &mut CommandParser) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}

/// Returns all keys matching pattern, sorted.
///
/// Ref: <https://redis.io/docs/latest/commands/keys/>
#[derive(Debug, PartialEq)]
pub struct Keys {
    pub pattern: Pattern,
}

impl Executable for Keys {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        Ok(Frame::bulks(store.matching_keys(&self.pattern)))
    }
}

impl TryFrom<&mut CommandParser> for Keys {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let pattern = Pattern::new(&parser.next_string()?);
        Ok(Self { pattern })
    }
}

/// Iterates the keyspace in pages over the sorted key names. `MATCH` and `TYPE` filter each
/// page after it's taken, so a page may come back empty while the cursor is still non zero.
///
/// Ref: <https://redis.io/docs/latest/commands/scan/>
#[derive(Debug, PartialEq)]
pub struct Scan {
    pub options: ScanOptions,
}

impl Executable for Scan {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let count = self.options.count.unwrap_or(store.config().scan_count);
        let keys = store.matching_keys(&Pattern::new("*"));
        let (next, page) = scan_page(&keys, self.options.cursor, count);

        let mut found = vec![];
        for key in page {
            if !self.options.matches(key) {
                continue;
            }
            if let Some(wanted) = self.options.value_type {
                if store.type_of(key) != Some(wanted) {
                    continue;
                }
            }
            found.push(key.clone());
        }

        Ok(Frame::Array(vec![
            Frame::from(next.to_string()),
            Frame::bulks(found),
        ]))
    }
}

impl TryFrom<&mut CommandParser> for Scan {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let options = ScanOptions::parse(parser, true)?;
        Ok(Self { options })
    }
}

/// `EXPIRE`, `PEXPIRE`, `EXPIREAT` and `PEXPIREAT`. A deadline that is already due deletes the
/// key and replies `0`.
///
/// Ref: <https://redis.io/docs/latest/commands/expire/>
#[derive(Debug, PartialEq)]
pub struct Expire {
    pub key: String,
    pub millis: i64,
    pub absolute: bool,
}

impl Executable for Expire {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let set = if self.absolute {
            store.expire_at_unix(&self.key, self.millis)
        } else {
            store.expire_in(&self.key, self.millis)
        };

        Ok(Frame::boolean(set))
    }
}

impl TryFrom<&mut CommandParser> for Expire {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let (unit, absolute) = match parser.name() {
            "pexpire" => (TimeUnit::Milliseconds, false),
            "expireat" => (TimeUnit::Seconds, true),
            "pexpireat" => (TimeUnit::Milliseconds, true),
            _ => (TimeUnit::Seconds, false),
        };

        let key = parser.next_string()?;
        let amount = parser.next_integer()?;
        let millis = unit
            .to_millis(amount)
            .ok_or_else(|| invalid_expire_time(parser.name()))?;

        Ok(Self {
            key,
            millis,
            absolute,
        })
    }
}

/// `TTL` and `PTTL`: `-2` when the key does not exist, `-1` when it has no time to live.
///
/// Ref: <https://redis.io/docs/latest/commands/ttl/>
#[derive(Debug, PartialEq)]
pub struct Ttl {
    pub key: String,
    pub unit: TimeUnit,
}

impl Executable for Ttl {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        if !store.exists(&self.key) {
            return Ok(Frame::Integer(-2));
        }

        let ttl = match store.get_ttl(&self.key) {
            None => -1,
            Some(ttl) => {
                let millis = ttl.as_millis() as i64;
                match self.unit {
                    TimeUnit::Milliseconds => millis,
                    TimeUnit::Seconds => (millis + 500) / 1000,
                }
            }
        };

        Ok(Frame::Integer(ttl))
    }
}

impl TryFrom<&mut CommandParser> for Ttl {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let unit = if parser.name() == "pttl" {
            TimeUnit::Milliseconds
        } else {
            TimeUnit::Seconds
        };
        let key = parser.next_string()?;

        Ok(Self { key, unit })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/persist/>
#[derive(Debug, PartialEq)]
pub struct Persist {
    pub key: String,
}

impl Executable for Persist {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        Ok(Frame::boolean(store.persist(&self.key)))
    }
}

impl TryFrom<&mut CommandParser> for Persist {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}
