use bytes::Bytes;
use itertools::Itertools;
use std::collections::HashMap;

use crate::commands::executable::Executable;
use crate::commands::strings::{checked_increment, float_increment};
use crate::commands::{not_float, not_integer, CommandError, CommandParser, ScanOptions};
use crate::frame::Frame;
use crate::store::InnerStoreLocked;
use crate::utils::scan_page;
use crate::Error;

type Hash = HashMap<String, Bytes>;

fn sorted_fields(hash: &Hash) -> Vec<(&String, &Bytes)> {
    hash.iter().sorted_by_key(|(field, _)| *field).collect()
}

fn flatten<'a>(fields: impl IntoIterator<Item = (&'a String, &'a Bytes)>) -> Frame {
    let mut frames = vec![];
    for (field, value) in fields {
        frames.push(Frame::from(field.as_str()));
        frames.push(Frame::Bulk(value.clone()));
    }
    Frame::Array(frames)
}

/// `HSET` replies the number of fields that were added, `HMSET` replies `OK`.
///
/// Ref: <https://redis.io/docs/latest/commands/hset/>
#[derive(Debug, PartialEq)]
pub struct HSet {
    pub key: String,
    pub pairs: Vec<(String, Bytes)>,
    pub reply_ok: bool,
}

impl Executable for HSet {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let added = store.guard::<Hash>(&self.key)?.upsert(|hash| {
            Ok(self
                .pairs
                .into_iter()
                .filter(|(field, value)| hash.insert(field.clone(), value.clone()).is_none())
                .count())
        })?;

        if self.reply_ok {
            Ok(Frame::ok())
        } else {
            Ok(Frame::from(added))
        }
    }
}

impl TryFrom<&mut CommandParser> for HSet {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let reply_ok = parser.name() == "hmset";
        let key = parser.next_string()?;
        let pairs = parser.remaining_pairs()?;
        if pairs.is_empty() {
            return Err(CommandError::EndOfStream);
        }

        Ok(Self {
            key,
            pairs,
            reply_ok,
        })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/hsetnx/>
#[derive(Debug, PartialEq)]
pub struct HSetNx {
    pub key: String,
    pub field: String,
    pub value: Bytes,
}

impl Executable for HSetNx {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let set = store.guard::<Hash>(&self.key)?.upsert(|hash| {
            if hash.contains_key(&self.field) {
                return Ok(false);
            }
            hash.insert(self.field, self.value);
            Ok(true)
        })?;

        Ok(Frame::boolean(set))
    }
}

impl TryFrom<&mut CommandParser> for HSetNx {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let field = parser.next_string()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, field, value })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/hget/>
#[derive(Debug, PartialEq)]
pub struct HGet {
    pub key: String,
    pub field: String,
}

impl Executable for HGet {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let value = store
            .guard::<Hash>(&self.key)?
            .read(|hash| Ok(hash.get(&self.field).cloned()), || Ok(None))?;

        Ok(Frame::optional(value))
    }
}

impl TryFrom<&mut CommandParser> for HGet {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let field = parser.next_string()?;

        Ok(Self { key, field })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/hmget/>
#[derive(Debug, PartialEq)]
pub struct HMGet {
    pub key: String,
    pub fields: Vec<String>,
}

impl Executable for HMGet {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let values = store.guard::<Hash>(&self.key)?.read(
            |hash| Ok(self.fields.iter().map(|f| hash.get(f).cloned()).collect()),
            || Ok(vec![None; self.fields.len()]),
        )?;

        Ok(Frame::Array(values.into_iter().map(Frame::optional).collect()))
    }
}

impl TryFrom<&mut CommandParser> for HMGet {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let fields = parser.remaining_strings()?;
        if fields.is_empty() {
            return Err(CommandError::EndOfStream);
        }

        Ok(Self { key, fields })
    }
}

/// Fields are returned sorted, each followed by its value.
///
/// Ref: <https://redis.io/docs/latest/commands/hgetall/>
#[derive(Debug, PartialEq)]
pub struct HGetAll {
    pub key: String,
}

impl Executable for HGetAll {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let frame = store.guard::<Hash>(&self.key)?.read(
            |hash| Ok(flatten(sorted_fields(hash))),
            || Ok(Frame::Array(vec![])),
        )?;

        Ok(frame)
    }
}

impl TryFrom<&mut CommandParser> for HGetAll {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/hdel/>
#[derive(Debug, PartialEq)]
pub struct HDel {
    pub key: String,
    pub fields: Vec<String>,
}

impl Executable for HDel {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let removed = store.guard::<Hash>(&self.key)?.update(
            |hash| Ok(self.fields.iter().filter(|f| hash.remove(*f).is_some()).count()),
            || Ok(0),
        )?;

        Ok(Frame::from(removed))
    }
}

impl TryFrom<&mut CommandParser> for HDel {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let fields = parser.remaining_strings()?;
        if fields.is_empty() {
            return Err(CommandError::EndOfStream);
        }

        Ok(Self { key, fields })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/hexists/>
#[derive(Debug, PartialEq)]
pub struct HExists {
    pub key: String,
    pub field: String,
}

impl Executable for HExists {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let found = store
            .guard::<Hash>(&self.key)?
            .read(|hash| Ok(hash.contains_key(&self.field)), || Ok(false))?;

        Ok(Frame::boolean(found))
    }
}

impl TryFrom<&mut CommandParser> for HExists {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let field = parser.next_string()?;

        Ok(Self { key, field })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/hlen/>
#[derive(Debug, PartialEq)]
pub struct HLen {
    pub key: String,
}

impl Executable for HLen {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let len = store
            .guard::<Hash>(&self.key)?
            .read(|hash| Ok(hash.len()), || Ok(0))?;

        Ok(Frame::from(len))
    }
}

impl TryFrom<&mut CommandParser> for HLen {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/hkeys/>
#[derive(Debug, PartialEq)]
pub struct HKeys {
    pub key: String,
}

impl Executable for HKeys {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let fields = store.guard::<Hash>(&self.key)?.read(
            |hash| {
                Ok(sorted_fields(hash)
                    .into_iter()
                    .map(|(field, _)| field.clone())
                    .collect::<Vec<_>>())
            },
            || Ok(vec![]),
        )?;

        Ok(Frame::bulks(fields))
    }
}

impl TryFrom<&mut CommandParser> for HKeys {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}

/// Values in the order of their sorted fields.
///
/// Ref: <https://redis.io/docs/latest/commands/hvals/>
#[derive(Debug, PartialEq)]
pub struct HVals {
    pub key: String,
}

impl Executable for HVals {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let values = store.guard::<Hash>(&self.key)?.read(
            |hash| {
                Ok(sorted_fields(hash)
                    .into_iter()
                    .map(|(_, value)| value.clone())
                    .collect::<Vec<_>>())
            },
            || Ok(vec![]),
        )?;

        Ok(Frame::bulks(values))
    }
}

impl TryFrom<&mut CommandParser> for HVals {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/hstrlen/>
#[derive(Debug, PartialEq)]
pub struct HStrlen {
    pub key: String,
    pub field: String,
}

impl Executable for HStrlen {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let len = store.guard::<Hash>(&self.key)?.read(
            |hash| Ok(hash.get(&self.field).map_or(0, Bytes::len)),
            || Ok(0),
        )?;

        Ok(Frame::from(len))
    }
}

impl TryFrom<&mut CommandParser> for HStrlen {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let field = parser.next_string()?;

        Ok(Self { key, field })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/hincrby/>
#[derive(Debug, PartialEq)]
pub struct HIncrBy {
    pub key: String,
    pub field: String,
    pub delta: i64,
}

impl Executable for HIncrBy {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let value = store.guard::<Hash>(&self.key)?.upsert(|hash| {
            let current = hash.get(&self.field).map(|value| &value[..]);
            let value = checked_increment(current, self.delta).map_err(|err| {
                if err == not_integer() {
                    CommandError::InvalidArgument("hash value is not an integer".to_string())
                } else {
                    err
                }
            })?;
            hash.insert(self.field, Bytes::from(value.to_string()));
            Ok(value)
        })?;

        Ok(Frame::Integer(value))
    }
}

impl TryFrom<&mut CommandParser> for HIncrBy {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let field = parser.next_string()?;
        let delta = parser.next_integer()?;

        Ok(Self { key, field, delta })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/hincrbyfloat/>
#[derive(Debug, PartialEq)]
pub struct HIncrByFloat {
    pub key: String,
    pub field: String,
    pub delta: f64,
}

impl Executable for HIncrByFloat {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let value = store.guard::<Hash>(&self.key)?.upsert(|hash| {
            let current = hash.get(&self.field).map(|value| &value[..]);
            let value = float_increment(current, self.delta).map_err(|err| {
                if err == not_float() {
                    CommandError::InvalidArgument("hash value is not a float".to_string())
                } else {
                    err
                }
            })?;
            hash.insert(self.field, Bytes::from(crate::frame::format_float(value)));
            Ok(value)
        })?;

        Ok(Frame::float(value))
    }
}

impl TryFrom<&mut CommandParser> for HIncrByFloat {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let field = parser.next_string()?;
        let delta = parser.next_float()?;

        Ok(Self { key, field, delta })
    }
}

/// Pages over the sorted fields. Each page is a flat array of fields and values.
///
/// Ref: <https://redis.io/docs/latest/commands/hscan/>
#[derive(Debug, PartialEq)]
pub struct HScan {
    pub key: String,
    pub options: ScanOptions,
}

impl Executable for HScan {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let count = self.options.count.unwrap_or(store.config().scan_count);
        let fields: Vec<(String, Bytes)> = store.guard::<Hash>(&self.key)?.read(
            |hash| {
                Ok(sorted_fields(hash)
                    .into_iter()
                    .map(|(f, v)| (f.clone(), v.clone()))
                    .collect())
            },
            || Ok(vec![]),
        )?;

        let (next, page) = scan_page(&fields, self.options.cursor, count);
        let found = page
            .iter()
            .filter(|(field, _)| self.options.matches(field))
            .map(|(field, value)| (field, value));

        Ok(Frame::Array(vec![
            Frame::from(next.to_string()),
            flatten(found),
        ]))
    }
}

impl TryFrom<&mut CommandParser> for HScan {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let options = ScanOptions::parse(parser, false)?;

        Ok(Self { key, options })
    }
}
