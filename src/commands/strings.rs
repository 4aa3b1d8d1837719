use bytes::{Bytes, BytesMut};
use num_traits::CheckedAdd;
use std::str::{self, FromStr};
use tokio::time::Duration;

use crate::commands::executable::Executable;
use crate::commands::keys::{invalid_expire_time, TimeUnit};
use crate::commands::{not_float, not_integer, parse_float, syntax, CommandError, CommandParser};
use crate::frame::{format_float, Frame};
use crate::store::{InnerStoreLocked, Value};
use crate::utils::lcs::lcs;
use crate::Error;

// 512MB, the largest string value the store accepts.
const MAX_STRING_LEN: usize = 512 * 1024 * 1024;

/// Adds `delta` to the integer stored in `current` (zero when there is none).
pub(crate) fn checked_increment<T>(current: Option<&[u8]>, delta: T) -> Result<T, CommandError>
where
    T: FromStr + CheckedAdd + Default,
{
    let value = match current {
        Some(bytes) => str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.parse::<T>().ok())
            .ok_or_else(not_integer)?,
        None => T::default(),
    };

    value.checked_add(&delta).ok_or_else(|| {
        CommandError::InvalidArgument("increment or decrement would overflow".to_string())
    })
}

/// Adds `delta` to the float stored in `current`, rejecting non finite results.
pub(crate) fn float_increment(current: Option<&[u8]>, delta: f64) -> Result<f64, CommandError> {
    let value = match current {
        Some(bytes) => parse_float(bytes)?,
        None => 0.0,
    };

    let result = value + delta;
    if !result.is_finite() {
        return Err(CommandError::InvalidArgument(
            "increment would produce NaN or Infinity".to_string(),
        ));
    }
    Ok(result)
}

/// When a written string expires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expiry {
    /// Milliseconds from now.
    In(i64),
    /// Unix time in milliseconds.
    At(i64),
}

impl Expiry {
    /// Parses the amount following `EX`, `PX`, `EXAT` or `PXAT`.
    fn parse(parser: &mut CommandParser, option: &str) -> Result<Expiry, CommandError> {
        let amount = parser.next_integer()?;
        let invalid = || invalid_expire_time(parser.name());

        if amount <= 0 {
            return Err(invalid());
        }

        let expiry = match option {
            "EX" => Expiry::In(TimeUnit::Seconds.to_millis(amount).ok_or_else(invalid)?),
            "PX" => Expiry::In(amount),
            "EXAT" => Expiry::At(TimeUnit::Seconds.to_millis(amount).ok_or_else(invalid)?),
            _ => Expiry::At(amount),
        };
        Ok(expiry)
    }

    fn apply(self, store: &mut InnerStoreLocked, key: &str) {
        match self {
            Expiry::In(millis) => store.expire_in(key, millis),
            Expiry::At(unix_millis) => store.expire_at_unix(key, unix_millis),
        };
    }
}

/// Get the value of key. If the key does not exist the special value nil is returned. An error
/// is returned if the value stored at key is not a string, because GET only handles string
/// values.
///
/// Ref: <https://redis.io/docs/latest/commands/get/>
#[derive(Debug, PartialEq)]
pub struct Get {
    pub key: String,
}

impl Executable for Get {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        Ok(Frame::optional(store.get(&self.key)?))
    }
}

impl TryFrom<&mut CommandParser> for Get {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetCondition {
    /// `NX`: only set the key if it does not already exist.
    Absent,
    /// `XX`: only set the key if it already exists.
    Present,
}

/// Set key to hold the string value. If key already holds a value, it is overwritten, regardless
/// of its type. Any previous time to live associated with the key is discarded unless `KEEPTTL`
/// is given.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: String,
    pub value: Bytes,
    pub expiry: Option<Expiry>,
    pub condition: Option<SetCondition>,
    pub keep_ttl: bool,
    pub get: bool,
}

impl Executable for Set {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let previous = if self.get {
            store.get(&self.key)?
        } else {
            None
        };

        let reply = |written: bool| match (self.get, written) {
            (true, _) => Frame::optional(previous.clone()),
            (false, true) => Frame::ok(),
            (false, false) => Frame::Null,
        };

        let exists = store.exists(&self.key);
        match self.condition {
            Some(SetCondition::Absent) if exists => return Ok(reply(false)),
            Some(SetCondition::Present) if !exists => return Ok(reply(false)),
            _ => {}
        }

        if self.keep_ttl {
            store.replace(self.key.clone(), Value::String(self.value.clone()));
        } else {
            store.set(self.key.clone(), self.value.clone());
        }

        if let Some(expiry) = self.expiry {
            expiry.apply(store, &self.key);
        }

        Ok(reply(true))
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let value = parser.next_bytes()?;

        let mut set = Set {
            key,
            value,
            expiry: None,
            condition: None,
            keep_ttl: false,
            get: false,
        };

        while let Some(option) = parser.next_keyword()? {
            match option.as_str() {
                "EX" | "PX" | "EXAT" | "PXAT" if set.expiry.is_none() && !set.keep_ttl => {
                    set.expiry = Some(Expiry::parse(parser, &option)?);
                }
                "NX" if set.condition.is_none() => set.condition = Some(SetCondition::Absent),
                "XX" if set.condition.is_none() => set.condition = Some(SetCondition::Present),
                "KEEPTTL" if set.expiry.is_none() => set.keep_ttl = true,
                "GET" => set.get = true,
                _ => return Err(syntax()),
            }
        }

        Ok(set)
    }
}

/// Ref: <https://redis.io/docs/latest/commands/setnx/>
#[derive(Debug, PartialEq)]
pub struct SetNx {
    pub key: String,
    pub value: Bytes,
}

impl Executable for SetNx {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        if store.exists(&self.key) {
            return Ok(Frame::Integer(0));
        }

        store.set(self.key, self.value);
        Ok(Frame::Integer(1))
    }
}

impl TryFrom<&mut CommandParser> for SetNx {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, value })
    }
}

/// `SETEX key seconds value` and `PSETEX key milliseconds value`.
///
/// Ref: <https://redis.io/docs/latest/commands/setex/>
#[derive(Debug, PartialEq)]
pub struct SetEx {
    pub key: String,
    pub millis: i64,
    pub value: Bytes,
}

impl Executable for SetEx {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        store.set_with_ttl(
            self.key,
            self.value,
            Duration::from_millis(self.millis as u64),
        );
        Ok(Frame::ok())
    }
}

impl TryFrom<&mut CommandParser> for SetEx {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let unit = if parser.name() == "psetex" {
            TimeUnit::Milliseconds
        } else {
            TimeUnit::Seconds
        };

        let key = parser.next_string()?;
        let amount = parser.next_integer()?;
        let millis = unit
            .to_millis(amount)
            .filter(|millis| *millis > 0)
            .ok_or_else(|| invalid_expire_time(parser.name()))?;
        let value = parser.next_bytes()?;

        Ok(Self { key, millis, value })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/getset/>
#[derive(Debug, PartialEq)]
pub struct GetSet {
    pub key: String,
    pub value: Bytes,
}

impl Executable for GetSet {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let previous = store.get(&self.key)?;
        store.set(self.key, self.value);
        Ok(Frame::optional(previous))
    }
}

impl TryFrom<&mut CommandParser> for GetSet {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, value })
    }
}

/// Get the value of key and delete the key.
///
/// Ref: <https://redis.io/docs/latest/commands/getdel/>
#[derive(Debug, PartialEq)]
pub struct GetDel {
    pub key: String,
}

impl Executable for GetDel {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let value = store.get(&self.key)?;
        if value.is_some() {
            store.remove(&self.key);
        }
        Ok(Frame::optional(value))
    }
}

impl TryFrom<&mut CommandParser> for GetDel {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GetExOption {
    Expire(Expiry),
    Persist,
}

/// Get the value of key and optionally set its expiration.
///
/// Ref: <https://redis.io/docs/latest/commands/getex/>
#[derive(Debug, PartialEq)]
pub struct GetEx {
    pub key: String,
    pub option: Option<GetExOption>,
}

impl Executable for GetEx {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let value = store.get(&self.key)?;

        if value.is_some() {
            match self.option {
                Some(GetExOption::Expire(expiry)) => expiry.apply(store, &self.key),
                Some(GetExOption::Persist) => {
                    store.persist(&self.key);
                }
                None => {}
            }
        }

        Ok(Frame::optional(value))
    }
}

impl TryFrom<&mut CommandParser> for GetEx {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;

        let option = match parser.next_keyword()? {
            None => None,
            Some(option) => match option.as_str() {
                "EX" | "PX" | "EXAT" | "PXAT" => {
                    Some(GetExOption::Expire(Expiry::parse(parser, &option)?))
                }
                "PERSIST" => Some(GetExOption::Persist),
                _ => return Err(syntax()),
            },
        };

        Ok(Self { key, option })
    }
}

/// Values of all the given keys. Keys that don't exist or don't hold a string are nil.
///
/// Ref: <https://redis.io/docs/latest/commands/mget/>
#[derive(Debug, PartialEq)]
pub struct MGet {
    pub keys: Vec<String>,
}

impl Executable for MGet {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let values = self
            .keys
            .iter()
            .map(|key| Frame::optional(store.get(key).ok().flatten()))
            .collect();

        Ok(Frame::Array(values))
    }
}

impl TryFrom<&mut CommandParser> for MGet {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let keys = parser.remaining_strings()?;
        Ok(Self { keys })
    }
}

/// `MSET` and `MSETNX`. The latter sets nothing if any of the keys exists.
///
/// Ref: <https://redis.io/docs/latest/commands/mset/>
#[derive(Debug, PartialEq)]
pub struct MSet {
    pub pairs: Vec<(String, Bytes)>,
    pub only_if_none_exist: bool,
}

impl Executable for MSet {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        if self.only_if_none_exist && self.pairs.iter().any(|(key, _)| store.exists(key)) {
            return Ok(Frame::Integer(0));
        }

        for (key, value) in self.pairs {
            store.set(key, value);
        }

        if self.only_if_none_exist {
            Ok(Frame::Integer(1))
        } else {
            Ok(Frame::ok())
        }
    }
}

impl TryFrom<&mut CommandParser> for MSet {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let only_if_none_exist = parser.name() == "msetnx";
        let pairs = parser.remaining_pairs()?;

        Ok(Self {
            pairs,
            only_if_none_exist,
        })
    }
}

/// Appends the value at the end of the string, creating it when the key does not exist.
///
/// Ref: <https://redis.io/docs/latest/commands/append/>
#[derive(Debug, PartialEq)]
pub struct Append {
    pub key: String,
    pub value: Bytes,
}

impl Executable for Append {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let len = store.guard::<Bytes>(&self.key)?.upsert(|data| {
            let mut appended = BytesMut::with_capacity(data.len() + self.value.len());
            appended.extend_from_slice(data);
            appended.extend_from_slice(&self.value);
            *data = appended.freeze();
            Ok(data.len())
        })?;

        Ok(Frame::from(len))
    }
}

impl TryFrom<&mut CommandParser> for Append {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, value })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/strlen/>
#[derive(Debug, PartialEq)]
pub struct Strlen {
    pub key: String,
}

impl Executable for Strlen {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let len = store
            .guard::<Bytes>(&self.key)?
            .read(|data| Ok(data.len()), || Ok(0))?;

        Ok(Frame::from(len))
    }
}

impl TryFrom<&mut CommandParser> for Strlen {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}

/// `INCR`, `DECR`, `INCRBY` and `DECRBY`: adds `delta` to the number stored at key, which is
/// set to `0` first when it does not exist.
///
/// Ref: <https://redis.io/docs/latest/commands/incrby/>
#[derive(Debug, PartialEq)]
pub struct IncrBy {
    pub key: String,
    pub delta: i64,
}

impl Executable for IncrBy {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let guard = store.guard::<Bytes>(&self.key)?;
        let exists = guard.exists();

        let value = guard.upsert(|data| {
            let current = if exists { Some(&data[..]) } else { None };
            let value = checked_increment(current, self.delta)?;
            *data = Bytes::from(value.to_string());
            Ok(value)
        })?;

        Ok(Frame::Integer(value))
    }
}

impl TryFrom<&mut CommandParser> for IncrBy {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let delta = match parser.name() {
            "incr" => 1,
            "decr" => -1,
            "incrby" => parser.next_integer()?,
            _ => parser.next_integer()?.checked_neg().ok_or_else(|| {
                CommandError::InvalidArgument("decrement would overflow".to_string())
            })?,
        };

        Ok(Self { key, delta })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/incrbyfloat/>
#[derive(Debug, PartialEq)]
pub struct IncrByFloat {
    pub key: String,
    pub delta: f64,
}

impl Executable for IncrByFloat {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let guard = store.guard::<Bytes>(&self.key)?;
        let exists = guard.exists();

        let value = guard.upsert(|data| {
            let current = if exists { Some(&data[..]) } else { None };
            let value = Bytes::from(format_float(float_increment(current, self.delta)?));
            *data = value.clone();
            Ok(value)
        })?;

        Ok(Frame::Bulk(value))
    }
}

impl TryFrom<&mut CommandParser> for IncrByFloat {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let delta = parser.next_float()?;

        Ok(Self { key, delta })
    }
}

// Byte range of a string as GETRANGE and BITCOUNT address it: negative offsets count from the
// end and are clamped to the start of the string.
fn string_range(start: i64, end: i64, len: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }

    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let end = if end < 0 { (len + end).max(0) } else { end.min(len - 1) };

    if start > end || start >= len {
        None
    } else {
        Some((start as usize, end as usize))
    }
}

/// Ref: <https://redis.io/docs/latest/commands/getrange/>
#[derive(Debug, PartialEq)]
pub struct GetRange {
    pub key: String,
    pub start: i64,
    pub end: i64,
}

impl Executable for GetRange {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let value = store.guard::<Bytes>(&self.key)?.read(
            |data| {
                Ok(match string_range(self.start, self.end, data.len()) {
                    Some((start, end)) => data.slice(start..=end),
                    None => Bytes::new(),
                })
            },
            || Ok(Bytes::new()),
        )?;

        Ok(Frame::Bulk(value))
    }
}

impl TryFrom<&mut CommandParser> for GetRange {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let start = parser.next_integer()?;
        let end = parser.next_integer()?;

        Ok(Self { key, start, end })
    }
}

/// Overwrites part of the string starting at `offset`, padding with zero bytes when the string
/// is shorter.
///
/// Ref: <https://redis.io/docs/latest/commands/setrange/>
#[derive(Debug, PartialEq)]
pub struct SetRange {
    pub key: String,
    pub offset: usize,
    pub value: Bytes,
}

impl Executable for SetRange {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let guard = store.guard::<Bytes>(&self.key)?;

        if self.value.is_empty() {
            let len = guard.read(|data| Ok(data.len()), || Ok(0))?;
            return Ok(Frame::from(len));
        }

        if self.offset + self.value.len() > MAX_STRING_LEN {
            return Err(CommandError::InvalidArgument(
                "string exceeds maximum allowed size (proto-max-bulk-len)".to_string(),
            )
            .into());
        }

        let len = guard.upsert(|data| {
            let end = self.offset + self.value.len();
            let mut buf = BytesMut::from(&data[..]);
            if buf.len() < end {
                buf.resize(end, 0);
            }
            buf[self.offset..end].copy_from_slice(&self.value);
            *data = buf.freeze();
            Ok(data.len())
        })?;

        Ok(Frame::from(len))
    }
}

impl TryFrom<&mut CommandParser> for SetRange {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let offset = usize::try_from(parser.next_integer()?)
            .map_err(|_| CommandError::InvalidArgument("offset is out of range".to_string()))?;
        let value = parser.next_bytes()?;

        Ok(Self { key, offset, value })
    }
}

fn next_bit_offset(parser: &mut CommandParser) -> Result<usize, CommandError> {
    parser
        .next_integer()
        .ok()
        .filter(|offset| (0..(MAX_STRING_LEN as i64) * 8).contains(offset))
        .map(|offset| offset as usize)
        .ok_or_else(|| {
            CommandError::InvalidArgument("bit offset is not an integer or out of range".to_string())
        })
}

fn bit_at(data: &[u8], offset: usize) -> u8 {
    data.get(offset / 8)
        .map_or(0, |byte| (byte >> (7 - offset % 8)) & 1)
}

/// Ref: <https://redis.io/docs/latest/commands/getbit/>
#[derive(Debug, PartialEq)]
pub struct GetBit {
    pub key: String,
    pub offset: usize,
}

impl Executable for GetBit {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let bit = store
            .guard::<Bytes>(&self.key)?
            .read(|data| Ok(bit_at(data, self.offset)), || Ok(0))?;

        Ok(Frame::Integer(bit as i64))
    }
}

impl TryFrom<&mut CommandParser> for GetBit {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let offset = next_bit_offset(parser)?;

        Ok(Self { key, offset })
    }
}

/// Sets or clears the bit at `offset`, growing the string as needed. Replies the previous bit.
///
/// Ref: <https://redis.io/docs/latest/commands/setbit/>
#[derive(Debug, PartialEq)]
pub struct SetBit {
    pub key: String,
    pub offset: usize,
    pub bit: bool,
}

impl Executable for SetBit {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let previous = store.guard::<Bytes>(&self.key)?.upsert(|data| {
            let previous = bit_at(data, self.offset);
            let index = self.offset / 8;
            let mask = 1u8 << (7 - self.offset % 8);

            let mut buf = BytesMut::from(&data[..]);
            if buf.len() <= index {
                buf.resize(index + 1, 0);
            }
            if self.bit {
                buf[index] |= mask;
            } else {
                buf[index] &= !mask;
            }
            *data = buf.freeze();

            Ok(previous)
        })?;

        Ok(Frame::Integer(previous as i64))
    }
}

impl TryFrom<&mut CommandParser> for SetBit {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let offset = next_bit_offset(parser)?;
        let bit = match parser.next_integer() {
            Ok(0) => false,
            Ok(1) => true,
            _ => {
                return Err(CommandError::InvalidArgument(
                    "bit is not an integer or out of range".to_string(),
                ))
            }
        };

        Ok(Self { key, offset, bit })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BitUnit {
    Byte,
    Bit,
}

/// Counts the set bits of a string, optionally within a `start end [BYTE|BIT]` range.
///
/// Ref: <https://redis.io/docs/latest/commands/bitcount/>
#[derive(Debug, PartialEq)]
pub struct BitCount {
    pub key: String,
    pub range: Option<(i64, i64, BitUnit)>,
}

impl Executable for BitCount {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let count = store.guard::<Bytes>(&self.key)?.read(
            |data| {
                let count = match self.range {
                    None => data.iter().map(|byte| byte.count_ones() as usize).sum(),
                    Some((start, end, BitUnit::Byte)) => match string_range(start, end, data.len()) {
                        Some((start, end)) => data[start..=end]
                            .iter()
                            .map(|byte| byte.count_ones() as usize)
                            .sum(),
                        None => 0,
                    },
                    Some((start, end, BitUnit::Bit)) => {
                        match string_range(start, end, data.len() * 8) {
                            Some((start, end)) => (start..=end)
                                .filter(|offset| bit_at(data, *offset) == 1)
                                .count(),
                            None => 0,
                        }
                    }
                };
                Ok(count)
            },
            || Ok(0),
        )?;

        Ok(Frame::from(count))
    }
}

impl TryFrom<&mut CommandParser> for BitCount {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;

        if !parser.has_more() {
            return Ok(Self { key, range: None });
        }

        let start = parser.next_integer()?;
        let end = parser.next_integer().map_err(|err| match err {
            CommandError::EndOfStream => syntax(),
            err => err,
        })?;
        let unit = match parser.next_keyword()?.as_deref() {
            None | Some("BYTE") => BitUnit::Byte,
            Some("BIT") => BitUnit::Bit,
            Some(_) => return Err(syntax()),
        };

        Ok(Self {
            key,
            range: Some((start, end, unit)),
        })
    }
}

/// The LCS command implements the longest common subsequence algorithm.
///
/// Note that this is different than the longest common string algorithm, since matching
/// characters in the string does not need to be contiguous.
///
/// Ref: <https://redis.io/docs/latest/commands/lcs>
#[derive(Debug, PartialEq)]
pub struct Lcs {
    pub key1: String,
    pub key2: String,
    pub len: bool,
}

impl Executable for Lcs {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let a = store.get(&self.key1)?.unwrap_or_default();
        let b = store.get(&self.key2)?.unwrap_or_default();

        let common = lcs(&a, &b);

        let res = if self.len {
            Frame::from(common.len())
        } else {
            Frame::Bulk(Bytes::from(common))
        };

        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for Lcs {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key1 = parser.next_string()?;
        let key2 = parser.next_string()?;
        let len = match parser.next_keyword()?.as_deref() {
            None => false,
            Some("LEN") => true,
            Some(_) => return Err(syntax()),
        };

        Ok(Self { key1, key2, len })
    }
}
