use bytes::Bytes;
use std::collections::VecDeque;
use strum_macros::EnumString;

use crate::commands::executable::Executable;
use crate::commands::{syntax, CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::InnerStoreLocked;
use crate::utils::clamp_range;
use crate::Error;

type List = VecDeque<Bytes>;

/// Side of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum End {
    Left,
    Right,
}

impl End {
    fn push(self, list: &mut List, value: Bytes) {
        match self {
            End::Left => list.push_front(value),
            End::Right => list.push_back(value),
        }
    }

    fn pop(self, list: &mut List) -> Option<Bytes> {
        match self {
            End::Left => list.pop_front(),
            End::Right => list.pop_back(),
        }
    }
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let index = if index < 0 { len as i64 + index } else { index };
    if (0..len as i64).contains(&index) {
        Some(index as usize)
    } else {
        None
    }
}

/// `LPUSH`, `RPUSH`, `LPUSHX` and `RPUSHX`. Values are pushed one after the other, so `LPUSH
/// k a b c` leaves `c` at the head.
///
/// Ref: <https://redis.io/docs/latest/commands/lpush/>
#[derive(Debug, PartialEq)]
pub struct Push {
    pub key: String,
    pub values: Vec<Bytes>,
    pub end: End,
    pub only_if_exists: bool,
}

impl Executable for Push {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let guard = store.guard::<List>(&self.key)?;
        let push = |list: &mut List| {
            for value in self.values {
                self.end.push(list, value);
            }
            Ok(list.len())
        };

        let len = if self.only_if_exists {
            guard.update(push, || Ok(0))?
        } else {
            guard.upsert(push)?
        };

        Ok(Frame::from(len))
    }
}

impl TryFrom<&mut CommandParser> for Push {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let (end, only_if_exists) = match parser.name() {
            "lpush" => (End::Left, false),
            "lpushx" => (End::Left, true),
            "rpushx" => (End::Right, true),
            _ => (End::Right, false),
        };

        let key = parser.next_string()?;
        let values = parser.remaining_bytes();

        Ok(Self {
            key,
            values,
            end,
            only_if_exists,
        })
    }
}

/// `LPOP` and `RPOP`, optionally popping up to `count` elements.
///
/// Ref: <https://redis.io/docs/latest/commands/lpop/>
#[derive(Debug, PartialEq)]
pub struct Pop {
    pub key: String,
    pub end: End,
    pub count: Option<usize>,
}

impl Executable for Pop {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let popped = store.guard::<List>(&self.key)?.update(
            |list| {
                let count = self.count.unwrap_or(1);
                Ok(Some(
                    (0..count)
                        .map_while(|_| self.end.pop(list))
                        .collect::<Vec<_>>(),
                ))
            },
            || Ok(None),
        )?;

        let frame = match (popped, self.count) {
            (None, _) => Frame::Null,
            (Some(values), Some(_)) => Frame::bulks(values),
            (Some(values), None) => Frame::optional(values.into_iter().next()),
        };

        Ok(frame)
    }
}

impl TryFrom<&mut CommandParser> for Pop {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let end = if parser.name() == "lpop" {
            End::Left
        } else {
            End::Right
        };

        let key = parser.next_string()?;
        let count = if parser.has_more() {
            Some(parser.next_count()?)
        } else {
            None
        };

        Ok(Self { key, end, count })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/llen/>
#[derive(Debug, PartialEq)]
pub struct LLen {
    pub key: String,
}

impl Executable for LLen {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let len = store
            .guard::<List>(&self.key)?
            .read(|list| Ok(list.len()), || Ok(0))?;

        Ok(Frame::from(len))
    }
}

impl TryFrom<&mut CommandParser> for LLen {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/lrange/>
#[derive(Debug, PartialEq)]
pub struct LRange {
    pub key: String,
    pub start: i64,
    pub stop: i64,
}

impl Executable for LRange {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let values = store.guard::<List>(&self.key)?.read(
            |list| {
                Ok(match clamp_range(self.start, self.stop, list.len()) {
                    Some((start, stop)) => list.range(start..=stop).cloned().collect(),
                    None => vec![],
                })
            },
            || Ok(vec![]),
        )?;

        Ok(Frame::bulks(values))
    }
}

impl TryFrom<&mut CommandParser> for LRange {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let start = parser.next_integer()?;
        let stop = parser.next_integer()?;

        Ok(Self { key, start, stop })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/lindex/>
#[derive(Debug, PartialEq)]
pub struct LIndex {
    pub key: String,
    pub index: i64,
}

impl Executable for LIndex {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let value = store.guard::<List>(&self.key)?.read(
            |list| Ok(resolve_index(self.index, list.len()).and_then(|i| list.get(i).cloned())),
            || Ok(None),
        )?;

        Ok(Frame::optional(value))
    }
}

impl TryFrom<&mut CommandParser> for LIndex {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let index = parser.next_integer()?;

        Ok(Self { key, index })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/lset/>
#[derive(Debug, PartialEq)]
pub struct LSet {
    pub key: String,
    pub index: i64,
    pub value: Bytes,
}

impl Executable for LSet {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        store.guard::<List>(&self.key)?.update(
            |list| match resolve_index(self.index, list.len()) {
                Some(i) => {
                    list[i] = self.value;
                    Ok(())
                }
                None => Err(CommandError::InvalidArgument("index out of range".to_string())),
            },
            || Err(CommandError::NoSuchKey),
        )?;

        Ok(Frame::ok())
    }
}

impl TryFrom<&mut CommandParser> for LSet {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let index = parser.next_integer()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, index, value })
    }
}

/// Trims the list to the elements within `start..=stop`. An empty range deletes the key.
///
/// Ref: <https://redis.io/docs/latest/commands/ltrim/>
#[derive(Debug, PartialEq)]
pub struct LTrim {
    pub key: String,
    pub start: i64,
    pub stop: i64,
}

impl Executable for LTrim {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        store.guard::<List>(&self.key)?.update(
            |list| {
                match clamp_range(self.start, self.stop, list.len()) {
                    Some((start, stop)) => {
                        list.truncate(stop + 1);
                        list.drain(..start);
                    }
                    None => list.clear(),
                }
                Ok(())
            },
            || Ok(()),
        )?;

        Ok(Frame::ok())
    }
}

impl TryFrom<&mut CommandParser> for LTrim {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let start = parser.next_integer()?;
        let stop = parser.next_integer()?;

        Ok(Self { key, start, stop })
    }
}

/// Removes the first `count` occurrences of `value`: from the head when `count` is positive,
/// from the tail when negative and all of them when zero.
///
/// Ref: <https://redis.io/docs/latest/commands/lrem/>
#[derive(Debug, PartialEq)]
pub struct LRem {
    pub key: String,
    pub count: i64,
    pub value: Bytes,
}

impl Executable for LRem {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let removed = store.guard::<List>(&self.key)?.update(
            |list| {
                let limit = match self.count {
                    0 => usize::MAX,
                    count => count.unsigned_abs() as usize,
                };

                let mut positions: Vec<usize> = list
                    .iter()
                    .enumerate()
                    .filter(|(_, value)| **value == self.value)
                    .map(|(i, _)| i)
                    .collect();
                if self.count < 0 {
                    positions.reverse();
                }
                positions.truncate(limit);
                positions.sort_unstable_by(|a, b| b.cmp(a));

                for i in &positions {
                    list.remove(*i);
                }
                Ok(positions.len())
            },
            || Ok(0),
        )?;

        Ok(Frame::from(removed))
    }
}

impl TryFrom<&mut CommandParser> for LRem {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let count = parser.next_integer()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, count, value })
    }
}

/// Inserts `value` before or after the first occurrence of `pivot`. Replies the new length, `-1`
/// when the pivot wasn't found and `0` when the key does not exist.
///
/// Ref: <https://redis.io/docs/latest/commands/linsert/>
#[derive(Debug, PartialEq)]
pub struct LInsert {
    pub key: String,
    pub before: bool,
    pub pivot: Bytes,
    pub value: Bytes,
}

impl Executable for LInsert {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let len = store.guard::<List>(&self.key)?.update(
            |list| match list.iter().position(|value| *value == self.pivot) {
                Some(i) => {
                    let at = if self.before { i } else { i + 1 };
                    list.insert(at, self.value);
                    Ok(list.len() as i64)
                }
                None => Ok(-1),
            },
            || Ok(0),
        )?;

        Ok(Frame::Integer(len))
    }
}

impl TryFrom<&mut CommandParser> for LInsert {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let before = match parser.next_keyword()?.as_deref() {
            Some("BEFORE") => true,
            Some("AFTER") => false,
            _ => return Err(syntax()),
        };
        let pivot = parser.next_bytes()?;
        let value = parser.next_bytes()?;

        Ok(Self {
            key,
            before,
            pivot,
            value,
        })
    }
}

/// `LMOVE source destination LEFT|RIGHT LEFT|RIGHT` and `RPOPLPUSH source destination`. Both
/// keys are type checked before anything is moved.
///
/// Ref: <https://redis.io/docs/latest/commands/lmove/>
#[derive(Debug, PartialEq)]
pub struct LMove {
    pub source: String,
    pub destination: String,
    pub from: End,
    pub to: End,
}

impl Executable for LMove {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        store.view::<List>(&self.destination)?;

        if self.source == self.destination {
            let value = store.guard::<List>(&self.source)?.update(
                |list| {
                    let value = self.from.pop(list);
                    if let Some(value) = &value {
                        self.to.push(list, value.clone());
                    }
                    Ok(value)
                },
                || Ok(None),
            )?;
            return Ok(value.map(Frame::Bulk).unwrap_or(Frame::Null));
        }

        let value = store
            .guard::<List>(&self.source)?
            .update(|list| Ok(self.from.pop(list)), || Ok(None))?;

        let Some(value) = value else {
            return Ok(Frame::Null);
        };

        store.guard::<List>(&self.destination)?.upsert(|list| {
            self.to.push(list, value.clone());
            Ok(())
        })?;

        Ok(Frame::Bulk(value))
    }
}

impl TryFrom<&mut CommandParser> for LMove {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let source = parser.next_string()?;
        let destination = parser.next_string()?;

        let (from, to) = if parser.name() == "rpoplpush" {
            (End::Right, End::Left)
        } else {
            let from = parser.next_string()?.parse().map_err(|_| syntax())?;
            let to = parser.next_string()?.parse().map_err(|_| syntax())?;
            (from, to)
        };

        Ok(Self {
            source,
            destination,
            from,
            to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::cmd;
    use crate::commands::{run, Command};
    use crate::store::Store;

    #[test]
    fn parse_push() {
        let command = Command::try_from(cmd("LPUSHX").arg("k").arg("a").arg("b")).unwrap();
        assert_eq!(
            command,
            Command::Push(Push {
                key: "k".to_string(),
                values: vec![Bytes::from("a"), Bytes::from("b")],
                end: End::Left,
                only_if_exists: true,
            })
        );
    }

    #[tokio::test]
    async fn push_and_range() {
        let store = Store::new();

        assert_eq!(run(&store, ["LPUSH", "l", "a", "b", "c"]).unwrap(), Frame::Integer(3));
        assert_eq!(run(&store, ["RPUSH", "l", "d"]).unwrap(), Frame::Integer(4));
        assert_eq!(
            run(&store, ["LRANGE", "l", "0", "-1"]).unwrap(),
            Frame::bulks(["c", "b", "a", "d"])
        );
        assert_eq!(run(&store, ["LRANGE", "l", "-2", "10"]).unwrap(), Frame::bulks(["a", "d"]));
        assert_eq!(run(&store, ["LRANGE", "l", "3", "1"]).unwrap(), Frame::Array(vec![]));
        assert_eq!(run(&store, ["LLEN", "l"]).unwrap(), Frame::Integer(4));

        assert_eq!(run(&store, ["LPUSHX", "missing", "a"]).unwrap(), Frame::Integer(0));
        assert_eq!(run(&store, ["EXISTS", "missing"]).unwrap(), Frame::Integer(0));
    }

    #[tokio::test]
    async fn pop_removes_empty_list() {
        let store = Store::new();
        run(&store, ["RPUSH", "l", "a", "b", "c"]).unwrap();

        assert_eq!(run(&store, ["LPOP", "l"]).unwrap(), Frame::from("a"));
        assert_eq!(run(&store, ["RPOP", "l", "5"]).unwrap(), Frame::bulks(["c", "b"]));
        assert_eq!(run(&store, ["EXISTS", "l"]).unwrap(), Frame::Integer(0));
        assert_eq!(run(&store, ["LPOP", "l"]).unwrap(), Frame::Null);
        assert_eq!(run(&store, ["LPOP", "l", "2"]).unwrap(), Frame::Null);
    }

    #[tokio::test]
    async fn index_set_and_trim() {
        let store = Store::new();
        run(&store, ["RPUSH", "l", "a", "b", "c", "d"]).unwrap();

        assert_eq!(run(&store, ["LINDEX", "l", "-1"]).unwrap(), Frame::from("d"));
        assert_eq!(run(&store, ["LINDEX", "l", "9"]).unwrap(), Frame::Null);

        assert_eq!(run(&store, ["LSET", "l", "1", "B"]).unwrap(), Frame::ok());
        let err = run(&store, ["LSET", "l", "9", "x"]).unwrap_err();
        assert_eq!(err.to_string(), "ERR index out of range");
        let err = run(&store, ["LSET", "missing", "0", "x"]).unwrap_err();
        assert_eq!(err.downcast_ref::<CommandError>(), Some(&CommandError::NoSuchKey));

        assert_eq!(run(&store, ["LTRIM", "l", "1", "2"]).unwrap(), Frame::ok());
        assert_eq!(run(&store, ["LRANGE", "l", "0", "-1"]).unwrap(), Frame::bulks(["B", "c"]));

        run(&store, ["LTRIM", "l", "5", "10"]).unwrap();
        assert_eq!(run(&store, ["EXISTS", "l"]).unwrap(), Frame::Integer(0));
    }

    #[tokio::test]
    async fn lrem() {
        let store = Store::new();
        run(&store, ["RPUSH", "l", "x", "a", "x", "b", "x"]).unwrap();

        assert_eq!(run(&store, ["LREM", "l", "-2", "x"]).unwrap(), Frame::Integer(2));
        assert_eq!(run(&store, ["LRANGE", "l", "0", "-1"]).unwrap(), Frame::bulks(["x", "a", "b"]));
        assert_eq!(run(&store, ["LREM", "l", "0", "x"]).unwrap(), Frame::Integer(1));
        assert_eq!(run(&store, ["LREM", "l", "1", "nope"]).unwrap(), Frame::Integer(0));
    }

    #[tokio::test]
    async fn linsert() {
        let store = Store::new();
        run(&store, ["RPUSH", "l", "a", "c"]).unwrap();

        assert_eq!(run(&store, ["LINSERT", "l", "BEFORE", "c", "b"]).unwrap(), Frame::Integer(3));
        assert_eq!(run(&store, ["LINSERT", "l", "after", "c", "d"]).unwrap(), Frame::Integer(4));
        assert_eq!(run(&store, ["LINSERT", "l", "AFTER", "z", "y"]).unwrap(), Frame::Integer(-1));
        assert_eq!(run(&store, ["LINSERT", "no", "AFTER", "z", "y"]).unwrap(), Frame::Integer(0));
        assert_eq!(
            run(&store, ["LRANGE", "l", "0", "-1"]).unwrap(),
            Frame::bulks(["a", "b", "c", "d"])
        );
    }

    #[tokio::test]
    async fn lmove_and_rpoplpush() {
        let store = Store::new();
        run(&store, ["RPUSH", "src", "a", "b"]).unwrap();

        assert_eq!(run(&store, ["RPOPLPUSH", "src", "dst"]).unwrap(), Frame::from("b"));
        assert_eq!(run(&store, ["LMOVE", "src", "dst", "LEFT", "RIGHT"]).unwrap(), Frame::from("a"));
        assert_eq!(run(&store, ["EXISTS", "src"]).unwrap(), Frame::Integer(0));
        assert_eq!(run(&store, ["LRANGE", "dst", "0", "-1"]).unwrap(), Frame::bulks(["b", "a"]));
        assert_eq!(run(&store, ["RPOPLPUSH", "src", "dst"]).unwrap(), Frame::Null);

        assert_eq!(run(&store, ["LMOVE", "dst", "dst", "LEFT", "RIGHT"]).unwrap(), Frame::from("b"));
        assert_eq!(run(&store, ["LRANGE", "dst", "0", "-1"]).unwrap(), Frame::bulks(["a", "b"]));
    }

    #[tokio::test]
    async fn rotating_a_single_element_list_keeps_its_ttl() {
        let store = Store::new();
        run(&store, ["RPUSH", "l", "only"]).unwrap();
        run(&store, ["EXPIRE", "l", "100"]).unwrap();

        assert_eq!(run(&store, ["RPOPLPUSH", "l", "l"]).unwrap(), Frame::from("only"));
        assert_eq!(run(&store, ["LMOVE", "l", "l", "LEFT", "LEFT"]).unwrap(), Frame::from("only"));
        assert_eq!(run(&store, ["LRANGE", "l", "0", "-1"]).unwrap(), Frame::bulks(["only"]));
        assert_eq!(run(&store, ["TTL", "l"]).unwrap(), Frame::Integer(100));

        assert_eq!(run(&store, ["LMOVE", "missing", "missing", "LEFT", "RIGHT"]).unwrap(), Frame::Null);
        assert_eq!(run(&store, ["EXISTS", "missing"]).unwrap(), Frame::Integer(0));
    }

    #[tokio::test]
    async fn lmove_checks_destination_type_first() {
        let store = Store::new();
        run(&store, ["RPUSH", "src", "a"]).unwrap();
        run(&store, ["SET", "dst", "v"]).unwrap();

        let err = run(&store, ["LMOVE", "src", "dst", "LEFT", "LEFT"]).unwrap_err();
        assert_eq!(err.downcast_ref::<CommandError>(), Some(&CommandError::WrongType));
        assert_eq!(run(&store, ["LLEN", "src"]).unwrap(), Frame::Integer(1));
    }
}
