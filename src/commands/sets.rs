use rand::seq::IteratorRandom;
use std::collections::HashSet;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser, ScanOptions};
use crate::frame::Frame;
use crate::store::{InnerStoreLocked, Value};
use crate::utils::scan_page;
use crate::Error;

type Set = HashSet<String>;

fn sorted(members: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut members: Vec<String> = members.into_iter().collect();
    members.sort();
    members
}

/// Ref: <https://redis.io/docs/latest/commands/sadd/>
#[derive(Debug, PartialEq)]
pub struct SAdd {
    pub key: String,
    pub members: Vec<String>,
}

impl Executable for SAdd {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let added = store.guard::<Set>(&self.key)?.upsert(|set| {
            Ok(self
                .members
                .into_iter()
                .filter(|member| set.insert(member.clone()))
                .count())
        })?;

        Ok(Frame::from(added))
    }
}

impl TryFrom<&mut CommandParser> for SAdd {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let members = parser.remaining_strings()?;

        Ok(Self { key, members })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/srem/>
#[derive(Debug, PartialEq)]
pub struct SRem {
    pub key: String,
    pub members: Vec<String>,
}

impl Executable for SRem {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let removed = store.guard::<Set>(&self.key)?.update(
            |set| Ok(self.members.iter().filter(|member| set.remove(*member)).count()),
            || Ok(0),
        )?;

        Ok(Frame::from(removed))
    }
}

impl TryFrom<&mut CommandParser> for SRem {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let members = parser.remaining_strings()?;

        Ok(Self { key, members })
    }
}

/// Members are returned sorted so replies are deterministic.
///
/// Ref: <https://redis.io/docs/latest/commands/smembers/>
#[derive(Debug, PartialEq)]
pub struct SMembers {
    pub key: String,
}

impl Executable for SMembers {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let members = store
            .guard::<Set>(&self.key)?
            .read(|set| Ok(sorted(set.iter().cloned())), || Ok(vec![]))?;

        Ok(Frame::bulks(members))
    }
}

impl TryFrom<&mut CommandParser> for SMembers {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/sismember/>
#[derive(Debug, PartialEq)]
pub struct SIsMember {
    pub key: String,
    pub member: String,
}

impl Executable for SIsMember {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let found = store
            .guard::<Set>(&self.key)?
            .read(|set| Ok(set.contains(&self.member)), || Ok(false))?;

        Ok(Frame::boolean(found))
    }
}

impl TryFrom<&mut CommandParser> for SIsMember {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let member = parser.next_string()?;

        Ok(Self { key, member })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/smismember/>
#[derive(Debug, PartialEq)]
pub struct SMIsMember {
    pub key: String,
    pub members: Vec<String>,
}

impl Executable for SMIsMember {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let found = store.guard::<Set>(&self.key)?.read(
            |set| Ok(self.members.iter().map(|m| set.contains(m)).collect()),
            || Ok(vec![false; self.members.len()]),
        )?;

        Ok(Frame::Array(found.into_iter().map(Frame::boolean).collect()))
    }
}

impl TryFrom<&mut CommandParser> for SMIsMember {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let members = parser.remaining_strings()?;

        Ok(Self { key, members })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/scard/>
#[derive(Debug, PartialEq)]
pub struct SCard {
    pub key: String,
}

impl Executable for SCard {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let len = store
            .guard::<Set>(&self.key)?
            .read(|set| Ok(set.len()), || Ok(0))?;

        Ok(Frame::from(len))
    }
}

impl TryFrom<&mut CommandParser> for SCard {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}

/// Removes and returns random members. Without a count the reply is a single bulk string.
///
/// Ref: <https://redis.io/docs/latest/commands/spop/>
#[derive(Debug, PartialEq)]
pub struct SPop {
    pub key: String,
    pub count: Option<usize>,
}

impl Executable for SPop {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let count = self.count.unwrap_or(1);
        let popped = store.guard::<Set>(&self.key)?.update(
            |set| {
                let chosen = set
                    .iter()
                    .cloned()
                    .choose_multiple(&mut rand::thread_rng(), count.min(set.len()));
                for member in &chosen {
                    set.remove(member);
                }
                Ok(chosen)
            },
            || Ok(vec![]),
        )?;

        let frame = match self.count {
            Some(_) => Frame::bulks(popped),
            None => popped.into_iter().next().map(Frame::from).unwrap_or(Frame::Null),
        };

        Ok(frame)
    }
}

impl TryFrom<&mut CommandParser> for SPop {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let count = if parser.has_more() {
            Some(parser.next_count()?)
        } else {
            None
        };

        Ok(Self { key, count })
    }
}

/// Largest negative `SRANDMEMBER` count accepted, as every repetition is materialized.
const MAX_REPEATED_MEMBERS: u64 = 1 << 24;

/// Returns random members without removing them. A positive count returns distinct members, a
/// negative one may return the same member several times.
///
/// Ref: <https://redis.io/docs/latest/commands/srandmember/>
#[derive(Debug, PartialEq)]
pub struct SRandMember {
    pub key: String,
    pub count: Option<i64>,
}

impl Executable for SRandMember {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let mut rng = rand::thread_rng();
        let members = store.guard::<Set>(&self.key)?.read(
            |set| {
                Ok(match self.count {
                    None => set.iter().cloned().choose(&mut rng).into_iter().collect(),
                    Some(count) if count >= 0 => {
                        let count = usize::try_from(count).unwrap_or(usize::MAX).min(set.len());
                        set.iter().cloned().choose_multiple(&mut rng, count)
                    }
                    Some(count) => (0..count.unsigned_abs())
                        .filter_map(|_| set.iter().choose(&mut rng).cloned())
                        .collect(),
                })
            },
            || Ok(vec![]),
        )?;

        let frame = match self.count {
            Some(_) => Frame::bulks(members),
            None => members.into_iter().next().map(Frame::from).unwrap_or(Frame::Null),
        };

        Ok(frame)
    }
}

impl TryFrom<&mut CommandParser> for SRandMember {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let count = if parser.has_more() {
            let count = parser.next_integer()?;
            if count < 0 && count.unsigned_abs() > MAX_REPEATED_MEMBERS {
                return Err(CommandError::InvalidArgument("value is out of range".to_string()));
            }
            Some(count)
        } else {
            None
        };

        Ok(Self { key, count })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/smove/>
#[derive(Debug, PartialEq)]
pub struct SMove {
    pub source: String,
    pub destination: String,
    pub member: String,
}

impl Executable for SMove {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        store.view::<Set>(&self.destination)?;

        if self.source == self.destination {
            let present = store
                .guard::<Set>(&self.source)?
                .read(|set| Ok(set.contains(&self.member)), || Ok(false))?;
            return Ok(Frame::boolean(present));
        }

        let moved = store
            .guard::<Set>(&self.source)?
            .update(|set| Ok(set.remove(&self.member)), || Ok(false))?;

        if moved {
            store.guard::<Set>(&self.destination)?.upsert(|set| {
                set.insert(self.member);
                Ok(())
            })?;
        }

        Ok(Frame::boolean(moved))
    }
}

impl TryFrom<&mut CommandParser> for SMove {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let source = parser.next_string()?;
        let destination = parser.next_string()?;
        let member = parser.next_string()?;

        Ok(Self {
            source,
            destination,
            member,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Diff,
    Inter,
    Union,
}

impl SetOp {
    fn apply(self, mut sets: Vec<Set>) -> Set {
        if sets.is_empty() {
            return Set::new();
        }
        let first = sets.remove(0);

        match self {
            SetOp::Diff => first
                .into_iter()
                .filter(|member| !sets.iter().any(|set| set.contains(member)))
                .collect(),
            SetOp::Inter => first
                .into_iter()
                .filter(|member| sets.iter().all(|set| set.contains(member)))
                .collect(),
            SetOp::Union => sets.into_iter().fold(first, |mut acc, set| {
                acc.extend(set);
                acc
            }),
        }
    }
}

/// `SDIFF`, `SINTER`, `SUNION` and their `*STORE` forms. Missing keys are empty sets. The store
/// forms replace the destination, deleting it when the result is empty, and reply with the
/// cardinality of the result.
///
/// Ref: <https://redis.io/docs/latest/commands/sinterstore/>
#[derive(Debug, PartialEq)]
pub struct SetAlgebra {
    pub op: SetOp,
    pub destination: Option<String>,
    pub keys: Vec<String>,
}

impl Executable for SetAlgebra {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let mut sets = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            sets.push(store.view::<Set>(key)?.cloned().unwrap_or_default());
        }
        let result = self.op.apply(sets);

        let Some(destination) = self.destination else {
            return Ok(Frame::bulks(sorted(result)));
        };

        let len = result.len();
        if result.is_empty() {
            store.remove(&destination);
        } else {
            store.insert(destination, Value::Set(result));
        }

        Ok(Frame::from(len))
    }
}

impl TryFrom<&mut CommandParser> for SetAlgebra {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let name = parser.name().to_string();
        let op = if name.starts_with("sdiff") {
            SetOp::Diff
        } else if name.starts_with("sinter") {
            SetOp::Inter
        } else {
            SetOp::Union
        };

        let destination = if name.ends_with("store") {
            Some(parser.next_string()?)
        } else {
            None
        };

        let keys = parser.remaining_strings()?;
        if keys.is_empty() {
            return Err(CommandError::EndOfStream);
        }

        Ok(Self {
            op,
            destination,
            keys,
        })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/sscan/>
#[derive(Debug, PartialEq)]
pub struct SScan {
    pub key: String,
    pub options: ScanOptions,
}

impl Executable for SScan {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let count = self.options.count.unwrap_or(store.config().scan_count);
        let members = store
            .guard::<Set>(&self.key)?
            .read(|set| Ok(sorted(set.iter().cloned())), || Ok(vec![]))?;

        let (next, page) = scan_page(&members, self.options.cursor, count);
        let found: Vec<String> = page
            .iter()
            .filter(|member| self.options.matches(member))
            .cloned()
            .collect();

        Ok(Frame::Array(vec![
            Frame::from(next.to_string()),
            Frame::bulks(found),
        ]))
    }
}

impl TryFrom<&mut CommandParser> for SScan {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let options = ScanOptions::parse(parser, false)?;

        Ok(Self { key, options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::cmd;
    use crate::commands::{run, Command};
    use crate::store::Store;

    fn members(frame: Frame) -> Vec<Frame> {
        frame.into_array().unwrap()
    }

    #[test]
    fn parse_store_forms() {
        let command = Command::try_from(cmd("SINTERSTORE").arg("dst").arg("a").arg("b")).unwrap();
        assert_eq!(
            command,
            Command::SetAlgebra(SetAlgebra {
                op: SetOp::Inter,
                destination: Some("dst".to_string()),
                keys: vec!["a".to_string(), "b".to_string()],
            })
        );
    }

    #[tokio::test]
    async fn add_remove_members() {
        let store = Store::new();

        assert_eq!(run(&store, ["SADD", "s", "b", "a", "b"]).unwrap(), Frame::Integer(2));
        assert_eq!(run(&store, ["SADD", "s", "a", "c"]).unwrap(), Frame::Integer(1));
        assert_eq!(run(&store, ["SMEMBERS", "s"]).unwrap(), Frame::bulks(["a", "b", "c"]));
        assert_eq!(run(&store, ["SCARD", "s"]).unwrap(), Frame::Integer(3));
        assert_eq!(run(&store, ["SISMEMBER", "s", "a"]).unwrap(), Frame::Integer(1));
        assert_eq!(
            run(&store, ["SMISMEMBER", "s", "a", "z"]).unwrap(),
            Frame::Array(vec![Frame::Integer(1), Frame::Integer(0)])
        );

        assert_eq!(run(&store, ["SREM", "s", "a", "b", "c", "d"]).unwrap(), Frame::Integer(3));
        assert_eq!(run(&store, ["EXISTS", "s"]).unwrap(), Frame::Integer(0));
    }

    #[tokio::test]
    async fn wrong_type() {
        let store = Store::new();
        run(&store, ["SET", "k", "v"]).unwrap();

        let err = run(&store, ["SADD", "k", "a"]).unwrap_err();
        assert_eq!(err.downcast_ref::<CommandError>(), Some(&CommandError::WrongType));
        let err = run(&store, ["SUNION", "k"]).unwrap_err();
        assert_eq!(err.downcast_ref::<CommandError>(), Some(&CommandError::WrongType));
    }

    #[tokio::test]
    async fn pop_and_random_members() {
        let store = Store::new();
        run(&store, ["SADD", "s", "a", "b", "c"]).unwrap();

        assert_eq!(members(run(&store, ["SRANDMEMBER", "s", "10"]).unwrap()).len(), 3);
        assert_eq!(members(run(&store, ["SRANDMEMBER", "s", "-5"]).unwrap()).len(), 5);
        assert!(matches!(run(&store, ["SRANDMEMBER", "s"]).unwrap(), Frame::Bulk(_)));
        assert_eq!(run(&store, ["SCARD", "s"]).unwrap(), Frame::Integer(3));

        assert_eq!(members(run(&store, ["SPOP", "s", "2"]).unwrap()).len(), 2);
        assert!(matches!(run(&store, ["SPOP", "s"]).unwrap(), Frame::Bulk(_)));
        assert_eq!(run(&store, ["EXISTS", "s"]).unwrap(), Frame::Integer(0));
        assert_eq!(run(&store, ["SPOP", "s"]).unwrap(), Frame::Null);
        assert_eq!(run(&store, ["SRANDMEMBER", "s"]).unwrap(), Frame::Null);
    }

    #[tokio::test]
    async fn smove() {
        let store = Store::new();
        run(&store, ["SADD", "src", "a", "b"]).unwrap();

        assert_eq!(run(&store, ["SMOVE", "src", "dst", "a"]).unwrap(), Frame::Integer(1));
        assert_eq!(run(&store, ["SMOVE", "src", "dst", "z"]).unwrap(), Frame::Integer(0));
        assert_eq!(run(&store, ["SMEMBERS", "dst"]).unwrap(), Frame::bulks(["a"]));
        assert_eq!(run(&store, ["SMEMBERS", "src"]).unwrap(), Frame::bulks(["b"]));
    }

    #[tokio::test]
    async fn smove_onto_itself_checks_membership() {
        let store = Store::new();
        run(&store, ["SADD", "s", "only"]).unwrap();
        run(&store, ["EXPIRE", "s", "100"]).unwrap();

        assert_eq!(run(&store, ["SMOVE", "s", "s", "only"]).unwrap(), Frame::Integer(1));
        assert_eq!(run(&store, ["SMOVE", "s", "s", "other"]).unwrap(), Frame::Integer(0));
        assert_eq!(run(&store, ["SMEMBERS", "s"]).unwrap(), Frame::bulks(["only"]));
        assert_eq!(run(&store, ["TTL", "s"]).unwrap(), Frame::Integer(100));

        run(&store, ["SET", "str", "v"]).unwrap();
        let err = run(&store, ["SMOVE", "str", "str", "v"]).unwrap_err();
        assert_eq!(err.downcast_ref::<CommandError>(), Some(&CommandError::WrongType));
    }

    #[tokio::test]
    async fn random_counts_are_bounded() {
        let store = Store::new();
        run(&store, ["SADD", "s", "a", "b"]).unwrap();

        let err = run(&store, ["SRANDMEMBER", "s", "-9223372036854775808"]).unwrap_err();
        assert_eq!(err.to_string(), "ERR value is out of range");
        let err = run(&store, ["SRANDMEMBER", "s", "-100000000"]).unwrap_err();
        assert_eq!(err.to_string(), "ERR value is out of range");

        let reply = run(&store, ["SRANDMEMBER", "s", "9223372036854775807"]).unwrap();
        assert_eq!(members(reply).len(), 2);
        assert_eq!(members(run(&store, ["SRANDMEMBER", "s", "-5"]).unwrap()).len(), 5);

        let reply = run(&store, ["SPOP", "s", "9223372036854775807"]).unwrap();
        assert_eq!(members(reply).len(), 2);
        assert_eq!(run(&store, ["EXISTS", "s"]).unwrap(), Frame::Integer(0));
    }

    #[tokio::test]
    async fn algebra() {
        let store = Store::new();
        run(&store, ["SADD", "a", "1", "2", "3"]).unwrap();
        run(&store, ["SADD", "b", "2", "3", "4"]).unwrap();

        assert_eq!(run(&store, ["SDIFF", "a", "b"]).unwrap(), Frame::bulks(["1"]));
        assert_eq!(run(&store, ["SINTER", "a", "b"]).unwrap(), Frame::bulks(["2", "3"]));
        assert_eq!(
            run(&store, ["SUNION", "a", "b", "missing"]).unwrap(),
            Frame::bulks(["1", "2", "3", "4"])
        );
        assert_eq!(run(&store, ["SINTER", "a", "missing"]).unwrap(), Frame::Array(vec![]));

        assert_eq!(run(&store, ["SINTERSTORE", "dst", "a", "b"]).unwrap(), Frame::Integer(2));
        assert_eq!(run(&store, ["SMEMBERS", "dst"]).unwrap(), Frame::bulks(["2", "3"]));

        assert_eq!(run(&store, ["SDIFFSTORE", "dst", "a", "a"]).unwrap(), Frame::Integer(0));
        assert_eq!(run(&store, ["EXISTS", "dst"]).unwrap(), Frame::Integer(0));
    }

    #[tokio::test]
    async fn sscan_pages_through_members() {
        let store = Store::new();
        run(&store, ["SADD", "s", "a1", "a2", "b1", "b2", "c1"]).unwrap();

        let reply = members(run(&store, ["SSCAN", "s", "0", "COUNT", "3"]).unwrap());
        assert_eq!(reply[0], Frame::from("3"));
        assert_eq!(reply[1], Frame::bulks(["a1", "a2", "b1"]));

        let reply = members(run(&store, ["SSCAN", "s", "3", "COUNT", "3"]).unwrap());
        assert_eq!(reply[0], Frame::from("0"));
        assert_eq!(reply[1], Frame::bulks(["b2", "c1"]));

        let reply = members(run(&store, ["SSCAN", "s", "0", "MATCH", "a*"]).unwrap());
        assert_eq!(reply[1], Frame::bulks(["a1", "a2"]));
    }
}
