use std::collections::HashSet;

use crate::commands::executable::Executable;
use crate::commands::{parse_float, syntax, CommandError, CommandParser, ScanOptions};
use crate::frame::Frame;
use crate::sorted_set::{Aggregate, LexBound, Limit, ScoreBound, SortedSet};
use crate::store::{InnerStoreLocked, Value, ValueType};
use crate::utils::scan_page;
use crate::Error;

fn nan_score() -> CommandError {
    CommandError::InvalidArgument("resulting score is not a number (NaN)".to_string())
}

fn range_reply(range: Vec<(&str, f64)>, with_scores: bool) -> Frame {
    let mut frames = Vec::with_capacity(range.len() * if with_scores { 2 } else { 1 });
    for (member, score) in range {
        frames.push(Frame::from(member));
        if with_scores {
            frames.push(Frame::float(score));
        }
    }
    Frame::Array(frames)
}

fn parse_limit(parser: &mut CommandParser) -> Result<Limit, CommandError> {
    let offset = parser.next_integer()?;
    let count = parser.next_integer()?;

    Ok(Limit {
        // A negative offset selects nothing.
        offset: usize::try_from(offset).unwrap_or(usize::MAX),
        count,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddCondition {
    /// `NX`, only add new members.
    Absent,
    /// `XX`, only update existing members.
    Present,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreComparison {
    Greater,
    Less,
}

/// `ZADD key [NX|XX] [GT|LT] [CH] [INCR] score member [score member ...]`
///
/// Replies the number of added members, or added and updated ones with `CH`. With `INCR` it
/// behaves like `ZINCRBY` and replies the new score, or nil when a condition blocked the update.
///
/// Ref: <https://redis.io/docs/latest/commands/zadd/>
#[derive(Debug, PartialEq)]
pub struct ZAdd {
    pub key: String,
    pub condition: Option<AddCondition>,
    pub comparison: Option<ScoreComparison>,
    pub changed: bool,
    pub incr: bool,
    pub members: Vec<(f64, String)>,
}

impl Executable for ZAdd {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let ZAdd {
            key,
            condition,
            comparison,
            changed,
            incr,
            members,
        } = self;

        let (added, updated, last) = store.guard::<SortedSet>(&key)?.upsert(|zset| {
            let mut added = 0;
            let mut updated = 0;
            let mut last = None;

            for (score, member) in members {
                let current = zset.score(&member);
                match (condition, current) {
                    (Some(AddCondition::Absent), Some(_)) => continue,
                    (Some(AddCondition::Present), None) => continue,
                    _ => {}
                }

                let score = match (incr, current) {
                    (true, Some(current)) => current + score,
                    _ => score,
                };
                if score.is_nan() {
                    return Err(nan_score());
                }

                if let Some(current) = current {
                    let blocked = match comparison {
                        Some(ScoreComparison::Greater) => score <= current,
                        Some(ScoreComparison::Less) => score >= current,
                        None => false,
                    };
                    if blocked {
                        continue;
                    }
                    if score != current {
                        zset.add(score, member);
                        updated += 1;
                    }
                } else {
                    zset.add(score, member);
                    added += 1;
                }
                last = Some(score);
            }

            Ok((added, updated, last))
        })?;

        if incr {
            return Ok(last.map(Frame::float).unwrap_or(Frame::Null));
        }

        let count = if changed { added + updated } else { added };
        Ok(Frame::Integer(count))
    }
}

impl TryFrom<&mut CommandParser> for ZAdd {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let args = parser.remaining_bytes();

        let mut condition = None;
        let mut comparison = None;
        let mut changed = false;
        let mut incr = false;

        let mut i = 0;
        while i < args.len() {
            let option = String::from_utf8_lossy(&args[i]).to_uppercase();
            match option.as_str() {
                "NX" => condition = Some(AddCondition::Absent),
                "XX" => condition = Some(AddCondition::Present),
                "GT" => comparison = Some(ScoreComparison::Greater),
                "LT" => comparison = Some(ScoreComparison::Less),
                "CH" => changed = true,
                "INCR" => incr = true,
                _ => break,
            }
            i += 1;
        }

        let pairs = &args[i..];
        if pairs.is_empty() {
            return Err(CommandError::EndOfStream);
        }
        if pairs.len() % 2 != 0 {
            return Err(syntax());
        }

        let nx_xx = args[..i]
            .iter()
            .filter(|arg| arg.eq_ignore_ascii_case(b"NX") || arg.eq_ignore_ascii_case(b"XX"))
            .count();
        let gt_lt = args[..i]
            .iter()
            .filter(|arg| arg.eq_ignore_ascii_case(b"GT") || arg.eq_ignore_ascii_case(b"LT"))
            .count();
        if nx_xx > 1 {
            return Err(CommandError::InvalidArgument(
                "XX and NX options at the same time are not compatible".to_string(),
            ));
        }
        if gt_lt > 1 || (gt_lt > 0 && condition == Some(AddCondition::Absent)) {
            return Err(CommandError::InvalidArgument(
                "GT, LT, and/or NX options at the same time are not compatible".to_string(),
            ));
        }
        if incr && pairs.len() > 2 {
            return Err(CommandError::InvalidArgument(
                "INCR option supports a single increment-element pair".to_string(),
            ));
        }

        let mut members = Vec::with_capacity(pairs.len() / 2);
        for pair in pairs.chunks(2) {
            let score = parse_float(&pair[0])?;
            let member = std::str::from_utf8(&pair[1])?.to_string();
            members.push((score, member));
        }

        Ok(Self {
            key,
            condition,
            comparison,
            changed,
            incr,
            members,
        })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/zcard/>
#[derive(Debug, PartialEq)]
pub struct ZCard {
    pub key: String,
}

impl Executable for ZCard {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let len = store
            .guard::<SortedSet>(&self.key)?
            .read(|zset| Ok(zset.len()), || Ok(0))?;

        Ok(Frame::from(len))
    }
}

impl TryFrom<&mut CommandParser> for ZCard {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/zcount/>
#[derive(Debug, PartialEq)]
pub struct ZCount {
    pub key: String,
    pub min: ScoreBound,
    pub max: ScoreBound,
}

impl Executable for ZCount {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let count = store
            .guard::<SortedSet>(&self.key)?
            .read(|zset| Ok(zset.count_by_score(self.min, self.max)), || Ok(0))?;

        Ok(Frame::from(count))
    }
}

impl TryFrom<&mut CommandParser> for ZCount {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let min = parser.next_parsed()?;
        let max = parser.next_parsed()?;

        Ok(Self { key, min, max })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/zlexcount/>
#[derive(Debug, PartialEq)]
pub struct ZLexCount {
    pub key: String,
    pub min: LexBound,
    pub max: LexBound,
}

impl Executable for ZLexCount {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let count = store
            .guard::<SortedSet>(&self.key)?
            .read(|zset| Ok(zset.count_by_lex(&self.min, &self.max)), || Ok(0))?;

        Ok(Frame::from(count))
    }
}

impl TryFrom<&mut CommandParser> for ZLexCount {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let min = parser.next_parsed()?;
        let max = parser.next_parsed()?;

        Ok(Self { key, min, max })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/zincrby/>
#[derive(Debug, PartialEq)]
pub struct ZIncrBy {
    pub key: String,
    pub increment: f64,
    pub member: String,
}

impl Executable for ZIncrBy {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let score = store.guard::<SortedSet>(&self.key)?.upsert(|zset| {
            let score = zset.score(&self.member).unwrap_or(0.0) + self.increment;
            if score.is_nan() {
                return Err(nan_score());
            }
            zset.add(score, self.member);
            Ok(score)
        })?;

        Ok(Frame::float(score))
    }
}

impl TryFrom<&mut CommandParser> for ZIncrBy {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let increment = parser.next_float()?;
        let member = parser.next_string()?;

        Ok(Self {
            key,
            increment,
            member,
        })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/zscore/>
#[derive(Debug, PartialEq)]
pub struct ZScore {
    pub key: String,
    pub member: String,
}

impl Executable for ZScore {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let score = store
            .guard::<SortedSet>(&self.key)?
            .read(|zset| Ok(zset.score(&self.member)), || Ok(None))?;

        Ok(score.map(Frame::float).unwrap_or(Frame::Null))
    }
}

impl TryFrom<&mut CommandParser> for ZScore {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let member = parser.next_string()?;

        Ok(Self { key, member })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/zmscore/>
#[derive(Debug, PartialEq)]
pub struct ZMScore {
    pub key: String,
    pub members: Vec<String>,
}

impl Executable for ZMScore {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let scores = store.guard::<SortedSet>(&self.key)?.read(
            |zset| Ok(self.members.iter().map(|m| zset.score(m)).collect()),
            || Ok(vec![None; self.members.len()]),
        )?;

        Ok(Frame::Array(
            scores
                .into_iter()
                .map(|score| score.map(Frame::float).unwrap_or(Frame::Null))
                .collect(),
        ))
    }
}

impl TryFrom<&mut CommandParser> for ZMScore {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let members = parser.remaining_strings()?;
        if members.is_empty() {
            return Err(CommandError::EndOfStream);
        }

        Ok(Self { key, members })
    }
}

/// `ZRANK` and `ZREVRANK`.
///
/// Ref: <https://redis.io/docs/latest/commands/zrank/>
#[derive(Debug, PartialEq)]
pub struct ZRank {
    pub key: String,
    pub member: String,
    pub rev: bool,
}

impl Executable for ZRank {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let rank = store.guard::<SortedSet>(&self.key)?.read(
            |zset| {
                Ok(if self.rev {
                    zset.rev_rank(&self.member)
                } else {
                    zset.rank(&self.member)
                })
            },
            || Ok(None),
        )?;

        Ok(rank.map(Frame::from).unwrap_or(Frame::Null))
    }
}

impl TryFrom<&mut CommandParser> for ZRank {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let rev = parser.name() == "zrevrank";
        let key = parser.next_string()?;
        let member = parser.next_string()?;

        Ok(Self { key, member, rev })
    }
}

/// `ZRANGE` and `ZREVRANGE` by rank.
///
/// Ref: <https://redis.io/docs/latest/commands/zrange/>
#[derive(Debug, PartialEq)]
pub struct ZRange {
    pub key: String,
    pub start: i64,
    pub stop: i64,
    pub rev: bool,
    pub with_scores: bool,
}

impl Executable for ZRange {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let frame = store.guard::<SortedSet>(&self.key)?.read(
            |zset| {
                let range = zset.range_by_rank(self.start, self.stop, self.rev);
                Ok(range_reply(range, self.with_scores))
            },
            || Ok(Frame::Array(vec![])),
        )?;

        Ok(frame)
    }
}

impl TryFrom<&mut CommandParser> for ZRange {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let rev = parser.name() == "zrevrange";
        let key = parser.next_string()?;
        let start = parser.next_integer()?;
        let stop = parser.next_integer()?;

        let with_scores = match parser.next_keyword()?.as_deref() {
            None => false,
            Some("WITHSCORES") => true,
            Some(_) => return Err(syntax()),
        };

        Ok(Self {
            key,
            start,
            stop,
            rev,
            with_scores,
        })
    }
}

/// `ZRANGEBYSCORE` and `ZREVRANGEBYSCORE`. The reverse form takes `max` before `min`.
///
/// Ref: <https://redis.io/docs/latest/commands/zrangebyscore/>
#[derive(Debug, PartialEq)]
pub struct ZRangeByScore {
    pub key: String,
    pub min: ScoreBound,
    pub max: ScoreBound,
    pub rev: bool,
    pub with_scores: bool,
    pub limit: Option<Limit>,
}

impl Executable for ZRangeByScore {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let frame = store.guard::<SortedSet>(&self.key)?.read(
            |zset| {
                let range = zset.range_by_score(self.min, self.max, self.rev, self.limit);
                Ok(range_reply(range, self.with_scores))
            },
            || Ok(Frame::Array(vec![])),
        )?;

        Ok(frame)
    }
}

impl TryFrom<&mut CommandParser> for ZRangeByScore {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let rev = parser.name() == "zrevrangebyscore";
        let key = parser.next_string()?;
        let first = parser.next_parsed()?;
        let second = parser.next_parsed()?;
        let (min, max) = if rev { (second, first) } else { (first, second) };

        let mut with_scores = false;
        let mut limit = None;
        while let Some(option) = parser.next_keyword()? {
            match option.as_str() {
                "WITHSCORES" => with_scores = true,
                "LIMIT" => limit = Some(parse_limit(parser)?),
                _ => return Err(syntax()),
            }
        }

        Ok(Self {
            key,
            min,
            max,
            rev,
            with_scores,
            limit,
        })
    }
}

/// `ZRANGEBYLEX` and `ZREVRANGEBYLEX`. The reverse form takes `max` before `min`.
///
/// Ref: <https://redis.io/docs/latest/commands/zrangebylex/>
#[derive(Debug, PartialEq)]
pub struct ZRangeByLex {
    pub key: String,
    pub min: LexBound,
    pub max: LexBound,
    pub rev: bool,
    pub limit: Option<Limit>,
}

impl Executable for ZRangeByLex {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let frame = store.guard::<SortedSet>(&self.key)?.read(
            |zset| {
                let range = zset.range_by_lex(&self.min, &self.max, self.rev, self.limit);
                Ok(range_reply(range, false))
            },
            || Ok(Frame::Array(vec![])),
        )?;

        Ok(frame)
    }
}

impl TryFrom<&mut CommandParser> for ZRangeByLex {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let rev = parser.name() == "zrevrangebylex";
        let key = parser.next_string()?;
        let first = parser.next_parsed()?;
        let second = parser.next_parsed()?;
        let (min, max) = if rev { (second, first) } else { (first, second) };

        let limit = match parser.next_keyword()?.as_deref() {
            None => None,
            Some("LIMIT") => Some(parse_limit(parser)?),
            Some(_) => return Err(syntax()),
        };

        Ok(Self {
            key,
            min,
            max,
            rev,
            limit,
        })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/zrem/>
#[derive(Debug, PartialEq)]
pub struct ZRem {
    pub key: String,
    pub members: Vec<String>,
}

impl Executable for ZRem {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let removed = store.guard::<SortedSet>(&self.key)?.update(
            |zset| Ok(self.members.iter().filter(|m| zset.remove(m)).count()),
            || Ok(0),
        )?;

        Ok(Frame::from(removed))
    }
}

impl TryFrom<&mut CommandParser> for ZRem {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let members = parser.remaining_strings()?;
        if members.is_empty() {
            return Err(CommandError::EndOfStream);
        }

        Ok(Self { key, members })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/zremrangebyrank/>
#[derive(Debug, PartialEq)]
pub struct ZRemRangeByRank {
    pub key: String,
    pub start: i64,
    pub stop: i64,
}

impl Executable for ZRemRangeByRank {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let removed = store.guard::<SortedSet>(&self.key)?.update(
            |zset| Ok(zset.remove_range_by_rank(self.start, self.stop)),
            || Ok(0),
        )?;

        Ok(Frame::from(removed))
    }
}

impl TryFrom<&mut CommandParser> for ZRemRangeByRank {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let start = parser.next_integer()?;
        let stop = parser.next_integer()?;

        Ok(Self { key, start, stop })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/zremrangebyscore/>
#[derive(Debug, PartialEq)]
pub struct ZRemRangeByScore {
    pub key: String,
    pub min: ScoreBound,
    pub max: ScoreBound,
}

impl Executable for ZRemRangeByScore {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let removed = store.guard::<SortedSet>(&self.key)?.update(
            |zset| Ok(zset.remove_range_by_score(self.min, self.max)),
            || Ok(0),
        )?;

        Ok(Frame::from(removed))
    }
}

impl TryFrom<&mut CommandParser> for ZRemRangeByScore {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let min = parser.next_parsed()?;
        let max = parser.next_parsed()?;

        Ok(Self { key, min, max })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/zremrangebylex/>
#[derive(Debug, PartialEq)]
pub struct ZRemRangeByLex {
    pub key: String,
    pub min: LexBound,
    pub max: LexBound,
}

impl Executable for ZRemRangeByLex {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let removed = store.guard::<SortedSet>(&self.key)?.update(
            |zset| Ok(zset.remove_range_by_lex(&self.min, &self.max)),
            || Ok(0),
        )?;

        Ok(Frame::from(removed))
    }
}

impl TryFrom<&mut CommandParser> for ZRemRangeByLex {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let min = parser.next_parsed()?;
        let max = parser.next_parsed()?;

        Ok(Self { key, min, max })
    }
}

/// `ZPOPMIN` and `ZPOPMAX`. Replies a flat array of members and scores.
///
/// Ref: <https://redis.io/docs/latest/commands/zpopmin/>
#[derive(Debug, PartialEq)]
pub struct ZPop {
    pub key: String,
    pub max: bool,
    pub count: usize,
}

impl Executable for ZPop {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let popped = store
            .guard::<SortedSet>(&self.key)?
            .update(|zset| Ok(zset.pop(self.count, self.max)), || Ok(vec![]))?;

        let range = popped.iter().map(|(m, s)| (m.as_str(), *s)).collect();
        Ok(range_reply(range, true))
    }
}

impl TryFrom<&mut CommandParser> for ZPop {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let max = parser.name() == "zpopmax";
        let key = parser.next_string()?;
        let count = if parser.has_more() {
            parser.next_count()?
        } else {
            1
        };

        Ok(Self { key, max, count })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZStoreOp {
    Union,
    Inter,
}

/// `ZUNIONSTORE` and `ZINTERSTORE`
/// `destination numkeys key [key ...] [WEIGHTS weight [weight ...]] [AGGREGATE SUM|MIN|MAX]`
///
/// Source keys may hold plain sets, whose members score `1`. Replies the cardinality of the
/// result, an empty result deletes the destination.
///
/// Ref: <https://redis.io/docs/latest/commands/zunionstore/>
#[derive(Debug, PartialEq)]
pub struct ZStore {
    pub op: ZStoreOp,
    pub destination: String,
    pub keys: Vec<String>,
    pub weights: Vec<f64>,
    pub aggregate: Aggregate,
}

impl Executable for ZStore {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let mut sources = Vec::with_capacity(self.keys.len());
        for (i, key) in self.keys.iter().enumerate() {
            let weight = self.weights.get(i).copied().unwrap_or(1.0);
            let source = match store.type_of(key) {
                None => SortedSet::new(),
                Some(ValueType::SortedSet) => store.view::<SortedSet>(key)?.cloned().unwrap_or_default(),
                Some(ValueType::Set) => store
                    .view::<HashSet<String>>(key)?
                    .map(|set| set.iter().map(|m| (m.clone(), 1.0)).collect::<SortedSet>())
                    .unwrap_or_default(),
                Some(_) => return Err(CommandError::WrongType.into()),
            };
            sources.push((source, weight));
        }

        let result = match self.op {
            ZStoreOp::Union => SortedSet::union(&sources, self.aggregate),
            ZStoreOp::Inter => SortedSet::inter(&sources, self.aggregate),
        };

        let len = result.len();
        if result.is_empty() {
            store.remove(&self.destination);
        } else {
            store.insert(self.destination, Value::SortedSet(result));
        }

        Ok(Frame::from(len))
    }
}

impl TryFrom<&mut CommandParser> for ZStore {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let name = parser.name().to_string();
        let op = if name == "zinterstore" {
            ZStoreOp::Inter
        } else {
            ZStoreOp::Union
        };

        let destination = parser.next_string()?;
        let numkeys = parser.next_integer()?;
        if numkeys < 1 {
            return Err(CommandError::InvalidArgument(format!(
                "at least 1 input key is needed for '{}' command",
                name
            )));
        }

        let numkeys = usize::try_from(numkeys).map_err(|_| syntax())?;
        if numkeys > parser.remaining() {
            return Err(syntax());
        }

        let mut keys = Vec::with_capacity(numkeys);
        for _ in 0..numkeys {
            keys.push(parser.next_string()?);
        }

        let mut weights = vec![];
        let mut aggregate = Aggregate::default();
        while let Some(option) = parser.next_keyword()? {
            match option.as_str() {
                "WEIGHTS" => {
                    weights.clear();
                    for _ in 0..numkeys {
                        let weight = parser.next_bytes().map_err(|_| syntax())?;
                        weights.push(parse_float(&weight).map_err(|_| {
                            CommandError::InvalidArgument("weight value is not a float".to_string())
                        })?);
                    }
                }
                "AGGREGATE" => {
                    aggregate = parser.next_string()?.parse().map_err(|_| syntax())?;
                }
                _ => return Err(syntax()),
            }
        }

        Ok(Self {
            op,
            destination,
            keys,
            weights,
            aggregate,
        })
    }
}

/// Pages over the members in rank order. Each page is a flat array of members and scores.
///
/// Ref: <https://redis.io/docs/latest/commands/zscan/>
#[derive(Debug, PartialEq)]
pub struct ZScan {
    pub key: String,
    pub options: ScanOptions,
}

impl Executable for ZScan {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let count = self.options.count.unwrap_or(store.config().scan_count);
        let members: Vec<(String, f64)> = store.guard::<SortedSet>(&self.key)?.read(
            |zset| Ok(zset.iter().map(|(m, s)| (m.to_string(), s)).collect()),
            || Ok(vec![]),
        )?;

        let (next, page) = scan_page(&members, self.options.cursor, count);
        let found = page
            .iter()
            .filter(|(member, _)| self.options.matches(member))
            .map(|(member, score)| (member.as_str(), *score))
            .collect();

        Ok(Frame::Array(vec![
            Frame::from(next.to_string()),
            range_reply(found, true),
        ]))
    }
}

impl TryFrom<&mut CommandParser> for ZScan {
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

    fn seeded() -> Store {
        let store = Store::new();
        run(&store, ["ZADD", "z", "1", "one", "2", "two", "3", "three"]).unwrap();
        store
    }

    fn error_message(result: Result<Frame, Error>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn parse_zadd_options() {
        let command = Command::try_from(cmd("ZADD").args(["z", "xx", "CH", "1.5", "a"])).unwrap();
        assert_eq!(
            command,
            Command::ZAdd(ZAdd {
                key: "z".to_string(),
                condition: Some(AddCondition::Present),
                comparison: None,
                changed: true,
                incr: false,
                members: vec![(1.5, "a".to_string())],
            })
        );
    }

    #[test]
    fn parse_zadd_rejects_incompatible_options() {
        let err = Command::try_from(cmd("ZADD").args(["z", "NX", "XX", "1", "a"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ERR XX and NX options at the same time are not compatible"
        );

        let err = Command::try_from(cmd("ZADD").args(["z", "NX", "GT", "1", "a"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ERR GT, LT, and/or NX options at the same time are not compatible"
        );

        let err = Command::try_from(cmd("ZADD").args(["z", "1", "a", "2"])).unwrap_err();
        assert_eq!(err, syntax());

        let err = Command::try_from(cmd("ZADD").args(["z", "nope", "a"])).unwrap_err();
        assert_eq!(err.to_string(), "ERR value is not a valid float");
    }

    #[tokio::test]
    async fn zadd_conditions() {
        let store = seeded();

        assert_eq!(run(&store, ["ZADD", "z", "NX", "9", "one", "4", "four"]).unwrap(), Frame::Integer(1));
        assert_eq!(run(&store, ["ZSCORE", "z", "one"]).unwrap(), Frame::from("1"));

        assert_eq!(run(&store, ["ZADD", "z", "XX", "CH", "5", "one", "5", "five"]).unwrap(), Frame::Integer(1));
        assert_eq!(run(&store, ["ZSCORE", "z", "five"]).unwrap(), Frame::Null);

        assert_eq!(run(&store, ["ZADD", "z", "GT", "CH", "1", "one"]).unwrap(), Frame::Integer(0));
        assert_eq!(run(&store, ["ZADD", "z", "LT", "CH", "1", "one"]).unwrap(), Frame::Integer(1));
        assert_eq!(run(&store, ["ZSCORE", "z", "one"]).unwrap(), Frame::from("1"));
    }

    #[tokio::test]
    async fn zadd_incr() {
        let store = seeded();

        assert_eq!(run(&store, ["ZADD", "z", "INCR", "2.5", "one"]).unwrap(), Frame::from("3.5"));
        assert_eq!(run(&store, ["ZADD", "z", "NX", "INCR", "1", "one"]).unwrap(), Frame::Null);

        run(&store, ["ZADD", "inf", "inf", "m"]).unwrap();
        let result = run(&store, ["ZADD", "inf", "INCR", "-inf", "m"]);
        assert_eq!(error_message(result), "ERR resulting score is not a number (NaN)");
        let result = run(&store, ["ZINCRBY", "inf", "-inf", "m"]);
        assert_eq!(error_message(result), "ERR resulting score is not a number (NaN)");
    }

    #[tokio::test]
    async fn ranks() {
        let store = seeded();

        assert_eq!(run(&store, ["ZRANK", "z", "one"]).unwrap(), Frame::Integer(0));
        assert_eq!(run(&store, ["ZRANK", "z", "two"]).unwrap(), Frame::Integer(1));
        assert_eq!(run(&store, ["ZRANK", "z", "three"]).unwrap(), Frame::Integer(2));
        assert_eq!(run(&store, ["ZREVRANK", "z", "three"]).unwrap(), Frame::Integer(0));
        assert_eq!(run(&store, ["ZRANK", "z", "nope"]).unwrap(), Frame::Null);
    }

    #[tokio::test]
    async fn range_by_rank() {
        let store = seeded();

        assert_eq!(
            run(&store, ["ZRANGE", "z", "0", "-1"]).unwrap(),
            Frame::bulks(["one", "two", "three"])
        );
        assert_eq!(
            run(&store, ["ZRANGE", "z", "-2", "-1", "WITHSCORES"]).unwrap(),
            Frame::bulks(["two", "2", "three", "3"])
        );
        assert_eq!(run(&store, ["ZREVRANGE", "z", "0", "0"]).unwrap(), Frame::bulks(["three"]));
        assert_eq!(run(&store, ["ZRANGE", "z", "2", "1"]).unwrap(), Frame::Array(vec![]));
        assert_eq!(run(&store, ["ZRANGE", "z", "5", "10"]).unwrap(), Frame::Array(vec![]));
    }

    #[tokio::test]
    async fn range_by_score() {
        let store = seeded();

        assert_eq!(
            run(&store, ["ZRANGEBYSCORE", "z", "(1", "+inf"]).unwrap(),
            Frame::bulks(["two", "three"])
        );
        assert_eq!(
            run(&store, ["ZREVRANGEBYSCORE", "z", "3", "-inf", "LIMIT", "1", "1"]).unwrap(),
            Frame::bulks(["two"])
        );
        assert_eq!(
            run(&store, ["ZRANGEBYSCORE", "z", "-inf", "2", "WITHSCORES"]).unwrap(),
            Frame::bulks(["one", "1", "two", "2"])
        );
        assert_eq!(run(&store, ["ZCOUNT", "z", "2", "(3"]).unwrap(), Frame::Integer(1));

        let result = run(&store, ["ZRANGEBYSCORE", "z", "a", "1"]);
        assert_eq!(error_message(result), "ERR min or max is not a float");
    }

    #[tokio::test]
    async fn range_by_lex() {
        let store = Store::new();
        run(&store, ["ZADD", "z", "0", "a", "0", "b", "0", "c", "0", "d"]).unwrap();

        assert_eq!(
            run(&store, ["ZRANGEBYLEX", "z", "[b", "(d"]).unwrap(),
            Frame::bulks(["b", "c"])
        );
        assert_eq!(
            run(&store, ["ZREVRANGEBYLEX", "z", "+", "-", "LIMIT", "0", "2"]).unwrap(),
            Frame::bulks(["d", "c"])
        );
        assert_eq!(run(&store, ["ZLEXCOUNT", "z", "-", "+"]).unwrap(), Frame::Integer(4));

        let result = run(&store, ["ZRANGEBYLEX", "z", "b", "+"]);
        assert_eq!(error_message(result), "ERR min or max not valid string range item");

        assert_eq!(run(&store, ["ZREMRANGEBYLEX", "z", "[a", "[b"]).unwrap(), Frame::Integer(2));
        assert_eq!(run(&store, ["ZCARD", "z"]).unwrap(), Frame::Integer(2));
    }

    #[tokio::test]
    async fn removals_delete_empty_sets() {
        let store = seeded();

        assert_eq!(run(&store, ["ZREM", "z", "one", "nope"]).unwrap(), Frame::Integer(1));
        assert_eq!(run(&store, ["ZREMRANGEBYSCORE", "z", "-inf", "2"]).unwrap(), Frame::Integer(1));
        assert_eq!(run(&store, ["ZREMRANGEBYRANK", "z", "0", "-1"]).unwrap(), Frame::Integer(1));
        assert_eq!(run(&store, ["EXISTS", "z"]).unwrap(), Frame::Integer(0));
    }

    #[tokio::test]
    async fn pop() {
        let store = seeded();

        assert_eq!(run(&store, ["ZPOPMIN", "z"]).unwrap(), Frame::bulks(["one", "1"]));
        assert_eq!(
            run(&store, ["ZPOPMAX", "z", "5"]).unwrap(),
            Frame::bulks(["three", "3", "two", "2"])
        );
        assert_eq!(run(&store, ["ZPOPMAX", "z"]).unwrap(), Frame::Array(vec![]));
        assert_eq!(run(&store, ["EXISTS", "z"]).unwrap(), Frame::Integer(0));
    }

    #[tokio::test]
    async fn mscore() {
        let store = seeded();

        assert_eq!(
            run(&store, ["ZMSCORE", "z", "two", "nope"]).unwrap(),
            Frame::Array(vec![Frame::from("2"), Frame::Null])
        );
    }

    #[tokio::test]
    async fn union_and_inter_store() {
        let store = Store::new();
        run(&store, ["ZADD", "a", "1", "x", "2", "y"]).unwrap();
        run(&store, ["ZADD", "b", "10", "y", "20", "z"]).unwrap();
        run(&store, ["SADD", "s", "x", "y"]).unwrap();

        let reply = run(&store, ["ZUNIONSTORE", "dst", "2", "a", "b", "WEIGHTS", "2", "1"]).unwrap();
        assert_eq!(reply, Frame::Integer(3));
        assert_eq!(
            run(&store, ["ZRANGE", "dst", "0", "-1", "WITHSCORES"]).unwrap(),
            Frame::bulks(["x", "2", "y", "14", "z", "20"])
        );

        let reply = run(&store, ["ZINTERSTORE", "dst", "2", "a", "s", "AGGREGATE", "MAX"]).unwrap();
        assert_eq!(reply, Frame::Integer(2));
        assert_eq!(
            run(&store, ["ZRANGE", "dst", "0", "-1", "WITHSCORES"]).unwrap(),
            Frame::bulks(["x", "1", "y", "2"])
        );

        let reply = run(&store, ["ZINTERSTORE", "dst", "2", "a", "missing"]).unwrap();
        assert_eq!(reply, Frame::Integer(0));
        assert_eq!(run(&store, ["EXISTS", "dst"]).unwrap(), Frame::Integer(0));

        run(&store, ["SET", "str", "v"]).unwrap();
        let err = run(&store, ["ZUNIONSTORE", "dst", "2", "a", "str"]).unwrap_err();
        assert_eq!(err.downcast_ref::<CommandError>(), Some(&CommandError::WrongType));
    }

    #[test]
    fn store_numkeys_must_fit_the_arguments() {
        let store = Store::new();
        run(&store, ["ZADD", "a", "1", "x"]).unwrap();

        let err = run(&store, ["ZUNIONSTORE", "dst", "9223372036854775807", "a"]).unwrap_err();
        assert_eq!(err.to_string(), "ERR syntax error");
        let err = run(&store, ["ZINTERSTORE", "dst", "3", "a", "b"]).unwrap_err();
        assert_eq!(err.to_string(), "ERR syntax error");

        let err = run(&store, ["ZINTERSTORE", "dst", "-9223372036854775808", "a"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ERR at least 1 input key is needed for 'zinterstore' command"
        );
        assert_eq!(run(&store, ["EXISTS", "dst"]).unwrap(), Frame::Integer(0));
    }

    #[tokio::test]
    async fn zscan() {
        let store = seeded();

        let reply = run(&store, ["ZSCAN", "z", "0", "MATCH", "t*"]).unwrap();
        assert_eq!(
            reply,
            Frame::Array(vec![Frame::from("0"), Frame::bulks(["two", "2", "three", "3"])])
        );
    }
}
