pub mod executable;
pub mod hashes;
pub mod keys;
pub mod lists;
pub mod pubsub;
pub mod server;
pub mod sets;
pub mod table;
pub mod strings;
pub mod zsets;

use bytes::Bytes;
use std::str::FromStr;
use std::{str, vec};
use strum_macros::{AsRefStr, Display};
use thiserror::Error as ThisError;

use crate::command::Cmd;
use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::glob::Pattern;
use crate::store::{InnerStoreLocked, ValueType};
use crate::Error;

use hashes::{
    HDel, HExists, HGet, HGetAll, HIncrBy, HIncrByFloat, HKeys, HLen, HMGet, HScan, HSet, HSetNx,
    HStrlen, HVals,
};
use keys::{Del, Exists, Expire, Keys, Persist, RandomKey, Rename, Scan, Ttl, Type};
use lists::{LIndex, LInsert, LLen, LMove, LRange, LRem, LSet, LTrim, Pop, Push};
use pubsub::{PubSub, Publish};
use server::{CommandInfo, DbSize, Echo, Flush, Ping, Select, Time};
use sets::{
    SAdd, SCard, SIsMember, SMIsMember, SMembers, SMove, SPop, SRandMember, SRem, SScan,
    SetAlgebra,
};
use strings::{
    Append, BitCount, Get, GetBit, GetDel, GetEx, GetRange, GetSet, IncrBy, IncrByFloat, Lcs,
    MGet, MSet, Set, SetBit, SetEx, SetNx, SetRange, Strlen,
};
use zsets::{
    ZAdd, ZCard, ZCount, ZIncrBy, ZLexCount, ZMScore, ZPop, ZRange, ZRangeByLex, ZRangeByScore,
    ZRank, ZRem, ZRemRangeByLex, ZRemRangeByRank, ZRemRangeByScore, ZScan, ZScore, ZStore,
};

/// A parsed command that runs against the keyspace.
#[derive(Debug, PartialEq)]
pub enum Command {
    // Keys
    Del(Del),
    Exists(Exists),
    Expire(Expire),
    Keys(Keys),
    Persist(Persist),
    RandomKey(RandomKey),
    Rename(Rename),
    Scan(Scan),
    Ttl(Ttl),
    Type(Type),

    // Strings
    Append(Append),
    BitCount(BitCount),
    Get(Get),
    GetBit(GetBit),
    GetDel(GetDel),
    GetEx(GetEx),
    GetRange(GetRange),
    GetSet(GetSet),
    IncrBy(IncrBy),
    IncrByFloat(IncrByFloat),
    Lcs(Lcs),
    MGet(MGet),
    MSet(MSet),
    Set(Set),
    SetBit(SetBit),
    SetEx(SetEx),
    SetNx(SetNx),
    SetRange(SetRange),
    Strlen(Strlen),

    // Lists
    LIndex(LIndex),
    LInsert(LInsert),
    LLen(LLen),
    LMove(LMove),
    LRange(LRange),
    LRem(LRem),
    LSet(LSet),
    LTrim(LTrim),
    Pop(Pop),
    Push(Push),

    // Sets
    SAdd(SAdd),
    SCard(SCard),
    SIsMember(SIsMember),
    SMIsMember(SMIsMember),
    SMembers(SMembers),
    SMove(SMove),
    SPop(SPop),
    SRandMember(SRandMember),
    SRem(SRem),
    SScan(SScan),
    SetAlgebra(SetAlgebra),

    // Ordered sets
    ZAdd(ZAdd),
    ZCard(ZCard),
    ZCount(ZCount),
    ZIncrBy(ZIncrBy),
    ZLexCount(ZLexCount),
    ZMScore(ZMScore),
    ZPop(ZPop),
    ZRange(ZRange),
    ZRangeByLex(ZRangeByLex),
    ZRangeByScore(ZRangeByScore),
    ZRank(ZRank),
    ZRem(ZRem),
    ZRemRangeByLex(ZRemRangeByLex),
    ZRemRangeByRank(ZRemRangeByRank),
    ZRemRangeByScore(ZRemRangeByScore),
    ZScan(ZScan),
    ZScore(ZScore),
    ZStore(ZStore),

    // Hashes
    HDel(HDel),
    HExists(HExists),
    HGet(HGet),
    HGetAll(HGetAll),
    HIncrBy(HIncrBy),
    HIncrByFloat(HIncrByFloat),
    HKeys(HKeys),
    HLen(HLen),
    HMGet(HMGet),
    HScan(HScan),
    HSet(HSet),
    HSetNx(HSetNx),
    HStrlen(HStrlen),
    HVals(HVals),

    // Pub/Sub
    Publish(Publish),
    PubSub(PubSub),

    // Server
    CommandInfo(CommandInfo),
    DbSize(DbSize),
    Echo(Echo),
    Flush(Flush),
    Ping(Ping),
    Select(Select),
    Time(Time),
}

impl Executable for Command {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        match self {
            Command::Del(cmd) => cmd.exec(store),
            Command::Exists(cmd) => cmd.exec(store),
            Command::Expire(cmd) => cmd.exec(store),
            Command::Keys(cmd) => cmd.exec(store),
            Command::Persist(cmd) => cmd.exec(store),
            Command::RandomKey(cmd) => cmd.exec(store),
            Command::Rename(cmd) => cmd.exec(store),
            Command::Scan(cmd) => cmd.exec(store),
            Command::Ttl(cmd) => cmd.exec(store),
            Command::Type(cmd) => cmd.exec(store),

            Command::Append(cmd) => cmd.exec(store),
            Command::BitCount(cmd) => cmd.exec(store),
            Command::Get(cmd) => cmd.exec(store),
            Command::GetBit(cmd) => cmd.exec(store),
            Command::GetDel(cmd) => cmd.exec(store),
            Command::GetEx(cmd) => cmd.exec(store),
            Command::GetRange(cmd) => cmd.exec(store),
            Command::GetSet(cmd) => cmd.exec(store),
            Command::IncrBy(cmd) => cmd.exec(store),
            Command::IncrByFloat(cmd) => cmd.exec(store),
            Command::Lcs(cmd) => cmd.exec(store),
            Command::MGet(cmd) => cmd.exec(store),
            Command::MSet(cmd) => cmd.exec(store),
            Command::Set(cmd) => cmd.exec(store),
            Command::SetBit(cmd) => cmd.exec(store),
            Command::SetEx(cmd) => cmd.exec(store),
            Command::SetNx(cmd) => cmd.exec(store),
            Command::SetRange(cmd) => cmd.exec(store),
            Command::Strlen(cmd) => cmd.exec(store),

            Command::LIndex(cmd) => cmd.exec(store),
            Command::LInsert(cmd) => cmd.exec(store),
            Command::LLen(cmd) => cmd.exec(store),
            Command::LMove(cmd) => cmd.exec(store),
            Command::LRange(cmd) => cmd.exec(store),
            Command::LRem(cmd) => cmd.exec(store),
            Command::LSet(cmd) => cmd.exec(store),
            Command::LTrim(cmd) => cmd.exec(store),
            Command::Pop(cmd) => cmd.exec(store),
            Command::Push(cmd) => cmd.exec(store),

            Command::SAdd(cmd) => cmd.exec(store),
            Command::SCard(cmd) => cmd.exec(store),
            Command::SIsMember(cmd) => cmd.exec(store),
            Command::SMIsMember(cmd) => cmd.exec(store),
            Command::SMembers(cmd) => cmd.exec(store),
            Command::SMove(cmd) => cmd.exec(store),
            Command::SPop(cmd) => cmd.exec(store),
            Command::SRandMember(cmd) => cmd.exec(store),
            Command::SRem(cmd) => cmd.exec(store),
            Command::SScan(cmd) => cmd.exec(store),
            Command::SetAlgebra(cmd) => cmd.exec(store),

            Command::ZAdd(cmd) => cmd.exec(store),
            Command::ZCard(cmd) => cmd.exec(store),
            Command::ZCount(cmd) => cmd.exec(store),
            Command::ZIncrBy(cmd) => cmd.exec(store),
            Command::ZLexCount(cmd) => cmd.exec(store),
            Command::ZMScore(cmd) => cmd.exec(store),
            Command::ZPop(cmd) => cmd.exec(store),
            Command::ZRange(cmd) => cmd.exec(store),
            Command::ZRangeByLex(cmd) => cmd.exec(store),
            Command::ZRangeByScore(cmd) => cmd.exec(store),
            Command::ZRank(cmd) => cmd.exec(store),
            Command::ZRem(cmd) => cmd.exec(store),
            Command::ZRemRangeByLex(cmd) => cmd.exec(store),
            Command::ZRemRangeByRank(cmd) => cmd.exec(store),
            Command::ZRemRangeByScore(cmd) => cmd.exec(store),
            Command::ZScan(cmd) => cmd.exec(store),
            Command::ZScore(cmd) => cmd.exec(store),
            Command::ZStore(cmd) => cmd.exec(store),

            Command::HDel(cmd) => cmd.exec(store),
            Command::HExists(cmd) => cmd.exec(store),
            Command::HGet(cmd) => cmd.exec(store),
            Command::HGetAll(cmd) => cmd.exec(store),
            Command::HIncrBy(cmd) => cmd.exec(store),
            Command::HIncrByFloat(cmd) => cmd.exec(store),
            Command::HKeys(cmd) => cmd.exec(store),
            Command::HLen(cmd) => cmd.exec(store),
            Command::HMGet(cmd) => cmd.exec(store),
            Command::HScan(cmd) => cmd.exec(store),
            Command::HSet(cmd) => cmd.exec(store),
            Command::HSetNx(cmd) => cmd.exec(store),
            Command::HStrlen(cmd) => cmd.exec(store),
            Command::HVals(cmd) => cmd.exec(store),

            Command::Publish(cmd) => cmd.exec(store),
            Command::PubSub(cmd) => cmd.exec(store),

            Command::CommandInfo(cmd) => cmd.exec(store),
            Command::DbSize(cmd) => cmd.exec(store),
            Command::Echo(cmd) => cmd.exec(store),
            Command::Flush(cmd) => cmd.exec(store),
            Command::Ping(cmd) => cmd.exec(store),
            Command::Select(cmd) => cmd.exec(store),
            Command::Time(cmd) => cmd.exec(store),
        }
    }
}

impl TryFrom<Cmd> for Command {
    type Error = CommandError;

    fn try_from(cmd: Cmd) -> Result<Self, Self::Error> {
        let mut parser = CommandParser::new(cmd);
        let command_name = parser.name().to_string();

        let command = match &command_name[..] {
            "del" | "unlink" => Del::try_from(&mut parser).map(Command::Del),
            "exists" => Exists::try_from(&mut parser).map(Command::Exists),
            "expire" | "pexpire" | "expireat" | "pexpireat" => {
                Expire::try_from(&mut parser).map(Command::Expire)
            }
            "keys" => Keys::try_from(&mut parser).map(Command::Keys),
            "persist" => Persist::try_from(&mut parser).map(Command::Persist),
            "randomkey" => RandomKey::try_from(&mut parser).map(Command::RandomKey),
            "rename" | "renamenx" => Rename::try_from(&mut parser).map(Command::Rename),
            "scan" => Scan::try_from(&mut parser).map(Command::Scan),
            "ttl" | "pttl" => Ttl::try_from(&mut parser).map(Command::Ttl),
            "type" => Type::try_from(&mut parser).map(Command::Type),

            "append" => Append::try_from(&mut parser).map(Command::Append),
            "bitcount" => BitCount::try_from(&mut parser).map(Command::BitCount),
            "get" => Get::try_from(&mut parser).map(Command::Get),
            "getbit" => GetBit::try_from(&mut parser).map(Command::GetBit),
            "getdel" => GetDel::try_from(&mut parser).map(Command::GetDel),
            "getex" => GetEx::try_from(&mut parser).map(Command::GetEx),
            "getrange" => GetRange::try_from(&mut parser).map(Command::GetRange),
            "getset" => GetSet::try_from(&mut parser).map(Command::GetSet),
            "incr" | "decr" | "incrby" | "decrby" => IncrBy::try_from(&mut parser).map(Command::IncrBy),
            "incrbyfloat" => IncrByFloat::try_from(&mut parser).map(Command::IncrByFloat),
            "lcs" => Lcs::try_from(&mut parser).map(Command::Lcs),
            "mget" => MGet::try_from(&mut parser).map(Command::MGet),
            "mset" | "msetnx" => MSet::try_from(&mut parser).map(Command::MSet),
            "set" => Set::try_from(&mut parser).map(Command::Set),
            "setbit" => SetBit::try_from(&mut parser).map(Command::SetBit),
            "setex" | "psetex" => SetEx::try_from(&mut parser).map(Command::SetEx),
            "setnx" => SetNx::try_from(&mut parser).map(Command::SetNx),
            "setrange" => SetRange::try_from(&mut parser).map(Command::SetRange),
            "strlen" => Strlen::try_from(&mut parser).map(Command::Strlen),

            "lindex" => LIndex::try_from(&mut parser).map(Command::LIndex),
            "linsert" => LInsert::try_from(&mut parser).map(Command::LInsert),
            "llen" => LLen::try_from(&mut parser).map(Command::LLen),
            "lmove" | "rpoplpush" => LMove::try_from(&mut parser).map(Command::LMove),
            "lpop" | "rpop" => Pop::try_from(&mut parser).map(Command::Pop),
            "lpush" | "rpush" | "lpushx" | "rpushx" => Push::try_from(&mut parser).map(Command::Push),
            "lrange" => LRange::try_from(&mut parser).map(Command::LRange),
            "lrem" => LRem::try_from(&mut parser).map(Command::LRem),
            "lset" => LSet::try_from(&mut parser).map(Command::LSet),
            "ltrim" => LTrim::try_from(&mut parser).map(Command::LTrim),

            "sadd" => SAdd::try_from(&mut parser).map(Command::SAdd),
            "scard" => SCard::try_from(&mut parser).map(Command::SCard),
            "sdiff" | "sinter" | "sunion" | "sdiffstore" | "sinterstore" | "sunionstore" => {
                SetAlgebra::try_from(&mut parser).map(Command::SetAlgebra)
            }
            "sismember" => SIsMember::try_from(&mut parser).map(Command::SIsMember),
            "smembers" => SMembers::try_from(&mut parser).map(Command::SMembers),
            "smismember" => SMIsMember::try_from(&mut parser).map(Command::SMIsMember),
            "smove" => SMove::try_from(&mut parser).map(Command::SMove),
            "spop" => SPop::try_from(&mut parser).map(Command::SPop),
            "srandmember" => SRandMember::try_from(&mut parser).map(Command::SRandMember),
            "srem" => SRem::try_from(&mut parser).map(Command::SRem),
            "sscan" => SScan::try_from(&mut parser).map(Command::SScan),

            "zadd" => ZAdd::try_from(&mut parser).map(Command::ZAdd),
            "zcard" => ZCard::try_from(&mut parser).map(Command::ZCard),
            "zcount" => ZCount::try_from(&mut parser).map(Command::ZCount),
            "zincrby" => ZIncrBy::try_from(&mut parser).map(Command::ZIncrBy),
            "zinterstore" | "zunionstore" => ZStore::try_from(&mut parser).map(Command::ZStore),
            "zlexcount" => ZLexCount::try_from(&mut parser).map(Command::ZLexCount),
            "zmscore" => ZMScore::try_from(&mut parser).map(Command::ZMScore),
            "zpopmin" | "zpopmax" => ZPop::try_from(&mut parser).map(Command::ZPop),
            "zrange" | "zrevrange" => ZRange::try_from(&mut parser).map(Command::ZRange),
            "zrangebylex" | "zrevrangebylex" => {
                ZRangeByLex::try_from(&mut parser).map(Command::ZRangeByLex)
            }
            "zrangebyscore" | "zrevrangebyscore" => {
                ZRangeByScore::try_from(&mut parser).map(Command::ZRangeByScore)
            }
            "zrank" | "zrevrank" => ZRank::try_from(&mut parser).map(Command::ZRank),
            "zrem" => ZRem::try_from(&mut parser).map(Command::ZRem),
            "zremrangebylex" => ZRemRangeByLex::try_from(&mut parser).map(Command::ZRemRangeByLex),
            "zremrangebyrank" => ZRemRangeByRank::try_from(&mut parser).map(Command::ZRemRangeByRank),
            "zremrangebyscore" => {
                ZRemRangeByScore::try_from(&mut parser).map(Command::ZRemRangeByScore)
            }
            "zscan" => ZScan::try_from(&mut parser).map(Command::ZScan),
            "zscore" => ZScore::try_from(&mut parser).map(Command::ZScore),

            "hdel" => HDel::try_from(&mut parser).map(Command::HDel),
            "hexists" => HExists::try_from(&mut parser).map(Command::HExists),
            "hget" => HGet::try_from(&mut parser).map(Command::HGet),
            "hgetall" => HGetAll::try_from(&mut parser).map(Command::HGetAll),
            "hincrby" => HIncrBy::try_from(&mut parser).map(Command::HIncrBy),
            "hincrbyfloat" => HIncrByFloat::try_from(&mut parser).map(Command::HIncrByFloat),
            "hkeys" => HKeys::try_from(&mut parser).map(Command::HKeys),
            "hlen" => HLen::try_from(&mut parser).map(Command::HLen),
            "hmget" => HMGet::try_from(&mut parser).map(Command::HMGet),
            "hscan" => HScan::try_from(&mut parser).map(Command::HScan),
            "hset" | "hmset" => HSet::try_from(&mut parser).map(Command::HSet),
            "hsetnx" => HSetNx::try_from(&mut parser).map(Command::HSetNx),
            "hstrlen" => HStrlen::try_from(&mut parser).map(Command::HStrlen),
            "hvals" => HVals::try_from(&mut parser).map(Command::HVals),

            "publish" => Publish::try_from(&mut parser).map(Command::Publish),
            "pubsub" => PubSub::try_from(&mut parser).map(Command::PubSub),

            "command" => CommandInfo::try_from(&mut parser).map(Command::CommandInfo),
            "dbsize" => DbSize::try_from(&mut parser).map(Command::DbSize),
            "echo" => Echo::try_from(&mut parser).map(Command::Echo),
            "flushdb" | "flushall" => Flush::try_from(&mut parser).map(Command::Flush),
            "ping" => Ping::try_from(&mut parser).map(Command::Ping),
            "select" => Select::try_from(&mut parser).map(Command::Select),
            "time" => Time::try_from(&mut parser).map(Command::Time),

            _ => Err(CommandError::UnknownCommand {
                command: command_name.clone(),
            }),
        };

        command
            .and_then(|command| parser.finish().map(|_| command))
            .map_err(|err| match err {
                CommandError::EndOfStream => CommandError::WrongArity {
                    command: command_name,
                },
                err => err,
            })
    }
}

pub struct CommandParser {
    name: String,
    parts: vec::IntoIter<Bytes>,
}

impl CommandParser {
    pub fn new(cmd: Cmd) -> CommandParser {
        let name = cmd.name();
        let mut parts = cmd.into_parts().into_iter();
        parts.next();

        CommandParser { name, parts }
    }

    /// Lowercased name of the command being parsed.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_more(&self) -> bool {
        self.parts.len() > 0
    }

    /// Number of arguments not consumed yet.
    pub fn remaining(&self) -> usize {
        self.parts.len()
    }

    /// Fails with a syntax error if there are arguments left.
    pub fn finish(&self) -> Result<(), CommandError> {
        if self.has_more() {
            Err(syntax())
        } else {
            Ok(())
        }
    }

    pub fn next_bytes(&mut self) -> Result<Bytes, CommandError> {
        self.parts.next().ok_or(CommandError::EndOfStream)
    }

    pub fn next_string(&mut self) -> Result<String, CommandError> {
        let bytes = self.next_bytes()?;
        Ok(str::from_utf8(&bytes[..])?.to_string())
    }

    pub fn next_integer(&mut self) -> Result<i64, CommandError> {
        let bytes = self.next_bytes()?;
        parse_integer(&bytes)
    }

    /// A non negative integer, such as a `COUNT`.
    pub fn next_count(&mut self) -> Result<usize, CommandError> {
        let count = self.next_integer()?;
        usize::try_from(count).map_err(|_| {
            CommandError::InvalidArgument("value is out of range, must be positive".to_string())
        })
    }

    pub fn next_float(&mut self) -> Result<f64, CommandError> {
        let bytes = self.next_bytes()?;
        parse_float(&bytes)
    }

    /// Parses the next argument with `T`'s `FromStr` implementation.
    pub fn next_parsed<T>(&mut self) -> Result<T, CommandError>
    where
        T: FromStr<Err = CommandError>,
    {
        self.next_string()?.parse()
    }

    /// The next argument uppercased, or `None` once every argument was consumed. Used to read
    /// options such as `NX` or `WITHSCORES`.
    pub fn next_keyword(&mut self) -> Result<Option<String>, CommandError> {
        if !self.has_more() {
            return Ok(None);
        }
        self.next_string().map(|s| Some(s.to_uppercase()))
    }

    pub fn remaining_strings(&mut self) -> Result<Vec<String>, CommandError> {
        let mut values = vec![];
        while self.has_more() {
            values.push(self.next_string()?);
        }
        Ok(values)
    }

    pub fn remaining_bytes(&mut self) -> Vec<Bytes> {
        self.parts.by_ref().collect()
    }

    /// Reads the remaining arguments as `(field, value)` pairs. An odd count is an arity error.
    pub fn remaining_pairs(&mut self) -> Result<Vec<(String, Bytes)>, CommandError> {
        let mut pairs = vec![];
        while self.has_more() {
            let field = self.next_string()?;
            let value = self.next_bytes()?;
            pairs.push((field, value));
        }
        Ok(pairs)
    }
}

pub fn parse_integer(bytes: &[u8]) -> Result<i64, CommandError> {
    str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(not_integer)
}

pub fn parse_float(bytes: &[u8]) -> Result<f64, CommandError> {
    str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|f| !f.is_nan())
        .ok_or_else(not_float)
}

/// Cursor, `MATCH`, `COUNT` and (for `SCAN` only) `TYPE` options of the scanning commands.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanOptions {
    pub cursor: usize,
    pub pattern: Option<Pattern>,
    pub count: Option<usize>,
    pub value_type: Option<ValueType>,
}

impl ScanOptions {
    fn parse(parser: &mut CommandParser, with_type: bool) -> Result<Self, CommandError> {
        let cursor = parser
            .next_string()?
            .parse::<usize>()
            .map_err(|_| CommandError::InvalidArgument("invalid cursor".to_string()))?;

        let mut options = ScanOptions {
            cursor,
            ..Default::default()
        };

        while let Some(option) = parser.next_keyword()? {
            match option.as_str() {
                "MATCH" => options.pattern = Some(Pattern::new(&parser.next_string()?)),
                "COUNT" => {
                    let count = parser.next_count()?;
                    if count == 0 {
                        return Err(syntax());
                    }
                    options.count = Some(count);
                }
                "TYPE" if with_type => {
                    options.value_type = Some(
                        parser
                            .next_string()?
                            .parse::<ValueType>()
                            .map_err(|_| CommandError::InvalidArgument("unknown type name".to_string()))?,
                    );
                }
                _ => return Err(syntax()),
            }
        }

        Ok(options)
    }

    fn matches(&self, item: &str) -> bool {
        self.pattern
            .as_ref()
            .map_or(true, |pattern| pattern.matches(item))
    }
}

/// Kind of a [`CommandError`], for callers that only care about the category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum ErrorKind {
    WrongType,
    NoSuchKey,
    InvalidArgument,
    NotSupported,
    AuthFailure,
}

#[derive(Debug, Clone, ThisError, PartialEq)]
pub enum CommandError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("ERR no such key")]
    NoSuchKey,
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongArity { command: String },
    #[error("ERR unknown command '{command}'")]
    UnknownCommand { command: String },
    #[error("ERR {0}")]
    InvalidArgument(String),
    #[error("ERR min or max not valid string range item")]
    InvalidRangeItem,
    #[error("ERR invalid UTF-8 string")]
    InvalidUtf8String(#[from] str::Utf8Error),
    #[error("EXECABORT Transaction discarded because of previous errors.")]
    ExecAbort,
    #[error("ERR '{command}' is not supported")]
    NotSupported { command: String },
    #[error("{0}")]
    AuthFailure(String),
    #[error("ERR unexpected end of arguments")]
    EndOfStream,
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::WrongType => ErrorKind::WrongType,
            CommandError::NoSuchKey => ErrorKind::NoSuchKey,
            CommandError::NotSupported { .. } => ErrorKind::NotSupported,
            CommandError::AuthFailure(_) => ErrorKind::AuthFailure,
            CommandError::WrongArity { .. }
            | CommandError::UnknownCommand { .. }
            | CommandError::InvalidArgument(_)
            | CommandError::InvalidRangeItem
            | CommandError::InvalidUtf8String(_)
            | CommandError::ExecAbort
            | CommandError::EndOfStream => ErrorKind::InvalidArgument,
        }
    }
}

/// Parses and runs `cmd` against `store`, skipping the client layer.
#[cfg(test)]
pub(crate) fn run(store: &crate::store::Store, cmd: impl Into<Cmd>) -> Result<Frame, Error> {
    let command = Command::try_from(cmd.into())?;
    command.exec(&mut store.lock())
}

pub fn not_integer() -> CommandError {
    CommandError::InvalidArgument("value is not an integer or out of range".to_string())
}

pub fn not_float() -> CommandError {
    CommandError::InvalidArgument("value is not a valid float".to_string())
}

pub fn syntax() -> CommandError {
    CommandError::InvalidArgument("syntax error".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::cmd;

    #[test]
    fn parse_get_command() {
        let get_command = Command::try_from(cmd("GET").arg("foo")).unwrap();

        assert_eq!(
            get_command,
            Command::Get(Get {
                key: String::from("foo")
            })
        );
    }

    #[test]
    fn command_names_are_case_insensitive() {
        assert_eq!(
            Command::try_from(cmd("gEt").arg("foo")).unwrap(),
            Command::try_from(cmd("GET").arg("foo")).unwrap(),
        );
    }

    #[test]
    fn unknown_command() {
        let err = Command::try_from(cmd("NOPE")).unwrap_err();
        assert_eq!(
            err,
            CommandError::UnknownCommand {
                command: "nope".to_string()
            }
        );
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn odd_pairs_are_an_arity_error() {
        let err = Command::try_from(cmd("MSET").arg("a").arg("1").arg("b")).unwrap_err();
        assert_eq!(err.to_string(), "ERR wrong number of arguments for 'mset' command");
    }

    #[test]
    fn trailing_arguments_are_a_syntax_error() {
        let err = Command::try_from(cmd("GET").arg("foo").arg("bar")).unwrap_err();
        assert_eq!(err, syntax());
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_integer(b"-42"), Ok(-42));
        assert_eq!(parse_integer(b"4.2"), Err(not_integer()));
        assert_eq!(parse_integer(b"99999999999999999999"), Err(not_integer()));
        assert_eq!(parse_float(b"1.5"), Ok(1.5));
        assert_eq!(parse_float(b"-inf"), Ok(f64::NEG_INFINITY));
        assert_eq!(parse_float(b"nan"), Err(not_float()));
        assert_eq!(parse_float(b"abc"), Err(not_float()));
    }

    #[test]
    fn scan_options() {
        let parser = &mut CommandParser::new(
            cmd("SCAN").arg(0).arg("MATCH").arg("user:*").arg("count").arg(5).arg("TYPE").arg("hash"),
        );
        let options = ScanOptions::parse(parser, true).unwrap();

        assert_eq!(options.cursor, 0);
        assert_eq!(options.count, Some(5));
        assert_eq!(options.value_type, Some(ValueType::Hash));
        assert!(options.matches("user:1"));
        assert!(!options.matches("session:1"));

        let parser = &mut CommandParser::new(cmd("HSCAN").arg("h").arg(0).arg("TYPE").arg("hash"));
        parser.next_string().unwrap();
        assert_eq!(ScanOptions::parse(parser, false), Err(syntax()));

        let parser = &mut CommandParser::new(cmd("SCAN").arg("abc"));
        assert!(ScanOptions::parse(parser, true).is_err());
    }

    #[test]
    fn error_kinds() {
        assert_eq!(CommandError::WrongType.kind(), ErrorKind::WrongType);
        assert_eq!(CommandError::NoSuchKey.kind(), ErrorKind::NoSuchKey);
        assert_eq!(ErrorKind::NotSupported.to_string(), "NotSupported");
        assert_eq!(
            CommandError::WrongArity {
                command: "get".to_string()
            }
            .to_string(),
            "ERR wrong number of arguments for 'get' command"
        );
    }
}
