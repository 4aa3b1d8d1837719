//! Command descriptors: arity, write flag and key positions of every known command.
//!
//! Arity follows the store's convention: it counts the command name, a positive arity is exact
//! and a negative one is a minimum. Key positions are `first`, `last` (negative counts from the
//! end) and `step`, and name the keys a successful write modifies.

use bytes::Bytes;
use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::frame::Frame;

/// Where a command is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Runs against the locked keyspace.
    Store,
    /// Changes connection state: subscriptions, watches, transactions and authentication.
    Client,
    /// Known but intentionally not emulated.
    NotSupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub name: &'static str,
    pub arity: i32,
    pub write: bool,
    pub first_key: i32,
    pub last_key: i32,
    pub step: usize,
    pub scope: Scope,
}

impl Descriptor {
    const fn store(name: &'static str, arity: i32, write: bool, keys: (i32, i32, usize)) -> Self {
        Self {
            name,
            arity,
            write,
            first_key: keys.0,
            last_key: keys.1,
            step: keys.2,
            scope: Scope::Store,
        }
    }

    const fn client(name: &'static str, arity: i32) -> Self {
        Self {
            name,
            arity,
            write: false,
            first_key: 0,
            last_key: 0,
            step: 0,
            scope: Scope::Client,
        }
    }

    const fn unsupported(name: &'static str) -> Self {
        Self {
            name,
            arity: -1,
            write: false,
            first_key: 0,
            last_key: 0,
            step: 0,
            scope: Scope::NotSupported,
        }
    }

    /// Whether a call made of `parts` parts (the name included) has a valid arity.
    pub fn accepts(&self, parts: usize) -> bool {
        let parts = parts as i32;
        if self.arity >= 0 {
            parts == self.arity
        } else {
            parts >= -self.arity
        }
    }

    /// Whether `reply` shows that a write left every key as it was, such as `SADD` of members
    /// that were all present or `SMOVE` of a member missing from the source.
    pub fn unchanged_by(&self, reply: &Frame) -> bool {
        match self.name {
            "del" | "unlink" | "renamenx" | "persist" | "setnx" | "msetnx" | "lrem" | "sadd"
            | "srem" | "smove" | "zrem" | "hsetnx" | "hdel" => *reply == Frame::Integer(0),
            "lmove" | "rpoplpush" => *reply == Frame::Null,
            _ => false,
        }
    }

    /// Keys named by the descriptor in the call's `parts`.
    pub fn keys(&self, parts: &[Bytes]) -> Vec<String> {
        if self.first_key == 0 || self.step == 0 {
            return vec![];
        }

        let last = if self.last_key < 0 {
            parts.len() as i32 + self.last_key
        } else {
            self.last_key
        };

        (self.first_key..=last)
            .step_by(self.step)
            .filter_map(|position| parts.get(position as usize))
            .map(|key| String::from_utf8_lossy(key).into_owned())
            .collect()
    }
}

const NONE: (i32, i32, usize) = (0, 0, 0);
const FIRST: (i32, i32, usize) = (1, 1, 1);
const FIRST_TWO: (i32, i32, usize) = (1, 2, 1);
const ALL: (i32, i32, usize) = (1, -1, 1);
const PAIRS: (i32, i32, usize) = (1, -1, 2);

const R: bool = false;
const W: bool = true;

pub const COMMANDS: &[Descriptor] = &[
    // Keys
    Descriptor::store("del", -2, W, ALL),
    Descriptor::store("unlink", -2, W, ALL),
    Descriptor::store("exists", -2, R, ALL),
    Descriptor::store("type", 2, R, FIRST),
    Descriptor::store("rename", 3, W, FIRST_TWO),
    Descriptor::store("renamenx", 3, W, FIRST_TWO),
    Descriptor::store("randomkey", 1, R, NONE),
    Descriptor::store("keys", 2, R, NONE),
    Descriptor::store("scan", -2, R, NONE),
    Descriptor::store("expire", 3, W, FIRST),
    Descriptor::store("pexpire", 3, W, FIRST),
    Descriptor::store("expireat", 3, W, FIRST),
    Descriptor::store("pexpireat", 3, W, FIRST),
    Descriptor::store("ttl", 2, R, FIRST),
    Descriptor::store("pttl", 2, R, FIRST),
    Descriptor::store("persist", 2, W, FIRST),
    // Strings
    Descriptor::store("get", 2, R, FIRST),
    Descriptor::store("set", -3, W, FIRST),
    Descriptor::store("setnx", 3, W, FIRST),
    Descriptor::store("setex", 4, W, FIRST),
    Descriptor::store("psetex", 4, W, FIRST),
    Descriptor::store("getset", 3, W, FIRST),
    Descriptor::store("getdel", 2, W, FIRST),
    Descriptor::store("getex", -2, W, FIRST),
    Descriptor::store("mget", -2, R, ALL),
    Descriptor::store("mset", -3, W, PAIRS),
    Descriptor::store("msetnx", -3, W, PAIRS),
    Descriptor::store("append", 3, W, FIRST),
    Descriptor::store("strlen", 2, R, FIRST),
    Descriptor::store("incr", 2, W, FIRST),
    Descriptor::store("decr", 2, W, FIRST),
    Descriptor::store("incrby", 3, W, FIRST),
    Descriptor::store("decrby", 3, W, FIRST),
    Descriptor::store("incrbyfloat", 3, W, FIRST),
    Descriptor::store("getrange", 4, R, FIRST),
    Descriptor::store("setrange", 4, W, FIRST),
    Descriptor::store("getbit", 3, R, FIRST),
    Descriptor::store("setbit", 4, W, FIRST),
    Descriptor::store("bitcount", -2, R, FIRST),
    Descriptor::store("lcs", -3, R, FIRST_TWO),
    // Lists
    Descriptor::store("lpush", -3, W, FIRST),
    Descriptor::store("rpush", -3, W, FIRST),
    Descriptor::store("lpushx", -3, W, FIRST),
    Descriptor::store("rpushx", -3, W, FIRST),
    Descriptor::store("lpop", -2, W, FIRST),
    Descriptor::store("rpop", -2, W, FIRST),
    Descriptor::store("llen", 2, R, FIRST),
    Descriptor::store("lrange", 4, R, FIRST),
    Descriptor::store("lindex", 3, R, FIRST),
    Descriptor::store("lset", 4, W, FIRST),
    Descriptor::store("ltrim", 4, W, FIRST),
    Descriptor::store("lrem", 4, W, FIRST),
    Descriptor::store("linsert", 5, W, FIRST),
    Descriptor::store("rpoplpush", 3, W, FIRST_TWO),
    Descriptor::store("lmove", 5, W, FIRST_TWO),
    // Sets
    Descriptor::store("sadd", -3, W, FIRST),
    Descriptor::store("srem", -3, W, FIRST),
    Descriptor::store("smembers", 2, R, FIRST),
    Descriptor::store("sismember", 3, R, FIRST),
    Descriptor::store("smismember", -3, R, FIRST),
    Descriptor::store("scard", 2, R, FIRST),
    Descriptor::store("spop", -2, W, FIRST),
    Descriptor::store("srandmember", -2, R, FIRST),
    Descriptor::store("smove", 4, W, FIRST_TWO),
    Descriptor::store("sdiff", -2, R, ALL),
    Descriptor::store("sinter", -2, R, ALL),
    Descriptor::store("sunion", -2, R, ALL),
    Descriptor::store("sdiffstore", -3, W, FIRST),
    Descriptor::store("sinterstore", -3, W, FIRST),
    Descriptor::store("sunionstore", -3, W, FIRST),
    Descriptor::store("sscan", -3, R, FIRST),
    // Ordered sets
    Descriptor::store("zadd", -4, W, FIRST),
    Descriptor::store("zcard", 2, R, FIRST),
    Descriptor::store("zcount", 4, R, FIRST),
    Descriptor::store("zlexcount", 4, R, FIRST),
    Descriptor::store("zincrby", 4, W, FIRST),
    Descriptor::store("zscore", 3, R, FIRST),
    Descriptor::store("zmscore", -3, R, FIRST),
    Descriptor::store("zrank", 3, R, FIRST),
    Descriptor::store("zrevrank", 3, R, FIRST),
    Descriptor::store("zrange", -4, R, FIRST),
    Descriptor::store("zrevrange", -4, R, FIRST),
    Descriptor::store("zrangebyscore", -4, R, FIRST),
    Descriptor::store("zrevrangebyscore", -4, R, FIRST),
    Descriptor::store("zrangebylex", -4, R, FIRST),
    Descriptor::store("zrevrangebylex", -4, R, FIRST),
    Descriptor::store("zrem", -3, W, FIRST),
    Descriptor::store("zremrangebyrank", 4, W, FIRST),
    Descriptor::store("zremrangebyscore", 4, W, FIRST),
    Descriptor::store("zremrangebylex", 4, W, FIRST),
    Descriptor::store("zpopmin", -2, W, FIRST),
    Descriptor::store("zpopmax", -2, W, FIRST),
    Descriptor::store("zunionstore", -4, W, FIRST),
    Descriptor::store("zinterstore", -4, W, FIRST),
    Descriptor::store("zscan", -3, R, FIRST),
    // Hashes
    Descriptor::store("hset", -4, W, FIRST),
    Descriptor::store("hmset", -4, W, FIRST),
    Descriptor::store("hsetnx", 4, W, FIRST),
    Descriptor::store("hget", 3, R, FIRST),
    Descriptor::store("hmget", -3, R, FIRST),
    Descriptor::store("hgetall", 2, R, FIRST),
    Descriptor::store("hdel", -3, W, FIRST),
    Descriptor::store("hexists", 3, R, FIRST),
    Descriptor::store("hlen", 2, R, FIRST),
    Descriptor::store("hkeys", 2, R, FIRST),
    Descriptor::store("hvals", 2, R, FIRST),
    Descriptor::store("hstrlen", 3, R, FIRST),
    Descriptor::store("hincrby", 4, W, FIRST),
    Descriptor::store("hincrbyfloat", 4, W, FIRST),
    Descriptor::store("hscan", -3, R, FIRST),
    // Pub/Sub
    Descriptor::store("publish", 3, R, NONE),
    Descriptor::store("pubsub", -2, R, NONE),
    Descriptor::client("subscribe", -2),
    Descriptor::client("psubscribe", -2),
    Descriptor::client("unsubscribe", -1),
    Descriptor::client("punsubscribe", -1),
    // Transactions
    Descriptor::client("watch", -2),
    Descriptor::client("unwatch", 1),
    Descriptor::client("multi", 1),
    Descriptor::client("exec", 1),
    Descriptor::client("discard", 1),
    // Server
    Descriptor::client("auth", -2),
    Descriptor::store("ping", -1, R, NONE),
    Descriptor::store("echo", 2, R, NONE),
    Descriptor::store("dbsize", 1, R, NONE),
    Descriptor::store("time", 1, R, NONE),
    Descriptor::store("flushdb", -1, W, NONE),
    Descriptor::store("flushall", -1, W, NONE),
    Descriptor::store("select", 2, R, NONE),
    Descriptor::store("command", -1, R, NONE),
    // Known commands outside of what is emulated.
    Descriptor::unsupported("eval"),
    Descriptor::unsupported("evalsha"),
    Descriptor::unsupported("script"),
    Descriptor::unsupported("function"),
    Descriptor::unsupported("cluster"),
    Descriptor::unsupported("sort"),
    Descriptor::unsupported("dump"),
    Descriptor::unsupported("restore"),
    Descriptor::unsupported("migrate"),
    Descriptor::unsupported("move"),
    Descriptor::unsupported("object"),
    Descriptor::unsupported("config"),
    Descriptor::unsupported("debug"),
    Descriptor::unsupported("monitor"),
    Descriptor::unsupported("slaveof"),
    Descriptor::unsupported("replicaof"),
    Descriptor::unsupported("save"),
    Descriptor::unsupported("bgsave"),
    Descriptor::unsupported("bgrewriteaof"),
    Descriptor::unsupported("lastsave"),
    Descriptor::unsupported("shutdown"),
    Descriptor::unsupported("sync"),
    Descriptor::unsupported("wait"),
    Descriptor::unsupported("slowlog"),
    Descriptor::unsupported("client"),
    Descriptor::unsupported("info"),
    Descriptor::unsupported("blpop"),
    Descriptor::unsupported("brpop"),
    Descriptor::unsupported("brpoplpush"),
    Descriptor::unsupported("blmove"),
    Descriptor::unsupported("bzpopmin"),
    Descriptor::unsupported("bzpopmax"),
];

lazy_static! {
    static ref BY_NAME: HashMap<&'static str, &'static Descriptor> =
        COMMANDS.iter().map(|descriptor| (descriptor.name, descriptor)).collect();
}

/// Descriptor of the command named `name` (lowercase).
pub fn lookup(name: &str) -> Option<&'static Descriptor> {
    BY_NAME.get(name).copied()
}

/// Number of commands that can be run.
pub fn supported_count() -> usize {
    COMMANDS
        .iter()
        .filter(|descriptor| descriptor.scope != Scope::NotSupported)
        .count()
}
