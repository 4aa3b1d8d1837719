use bytes::Bytes;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::commands::executable::Executable;
use crate::commands::{syntax, table, CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::InnerStoreLocked;
use crate::Error;

/// Returns `PONG` if no argument is provided, otherwise a copy of the argument as a bulk.
///
/// Ref: <https://redis.io/docs/latest/commands/ping/>
#[derive(Debug, PartialEq)]
pub struct Ping {
    pub message: Option<Bytes>,
}

impl Executable for Ping {
    fn exec(self, _store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let frame = match self.message {
            Some(message) => Frame::Bulk(message),
            None => Frame::Simple("PONG".to_string()),
        };

        Ok(frame)
    }
}

impl TryFrom<&mut CommandParser> for Ping {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let message = if parser.has_more() {
            Some(parser.next_bytes()?)
        } else {
            None
        };

        Ok(Self { message })
    }
}

/// Ref: <https://redis.io/docs/latest/commands/echo/>
#[derive(Debug, PartialEq)]
pub struct Echo {
    pub message: Bytes,
}

impl Executable for Echo {
    fn exec(self, _store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        Ok(Frame::Bulk(self.message))
    }
}

impl TryFrom<&mut CommandParser> for Echo {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let message = parser.next_bytes()?;
        Ok(Self { message })
    }
}

/// Return the number of keys in the currently-selected database.
///
/// Ref: <https://redis.io/docs/latest/commands/dbsize/>
#[derive(Debug, PartialEq)]
pub struct DbSize;

impl Executable for DbSize {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        Ok(Frame::from(store.size()))
    }
}

impl TryFrom<&mut CommandParser> for DbSize {
    type Error = CommandError;

    fn try_from(_parser: &mut CommandParser) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}

/// Unix time as a two element array: seconds and the microseconds elapsed in the current second.
///
/// Ref: <https://redis.io/docs/latest/commands/time/>
#[derive(Debug, PartialEq)]
pub struct Time;

impl Executable for Time {
    fn exec(self, _store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?;

        Ok(Frame::Array(vec![
            Frame::from(now.as_secs().to_string()),
            Frame::from(now.subsec_micros().to_string()),
        ]))
    }
}

impl TryFrom<&mut CommandParser> for Time {
    type Error = CommandError;

    fn try_from(_parser: &mut CommandParser) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}

/// `FLUSHDB` and `FLUSHALL`. There is a single database, so both drop every key. The `ASYNC` and
/// `SYNC` modifiers are accepted and behave the same.
///
/// Ref: <https://redis.io/docs/latest/commands/flushdb/>
#[derive(Debug, PartialEq)]
pub struct Flush;

impl Executable for Flush {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        store.flush();
        Ok(Frame::ok())
    }
}

impl TryFrom<&mut CommandParser> for Flush {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        match parser.next_keyword()?.as_deref() {
            None | Some("ASYNC") | Some("SYNC") => Ok(Self),
            Some(_) => Err(syntax()),
        }
    }
}

/// Only database `0` exists.
///
/// Ref: <https://redis.io/docs/latest/commands/select/>
#[derive(Debug, PartialEq)]
pub struct Select {
    pub index: i64,
}

impl Executable for Select {
    fn exec(self, _store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        if self.index != 0 {
            return Err(CommandError::InvalidArgument("DB index is out of range".to_string()).into());
        }
        Ok(Frame::ok())
    }
}

impl TryFrom<&mut CommandParser> for Select {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let index = parser.next_integer()?;
        Ok(Self { index })
    }
}

/// `COMMAND COUNT` replies the number of supported commands. Other subcommands are not
/// supported.
///
/// Ref: <https://redis.io/docs/latest/commands/command-count/>
#[derive(Debug, PartialEq)]
pub struct CommandInfo;

impl Executable for CommandInfo {
    fn exec(self, _store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        Ok(Frame::from(table::supported_count()))
    }
}

impl TryFrom<&mut CommandParser> for CommandInfo {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        match parser.next_keyword()?.as_deref() {
            Some("COUNT") => Ok(Self),
            Some(other) => Err(CommandError::NotSupported {
                command: format!("command {}", other.to_lowercase()),
            }),
            None => Err(CommandError::NotSupported {
                command: "command".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::run;
    use crate::store::Store;

    #[tokio::test]
    async fn ping_and_echo() {
        let store = Store::new();

        assert_eq!(run(&store, ["PING"]).unwrap(), Frame::Simple("PONG".to_string()));
        assert_eq!(run(&store, ["PING", "hi"]).unwrap(), Frame::from("hi"));
        assert_eq!(run(&store, ["ECHO", "hello"]).unwrap(), Frame::from("hello"));
    }

    #[tokio::test]
    async fn dbsize_and_flush() {
        let store = Store::new();
        run(&store, ["SET", "a", "1"]).unwrap();
        run(&store, ["SADD", "b", "x"]).unwrap();

        assert_eq!(run(&store, ["DBSIZE"]).unwrap(), Frame::Integer(2));
        assert_eq!(run(&store, ["FLUSHALL", "ASYNC"]).unwrap(), Frame::ok());
        assert_eq!(run(&store, ["DBSIZE"]).unwrap(), Frame::Integer(0));

        let err = run(&store, ["FLUSHDB", "LATER"]).unwrap_err();
        assert_eq!(err.to_string(), "ERR syntax error");
    }

    #[tokio::test]
    async fn time() {
        let store = Store::new();
        let reply = run(&store, ["TIME"]).unwrap().into_array().unwrap();

        assert_eq!(reply.len(), 2);
        let secs: u64 = std::str::from_utf8(reply[0].as_bytes().unwrap())
            .unwrap()
            .parse()
            .unwrap();
        assert!(secs > 1_600_000_000);
    }

    #[tokio::test]
    async fn select() {
        let store = Store::new();

        assert_eq!(run(&store, ["SELECT", "0"]).unwrap(), Frame::ok());
        let err = run(&store, ["SELECT", "1"]).unwrap_err();
        assert_eq!(err.to_string(), "ERR DB index is out of range");
    }

    #[tokio::test]
    async fn command_count() {
        let store = Store::new();

        assert_eq!(
            run(&store, ["COMMAND", "COUNT"]).unwrap(),
            Frame::from(table::supported_count())
        );
        let err = run(&store, ["COMMAND", "DOCS"]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommandError>().map(CommandError::kind),
            Some(crate::commands::ErrorKind::NotSupported)
        );
    }
}
