use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{syntax, CommandError, CommandParser};
use crate::frame::Frame;
use crate::glob::Pattern;
use crate::store::InnerStoreLocked;
use crate::Error;

/// Posts a message to a channel. Replies the number of subscribers the message was queued for,
/// counting exact and pattern subscriptions.
///
/// Ref: <https://redis.io/docs/latest/commands/publish/>
#[derive(Debug, PartialEq)]
pub struct Publish {
    pub channel: String,
    pub message: Bytes,
}

impl Executable for Publish {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let receivers = store.pubsub.publish(&self.channel, self.message);
        Ok(Frame::from(receivers))
    }
}

impl TryFrom<&mut CommandParser> for Publish {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let channel = parser.next_string()?;
        let message = parser.next_bytes()?;

        Ok(Self { channel, message })
    }
}

/// `PUBSUB CHANNELS [pattern]`, `PUBSUB NUMSUB [channel ...]` and `PUBSUB NUMPAT`.
///
/// Ref: <https://redis.io/docs/latest/commands/pubsub/>
#[derive(Debug, PartialEq)]
pub enum PubSub {
    Channels(Option<Pattern>),
    NumSub(Vec<String>),
    NumPat,
}

impl Executable for PubSub {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error> {
        let frame = match self {
            PubSub::Channels(pattern) => Frame::bulks(store.pubsub.active_channels(pattern.as_ref())),
            PubSub::NumSub(channels) => {
                let mut frames = vec![];
                for (channel, count) in store.pubsub.numsub(&channels) {
                    frames.push(Frame::from(channel));
                    frames.push(Frame::from(count));
                }
                Frame::Array(frames)
            }
            PubSub::NumPat => Frame::from(store.pubsub.numpat()),
        };

        Ok(frame)
    }
}

impl TryFrom<&mut CommandParser> for PubSub {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let subcommand = parser.next_keyword()?.ok_or(CommandError::EndOfStream)?;

        let parsed = match subcommand.as_str() {
            "CHANNELS" => {
                let pattern = if parser.has_more() {
                    Some(Pattern::new(&parser.next_string()?))
                } else {
                    None
                };
                Ok(PubSub::Channels(pattern))
            }
            "NUMSUB" => Ok(PubSub::NumSub(parser.remaining_strings()?)),
            "NUMPAT" => Ok(PubSub::NumPat),
            _ => Err(CommandError::InvalidArgument(format!(
                "unknown subcommand '{}'",
                subcommand.to_lowercase()
            ))),
        };

        parsed.map_err(|err| match err {
            CommandError::EndOfStream => syntax(),
            err => err,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::cmd;
    use crate::commands::{run, Command};
    use crate::pubsub::Message;
    use crate::store::Store;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    #[test]
    fn parse() {
        let command = Command::try_from(cmd("PUBSUB").args(["channels", "news.*"])).unwrap();
        assert_eq!(
            command,
            Command::PubSub(PubSub::Channels(Some(Pattern::new("news.*"))))
        );

        let err = Command::try_from(cmd("PUBSUB").arg("nope")).unwrap_err();
        assert_eq!(err.to_string(), "ERR unknown subcommand 'nope'");
    }

    #[tokio::test]
    async fn publish_counts_receivers() {
        let store = Store::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (client_a, client_b) = (Uuid::new_v4(), Uuid::new_v4());
        {
            let mut state = store.lock();
            state.pubsub.subscribe(client_a, "news", &tx);
            state.pubsub.psubscribe(client_b, "n*", &tx);
        }

        assert_eq!(run(&store, ["PUBLISH", "news", "hi"]).unwrap(), Frame::Integer(2));
        assert_eq!(run(&store, ["PUBLISH", "other", "hi"]).unwrap(), Frame::Integer(0));

        assert_eq!(
            rx.recv().await,
            Some(Message::Message {
                channel: "news".to_string(),
                payload: Bytes::from("hi"),
            })
        );
    }

    #[tokio::test]
    async fn introspection() {
        let store = Store::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        {
            let mut state = store.lock();
            let client = Uuid::new_v4();
            state.pubsub.subscribe(client, "news", &tx);
            state.pubsub.subscribe(client, "sports", &tx);
            state.pubsub.psubscribe(client, "n*", &tx);
        }

        assert_eq!(
            run(&store, ["PUBSUB", "CHANNELS"]).unwrap(),
            Frame::bulks(["news", "sports"])
        );
        assert_eq!(run(&store, ["PUBSUB", "CHANNELS", "s*"]).unwrap(), Frame::bulks(["sports"]));
        assert_eq!(
            run(&store, ["PUBSUB", "NUMSUB", "news", "none"]).unwrap(),
            Frame::Array(vec![
                Frame::from("news"),
                Frame::Integer(1),
                Frame::from("none"),
                Frame::Integer(0),
            ])
        );
        assert_eq!(run(&store, ["PUBSUB", "NUMPAT"]).unwrap(), Frame::Integer(1));
    }
}
