//! Publish/subscribe registry.
//!
//! Every client owns an unbounded queue. Subscribing registers the client's sender under a
//! channel name or a glob pattern; publishing pushes the message to every matching sender and
//! reports how many subscribers matched. Receivers observe messages on a later turn, once they
//! poll their queue.

use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use uuid::Uuid;

use crate::frame::Frame;
use crate::glob::Pattern;

/// An event delivered to a subscribed client.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Subscribe {
        channel: String,
        count: usize,
    },
    /// `channel` is `None` when there was nothing to unsubscribe from.
    Unsubscribe {
        channel: Option<String>,
        count: usize,
    },
    PSubscribe {
        pattern: String,
        count: usize,
    },
    PUnsubscribe {
        pattern: Option<String>,
        count: usize,
    },
    Message {
        channel: String,
        payload: Bytes,
    },
    PMessage {
        pattern: String,
        channel: String,
        payload: Bytes,
    },
}

impl Message {
    /// The push reply a subscribed connection would receive for this event.
    pub fn into_frame(self) -> Frame {
        let kind = |kind: &str| Frame::Bulk(Bytes::copy_from_slice(kind.as_bytes()));
        let name = |name: Option<String>| name.map(Frame::from).unwrap_or(Frame::Null);

        let frames = match self {
            Message::Subscribe { channel, count } => {
                vec![kind("subscribe"), Frame::from(channel), Frame::from(count)]
            }
            Message::Unsubscribe { channel, count } => {
                vec![kind("unsubscribe"), name(channel), Frame::from(count)]
            }
            Message::PSubscribe { pattern, count } => {
                vec![kind("psubscribe"), Frame::from(pattern), Frame::from(count)]
            }
            Message::PUnsubscribe { pattern, count } => {
                vec![kind("punsubscribe"), name(pattern), Frame::from(count)]
            }
            Message::Message { channel, payload } => {
                vec![kind("message"), Frame::from(channel), Frame::Bulk(payload)]
            }
            Message::PMessage {
                pattern,
                channel,
                payload,
            } => vec![
                kind("pmessage"),
                Frame::from(pattern),
                Frame::from(channel),
                Frame::Bulk(payload),
            ],
        };

        Frame::Array(frames)
    }
}

type Subscribers = HashMap<Uuid, UnboundedSender<Message>>;

#[derive(Debug, Default)]
struct Subscriptions {
    channels: HashSet<String>,
    patterns: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct Registry {
    channels: HashMap<String, Subscribers>,
    // Compiled once, matched on every publish.
    patterns: HashMap<String, (Pattern, Subscribers)>,
    clients: HashMap<Uuid, Subscriptions>,
}

impl Registry {
    /// Subscribes `client` to `channel`. Returns the client's subscription count.
    pub fn subscribe(&mut self, client: Uuid, channel: &str, tx: &UnboundedSender<Message>) -> usize {
        self.channels
            .entry(channel.to_string())
            .or_default()
            .insert(client, tx.clone());
        self.clients
            .entry(client)
            .or_default()
            .channels
            .insert(channel.to_string());

        debug!(%client, channel, "Subscribed");
        self.count(client)
    }

    pub fn psubscribe(&mut self, client: Uuid, pattern: &str, tx: &UnboundedSender<Message>) -> usize {
        self.patterns
            .entry(pattern.to_string())
            .or_insert_with(|| (Pattern::new(pattern), HashMap::new()))
            .1
            .insert(client, tx.clone());
        self.clients
            .entry(client)
            .or_default()
            .patterns
            .insert(pattern.to_string());

        debug!(%client, pattern, "Subscribed to pattern");
        self.count(client)
    }

    /// Removes the client from `channel`. Returns the client's subscription count.
    pub fn unsubscribe(&mut self, client: Uuid, channel: &str) -> usize {
        if let Some(subscribers) = self.channels.get_mut(channel) {
            subscribers.remove(&client);
            if subscribers.is_empty() {
                self.channels.remove(channel);
            }
        }
        if let Some(subscriptions) = self.clients.get_mut(&client) {
            subscriptions.channels.remove(channel);
        }

        self.forget_if_idle(client);
        self.count(client)
    }

    pub fn punsubscribe(&mut self, client: Uuid, pattern: &str) -> usize {
        if let Some((_, subscribers)) = self.patterns.get_mut(pattern) {
            subscribers.remove(&client);
            if subscribers.is_empty() {
                self.patterns.remove(pattern);
            }
        }
        if let Some(subscriptions) = self.clients.get_mut(&client) {
            subscriptions.patterns.remove(pattern);
        }

        self.forget_if_idle(client);
        self.count(client)
    }

    fn forget_if_idle(&mut self, client: Uuid) {
        if self
            .clients
            .get(&client)
            .is_some_and(|s| s.channels.is_empty() && s.patterns.is_empty())
        {
            self.clients.remove(&client);
        }
    }

    /// Channels the client is subscribed to, sorted.
    pub fn channels_of(&self, client: Uuid) -> Vec<String> {
        let mut channels: Vec<String> = self
            .clients
            .get(&client)
            .map(|s| s.channels.iter().cloned().collect())
            .unwrap_or_default();
        channels.sort();
        channels
    }

    pub fn patterns_of(&self, client: Uuid) -> Vec<String> {
        let mut patterns: Vec<String> = self
            .clients
            .get(&client)
            .map(|s| s.patterns.iter().cloned().collect())
            .unwrap_or_default();
        patterns.sort();
        patterns
    }

    /// Channels plus patterns the client is subscribed to.
    pub fn count(&self, client: Uuid) -> usize {
        self.clients
            .get(&client)
            .map_or(0, |s| s.channels.len() + s.patterns.len())
    }

    /// Queues `payload` for every subscriber of `channel` and every subscriber of a pattern
    /// matching it. Returns the number of matched subscriptions.
    pub fn publish(&self, channel: &str, payload: Bytes) -> usize {
        let mut receivers = 0;

        if let Some(subscribers) = self.channels.get(channel) {
            for tx in subscribers.values() {
                receivers += 1;
                let _ = tx.send(Message::Message {
                    channel: channel.to_string(),
                    payload: payload.clone(),
                });
            }
        }

        for (pattern, (compiled, subscribers)) in &self.patterns {
            if !compiled.matches(channel) {
                continue;
            }
            for tx in subscribers.values() {
                receivers += 1;
                let _ = tx.send(Message::PMessage {
                    pattern: pattern.clone(),
                    channel: channel.to_string(),
                    payload: payload.clone(),
                });
            }
        }

        debug!(channel, receivers, "Published");
        receivers
    }

    /// Channels with at least one subscriber, optionally filtered by `pattern`, sorted.
    pub fn active_channels(&self, pattern: Option<&Pattern>) -> Vec<String> {
        let mut channels: Vec<String> = self
            .channels
            .keys()
            .filter(|channel| pattern.map_or(true, |p| p.matches(channel)))
            .cloned()
            .collect();
        channels.sort();
        channels
    }

    /// Subscriber count of each channel, in the requested order.
    pub fn numsub<'a>(&self, channels: &'a [String]) -> Vec<(&'a str, usize)> {
        channels
            .iter()
            .map(|channel| {
                let count = self.channels.get(channel).map_or(0, HashMap::len);
                (channel.as_str(), count)
            })
            .collect()
    }

    /// Number of distinct subscribed patterns.
    pub fn numpat(&self) -> usize {
        self.patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn publish_counts_exact_and_pattern_subscribers() {
        let mut registry = Registry::default();
        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, mut rx2) = unbounded_channel();
        let (c1, c2) = (Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(registry.subscribe(c1, "news", &tx1), 1);
        assert_eq!(registry.psubscribe(c1, "n*", &tx1), 2);
        assert_eq!(registry.psubscribe(c2, "news.*", &tx2), 1);

        assert_eq!(registry.publish("news", Bytes::from("hello")), 2);
        assert_eq!(registry.publish("news.tech", Bytes::from("rust")), 2);
        assert_eq!(registry.publish("other", Bytes::from("x")), 0);

        assert_eq!(
            rx1.try_recv().unwrap(),
            Message::Message {
                channel: "news".to_string(),
                payload: Bytes::from("hello")
            }
        );
        assert_eq!(
            rx1.try_recv().unwrap(),
            Message::PMessage {
                pattern: "n*".to_string(),
                channel: "news".to_string(),
                payload: Bytes::from("hello")
            }
        );
        assert!(matches!(rx2.try_recv().unwrap(), Message::PMessage { .. }));
    }

    #[test]
    fn unsubscribe_cleans_up() {
        let mut registry = Registry::default();
        let (tx, _rx) = unbounded_channel();
        let client = Uuid::new_v4();

        registry.subscribe(client, "a", &tx);
        registry.subscribe(client, "b", &tx);
        assert_eq!(registry.channels_of(client), vec!["a", "b"]);

        assert_eq!(registry.unsubscribe(client, "a"), 1);
        assert_eq!(registry.unsubscribe(client, "b"), 0);
        assert!(registry.active_channels(None).is_empty());
        assert_eq!(registry.count(client), 0);
        assert!(registry.clients.is_empty());
    }

    #[test]
    fn introspection() {
        let mut registry = Registry::default();
        let (tx, _rx) = unbounded_channel();
        let (c1, c2) = (Uuid::new_v4(), Uuid::new_v4());

        registry.subscribe(c1, "news.tech", &tx);
        registry.subscribe(c2, "news.tech", &tx);
        registry.subscribe(c2, "sports", &tx);
        registry.psubscribe(c1, "news.*", &tx);

        assert_eq!(registry.active_channels(None), vec!["news.tech", "sports"]);
        assert_eq!(
            registry.active_channels(Some(&Pattern::new("news.*"))),
            vec!["news.tech"]
        );

        let channels = vec!["news.tech".to_string(), "none".to_string()];
        assert_eq!(registry.numsub(&channels), vec![("news.tech", 2), ("none", 0)]);
        assert_eq!(registry.numpat(), 1);
    }

    #[test]
    fn message_frames() {
        let frame = Message::Unsubscribe {
            channel: None,
            count: 0,
        }
        .into_frame();
        assert_eq!(
            frame,
            Frame::Array(vec![Frame::from("unsubscribe"), Frame::Null, Frame::Integer(0)])
        );
    }
}
