//! Typed command helpers over any backend, and the asynchronous flavours of the call surface.
//!
//! Commands always run synchronously against the store. The asynchronous flavours only defer the
//! delivery of the result to a later turn of the Tokio scheduler, so the keyspace is already
//! updated by the time the future or continuation is created.

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use tokio::task::JoinHandle;

use crate::client::Client;
use crate::command::{cmd, Cmd, ToArg};
use crate::frame::Frame;
use crate::Error;

/// Anything that can run a command and reply synchronously. The engine [`Client`] is one, a shim
/// delegating to a real server would be another.
pub trait Backend {
    fn call(&mut self, cmd: Cmd) -> Result<Frame, Error>;
}

impl Backend for Client {
    fn call(&mut self, cmd: Cmd) -> Result<Frame, Error> {
        Client::call(self, cmd)
    }
}

/// Typed conveniences for the most common commands, available on every [`Backend`].
pub trait Commands: Backend {
    fn get(&mut self, key: &str) -> Result<Option<Bytes>, Error> {
        optional_bytes(self.call(cmd("GET").arg(key))?)
    }

    fn set(&mut self, key: &str, value: impl ToArg) -> Result<(), Error> {
        status(self.call(cmd("SET").arg(key).arg(value))?)
    }

    fn del(&mut self, keys: &[&str]) -> Result<i64, Error> {
        integer(self.call(cmd("DEL").args(keys.iter().copied()))?)
    }

    fn exists(&mut self, key: &str) -> Result<bool, Error> {
        Ok(integer(self.call(cmd("EXISTS").arg(key))?)? == 1)
    }

    fn expire(&mut self, key: &str, seconds: i64) -> Result<bool, Error> {
        Ok(integer(self.call(cmd("EXPIRE").arg(key).arg(seconds))?)? == 1)
    }

    fn ttl(&mut self, key: &str) -> Result<i64, Error> {
        integer(self.call(cmd("TTL").arg(key))?)
    }

    fn incr(&mut self, key: &str, delta: i64) -> Result<i64, Error> {
        integer(self.call(cmd("INCRBY").arg(key).arg(delta))?)
    }

    fn lpush(&mut self, key: &str, values: &[&str]) -> Result<i64, Error> {
        integer(self.call(cmd("LPUSH").arg(key).args(values.iter().copied()))?)
    }

    fn rpush(&mut self, key: &str, values: &[&str]) -> Result<i64, Error> {
        integer(self.call(cmd("RPUSH").arg(key).args(values.iter().copied()))?)
    }

    fn lrange(&mut self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>, Error> {
        bulk_list(self.call(cmd("LRANGE").arg(key).arg(start).arg(stop))?)
    }

    fn sadd(&mut self, key: &str, members: &[&str]) -> Result<i64, Error> {
        integer(self.call(cmd("SADD").arg(key).args(members.iter().copied()))?)
    }

    fn smembers(&mut self, key: &str) -> Result<Vec<Bytes>, Error> {
        bulk_list(self.call(cmd("SMEMBERS").arg(key))?)
    }

    fn zadd(&mut self, key: &str, score: f64, member: &str) -> Result<i64, Error> {
        integer(self.call(cmd("ZADD").arg(key).arg(score).arg(member))?)
    }

    fn zrange(&mut self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>, Error> {
        bulk_list(self.call(cmd("ZRANGE").arg(key).arg(start).arg(stop))?)
    }

    fn zscore(&mut self, key: &str, member: &str) -> Result<Option<f64>, Error> {
        optional_float(self.call(cmd("ZSCORE").arg(key).arg(member))?)
    }

    fn hset(&mut self, key: &str, field: &str, value: impl ToArg) -> Result<i64, Error> {
        integer(self.call(cmd("HSET").arg(key).arg(field).arg(value))?)
    }

    fn hget(&mut self, key: &str, field: &str) -> Result<Option<Bytes>, Error> {
        optional_bytes(self.call(cmd("HGET").arg(key).arg(field))?)
    }

    fn publish(&mut self, channel: &str, message: impl ToArg) -> Result<i64, Error> {
        integer(self.call(cmd("PUBLISH").arg(channel).arg(message))?)
    }
}

impl<B: Backend + ?Sized> Commands for B {}

/// A backend whose replies are delivered through futures.
pub trait AsyncBackend {
    fn call(&mut self, cmd: Cmd) -> BoxFuture<'static, Result<Frame, Error>>;
}

/// Future returning counterparts of [`Commands`], available on every [`AsyncBackend`].
pub trait AsyncCommands: AsyncBackend {
    fn get(&mut self, key: &str) -> BoxFuture<'static, Result<Option<Bytes>, Error>> {
        self.call(cmd("GET").arg(key))
            .map(|reply| reply.and_then(optional_bytes))
            .boxed()
    }

    fn set(&mut self, key: &str, value: impl ToArg) -> BoxFuture<'static, Result<(), Error>> {
        self.call(cmd("SET").arg(key).arg(value))
            .map(|reply| reply.and_then(status))
            .boxed()
    }

    fn del(&mut self, keys: &[&str]) -> BoxFuture<'static, Result<i64, Error>> {
        self.call(cmd("DEL").args(keys.iter().copied()))
            .map(|reply| reply.and_then(integer))
            .boxed()
    }

    fn expire(&mut self, key: &str, seconds: i64) -> BoxFuture<'static, Result<bool, Error>> {
        self.call(cmd("EXPIRE").arg(key).arg(seconds))
            .map(|reply| reply.and_then(integer).map(|n| n == 1))
            .boxed()
    }

    fn ttl(&mut self, key: &str) -> BoxFuture<'static, Result<i64, Error>> {
        self.call(cmd("TTL").arg(key))
            .map(|reply| reply.and_then(integer))
            .boxed()
    }

    fn lpush(&mut self, key: &str, values: &[&str]) -> BoxFuture<'static, Result<i64, Error>> {
        self.call(cmd("LPUSH").arg(key).args(values.iter().copied()))
            .map(|reply| reply.and_then(integer))
            .boxed()
    }

    fn lrange(
        &mut self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> BoxFuture<'static, Result<Vec<Bytes>, Error>> {
        self.call(cmd("LRANGE").arg(key).arg(start).arg(stop))
            .map(|reply| reply.and_then(bulk_list))
            .boxed()
    }

    fn zadd(
        &mut self,
        key: &str,
        score: f64,
        member: &str,
    ) -> BoxFuture<'static, Result<i64, Error>> {
        self.call(cmd("ZADD").arg(key).arg(score).arg(member))
            .map(|reply| reply.and_then(integer))
            .boxed()
    }

    fn zscore(&mut self, key: &str, member: &str) -> BoxFuture<'static, Result<Option<f64>, Error>> {
        self.call(cmd("ZSCORE").arg(key).arg(member))
            .map(|reply| reply.and_then(optional_float))
            .boxed()
    }

    fn hset(
        &mut self,
        key: &str,
        field: &str,
        value: impl ToArg,
    ) -> BoxFuture<'static, Result<i64, Error>> {
        self.call(cmd("HSET").arg(key).arg(field).arg(value))
            .map(|reply| reply.and_then(integer))
            .boxed()
    }

    fn hget(&mut self, key: &str, field: &str) -> BoxFuture<'static, Result<Option<Bytes>, Error>> {
        self.call(cmd("HGET").arg(key).arg(field))
            .map(|reply| reply.and_then(optional_bytes))
            .boxed()
    }

    fn publish(
        &mut self,
        channel: &str,
        message: impl ToArg,
    ) -> BoxFuture<'static, Result<i64, Error>> {
        self.call(cmd("PUBLISH").arg(channel).arg(message))
            .map(|reply| reply.and_then(integer))
            .boxed()
    }
}

impl<B: AsyncBackend + ?Sized> AsyncCommands for B {}

/// Turns a synchronous result into a future.
pub type Later = fn(Result<Frame, Error>) -> BoxFuture<'static, Result<Frame, Error>>;

/// Adapts a [`Backend`] into an [`AsyncBackend`]. Every command runs synchronously on the wrapped
/// backend and its result is handed to `later`, which decides when the future resolves.
pub struct Promisified<B, F> {
    backend: B,
    later: F,
}

impl<B, F> Promisified<B, F>
where
    B: Backend,
    F: Fn(Result<Frame, Error>) -> BoxFuture<'static, Result<Frame, Error>>,
{
    pub fn new(backend: B, later: F) -> Self {
        Self { backend, later }
    }
}

impl<B: Backend> Promisified<B, Later> {
    /// Resolves every reply on a later scheduler turn, like [`Client::call_async`].
    pub fn deferred(backend: B) -> Self {
        Self { backend, later }
    }
}

impl<B, F> Promisified<B, F> {
    pub fn get_ref(&self) -> &B {
        &self.backend
    }

    pub fn get_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_inner(self) -> B {
        self.backend
    }
}

impl<B, F> AsyncBackend for Promisified<B, F>
where
    B: Backend,
    F: Fn(Result<Frame, Error>) -> BoxFuture<'static, Result<Frame, Error>>,
{
    fn call(&mut self, cmd: Cmd) -> BoxFuture<'static, Result<Frame, Error>> {
        let result = self.backend.call(cmd);
        (self.later)(result)
    }
}

fn later(result: Result<Frame, Error>) -> BoxFuture<'static, Result<Frame, Error>> {
    async move {
        tokio::task::yield_now().await;
        result
    }
    .boxed()
}

impl Client {
    /// Runs the command now and hands the result to `continuation` from a spawned task. Must be
    /// called from within a Tokio runtime.
    pub fn call_with<F>(&mut self, cmd: impl Into<Cmd>, continuation: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Frame, Error>) + Send + 'static,
    {
        let result = self.call(cmd);
        tokio::spawn(async move { continuation(result) })
    }

    /// Runs the command now, the returned future resolves with its result on a later turn.
    pub fn call_async(&mut self, cmd: impl Into<Cmd>) -> BoxFuture<'static, Result<Frame, Error>> {
        later(self.call(cmd))
    }
}

fn unexpected(frame: Frame) -> Error {
    format!("unexpected reply: {}", frame).into()
}

fn status(frame: Frame) -> Result<(), Error> {
    match frame {
        Frame::Simple(_) => Ok(()),
        frame => Err(unexpected(frame)),
    }
}

fn integer(frame: Frame) -> Result<i64, Error> {
    match frame {
        Frame::Integer(n) => Ok(n),
        frame => Err(unexpected(frame)),
    }
}

fn optional_bytes(frame: Frame) -> Result<Option<Bytes>, Error> {
    match frame {
        Frame::Bulk(bytes) => Ok(Some(bytes)),
        Frame::Null => Ok(None),
        frame => Err(unexpected(frame)),
    }
}

fn optional_float(frame: Frame) -> Result<Option<f64>, Error> {
    match optional_bytes(frame)? {
        Some(bytes) => {
            let value = std::str::from_utf8(&bytes)?;
            let value = match value {
                "inf" => f64::INFINITY,
                "-inf" => f64::NEG_INFINITY,
                value => value.parse()?,
            };
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn bulk_list(frame: Frame) -> Result<Vec<Bytes>, Error> {
    match frame {
        Frame::Array(frames) => frames
            .into_iter()
            .map(|frame| match frame {
                Frame::Bulk(bytes) => Ok(bytes),
                frame => Err(unexpected(frame)),
            })
            .collect(),
        frame => Err(unexpected(frame)),
    }
}
