//! Optimistic transactions.
//!
//! `WATCH` registers keys for a client. Every successful write to a watched key, an expiration or
//! a flush marks the watching clients as dirty, and the next `EXEC` of a dirty client aborts
//! without running anything. A committed transaction runs every queued command while holding the
//! store lock, so no other command observes it half applied.

use crate::client::Client;
use crate::command::Cmd;
use crate::frame::Frame;
use crate::Error;

/// Outcome of `EXEC`.
#[derive(Debug)]
pub enum Exec {
    /// A watched key was modified, nothing ran.
    Aborted,
    /// Result of every queued command, in order.
    Committed(Vec<Result<Frame, Error>>),
}

impl Exec {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Exec::Aborted)
    }

    /// The reply `EXEC` gives over the wire: nil when aborted, otherwise an array in which failed
    /// commands become error frames.
    pub fn into_frame(self) -> Frame {
        match self {
            Exec::Aborted => Frame::Null,
            Exec::Committed(results) => Frame::Array(
                results
                    .into_iter()
                    .map(|result| result.unwrap_or_else(|err| Frame::Error(err.to_string())))
                    .collect(),
            ),
        }
    }
}

/// A transaction in the queuing state, created by [`Client::multi`]. Dropping it without calling
/// [`Transaction::exec`] discards it.
pub struct Transaction<'c> {
    client: &'c mut Client,
    done: bool,
}

impl Client {
    /// Starts a transaction. Commands issued through the returned handle are queued until
    /// [`Transaction::exec`].
    pub fn multi(&mut self) -> Transaction<'_> {
        self.begin();
        Transaction {
            client: self,
            done: false,
        }
    }
}

impl<'c> Transaction<'c> {
    /// Validates and queues a command. Replies `QUEUED`, or the validation error, in which case
    /// `exec` will fail with `EXECABORT`.
    pub fn call(&mut self, cmd: impl Into<Cmd>) -> Result<Frame, Error> {
        self.client.call(cmd)
    }

    pub fn exec(mut self) -> Result<Exec, Error> {
        self.done = true;
        let store = self.client.store().clone();
        let mut state = store.lock();
        self.client.commit(&mut state)
    }

    pub fn discard(mut self) {
        self.done = true;
        self.rollback();
    }

    fn rollback(&mut self) {
        if !self.client.in_transaction() {
            return;
        }
        let store = self.client.store().clone();
        let mut state = store.lock();
        self.client.rollback(&mut state);
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.rollback();
        }
    }
}
