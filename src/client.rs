//! The in-process connection to a [`Store`].
//!
//! A [`Client`] plays the part of a network connection: it resolves and validates every call,
//! runs keyspace commands under the store lock and keeps the state a connection would own, that
//! is its subscriptions, watched keys, transaction queue and authentication status.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};
use uuid::Uuid;

use crate::command::Cmd;
use crate::commands::executable::Executable;
use crate::commands::table::{self, Descriptor, Scope};
use crate::commands::{Command, CommandError, CommandParser};
use crate::frame::Frame;
use crate::pubsub::Message;
use crate::store::{InnerStoreLocked, Store};
use crate::transaction::Exec;
use crate::Error;

pub struct Client {
    id: Uuid,
    store: Store,
    authenticated: bool,
    // Subscription confirmations and published messages land here.
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
    // `Some` between MULTI and EXEC/DISCARD.
    queue: Option<Vec<Cmd>>,
    // A command failed validation while queuing, EXEC must abort.
    queue_failed: bool,
}

impl Client {
    /// A client of the process wide store.
    pub fn new() -> Client {
        Client::with_store(Store::global())
    }

    pub fn with_store(store: Store) -> Client {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        debug!(client = %id, "Client created");

        Client {
            id,
            store,
            authenticated: false,
            tx,
            rx,
            queue: None,
            queue_failed: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// A new client of the same store. It starts without subscriptions, watches or a pending
    /// transaction, but keeps the authentication status.
    pub fn copy(&self) -> Client {
        let mut client = Client::with_store(self.store.clone());
        client.authenticated = self.authenticated;
        client
    }

    /// A client of a new, empty store configured like this one.
    pub fn isolated(&self) -> Client {
        let config = self.store.lock().config().clone();
        Client::with_store(Store::with_config(config))
    }

    /// A client of a new store holding a copy of this store's keys.
    pub fn isolated_copy(&self) -> Client {
        let mut client = Client::with_store(self.store.deep_copy());
        client.authenticated = self.authenticated;
        client
    }

    /// Runs a command and returns its reply.
    ///
    /// While a transaction is open, commands are validated and queued instead, replying
    /// `QUEUED`.
    pub fn call(&mut self, cmd: impl Into<Cmd>) -> Result<Frame, Error> {
        let cmd = cmd.into();
        debug!(client = %self.id, %cmd, "Call");

        let store = self.store.clone();
        let mut state = store.lock();
        self.call_locked(&mut state, cmd)
    }

    /// Waits for the next subscription confirmation or published message.
    pub async fn next_message(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// The next pending message, if one was already delivered.
    pub fn try_next_message(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    fn call_locked(&mut self, state: &mut InnerStoreLocked, cmd: Cmd) -> Result<Frame, Error> {
        let name = cmd.name();

        if !self.authenticated && name != "auth" && state.config().requirepass.is_some() {
            return Err(
                CommandError::AuthFailure("NOAUTH Authentication required.".to_string()).into(),
            );
        }

        let descriptor = match resolve(&name, &cmd) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                if self.queue.is_some() {
                    self.queue_failed = true;
                }
                return Err(err.into());
            }
        };

        if let Some(queue) = self.queue.as_mut() {
            if !matches!(name.as_str(), "multi" | "exec" | "discard" | "watch") {
                queue.push(cmd);
                return Ok(Frame::Simple("QUEUED".to_string()));
            }
        }

        self.execute(state, descriptor, cmd)
    }

    fn execute(
        &mut self,
        state: &mut InnerStoreLocked,
        descriptor: &Descriptor,
        cmd: Cmd,
    ) -> Result<Frame, Error> {
        if descriptor.scope == Scope::Client {
            return self.execute_client(state, cmd);
        }

        let keys: Vec<(String, bool)> = if descriptor.write {
            descriptor
                .keys(cmd.parts())
                .into_iter()
                .map(|key| {
                    let existed = state.exists(&key);
                    (key, existed)
                })
                .collect()
        } else {
            vec![]
        };

        let command = Command::try_from(cmd)?;
        let frame = command.exec(state)?;

        if !descriptor.unchanged_by(&frame) {
            // A key missing both before and after the write was not modified.
            for (key, existed) in keys {
                if existed || state.exists(&key) {
                    state.touch(&key);
                }
            }
        }
        Ok(frame)
    }

    fn execute_client(&mut self, state: &mut InnerStoreLocked, cmd: Cmd) -> Result<Frame, Error> {
        let mut parser = CommandParser::new(cmd);
        let name = parser.name().to_string();
        let args = parser.remaining_strings()?;

        match name.as_str() {
            "multi" => {
                if self.queue.is_some() {
                    return Err(invalid("MULTI calls can not be nested"));
                }
                self.begin();
                Ok(Frame::ok())
            }
            "exec" => Ok(self.commit(state)?.into_frame()),
            "discard" => {
                if self.queue.is_none() {
                    return Err(invalid("DISCARD without MULTI"));
                }
                self.rollback(state);
                Ok(Frame::ok())
            }
            "watch" => {
                if self.queue.is_some() {
                    return Err(invalid("WATCH inside MULTI is not allowed"));
                }
                for key in args {
                    state.watch(self.id, key);
                }
                Ok(Frame::ok())
            }
            "unwatch" => {
                state.unwatch(self.id);
                Ok(Frame::ok())
            }
            "subscribe" => {
                let mut count = 0;
                for channel in args {
                    count = state.pubsub.subscribe(self.id, &channel, &self.tx);
                    self.push(Message::Subscribe { channel, count });
                }
                Ok(Frame::from(count))
            }
            "psubscribe" => {
                let mut count = 0;
                for pattern in args {
                    count = state.pubsub.psubscribe(self.id, &pattern, &self.tx);
                    self.push(Message::PSubscribe { pattern, count });
                }
                Ok(Frame::from(count))
            }
            "unsubscribe" => {
                let channels = if args.is_empty() {
                    state.pubsub.channels_of(self.id)
                } else {
                    args
                };
                if channels.is_empty() {
                    let count = state.pubsub.count(self.id);
                    self.push(Message::Unsubscribe {
                        channel: None,
                        count,
                    });
                    return Ok(Frame::from(count));
                }

                let mut count = 0;
                for channel in channels {
                    count = state.pubsub.unsubscribe(self.id, &channel);
                    self.push(Message::Unsubscribe {
                        channel: Some(channel),
                        count,
                    });
                }
                Ok(Frame::from(count))
            }
            "punsubscribe" => {
                let patterns = if args.is_empty() {
                    state.pubsub.patterns_of(self.id)
                } else {
                    args
                };
                if patterns.is_empty() {
                    let count = state.pubsub.count(self.id);
                    self.push(Message::PUnsubscribe {
                        pattern: None,
                        count,
                    });
                    return Ok(Frame::from(count));
                }

                let mut count = 0;
                for pattern in patterns {
                    count = state.pubsub.punsubscribe(self.id, &pattern);
                    self.push(Message::PUnsubscribe {
                        pattern: Some(pattern),
                        count,
                    });
                }
                Ok(Frame::from(count))
            }
            "auth" => self.authenticate(state, args),
            _ => Err(CommandError::UnknownCommand { command: name }.into()),
        }
    }

    // `AUTH password` or `AUTH default password`.
    fn authenticate(&mut self, state: &mut InnerStoreLocked, args: Vec<String>) -> Result<Frame, Error> {
        let Some(expected) = state.config().requirepass.as_deref() else {
            return Err(CommandError::AuthFailure(
                "ERR AUTH <password> called without any password configured for the default user. \
                 Are you sure your configuration is correct?"
                    .to_string(),
            )
            .into());
        };

        let matches = match args.as_slice() {
            [password] => password == expected,
            [username, password] => username == "default" && password == expected,
            _ => return Err(crate::commands::syntax().into()),
        };

        if !matches {
            return Err(CommandError::AuthFailure(
                "WRONGPASS invalid username-password pair or user is disabled.".to_string(),
            )
            .into());
        }

        self.authenticated = true;
        debug!(client = %self.id, "Authenticated");
        Ok(Frame::ok())
    }

    fn push(&self, message: Message) {
        // The receiver lives as long as the client does.
        let _ = self.tx.send(message);
    }

    pub(crate) fn begin(&mut self) {
        if self.queue.is_none() {
            self.queue = Some(vec![]);
            self.queue_failed = false;
        }
    }

    pub(crate) fn in_transaction(&self) -> bool {
        self.queue.is_some()
    }

    /// Runs the queued commands unless a queued command was invalid or a watched key was
    /// modified. Watches are cleared either way.
    pub(crate) fn commit(&mut self, state: &mut InnerStoreLocked) -> Result<Exec, Error> {
        let Some(queue) = self.queue.take() else {
            return Err(invalid("EXEC without MULTI"));
        };
        let failed = std::mem::take(&mut self.queue_failed);
        // Keys whose deadline already passed count as modified.
        state.remove_expired_keys();
        let dirty = state.unwatch(self.id);

        if failed {
            info!(client = %self.id, "Transaction discarded because of previous errors");
            return Err(CommandError::ExecAbort.into());
        }
        if dirty {
            info!(client = %self.id, "Transaction aborted, a watched key was modified");
            return Ok(Exec::Aborted);
        }

        let mut results = Vec::with_capacity(queue.len());
        for cmd in queue {
            let result = match resolve(&cmd.name(), &cmd) {
                Ok(descriptor) => self.execute(state, descriptor, cmd),
                Err(err) => Err(err.into()),
            };
            results.push(result);
        }

        info!(client = %self.id, commands = results.len(), "Transaction committed");
        Ok(Exec::Committed(results))
    }

    pub(crate) fn rollback(&mut self, state: &mut InnerStoreLocked) {
        self.queue = None;
        self.queue_failed = false;
        state.unwatch(self.id);
        debug!(client = %self.id, "Transaction discarded");
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let mut state = self.store.lock();
        state.unwatch(self.id);
        for channel in state.pubsub.channels_of(self.id) {
            state.pubsub.unsubscribe(self.id, &channel);
        }
        for pattern in state.pubsub.patterns_of(self.id) {
            state.pubsub.punsubscribe(self.id, &pattern);
        }
        debug!(client = %self.id, "Client dropped");
    }
}

/// Looks up and validates a call before it runs or gets queued.
fn resolve(name: &str, cmd: &Cmd) -> Result<&'static Descriptor, CommandError> {
    let descriptor = table::lookup(name).ok_or_else(|| CommandError::UnknownCommand {
        command: name.to_string(),
    })?;

    if descriptor.scope == Scope::NotSupported {
        return Err(CommandError::NotSupported {
            command: name.to_string(),
        });
    }
    if !descriptor.accepts(cmd.len()) {
        return Err(CommandError::WrongArity {
            command: name.to_string(),
        });
    }

    Ok(descriptor)
}

fn invalid(message: &str) -> Error {
    CommandError::InvalidArgument(message.to_string()).into()
}
