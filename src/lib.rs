pub mod async_client;
pub mod client;
pub mod command;
pub mod commands;
pub mod config;
pub mod frame;
pub mod glob;
pub mod guard;
pub mod pubsub;
pub mod sorted_set;
pub mod store;
pub mod transaction;
pub mod utils;

pub use async_client::{AsyncBackend, AsyncCommands, Backend, Commands, Promisified};
pub use client::Client;
pub use command::{cmd, Cmd};
pub use commands::{CommandError, ErrorKind};
pub use config::Config;
pub use frame::Frame;
pub use pubsub::Message;
pub use store::Store;
pub use transaction::{Exec, Transaction};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
