//! This crate contains the command-execution core of a MongoDB client: it turns a logical
//! [`Command`] into a wire command document, sends it to a server over a [`Channel`] and interprets
//! the server's reply as either the reply document or a structured [`error::Error`]. It uses the
//! [`bson`] crate for documents and [`tokio`] for I/O.
//!
//! # Example
//!
//! ```rust,no_run
//! use mongodb_command::{
//!     error::Result,
//!     operation::DropDatabase,
//!     options::{DropDatabaseOptions, ExecutorOptions, WriteConcern},
//!     Connection,
//!     Executor,
//! };
//! use std::time::Duration;
//!
//! # async fn run() -> Result<()> {
//! let connection = Connection::connect("localhost:27017", None).await?;
//! let options = ExecutorOptions::builder()
//!     .timeout(Duration::from_secs(10))
//!     .build();
//! let executor = Executor::new(connection, options);
//!
//! let drop_options = DropDatabaseOptions::builder()
//!     .write_concern(WriteConcern::majority())
//!     .build();
//! executor
//!     .execute_operation(DropDatabase::new("test_db", Some(drop_options)))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Commands can also be assembled by hand and run with [`Executor::execute`], which returns the
//! full reply document:
//!
//! ```rust,no_run
//! # use mongodb_command::{error::Result, Command, Executor};
//! # async fn run(executor: Executor) -> Result<()> {
//! let command = Command::new("create", "test_db", "logs")
//!     .with_option("capped", true)
//!     .with_option("size", 4096);
//! let reply = executor.execute(command).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Monitoring
//!
//! Command started, succeeded and failed events can be delivered to an
//! [`EventHandler`](event::EventHandler) registered through
//! [`ExecutorOptions`](options::ExecutorOptions). They are also emitted as [`tracing`] events at
//! `DEBUG` level under the `mongodb_command::command` target; connection-level events use the
//! `mongodb_command::connection` target.

#![warn(missing_docs)]

pub mod options;

pub use ::bson;

mod bson_util;
mod cmap;
mod concern;
pub mod error;
pub mod event;
mod executor;
pub mod operation;
mod runtime;
mod serde_util;
mod trace;

pub use crate::{
    bson_util::DocumentExt,
    cmap::{interpret, Channel, Command, Connection, ConnectionInfo, Reply},
    executor::Executor,
};
