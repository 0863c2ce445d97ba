//! Contains the events and functionality for monitoring command execution.

use std::time::Duration;

use crate::{bson::Document, error::Error};

/// An event that triggers when a command is handed to the channel.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct CommandStartedEvent {
    /// The command being run, as it was encoded.
    pub command: Document,

    /// The name of the database the command is being run against.
    pub db: String,

    /// The type of command being run, e.g. "dropDatabase" or "create".
    pub command_name: String,
}

/// An event that triggers when a command completes without an error.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct CommandSucceededEvent {
    /// The total execution time of the command (including the network round-trip).
    pub duration: Duration,

    /// The server's reply to the command.
    pub reply: Document,

    /// The type of command that was run.
    pub command_name: String,
}

/// An event that triggers when a command failed to complete successfully.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct CommandFailedEvent {
    /// The total execution time of the command (including the network round-trip).
    pub duration: Duration,

    /// The type of command that was run.
    pub command_name: String,

    /// The error the executor returned for the command.
    pub failure: Error,
}

#[derive(Clone, Debug)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum CommandEvent {
    Started(CommandStartedEvent),
    Succeeded(CommandSucceededEvent),
    Failed(CommandFailedEvent),
}

impl From<CommandStartedEvent> for CommandEvent {
    fn from(event: CommandStartedEvent) -> Self {
        Self::Started(event)
    }
}

impl From<CommandSucceededEvent> for CommandEvent {
    fn from(event: CommandSucceededEvent) -> Self {
        Self::Succeeded(event)
    }
}

impl From<CommandFailedEvent> for CommandEvent {
    fn from(event: CommandFailedEvent) -> Self {
        Self::Failed(event)
    }
}
