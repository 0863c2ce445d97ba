//! Contains the `Error` and `Result` types that `mongodb-command` uses.

use std::{fmt, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::bson::Document;

const NS_NOT_FOUND_CODE: i32 = 26;

/// The result type for all methods that can return an error in the `mongodb-command` crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur in the `mongodb-command` crate. The inner [`ErrorKind`] is boxed to
/// keep `Result`s small, and the error records the name of the command it originated from when
/// one is known.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Error {
    /// The type of error that occurred.
    pub kind: Box<ErrorKind>,

    command_name: Option<String>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
            command_name: None,
        }
    }

    pub(crate) fn invalid_command(message: impl Into<String>) -> Self {
        ErrorKind::InvalidCommand {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn connection_closed(message: impl Into<String>) -> Self {
        ErrorKind::ConnectionClosed {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        ErrorKind::ProtocolError {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn malformed_reply(message: impl Into<String>) -> Self {
        ErrorKind::MalformedReply {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        ErrorKind::Internal {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn timeout(duration: Duration) -> Self {
        ErrorKind::Timeout { duration }.into()
    }

    /// Attaches the name of the command this error originated from. The kind is left untouched.
    pub(crate) fn with_command_name(mut self, name: impl Into<String>) -> Self {
        if self.command_name.is_none() {
            self.command_name = Some(name.into());
        }
        self
    }

    /// The name of the command that produced this error, if it was raised while executing one.
    pub fn command_name(&self) -> Option<&str> {
        self.command_name.as_deref()
    }

    /// The server error code, if the server reported one.
    pub fn code(&self) -> Option<i32> {
        match self.kind.as_ref() {
            ErrorKind::CommandFailed(err) => err.code,
            ErrorKind::WriteConcern(err) => Some(err.code),
            _ => None,
        }
    }

    /// Whether this error is an "ns not found" error or not.
    pub fn is_ns_not_found(&self) -> bool {
        matches!(
            self.kind.as_ref(),
            ErrorKind::CommandFailed(err) if err.code == Some(NS_NOT_FOUND_CODE)
        )
    }

    /// Whether no reply arrived within the configured bound. The server-side effect of the command
    /// is unknown.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::Timeout { .. })
    }

    /// Whether this error means the connection can no longer be used.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self.kind.as_ref(),
            ErrorKind::ConnectionClosed { .. } | ErrorKind::ProtocolError { .. }
        )
    }

    /// Whether an error originated from the server.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self.kind.as_ref(),
            ErrorKind::CommandFailed(_) | ErrorKind::WriteConcern(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.command_name {
            Some(ref name) => write!(f, "{} (command: {})", self.kind, name),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Error {}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(err: E) -> Self {
        Self::new(err.into())
    }
}

impl std::ops::Deref for Error {
    type Target = ErrorKind;

    fn deref(&self) -> &Self::Target {
        &self.kind
    }
}

/// The types of errors that can occur.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The logical command was malformed. Raised before any network activity.
    #[error("Invalid command: {message}")]
    #[non_exhaustive]
    InvalidCommand { message: String },

    /// A required field was absent from a document.
    #[error("Key not found: {key}")]
    #[non_exhaustive]
    KeyNotFound { key: String },

    /// The channel was severed, or had already failed, while a request was in flight.
    #[error("Connection closed: {message}")]
    #[non_exhaustive]
    ConnectionClosed { message: String },

    /// No reply arrived within the configured bound. Whether the server applied the command is
    /// unknown.
    #[error("Timed out after {duration:?} waiting for a reply")]
    #[non_exhaustive]
    Timeout { duration: Duration },

    /// Bytes on the wire could not be decoded. The connection should be discarded.
    #[error("Protocol error: {message}")]
    #[non_exhaustive]
    ProtocolError { message: String },

    /// The server's reply lacked a usable `ok` status field.
    #[error("The server returned a malformed reply: {message}")]
    #[non_exhaustive]
    MalformedReply { message: String },

    /// The server reported that the command failed.
    #[error("Command failed: {0}")]
    CommandFailed(CommandError),

    /// The command succeeded but the requested write concern could not be satisfied.
    #[error("Write concern failed: {0}")]
    WriteConcern(WriteConcernError),

    /// An invariant inside the crate was violated.
    #[error("Internal error: {message}")]
    #[non_exhaustive]
    Internal { message: String },

    /// The caller cancelled the command while it was in flight. The command may or may not have
    /// been applied by the server.
    #[error("The command was cancelled before a reply arrived")]
    Cancelled,
}

impl From<std::io::Error> for ErrorKind {
    fn from(err: std::io::Error) -> Self {
        ErrorKind::ConnectionClosed {
            message: err.to_string(),
        }
    }
}

impl From<crate::bson::de::Error> for ErrorKind {
    fn from(err: crate::bson::de::Error) -> Self {
        ErrorKind::ProtocolError {
            message: err.to_string(),
        }
    }
}

impl From<crate::bson::ser::Error> for ErrorKind {
    fn from(err: crate::bson::ser::Error) -> Self {
        ErrorKind::InvalidCommand {
            message: err.to_string(),
        }
    }
}

/// An error that occurred due to a database command failing.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct CommandError {
    /// Identifies the type of error.
    #[serde(default)]
    pub code: Option<i32>,

    /// The name associated with the error code.
    #[serde(rename = "codeName", default)]
    pub code_name: Option<String>,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default)]
    pub message: String,

    /// Labels the server attached to the error.
    #[serde(rename = "errorLabels", default)]
    pub labels: Vec<String>,
}

impl fmt::Display for CommandError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match (self.code, self.code_name.as_deref()) {
            (Some(code), Some(name)) => write!(fmt, "({}) {} [{}]", name, self.message, code),
            (Some(code), None) => write!(fmt, "{} [{}]", self.message, code),
            (None, _) => write!(fmt, "{}", self.message),
        }
    }
}

/// An error that occurred due to not being able to satisfy a write concern.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct WriteConcernError {
    /// Identifies the type of write concern error.
    pub code: i32,

    /// The name associated with the error code.
    #[serde(rename = "codeName", default)]
    pub code_name: String,

    /// A description of the error that occurred.
    #[serde(alias = "errmsg", default)]
    pub message: String,

    /// A document identifying the write concern setting related to the error.
    #[serde(rename = "errInfo")]
    pub details: Option<Document>,
}

impl fmt::Display for WriteConcernError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "({}) {} [{}]", self.code_name, self.message, self.code)
    }
}
