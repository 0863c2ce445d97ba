//! Typed builders for server commands, run with
//! [`Executor::execute_operation`](crate::Executor::execute_operation).

mod create;
mod drop_collection;
mod drop_database;
mod run_command;


use serde::{Deserialize, Serialize};

use crate::{
    bson::Document,
    cmap::Command,
    error::{Error, ErrorKind, Result, WriteConcernError},
    options::WriteConcern,
};

pub use create::CreateCollection;
pub use drop_collection::DropCollection;
pub use drop_database::DropDatabase;
pub use run_command::RunCommand;

/// A trait modeling the behavior of a server side operation: how to build its [`Command`] and how
/// to interpret the server's reply.
pub trait Operation {
    /// The output type of this operation.
    type O;

    /// The name of the server side command associated with this operation.
    const NAME: &'static str;

    /// Returns the command that should be sent to the server as part of this operation.
    fn build(&mut self) -> Result<Command>;

    /// Interprets a successful (`ok: 1`) reply to the command.
    fn handle_response(&self, reply: Document) -> Result<Self::O>;

    /// Interprets an error encountered while running the command, potentially recovering.
    fn handle_error(&self, error: Error) -> Result<Self::O> {
        Err(error)
    }

    /// The write concern to use for this operation, if any.
    fn write_concern(&self) -> Option<&WriteConcern> {
        None
    }
}

/// Appends the fields of `options` to `command`, after checking its write concern.
pub(crate) fn append_options<T: Serialize>(
    command: &mut Command,
    options: Option<&T>,
    write_concern: Option<&WriteConcern>,
) -> Result<()> {
    if let Some(write_concern) = write_concern {
        write_concern.validate()?;
    }
    command.append_options(options)
}

/// Body of a reply that could possibly carry a write concern error but not write errors.
#[derive(Debug, Deserialize, Default, Clone)]
pub(crate) struct WriteConcernOnlyBody {
    #[serde(rename = "writeConcernError")]
    write_concern_error: Option<WriteConcernError>,
}

impl WriteConcernOnlyBody {
    pub(crate) fn from_reply(reply: Document) -> Result<Self> {
        crate::bson::from_document(reply)
            .map_err(|e| Error::malformed_reply(format!("invalid write reply: {}", e)))
    }

    pub(crate) fn validate(self) -> Result<()> {
        match self.write_concern_error {
            Some(wc_error) => Err(ErrorKind::WriteConcern(wc_error).into()),
            None => Ok(()),
        }
    }
}

macro_rules! remove_empty_write_concern {
    ($opts:expr) => {
        if let Some(ref mut options) = $opts {
            if let Some(ref write_concern) = options.write_concern {
                if write_concern.is_empty() {
                    options.write_concern = None;
                }
            }
        }
    };
}

pub(crate) use remove_empty_write_concern;
