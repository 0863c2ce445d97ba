
use crate::{bson::Document, cmap::Command, error::Result, operation::Operation};

/// Runs an arbitrary command document, whose first key names the command. The output is the raw
/// reply.
#[derive(Debug, Clone)]
pub struct RunCommand {
    db: String,
    command: Document,
}

impl RunCommand {
    /// Creates the operation running `command` against `db`.
    pub fn new(db: impl Into<String>, command: Document) -> Self {
        Self {
            db: db.into(),
            command,
        }
    }
}

impl Operation for RunCommand {
    type O = Document;

    // The command's own name comes from the document; this one only labels build failures.
    const NAME: &'static str = "runCommand";

    fn build(&mut self) -> Result<Command> {
        Command::from_document(self.db.clone(), self.command.clone())
    }

    fn handle_response(&self, reply: Document) -> Result<Self::O> {
        Ok(reply)
    }
}
