
use crate::{
    bson::Document,
    cmap::Command,
    error::Result,
    operation::{append_options, remove_empty_write_concern, Operation, WriteConcernOnlyBody},
    options::{DropDatabaseOptions, WriteConcern},
};

/// Drops a database: `{ dropDatabase: 1 }` run against the database itself.
#[derive(Debug)]
pub struct DropDatabase {
    target_db: String,
    options: Option<DropDatabaseOptions>,
}

impl DropDatabase {
    /// Creates the operation for `target_db`.
    pub fn new(target_db: impl Into<String>, options: Option<DropDatabaseOptions>) -> Self {
        Self {
            target_db: target_db.into(),
            options,
        }
    }
}

impl Operation for DropDatabase {
    type O = ();

    const NAME: &'static str = "dropDatabase";

    fn build(&mut self) -> Result<Command> {
        let mut command = Command::new(Self::NAME, self.target_db.clone(), 1);

        remove_empty_write_concern!(self.options);
        append_options(&mut command, self.options.as_ref(), self.write_concern())?;

        Ok(command)
    }

    fn handle_response(&self, reply: Document) -> Result<Self::O> {
        WriteConcernOnlyBody::from_reply(reply)?.validate()
    }

    fn write_concern(&self) -> Option<&WriteConcern> {
        self.options
            .as_ref()
            .and_then(|opts| opts.write_concern.as_ref())
    }
}
