
use crate::{
    bson::Document,
    cmap::Command,
    error::{Error, Result},
    operation::{append_options, remove_empty_write_concern, Operation, WriteConcernOnlyBody},
    options::{DropCollectionOptions, WriteConcern},
};

/// Drops a collection. Dropping a collection that does not exist succeeds.
#[derive(Debug)]
pub struct DropCollection {
    db: String,
    coll: String,
    options: Option<DropCollectionOptions>,
}

impl DropCollection {
    /// Creates the operation dropping `coll` from `db`.
    pub fn new(
        db: impl Into<String>,
        coll: impl Into<String>,
        options: Option<DropCollectionOptions>,
    ) -> Self {
        DropCollection {
            db: db.into(),
            coll: coll.into(),
            options,
        }
    }
}

impl Operation for DropCollection {
    type O = ();

    const NAME: &'static str = "drop";

    fn build(&mut self) -> Result<Command> {
        let mut command = Command::new(Self::NAME, self.db.clone(), self.coll.clone());

        remove_empty_write_concern!(self.options);
        append_options(&mut command, self.options.as_ref(), self.write_concern())?;

        Ok(command)
    }

    fn handle_response(&self, reply: Document) -> Result<Self::O> {
        WriteConcernOnlyBody::from_reply(reply)?.validate()
    }

    fn handle_error(&self, error: Error) -> Result<Self::O> {
        if error.is_ns_not_found() {
            Ok(())
        } else {
            Err(error)
        }
    }

    fn write_concern(&self) -> Option<&WriteConcern> {
        self.options
            .as_ref()
            .and_then(|opts| opts.write_concern.as_ref())
    }
}
