#[cfg(test)]
mod test;

use crate::{
    bson::Document,
    cmap::Command,
    error::{Error, Result},
    operation::{append_options, remove_empty_write_concern, Operation, WriteConcernOnlyBody},
    options::{CreateCollectionOptions, WriteConcern},
};

/// Creates a collection explicitly, e.g. to make it capped or give it a validator.
#[derive(Debug)]
pub struct CreateCollection {
    db: String,
    coll: String,
    options: Option<CreateCollectionOptions>,
}

impl CreateCollection {
    /// Creates the operation creating `coll` in `db`.
    pub fn new(
        db: impl Into<String>,
        coll: impl Into<String>,
        options: Option<CreateCollectionOptions>,
    ) -> Self {
        Self {
            db: db.into(),
            coll: coll.into(),
            options,
        }
    }
}

impl Operation for CreateCollection {
    type O = ();

    const NAME: &'static str = "create";

    fn build(&mut self) -> Result<Command> {
        if let Some(ref options) = self.options {
            if options.capped == Some(true) && options.size.is_none() {
                return Err(Error::invalid_command(
                    "a capped collection requires a size",
                ));
            }
        }

        let mut command = Command::new(Self::NAME, self.db.clone(), self.coll.clone());

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
