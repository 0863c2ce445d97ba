use serde::Serialize;

use crate::{
    bson::{Bson, Document},
    error::{Error, Result},
};

/// `Command` is a driver side abstraction of a server command: a name, the value stored under
/// that name, the database it targets and any option fields, in the order they should appear on
/// the wire.
///
/// Building a `Command` never fails; [`Command::into_document`] validates it when it is encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub(crate) name: String,
    pub(crate) target_db: String,
    pub(crate) value: Bson,
    pub(crate) options: Document,
}

impl Command {
    /// Constructs a new command. For administrative commands that act on the target database
    /// itself, the value is conventionally the integer `1`.
    pub fn new(
        name: impl Into<String>,
        target_db: impl Into<String>,
        value: impl Into<Bson>,
    ) -> Self {
        Self {
            name: name.into(),
            target_db: target_db.into(),
            value: value.into(),
            options: Document::new(),
        }
    }

    /// Appends an option field after the command name. Fields appear on the wire in the order
    /// they were first added; setting an existing field again replaces its value in place.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.options.insert(key, value);
        self
    }

    /// Serializes `options` to a document and appends its fields in declaration order.
    pub fn append_options<T: Serialize>(&mut self, options: Option<&T>) -> Result<()> {
        if let Some(options) = options {
            let options_doc = crate::bson::to_document(options)?;
            self.options.extend(options_doc);
        }
        Ok(())
    }

    /// The name of the command, e.g. "dropDatabase".
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The database the command is run against.
    pub fn target_db(&self) -> &str {
        self.target_db.as_str()
    }

    /// Renders the command as the document sent to the server: the command name is the first key,
    /// followed by the option fields.
    pub fn into_document(self) -> Result<Document> {
        self.validate()?;

        let mut body = Document::new();
        body.insert(self.name, self.value);
        body.extend(self.options);
        Ok(body)
    }

    /// Renders the command without consuming it.
    pub fn to_document(&self) -> Result<Document> {
        self.clone().into_document()
    }

    /// Recovers a command from a document whose first key is the command name.
    pub fn from_document(target_db: impl Into<String>, mut document: Document) -> Result<Self> {
        let name = match document.keys().next() {
            Some(name) => name.clone(),
            None => return Err(Error::invalid_command("command document is empty")),
        };
        let value = document.remove(&name).unwrap_or(Bson::Null);

        let command = Self {
            name,
            target_db: target_db.into(),
            value,
            options: document,
        };
        command.validate()?;
        Ok(command)
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid_command("command name must not be empty"));
        }
        if self.target_db.is_empty() {
            return Err(Error::invalid_command(format!(
                "no target database given for command {}",
                self.name
            )));
        }
        if self.options.contains_key(&self.name) {
            return Err(Error::invalid_command(format!(
                "option field duplicates command name {}",
                self.name
            )));
        }
        Ok(())
    }
}
