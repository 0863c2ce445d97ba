use crate::bson::{Bson, Document};

pub(crate) mod command;

pub(crate) const COMMAND_TRACING_EVENT_TARGET: &str = "mongodb_command::command";
pub(crate) const CONNECTION_TRACING_EVENT_TARGET: &str = "mongodb_command::connection";

pub(crate) const DEFAULT_MAX_DOCUMENT_LENGTH_BYTES: usize = 1000;

pub(crate) trait TracingRepresentation {
    type Representation;

    fn tracing_representation(&self) -> Self::Representation;
}

impl TracingRepresentation for Document {
    type Representation = String;

    fn tracing_representation(&self) -> String {
        Bson::Document(self.clone())
            .into_relaxed_extjson()
            .to_string()
    }
}

impl TracingRepresentation for crate::error::Error {
    type Representation = String;

    fn tracing_representation(&self) -> String {
        self.to_string()
    }
}

/// Renders a command or reply as relaxed extended JSON no longer than `max_length_bytes`, plus a
/// trailing "..." if it had to be cut.
pub(crate) fn serialize_command_or_reply(document: &Document, max_length_bytes: usize) -> String {
    let mut serialized = document.tracing_representation();
    truncate_on_char_boundary(&mut serialized, max_length_bytes);
    serialized
}

/// Truncates `s` to `new_length` bytes, rounding up to the next character boundary so multi-byte
/// characters are never split, and appends "..." when anything was removed.
pub(crate) fn truncate_on_char_boundary(s: &mut String, new_length: usize) {
    let original_length = s.len();
    if original_length <= new_length {
        return;
    }

    let mut boundary = new_length;
    while !s.is_char_boundary(boundary) {
        boundary += 1;
    }

    if boundary < original_length {
        s.truncate(boundary);
        s.push_str("...");
    }
}
