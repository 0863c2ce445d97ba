use std::io::Read;

use crate::{
    bson::{Bson, Document},
    error::{Error, ErrorKind, Result},
};

/// The smallest possible BSON document: a four byte length prefix and the trailing null.
const MIN_DOCUMENT_LENGTH: i32 = 5;

/// Coerce numeric types into an `i64` if it would be lossless to do so. If this Bson is not numeric
/// or the conversion would be lossy (e.g. 1.5 -> 1), this returns `None`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn get_int(val: &Bson) -> Option<i64> {
    match *val {
        Bson::Int32(i) => Some(i64::from(i)),
        Bson::Int64(i) => Some(i),
        Bson::Double(f) if (f - (f as i64 as f64)).abs() <= f64::EPSILON => Some(f as i64),
        _ => None,
    }
}

pub(crate) fn first_key(document: &Document) -> Option<&str> {
    document.keys().next().map(String::as_str)
}

/// Reads a single length-prefixed BSON document from `reader`, returning its raw bytes.
pub(crate) fn read_document_bytes<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    let mut length_bytes = [0u8; 4];
    reader.read_exact(&mut length_bytes).map_err(truncated)?;
    let length = i32::from_le_bytes(length_bytes);
    if length < MIN_DOCUMENT_LENGTH {
        return Err(Error::protocol(format!(
            "invalid BSON document length {}",
            length
        )));
    }

    let mut bytes = Vec::with_capacity(length as usize);
    bytes.extend_from_slice(&length_bytes);
    reader
        .take(length as u64 - 4)
        .read_to_end(&mut bytes)
        .map_err(truncated)?;
    if bytes.len() != length as usize {
        return Err(Error::protocol(format!(
            "BSON document claims {} bytes but only {} were available",
            length,
            bytes.len()
        )));
    }

    Ok(bytes)
}

/// Reads from an in-memory message body that ran short are framing errors, not a severed link.
fn truncated(err: std::io::Error) -> Error {
    Error::protocol(format!("truncated message: {}", err))
}

/// Accessors over [`Document`] that report absent fields as [`ErrorKind::KeyNotFound`] rather
/// than `None`.
pub trait DocumentExt {
    /// Returns the value stored under `key`.
    fn get_required(&self, key: &str) -> Result<&Bson>;

    /// Returns the string stored under `key`. A value of another type is reported as
    /// `KeyNotFound` as well, since no string exists under that key.
    fn get_required_str(&self, key: &str) -> Result<&str>;

    /// Returns the document stored under `key`.
    fn get_required_document(&self, key: &str) -> Result<&Document>;

    /// The first key in iteration order, which for a command document is the command name.
    fn command_name(&self) -> Option<&str>;
}

impl DocumentExt for Document {
    fn get_required(&self, key: &str) -> Result<&Bson> {
        self.get(key).ok_or_else(|| key_not_found(key))
    }

    fn get_required_str(&self, key: &str) -> Result<&str> {
        self.get_required(key)?
            .as_str()
            .ok_or_else(|| key_not_found(key))
    }

    fn get_required_document(&self, key: &str) -> Result<&Document> {
        self.get_required(key)?
            .as_document()
            .ok_or_else(|| key_not_found(key))
    }

    fn command_name(&self) -> Option<&str> {
        first_key(self)
    }
}

fn key_not_found(key: &str) -> Error {
    ErrorKind::KeyNotFound {
        key: key.to_string(),
    }
    .into()
}
