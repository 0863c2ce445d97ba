use std::{
    io::Read,
    sync::atomic::{AtomicI32, Ordering},
};

use crate::error::{Error, Result};

static REQUEST_ID: AtomicI32 = AtomicI32::new(0);

/// Obtain a new, process-wide unique request ID.
pub(crate) fn next_request_id() -> i32 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// Little-endian reads over an already-buffered message body. Running out of bytes here means the
/// server framed the message incorrectly.
pub(super) trait SyncLittleEndianRead: Read {
    fn read_u8_sync(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf).map_err(truncated)?;
        Ok(buf[0])
    }

    fn read_i32_sync(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf).map_err(truncated)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_u32_sync(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf).map_err(truncated)?;
        Ok(u32::from_le_bytes(buf))
    }
}

impl<R: Read + ?Sized> SyncLittleEndianRead for R {}

fn truncated(err: std::io::Error) -> Error {
    Error::protocol(format!("message ended early: {}", err))
}

/// Reads a null-terminated string from the front of `reader`.
pub(super) fn read_cstring(reader: &mut &[u8]) -> Result<String> {
    let end = reader
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| Error::protocol("unterminated string in message"))?;
    let string = std::str::from_utf8(&reader[..end])
        .map_err(|e| Error::protocol(format!("invalid UTF-8 in message: {}", e)))?
        .to_string();
    *reader = &reader[end + 1..];
    Ok(string)
}
