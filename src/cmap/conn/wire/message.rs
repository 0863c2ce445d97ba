use bitflags::bitflags;
use tokio::io::{AsyncRead, AsyncReadExt};
#[cfg(test)]
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{
    header::{Header, OpCode},
    next_request_id,
    util::{read_cstring, SyncLittleEndianRead},
};
use crate::{
    bson::{Array, Document},
    bson_util,
    error::{Error, Result},
};

pub(crate) const DEFAULT_MAX_MESSAGE_SIZE_BYTES: i32 = 48 * 1024 * 1024;

const DB_FIELD: &str = "$db";

/// Represents an OP_MSG wire protocol operation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Message {
    // OP_MSG payload type 0
    pub(crate) document_payload: Document,
    // OP_MSG payload type 1
    pub(crate) document_sequences: Vec<DocumentSequence>,
    pub(crate) response_to: i32,
    pub(crate) flags: MessageFlags,
    pub(crate) checksum: Option<u32>,
    pub(crate) request_id: Option<i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DocumentSequence {
    pub(crate) identifier: String,
    pub(crate) documents: Vec<Document>,
}

impl Message {
    /// Creates a `Message` carrying a command body addressed to `target_db`.
    pub(crate) fn from_command(mut body: Document, target_db: &str, request_id: i32) -> Self {
        body.insert(DB_FIELD, target_db);

        Self {
            document_payload: body,
            document_sequences: Vec::new(),
            response_to: 0,
            flags: MessageFlags::empty(),
            checksum: None,
            request_id: Some(request_id),
        }
    }

    /// Creates a reply to the message with the given request id.
    #[cfg(test)]
    pub(crate) fn reply_to(request_id: i32, body: Document) -> Self {
        Self {
            document_payload: body,
            document_sequences: Vec::new(),
            response_to: request_id,
            flags: MessageFlags::empty(),
            checksum: None,
            request_id: None,
        }
    }

    /// Gets this message's body as a single document, with every document sequence folded in as
    /// an array under its identifier.
    pub(crate) fn into_document(self) -> Document {
        let mut document = self.document_payload;
        for sequence in self.document_sequences {
            let documents: Array = sequence.documents.into_iter().map(Into::into).collect();
            document.insert(sequence.identifier, documents);
        }
        document
    }

    /// Reads bytes from `reader` and deserializes them into a Message.
    pub(crate) async fn read_from<T: AsyncRead + Unpin>(
        reader: &mut T,
        max_message_size_bytes: Option<i32>,
    ) -> Result<Self> {
        let header = Header::read_from(reader).await?;
        let max_len = max_message_size_bytes.unwrap_or(DEFAULT_MAX_MESSAGE_SIZE_BYTES);
        if header.length > max_len {
            return Err(Error::protocol(format!(
                "Message length {} over maximum {}",
                header.length, max_len
            )));
        }
        let min_len = (Header::LENGTH + std::mem::size_of::<u32>()) as i32;
        if header.length < min_len {
            return Err(Error::protocol(format!(
                "Message length {} shorter than the minimum {}",
                header.length, min_len
            )));
        }

        let mut buf = vec![0u8; header.length as usize - Header::LENGTH];
        reader.read_exact(&mut buf).await?;

        match header.op_code {
            OpCode::Message => Self::read_op_msg(&header, &buf),
            OpCode::Compressed => Err(Error::protocol(
                "compressed messages are not supported on this connection",
            )),
            other => Err(Error::protocol(format!(
                "Invalid op code, expected {} and got {}",
                OpCode::Message as i32,
                other as i32
            ))),
        }
    }

    fn read_op_msg(header: &Header, mut reader: &[u8]) -> Result<Self> {
        let flags = MessageFlags::from_bits_truncate(reader.read_u32_sync()?);

        let checksum_len = if flags.contains(MessageFlags::CHECKSUM_PRESENT) {
            std::mem::size_of::<u32>()
        } else {
            0
        };
        if reader.len() < checksum_len {
            return Err(Error::protocol(
                "message flagged a checksum but is too short to hold one",
            ));
        }
        let (mut sections, mut checksum_bytes) = reader.split_at(reader.len() - checksum_len);

        let mut document_payload = None;
        let mut document_sequences = Vec::new();
        while !sections.is_empty() {
            match MessageSection::read(&mut sections)? {
                MessageSection::Document(document) => {
                    if document_payload.is_some() {
                        return Err(Error::protocol(
                            "an OP_MSG response must contain exactly one payload type 0 section",
                        ));
                    }
                    document_payload = Some(document);
                }
                MessageSection::Sequence(sequence) => document_sequences.push(sequence),
            }
        }

        let checksum = if checksum_len > 0 {
            Some(checksum_bytes.read_u32_sync()?)
        } else {
            None
        };

        Ok(Self {
            response_to: header.response_to,
            flags,
            document_payload: document_payload.ok_or_else(|| {
                Error::protocol(
                    "an OP_MSG response must contain exactly one payload type 0 section",
                )
            })?,
            document_sequences,
            checksum,
            request_id: Some(header.request_id),
        })
    }

    /// Serializes the Message to bytes and writes them to `writer`.
    #[cfg(test)]
    pub(crate) async fn write_to<T: AsyncWrite + Unpin>(&self, writer: &mut T) -> Result<()> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Serializes the Message, header included.
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let sections = self.get_sections_bytes()?;

        let total_length = Header::LENGTH
            + std::mem::size_of::<u32>()
            + sections.len()
            + self
                .checksum
                .as_ref()
                .map(std::mem::size_of_val)
                .unwrap_or(0);
        let length = i32::try_from(total_length).map_err(|_| {
            Error::invalid_command(format!("message of {} bytes is too large", total_length))
        })?;

        let header = Header {
            length,
            request_id: self.request_id.unwrap_or_else(next_request_id),
            response_to: self.response_to,
            op_code: OpCode::Message,
        };

        let mut bytes = Vec::with_capacity(total_length);
        header.write_to(&mut bytes);
        bytes.extend_from_slice(&self.flags.bits().to_le_bytes());
        bytes.extend(sections);
        if let Some(checksum) = self.checksum {
            bytes.extend_from_slice(&checksum.to_le_bytes());
        }

        Ok(bytes)
    }

    fn get_sections_bytes(&self) -> Result<Vec<u8>> {
        let mut sections = Vec::new();

        // Payload type 0
        sections.push(0);
        sections.extend(crate::bson::to_vec(&self.document_payload)?);

        for document_sequence in &self.document_sequences {
            // Payload type 1
            sections.push(1);

            let identifier_bytes = document_sequence.identifier.as_bytes();
            let mut documents = Vec::new();
            for document in &document_sequence.documents {
                documents.extend(crate::bson::to_vec(document)?);
            }

            // Size bytes + identifier bytes + null-terminator byte + document bytes
            let size = 4 + identifier_bytes.len() + 1 + documents.len();
            let size = i32::try_from(size).map_err(|_| {
                Error::invalid_command(format!("document sequence of {} bytes is too large", size))
            })?;
            sections.extend_from_slice(&size.to_le_bytes());
            sections.extend_from_slice(identifier_bytes);
            sections.push(0);
            sections.extend(documents);
        }

        Ok(sections)
    }
}

bitflags! {
    /// Represents the bitwise flags for an OP_MSG.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct MessageFlags: u32 {
        const CHECKSUM_PRESENT = 0b_0000_0000_0000_0000_0000_0000_0000_0001;
        const MORE_TO_COME     = 0b_0000_0000_0000_0000_0000_0000_0000_0010;
        const EXHAUST_ALLOWED  = 0b_0000_0000_0000_0001_0000_0000_0000_0000;
    }
}

/// Represents a section of an OP_MSG.
#[derive(Debug)]
enum MessageSection {
    Document(Document),
    Sequence(DocumentSequence),
}

impl MessageSection {
    /// Reads bytes from the front of `reader` and deserializes them into a MessageSection.
    fn read(reader: &mut &[u8]) -> Result<Self> {
        let payload_type = reader.read_u8_sync()?;

        match payload_type {
            0 => {
                let bytes = bson_util::read_document_bytes(&mut *reader)?;
                Ok(MessageSection::Document(crate::bson::from_slice(&bytes)?))
            }
            1 => {
                let size = reader.read_i32_sync()?;
                let body_len = usize::try_from(size)
                    .ok()
                    .and_then(|size| size.checked_sub(std::mem::size_of::<i32>()))
                    .filter(|len| *len <= reader.len())
                    .ok_or_else(|| {
                        Error::protocol(format!("invalid document sequence size {}", size))
                    })?;
                let (mut body, rest) = reader.split_at(body_len);
                *reader = rest;

                let identifier = read_cstring(&mut body)?;
                let mut documents = Vec::new();
                while !body.is_empty() {
                    let bytes = bson_util::read_document_bytes(&mut body)?;
                    documents.push(crate::bson::from_slice(&bytes)?);
                }

                Ok(MessageSection::Sequence(DocumentSequence {
                    identifier,
                    documents,
                }))
            }
            other => Err(Error::protocol(format!(
                "invalid OP_MSG payload type {}",
                other
            ))),
        }
    }
}
