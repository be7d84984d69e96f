//! DAG-CBOR encoding and self-delimiting record framing
//!
//! Structured values (nodes, capabilities, cache snapshots) are DAG-CBOR
//! encoded through [`CborEncoded`]. Sharing logs additionally need record
//! boundaries: a log is nothing but concatenated records, so each record is
//! framed as
//!
//! ```text
//! [ body length: u32 big-endian ][ DAG-CBOR body ]
//! ```
//!
//! [`parse_records`] consumes whole records from a buffer and stops at the
//! first incomplete one, reporting how many bytes it consumed. That offset is
//! always the start of the next record, so a caller can resume from it
//! without re-reading anything.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Size of the length prefix in front of every record body
pub const RECORD_HEADER_SIZE: usize = 4;
/// Upper bound on a single record body
pub const MAX_RECORD_SIZE: usize = 1 << 20;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("record of {0} bytes exceeds the maximum record size")]
    RecordTooLarge(usize),
    #[error("truncated record: {available} bytes left, no complete record")]
    Truncated { available: u64 },
}

/// Values stored as DAG-CBOR
pub trait CborEncoded: Serialize + DeserializeOwned {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_ipld_dagcbor::to_vec(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        serde_ipld_dagcbor::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Records fully parsed from a buffer, and the bytes they occupied
#[derive(Debug)]
pub struct ParsedRecords<T> {
    pub records: Vec<T>,
    pub bytes_consumed: usize,
}

/// Frame a value as a single log record
pub fn encode_record<T: CborEncoded>(value: &T) -> Result<Vec<u8>, CodecError> {
    let body = value.encode()?;
    if body.len() > MAX_RECORD_SIZE {
        return Err(CodecError::RecordTooLarge(body.len()));
    }

    let mut out = Vec::with_capacity(RECORD_HEADER_SIZE + body.len());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Length of the record starting at the front of `buf`, header included.
///  `None` if not even the header is available yet.
pub fn peek_record_len(buf: &[u8]) -> Option<usize> {
    if buf.len() < RECORD_HEADER_SIZE {
        return None;
    }
    let mut header = [0u8; RECORD_HEADER_SIZE];
    header.copy_from_slice(&buf[..RECORD_HEADER_SIZE]);
    Some(RECORD_HEADER_SIZE + u32::from_be_bytes(header) as usize)
}

/// Parse every complete record at the front of `buf`.
///
/// A trailing partial record is left unconsumed. A complete record whose
/// body does not decode, or whose header claims an oversized body, is an
/// error: the bytes are there, they are just not a record.
pub fn parse_records<T: CborEncoded>(buf: &[u8]) -> Result<ParsedRecords<T>, CodecError> {
    let mut records = Vec::new();
    let mut offset = 0;

    while let Some(record_len) = peek_record_len(&buf[offset..]) {
        let body_len = record_len - RECORD_HEADER_SIZE;
        if body_len > MAX_RECORD_SIZE {
            return Err(CodecError::RecordTooLarge(body_len));
        }
        if buf.len() - offset < record_len {
            break;
        }

        let body = &buf[offset + RECORD_HEADER_SIZE..offset + record_len];
        records.push(T::decode(body)?);
        offset += record_len;
    }

    Ok(ParsedRecords {
        records,
        bytes_consumed: offset,
    })
}
