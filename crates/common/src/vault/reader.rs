use bytes::Bytes;

use crate::codec::{parse_records, peek_record_len, CborEncoded, CodecError, ParsedRecords};

use super::FsError;

/// Seekable cursor over a file's content
#[derive(Debug, Clone)]
pub struct FileReader {
    data: Bytes,
    position: u64,
}

impl FileReader {
    pub fn new(data: Bytes) -> Self {
        Self { data, position: 0 }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn remaining(&self) -> u64 {
        self.len() - self.position
    }

    pub fn seek(&mut self, offset: u64) -> Result<(), FsError> {
        if offset > self.len() {
            return Err(FsError::InvalidSeek {
                offset,
                len: self.len(),
            });
        }
        self.position = offset;
        Ok(())
    }

    /// Copy up to `buf.len()` bytes from the current position, returning
    ///  how many were copied
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        let start = self.position as usize;
        let n = buf.len().min(self.remaining() as usize);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.position += n as u64;
        n
    }

    /// Parse whole records from the next `max_bytes` bytes and advance past
    ///  them.
    ///
    /// If the record at the current position does not fit in `max_bytes`
    ///  the window is widened to that one record, so every call with data
    ///  left either makes progress or fails. A record that runs past the end
    ///  of the file is [`CodecError::Truncated`].
    pub fn parse_stream<T: CborEncoded>(
        &mut self,
        max_bytes: u64,
    ) -> Result<ParsedRecords<T>, CodecError> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(ParsedRecords {
                records: Vec::new(),
                bytes_consumed: 0,
            });
        }

        let start = self.position as usize;
        let window = max_bytes.min(remaining) as usize;
        let mut parsed = parse_records::<T>(&self.data[start..start + window])?;

        if parsed.bytes_consumed == 0 {
            match peek_record_len(&self.data[start..]) {
                Some(record_len) if record_len as u64 <= remaining => {
                    parsed = parse_records::<T>(&self.data[start..start + record_len])?;
                }
                _ => return Err(CodecError::Truncated { available: remaining }),
            }
        }

        self.position += parsed.bytes_consumed as u64;
        Ok(parsed)
    }
}
