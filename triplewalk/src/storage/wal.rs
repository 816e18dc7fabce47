//! Log record codec for the durable engine.
//!
//! The log is a flat sequence of self-delimiting records. A record carries
//! a group of puts that must be replayed together.
//!
//! # Log Record Format
//!
//! ```text
//! +----------+--------------------------------------------------+
//! | 0-3      | record_length (4 bytes, includes header+trailer) |
//! | 4        | record_type (1 byte)                             |
//! | 5-8      | entry_count (4 bytes)                            |
//! | 9-N      | entries: key_len u32, key, value_len u32, value  |
//! | N-N+3    | CRC32 checksum (4 bytes)                         |
//! +----------+--------------------------------------------------+
//! ```
//!
//! All integers are little-endian. The checksum covers every byte before it.

use std::io::Write;

/// `record_length` (4) + `record_type` (1) + `entry_count` (4) = 9 bytes
const RECORD_HEADER_SIZE: usize = 9;

/// CRC32 checksum size at end of record.
const CHECKSUM_SIZE: usize = 4;

/// Log record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogRecordType {
    /// A put or an atomic batch of puts.
    Batch = 0x01,
    /// Full table image written by compaction.
    Snapshot = 0x02,
}

impl TryFrom<u8> for LogRecordType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Batch),
            0x02 => Ok(Self::Snapshot),
            _ => Err(value),
        }
    }
}

/// One decoded log record.
#[derive(Debug, PartialEq, Eq)]
pub struct LogRecord {
    pub record_type: LogRecordType,
    pub entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl LogRecord {
    #[must_use]
    pub const fn new(record_type: LogRecordType, entries: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            record_type,
            entries,
        }
    }

    /// Total serialized size of this record.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        let entries: usize = self
            .entries
            .iter()
            .map(|(k, v)| 8 + k.len() + v.len())
            .sum();
        RECORD_HEADER_SIZE + entries + CHECKSUM_SIZE
    }

    /// Serialize this record.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WalError> {
        let total_len = self.serialized_size();
        let too_large = |_| WalError::RecordTooLarge {
            size: total_len as u64,
        };
        let record_len = u32::try_from(total_len).map_err(too_large)?;
        let count = u32::try_from(self.entries.len()).map_err(too_large)?;

        let mut bytes = Vec::with_capacity(total_len);
        bytes.extend_from_slice(&record_len.to_le_bytes());
        bytes.push(self.record_type as u8);
        bytes.extend_from_slice(&count.to_le_bytes());
        for (key, value) in &self.entries {
            for field in [key, value] {
                let len = u32::try_from(field.len()).map_err(too_large)?;
                bytes.extend_from_slice(&len.to_le_bytes());
                bytes.extend_from_slice(field);
            }
        }

        // computed over everything before it
        let checksum = crc32fast::hash(&bytes);
        bytes.extend_from_slice(&checksum.to_le_bytes());
        Ok(bytes)
    }

    /// Deserialize a record from the start of `bytes`.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), WalError> {
        let mut reader = FieldReader::new(bytes);
        let record_len = reader.u32()? as usize;
        if record_len < RECORD_HEADER_SIZE + CHECKSUM_SIZE {
            return Err(WalError::CorruptRecord);
        }
        if record_len > bytes.len() {
            return Err(WalError::Truncated {
                needed: record_len,
                available: bytes.len(),
            });
        }

        let body = &bytes[..record_len - CHECKSUM_SIZE];
        let stored = FieldReader::new(&bytes[record_len - CHECKSUM_SIZE..record_len]).u32()?;
        let computed = crc32fast::hash(body);
        if stored != computed {
            return Err(WalError::ChecksumMismatch {
                expected: stored,
                actual: computed,
            });
        }

        let mut reader = FieldReader::new(body);
        reader.take(4)?;
        let record_type =
            LogRecordType::try_from(reader.u8()?).map_err(WalError::InvalidRecordType)?;
        let count = reader.u32()? as usize;
        let mut entries = Vec::with_capacity(count.min(body.len() / 8));
        for _ in 0..count {
            let key_len = reader.u32()? as usize;
            let key = reader.take(key_len)?.to_vec();
            let value_len = reader.u32()? as usize;
            let value = reader.take(value_len)?.to_vec();
            entries.push((key, value));
        }
        if !reader.is_empty() {
            return Err(WalError::CorruptRecord);
        }

        Ok((Self::new(record_type, entries), record_len))
    }
}

/// Bounds-checked little-endian reads over a record body.
struct FieldReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WalError> {
        let end = self.pos.checked_add(n).ok_or(WalError::CorruptRecord)?;
        let slice = self.bytes.get(self.pos..end).ok_or(WalError::Truncated {
            needed: end,
            available: self.bytes.len(),
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, WalError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, WalError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    const fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}

/// Outcome of replaying a log image.
#[derive(Debug)]
pub struct Replay {
    /// Records decoded before the first failure, in log order.
    pub records: Vec<LogRecord>,
    /// Length of the valid prefix of the log.
    pub valid_len: u64,
    /// Why replay stopped early, if it did.
    pub stopped_by: Option<WalError>,
}

/// Decode records from a log image until the end or the first bad record.
#[must_use]
pub fn replay(bytes: &[u8]) -> Replay {
    let mut records = Vec::new();
    let mut offset = 0usize;
    let mut stopped_by = None;
    while offset < bytes.len() {
        match LogRecord::from_bytes(&bytes[offset..]) {
            Ok((record, consumed)) => {
                records.push(record);
                offset += consumed;
            }
            Err(e) => {
                stopped_by = Some(e);
                break;
            }
        }
    }
    Replay {
        records,
        valid_len: offset as u64,
        stopped_by,
    }
}

/// Append-only log writer.
#[derive(Debug)]
pub struct Wal<F: Write> {
    file: F,
    /// Bytes in the log, including those present before this writer opened.
    len: u64,
}

impl<F: Write> Wal<F> {
    /// Wrap a writer positioned at the end of a log of `len` bytes.
    #[must_use]
    pub const fn new(file: F, len: u64) -> Self {
        Self { file, len }
    }

    /// Append a record, returning the offset it was written at.
    pub fn append(&mut self, record: &LogRecord) -> Result<u64, WalError> {
        let bytes = record.to_bytes()?;
        let offset = self.len;
        self.file.write_all(&bytes)?;
        self.file.flush()?;
        self.len += bytes.len() as u64;
        Ok(offset)
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn get_ref(&self) -> &F {
        &self.file
    }
}

/// Errors that can occur reading or writing the log.
#[derive(Debug)]
pub enum WalError {
    /// I/O error.
    Io(std::io::Error),
    /// Structurally invalid record.
    CorruptRecord,
    /// The log ends partway through a record.
    Truncated { needed: usize, available: usize },
    /// Invalid record type byte.
    InvalidRecordType(u8),
    /// Checksum mismatch.
    ChecksumMismatch { expected: u32, actual: u32 },
    /// Record does not fit the 32-bit length field.
    RecordTooLarge { size: u64 },
}

impl std::fmt::Display for WalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "log I/O error: {e}"),
            Self::CorruptRecord => write!(f, "corrupt log record"),
            Self::Truncated { needed, available } => {
                write!(f, "truncated log record: need {needed} bytes, have {available}")
            }
            Self::InvalidRecordType(t) => write!(f, "invalid log record type: 0x{t:02x}"),
            Self::ChecksumMismatch { expected, actual } => {
                write!(
                    f,
                    "log checksum mismatch: expected 0x{expected:08x}, got 0x{actual:08x}"
                )
            }
            Self::RecordTooLarge { size } => write!(f, "log record too large: {size} bytes"),
        }
    }
}

impl std::error::Error for WalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WalError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(entries: &[(&str, &str)]) -> LogRecord {
        LogRecord::new(
            LogRecordType::Batch,
            entries
                .iter()
                .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
                .collect(),
        )
    }

    #[test]
    fn test_log_record_roundtrip() {
        let record = batch(&[("\x00a\x00p\x00b\x00", "today"), ("k", "")]);
        let bytes = record.to_bytes().unwrap();
        assert_eq!(bytes.len(), record.serialized_size());

        let (decoded, consumed) = LogRecord::from_bytes(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_empty_snapshot_record() {
        let record = LogRecord::new(LogRecordType::Snapshot, Vec::new());
        let bytes = record.to_bytes().unwrap();
        assert_eq!(bytes.len(), RECORD_HEADER_SIZE + CHECKSUM_SIZE);
        let (decoded, _) = LogRecord::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.record_type, LogRecordType::Snapshot);
        assert!(decoded.entries.is_empty());
    }

    #[test]
    fn test_checksum_validation() {
        let mut bytes = batch(&[("a", "1")]).to_bytes().unwrap();
        // Corrupt a byte of the key
        bytes[RECORD_HEADER_SIZE + 4] ^= 0xFF;

        let result = LogRecord::from_bytes(&bytes);
        assert!(matches!(result, Err(WalError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_truncated_record() {
        let bytes = batch(&[("a", "1")]).to_bytes().unwrap();
        let result = LogRecord::from_bytes(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(WalError::Truncated { .. })));

        let result = LogRecord::from_bytes(&bytes[..2]);
        assert!(matches!(result, Err(WalError::Truncated { .. })));
    }

    #[test]
    fn test_replay_stops_at_torn_tail() {
        let first = batch(&[("a", "1")]).to_bytes().unwrap();
        let second = batch(&[("b", "2"), ("c", "3")]).to_bytes().unwrap();
        let mut log = first.clone();
        log.extend_from_slice(&second);
        log.extend_from_slice(&second[..5]);

        let replay = replay(&log);
        assert_eq!(replay.records.len(), 2);
        assert_eq!(replay.valid_len, (first.len() + second.len()) as u64);
        assert!(matches!(replay.stopped_by, Some(WalError::Truncated { .. })));
    }

    #[test]
    fn test_wal_append_tracks_offsets() {
        let mut wal = Wal::new(Vec::new(), 0);
        assert!(wal.is_empty());
        let first = wal.append(&batch(&[("a", "1")])).unwrap();
        let second = wal.append(&batch(&[("b", "2")])).unwrap();
        assert_eq!(first, 0);
        assert!(second > 0);
        assert_eq!(wal.len(), wal.get_ref().len() as u64);

        let replay = replay(wal.get_ref());
        assert_eq!(replay.records.len(), 2);
        assert!(replay.stopped_by.is_none());
    }

    #[test]
    fn test_record_type_conversion() {
        assert_eq!(LogRecordType::try_from(0x01), Ok(LogRecordType::Batch));
        assert_eq!(LogRecordType::try_from(0x02), Ok(LogRecordType::Snapshot));
        assert_eq!(LogRecordType::try_from(0x7F), Err(0x7F));
    }
}
