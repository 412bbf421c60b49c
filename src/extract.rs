//! Entry extraction: one bounded copy from a backing stream into memory.

use std::io::{self, Read, Seek, SeekFrom};

use crate::bank::EntryRecord;

/// Owned bytes of a single archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPayload {
    bytes: Vec<u8>,
}

impl StagedPayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] { &self.bytes }

    pub fn len(&self) -> usize { self.bytes.len() }

    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }

}

impl AsRef<[u8]> for StagedPayload {
    fn as_ref(&self) -> &[u8] { &self.bytes }
}

/// Read exactly `record.size` bytes starting at `record.offset`.
///
/// Always seeks first: entries are not guaranteed to be visited in physical
/// order and the stream may be shared between entries.  A range that runs
/// past the end of the stream fails with `UnexpectedEof`.
///
/// Memory grows with the bytes actually read, not with `record.size`.
pub fn extract_entry<R: Read + Seek + ?Sized>(
    source: &mut R,
    record: &EntryRecord,
) -> io::Result<StagedPayload> {
    source.seek(SeekFrom::Start(record.offset))?;
    let mut bytes = Vec::new();
    Read::take(&mut *source, u64::from(record.size)).read_to_end(&mut bytes)?;
    if bytes.len() as u64 != u64::from(record.size) {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "entry at offset {} needs {} bytes, stream has {}",
                record.offset, record.size, bytes.len(),
            ),
        ));
    }
    Ok(StagedPayload::new(bytes))
}
