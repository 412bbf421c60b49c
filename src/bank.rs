//! Sound-bank seams: the container table parser and cue-name lookups.
//!
//! The crate does not parse ACB/AWB layouts itself.  A host plugs in a
//! [`BankFormat`] that turns an opened container stream into a
//! [`SoundBank`]; the pipeline only consumes the tables it exposes.
//!
//! A container carries at most one archive embedded in its own bytes
//! (internal) and at most one archive stored in a sibling file (external).
//! Both are described by the same [`ArchiveTable`]; they differ only in how
//! their backing stream is obtained, see [`ArchiveSource`].

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Object-safe `Read + Seek`.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek + ?Sized> ReadSeek for T {}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum BankError {
    /// The bank has no name for this cue.  Callers fall back to a symbolic name.
    #[error("No cue name for cue #{0}")]
    CueNotFound(u32),
    #[error("Malformed sound bank: {0}")]
    Malformed(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Records ──────────────────────────────────────────────────────────────────

/// One payload's byte range inside its archive's backing stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryRecord {
    pub cue_id: u32,
    /// Aligned absolute offset in the backing stream.
    pub offset: u64,
    pub size:   u32,
}

/// Ordered entry table of one archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveTable {
    /// Entries in the archive's native order.
    pub entries:      Vec<EntryRecord>,
    /// Key modifier reported by the archive header.
    pub key_modifier: u32,
}

/// An archive that lives in a file next to the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalArchive {
    pub path:  PathBuf,
    pub table: ArchiveTable,
}

// ── ArchiveSource ────────────────────────────────────────────────────────────

/// Where an archive's payload bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    /// Embedded in the container; reads go through the container stream.
    Internal { container: PathBuf },
    /// Stored in its own file.
    External { path: PathBuf },
}

impl ArchiveSource {
    /// `"internal"` or `"external"`, used in reports and directory names.
    pub fn label(&self) -> &'static str {
        match self {
            ArchiveSource::Internal { .. } => "internal",
            ArchiveSource::External { .. } => "external",
        }
    }

    /// Path of the file backing this source.
    pub fn backing_path(&self) -> &Path {
        match self {
            ArchiveSource::Internal { container } => container,
            ArchiveSource::External { path }      => path,
        }
    }

    /// Open a fresh read handle on the backing file.
    pub fn open_stream(&self) -> io::Result<File> {
        File::open(self.backing_path())
    }
}

impl fmt::Display for ArchiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Collaborator traits ──────────────────────────────────────────────────────

/// Maps cue ids to human-readable cue names.
pub trait CueNameResolver {
    /// Returns [`BankError::CueNotFound`] when the bank has no name for `cue_id`.
    fn cue_name(&self, cue_id: u32) -> Result<String, BankError>;
}

/// A parsed container.
pub trait SoundBank: CueNameResolver + Send + Sync {
    /// Container format version, used to gate the key modifier.
    fn format_version(&self) -> u32;

    /// The archive embedded in the container, if any.
    fn internal_archive(&self) -> Result<Option<ArchiveTable>, BankError>;

    /// The archive referenced by the container, if any.  The path is resolved
    /// relative to the container already.
    fn external_archive(&self) -> Result<Option<ExternalArchive>, BankError>;
}

/// Container table parser.
pub trait BankFormat: Send + Sync {
    /// Parse the container read from `stream`, located at `path`.
    fn open(&self, stream: &mut dyn ReadSeek, path: &Path) -> Result<Box<dyn SoundBank>, BankError>;
}
