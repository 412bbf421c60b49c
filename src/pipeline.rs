//! Pipeline orchestration for one container.
//!
//! Opens the container, asks the [`BankFormat`] for its archives, and runs
//! the batch processor once per archive found:
//!
//! | Section  | Backing stream          | Destination                          |
//! |----------|-------------------------|--------------------------------------|
//! | internal | the container file      | `<dir>/_acb_<container>/internal`   |
//! | external | the archive's own file  | `<dir>/_acb_<container>/external`   |
//!
//! A missing or unreadable section is logged and skipped.  A section whose
//! destination directory cannot be created stops the run; sections after it
//! are not attempted.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bank::{ArchiveSource, BankError, BankFormat, SoundBank};
use crate::batch::{self, ArchiveJob, BatchError};
use crate::config::ExtractOptions;
use crate::decode::DecoderFactory;
use crate::report::{BatchReport, EntryReport, PipelineReport};

/// Prefix of the per-container output directory.
pub const EXTRACT_DIR_PREFIX: &str = "_acb_";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Cannot open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("Cannot read sound bank {}: {source}", path.display())]
    Container { path: PathBuf, source: BankError },
    #[error(transparent)]
    Batch(#[from] BatchError),
}

// ── Backend ──────────────────────────────────────────────────────────────────

/// The container parser and decoder implementations a run uses.
#[derive(Clone, Copy)]
pub struct Backend<'a> {
    pub banks:    &'a dyn BankFormat,
    pub decoders: &'a dyn DecoderFactory,
}

impl<'a> Backend<'a> {
    pub fn new(banks: &'a dyn BankFormat, decoders: &'a dyn DecoderFactory) -> Self {
        Self { banks, decoders }
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

/// `<container dir>/_acb_<container file name>`.
pub fn extract_dir(container: &Path) -> PathBuf {
    let parent = container.parent().unwrap_or_else(|| Path::new(""));
    let name = container
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parent.join(format!("{EXTRACT_DIR_PREFIX}{name}"))
}

/// Extract and decode every HCA payload of `container`.
///
/// `on_entry` is called once per entry as it completes.  Entry failures are
/// part of the returned report; only container and directory failures are
/// returned as errors.
pub fn run(
    container: &Path,
    opts:      &ExtractOptions,
    backend:   &Backend<'_>,
    on_entry:  &mut dyn FnMut(&EntryReport),
) -> Result<PipelineReport, PipelineError> {
    let mut stream = File::open(container).map_err(|source| PipelineError::Open {
        path: container.to_path_buf(),
        source,
    })?;
    let bank = backend.banks.open(&mut stream, container).map_err(|source| PipelineError::Container {
        path: container.to_path_buf(),
        source,
    })?;

    let format_version = bank.format_version();
    let base = extract_dir(container);
    info!("Opened {} (format version {:#010x})", container.display(), format_version);

    let mut sections = Vec::new();

    // ── Internal ─────────────────────────────────────────────────────────────
    match bank.internal_archive() {
        Ok(Some(table)) => {
            let source = ArchiveSource::Internal { container: container.to_path_buf() };
            let dest = base.join(source.label());
            let job = ArchiveJob { source: &source, table: &table, dest_dir: &dest, format_version };
            sections.push(run_section(&job, &mut stream, opts, &*bank, backend.decoders, on_entry)?);
        }
        Ok(None) => debug!("{} has no internal archive", container.display()),
        Err(e)   => warn!("Skipping internal archive of {}: {}", container.display(), e),
    }

    // ── External ─────────────────────────────────────────────────────────────
    match bank.external_archive() {
        Ok(Some(external)) => match File::open(&external.path) {
            Ok(mut ext_stream) => {
                let source = ArchiveSource::External { path: external.path.clone() };
                let dest = base.join(source.label());
                let job = ArchiveJob { source: &source, table: &external.table, dest_dir: &dest, format_version };
                sections.push(run_section(&job, &mut ext_stream, opts, &*bank, backend.decoders, on_entry)?);
            }
            Err(e) => warn!("Skipping external archive {}: {}", external.path.display(), e),
        },
        Ok(None) => debug!("{} has no external archive", container.display()),
        Err(e)   => warn!("Skipping external archive of {}: {}", container.display(), e),
    }

    Ok(PipelineReport {
        container: container.to_path_buf(),
        format_version,
        sections,
    })
}

/// Sequential unless the `parallel` feature is on and more than one thread
/// was asked for.
fn run_section<R: Read + Seek + ?Sized>(
    job:      &ArchiveJob<'_>,
    stream:   &mut R,
    opts:     &ExtractOptions,
    bank:     &dyn SoundBank,
    decoders: &dyn DecoderFactory,
    on_entry: &mut dyn FnMut(&EntryReport),
) -> Result<BatchReport, BatchError> {
    #[cfg(feature = "parallel")]
    {
        if opts.threads > 1 {
            return batch::process_archive_parallel(job, opts, bank, decoders, on_entry);
        }
    }

    batch::process_archive(job, stream, opts, bank, decoders, on_entry)
}
