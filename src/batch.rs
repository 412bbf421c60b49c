//! Batch processing of one archive section.
//!
//! For every entry of an [`ArchiveTable`], in table order:
//!
//! 1. extract its byte range ([`extract_entry`]),
//! 2. sniff for HCA ([`is_possible_hca`]); anything else is skipped,
//! 3. name the output ([`output_file_name`]),
//! 4. decode into the output file ([`decode_payload`]).
//!
//! A failure in any step is confined to its entry: a partially written
//! output is removed, the failure is logged and reported, and the batch moves
//! on.  Only failing to create the destination directory aborts a section.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bank::{ArchiveSource, ArchiveTable, BankError, CueNameResolver, EntryRecord};
use crate::config::{DecoderConfig, ExtractOptions};
use crate::decode::{decode_payload, DecodeError, DecoderFactory};
use crate::extract::extract_entry;
use crate::naming::{output_file_name, OutputTarget};
use crate::report::{BatchReport, EntryOutcome, EntryReport};
use crate::sniff::is_possible_hca;

// ── Error types ──────────────────────────────────────────────────────────────

/// Aborts a whole archive section.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[cfg(feature = "parallel")]
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Failure of a single entry.  Never escapes the batch.
#[derive(Error, Debug)]
pub enum EntryError {
    #[error("{0}")]
    Extract(io::Error),
    #[error("{0}")]
    CueName(#[from] BankError),
    #[error("cannot create {}: {source}", path.display())]
    Output { path: PathBuf, source: io::Error },
    #[error("{0}")]
    Decode(#[from] DecodeError),
}

// ── ArchiveJob ───────────────────────────────────────────────────────────────

/// Everything that identifies one section's work.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveJob<'a> {
    pub source:         &'a ArchiveSource,
    pub table:          &'a ArchiveTable,
    pub dest_dir:       &'a Path,
    /// Container format version, gates the key modifier.
    pub format_version: u32,
}

// ── Sequential ───────────────────────────────────────────────────────────────

/// Process every entry of `job.table`, reading payloads from `stream`.
///
/// `on_entry` sees each entry's report as soon as that entry is finished.
/// Per-entry failures are reported, never returned.
pub fn process_archive<R, N>(
    job:      &ArchiveJob<'_>,
    stream:   &mut R,
    opts:     &ExtractOptions,
    resolver: &N,
    decoders: &dyn DecoderFactory,
    on_entry: &mut dyn FnMut(&EntryReport),
) -> Result<BatchReport, BatchError>
where
    R: Read + Seek + ?Sized,
    N: CueNameResolver + ?Sized,
{
    let config = prepare(job, opts)?;

    let mut entries = Vec::with_capacity(job.table.entries.len());
    let mut seen = HashSet::new();
    for record in &job.table.entries {
        let report = process_entry(job, stream, record, opts.use_cue_name, &config, resolver, decoders);
        finish_entry(&mut seen, &report, on_entry);
        entries.push(report);
    }

    Ok(batch_report(job, &config, entries))
}

// ── Parallel ─────────────────────────────────────────────────────────────────

/// Like [`process_archive`], but decodes entries on a pool of `opts.threads`
/// workers.  Each worker reads through its own handle from
/// [`ArchiveSource::open_stream`].  Entries that resolve to the same output
/// file share one lane and run in table order, so the last of them wins as
/// in the sequential path.  Reports reach `on_entry` in table order once the
/// pool is done.
#[cfg(feature = "parallel")]
pub fn process_archive_parallel<N>(
    job:      &ArchiveJob<'_>,
    opts:     &ExtractOptions,
    resolver: &N,
    decoders: &dyn DecoderFactory,
    on_entry: &mut dyn FnMut(&EntryReport),
) -> Result<BatchReport, BatchError>
where
    N: CueNameResolver + Sync + ?Sized,
{
    use rayon::prelude::*;

    // Directory exists before any worker starts.
    let config = prepare(job, opts)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.threads.max(1))
        .build()?;

    let use_cue_name = opts.use_cue_name;
    let lanes = output_lanes(job.table, use_cue_name, resolver);
    debug!("{} entries in {} lanes", job.table.entries.len(), lanes.len());

    let mut indexed: Vec<(usize, EntryReport)> = pool.install(|| {
        lanes
            .par_iter()
            .map_init(
                || job.source.open_stream(),
                |stream, lane| {
                    lane.iter()
                        .map(|&index| {
                            let record = &job.table.entries[index];
                            let report = match stream {
                                Ok(file) => process_entry(job, file, record, use_cue_name, &config, resolver, decoders),
                                Err(e) => {
                                    warn!(
                                        "Cannot open {} for cue #{}: {}",
                                        job.source.backing_path().display(), record.cue_id, e,
                                    );
                                    unprocessed(job.source, record, format!("cannot open source: {e}"))
                                }
                            };
                            (index, report)
                        })
                        .collect::<Vec<_>>()
                },
            )
            .flatten()
            .collect()
    });
    indexed.sort_unstable_by_key(|(index, _)| *index);
    let entries: Vec<EntryReport> = indexed.into_iter().map(|(_, report)| report).collect();

    let mut seen = HashSet::new();
    for report in &entries {
        finish_entry(&mut seen, report, on_entry);
    }

    Ok(batch_report(job, &config, entries))
}

/// Entry indices grouped by output file name, each group in table order.
/// Entries whose name cannot be resolved get a lane of their own.
#[cfg(feature = "parallel")]
fn output_lanes<N>(table: &ArchiveTable, use_cue_name: bool, resolver: &N) -> Vec<Vec<usize>>
where
    N: CueNameResolver + ?Sized,
{
    use std::collections::hash_map::Entry;
    use std::collections::HashMap;

    let mut lanes: Vec<Vec<usize>> = Vec::with_capacity(table.entries.len());
    let mut by_name: HashMap<String, usize> = HashMap::new();
    for (index, record) in table.entries.iter().enumerate() {
        match output_file_name(record.cue_id, use_cue_name, resolver) {
            Ok(name) => match by_name.entry(name) {
                Entry::Occupied(lane) => lanes[*lane.get()].push(index),
                Entry::Vacant(slot) => {
                    slot.insert(lanes.len());
                    lanes.push(vec![index]);
                }
            },
            Err(_) => lanes.push(vec![index]),
        }
    }
    lanes
}

// ── Internals ────────────────────────────────────────────────────────────────

/// Create the destination directory and derive the section's decoder config.
fn prepare(job: &ArchiveJob<'_>, opts: &ExtractOptions) -> Result<DecoderConfig, BatchError> {
    fs::create_dir_all(job.dest_dir).map_err(|source| BatchError::CreateDir {
        path: job.dest_dir.to_path_buf(),
        source,
    })?;

    let config = opts.decoder.for_archive(job.format_version, job.table.key_modifier);
    info!(
        "Extracting {} {} entries into {}",
        job.table.entries.len(),
        job.source,
        job.dest_dir.display(),
    );
    debug!(
        "Format version {:#010x}, archive key modifier {:#06x}, effective {:#06x}, {}-bit output",
        job.format_version,
        job.table.key_modifier,
        config.cipher.key_modifier,
        config.sample_mode.bits_per_sample(),
    );
    Ok(config)
}

fn process_entry<R, N>(
    job:          &ArchiveJob<'_>,
    stream:       &mut R,
    record:       &EntryRecord,
    use_cue_name: bool,
    config:       &DecoderConfig,
    resolver:     &N,
    decoders:     &dyn DecoderFactory,
) -> EntryReport
where
    R: Read + Seek + ?Sized,
    N: CueNameResolver + ?Sized,
{
    let mut destination = None;
    let outcome = match decode_entry(
        stream, record, use_cue_name, config, job.dest_dir, resolver, decoders, &mut destination,
    ) {
        Ok(Some(bytes)) => {
            debug!("Decoded cue #{} ({} bytes of PCM)", record.cue_id, bytes);
            EntryOutcome::Decoded { bytes }
        }
        Ok(None) => EntryOutcome::Skipped,
        Err(e) => {
            warn!("Cue #{} in {} archive failed: {}", record.cue_id, job.source, e);
            EntryOutcome::Errored { message: e.to_string() }
        }
    };

    EntryReport {
        source: job.source.label(),
        cue_id: record.cue_id,
        offset: record.offset,
        size:   record.size,
        destination,
        outcome,
    }
}

/// `Ok(None)` for a non-HCA payload, `Ok(Some(bytes))` once decoded.
#[allow(clippy::too_many_arguments)]
fn decode_entry<R, N>(
    stream:       &mut R,
    record:       &EntryRecord,
    use_cue_name: bool,
    config:       &DecoderConfig,
    dest_dir:     &Path,
    resolver:     &N,
    decoders:     &dyn DecoderFactory,
    destination:  &mut Option<PathBuf>,
) -> Result<Option<u64>, EntryError>
where
    R: Read + Seek + ?Sized,
    N: CueNameResolver + ?Sized,
{
    let payload = extract_entry(stream, record).map_err(EntryError::Extract)?;

    if !is_possible_hca(payload.as_bytes()) {
        let head = &payload.as_bytes()[..payload.len().min(4)];
        debug!("Cue #{} is not HCA (leading bytes {})", record.cue_id, hex::encode(head));
        return Ok(None);
    }

    let name = output_file_name(record.cue_id, use_cue_name, resolver)?;
    let path = OutputTarget::new(dest_dir, name).path();
    *destination = Some(path.clone());

    match write_decoded(&path, payload.as_bytes(), config, decoders) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) => {
            remove_partial(&path);
            Err(e)
        }
    }
}

/// The output file is closed when this returns, on success and failure alike.
fn write_decoded(
    path:     &Path,
    payload:  &[u8],
    config:   &DecoderConfig,
    decoders: &dyn DecoderFactory,
) -> Result<u64, EntryError> {
    let file = File::create(path).map_err(|source| EntryError::Output {
        path: path.to_path_buf(),
        source,
    })?;
    let mut sink = BufWriter::new(file);
    Ok(decode_payload(decoders, payload, config, &mut sink)?)
}

fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial output {}: {}", path.display(), e),
    }
}

/// Report delivery plus the overwrite check, in table order.
fn finish_entry(
    seen:     &mut HashSet<PathBuf>,
    report:   &EntryReport,
    on_entry: &mut dyn FnMut(&EntryReport),
) {
    if let (Some(dest), true) = (&report.destination, report.is_decoded()) {
        if !seen.insert(dest.clone()) {
            warn!("Cue #{} overwrote {}", report.cue_id, dest.display());
        }
    }
    on_entry(report);
}

#[cfg(feature = "parallel")]
fn unprocessed(source: &ArchiveSource, record: &EntryRecord, message: String) -> EntryReport {
    EntryReport {
        source:      source.label(),
        cue_id:      record.cue_id,
        offset:      record.offset,
        size:        record.size,
        destination: None,
        outcome:     EntryOutcome::Errored { message },
    }
}

fn batch_report(job: &ArchiveJob<'_>, config: &DecoderConfig, entries: Vec<EntryReport>) -> BatchReport {
    BatchReport {
        source:       job.source.label(),
        directory:    job.dest_dir.to_path_buf(),
        key_modifier: config.cipher.key_modifier,
        entries,
    }
}
