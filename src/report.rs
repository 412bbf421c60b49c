//! Per-entry outcomes and run summaries.
//!
//! Every processed entry yields one [`EntryReport`].  Its `Display` form is
//! the console line the CLI prints as each entry completes.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

// ── EntryOutcome ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryOutcome {
    /// Decoded into the destination file.
    Decoded { bytes: u64 },
    /// Extraction, naming, or decoding failed; no output file remains.
    Errored { message: String },
    /// Payload is not HCA; nothing was written.
    Skipped,
}

// ── EntryReport ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    /// `"internal"` or `"external"`.
    pub source:      &'static str,
    pub cue_id:      u32,
    pub offset:      u64,
    pub size:        u32,
    /// Set once the entry got as far as naming its output.
    pub destination: Option<PathBuf>,
    pub outcome:     EntryOutcome,
}

impl EntryReport {
    pub fn is_decoded(&self) -> bool { matches!(self.outcome, EntryOutcome::Decoded { .. }) }
    pub fn is_errored(&self) -> bool { matches!(self.outcome, EntryOutcome::Errored { .. }) }
    pub fn is_skipped(&self) -> bool { matches!(self.outcome, EntryOutcome::Skipped) }
}

impl fmt::Display for EntryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processing {} AFS: #{} (offset={}, size={})",
            self.source, self.cue_id, self.offset, self.size,
        )?;
        if let Some(dest) = &self.destination {
            write!(f, " to {}...", dest.display())?;
        } else {
            f.write_str("...")?;
        }
        match &self.outcome {
            EntryOutcome::Decoded { .. }      => f.write_str(" decoded"),
            EntryOutcome::Errored { message } => write!(f, " errored: {message}"),
            EntryOutcome::Skipped             => f.write_str(" skipped (not HCA)"),
        }
    }
}

// ── BatchReport ───────────────────────────────────────────────────────────────

/// Result of processing one archive section.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub source:       &'static str,
    pub directory:    PathBuf,
    /// Key modifier actually used for this section.
    pub key_modifier: u32,
    pub entries:      Vec<EntryReport>,
}

impl BatchReport {
    pub fn decoded(&self) -> usize { self.entries.iter().filter(|e| e.is_decoded()).count() }
    pub fn errored(&self) -> usize { self.entries.iter().filter(|e| e.is_errored()).count() }
    pub fn skipped(&self) -> usize { self.entries.iter().filter(|e| e.is_skipped()).count() }
}

// ── PipelineReport ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub container:      PathBuf,
    pub format_version: u32,
    pub sections:       Vec<BatchReport>,
}

impl PipelineReport {
    pub fn total(&self)   -> usize { self.sections.iter().map(|s| s.entries.len()).sum() }
    pub fn decoded(&self) -> usize { self.sections.iter().map(BatchReport::decoded).sum() }
    pub fn errored(&self) -> usize { self.sections.iter().map(BatchReport::errored).sum() }
    pub fn skipped(&self) -> usize { self.sections.iter().map(BatchReport::skipped).sum() }

    pub fn summary(&self) -> String {
        format!(
            "{} decoded, {} errored, {} skipped (of {} entries in {} section(s))",
            self.decoded(), self.errored(), self.skipped(), self.total(), self.sections.len(),
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(outcome: EntryOutcome, destination: Option<&str>) -> EntryReport {
        EntryReport {
            source: "internal",
            cue_id: 12,
            offset: 2048,
            size:   512,
            destination: destination.map(PathBuf::from),
            outcome,
        }
    }

    #[test]
    fn console_lines() {
        let dest = PathBuf::from("out").join("dat_000012.wav");
        let dest_str = dest.to_str().unwrap();

        let decoded = entry(EntryOutcome::Decoded { bytes: 10 }, Some(dest_str));
        assert_eq!(
            decoded.to_string(),
            format!("Processing internal AFS: #12 (offset=2048, size=512) to {}... decoded", dest.display()),
        );

        let errored = entry(EntryOutcome::Errored { message: "bad header".into() }, Some(dest_str));
        assert!(errored.to_string().ends_with("... errored: bad header"));

        let skipped = entry(EntryOutcome::Skipped, None);
        assert_eq!(
            skipped.to_string(),
            "Processing internal AFS: #12 (offset=2048, size=512)... skipped (not HCA)",
        );
    }

    #[test]
    fn totals_and_json() {
        let report = PipelineReport {
            container: PathBuf::from("se.acb"),
            format_version: 0x0130_0000,
            sections: vec![BatchReport {
                source: "internal",
                directory: PathBuf::from("_acb_se.acb/internal"),
                key_modifier: 0,
                entries: vec![
                    entry(EntryOutcome::Decoded { bytes: 10 }, Some("a.wav")),
                    entry(EntryOutcome::Skipped, None),
                    entry(EntryOutcome::Errored { message: "x".into() }, Some("b.wav")),
                ],
            }],
        };
        assert_eq!((report.total(), report.decoded(), report.errored(), report.skipped()), (3, 1, 1, 1));
        assert!(report.summary().starts_with("1 decoded, 1 errored, 1 skipped"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["sections"][0]["entries"][1]["outcome"]["status"], "skipped");
        assert_eq!(json["sections"][0]["entries"][0]["outcome"]["bytes"], 10);
    }
}
