//! Batch extraction of HCA audio from ACB sound banks.
//!
//! An ACB container holds up to two archives of audio payloads: one embedded
//! in the container and one in a sibling AWB file.  [`pipeline::run`] walks
//! both, classifies each payload, and decodes every HCA payload into
//! `<dir>/_acb_<container>/{internal,external}/*.wav`.
//!
//! Container parsing and HCA decoding are supplied by the host through
//! [`bank::BankFormat`] and [`decode::DecoderFactory`]:
//!
//! ```ignore
//! fn main() {
//!     let backend = acbx::Backend::new(&MyAcbParser, &MyHcaDecoders);
//!     std::process::exit(acbx::cli::run(std::env::args_os(), &backend));
//! }
//! ```

pub mod bank;
pub mod batch;
pub mod cli;
pub mod config;
pub mod decode;
pub mod extract;
pub mod naming;
pub mod pipeline;
pub mod report;
pub mod sniff;

pub use bank::{ArchiveSource, ArchiveTable, BankError, BankFormat, EntryRecord, SoundBank};
pub use config::{DecoderConfig, ExtractOptions};
pub use decode::{DecodeError, DecoderFactory, PcmSource};
pub use pipeline::{Backend, PipelineError};
pub use report::{EntryOutcome, EntryReport, PipelineReport};
