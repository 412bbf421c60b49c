//! Command-line front end.
//!
//! ```text
//! acbx <ACB> [-a <KEY1>] [-b <KEY2>] [-m <MODE>] [-n] [-j <N>] [-v...] [--json]
//! ```
//!
//! Hosts call [`run`] from their `main` with the backend they link against
//! and exit with the code it returns.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::config::{ExtractOptions, SampleMode};
use crate::pipeline::{self, Backend};

/// Extraction finished; entry failures, if any, are in the summary.
pub const EXIT_OK:      i32 = 0;
/// The container could not be read or an output directory could not be created.
pub const EXIT_FAILURE: i32 = 1;
/// Malformed command line.  Matches clap's own usage exit code.
pub const EXIT_USAGE:   i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "acbx", about = "Extract HCA audio from ACB sound banks into WAV files")]
pub struct Cli {
    /// ACB container to extract
    #[arg(value_name = "ACB")]
    pub container: Option<PathBuf>,

    /// Lower 32 bits of the HCA key, hexadecimal
    #[arg(short = 'a', value_name = "KEY1", value_parser = parse_hex_u32, default_value = "0")]
    pub key1: u32,

    /// Upper 32 bits of the HCA key, hexadecimal
    #[arg(short = 'b', value_name = "KEY2", value_parser = parse_hex_u32, default_value = "0")]
    pub key2: u32,

    /// PCM sample format of the decoded WAV files
    #[arg(short = 'm', long, value_enum, default_value_t = SampleMode::S16)]
    pub sample_mode: SampleMode,

    /// Name output files after cue names
    #[arg(short = 'n', long = "cue-names")]
    pub use_cue_name: bool,

    /// Worker threads per archive (effective with the `parallel` feature)
    #[arg(short = 'j', long, value_name = "N", default_value_t = 1)]
    pub threads: usize,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Print the run report as JSON after the summary
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Parse a 32-bit hexadecimal key, with or without a `0x` prefix.
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hexadecimal key '{s}': {e}"))
}

/// Logs go to stderr so the per-entry lines on stdout stay clean.
/// `RUST_LOG` overrides the verbosity flags.
pub fn init_logging(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parse `args` (program name first), run the pipeline, and return the
/// process exit code.
pub fn run<I, T>(args: I, backend: &Backend<'_>) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return e.exit_code();
        }
    };

    let Some(container) = cli.container.clone() else {
        let _ = Cli::command().print_help();
        println!();
        return EXIT_OK;
    };

    init_logging(cli.log_level());
    let opts = ExtractOptions::from_cli(&cli);

    match pipeline::run(&container, &opts, backend, &mut |entry| println!("{entry}")) {
        Ok(report) => {
            println!();
            println!("Summary: {}", report.summary());
            if cli.json {
                match report.to_json() {
                    Ok(json) => println!("{json}"),
                    Err(e)   => warn!("Could not serialise report: {}", e),
                }
            }
            EXIT_OK
        }
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_FAILURE
        }
    }
}
