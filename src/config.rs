//! Decoder parameters and run options.
//!
//! A [`DecoderConfig`] is fixed for the whole run except for the cipher's
//! key modifier, which each archive recomputes through
//! [`effective_key_modifier`] before decoding its first entry.

use clap::ValueEnum;
use serde::Serialize;

/// First container format version whose archives carry a usable HCA key
/// modifier.  Below this version the modifier is always zero.
pub const KEY_MODIFIER_ENABLED_VERSION: u32 = 0x0130_0000;

/// Bytes requested from the decoder per pull.
pub const DECODE_CHUNK_SIZE: usize = 10240;

// ── SampleMode ────────────────────────────────────────────────────────────────

/// PCM sample layout the decoder emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SampleMode {
    U8,
    #[default]
    S16,
    S24,
    S32,
    F32,
}

impl SampleMode {
    pub fn bits_per_sample(self) -> u16 {
        match self {
            SampleMode::U8  => 8,
            SampleMode::S16 => 16,
            SampleMode::S24 => 24,
            SampleMode::S32 => 32,
            SampleMode::F32 => 32,
        }
    }
}

// ── CipherConfig ──────────────────────────────────────────────────────────────

/// The (key1, key2, key_modifier) key schedule handed to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CipherConfig {
    pub key1:         u32,
    pub key2:         u32,
    pub key_modifier: u32,
}

// ── DecoderConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecoderConfig {
    /// Prepend a RIFF/WAVE header to the decoded samples.
    pub wave_header_enabled: bool,
    pub sample_mode:         SampleMode,
    pub cipher:              CipherConfig,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            wave_header_enabled: true,
            sample_mode:         SampleMode::S16,
            cipher:              CipherConfig::default(),
        }
    }
}

impl DecoderConfig {
    /// Copy of this config with the key modifier an archive should decode with.
    pub fn for_archive(&self, format_version: u32, archive_modifier: u32) -> Self {
        let mut config = *self;
        config.cipher.key_modifier = effective_key_modifier(format_version, archive_modifier);
        config
    }
}

/// The archive's modifier when the container format supports it, otherwise 0.
pub fn effective_key_modifier(format_version: u32, archive_modifier: u32) -> u32 {
    if format_version >= KEY_MODIFIER_ENABLED_VERSION {
        archive_modifier
    } else {
        0
    }
}

// ── ExtractOptions ────────────────────────────────────────────────────────────

/// Configuration for [`crate::pipeline::run`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Template config; `cipher.key_modifier` is overwritten per archive.
    pub decoder:      DecoderConfig,
    /// Name outputs after cue names where the bank has them.
    pub use_cue_name: bool,
    /// Worker threads per archive.  Values above 1 only take effect with the
    /// `parallel` feature.
    pub threads:      usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            decoder:      DecoderConfig::default(),
            use_cue_name: false,
            threads:      1,
        }
    }
}

impl ExtractOptions {
    pub fn from_cli(cli: &crate::cli::Cli) -> Self {
        let mut opts = Self::default();
        opts.decoder.cipher.key1 = cli.key1;
        opts.decoder.cipher.key2 = cli.key2;
        opts.decoder.sample_mode = cli.sample_mode;
        opts.use_cue_name = cli.use_cue_name;
        opts.threads = cli.threads.max(1);
        opts
    }
}
