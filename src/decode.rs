//! Streaming decode: pull PCM out of a decoder and push it into a sink.
//!
//! The cipher and the HCA bitstream decoder live behind [`DecoderFactory`].
//! A decoder is a single-pass pull source: every [`PcmSource::read`] call
//! yields some bytes, and a call yielding zero marks the end of the stream.
//! Decoders are never rewound; each entry gets a fresh one.

use std::io::{self, Write};

use thiserror::Error;

use crate::config::{DecoderConfig, DECODE_CHUNK_SIZE};

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Decoder error: {0}")]
    Codec(String),
    #[error("Decoder returned {returned} bytes for a {capacity}-byte buffer")]
    Overrun { returned: usize, capacity: usize },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Decoder traits ───────────────────────────────────────────────────────────

/// Pull-based PCM producer bound to one payload.
pub trait PcmSource {
    /// Fill up to `buf.len()` bytes.  `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError>;
}

/// Builds decoders for HCA payloads.
pub trait DecoderFactory: Send + Sync {
    fn create<'a>(
        &self,
        payload: &'a [u8],
        config:  &DecoderConfig,
    ) -> Result<Box<dyn PcmSource + 'a>, DecodeError>;
}

// ── Streaming ────────────────────────────────────────────────────────────────

/// Copy every chunk `decoder` produces into `sink`, in order, then flush.
///
/// Returns the number of bytes written.
pub fn stream_decode<W: Write + ?Sized>(
    decoder: &mut dyn PcmSource,
    sink:    &mut W,
) -> Result<u64, DecodeError> {
    let mut buf = vec![0u8; DECODE_CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let n = decoder.read(&mut buf)?;
        if n == 0 {
            break;
        }
        if n > buf.len() {
            return Err(DecodeError::Overrun { returned: n, capacity: buf.len() });
        }
        sink.write_all(&buf[..n])?;
        written += n as u64;
    }
    sink.flush()?;
    Ok(written)
}

/// Build a decoder for `payload` and stream its output into `sink`.
pub fn decode_payload<W: Write + ?Sized>(
    factory: &dyn DecoderFactory,
    payload: &[u8],
    config:  &DecoderConfig,
    sink:    &mut W,
) -> Result<u64, DecodeError> {
    let mut decoder = factory.create(payload, config)?;
    stream_decode(decoder.as_mut(), sink)
}
