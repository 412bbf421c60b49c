//! In-memory sound banks and a toy decoder shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use acbx::bank::{
    ArchiveTable, BankError, BankFormat, CueNameResolver, EntryRecord, ExternalArchive, ReadSeek,
    SoundBank,
};
use acbx::config::DecoderConfig;
use acbx::decode::{DecodeError, DecoderFactory, PcmSource};

pub const ALIGN: u64 = 0x20;
pub const MODERN_VERSION: u32 = 0x0130_0000;
pub const LEGACY_VERSION: u32 = 0x0121_0000;

// ── Payloads ─────────────────────────────────────────────────────────────────

pub fn hca(body: &[u8]) -> Vec<u8> {
    let mut v = b"HCA\0".to_vec();
    v.extend_from_slice(body);
    v
}

/// HCA with the cipher's high-bit signature obfuscation.
pub fn masked_hca(body: &[u8]) -> Vec<u8> {
    let mut v = vec![0xC8, 0xC3, 0xC1, 0x00];
    v.extend_from_slice(body);
    v
}

/// Decodes to a 4-byte header, then fails.
pub fn broken_hca() -> Vec<u8> {
    hca(b"FAIL and then some")
}

// ── Files on disk ────────────────────────────────────────────────────────────

/// Write `payloads` after a `header`, each aligned to [`ALIGN`], and return
/// the matching records in the given order.
pub fn write_archive_file(path: &Path, header: &[u8], payloads: &[(u32, Vec<u8>)]) -> Vec<EntryRecord> {
    let mut bytes = header.to_vec();
    let mut records = Vec::new();
    for (cue_id, payload) in payloads {
        while bytes.len() as u64 % ALIGN != 0 {
            bytes.push(0);
        }
        records.push(EntryRecord {
            cue_id: *cue_id,
            offset: bytes.len() as u64,
            size:   payload.len() as u32,
        });
        bytes.extend_from_slice(payload);
    }
    fs::write(path, bytes).unwrap();
    records
}

pub fn write_container(dir: &Path, name: &str, payloads: &[(u32, Vec<u8>)]) -> (PathBuf, Vec<EntryRecord>) {
    let path = dir.join(name);
    let records = write_archive_file(&path, b"@UTF\0\0\0\0container-table", payloads);
    (path, records)
}

pub fn write_awb(dir: &Path, name: &str, payloads: &[(u32, Vec<u8>)]) -> (PathBuf, Vec<EntryRecord>) {
    let path = dir.join(name);
    let records = write_archive_file(&path, b"AFS2\x01\x04\x02\x00", payloads);
    (path, records)
}

pub fn table(entries: Vec<EntryRecord>, key_modifier: u32) -> ArchiveTable {
    ArchiveTable { entries, key_modifier }
}

pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(rd) => rd.map(|e| e.unwrap().file_name().to_string_lossy().into_owned()).collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

// ── FakeBank ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct FakeBank {
    pub format_version: u32,
    pub internal:       Result<Option<ArchiveTable>, String>,
    pub external:       Result<Option<ExternalArchive>, String>,
    pub names:          HashMap<u32, String>,
    pub external_calls: Arc<AtomicUsize>,
}

impl FakeBank {
    pub fn new(format_version: u32) -> Self {
        Self {
            format_version,
            internal:       Ok(None),
            external:       Ok(None),
            names:          HashMap::new(),
            external_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_internal(mut self, table: ArchiveTable) -> Self {
        self.internal = Ok(Some(table));
        self
    }

    pub fn with_external(mut self, path: PathBuf, table: ArchiveTable) -> Self {
        self.external = Ok(Some(ExternalArchive { path, table }));
        self
    }

    pub fn with_name(mut self, cue_id: u32, name: &str) -> Self {
        self.names.insert(cue_id, name.to_owned());
        self
    }

    pub fn external_lookups(&self) -> usize {
        self.external_calls.load(Ordering::SeqCst)
    }
}

impl CueNameResolver for FakeBank {
    fn cue_name(&self, cue_id: u32) -> Result<String, BankError> {
        self.names.get(&cue_id).cloned().ok_or(BankError::CueNotFound(cue_id))
    }
}

impl SoundBank for FakeBank {
    fn format_version(&self) -> u32 { self.format_version }

    fn internal_archive(&self) -> Result<Option<ArchiveTable>, BankError> {
        self.internal.clone().map_err(BankError::Malformed)
    }

    fn external_archive(&self) -> Result<Option<ExternalArchive>, BankError> {
        self.external_calls.fetch_add(1, Ordering::SeqCst);
        self.external.clone().map_err(BankError::Malformed)
    }
}

/// Hands out clones of one prepared bank, after checking the container
/// stream is readable.
pub struct FakeFormat {
    pub bank: FakeBank,
}

impl BankFormat for FakeFormat {
    fn open(&self, stream: &mut dyn ReadSeek, _path: &Path) -> Result<Box<dyn SoundBank>, BankError> {
        let mut magic = [0u8; 4];
        stream.read_exact(&mut magic)?;
        if &magic != b"@UTF" {
            return Err(BankError::Malformed("missing @UTF header".into()));
        }
        Ok(Box::new(self.bank.clone()))
    }
}

// ── XorDecoders ──────────────────────────────────────────────────────────────

/// Toy decoder: optional `WAVE` header, then the payload body XORed with a
/// byte derived from the key schedule.  A body starting with `FAIL` errors
/// after the header.
#[derive(Default)]
pub struct XorDecoders {
    pub seen: Mutex<Vec<DecoderConfig>>,
}

impl XorDecoders {
    pub fn mask(config: &DecoderConfig) -> u8 {
        let c = &config.cipher;
        (c.key1 ^ c.key2 ^ c.key_modifier) as u8
    }

    /// What a successful decode of `payload` writes.
    pub fn expected(payload: &[u8], config: &DecoderConfig) -> Vec<u8> {
        let mask = Self::mask(config);
        let mut out = Vec::new();
        if config.wave_header_enabled {
            out.extend_from_slice(b"WAVE");
        }
        out.extend(payload[4..].iter().map(|b| b ^ mask));
        out
    }

    pub fn modifiers(&self) -> Vec<u32> {
        self.seen.lock().unwrap().iter().map(|c| c.cipher.key_modifier).collect()
    }
}

struct XorDecoder<'a> {
    header: Option<&'static [u8]>,
    body:   &'a [u8],
    pos:    usize,
    mask:   u8,
}

impl PcmSource for XorDecoder<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        if let Some(header) = self.header.take() {
            buf[..header.len()].copy_from_slice(header);
            return Ok(header.len());
        }
        if self.body.starts_with(b"FAIL") {
            return Err(DecodeError::Codec("corrupt frame".into()));
        }
        let n = (self.body.len() - self.pos).min(buf.len()).min(3000);
        for (dst, src) in buf[..n].iter_mut().zip(&self.body[self.pos..]) {
            *dst = src ^ self.mask;
        }
        self.pos += n;
        Ok(n)
    }
}

impl DecoderFactory for XorDecoders {
    fn create<'a>(
        &self,
        payload: &'a [u8],
        config:  &DecoderConfig,
    ) -> Result<Box<dyn PcmSource + 'a>, DecodeError> {
        self.seen.lock().unwrap().push(*config);
        Ok(Box::new(XorDecoder {
            header: config.wave_header_enabled.then_some(&b"WAVE"[..]),
            body:   &payload[4..],
            pos:    0,
            mask:   Self::mask(config),
        }))
    }
}
