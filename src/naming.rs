//! Output file naming.

use std::path::{Path, PathBuf};

use crate::bank::{BankError, CueNameResolver};

/// Extension every decoded output carries.
pub const OUTPUT_EXTENSION: &str = ".wav";

/// Destination of one decoded entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub directory: PathBuf,
    pub file_name: String,
}

impl OutputTarget {
    pub fn new(directory: &Path, file_name: String) -> Self {
        Self { directory: directory.to_path_buf(), file_name }
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// Name used when no cue name is wanted or available, e.g. `dat_000042.bin`.
pub fn symbolic_file_name(cue_id: u32) -> String {
    format!("dat_{cue_id:06}.bin")
}

/// Replace whatever follows the last `.` of `name` with `ext`, or append
/// `ext` when there is no dot.
pub fn replace_extension(name: &str, ext: &str) -> String {
    let stem = match name.rfind('.') {
        Some(dot) => &name[..dot],
        None      => name,
    };
    format!("{stem}{ext}")
}

/// Output file name for `cue_id`, always ending in [`OUTPUT_EXTENSION`].
///
/// Cue names are used verbatim apart from the extension; a name the file
/// system rejects shows up later as an output error for that entry.
pub fn output_file_name<N: CueNameResolver + ?Sized>(
    cue_id:       u32,
    use_cue_name: bool,
    resolver:     &N,
) -> Result<String, BankError> {
    let name = if use_cue_name {
        match resolver.cue_name(cue_id) {
            Ok(name)                       => name,
            Err(BankError::CueNotFound(_)) => symbolic_file_name(cue_id),
            Err(e)                         => return Err(e),
        }
    } else {
        symbolic_file_name(cue_id)
    };
    Ok(replace_extension(&name, OUTPUT_EXTENSION))
}
