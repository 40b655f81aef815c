//! Resumable scan state.
//!
//! A full-resolution scan on the demo board takes hours, so the CLI saves the
//! scan after every few rows and picks it up again on the next invocation.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "MBCK"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::scan::{Scan, ScanConfig};
use crate::{Error, Result};

/// Magic bytes identifying a scan checkpoint.
const MAGIC: &[u8; 4] = b"MBCK";
/// Current checkpoint format version.
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8;

#[derive(Serialize, Deserialize)]
struct Payload {
    config: ScanConfig,
    next_row: u32,
    pixels: Vec<u8>,
}

/// Save `scan` to `path`, replacing any previous checkpoint.
pub fn save_to_file(scan: &Scan, path: &Path) -> Result<()> {
    let payload = bincode::serialize(&Payload {
        config: *scan.config(),
        next_row: scan.next_row(),
        pixels: scan.pixels().to_vec(),
    })?;
    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&compressed);

    // write-then-rename so an interrupted save keeps the old checkpoint
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &out)?;
    std::fs::rename(&tmp, path)?;
    log::debug!("checkpoint: row {} saved to {}", scan.next_row(), path.display());
    Ok(())
}

/// Load a checkpoint, verifying magic, version and payload consistency.
pub fn load_from_file(path: &Path) -> Result<Scan> {
    let data = std::fs::read(path)?;

    if data.len() < HEADER_LEN {
        return Err(Error::Checkpoint("file too small".into()));
    }
    if &data[0..4] != MAGIC {
        return Err(Error::Checkpoint("not a scan checkpoint (bad magic)".into()));
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(Error::Checkpoint(format!(
            "unsupported checkpoint version {} (expected {})",
            version, FORMAT_VERSION
        )));
    }

    let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[HEADER_LEN..])
        .map_err(|e| Error::Checkpoint(format!("decompress error: {:?}", e)))?;
    let payload: Payload = bincode::deserialize(&decompressed)?;

    Scan::from_parts(payload.config, payload.next_row, payload.pixels)
        .map_err(|e| Error::Checkpoint(format!("inconsistent payload: {}", e)))
}

/// Default checkpoint path for an output bitmap: `out.bin` → `out.ckpt`.
pub fn checkpoint_path(output: &Path) -> PathBuf {
    output.with_extension("ckpt")
}
