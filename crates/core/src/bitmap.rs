//! Raw bitmap files: `width * height` gray bytes, row-major, no header.

use std::path::Path;

use crate::Result;

pub fn write_raw(path: &Path, pixels: &[u8]) -> Result<()> {
    std::fs::write(path, pixels)?;
    log::info!("wrote {} bytes to {}", pixels.len(), path.display());
    Ok(())
}

/// Read a raw bitmap of the given dimensions.
///
/// A truncated file reads as black for the missing pixels, so a partially
/// captured scan still converts. Bytes past `width * height` are ignored.
pub fn read_raw(path: &Path, width: u32, height: u32) -> Result<Vec<u8>> {
    let data = std::fs::read(path)?;
    Ok(fit(data, width as usize * height as usize, path))
}

fn fit(mut data: Vec<u8>, expected: usize, path: &Path) -> Vec<u8> {
    if data.len() != expected {
        log::warn!(
            "{}: {} bytes, expected {}; {}",
            path.display(),
            data.len(),
            expected,
            if data.len() < expected { "padding with zeros" } else { "ignoring the excess" }
        );
    }
    data.resize(expected, 0);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("mandelbrot-accel-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_write_then_read() {
        let path = temp_file("exact.bin");
        write_raw(&path, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(read_raw(&path, 3, 2).unwrap(), vec![1, 2, 3, 4, 5, 6]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_truncated_file_pads_with_zeros() {
        let path = temp_file("short.bin");
        write_raw(&path, &[9, 9, 9]).unwrap();
        assert_eq!(read_raw(&path, 2, 3).unwrap(), vec![9, 9, 9, 0, 0, 0]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_excess_bytes_ignored() {
        let path = temp_file("long.bin");
        write_raw(&path, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(read_raw(&path, 2, 1).unwrap(), vec![1, 2]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_raw(&temp_file("does-not-exist.bin"), 1, 1).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
