//! Grayscale PNG export for rendered scans.
//!
//! Scans are one gray byte per pixel, so the image is written as 8-bit
//! grayscale (color type 0) with filter type None on every row. The IDAT
//! stream is zlib-compressed with `miniz_oxide`.

use std::path::Path;

use crate::Result;

const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Encode `width * height` gray bytes (row-major) as a PNG file image.
///
/// Missing pixels at the end of `gray` are written as black; extra bytes
/// are ignored.
pub fn encode_gray(width: u32, height: u32, gray: &[u8]) -> Vec<u8> {
    let width = width as usize;
    let height = height as usize;

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(0); // color type: grayscale
    ihdr.push(0); // compression
    ihdr.push(0); // filter
    ihdr.push(0); // interlace

    let mut raw = Vec::with_capacity((width + 1) * height);
    for y in 0..height {
        raw.push(0); // filter: None
        for x in 0..width {
            raw.push(gray.get(y * width + x).copied().unwrap_or(0));
        }
    }
    let idat = miniz_oxide::deflate::compress_to_vec_zlib(&raw, 6);

    let mut png = Vec::with_capacity(idat.len() + 64);
    png.extend_from_slice(&SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr);
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);
    png
}

/// Encode and write a grayscale PNG to `path`.
pub fn write_gray(path: &Path, width: u32, height: u32, gray: &[u8]) -> Result<()> {
    std::fs::write(path, encode_gray(width, height, gray))?;
    log::info!("wrote {}x{} PNG to {}", width, height, path.display());
    Ok(())
}

fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(data);
    // CRC over type + data
    let crc = crc32(&chunk_type[..], data);
    out.extend_from_slice(&crc.to_be_bytes());
}

// CRC-32 (PNG/zlib)
fn crc32(chunk_type: &[u8], data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &b in chunk_type.iter().chain(data.iter()) {
        crc ^= b as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}
