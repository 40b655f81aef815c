//! Raster scan driver.
//!
//! Maps every pixel of a `width × height` image onto the complex plane, runs
//! one accelerator session per pixel and converts the iteration count into an
//! 8-bit gray level. Pixels are produced row-major, row 0 (the `im_min` edge)
//! first, left to right.
//!
//! Scanning is row-granular so a long run (hours on the demo board, which
//! drives the pins from MicroPython) can be checkpointed between rows; see
//! [`crate::checkpoint`].

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{Accelerator, ClockDriver, Error, Result};

/// Image geometry, coordinate window and iteration budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub width: u32,
    pub height: u32,
    pub re_min: f64,
    pub re_max: f64,
    pub im_min: f64,
    pub im_max: f64,
    pub max_iterations: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            width: 256,
            height: 256,
            re_min: -2.5,
            re_max: 1.5,
            im_min: -2.0,
            im_max: 2.0,
            max_iterations: 64,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidScan(format!(
                "image size {}x{} has no pixels", self.width, self.height
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidScan("max_iterations must be at least 1".into()));
        }
        let bounds = [self.re_min, self.re_max, self.im_min, self.im_max];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(Error::InvalidScan(format!("non-finite coordinate range {:?}", bounds)));
        }
        if (self.width as u64) * (self.height as u64) > isize::MAX as u64 {
            return Err(Error::InvalidScan("image too large".into()));
        }
        Ok(())
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Complex point for pixel (`px`, `py`).
    ///
    /// The mapping is computed in `f64` and narrowed to `f32` only at the end.
    /// A one-pixel axis maps to the range minimum.
    pub fn point(&self, px: u32, py: u32) -> (f32, f32) {
        (
            axis(self.re_min, self.re_max, px, self.width) as f32,
            axis(self.im_min, self.im_max, py, self.height) as f32,
        )
    }
}

fn axis(min: f64, max: f64, i: u32, n: u32) -> f64 {
    if n <= 1 {
        min
    } else {
        min + (max - min) * i as f64 / (n - 1) as f64
    }
}

/// Gray level for an iteration count: `255 - round(m * 255 / max)`.
///
/// Points that never escape are black, points that escape immediately are
/// near white. Counts above `max_iterations` are clamped.
pub fn intensity(iterations: u32, max_iterations: u32) -> u8 {
    if max_iterations == 0 {
        return 255;
    }
    let m = iterations.min(max_iterations) as u64;
    let max = max_iterations as u64;
    // round half up, in integers
    let scaled = (m * 255 * 2 + max) / (2 * max);
    255 - scaled as u8
}

/// A scan in progress.
pub struct Scan {
    config: ScanConfig,
    pixels: Vec<u8>,
    next_row: u32,
}

impl Scan {
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Scan {
            pixels: vec![0; config.pixel_count()],
            config,
            next_row: 0,
        })
    }

    /// Rebuild a partially completed scan, e.g. from a checkpoint.
    pub fn from_parts(config: ScanConfig, next_row: u32, pixels: Vec<u8>) -> Result<Self> {
        config.validate()?;
        if pixels.len() != config.pixel_count() {
            return Err(Error::InvalidScan(format!(
                "pixel buffer holds {} bytes, expected {}",
                pixels.len(),
                config.pixel_count()
            )));
        }
        if next_row > config.height {
            return Err(Error::InvalidScan(format!(
                "next row {} beyond image height {}", next_row, config.height
            )));
        }
        Ok(Scan { config, pixels, next_row })
    }

    pub fn config(&self) -> &ScanConfig { &self.config }

    /// Index of the next row to compute.
    pub fn next_row(&self) -> u32 { self.next_row }

    pub fn is_complete(&self) -> bool { self.next_row >= self.config.height }

    /// Pixels so far; rows not yet scanned are zero.
    pub fn pixels(&self) -> &[u8] { &self.pixels }

    pub fn into_pixels(self) -> Vec<u8> { self.pixels }

    /// Scan the next row. Returns `false` once the image is complete.
    pub fn scan_row<C: ClockDriver>(&mut self, accel: &mut Accelerator<C>) -> Result<bool> {
        if self.is_complete() {
            return Ok(false);
        }
        let py = self.next_row;
        let width = self.config.width as usize;
        let row = &mut self.pixels[py as usize * width..(py as usize + 1) * width];
        for (px, out) in row.iter_mut().enumerate() {
            let (cr, ci) = self.config.point(px as u32, py);
            let m = accel.run(cr, ci, self.config.max_iterations)?;
            *out = intensity(m, self.config.max_iterations);
        }
        debug!("row {} of {} done", py + 1, self.config.height);
        self.next_row += 1;
        Ok(true)
    }

    /// Scan all remaining rows, calling `on_row` after each.
    pub fn run<C, F>(&mut self, accel: &mut Accelerator<C>, mut on_row: F) -> Result<()>
    where
        C: ClockDriver,
        F: FnMut(&Scan) -> Result<()>,
    {
        let start_row = self.next_row;
        while self.scan_row(accel)? {
            on_row(self)?;
        }
        let stats = accel.stats();
        info!(
            "scan {}x{} complete (rows {}..{}): {} sessions, {:.1} cycles/session, {} loads skipped",
            self.config.width,
            self.config.height,
            start_row,
            self.config.height,
            stats.sessions,
            stats.mean_session_cycles(),
            stats.loads_skipped,
        );
        Ok(())
    }
}

/// Render a whole image: `width × height` gray bytes, row-major, top row first.
pub fn render<C: ClockDriver>(accel: &mut Accelerator<C>, config: &ScanConfig) -> Result<Vec<u8>> {
    let mut scan = Scan::new(*config)?;
    scan.run(accel, |_| Ok(()))?;
    Ok(scan.into_pixels())
}
