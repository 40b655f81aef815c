use log::trace;

use super::ProtocolVersion;
use crate::float_codec::{self, same_bits};
use crate::pins::{ClockDriver, Control};

/// Last operand values latched into the accelerator's Cr and Ci registers.
///
/// `None` means unknown: after power-up or a reset the host cannot assume
/// anything about the register contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterCache {
    cr: Option<f32>,
    ci: Option<f32>,
}

impl RegisterCache {
    pub fn new() -> Self {
        RegisterCache::default()
    }

    pub fn cr(&self) -> Option<f32> { self.cr }

    pub fn ci(&self) -> Option<f32> { self.ci }

    /// Forget both registers. Must follow every hardware reset.
    pub fn invalidate(&mut self) {
        *self = RegisterCache::new();
    }

    fn holds(cached: Option<f32>, value: f32) -> bool {
        cached.is_some_and(|c| same_bits(c, value))
    }
}

/// What one load phase put on the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Clock cycles spent driving operand data.
    pub cycles: u32,
    pub cr_loaded: bool,
    pub ci_loaded: bool,
    /// `start` was asserted together with `load_ci` on Ci's final byte.
    pub start_fused: bool,
}

impl LoadReport {
    /// Operands whose load was elided because the register already held them.
    pub fn skipped(&self) -> u32 {
        (!self.cr_loaded) as u32 + (!self.ci_loaded) as u32
    }
}

/// Serializes Cr/Ci onto the shared data bus.
///
/// Owns the [`RegisterCache`]; nothing else mutates it. The byte-wise
/// protocol consults the cache so that a raster scan, where one coordinate
/// stays constant along a row, reloads only the operand that moved.
pub struct RegisterLoader {
    version: ProtocolVersion,
    cache: RegisterCache,
}

impl RegisterLoader {
    pub fn new(version: ProtocolVersion) -> Self {
        RegisterLoader { version, cache: RegisterCache::new() }
    }

    pub fn cache(&self) -> &RegisterCache { &self.cache }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    /// Load both operands.
    ///
    /// With `fuse_start`, the byte-wise protocol asserts `start` on the same
    /// cycle as Ci's `load_ci`; this only happens when Ci actually changed, so
    /// the start edge never precedes the final operand byte. Check
    /// [`LoadReport::start_fused`] to know whether a separate strobe is still
    /// needed.
    pub fn load<C: ClockDriver + ?Sized>(
        &mut self,
        clock: &mut C,
        cr: f32,
        ci: f32,
        fuse_start: bool,
    ) -> LoadReport {
        let report = match self.version {
            ProtocolVersion::Bytewise => self.load_bytewise(clock, cr, ci, fuse_start),
            ProtocolVersion::Nibble => load_nibble(clock, cr, ci),
        };
        trace!(
            "load cr={} ci={}: {} cycles, skipped {}, fused={}",
            cr, ci, report.cycles, report.skipped(), report.start_fused
        );
        report
    }

    fn load_bytewise<C: ClockDriver + ?Sized>(
        &mut self,
        clock: &mut C,
        cr: f32,
        ci: f32,
        fuse_start: bool,
    ) -> LoadReport {
        let mut report = LoadReport::default();

        if !RegisterCache::holds(self.cache.cr, cr) {
            report.cycles += shift_operand(clock, cr, Control::LOAD_CR);
            self.cache.cr = Some(cr);
            report.cr_loaded = true;
        }

        if !RegisterCache::holds(self.cache.ci, ci) {
            let latch = if fuse_start {
                Control::LOAD_CI | Control::START
            } else {
                Control::LOAD_CI
            };
            report.cycles += shift_operand(clock, ci, latch);
            self.cache.ci = Some(ci);
            report.ci_loaded = true;
            report.start_fused = fuse_start;
        }

        report
    }
}

/// Drive one operand least significant byte first, asserting `latch` on the
/// final (most significant) byte. Returns the cycles spent.
fn shift_operand<C: ClockDriver + ?Sized>(clock: &mut C, value: f32, latch: Control) -> u32 {
    let bytes = float_codec::encode(value);
    clock.set_control(Control::empty());
    for (i, &byte) in bytes.iter().rev().enumerate() {
        clock.set_data(byte);
        if i == bytes.len() - 1 {
            clock.set_control(latch);
        }
        clock.tick();
    }
    clock.set_control(Control::empty());
    clock.set_data(0);
    bytes.len() as u32
}

/// Protocol B: both operands side by side, one nibble pair per cycle.
fn load_nibble<C: ClockDriver + ?Sized>(clock: &mut C, cr: f32, ci: f32) -> LoadReport {
    let cr_nibbles = float_codec::to_nibbles(cr);
    let ci_nibbles = float_codec::to_nibbles(ci);
    clock.set_control(Control::empty());
    for (&hi, &lo) in ci_nibbles.iter().zip(cr_nibbles.iter()) {
        clock.set_data((hi << 4) | lo);
        clock.tick();
    }
    clock.set_data(0);
    LoadReport {
        cycles: cr_nibbles.len() as u32,
        cr_loaded: true,
        ci_loaded: true,
        start_fused: false,
    }
}
