//! # mandelbrot-accel-core
//!
//! Cycle-exact host driver for a Mandelbrot escape-time accelerator.
//!
//! The accelerator holds two binary32 operand registers (Cr, Ci), iterates
//! z ← z² + c once per clock after a start pulse, and raises a sticky
//! "unbounded" status pin when |z| exceeds 2. The host loads the operands over
//! an 8-bit bus, pulses start, then samples status every cycle: the cycle
//! index at which it rises is the escape-time iteration count.
//!
//! ## Architecture
//!
//! - [`Accelerator`]: Handle owning the clock driver, the register loader
//!   (and its cache) and per-handle statistics; runs one session per point
//! - [`pins`]: Control line layout and the injected [`ClockDriver`] capability
//! - [`float_codec`]: binary32 ↔ big-endian bytes ↔ nibbles
//! - [`protocol`]: Reset, register loading (two wire protocols), start strobe,
//!   status poller
//! - [`sim`]: Pin-level behavioral accelerator model
//! - [`trace`]: Bus frame recorder for diagnostics
//! - [`reference`]: Software escape-time computation in binary32
//! - [`scan`]: Raster scan driver and grayscale mapping
//! - [`bitmap`] / [`png`]: Raw bitmap and grayscale PNG export
//! - [`checkpoint`]: Resumable scan state on disk
//!
//! ## Session timing
//!
//! ```text
//! byte-wise, both operands changed, fused start:
//!   cycle  0..3   Cr bytes, LSB first       load_cr on cycle 3
//!   cycle  4..7   Ci bytes, LSB first       load_ci + start on cycle 7
//!   cycle  8..    sample status, then clock  (until it rises or max)
//! ```
//!
//! With the register cache, a raster scan reloads only the coordinate that
//! changed; if neither changed the start strobe is issued on its own.

pub mod bitmap;
pub mod checkpoint;
pub mod float_codec;
pub mod pins;
pub mod png;
pub mod protocol;
pub mod reference;
pub mod scan;
pub mod sim;
pub mod trace;

mod error;

pub use error::{Error, Result};
pub use pins::{ClockDriver, Control, Frame};
pub use protocol::ProtocolVersion;
pub use scan::{render, Scan, ScanConfig};
pub use sim::Simulator;
pub use trace::BusTrace;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use protocol::{Poller, RegisterCache, RegisterLoader, DEFAULT_RESET_CYCLES, STROBE_SETTLE_CYCLES};

/// Accelerator handle configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccelConfig {
    /// Wire protocol of the operand registers.
    pub protocol: ProtocolVersion,
    /// Clock cycles reset is held for.
    pub reset_cycles: u32,
    /// Clock edges between the start edge and the first valid status sample.
    pub poll_latency: u32,
    /// Assert start on Ci's final load cycle when Ci changed (byte-wise only).
    pub fuse_start: bool,
}

impl Default for AccelConfig {
    fn default() -> Self {
        AccelConfig {
            protocol: ProtocolVersion::Bytewise,
            reset_cycles: DEFAULT_RESET_CYCLES,
            poll_latency: 0,
            fuse_start: true,
        }
    }
}

/// Running totals kept by an [`Accelerator`] handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub sessions: u64,
    pub resets: u64,
    /// Every clock cycle issued by this handle, resets and idle included
    pub cycles: u64,
    /// Cycles spent inside sessions (load + start + poll)
    pub session_cycles: u64,
    pub load_cycles: u64,
    /// Operand loads elided by the register cache
    pub loads_skipped: u64,
    pub fused_starts: u64,
}

impl SessionStats {
    /// Mean clock cycles per session, excluding resets and idling.
    pub fn mean_session_cycles(&self) -> f64 {
        if self.sessions == 0 {
            0.0
        } else {
            self.session_cycles as f64 / self.sessions as f64
        }
    }
}

/// One accelerator behind an injected clock driver.
///
/// Every pin-touching operation takes `&mut self`, so at most one session is
/// in flight per handle. The register cache lives in the handle's loader and
/// is never shared between handles.
pub struct Accelerator<C: ClockDriver> {
    clock: C,
    config: AccelConfig,
    loader: RegisterLoader,
    poller: Poller,
    stats: SessionStats,
    /// Iteration at which the previous session saw status rise
    diverged_at: Option<u32>,
    /// Cycles issued since that session ended
    cycles_since_divergence: u64,
}

impl<C: ClockDriver> Accelerator<C> {
    /// Wrap `clock` and reset the accelerator, so the handle is immediately
    /// ready for [`run`](Self::run).
    pub fn new(clock: C, config: AccelConfig) -> Self {
        debug!(
            "accelerator: protocol={} reset_cycles={} poll_latency={} fuse_start={}",
            config.protocol, config.reset_cycles, config.poll_latency, config.fuse_start
        );
        let mut accel = Accelerator {
            clock,
            config,
            loader: RegisterLoader::new(config.protocol),
            poller: Poller::new(config.poll_latency),
            stats: SessionStats::default(),
            diverged_at: None,
            cycles_since_divergence: 0,
        };
        accel.reset();
        accel
    }

    /// Hold reset for the configured number of cycles and forget the cached
    /// register contents.
    pub fn reset(&mut self) {
        let mut bus = Counting::new(&mut self.clock);
        protocol::reset(&mut bus, self.config.reset_cycles);
        let ticks = bus.ticks;
        self.loader.invalidate();
        self.diverged_at = None;
        self.cycles_since_divergence = 0;
        self.stats.resets += 1;
        self.stats.cycles += ticks;
    }

    /// Evaluate c = `cr` + `ci`·i: load, start, poll.
    ///
    /// Returns the escape-time iteration count in `[0, max_iterations]`.
    /// Fails only if the previous session's sticky status has dropped since.
    pub fn run(&mut self, cr: f32, ci: f32, max_iterations: u32) -> Result<u32> {
        self.check_sticky()?;

        let mut bus = Counting::new(&mut self.clock);
        let report = self.loader.load(&mut bus, cr, ci, self.config.fuse_start);
        let elapsed = if report.start_fused {
            0
        } else {
            protocol::start(&mut bus);
            STROBE_SETTLE_CYCLES
        };
        let count = self.poller.poll(&mut bus, max_iterations, elapsed);
        let ticks = bus.ticks;

        self.stats.sessions += 1;
        self.stats.cycles += ticks;
        self.stats.load_cycles += report.cycles as u64;
        self.stats.loads_skipped += report.skipped() as u64;
        self.stats.fused_starts += report.start_fused as u64;
        self.stats.session_cycles += ticks;
        self.diverged_at = (count < max_iterations).then_some(count);
        self.cycles_since_divergence = 0;

        trace!("run cr={} ci={} -> {} ({} cycles)", cr, ci, count, ticks);
        Ok(count)
    }

    /// Issue `cycles` idle clock cycles, verifying after each one that a
    /// previously observed divergence is still signalled.
    pub fn idle(&mut self, cycles: u32) -> Result<()> {
        self.clock.set_control(Control::empty());
        for _ in 0..cycles {
            self.clock.tick();
            self.stats.cycles += 1;
            if self.diverged_at.is_some() {
                self.cycles_since_divergence += 1;
            }
            self.check_sticky()?;
        }
        Ok(())
    }

    fn check_sticky(&mut self) -> Result<()> {
        if let Some(iteration) = self.diverged_at {
            if !self.clock.unbounded() {
                let cycles = self.cycles_since_divergence;
                warn!(
                    "status dropped {} cycles after divergence at iteration {}",
                    cycles, iteration
                );
                self.diverged_at = None;
                return Err(Error::StatusDropped { iteration, cycles });
            }
        }
        Ok(())
    }

    /// Current level of the status pin.
    pub fn unbounded(&mut self) -> bool {
        self.clock.unbounded()
    }

    pub fn config(&self) -> &AccelConfig { &self.config }

    pub fn stats(&self) -> &SessionStats { &self.stats }

    pub fn cache(&self) -> &RegisterCache { self.loader.cache() }

    pub fn clock(&self) -> &C { &self.clock }

    pub fn clock_mut(&mut self) -> &mut C { &mut self.clock }
}

/// Counts the edges a protocol step issues.
struct Counting<'a, C: ?Sized> {
    inner: &'a mut C,
    ticks: u64,
}

impl<'a, C: ClockDriver + ?Sized> Counting<'a, C> {
    fn new(inner: &'a mut C) -> Self {
        Counting { inner, ticks: 0 }
    }
}

impl<C: ClockDriver + ?Sized> ClockDriver for Counting<'_, C> {
    fn set_reset(&mut self, asserted: bool) { self.inner.set_reset(asserted) }
    fn set_control(&mut self, control: Control) { self.inner.set_control(control) }
    fn set_data(&mut self, value: u8) { self.inner.set_data(value) }
    fn unbounded(&mut self) -> bool { self.inner.unbounded() }
    fn tick(&mut self) {
        self.ticks += 1;
        self.inner.tick();
    }
}
