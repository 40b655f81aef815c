//! Behavioral model of the Mandelbrot accelerator's pins.
//!
//! Reacts to the documented inputs one rising edge at a time, the way the RTL
//! does, so the host protocol can be exercised without a board:
//!
//! - **Reset**: clears operands, shift registers, iteration state and status.
//! - **Byte-wise wiring**: every edge shifts the data byte into the top of a
//!   32-bit shift register; `load_cr` / `load_ci` latch the shifted value
//!   (including the byte on that same edge).
//! - **Nibble wiring**: every edge shifts the low nibble into the Cr shift
//!   register and the high nibble into the Ci shift register; a start edge
//!   latches both instead of shifting.
//! - **Start edge**: z ← 0 and the status clears. Loads on the same edge are
//!   applied first, which is what makes a fused start legal.
//! - **Iteration**: each later edge performs one z ← z² + c in binary32 until
//!   |z| > 2, after which the state freezes and status stays high.
//!
//! The status pin can be delayed by a configurable number of edges to mimic
//! a registered comparator output.
//!
//! Only pin-level behavior is modeled; the arithmetic reuses
//! [`crate::reference::step`] rather than a gate-level datapath.

use std::collections::VecDeque;

use log::trace;

use crate::pins::{ClockDriver, Control};
use crate::protocol::ProtocolVersion;
use crate::reference;

/// Pin-level accelerator model.
pub struct Simulator {
    protocol: ProtocolVersion,
    status_latency: u32,
    // Pins as currently driven by the host
    reset: bool,
    control: Control,
    data: u8,
    /// Byte-wise shift register, or the Cr shift register in nibble wiring
    cr_shift: u32,
    /// Ci shift register (nibble wiring only)
    ci_shift: u32,
    /// Latched operand registers (raw binary32)
    cr: u32,
    ci: u32,
    zr: f32,
    zi: f32,
    running: bool,
    diverged: bool,
    /// Iterations performed since the last start edge
    iterations: u32,
    /// Divergence history, oldest first; the front is what the status pin
    /// shows. Always `status_latency + 1` entries.
    status_pipe: VecDeque<bool>,
    /// Total rising edges seen
    cycles: u64,
}

impl Simulator {
    /// Byte-wise wiring, status published without delay.
    pub fn new() -> Self {
        Self::with_protocol(ProtocolVersion::Bytewise)
    }

    pub fn with_protocol(protocol: ProtocolVersion) -> Self {
        Simulator {
            protocol,
            status_latency: 0,
            reset: false,
            control: Control::empty(),
            data: 0,
            cr_shift: 0,
            ci_shift: 0,
            cr: 0,
            ci: 0,
            zr: 0.0,
            zi: 0.0,
            running: false,
            diverged: false,
            iterations: 0,
            status_pipe: VecDeque::from([false]),
            cycles: 0,
        }
    }

    /// Delay the status pin by `edges` clock edges.
    pub fn with_status_latency(mut self, edges: u32) -> Self {
        self.status_latency = edges;
        self.clear_status();
        self
    }

    /// Latched Cr register.
    pub fn cr(&self) -> f32 { f32::from_bits(self.cr) }

    /// Latched Ci register.
    pub fn ci(&self) -> f32 { f32::from_bits(self.ci) }

    /// Iterations performed since the last start edge.
    pub fn iterations(&self) -> u32 { self.iterations }

    pub fn is_running(&self) -> bool { self.running }

    /// Rising edges seen since construction (reset does not clear this).
    pub fn cycles(&self) -> u64 { self.cycles }

    fn clear_state(&mut self) {
        self.cr_shift = 0;
        self.ci_shift = 0;
        self.cr = 0;
        self.ci = 0;
        self.zr = 0.0;
        self.zi = 0.0;
        self.running = false;
        self.diverged = false;
        self.iterations = 0;
        self.clear_status();
    }

    fn clear_status(&mut self) {
        self.status_pipe.clear();
        self.status_pipe.resize(self.status_latency as usize + 1, false);
    }

    fn shift_in(&mut self, start: bool) {
        match self.protocol {
            ProtocolVersion::Bytewise => {
                let shifted = (self.cr_shift >> 8) | (self.data as u32) << 24;
                self.cr_shift = shifted;
                if self.control.contains(Control::LOAD_CR) {
                    self.cr = shifted;
                }
                if self.control.contains(Control::LOAD_CI) {
                    self.ci = shifted;
                }
            }
            ProtocolVersion::Nibble => {
                if start {
                    self.cr = self.cr_shift;
                    self.ci = self.ci_shift;
                } else {
                    self.cr_shift = (self.cr_shift << 4) | (self.data & 0x0F) as u32;
                    self.ci_shift = (self.ci_shift << 4) | (self.data >> 4) as u32;
                }
            }
        }
    }
}

impl ClockDriver for Simulator {
    fn set_reset(&mut self, asserted: bool) { self.reset = asserted; }

    fn set_control(&mut self, control: Control) { self.control = control; }

    fn set_data(&mut self, value: u8) { self.data = value; }

    fn unbounded(&mut self) -> bool {
        self.status_pipe.front().copied().unwrap_or(false)
    }

    fn tick(&mut self) {
        self.cycles += 1;
        if self.reset {
            self.clear_state();
            return;
        }

        let start = self.control.contains(Control::START);
        self.shift_in(start);

        if start {
            trace!("sim: start cr={} ci={}", self.cr(), self.ci());
            self.zr = 0.0;
            self.zi = 0.0;
            self.iterations = 0;
            self.diverged = false;
            self.running = true;
            self.clear_status();
        } else if self.running && !self.diverged {
            let (zr, zi) = reference::step(self.zr, self.zi, self.cr(), self.ci());
            self.zr = zr;
            self.zi = zi;
            self.iterations += 1;
            self.diverged = reference::escaped(zr, zi);
        }

        self.status_pipe.push_back(self.diverged);
        self.status_pipe.pop_front();
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_bytewise(sim: &mut Simulator, value: f32, latch: Control) {
        let bits = value.to_bits();
        for i in 0..4 {
            sim.set_data((bits >> (i * 8)) as u8);
            if i == 3 {
                sim.set_control(latch);
            }
            sim.tick();
        }
        sim.set_control(Control::empty());
    }

    #[test]
    fn test_bytewise_latch() {
        let mut sim = Simulator::new();
        load_bytewise(&mut sim, 1.2, Control::LOAD_CR);
        load_bytewise(&mut sim, 1.4, Control::LOAD_CI);
        assert_eq!(sim.cr(), 1.2);
        assert_eq!(sim.ci(), 1.4);
    }

    #[test]
    fn test_escape_and_sticky_status() {
        let mut sim = Simulator::new();
        load_bytewise(&mut sim, 1.2, Control::LOAD_CR);
        load_bytewise(&mut sim, 1.4, Control::LOAD_CI | Control::START);
        assert!(sim.is_running());
        assert!(!sim.unbounded());
        sim.tick();
        assert!(!sim.unbounded());
        sim.tick();
        assert!(sim.unbounded());
        assert_eq!(sim.iterations(), 2);
        for _ in 0..100 {
            sim.tick();
            assert!(sim.unbounded());
        }
        // frozen after divergence
        assert_eq!(sim.iterations(), 2);
    }

    #[test]
    fn test_status_latency_delays_pin() {
        let mut sim = Simulator::new().with_status_latency(2);
        load_bytewise(&mut sim, -2.01, Control::LOAD_CR);
        load_bytewise(&mut sim, 0.0, Control::LOAD_CI | Control::START);
        sim.tick(); // iteration 1 diverges internally
        assert!(!sim.unbounded());
        sim.tick();
        assert!(!sim.unbounded());
        sim.tick();
        assert!(sim.unbounded());
    }

    #[test]
    fn test_long_status_latency() {
        let mut sim = Simulator::new().with_status_latency(100);
        load_bytewise(&mut sim, -2.01, Control::LOAD_CR);
        load_bytewise(&mut sim, 0.0, Control::LOAD_CI | Control::START);
        for _ in 0..100 {
            sim.tick();
            assert!(!sim.unbounded());
        }
        sim.tick();
        assert!(sim.unbounded());
    }

    #[test]
    fn test_nibble_latch_on_start() {
        let mut sim = Simulator::with_protocol(ProtocolVersion::Nibble);
        let cr = 0.375f32.to_bits();
        let ci = (-1.5f32).to_bits();
        for i in (0..8).rev() {
            let lo = (cr >> (i * 4)) & 0xF;
            let hi = (ci >> (i * 4)) & 0xF;
            sim.set_data(((hi << 4) | lo) as u8);
            sim.tick();
        }
        // nothing latched before start
        assert_eq!(sim.cr(), 0.0);
        sim.set_data(0xFF);
        sim.set_control(Control::START);
        sim.tick();
        assert_eq!(sim.cr(), 0.375);
        assert_eq!(sim.ci(), -1.5);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut sim = Simulator::new();
        load_bytewise(&mut sim, 3.0, Control::LOAD_CR | Control::START);
        sim.tick();
        assert!(sim.unbounded());
        sim.set_reset(true);
        sim.tick();
        sim.set_reset(false);
        assert!(!sim.unbounded());
        assert!(!sim.is_running());
        assert_eq!(sim.cr(), 0.0);
        assert_eq!(sim.cycles(), 6);
    }
}
