//! Accelerator pin interface.
//!
//! The host sees the accelerator as a handful of input lines, an 8-bit data
//! bus and one status output, all sampled on the rising edge of a single
//! clock. [`ClockDriver`] is the injected capability that drives those pins
//! and advances the clock; the protocol code never assumes whether it talks
//! to silicon or to the [`crate::sim::Simulator`].
//!
//! | Signal  | Width | Direction | Bit |
//! |---------|-------|-----------|-----|
//! | start   | 1     | in        | control bit 0 |
//! | load_cr | 1     | in        | control bit 1 |
//! | load_ci | 1     | in        | control bit 2 |
//! | data    | 8     | in        | bidirectional port, driven by host |
//! | reset   | 1     | in        | board reset line |
//! | status  | 1     | out       | output bit 0 ("unbounded") |

use bitflags::bitflags;

bitflags! {
    /// Host → accelerator control lines, laid out as on the demo board's
    /// input port.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Control: u8 {
        /// One-cycle pulse that restarts the iteration from z = 0.
        const START = 1 << 0;
        /// Latch the Cr shift register (byte-wise protocol only).
        const LOAD_CR = 1 << 1;
        /// Latch the Ci shift register (byte-wise protocol only).
        const LOAD_CI = 1 << 2;
    }
}

/// Drives the accelerator pins and its clock.
///
/// Pin setters only change what is presented to the accelerator; nothing is
/// latched until [`tick`](ClockDriver::tick) produces a rising edge. Reset
/// polarity is the implementor's concern: `true` always means "in reset".
pub trait ClockDriver {
    /// Drive the reset line.
    fn set_reset(&mut self, asserted: bool);

    /// Drive the control lines.
    fn set_control(&mut self, control: Control);

    /// Drive the 8-bit data bus.
    fn set_data(&mut self, value: u8);

    /// Sample the "unbounded" status output as currently settled.
    fn unbounded(&mut self) -> bool;

    /// Advance the clock by exactly one cycle.
    fn tick(&mut self);
}

impl<T: ClockDriver + ?Sized> ClockDriver for &mut T {
    fn set_reset(&mut self, asserted: bool) { (**self).set_reset(asserted) }
    fn set_control(&mut self, control: Control) { (**self).set_control(control) }
    fn set_data(&mut self, value: u8) { (**self).set_data(value) }
    fn unbounded(&mut self) -> bool { (**self).unbounded() }
    fn tick(&mut self) { (**self).tick() }
}

/// Everything the host presented to the accelerator during one clock cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    pub reset: bool,
    pub control: Control,
    pub data: u8,
}

impl Frame {
    /// A frame with no control line asserted and the bus at zero.
    pub fn idle() -> Self {
        Frame::default()
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '.' };
        write!(
            f,
            "{}{}{}{} data=0x{:02X}",
            flag(self.reset, 'R'),
            flag(self.control.contains(Control::START), 'S'),
            flag(self.control.contains(Control::LOAD_CR), 'r'),
            flag(self.control.contains(Control::LOAD_CI), 'i'),
            self.data,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_bits_match_board_layout() {
        assert_eq!(Control::START.bits(), 0x01);
        assert_eq!(Control::LOAD_CR.bits(), 0x02);
        assert_eq!(Control::LOAD_CI.bits(), 0x04);
        assert_eq!((Control::LOAD_CI | Control::START).bits(), 0x05);
    }

    #[test]
    fn test_frame_display() {
        let frame = Frame { reset: false, control: Control::LOAD_CI | Control::START, data: 0x3F };
        assert_eq!(frame.to_string(), ".S.i data=0x3F");
        assert_eq!(Frame { reset: true, ..Frame::idle() }.to_string(), "R... data=0x00");
    }
}
