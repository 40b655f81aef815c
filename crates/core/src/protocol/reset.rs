use log::debug;

use crate::pins::{ClockDriver, Control};

/// Reset hold time used by the test bench and the bring-up board.
pub const DEFAULT_RESET_CYCLES: u32 = 10;

/// Hold the accelerator in reset for `cycles` clock cycles, then release it.
///
/// Control lines and the data bus are parked at zero first so nothing is
/// latched on the first edge after release. Returns only after the full
/// sequence, so a partial reset is never observable.
pub fn reset<C: ClockDriver + ?Sized>(clock: &mut C, cycles: u32) {
    debug!("reset: holding for {} cycles", cycles);
    clock.set_control(Control::empty());
    clock.set_data(0);
    clock.set_reset(true);
    for _ in 0..cycles {
        clock.tick();
    }
    clock.set_reset(false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::Frame;
    use crate::trace::BusTrace;
    use crate::sim::Simulator;

    #[test]
    fn test_reset_holds_for_exact_cycles() {
        let mut bus = BusTrace::new(Simulator::new());
        reset(&mut bus, DEFAULT_RESET_CYCLES);
        assert_eq!(bus.frames().len(), 10);
        assert!(bus.frames().iter().all(|f| *f == Frame { reset: true, ..Frame::idle() }));
        // released after the last edge
        bus.tick();
        assert!(!bus.frames()[10].reset);
    }

    #[test]
    fn test_zero_cycle_reset_issues_no_edges() {
        let mut bus = BusTrace::new(Simulator::new());
        reset(&mut bus, 0);
        assert!(bus.frames().is_empty());
    }
}
