use crate::pins::{ClockDriver, Control};

/// Clock edges that have already passed since the start edge when [`start`]
/// returns (the trailing low cycle).
pub const STROBE_SETTLE_CYCLES: u32 = 1;

/// Pulse `start` high for one cycle, then hold it low for one cycle.
///
/// Used when the start cannot ride on Ci's final load byte: Ci unchanged, the
/// nibble protocol, or fusion disabled.
pub fn start<C: ClockDriver + ?Sized>(clock: &mut C) {
    clock.set_control(Control::START);
    clock.tick();
    clock.set_control(Control::empty());
    clock.tick();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Simulator;
    use crate::trace::BusTrace;

    #[test]
    fn test_start_is_one_high_one_low() {
        let mut bus = BusTrace::new(Simulator::new());
        start(&mut bus);
        let controls: Vec<Control> = bus.frames().iter().map(|f| f.control).collect();
        assert_eq!(controls, vec![Control::START, Control::empty()]);
        assert_eq!(bus.frames().len() as u32, 1 + STROBE_SETTLE_CYCLES);
    }
}
