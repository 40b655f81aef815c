use crate::pins::ClockDriver;

/// Samples the sticky "unbounded" status line after a start edge.
///
/// `latency` is the number of clock edges between the start edge and the
/// moment the status pin reflects iteration 0. Sample `k` is therefore taken
/// `latency + k` edges after the start edge. The bring-up board publishes
/// status with no extra delay (latency 0); other builds of the design may
/// register the comparator output once more.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Poller {
    pub latency: u32,
}

impl Poller {
    pub fn new(latency: u32) -> Self {
        Poller { latency }
    }

    /// Poll for up to `max_iterations` samples.
    ///
    /// `elapsed` is how many clock edges have already passed since the start
    /// edge (0 when the start was fused into the last load cycle). Returns the
    /// index of the first sample that reads asserted, or `max_iterations` if
    /// none does. Samples that already lie in the past are not observable;
    /// polling resumes at the first one that is.
    ///
    /// Issues at most `max(latency, elapsed) + max_iterations` clock cycles.
    pub fn poll<C: ClockDriver + ?Sized>(
        &self,
        clock: &mut C,
        max_iterations: u32,
        elapsed: u32,
    ) -> u32 {
        if max_iterations == 0 {
            return 0;
        }

        let mut edge = elapsed;
        while edge < self.latency {
            clock.tick();
            edge += 1;
        }

        let first = (edge - self.latency).min(max_iterations);
        for iteration in first..max_iterations {
            if clock.unbounded() {
                return iteration;
            }
            clock.tick();
        }
        max_iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::Control;

    /// Status line that rises after a fixed number of edges and stays high.
    struct Countdown {
        edges: u32,
        rises_at: Option<u32>,
    }

    impl ClockDriver for Countdown {
        fn set_reset(&mut self, _: bool) {}
        fn set_control(&mut self, _: Control) {}
        fn set_data(&mut self, _: u8) {}
        fn unbounded(&mut self) -> bool {
            self.rises_at.is_some_and(|at| self.edges >= at)
        }
        fn tick(&mut self) { self.edges += 1; }
    }

    #[test]
    fn test_zero_max_returns_immediately() {
        let mut line = Countdown { edges: 0, rises_at: Some(0) };
        assert_eq!(Poller::new(3).poll(&mut line, 0, 0), 0);
        assert_eq!(line.edges, 0);
    }

    #[test]
    fn test_returns_first_asserted_index() {
        let mut line = Countdown { edges: 0, rises_at: Some(5) };
        assert_eq!(Poller::new(0).poll(&mut line, 32, 0), 5);
        assert_eq!(line.edges, 5);
    }

    #[test]
    fn test_never_asserted_returns_max() {
        let mut line = Countdown { edges: 0, rises_at: None };
        assert_eq!(Poller::new(0).poll(&mut line, 32, 0), 32);
        assert_eq!(line.edges, 32);
    }

    #[test]
    fn test_latency_shifts_sampling_window() {
        // status for iteration k appears at edge k + 2
        let mut line = Countdown { edges: 0, rises_at: Some(7) };
        assert_eq!(Poller::new(2).poll(&mut line, 32, 0), 5);
    }

    #[test]
    fn test_elapsed_edges_are_accounted() {
        // one edge already spent by a standalone strobe
        let mut line = Countdown { edges: 1, rises_at: Some(3) };
        assert_eq!(Poller::new(0).poll(&mut line, 32, 1), 3);
        assert_eq!(line.edges, 3);
    }

    #[test]
    fn test_result_always_within_bounds() {
        for rises in [None, Some(0), Some(1), Some(31), Some(32), Some(100)] {
            for latency in 0..3 {
                for elapsed in 0..2 {
                    let mut line = Countdown { edges: elapsed, rises_at: rises };
                    let n = Poller::new(latency).poll(&mut line, 32, elapsed);
                    assert!(n <= 32);
                    assert!(line.edges <= latency.max(elapsed) + 32);
                }
            }
        }
    }
}
