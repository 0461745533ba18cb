//! Cancellable per-turn countdown.
//!
//! The clock does not own a timer: a [`Ticker`] delivers one tick per second
//! tagged with the generation it was started for, and ticks carrying any
//! other generation are discarded. Cancelling bumps the generation, so a tick
//! already queued behind the cancellation can never reach the next turn.

/// Identity of one run of the clock.
pub type ClockGeneration = u64;

/// Source of one-second ticks for a [`TurnClock`].
pub trait Ticker: Send {
    /// Begin delivering ticks tagged with `generation`, replacing any
    /// previous delivery.
    fn start(&mut self, generation: ClockGeneration);
    /// Stop delivering ticks. Must be idempotent.
    fn stop(&mut self);
}

/// What a tick means for the turn in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    /// One second elapsed, `remaining` seconds are left.
    Tick {
        /// Seconds left in the turn.
        remaining: u32,
    },
    /// The countdown reached zero. Emitted once per run.
    Expired,
}

/// Countdown for the active turn.
pub struct TurnClock {
    ticker: Box<dyn Ticker>,
    generation: ClockGeneration,
    remaining: Option<u32>,
}

impl std::fmt::Debug for TurnClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnClock")
            .field("generation", &self.generation)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

impl TurnClock {
    /// Idle clock driven by `ticker`.
    pub fn new(ticker: Box<dyn Ticker>) -> Self {
        Self {
            ticker,
            generation: 0,
            remaining: None,
        }
    }

    /// Start a fresh countdown of `duration_secs` and return its generation.
    pub fn start(&mut self, duration_secs: u32) -> ClockGeneration {
        self.generation += 1;
        self.remaining = Some(duration_secs);
        self.ticker.start(self.generation);
        self.generation
    }

    /// Stop the countdown. Safe to call when already stopped or expired.
    pub fn cancel(&mut self) {
        if self.remaining.take().is_some() {
            self.generation += 1;
        }
        self.ticker.stop();
    }

    /// Account for one elapsed second of run `generation`.
    ///
    /// Returns `None` for ticks of a cancelled, expired or replaced run.
    pub fn on_tick(&mut self, generation: ClockGeneration) -> Option<ClockSignal> {
        if generation != self.generation {
            return None;
        }
        let remaining = self.remaining.as_mut()?;
        *remaining = remaining.saturating_sub(1);

        if *remaining == 0 {
            self.remaining = None;
            self.ticker.stop();
            Some(ClockSignal::Expired)
        } else {
            Some(ClockSignal::Tick {
                remaining: *remaining,
            })
        }
    }

    /// Seconds left in the running countdown, zero when stopped.
    pub fn time_left(&self) -> u32 {
        self.remaining.unwrap_or(0)
    }

    /// Whether a countdown is running.
    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.remaining.is_some()
    }

    /// Generation of the latest run.
    pub fn generation(&self) -> ClockGeneration {
        self.generation
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Ticker recording what the clock asked for; ticks are fed by hand.
    #[derive(Clone, Default)]
    pub(crate) struct ManualTicker {
        pub(crate) log: Arc<Mutex<Vec<Option<ClockGeneration>>>>,
    }

    impl ManualTicker {
        pub(crate) fn started(&self) -> Vec<ClockGeneration> {
            self.log.lock().unwrap().iter().flatten().copied().collect()
        }
    }

    impl Ticker for ManualTicker {
        fn start(&mut self, generation: ClockGeneration) {
            self.log.lock().unwrap().push(Some(generation));
        }

        fn stop(&mut self) {
            self.log.lock().unwrap().push(None);
        }
    }

    #[test]
    fn counts_down_then_expires_once() {
        let ticker = ManualTicker::default();
        let mut clock = TurnClock::new(Box::new(ticker.clone()));
        let generation = clock.start(3);

        assert_eq!(
            clock.on_tick(generation),
            Some(ClockSignal::Tick { remaining: 2 })
        );
        assert_eq!(
            clock.on_tick(generation),
            Some(ClockSignal::Tick { remaining: 1 })
        );
        assert_eq!(clock.on_tick(generation), Some(ClockSignal::Expired));
        assert_eq!(clock.on_tick(generation), None);
        assert!(!clock.is_running());
        assert_eq!(ticker.log.lock().unwrap().last(), Some(&None));
    }

    #[test]
    fn cancel_discards_late_ticks() {
        let mut clock = TurnClock::new(Box::new(ManualTicker::default()));
        let generation = clock.start(10);
        clock.cancel();
        assert_eq!(clock.on_tick(generation), None);
        assert_eq!(clock.time_left(), 0);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut clock = TurnClock::new(Box::new(ManualTicker::default()));
        let generation = clock.start(1);
        assert_eq!(clock.on_tick(generation), Some(ClockSignal::Expired));
        clock.cancel();
        clock.cancel();
        assert!(!clock.is_running());
        assert_eq!(clock.on_tick(generation), None);
    }

    #[test]
    fn restart_ignores_previous_generation() {
        let ticker = ManualTicker::default();
        let mut clock = TurnClock::new(Box::new(ticker.clone()));
        let first = clock.start(5);
        clock.cancel();
        let second = clock.start(5);

        assert_ne!(first, second);
        assert_eq!(clock.on_tick(first), None);
        assert_eq!(clock.time_left(), 5);
        assert_eq!(
            clock.on_tick(second),
            Some(ClockSignal::Tick { remaining: 4 })
        );
        assert_eq!(ticker.started(), vec![first, second]);
    }
}
