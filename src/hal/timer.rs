//! Timer Abstractions
//!
//! Sample-clock pacing for the transmit tick and microsecond timing for the
//! bus self-test.

use embassy_time::{Duration, Instant, Timer, TICK_HZ};

use super::SampleSchedule;

/// Fixed-rate sample clock
///
/// Each deadline is computed from the tick count, so the average rate is
/// exactly the requested one and a late tick does not push the following
/// ones back.
pub struct SampleClock {
    schedule: SampleSchedule,
    origin: Instant,
    ticks: u64,
}

impl SampleClock {
    /// Create a sample clock from sample rate
    #[must_use]
    pub fn from_rate(sample_rate: u32) -> Self {
        Self {
            schedule: SampleSchedule::new(TICK_HZ, sample_rate),
            origin: Instant::now(),
            ticks: 0,
        }
    }

    /// Get the sample rate in Hz
    #[must_use]
    pub const fn rate_hz(&self) -> u32 {
        self.schedule.rate_hz()
    }

    /// Shortest period between two ticks
    #[must_use]
    pub const fn period(&self) -> Duration {
        Duration::from_ticks(self.schedule.min_period())
    }

    /// Wait for next sample period
    pub async fn tick(&mut self) {
        self.ticks += 1;
        let deadline = self.origin.as_ticks() + self.schedule.offset(self.ticks);
        Timer::at(Instant::from_ticks(deadline)).await;
    }

    /// Restart the schedule from now
    pub fn reset(&mut self) {
        self.origin = Instant::now();
        self.ticks = 0;
    }
}

impl defmt::Format for SampleClock {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "SampleClock({}Hz)", self.rate_hz());
    }
}

/// Free-running microsecond counter, wrapping at `u32::MAX`
#[must_use]
pub fn micros() -> u32 {
    Instant::now().as_micros() as u32
}

/// Run-time budget of the transmit tick
///
/// Measures each tick against the sample period, keeping the worst case and
/// the number of ticks that overran since the last report.
#[derive(Clone, Copy, Debug)]
pub struct TickBudget {
    budget_us: u64,
    started: Option<Instant>,
    worst_us: u64,
    overruns: u32,
}

impl TickBudget {
    /// Budget of one period of `clock`
    #[must_use]
    pub const fn for_clock(clock: &SampleClock) -> Self {
        Self {
            budget_us: clock.period().as_micros(),
            started: None,
            worst_us: 0,
            overruns: 0,
        }
    }

    /// Mark the start of a tick
    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Mark the end of a tick; ignored without a matching [`begin`](Self::begin)
    pub fn end(&mut self) {
        if let Some(start) = self.started.take() {
            let spent = (Instant::now() - start).as_micros();
            self.worst_us = self.worst_us.max(spent);
            if spent > self.budget_us {
                self.overruns = self.overruns.saturating_add(1);
            }
        }
    }

    /// Worst tick since the last [`report`](Self::report), in microseconds
    #[must_use]
    pub const fn worst_us(&self) -> u64 {
        self.worst_us
    }

    /// Overrun count since the last report
    #[must_use]
    pub const fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Take the current window and start a new one
    pub fn report(&mut self) -> Self {
        let window = *self;
        self.worst_us = 0;
        self.overruns = 0;
        window
    }
}

impl defmt::Format for TickBudget {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "TickBudget(worst={}us of {}us, overruns={})",
            self.worst_us,
            self.budget_us,
            self.overruns
        );
    }
}
