//! Carrier Gate (VOX)
//!
//! Hang-time state machine that decides whether the SSB carrier is on.
//! A trigger loads the counter; silence counts it down; the carrier is on
//! while the counter is non-zero.
//!
//! The first trigger after silence loads the maximum, later triggers load
//! one less. The caller can tell "freshly keyed" from "still talking" by
//! the value, which is what drives the carrier-enable register write.
//!
//! Hang time after the last continuing trigger is `MAX - 2` samples,
//! about 47 ms at the transmit sample rate.

/// Kind of trigger seen by the gate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// No trigger this sample
    None,
    /// First trigger after the gate was closed
    Fresh,
    /// Trigger while the gate was already open
    Continuing,
}

/// Gate boundary crossed by an update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateEdge {
    /// Gate closed to open
    Opened,
    /// Gate open to closed
    Closed,
}

/// VOX hang-time counter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CarrierGate {
    counter: u8,
}

impl CarrierGate {
    /// Counter value on a fresh trigger
    pub const MAX: u8 = u8::MAX;

    /// Samples the gate stays open after the last continuing trigger
    pub const HANG_TICKS: u32 = Self::MAX as u32 - 2;

    /// Create a closed gate
    #[must_use]
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Feed one sample's trigger decision
    pub fn update(&mut self, triggered: bool) -> Trigger {
        if triggered {
            if self.counter == 0 {
                self.counter = Self::MAX;
                Trigger::Fresh
            } else {
                self.counter = Self::MAX - 1;
                Trigger::Continuing
            }
        } else {
            self.counter = self.counter.saturating_sub(1);
            Trigger::None
        }
    }

    /// Feed one sample and report a boundary crossing, if any
    pub fn step(&mut self, triggered: bool) -> (Trigger, Option<GateEdge>) {
        let was_enabled = self.is_enabled();
        let trigger = self.update(triggered);
        let edge = match (was_enabled, self.is_enabled()) {
            (false, true) => Some(GateEdge::Opened),
            (true, false) => Some(GateEdge::Closed),
            _ => None,
        };
        (trigger, edge)
    }

    /// Whether the carrier is enabled
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.counter > 0
    }

    /// Remaining hang count
    #[must_use]
    pub const fn counter(&self) -> u8 {
        self.counter
    }

    /// Open the gate as if a continuing trigger had just been seen
    ///
    /// Used on the transmit-gate on-edge: the carrier is on from the first
    /// sample and the first voice trigger is not a fresh one.
    pub fn arm(&mut self) {
        self.counter = Self::MAX - 1;
    }

    /// Close the gate
    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for CarrierGate {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "VOX(hang={})", self.counter);
    }
}
