//! Automatic input current limiting.
//!
//! Every 200 ms, while the charger-side rail holds up, the applied input
//! current of the active path is stepped one notch towards the ceiling the
//! source reported. DC wins over USB when both are attached.

use platform::{InputPath, SensorError};

use crate::limits::{LimitRegistry, Step, AICL_SAG_THRESHOLD_MV};

/// Ticks with both inputs absent before the task stops.
pub const AICL_DISCONNECT_TICKS: u8 = 3;

/// Which inputs are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Inputs {
    /// USB attached.
    pub usb: bool,
    /// DC attached.
    pub dc: bool,
}

impl Inputs {
    /// At least one input attached.
    pub const fn any(self) -> bool {
        self.usb || self.dc
    }
}

/// Result of one AICL decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Decision {
    /// A path was stepped; program it and revert on failure.
    Step(Step),
    /// Waiting for the source to report a ceiling; counts as working.
    AwaitingLimit,
    /// Nothing to do this tick.
    Idle,
}

impl Decision {
    /// Whether AICL is actively working, which suppresses the reverse-boost
    /// check.
    pub const fn working(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Decide this tick's step. The registry lock is held only inside
/// [`LimitRegistry::try_step`].
pub fn decide(
    limits: &LimitRegistry,
    inputs: Inputs,
    vchg_mv: Result<i32, SensorError>,
) -> Decision {
    let Ok(vchg_mv) = vchg_mv else {
        return Decision::Idle;
    };
    if inputs.usb && !inputs.dc && limits.snapshot(InputPath::Usb).limit_ma == 0 {
        return Decision::AwaitingLimit;
    }
    if vchg_mv <= AICL_SAG_THRESHOLD_MV {
        return Decision::Idle;
    }
    let path = if inputs.dc {
        InputPath::Dc
    } else if inputs.usb {
        InputPath::Usb
    } else {
        return Decision::Idle;
    };
    limits.try_step(path).map_or(Decision::Idle, Decision::Step)
}

/// Counts ticks with both inputs gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisconnectCounter {
    ticks: u8,
}

impl DisconnectCounter {
    /// Fresh counter.
    pub const fn new() -> Self {
        Self { ticks: 0 }
    }

    /// Record one tick; `true` when the task should stop.
    pub fn tick(&mut self, inputs: Inputs) -> bool {
        if inputs.any() {
            self.ticks = 0;
            return false;
        }
        self.ticks = self.ticks.saturating_add(1);
        if self.ticks >= AICL_DISCONNECT_TICKS {
            self.ticks = 0;
            return true;
        }
        false
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::limits::LimitUpdate;

    const USB: Inputs = Inputs { usb: true, dc: false };
    const BOTH: Inputs = Inputs { usb: true, dc: true };

    #[test]
    fn dc_steps_and_usb_is_untouched() {
        let limits = LimitRegistry::new();
        limits.reset(InputPath::Dc, LimitUpdate::Set(1500));
        limits.reset(InputPath::Usb, LimitUpdate::Set(1500));
        for _ in 0..4 {
            limits.try_step(InputPath::Dc);
        }
        assert_eq!(limits.snapshot(InputPath::Dc).set_ma, 500);
        let decision = decide(&limits, BOTH, Ok(4800));
        assert_eq!(
            decision,
            Decision::Step(Step { path: InputPath::Dc, from_ma: 500, to_ma: 600 })
        );
        assert_eq!(limits.snapshot(InputPath::Usb).set_ma, 100);
    }

    #[test]
    fn dc_at_limit_blocks_usb() {
        let limits = LimitRegistry::new();
        limits.reset(InputPath::Usb, LimitUpdate::Set(1500));
        assert_eq!(decide(&limits, BOTH, Ok(4800)), Decision::Idle);
        assert_eq!(limits.snapshot(InputPath::Usb).set_ma, 100);
    }

    #[test]
    fn sagging_rail_stops_stepping() {
        let limits = LimitRegistry::new();
        limits.reset(InputPath::Usb, LimitUpdate::Set(1500));
        assert_eq!(decide(&limits, USB, Ok(4200)), Decision::Idle);
        assert!(decide(&limits, USB, Ok(4201)).working());
    }

    #[test]
    fn unknown_usb_ceiling_counts_as_working() {
        let limits = LimitRegistry::new();
        assert_eq!(decide(&limits, USB, Ok(4800)), Decision::AwaitingLimit);
    }

    #[test]
    fn failed_sample_is_idle() {
        let limits = LimitRegistry::new();
        assert_eq!(decide(&limits, USB, Err(SensorError::Unavailable)), Decision::Idle);
    }

    #[test]
    fn disconnect_counter_needs_three_ticks() {
        let mut c = DisconnectCounter::new();
        let none = Inputs::default();
        assert!(!c.tick(none));
        assert!(!c.tick(none));
        assert!(!c.tick(USB));
        assert!(!c.tick(none));
        assert!(!c.tick(none));
        assert!(c.tick(none));
    }
}
