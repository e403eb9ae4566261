//! Battery status, health and charge type as reported to consumers.

use crate::hw::registers::{BATT_TEMP_HOT, BATT_TEMP_OK};
use crate::hw::ChargerRt;

/// Reported when capacity cannot be measured or is not meaningful.
pub const DEFAULT_CAPACITY_PERCENT: u8 = 50;
/// Reported when temperature cannot be measured, decidegrees Celsius.
pub const DEFAULT_TEMPERATURE_DECIDEG: i32 = 250;

/// Battery charge status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryStatus {
    /// A charge phase is running.
    Charging,
    /// No charge phase is running.
    Discharging,
    /// Charge terminated with an input attached.
    Full,
}

/// Battery temperature health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryHealth {
    /// Inside the charging temperature range.
    Good,
    /// Too hot to charge.
    Overheat,
    /// Too cold to charge.
    Cold,
    /// Status register unreadable.
    Unknown,
}

impl BatteryHealth {
    /// Decode the battery interface status register.
    pub const fn from_status(status: u8) -> Self {
        if status & BATT_TEMP_OK != 0 {
            Self::Good
        } else if status & BATT_TEMP_HOT != 0 {
            Self::Overheat
        } else {
            Self::Cold
        }
    }

    /// Outside the charging temperature range.
    pub const fn blocks_charging(self) -> bool {
        matches!(self, Self::Overheat | Self::Cold)
    }
}

/// Active charge phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargeType {
    /// Not charging, or no battery.
    None,
    /// Pre-charge of a deeply discharged battery.
    Trickle,
    /// Constant-current or constant-voltage charge.
    Fast,
}

/// Status from the published inputs, EOC state, health and charger bits.
pub fn battery_status(
    input_present: bool,
    chg_done: bool,
    health: BatteryHealth,
    chgr: ChargerRt,
) -> BatteryStatus {
    if input_present && chg_done {
        BatteryStatus::Full
    } else if health.blocks_charging() {
        BatteryStatus::Discharging
    } else if chgr.charging() {
        BatteryStatus::Charging
    } else {
        BatteryStatus::Discharging
    }
}

/// Charge phase from the charger bits.
pub fn charge_type(battery_present: bool, chgr: ChargerRt) -> ChargeType {
    if !battery_present {
        ChargeType::None
    } else if chgr.trickle_charge_on() {
        ChargeType::Trickle
    } else if chgr.fast_charge_on() {
        ChargeType::Fast
    } else {
        ChargeType::None
    }
}

/// Last observed health plus a latched "changed since last published" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthTracker {
    last: BatteryHealth,
    changed: bool,
}

impl HealthTracker {
    /// Nothing observed yet.
    pub const fn new() -> Self {
        Self {
            last: BatteryHealth::Unknown,
            changed: false,
        }
    }

    /// Last observed health.
    pub const fn last(self) -> BatteryHealth {
        self.last
    }

    /// Record a fresh reading. A change stays latched until
    /// [`take_changed`](Self::take_changed).
    pub fn record(&mut self, health: BatteryHealth) {
        if self.last != health {
            self.changed = true;
        }
        self.last = health;
    }

    /// Whether health moved since the last call; clears the latch.
    pub fn take_changed(&mut self) -> bool {
        core::mem::replace(&mut self.changed, false)
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::registers::{FAST_CHG_ON_RT, TRKL_CHG_ON_RT};

    #[test]
    fn health_bits_decode() {
        assert_eq!(BatteryHealth::from_status(0x80), BatteryHealth::Good);
        assert_eq!(BatteryHealth::from_status(0xC0), BatteryHealth::Good);
        assert_eq!(BatteryHealth::from_status(0x40), BatteryHealth::Overheat);
        assert_eq!(BatteryHealth::from_status(0x00), BatteryHealth::Cold);
    }

    #[test]
    fn full_needs_input_and_done() {
        let fast = ChargerRt(FAST_CHG_ON_RT);
        assert_eq!(battery_status(true, true, BatteryHealth::Good, fast), BatteryStatus::Full);
        assert_eq!(battery_status(false, true, BatteryHealth::Good, fast), BatteryStatus::Charging);
    }

    #[test]
    fn bad_health_reads_discharging() {
        let fast = ChargerRt(FAST_CHG_ON_RT);
        assert_eq!(
            battery_status(true, false, BatteryHealth::Overheat, fast),
            BatteryStatus::Discharging
        );
    }

    #[test]
    fn charge_type_prefers_trickle() {
        let both = ChargerRt(FAST_CHG_ON_RT | TRKL_CHG_ON_RT);
        assert_eq!(charge_type(true, both), ChargeType::Trickle);
        assert_eq!(charge_type(false, both), ChargeType::None);
        assert_eq!(charge_type(true, ChargerRt(FAST_CHG_ON_RT)), ChargeType::Fast);
    }

    #[test]
    fn tracker_latches_changes() {
        let mut t = HealthTracker::new();
        t.record(BatteryHealth::Good);
        t.record(BatteryHealth::Good);
        assert!(t.take_changed());
        assert!(!t.take_changed());
        t.record(BatteryHealth::Cold);
        t.record(BatteryHealth::Good);
        assert!(t.take_changed(), "a bounce still counts");
        assert_eq!(t.last(), BatteryHealth::Good);
    }
}
