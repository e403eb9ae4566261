//! Protective fault detection: input over-voltage and reverse boost.
//!
//! Neither is an error. Each drives a protective state transition in the
//! engine.

use crate::hw::UsbRt;

/// Input rail voltage treated as over-voltage.
pub const OVP_THRESHOLD_MV: i32 = 6500;

/// Whether `rail_mv` exceeds the safe input voltage.
pub const fn is_over_voltage(rail_mv: i32) -> bool {
    rail_mv >= OVP_THRESHOLD_MV
}

/// Battery FET position requested while charging is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Batfet {
    /// Battery connected to the system; the system runs from the battery.
    Close,
    /// Battery disconnected from the charge path.
    Open,
}

/// Reverse-boost signature: the source is gone while the current-sign bit
/// still reports charging.
///
/// Not checked while a shutdown disable or the clock workaround is active.
pub const fn reverse_boost_suspected(
    battery_discharging: bool,
    usb: UsbRt,
    shutdown: bool,
    clock_workaround: bool,
) -> bool {
    !battery_discharging && usb.charger_gone() && !shutdown && !clock_workaround
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::registers::CHG_GONE_RT;

    #[test]
    fn ovp_threshold_is_inclusive() {
        assert!(!is_over_voltage(6499));
        assert!(is_over_voltage(6500));
    }

    #[test]
    fn reverse_boost_needs_gone_and_charging_sign() {
        let gone = UsbRt(CHG_GONE_RT);
        assert!(reverse_boost_suspected(false, gone, false, false));
        assert!(!reverse_boost_suspected(true, gone, false, false));
        assert!(!reverse_boost_suspected(false, UsbRt(0), false, false));
        assert!(!reverse_boost_suspected(false, gone, true, false));
        assert!(!reverse_boost_suspected(false, gone, false, true));
    }
}
