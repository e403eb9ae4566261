//! Mutable engine state.
//!
//! Each field group has exactly one writer inside the engine: presence
//! handlers own the `*_present` flags, the EOC poll owns `chg_done` and the
//! trim, the thermal handler owns the zone, the protective paths own their
//! flags. The input current pairs are the exception and live in
//! [`LimitRegistry`](crate::LimitRegistry).

use platform::TemperatureWindow;

use crate::thermal::Zone;

/// Snapshot of everything the engine tracks between events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargerState {
    /// USB input attached (debounced edge).
    pub usb_present: bool,
    /// DC input attached (debounced edge).
    pub dc_present: bool,
    /// Battery detected at the last battery-present edge.
    pub battery_present: bool,
    /// Charging disabled by configuration, property or shutdown policy.
    pub charging_disabled: bool,
    /// Charging disabled because the battery hit 0 % while discharging.
    pub disabled_for_shutdown: bool,
    /// Charge terminated.
    pub chg_done: bool,
    /// JEITA zone.
    pub zone: Zone,
    /// Trim on top of the nominal max voltage, within ±50 mV.
    pub vddmax_trim_mv: i32,
    /// Charging disabled by an input over-voltage.
    pub ovp_charge_disabled: bool,
    /// Coarse-detect clock workaround running (battery FET held closed).
    pub clock_workaround: bool,
    /// Reverse-boost recovery pending.
    pub reverse_boost_pending: bool,
    /// Selected thermal mitigation level.
    pub thermal_level: u8,
    /// Stop charging when the battery reaches 0 % while discharging.
    pub stop_at_low_battery: bool,
    /// Last USB current ceiling reported by the source, milliamps.
    pub usb_current_max_ma: u32,
    /// Reported DC input maximum, milliamps.
    pub dc_current_max_ma: u32,
    /// Temperature window currently armed.
    pub window: TemperatureWindow,
}

impl ChargerState {
    /// Either protective workaround holds the charge path.
    pub const fn workaround_in_progress(&self) -> bool {
        self.clock_workaround || self.reverse_boost_pending
    }

    /// At least one input attached.
    pub const fn input_present(&self) -> bool {
        self.usb_present || self.dc_present
    }
}
