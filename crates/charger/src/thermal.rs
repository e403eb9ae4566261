//! JEITA thermal compliance.
//!
//! Three mutually exclusive zones. A crossing notification from the
//! thermistor monitor plus a fresh temperature sample decides the next zone
//! and the window to arm next; the hysteresis band keeps a temperature
//! hovering on a threshold from flipping the zone back and forth.

use platform::{Boundary, TemperatureWindow};

use crate::config::{ChargerConfig, JeitaConfig};

/// Battery temperature zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Zone {
    /// Between the cool and warm thresholds.
    #[default]
    Normal,
    /// Below the cool threshold.
    Cool,
    /// Above the warm threshold.
    Warm,
}

/// Outcome of one crossing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    /// Zone the sample belongs to.
    pub zone: Zone,
    /// Window to arm next.
    pub window: TemperatureWindow,
}

/// Window armed while in [`Zone::Normal`].
pub const fn normal_window(jeita: &JeitaConfig) -> TemperatureWindow {
    TemperatureWindow::both(jeita.cool_decideg, jeita.warm_decideg)
}

/// Decide the zone after `boundary` was crossed and the battery now reads
/// `temp_decideg`.
///
/// `None` means the sample sits inside the hysteresis band: the zone stays
/// and the previous window must be re-armed.
pub fn on_crossing(jeita: &JeitaConfig, boundary: Boundary, temp_decideg: i32) -> Option<Transition> {
    let hyst = jeita.hysteresis_decideg;
    match boundary {
        Boundary::Warm if temp_decideg > jeita.warm_decideg => Some(Transition {
            zone: Zone::Warm,
            window: TemperatureWindow::low_only(jeita.warm_decideg.saturating_sub(hyst)),
        }),
        Boundary::Warm if temp_decideg > jeita.cool_decideg.saturating_add(hyst) => {
            Some(Transition {
                zone: Zone::Normal,
                window: normal_window(jeita),
            })
        }
        Boundary::Cool if temp_decideg < jeita.cool_decideg => Some(Transition {
            zone: Zone::Cool,
            window: TemperatureWindow::high_only(jeita.cool_decideg.saturating_add(hyst)),
        }),
        Boundary::Cool if temp_decideg < jeita.warm_decideg.saturating_sub(hyst) => {
            Some(Transition {
                zone: Zone::Normal,
                window: normal_window(jeita),
            })
        }
        _ => None,
    }
}

/// Max battery voltage for `zone`, before trim.
pub fn target_voltage_mv(config: &ChargerConfig, zone: Zone) -> u32 {
    match (zone, &config.jeita) {
        (Zone::Cool, Some(jeita)) => jeita.cool_voltage_mv,
        (Zone::Warm, Some(jeita)) => jeita.warm_voltage_mv,
        _ => config.max_voltage_mv,
    }
}

/// Recharge threshold for `zone`.
pub fn resume_voltage_mv(config: &ChargerConfig, zone: Zone) -> u32 {
    target_voltage_mv(config, zone).saturating_sub(config.resume_delta_mv)
}

/// Battery current ceiling for `zone` and mitigation `level`.
///
/// Level 0 applies no mitigation.
pub fn battery_current_ma(config: &ChargerConfig, zone: Zone, level: usize) -> u32 {
    let mut ma = config.max_battery_current_ma;
    if let Some(jeita) = &config.jeita {
        match zone {
            Zone::Cool => ma = ma.min(jeita.cool_current_ma),
            Zone::Warm => ma = ma.min(jeita.warm_current_ma),
            Zone::Normal => {}
        }
    }
    if level != 0 {
        if let Some(&table_ma) = config.thermal_mitigation.get(level) {
            ma = ma.min(table_ma);
        }
    }
    ma
}
