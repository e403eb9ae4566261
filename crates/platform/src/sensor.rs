//! Analog measurement seam: fuel gauge, thermistor and rail ADC channels.
//!
//! Sign convention for battery current follows the fuel gauge: positive
//! means the battery is discharging, negative means it is being charged.

use crate::units::StateOfCharge;

/// Measurement unavailable.
///
/// The control decision that needed the sample is skipped for this tick and
/// the previous state persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// The converter did not produce a sample (busy, timed out, not ready).
    #[error("measurement unavailable")]
    Unavailable,
    /// The channel does not exist on this board or silicon revision.
    #[error("measurement not supported")]
    NotSupported,
}

/// Charger input path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputPath {
    /// USB input (USBIN).
    Usb,
    /// Dedicated DC / dock input (DCIN).
    Dc,
}

/// Voltage rails the charger samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rail {
    /// Raw input pin of a charger path, before the input FET.
    Input(InputPath),
    /// Charger-side node after the input FET (VCHG). Sags when the source
    /// cannot supply the programmed input current.
    Charger,
}

/// Which edge of the armed temperature window was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Boundary {
    /// Temperature rose through the armed high threshold.
    Warm,
    /// Temperature fell through the armed low threshold.
    Cool,
}

/// Thermistor monitor window, decidegrees Celsius.
///
/// `None` disables that side of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TemperatureWindow {
    /// Notify [`Boundary::Cool`] when the temperature falls below this.
    pub low: Option<i32>,
    /// Notify [`Boundary::Warm`] when the temperature rises above this.
    pub high: Option<i32>,
}

impl TemperatureWindow {
    /// Window with both thresholds armed.
    pub const fn both(low: i32, high: i32) -> Self {
        Self { low: Some(low), high: Some(high) }
    }

    /// Window armed only on the low side.
    pub const fn low_only(low: i32) -> Self {
        Self { low: Some(low), high: None }
    }

    /// Window armed only on the high side.
    pub const fn high_only(high: i32) -> Self {
        Self { low: None, high: Some(high) }
    }

    /// Which boundary `temp_decideg` lies beyond, if any.
    pub fn crossing(&self, temp_decideg: i32) -> Option<Boundary> {
        match (self.low, self.high) {
            (_, Some(high)) if temp_decideg > high => Some(Boundary::Warm),
            (Some(low), _) if temp_decideg < low => Some(Boundary::Cool),
            _ => None,
        }
    }
}

/// Instantaneous measurements plus the thermistor threshold monitor.
pub trait SensorPort {
    /// Battery terminal voltage, millivolts.
    fn battery_voltage_mv(&mut self) -> Result<i32, SensorError>;

    /// Battery current, milliamps. Positive while discharging.
    fn battery_current_ma(&mut self) -> Result<i32, SensorError>;

    /// Battery thermistor temperature, decidegrees Celsius.
    fn battery_temperature_decideg(&mut self) -> Result<i32, SensorError>;

    /// Voltage of `rail`, millivolts.
    fn rail_voltage_mv(&mut self, rail: Rail) -> Result<i32, SensorError>;

    /// Fuel-gauge state of charge.
    fn state_of_charge(&mut self) -> Result<StateOfCharge, SensorError>;

    /// Fuel-gauge charge cycle count.
    fn cycle_count(&mut self) -> Result<u32, SensorError>;

    /// Arm the thermistor monitor. A crossing is delivered back to the
    /// engine as a [`Boundary`] notification; the monitor is one-shot and
    /// must be re-armed after every notification.
    fn set_temperature_window(&mut self, window: TemperatureWindow) -> Result<(), SensorError>;
}
