//! Error taxonomy of the charger engine.
//!
//! - [`ConfigError`]: malformed configuration, fatal to start-up.
//! - [`ChargerError`]: a register setter or hardware init step failed.
//!
//! Protective faults (input over-voltage, reverse boost) are not errors:
//! they drive state transitions inside the engine.

use platform::{BusError, SensorError};

/// Configuration rejected by [`ChargerConfig::validate`](crate::ChargerConfig::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `min_voltage_mv < max_voltage_mv <= safe_voltage_mv` does not hold.
    #[error("voltage ordering violated: need min < max <= safe")]
    VoltageOrdering,
    /// A single field is outside the range the hardware can program.
    #[error("{field} out of range")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
    },
    /// Warm/cool thresholds are set but a matching voltage or current is not.
    #[error("warm/cool thresholds require warm/cool voltages and currents")]
    MissingJeitaParameter,
    /// The thermal mitigation table has more levels than supported.
    #[error("thermal mitigation table too large")]
    ThermalTableTooLarge,
    /// Resume delta is not below the max voltage, or the SOC delta exceeds 100.
    #[error("resume delta out of range")]
    ResumeDelta,
}

/// Failure of a register-level charger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargerError {
    /// Register I/O failed.
    #[error("register bus: {0}")]
    Bus(BusError),
    /// A sensor sample was unavailable.
    #[error("sensor: {0}")]
    Sensor(SensorError),
    /// The requested value cannot be programmed.
    #[error("value out of range")]
    InvalidValue,
}

impl From<BusError> for ChargerError {
    fn from(err: BusError) -> Self {
        Self::Bus(err)
    }
}

impl From<SensorError> for ChargerError {
    fn from(err: SensorError) -> Self {
        Self::Sensor(err)
    }
}
