//! Static charger configuration.
//!
//! [`ChargerConfig`] is built once, validated, and never mutated afterwards.
//! Start from [`ChargerConfig::builder`]:
//!
//! ```
//! use charger::{ChargerConfig, JeitaConfig};
//!
//! let config = ChargerConfig::builder()
//!     .max_voltage_mv(4350)
//!     .safe_voltage_mv(4400)
//!     .max_battery_current_ma(1500)
//!     .jeita(JeitaConfig {
//!         warm_decideg: 450,
//!         cool_decideg: 100,
//!         warm_voltage_mv: 4100,
//!         cool_voltage_mv: 4100,
//!         warm_current_ma: 700,
//!         cool_current_ma: 700,
//!         hysteresis_decideg: 20,
//!     })
//!     .build()
//!     .unwrap();
//! assert_eq!(config.max_voltage_mv, 4350);
//! ```

use crate::error::ConfigError;
use crate::variant::ChipVariant;

/// Most thermal mitigation levels a configuration may carry.
pub const MAX_THERMAL_LEVELS: usize = 8;

/// Battery current ceiling per thermal mitigation level, milliamps.
///
/// Level 0 means "no mitigation"; the last level stops charging.
pub type ThermalTable = heapless::Vec<u32, MAX_THERMAL_LEVELS>;

// ── Hardware ranges ──────────────────────────────────────────────────────────

/// Programmable max battery voltage range, millivolts.
pub const VDDMAX_RANGE_MV: (u32, u32) = (3400, 4500);
/// Programmable safe battery voltage range, millivolts.
pub const VDDSAFE_RANGE_MV: (u32, u32) = (3240, 4500);
/// Programmable input voltage floor range, millivolts.
pub const VINMIN_RANGE_MV: (u32, u32) = (3400, 9600);
/// Programmable safe battery current range, milliamps.
pub const IBATSAFE_RANGE_MA: (u32, u32) = (200, 3000);
/// Programmable max battery current range, milliamps.
pub const IBATMAX_RANGE_MA: (u32, u32) = (50, 3250);
/// Programmable termination current range, milliamps.
pub const ITERM_RANGE_MA: (u32, u32) = (100, 250);
/// Programmable safety timer range, minutes.
pub const TCHG_RANGE_MIN: (u32, u32) = (4, 512);

const fn within(value: u32, (min, max): (u32, u32)) -> bool {
    value >= min && value <= max
}

// ── Sub-structures ───────────────────────────────────────────────────────────

/// Battery-presence detection scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BpdScheme {
    /// Detect through the thermistor line.
    #[default]
    BatThm,
    /// Detect through the battery ID line.
    BatId,
    /// Either line.
    BatThmBatId,
}

/// Boolean feature flags, resolved once at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Features {
    /// Poll fast-charge status every 5 s instead of using the interrupt.
    pub fast_charge_polling: bool,
    /// Entering the warm zone selects the last (stop) thermal level.
    pub warm_disables_charging: bool,
    /// Initial value of the stop-charging-at-low-battery policy.
    pub stop_charging_at_low_battery: bool,
    /// Start with charging disabled.
    pub charging_disabled: bool,
    /// Batteryless hardware: charging disabled, default capacity/temperature.
    pub use_default_battery_values: bool,
    /// Allow the buck to run at 100 % duty cycle.
    pub duty_cycle_100p: bool,
}

/// Base address of every charger peripheral block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeripheralBases {
    /// Charger core.
    pub chgr: u16,
    /// Buck regulator.
    pub buck: u16,
    /// Battery interface.
    pub bat_if: u16,
    /// USB input path.
    pub usb: u16,
    /// DC input path.
    pub dc: u16,
    /// Boost regulator.
    pub boost: u16,
    /// Miscellaneous block (clock control).
    pub misc: u16,
}

impl Default for PeripheralBases {
    fn default() -> Self {
        Self {
            chgr: 0x1000,
            buck: 0x1100,
            bat_if: 0x1200,
            usb: 0x1300,
            dc: 0x1400,
            boost: 0x1500,
            misc: 0x1600,
        }
    }
}

/// JEITA warm/cool band parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JeitaConfig {
    /// Warm threshold, decidegrees Celsius.
    pub warm_decideg: i32,
    /// Cool threshold, decidegrees Celsius.
    pub cool_decideg: i32,
    /// Max battery voltage while warm.
    pub warm_voltage_mv: u32,
    /// Max battery voltage while cool.
    pub cool_voltage_mv: u32,
    /// Battery current ceiling while warm.
    pub warm_current_ma: u32,
    /// Battery current ceiling while cool.
    pub cool_current_ma: u32,
    /// Width of the hysteresis band, decidegrees.
    pub hysteresis_decideg: i32,
}

// ── ChargerConfig ────────────────────────────────────────────────────────────

/// Immutable charger configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargerConfig {
    /// Nominal max battery voltage (VDD_MAX).
    pub max_voltage_mv: u32,
    /// Input voltage floor (VIN_MIN).
    pub min_voltage_mv: u32,
    /// Absolute battery voltage ceiling (VDD_SAFE).
    pub safe_voltage_mv: u32,
    /// Recharge threshold below the max voltage.
    pub resume_delta_mv: u32,
    /// Recharge when SOC drops this far below 100 %; 0 uses the voltage
    /// threshold instead.
    pub resume_delta_soc: u8,
    /// Battery current ceiling (IBAT_MAX).
    pub max_battery_current_ma: u32,
    /// Absolute battery current ceiling (IBAT_SAFE).
    pub safe_current_ma: u32,
    /// Termination current; 0 leaves the hardware default.
    pub term_current_ma: u32,
    /// Safety timer, minutes.
    pub tchg_mins: u32,
    /// USB input current cap; 0 for none.
    pub max_input_usb_ma: u32,
    /// DC input current cap; 0 for none.
    pub max_input_dc_ma: u32,
    /// JEITA bands; `None` disables thermal compliance.
    pub jeita: Option<JeitaConfig>,
    /// Thermal mitigation current table.
    pub thermal_mitigation: ThermalTable,
    /// Battery-presence detection scheme.
    pub bpd: BpdScheme,
    /// Feature flags.
    pub features: Features,
    /// Peripheral base addresses.
    pub bases: PeripheralBases,
    /// Silicon variant.
    pub variant: ChipVariant,
}

impl Default for ChargerConfig {
    fn default() -> Self {
        Self {
            max_voltage_mv: 4200,
            min_voltage_mv: 4000,
            safe_voltage_mv: 4200,
            resume_delta_mv: 100,
            resume_delta_soc: 0,
            max_battery_current_ma: 1500,
            safe_current_ma: 1500,
            term_current_ma: 100,
            tchg_mins: 384,
            max_input_usb_ma: 0,
            max_input_dc_ma: 0,
            jeita: None,
            thermal_mitigation: ThermalTable::new(),
            bpd: BpdScheme::default(),
            features: Features::default(),
            bases: PeripheralBases::default(),
            variant: ChipVariant::default(),
        }
    }
}

impl ChargerConfig {
    /// Start a builder from the default configuration.
    pub fn builder() -> ChargerConfigBuilder {
        ChargerConfigBuilder {
            config: Self::default(),
            too_many_levels: false,
        }
    }

    /// Check every field against the hardware ranges and cross-field rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_voltage_mv < self.max_voltage_mv
            && self.max_voltage_mv <= self.safe_voltage_mv)
        {
            return Err(ConfigError::VoltageOrdering);
        }
        check(self.max_voltage_mv, VDDMAX_RANGE_MV, "max_voltage_mv")?;
        check(self.safe_voltage_mv, VDDSAFE_RANGE_MV, "safe_voltage_mv")?;
        check(self.min_voltage_mv, VINMIN_RANGE_MV, "min_voltage_mv")?;
        check(self.safe_current_ma, IBATSAFE_RANGE_MA, "safe_current_ma")?;
        check(self.max_battery_current_ma, IBATMAX_RANGE_MA, "max_battery_current_ma")?;
        if self.term_current_ma != 0 {
            check(self.term_current_ma, ITERM_RANGE_MA, "term_current_ma")?;
        }
        check(self.tchg_mins, TCHG_RANGE_MIN, "tchg_mins")?;
        if self.resume_delta_mv >= self.max_voltage_mv || self.resume_delta_soc > 100 {
            return Err(ConfigError::ResumeDelta);
        }
        if let Some(jeita) = &self.jeita {
            validate_jeita(jeita, self.resume_delta_mv)?;
        }
        // Level 0 is "no mitigation" and the last level stops charging; only
        // the levels in between program a current.
        let programmed = self.thermal_mitigation.len().saturating_sub(2);
        if self
            .thermal_mitigation
            .iter()
            .skip(1)
            .take(programmed)
            .any(|ma| !within(*ma, IBATMAX_RANGE_MA))
        {
            return Err(ConfigError::OutOfRange {
                field: "thermal_mitigation",
            });
        }
        Ok(())
    }

    /// Recharge threshold for the nominal max voltage.
    pub fn resume_voltage_mv(&self) -> u32 {
        self.max_voltage_mv.saturating_sub(self.resume_delta_mv)
    }
}

fn check(value: u32, range: (u32, u32), field: &'static str) -> Result<(), ConfigError> {
    if within(value, range) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field })
    }
}

fn validate_jeita(jeita: &JeitaConfig, resume_delta_mv: u32) -> Result<(), ConfigError> {
    if jeita.warm_voltage_mv == 0
        || jeita.cool_voltage_mv == 0
        || jeita.warm_current_ma == 0
        || jeita.cool_current_ma == 0
    {
        return Err(ConfigError::MissingJeitaParameter);
    }
    if jeita.warm_decideg <= jeita.cool_decideg {
        return Err(ConfigError::OutOfRange {
            field: "warm_decideg",
        });
    }
    if jeita.hysteresis_decideg < 0 {
        return Err(ConfigError::OutOfRange {
            field: "hysteresis_decideg",
        });
    }
    check(jeita.warm_voltage_mv, VDDMAX_RANGE_MV, "warm_voltage_mv")?;
    check(jeita.cool_voltage_mv, VDDMAX_RANGE_MV, "cool_voltage_mv")?;
    check(jeita.warm_current_ma, IBATMAX_RANGE_MA, "warm_current_ma")?;
    check(jeita.cool_current_ma, IBATMAX_RANGE_MA, "cool_current_ma")?;
    if resume_delta_mv >= jeita.warm_voltage_mv.min(jeita.cool_voltage_mv) {
        return Err(ConfigError::ResumeDelta);
    }
    Ok(())
}

// ── Builder ──────────────────────────────────────────────────────────────────

/// Consuming builder for [`ChargerConfig`].
#[derive(Debug, Clone)]
pub struct ChargerConfigBuilder {
    config: ChargerConfig,
    too_many_levels: bool,
}

impl ChargerConfigBuilder {
    /// Nominal max battery voltage.
    #[must_use]
    pub fn max_voltage_mv(mut self, mv: u32) -> Self {
        self.config.max_voltage_mv = mv;
        self
    }

    /// Input voltage floor.
    #[must_use]
    pub fn min_voltage_mv(mut self, mv: u32) -> Self {
        self.config.min_voltage_mv = mv;
        self
    }

    /// Absolute battery voltage ceiling.
    #[must_use]
    pub fn safe_voltage_mv(mut self, mv: u32) -> Self {
        self.config.safe_voltage_mv = mv;
        self
    }

    /// Voltage-based recharge delta.
    #[must_use]
    pub fn resume_delta_mv(mut self, mv: u32) -> Self {
        self.config.resume_delta_mv = mv;
        self
    }

    /// SOC-based recharge delta; 0 disables it.
    #[must_use]
    pub fn resume_delta_soc(mut self, percent: u8) -> Self {
        self.config.resume_delta_soc = percent;
        self
    }

    /// Battery current ceiling.
    #[must_use]
    pub fn max_battery_current_ma(mut self, ma: u32) -> Self {
        self.config.max_battery_current_ma = ma;
        self
    }

    /// Absolute battery current ceiling.
    #[must_use]
    pub fn safe_current_ma(mut self, ma: u32) -> Self {
        self.config.safe_current_ma = ma;
        self
    }

    /// Termination current; 0 leaves the hardware default.
    #[must_use]
    pub fn term_current_ma(mut self, ma: u32) -> Self {
        self.config.term_current_ma = ma;
        self
    }

    /// Safety timer.
    #[must_use]
    pub fn tchg_mins(mut self, mins: u32) -> Self {
        self.config.tchg_mins = mins;
        self
    }

    /// USB input current cap.
    #[must_use]
    pub fn max_input_usb_ma(mut self, ma: u32) -> Self {
        self.config.max_input_usb_ma = ma;
        self
    }

    /// DC input current cap.
    #[must_use]
    pub fn max_input_dc_ma(mut self, ma: u32) -> Self {
        self.config.max_input_dc_ma = ma;
        self
    }

    /// Enable JEITA thermal compliance.
    #[must_use]
    pub fn jeita(mut self, jeita: JeitaConfig) -> Self {
        self.config.jeita = Some(jeita);
        self
    }

    /// Thermal mitigation table, level 0 first.
    ///
    /// Tables longer than [`MAX_THERMAL_LEVELS`] make [`build`](Self::build)
    /// fail with [`ConfigError::ThermalTableTooLarge`].
    #[must_use]
    pub fn thermal_mitigation(mut self, levels: &[u32]) -> Self {
        self.config.thermal_mitigation.clear();
        self.too_many_levels = false;
        if self.config.thermal_mitigation.extend_from_slice(levels).is_err() {
            self.config.thermal_mitigation.clear();
            self.too_many_levels = true;
        }
        self
    }

    /// Battery-presence detection scheme.
    #[must_use]
    pub fn bpd(mut self, scheme: BpdScheme) -> Self {
        self.config.bpd = scheme;
        self
    }

    /// Feature flags.
    #[must_use]
    pub fn features(mut self, features: Features) -> Self {
        self.config.features = features;
        self
    }

    /// Peripheral base addresses.
    #[must_use]
    pub fn bases(mut self, bases: PeripheralBases) -> Self {
        self.config.bases = bases;
        self
    }

    /// Silicon variant.
    #[must_use]
    pub fn variant(mut self, variant: ChipVariant) -> Self {
        self.config.variant = variant;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<ChargerConfig, ConfigError> {
        if self.too_many_levels {
            return Err(ConfigError::ThermalTableTooLarge);
        }
        self.config.validate()?;
        Ok(self.config)
    }
}
