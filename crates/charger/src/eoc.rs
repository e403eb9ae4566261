//! End-of-charge qualification.
//!
//! Pure pieces of the EOC poll: the consecutive-sample counter that decides
//! termination and the CV-loop max-voltage trim. The engine feeds them with
//! register and sensor reads on every tick.

/// Consecutive qualifying samples required before termination.
pub const EOC_CONSECUTIVE_SAMPLES: u8 = 3;

/// Bound of the max-voltage trim, millivolts (symmetric).
pub const VDDMAX_TRIM_LIMIT_MV: i32 = 50;

/// Below-target gap under which the max voltage is not raised, millivolts.
pub const VDDMAX_DEADBAND_MV: i32 = 13;

const VDDMAX_TRIM_FLOOR_MV: i32 = -50;

/// Resolution of the max-voltage register, millivolts.
const VDD_STEP_MV: i32 = 10;
const VDD_HALF_STEP_MV: i32 = 5;

/// One EOC poll sample while the battery FET is on and a charge phase runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// Charger regulating in the constant-voltage loop.
    pub in_cv: bool,
    /// Battery current, positive while discharging.
    pub ibat_ma: i32,
    /// Battery voltage.
    pub vbat_mv: i32,
}

/// What a sample means for termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verdict {
    /// Disqualifying sample; the counter went back to 0.
    Reset,
    /// Qualifying sample; counter value after this sample.
    Counting(u8),
    /// Voltage still below the recharge threshold. Counter untouched.
    Waiting,
    /// Enough consecutive qualifying samples: terminate.
    Terminate,
}

/// Consecutive qualifying-sample counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EocCounter {
    count: u8,
}

impl EocCounter {
    /// Fresh counter.
    pub const fn new() -> Self {
        Self { count: 0 }
    }

    /// Current count.
    pub const fn count(self) -> u8 {
        self.count
    }

    /// Back to zero.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Classify `sample` against the termination current and the recharge
    /// threshold.
    pub fn observe(&mut self, sample: Sample, term_current_ma: u32, resume_mv: u32) -> Verdict {
        let term = i32::try_from(term_current_ma).unwrap_or(i32::MAX);
        let resume = i32::try_from(resume_mv).unwrap_or(i32::MAX);
        if !sample.in_cv || sample.ibat_ma.saturating_neg() > term || sample.ibat_ma > 0 {
            self.count = 0;
            return Verdict::Reset;
        }
        if sample.vbat_mv < resume {
            return Verdict::Waiting;
        }
        self.count = self.count.saturating_add(1);
        if self.count >= EOC_CONSECUTIVE_SAMPLES {
            return Verdict::Terminate;
        }
        Verdict::Counting(self.count)
    }
}

/// New max-voltage trim after a CV-loop sample, or `None` when the battery
/// sits just below target and nothing changes.
///
/// The gap to the nominal max voltage is rounded to the nearest register
/// step, accumulated and clamped to ±[`VDDMAX_TRIM_LIMIT_MV`].
pub fn vddmax_trim(max_voltage_mv: u32, vbat_mv: i32, trim_mv: i32) -> Option<i32> {
    let max = i32::try_from(max_voltage_mv).unwrap_or(i32::MAX);
    let delta = max.saturating_sub(vbat_mv);
    if delta > 0 && delta < VDDMAX_DEADBAND_MV {
        return None;
    }
    let half = if delta > 0 { VDD_HALF_STEP_MV } else { VDD_HALF_STEP_MV.wrapping_neg() };
    let closest = delta
        .saturating_add(half)
        .wrapping_div(VDD_STEP_MV)
        .saturating_mul(VDD_STEP_MV);
    Some(
        trim_mv
            .saturating_add(closest)
            .clamp(VDDMAX_TRIM_FLOOR_MV, VDDMAX_TRIM_LIMIT_MV),
    )
}
