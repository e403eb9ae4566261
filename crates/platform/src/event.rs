//! Charger interrupt lines.
//!
//! Interrupt context only records which [`Line`] fired; everything else
//! happens in deferred task context. [`EventSource`] lets the engine mask and
//! unmask individual lines, e.g. the low-voltage-detect line is armed only
//! after charge termination.

/// Edge-triggered charger interrupt lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    /// USB input valid changed.
    UsbPresent,
    /// DC input valid changed.
    DcPresent,
    /// Charger entered fast (constant-current / constant-voltage) charge.
    FastChargeOn,
    /// Charger entered trickle charge.
    TrickleChargeOn,
    /// Safety timer expired or the charge cycle failed.
    ChargeFailed,
    /// Battery voltage fell below the recharge threshold (VBATDET low).
    LowVoltageDetect,
    /// Battery presence changed.
    BatteryPresent,
    /// Coarse input detection on the USB path.
    InputCoarseDetect,
    /// Input source electrically disappeared (CHG_GONE).
    InputGone,
}

impl Line {
    /// Every line, in a fixed order.
    pub const ALL: [Line; 9] = [
        Line::UsbPresent,
        Line::DcPresent,
        Line::FastChargeOn,
        Line::TrickleChargeOn,
        Line::ChargeFailed,
        Line::LowVoltageDetect,
        Line::BatteryPresent,
        Line::InputCoarseDetect,
        Line::InputGone,
    ];

    /// Bit position of this line in a [`LineSet`].
    pub const fn bit(self) -> u16 {
        match self {
            Line::UsbPresent => 1 << 0,
            Line::DcPresent => 1 << 1,
            Line::FastChargeOn => 1 << 2,
            Line::TrickleChargeOn => 1 << 3,
            Line::ChargeFailed => 1 << 4,
            Line::LowVoltageDetect => 1 << 5,
            Line::BatteryPresent => 1 << 6,
            Line::InputCoarseDetect => 1 << 7,
            Line::InputGone => 1 << 8,
        }
    }

    /// Short name for log output.
    pub const fn name(self) -> &'static str {
        match self {
            Line::UsbPresent => "usb-present",
            Line::DcPresent => "dc-present",
            Line::FastChargeOn => "fast-charge-on",
            Line::TrickleChargeOn => "trickle-charge-on",
            Line::ChargeFailed => "charge-failed",
            Line::LowVoltageDetect => "low-voltage-detect",
            Line::BatteryPresent => "battery-present",
            Line::InputCoarseDetect => "input-coarse-detect",
            Line::InputGone => "input-gone",
        }
    }
}

/// Compact set of [`Line`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineSet(u16);

impl LineSet {
    /// Empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Set containing every line.
    pub const fn all() -> Self {
        Self(0x01FF)
    }

    /// Add `line`.
    pub fn insert(&mut self, line: Line) {
        self.0 |= line.bit();
    }

    /// Remove `line`.
    pub fn remove(&mut self, line: Line) {
        self.0 &= !line.bit();
    }

    /// Membership test.
    pub const fn contains(self, line: Line) -> bool {
        self.0 & line.bit() != 0
    }
}

/// Per-line interrupt masking.
pub trait EventSource {
    /// Unmask `line`. Enabling an already-enabled line is a no-op.
    fn enable(&mut self, line: Line);

    /// Mask `line`. Disabling an already-disabled line is a no-op.
    fn disable(&mut self, line: Line);

    /// Whether `line` is currently unmasked.
    fn is_enabled(&self, line: Line) -> bool;
}

/// Software line mask for interrupt controllers without per-line masking.
///
/// The ISR consults [`is_enabled`](EventSource::is_enabled) and drops edges
/// of masked lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftLineMask {
    enabled: LineSet,
}

impl SoftLineMask {
    /// All lines enabled.
    pub const fn new() -> Self {
        Self { enabled: LineSet::all() }
    }
}

impl Default for SoftLineMask {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for SoftLineMask {
    fn enable(&mut self, line: Line) {
        self.enabled.insert(line);
    }

    fn disable(&mut self, line: Line) {
        self.enabled.remove(line);
    }

    fn is_enabled(&self, line: Line) -> bool {
        self.enabled.contains(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::indexing_slicing)]
    fn line_bits_are_distinct() {
        for (i, a) in Line::ALL.iter().enumerate() {
            for b in &Line::ALL[i + 1..] {
                assert_eq!(a.bit() & b.bit(), 0, "{} overlaps {}", a.name(), b.name());
            }
        }
    }

    #[test]
    fn all_contains_every_line() {
        let set = LineSet::all();
        for line in Line::ALL {
            assert!(set.contains(line));
        }
    }

    #[test]
    fn soft_mask_starts_enabled_and_toggles() {
        let mut mask = SoftLineMask::new();
        assert!(mask.is_enabled(Line::LowVoltageDetect));
        mask.disable(Line::LowVoltageDetect);
        assert!(!mask.is_enabled(Line::LowVoltageDetect));
        assert!(mask.is_enabled(Line::FastChargeOn));
        mask.enable(Line::LowVoltageDetect);
        assert!(mask.is_enabled(Line::LowVoltageDetect));
    }
}
