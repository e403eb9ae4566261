//! Domain newtypes.
//!
//! - `StateOfCharge`: fuel-gauge capacity, clamped 0–100 %
//!
//! Voltages, currents and temperatures stay plain `i32` millivolts,
//! milliamps and decidegrees: they are signed, take part in arithmetic on
//! every tick, and their unit is carried by the `_mv` / `_ma` / `_decideg`
//! suffix at every use site.

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("{value} outside {min}..={max}")]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

// ── StateOfCharge ────────────────────────────────────────────────────────────

/// Battery state of charge as a percentage, clamped to 0–100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct StateOfCharge(u8);

impl StateOfCharge {
    /// Fully charged.
    pub const FULL: Self = Self(100);
    /// Empty.
    pub const EMPTY: Self = Self(0);

    /// Create a `StateOfCharge`, clamping values above 100 to 100.
    #[must_use]
    pub const fn new(percent: u8) -> Self {
        if percent > 100 {
            Self(100)
        } else {
            Self(percent)
        }
    }

    /// Create a `StateOfCharge`, returning an error if `percent > 100`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `percent > 100`.
    pub fn try_new(percent: u8) -> Result<Self, OutOfRangeError> {
        if percent > 100 {
            Err(OutOfRangeError {
                value: u32::from(percent),
                min: 0,
                max: 100,
            })
        } else {
            Ok(Self(percent))
        }
    }

    /// Return the percentage (0–100).
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Whether the gauge reports a full battery.
    #[must_use]
    pub const fn is_full(self) -> bool {
        self.0 >= 100
    }
}
