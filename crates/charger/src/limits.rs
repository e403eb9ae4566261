//! Shared input-current ceilings.
//!
//! The AICL tick and the supply-changed notification both touch the
//! per-path `limit` / `set` pairs. Every read-modify-write happens inside a
//! single short critical section; the register write that follows runs
//! outside it.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use platform::InputPath;

use crate::hw::registers::{I_MAX_150_MA, I_MAX_200_MA, I_MAX_MAX_MA, I_MAX_MIN_MA, I_MAX_STEP_MA};

/// Input-rail voltage above which the source is considered to keep up.
pub const AICL_SAG_THRESHOLD_MV: i32 = 4200;

/// Ceiling and applied value of one input path, milliamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PathLimit {
    /// Ceiling reported by the source; 0 means unknown.
    pub limit_ma: u32,
    /// Currently programmed input current.
    pub set_ma: u32,
}

impl PathLimit {
    const INITIAL: Self = Self {
        limit_ma: 0,
        set_ma: I_MAX_MIN_MA,
    };

    /// Whether AICL may still step this path up.
    pub const fn can_step(self) -> bool {
        self.set_ma < programmable_floor(self.limit_ma)
    }
}

/// How [`LimitRegistry::reset`] treats the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitUpdate {
    /// Leave the ceiling alone.
    Keep,
    /// Replace the ceiling.
    Set(u32),
}

/// A step AICL decided to take. Apply it, then call
/// [`LimitRegistry::revert`] if the register write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Step {
    /// Path that was stepped.
    pub path: InputPath,
    /// Value before the step.
    pub from_ma: u32,
    /// Value after the step.
    pub to_ma: u32,
}

#[derive(Debug, Clone, Copy)]
struct Limits {
    usb: PathLimit,
    dc: PathLimit,
}

impl Limits {
    fn path_mut(&mut self, path: InputPath) -> &mut PathLimit {
        match path {
            InputPath::Usb => &mut self.usb,
            InputPath::Dc => &mut self.dc,
        }
    }
}

/// Highest input current the register can hold that does not exceed
/// `ma`: 100, 150, then whole 100 mA steps up to the register maximum.
/// Anything below 150 mA floors to the 100 mA minimum.
#[allow(clippy::arithmetic_side_effects)]
pub const fn programmable_floor(ma: u32) -> u32 {
    if ma < I_MAX_150_MA {
        I_MAX_MIN_MA
    } else if ma < I_MAX_200_MA {
        I_MAX_150_MA
    } else if ma >= I_MAX_MAX_MA {
        I_MAX_MAX_MA
    } else {
        ma - ma % I_MAX_STEP_MA
    }
}

/// Next input current step above `set_ma`.
///
/// 100 → 150 → 200 mA, then 100 mA increments, clamped to the highest
/// programmable value not above `limit_ma`.
pub const fn step_up(set_ma: u32, limit_ma: u32) -> u32 {
    let next = if set_ma < I_MAX_150_MA {
        I_MAX_150_MA
    } else if set_ma < I_MAX_200_MA {
        I_MAX_200_MA
    } else {
        set_ma.saturating_add(I_MAX_STEP_MA)
    };
    let ceiling = programmable_floor(limit_ma);
    if next > ceiling {
        ceiling
    } else {
        next
    }
}

/// Lock-guarded `limit` / `set` pairs for USB and DC.
pub struct LimitRegistry {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Limits>>,
}

impl LimitRegistry {
    /// Both ceilings unknown, both applied values at the minimum step.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Limits {
                usb: PathLimit::INITIAL,
                dc: PathLimit::INITIAL,
            })),
        }
    }

    /// Copy of one path's pair.
    pub fn snapshot(&self, path: InputPath) -> PathLimit {
        self.inner.lock(|cell| {
            let limits = cell.borrow();
            match path {
                InputPath::Usb => limits.usb,
                InputPath::Dc => limits.dc,
            }
        })
    }

    /// Reset `set` of `path` to the minimum step and optionally replace its
    /// ceiling. Returns the new applied value.
    pub fn reset(&self, path: InputPath, update: LimitUpdate) -> u32 {
        self.inner.lock(|cell| {
            let mut limits = cell.borrow_mut();
            let entry = limits.path_mut(path);
            if let LimitUpdate::Set(limit_ma) = update {
                entry.limit_ma = limit_ma;
            }
            entry.set_ma = I_MAX_MIN_MA;
            entry.set_ma
        })
    }

    /// Reset both applied values to the minimum step. Ceilings stay.
    pub fn reset_all_sets(&self) {
        self.inner.lock(|cell| {
            let mut limits = cell.borrow_mut();
            limits.usb.set_ma = I_MAX_MIN_MA;
            limits.dc.set_ma = I_MAX_MIN_MA;
        });
    }

    /// Step `path` up once if it is below its ceiling.
    pub fn try_step(&self, path: InputPath) -> Option<Step> {
        self.inner.lock(|cell| {
            let mut limits = cell.borrow_mut();
            let entry = limits.path_mut(path);
            if !entry.can_step() {
                return None;
            }
            let from_ma = entry.set_ma;
            let to_ma = step_up(from_ma, entry.limit_ma);
            if to_ma <= from_ma {
                return None;
            }
            entry.set_ma = to_ma;
            Some(Step { path, from_ma, to_ma })
        })
    }

    /// Undo `step` unless something else already moved `set`.
    pub fn revert(&self, step: Step) {
        self.inner.lock(|cell| {
            let mut limits = cell.borrow_mut();
            let entry = limits.path_mut(step.path);
            if entry.set_ma == step.to_ma {
                entry.set_ma = step.from_ma;
            }
        });
    }
}

impl Default for LimitRegistry {
    fn default() -> Self {
        Self::new()
    }
}
