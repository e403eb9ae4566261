//! Deferred task identities and their periods.

use embassy_time::Duration;

/// Deferred charger work. At most one instance of each is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskId {
    /// End-of-charge poll.
    Eoc,
    /// Input current ramp.
    Aicl,
    /// Battery health re-read.
    HealthCheck,
    /// Input rail over-voltage check after a plug edge.
    OvpCheck,
    /// Re-enable charging after the reverse-boost suspend.
    ReverseBoostRecovery,
    /// Hand the buck clock back to hardware after a coarse detect.
    ClockRestore,
    /// Fast-charge status poll replacing the fast-charge line.
    FastChargePoll,
}

impl TaskId {
    /// Number of distinct tasks; sizes the timer queue.
    pub const COUNT: usize = 7;

    /// Delay before the next run.
    pub const fn period(self) -> Duration {
        match self {
            Self::Eoc | Self::HealthCheck => Duration::from_secs(10),
            Self::Aicl => Duration::from_millis(200),
            Self::OvpCheck => Duration::from_millis(0),
            Self::ReverseBoostRecovery => Duration::from_millis(500),
            Self::ClockRestore => Duration::from_millis(25),
            Self::FastChargePoll => Duration::from_secs(5),
        }
    }

    /// Short name for log output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Eoc => "eoc",
            Self::Aicl => "aicl",
            Self::HealthCheck => "health",
            Self::OvpCheck => "ovp-check",
            Self::ReverseBoostRecovery => "rb-recovery",
            Self::ClockRestore => "clock-restore",
            Self::FastChargePoll => "fast-charge-poll",
        }
    }
}
