//! State publication seam.
//!
//! The engine does not push values; it tells the sink *what* changed and
//! consumers pull the current values back through the engine's synchronous
//! accessors.

/// Power-supply domains published by the charger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Domain {
    /// Battery status, health, capacity, temperature.
    Battery,
    /// USB input.
    UsbMains,
    /// DC / dock input.
    DcMains,
}

/// Dock state derived from DC input presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DockState {
    /// Not docked.
    Undocked,
    /// Sitting in a desk dock (DC input present).
    Desk,
}

/// Consumer of charger state changes.
pub trait Sink {
    /// Something observable in `domain` changed.
    fn notify_changed(&mut self, domain: Domain);

    /// Presence of an input domain changed.
    fn set_present(&mut self, domain: Domain, present: bool);

    /// Dock state changed.
    fn dock_changed(&mut self, state: DockState);

    /// Raise (`true`) or release (`false`) the "all inputs unplugged"
    /// indication.
    fn unplug_indication(&mut self, unplugged: bool);
}
