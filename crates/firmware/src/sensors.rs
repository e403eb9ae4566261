//! Measurement snapshot shared between the fuel-gauge client and the engine.
//!
//! The engine samples synchronously, so it cannot wait on an ADC conversion.
//! Whoever owns the fuel gauge and the rail ADC publishes the latest values
//! into a [`SharedSnapshot`]; [`SnapshotSensors`] serves them to the engine
//! and remembers the temperature window it arms. [`check_temperature`] turns
//! a sample outside that window into a one-shot [`Boundary`] report.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use platform::{
    Boundary, InputPath, Rail, SensorError, SensorPort, StateOfCharge, TemperatureWindow,
};

/// Latest measurements. `None` reads as [`SensorError::Unavailable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSnapshot {
    /// Battery voltage, mV.
    pub battery_mv: Option<i32>,
    /// Battery current, mA, positive while discharging.
    pub battery_ma: Option<i32>,
    /// Battery temperature, decidegrees Celsius.
    pub temperature_decideg: Option<i32>,
    /// USBIN rail, mV.
    pub usb_in_mv: Option<i32>,
    /// DCIN rail, mV.
    pub dc_in_mv: Option<i32>,
    /// VCHG rail, mV.
    pub charger_mv: Option<i32>,
    /// Fuel-gauge state of charge, percent.
    pub soc_percent: Option<u8>,
    /// Fuel-gauge cycle count.
    pub cycles: Option<u32>,
}

#[derive(Clone, Copy, Default)]
struct Shared {
    snapshot: SensorSnapshot,
    window: TemperatureWindow,
}

/// Snapshot plus armed window behind a critical-section mutex.
pub struct SharedSnapshot {
    inner: Mutex<CriticalSectionRawMutex, Cell<Shared>>,
}

impl SharedSnapshot {
    /// Nothing measured, no window armed.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(Shared {
                snapshot: SensorSnapshot {
                    battery_mv: None,
                    battery_ma: None,
                    temperature_decideg: None,
                    usb_in_mv: None,
                    dc_in_mv: None,
                    charger_mv: None,
                    soc_percent: None,
                    cycles: None,
                },
                window: TemperatureWindow {
                    low: None,
                    high: None,
                },
            })),
        }
    }

    /// Modify the measurements in place.
    pub fn update(&self, f: impl FnOnce(&mut SensorSnapshot)) {
        self.inner.lock(|cell| {
            let mut shared = cell.get();
            f(&mut shared.snapshot);
            cell.set(shared);
        });
    }

    /// Copy of the latest measurements.
    pub fn snapshot(&self) -> SensorSnapshot {
        self.inner.lock(|cell| cell.get().snapshot)
    }

    /// Currently armed temperature window.
    pub fn window(&self) -> TemperatureWindow {
        self.inner.lock(|cell| cell.get().window)
    }

    fn set_window(&self, window: TemperatureWindow) {
        self.inner.lock(|cell| {
            let mut shared = cell.get();
            shared.window = window;
            cell.set(shared);
        });
    }
}

impl Default for SharedSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// [`SensorPort`] served from a [`SharedSnapshot`].
pub struct SnapshotSensors<'a> {
    shared: &'a SharedSnapshot,
}

impl<'a> SnapshotSensors<'a> {
    /// Serve measurements from `shared`.
    pub fn new(shared: &'a SharedSnapshot) -> Self {
        Self { shared }
    }
}

fn sample<T>(value: Option<T>) -> Result<T, SensorError> {
    value.ok_or(SensorError::Unavailable)
}

impl SensorPort for SnapshotSensors<'_> {
    fn battery_voltage_mv(&mut self) -> Result<i32, SensorError> {
        sample(self.shared.snapshot().battery_mv)
    }

    fn battery_current_ma(&mut self) -> Result<i32, SensorError> {
        sample(self.shared.snapshot().battery_ma)
    }

    fn battery_temperature_decideg(&mut self) -> Result<i32, SensorError> {
        sample(self.shared.snapshot().temperature_decideg)
    }

    fn rail_voltage_mv(&mut self, rail: Rail) -> Result<i32, SensorError> {
        let snapshot = self.shared.snapshot();
        sample(match rail {
            Rail::Input(InputPath::Usb) => snapshot.usb_in_mv,
            Rail::Input(InputPath::Dc) => snapshot.dc_in_mv,
            Rail::Charger => snapshot.charger_mv,
        })
    }

    fn state_of_charge(&mut self) -> Result<StateOfCharge, SensorError> {
        sample(self.shared.snapshot().soc_percent).map(StateOfCharge::new)
    }

    fn cycle_count(&mut self) -> Result<u32, SensorError> {
        sample(self.shared.snapshot().cycles)
    }

    fn set_temperature_window(&mut self, window: TemperatureWindow) -> Result<(), SensorError> {
        self.shared.set_window(window);
        Ok(())
    }
}

/// Compare the latest temperature against the armed window.
///
/// A crossing disarms the window, so it is reported once; the engine arms
/// the next window when it handles the report.
pub fn check_temperature(shared: &SharedSnapshot) -> Option<Boundary> {
    let temp = shared.snapshot().temperature_decideg?;
    let boundary = shared.window().crossing(temp)?;
    shared.set_window(TemperatureWindow::default());
    Some(boundary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_sample_reads_unavailable() {
        let shared = SharedSnapshot::new();
        let mut sensors = SnapshotSensors::new(&shared);
        assert_eq!(sensors.battery_voltage_mv(), Err(SensorError::Unavailable));
        shared.update(|s| s.battery_mv = Some(3900));
        assert_eq!(sensors.battery_voltage_mv(), Ok(3900));
    }

    #[test]
    fn rails_map_to_their_fields() {
        let shared = SharedSnapshot::new();
        shared.update(|s| {
            s.usb_in_mv = Some(5000);
            s.dc_in_mv = Some(12_000);
            s.charger_mv = Some(4700);
        });
        let mut sensors = SnapshotSensors::new(&shared);
        assert_eq!(sensors.rail_voltage_mv(Rail::Input(InputPath::Usb)), Ok(5000));
        assert_eq!(sensors.rail_voltage_mv(Rail::Input(InputPath::Dc)), Ok(12_000));
        assert_eq!(sensors.rail_voltage_mv(Rail::Charger), Ok(4700));
    }

    #[test]
    fn crossing_is_reported_once() {
        let shared = SharedSnapshot::new();
        let mut sensors = SnapshotSensors::new(&shared);
        sensors
            .set_temperature_window(TemperatureWindow::both(100, 450))
            .unwrap();
        shared.update(|s| s.temperature_decideg = Some(300));
        assert_eq!(check_temperature(&shared), None);

        shared.update(|s| s.temperature_decideg = Some(460));
        assert_eq!(check_temperature(&shared), Some(Boundary::Warm));
        assert_eq!(check_temperature(&shared), None);

        sensors
            .set_temperature_window(TemperatureWindow::low_only(430))
            .unwrap();
        shared.update(|s| s.temperature_decideg = Some(420));
        assert_eq!(check_temperature(&shared), Some(Boundary::Cool));
    }
}
