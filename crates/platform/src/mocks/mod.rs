//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform seams
//! for use in unit and integration tests.

#![cfg(any(test, feature = "std"))]

use crate::event::LineSet;
use crate::*;

/// Register-file capacity of [`MockRegisters`].
pub const MOCK_REGISTERS: usize = 256;
/// Write-log capacity of [`MockRegisters`].
pub const MOCK_WRITE_LOG: usize = 1024;

/// Sparse register file with a write log and failure injection.
///
/// Unwritten registers read as `0x00`.
pub struct MockRegisters {
    regs: heapless::Vec<(u16, u8), MOCK_REGISTERS>,
    writes: heapless::Vec<(u16, u8), MOCK_WRITE_LOG>,
    failing: heapless::Vec<u16, 16>,
    fail_all: bool,
}

impl MockRegisters {
    /// Empty register file.
    pub fn new() -> Self {
        Self {
            regs: heapless::Vec::new(),
            writes: heapless::Vec::new(),
            failing: heapless::Vec::new(),
            fail_all: false,
        }
    }

    /// Current value of `addr` without logging.
    pub fn peek(&self, addr: u16) -> u8 {
        self.regs
            .iter()
            .find(|(a, _)| *a == addr)
            .map_or(0, |(_, v)| *v)
    }

    /// Set `addr` without logging (hardware-side change).
    pub fn poke(&mut self, addr: u16, value: u8) {
        if let Some(slot) = self.regs.iter_mut().find(|(a, _)| *a == addr) {
            slot.1 = value;
        } else {
            let _ = self.regs.push((addr, value));
        }
    }

    /// Set or clear the bits of `mask` at `addr` without logging.
    pub fn set_bits(&mut self, addr: u16, mask: u8, on: bool) {
        let current = self.peek(addr);
        self.poke(addr, if on { current | mask } else { current & !mask });
    }

    /// Every write since creation or the last [`clear_log`](Self::clear_log),
    /// oldest first.
    pub fn writes(&self) -> &[(u16, u8)] {
        &self.writes
    }

    /// Writes to `addr`, oldest first.
    pub fn writes_to(&self, addr: u16) -> impl Iterator<Item = u8> + '_ {
        self.writes
            .iter()
            .filter(move |(a, _)| *a == addr)
            .map(|(_, v)| *v)
    }

    /// Last value written to `addr`.
    pub fn last_write(&self, addr: u16) -> Option<u8> {
        self.writes_to(addr).last()
    }

    /// Forget the write log.
    pub fn clear_log(&mut self) {
        self.writes.clear();
    }

    /// Make every access to `addr` fail with [`BusError::Nack`].
    pub fn fail_at(&mut self, addr: u16) {
        let _ = self.failing.push(addr);
    }

    /// Make every access fail (`true`) or restore normal operation.
    pub fn fail_all(&mut self, fail: bool) {
        self.fail_all = fail;
        if !fail {
            self.failing.clear();
        }
    }

    fn check(&self, addr: u16) -> Result<(), BusError> {
        if self.fail_all || self.failing.contains(&addr) {
            Err(BusError::Nack)
        } else {
            Ok(())
        }
    }
}

impl Default for MockRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterPort for MockRegisters {
    fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), BusError> {
        let mut a = addr;
        for byte in buf.iter_mut() {
            self.check(a)?;
            *byte = self.peek(a);
            a = a.wrapping_add(1);
        }
        Ok(())
    }

    fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), BusError> {
        let mut a = addr;
        for &value in data {
            self.check(a)?;
            self.poke(a, value);
            let _ = self.writes.push((a, value));
            a = a.wrapping_add(1);
        }
        Ok(())
    }
}

/// Scripted sensor readings. Every field is public; set the ones a test
/// cares about.
#[derive(Debug, Clone)]
pub struct MockSensors {
    /// Battery voltage.
    pub battery_mv: Result<i32, SensorError>,
    /// Battery current, positive while discharging.
    pub battery_ma: Result<i32, SensorError>,
    /// Battery temperature.
    pub temperature_decideg: Result<i32, SensorError>,
    /// USBIN rail.
    pub usb_in_mv: Result<i32, SensorError>,
    /// DCIN rail.
    pub dc_in_mv: Result<i32, SensorError>,
    /// VCHG rail.
    pub charger_mv: Result<i32, SensorError>,
    /// Fuel-gauge state of charge.
    pub soc: Result<StateOfCharge, SensorError>,
    /// Fuel-gauge cycle count.
    pub cycles: Result<u32, SensorError>,
    /// Last window armed through [`SensorPort::set_temperature_window`].
    pub window: Option<TemperatureWindow>,
    /// Number of times a window was armed.
    pub window_arms: usize,
}

impl MockSensors {
    /// A healthy, half-charged battery at 25 °C on a 5 V source.
    pub fn new() -> Self {
        Self {
            battery_mv: Ok(3800),
            battery_ma: Ok(-500),
            temperature_decideg: Ok(250),
            usb_in_mv: Ok(5000),
            dc_in_mv: Ok(0),
            charger_mv: Ok(4800),
            soc: Ok(StateOfCharge::new(50)),
            cycles: Ok(0),
            window: None,
            window_arms: 0,
        }
    }
}

impl Default for MockSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockSensors {
    fn battery_voltage_mv(&mut self) -> Result<i32, SensorError> {
        self.battery_mv
    }

    fn battery_current_ma(&mut self) -> Result<i32, SensorError> {
        self.battery_ma
    }

    fn battery_temperature_decideg(&mut self) -> Result<i32, SensorError> {
        self.temperature_decideg
    }

    fn rail_voltage_mv(&mut self, rail: Rail) -> Result<i32, SensorError> {
        match rail {
            Rail::Input(InputPath::Usb) => self.usb_in_mv,
            Rail::Input(InputPath::Dc) => self.dc_in_mv,
            Rail::Charger => self.charger_mv,
        }
    }

    fn state_of_charge(&mut self) -> Result<StateOfCharge, SensorError> {
        self.soc
    }

    fn cycle_count(&mut self) -> Result<u32, SensorError> {
        self.cycles
    }

    fn set_temperature_window(&mut self, window: TemperatureWindow) -> Result<(), SensorError> {
        self.window = Some(window);
        self.window_arms = self.window_arms.saturating_add(1);
        Ok(())
    }
}

/// Line mask that records every enable / disable call.
#[derive(Debug)]
pub struct MockEvents {
    enabled: LineSet,
    calls: heapless::Vec<(Line, bool), 128>,
}

impl MockEvents {
    /// All lines enabled, empty call log.
    pub fn new() -> Self {
        Self {
            enabled: LineSet::all(),
            calls: heapless::Vec::new(),
        }
    }

    /// Every `(line, enabled)` call, oldest first.
    pub fn calls(&self) -> &[(Line, bool)] {
        &self.calls
    }

    /// Number of `enable(line)` calls.
    pub fn enable_count(&self, line: Line) -> usize {
        self.calls.iter().filter(|c| **c == (line, true)).count()
    }
}

impl Default for MockEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for MockEvents {
    fn enable(&mut self, line: Line) {
        self.enabled.insert(line);
        let _ = self.calls.push((line, true));
    }

    fn disable(&mut self, line: Line) {
        self.enabled.remove(line);
        let _ = self.calls.push((line, false));
    }

    fn is_enabled(&self, line: Line) -> bool {
        self.enabled.contains(line)
    }
}

/// Sink that records everything it is told.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// `notify_changed` calls, oldest first.
    pub changed: heapless::Vec<Domain, 256>,
    /// `set_present` calls, oldest first.
    pub presence: heapless::Vec<(Domain, bool), 64>,
    /// `dock_changed` calls, oldest first.
    pub dock: heapless::Vec<DockState, 16>,
    /// `unplug_indication` calls, oldest first.
    pub unplug: heapless::Vec<bool, 64>,
}

impl RecordingSink {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `notify_changed(domain)` calls.
    pub fn changed_count(&self, domain: Domain) -> usize {
        self.changed.iter().filter(|d| **d == domain).count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.changed.clear();
        self.presence.clear();
        self.dock.clear();
        self.unplug.clear();
    }
}

impl Sink for RecordingSink {
    fn notify_changed(&mut self, domain: Domain) {
        let _ = self.changed.push(domain);
    }

    fn set_present(&mut self, domain: Domain, present: bool) {
        let _ = self.presence.push((domain, present));
    }

    fn dock_changed(&mut self, state: DockState) {
        let _ = self.dock.push(state);
    }

    fn unplug_indication(&mut self, unplugged: bool) {
        let _ = self.unplug.push(unplugged);
    }
}
