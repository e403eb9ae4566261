//! The charging decision engine.
//!
//! [`ChargerEngine`] owns every collaborator port and the mutable state.
//! All entry points are synchronous and run to completion in deferred-task
//! context:
//!
//! - [`on_line`](ChargerEngine::on_line): an interrupt line fired
//! - [`run_task`](ChargerEngine::run_task): a scheduled task expired
//! - [`on_temperature_crossed`](ChargerEngine::on_temperature_crossed):
//!   the thermistor monitor tripped
//! - [`on_power_supply_changed`](ChargerEngine::on_power_supply_changed),
//!   [`on_dc_current_max`](ChargerEngine::on_dc_current_max) and the
//!   property setters: external notifications
//!
//! Register failures inside these entry points are logged and leave the
//! in-memory state as it was; the next scheduled tick retries.
//!
//! # Example
//!
//! ```
//! use charger::{ChargerConfig, ChargerEngine, LimitRegistry, TaskId};
//! use platform::mocks::{MockEvents, MockRegisters, MockSensors, RecordingSink};
//! use platform::TimerQueue;
//!
//! static LIMITS: LimitRegistry = LimitRegistry::new();
//!
//! let mut engine = ChargerEngine::new(
//!     ChargerConfig::default(),
//!     MockRegisters::new(),
//!     MockSensors::new(),
//!     MockEvents::new(),
//!     RecordingSink::new(),
//!     TimerQueue::<TaskId, { TaskId::COUNT }>::new(),
//!     &LIMITS,
//! )
//! .unwrap();
//! engine.init().unwrap();
//! assert!(!engine.usb_online());
//! ```

mod aicl;
mod eoc;
mod lines;
mod presence;
mod supply;
mod thermal;

use platform::{
    DockState, EventSource, InputPath, Line, Rail, RegisterPort, Scheduler, SensorPort, Sink,
    StateOfCharge, TemperatureWindow,
};

use crate::aicl::{DisconnectCounter, Inputs};
use crate::config::ChargerConfig;
use crate::eoc::EocCounter;
use crate::error::{ChargerError, ConfigError};
use crate::health::{
    self, BatteryHealth, BatteryStatus, ChargeType, HealthTracker, DEFAULT_CAPACITY_PERCENT,
    DEFAULT_TEMPERATURE_DECIDEG,
};
use crate::hw::ChargerHw;
use crate::limits::{LimitRegistry, LimitUpdate};
use crate::protect::Batfet;
use crate::state::ChargerState;
use crate::task::TaskId;
use crate::thermal as jeita;

/// Log a failed register or sensor operation and turn it into an `Option`.
fn logged<T, E: Into<ChargerError>>(what: &'static str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            let err: ChargerError = err.into();
            error!("{} failed: {}", what, err);
            None
        }
    }
}

/// Charger decision engine.
///
/// Generic over its ports so the same code drives real silicon and the
/// host mocks.
pub struct ChargerEngine<'a, R, S, E, K, Q> {
    config: ChargerConfig,
    hw: ChargerHw<R>,
    sensors: S,
    events: E,
    sink: K,
    scheduler: Q,
    limits: &'a LimitRegistry,
    state: ChargerState,
    eoc: EocCounter,
    aicl_disconnect: DisconnectCounter,
    health: HealthTracker,
    dock: DockState,
}

impl<'a, R, S, E, K, Q> ChargerEngine<'a, R, S, E, K, Q>
where
    R: RegisterPort,
    S: SensorPort,
    E: EventSource,
    K: Sink,
    Q: Scheduler<TaskId>,
{
    /// Validate `config` and assemble the engine. Nothing touches hardware
    /// until [`init`](Self::init).
    pub fn new(
        config: ChargerConfig,
        regs: R,
        sensors: S,
        events: E,
        sink: K,
        scheduler: Q,
        limits: &'a LimitRegistry,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = ChargerState {
            charging_disabled: config.features.charging_disabled,
            stop_at_low_battery: config.features.stop_charging_at_low_battery,
            dc_current_max_ma: config.max_input_dc_ma,
            ..ChargerState::default()
        };
        Ok(Self {
            hw: ChargerHw::new(regs, &config),
            config,
            sensors,
            events,
            sink,
            scheduler,
            limits,
            state,
            eoc: EocCounter::new(),
            aicl_disconnect: DisconnectCounter::new(),
            health: HealthTracker::new(),
            dock: DockState::Undocked,
        })
    }

    /// Program the hardware and pick up the current input state.
    pub fn init(&mut self) -> Result<(), ChargerError> {
        self.hw.init_charger(&self.config)?;
        self.hw.init_buck(self.config.features.duty_cycle_100p)?;
        self.hw.init_bat_if(self.config.bpd)?;
        self.hw.init_usb()?;

        if self.config.features.use_default_battery_values {
            self.state.charging_disabled = true;
        }
        if self.config.max_input_dc_ma != 0 && self.hw.capabilities().has_dc_path {
            self.limits
                .reset(InputPath::Dc, LimitUpdate::Set(self.config.max_input_dc_ma));
        }

        self.state.battery_present = self.hw.battery_present()?;
        if let Some(jeita) = &self.config.jeita {
            if self.state.battery_present {
                self.arm_window(jeita::normal_window(jeita));
            }
        }

        let disabled = self.state.charging_disabled;
        self.charge_en(!disabled);
        self.force_run_on_battery(disabled);
        self.apply_vddmax();

        self.on_line(Line::UsbPresent);
        self.on_line(Line::DcPresent);

        if self.config.features.fast_charge_polling {
            self.events.disable(Line::FastChargeOn);
            self.scheduler
                .schedule_after(TaskId::FastChargePoll, TaskId::FastChargePoll.period());
        }
        info!(
            "charger up: disabled={} usb={} dc={} battery={}",
            self.state.charging_disabled,
            self.state.usb_present,
            self.state.dc_present,
            self.state.battery_present
        );
        Ok(())
    }

    /// Run an expired scheduled task.
    pub fn run_task(&mut self, task: TaskId) {
        trace!("task {}", task.name());
        match task {
            TaskId::Eoc => self.eoc_tick(),
            TaskId::Aicl => self.aicl_tick(),
            TaskId::HealthCheck => self.health_tick(),
            TaskId::OvpCheck => self.ovp_check(),
            TaskId::ReverseBoostRecovery => self.reverse_boost_recovery(),
            TaskId::ClockRestore => self.clock_restore(),
            TaskId::FastChargePoll => self.fast_charge_poll(),
        }
    }

    // ── Charge gate ──────────────────────────────────────────────────────

    /// Charge-enable bit. While an over-voltage holds, an enable request
    /// writes the disable again.
    fn charge_en(&mut self, enable: bool) {
        let enable = enable && !self.state.ovp_charge_disabled;
        logged("charge enable", self.hw.set_charge_enable(enable));
    }

    /// Run the system from the battery. Skipped without a real battery.
    fn force_run_on_battery(&mut self, force: bool) {
        if self.config.features.use_default_battery_values || !self.battery_present() {
            return;
        }
        logged("force run on battery", self.hw.set_force_run_on_battery(force));
    }

    /// USB input suspend. Releasing is refused while an over-voltage holds.
    fn usb_suspend(&mut self, suspend: bool) {
        if self.state.ovp_charge_disabled && !suspend {
            return;
        }
        logged("usb suspend", self.hw.set_usb_suspend(suspend));
    }

    fn enable_charge(&mut self, enable: bool) {
        debug!("enable charge {}", enable);
        if !enable {
            self.limits.reset_all_sets();
        }
        self.charge_en(enable);
        self.force_run_on_battery(!enable);
    }

    fn disable_charge_with_batfet(&mut self, batfet: Batfet) {
        debug!("disable charge, batfet closed={}", batfet == Batfet::Close);
        self.limits.reset_all_sets();
        self.force_run_on_battery(batfet == Batfet::Close);
        self.charge_en(false);
    }

    /// Thermal-mitigation gate. Never enables while charging is disabled.
    fn buck_control(&mut self, enable: bool) {
        if self.state.charging_disabled && enable {
            return;
        }
        self.enable_charge(enable);
    }

    // ── Zone-dependent targets ───────────────────────────────────────────

    fn apply_vddmax(&mut self) {
        let target = jeita::target_voltage_mv(&self.config, self.state.zone);
        if let Some(applied) = logged("vddmax", self.hw.set_vddmax(target, self.state.vddmax_trim_mv)) {
            debug!("vddmax {} mV (trim {})", applied, self.state.vddmax_trim_mv);
        }
    }

    fn apply_vbatdet(&mut self) {
        let mv = jeita::resume_voltage_mv(&self.config, self.state.zone);
        logged("vbatdet", self.hw.set_vbatdet(mv));
    }

    fn apply_battery_current(&mut self) {
        let ma = jeita::battery_current_ma(
            &self.config,
            self.state.zone,
            usize::from(self.state.thermal_level),
        );
        debug!("battery current {} mA", ma);
        logged("ibatmax", self.hw.set_ibatmax(ma));
    }

    fn apply_input_limit(&mut self, path: InputPath, ma: u32) {
        logged("input current limit", self.hw.set_input_current_limit(path, ma));
    }

    // ── Hardware-backed reads ────────────────────────────────────────────

    /// Attached inputs as the hardware reports them, falling back to the
    /// last debounced edge when the status read fails.
    fn inputs(&mut self) -> Inputs {
        let usb = self.hw.usb_valid().unwrap_or(self.state.usb_present);
        let dc = self.hw.dc_valid().unwrap_or(self.state.dc_present);
        Inputs { usb, dc }
    }

    fn battery_present(&mut self) -> bool {
        self.hw.battery_present().unwrap_or(self.state.battery_present)
    }

    fn otg_enabled(&mut self) -> bool {
        self.hw.otg_enabled().unwrap_or(false)
    }

    fn battery_voltage_mv(&mut self) -> Result<i32, ChargerError> {
        if !self.hw.capabilities().battery_voltage_adc {
            return Ok(0);
        }
        Ok(self.sensors.battery_voltage_mv()?)
    }

    fn arm_window(&mut self, window: TemperatureWindow) {
        self.state.window = window;
        if let Err(err) = self.sensors.set_temperature_window(window) {
            error!("arming temperature window failed: {}", err);
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    /// Charge status.
    pub fn battery_status(&mut self) -> BatteryStatus {
        let inputs = self.inputs();
        let health = self.battery_health();
        let chgr = self.hw.charger_rt().unwrap_or_default();
        health::battery_status(inputs.any(), self.state.chg_done, health, chgr)
    }

    /// Temperature health; [`BatteryHealth::Unknown`] when unreadable.
    pub fn battery_health(&mut self) -> BatteryHealth {
        self.refresh_health()
    }

    /// Read the battery health and record it in the change tracker.
    fn refresh_health(&mut self) -> BatteryHealth {
        let health = match self.hw.battery_status() {
            Ok(status) => BatteryHealth::from_status(status),
            Err(err) => {
                error!("battery health read failed: {}", err);
                BatteryHealth::Unknown
            }
        };
        self.health.record(health);
        health
    }

    /// Active charge phase.
    pub fn charge_type(&mut self) -> ChargeType {
        let present = self.battery_present();
        match self.hw.charger_rt() {
            Ok(chgr) => health::charge_type(present, chgr),
            Err(err) => {
                error!("charger status read failed: {}", err);
                ChargeType::None
            }
        }
    }

    /// State of charge, percent.
    pub fn capacity(&mut self) -> u8 {
        if self.config.features.use_default_battery_values || !self.battery_present() {
            return DEFAULT_CAPACITY_PERCENT;
        }
        self.sensors
            .state_of_charge()
            .map_or(DEFAULT_CAPACITY_PERCENT, StateOfCharge::get)
    }

    /// Battery temperature, decidegrees Celsius.
    pub fn temperature(&mut self) -> i32 {
        if self.config.features.use_default_battery_values || !self.battery_present() {
            return DEFAULT_TEMPERATURE_DECIDEG;
        }
        self.sensors
            .battery_temperature_decideg()
            .unwrap_or(DEFAULT_TEMPERATURE_DECIDEG)
    }

    /// Battery current, milliamps, positive while charging.
    pub fn current_now(&mut self) -> i32 {
        self.sensors
            .battery_current_ma()
            .map_or(0, i32::saturating_neg)
    }

    /// Battery voltage, millivolts; 0 when it cannot be sampled.
    pub fn voltage_now(&mut self) -> i32 {
        self.battery_voltage_mv().unwrap_or(0)
    }

    /// Fuel-gauge cycle count; 0 when unavailable.
    pub fn cycle_count(&mut self) -> u32 {
        self.sensors.cycle_count().unwrap_or(0)
    }

    /// Nominal max battery voltage.
    pub fn voltage_max_design(&self) -> u32 {
        self.config.max_voltage_mv
    }

    /// Input voltage floor.
    pub fn voltage_min_design(&self) -> u32 {
        self.config.min_voltage_mv
    }

    /// Charging allowed by configuration and properties.
    pub fn charging_enabled(&self) -> bool {
        !self.state.charging_disabled
    }

    /// Selected thermal mitigation level.
    pub fn thermal_level(&self) -> u8 {
        self.state.thermal_level
    }

    /// Stop-charging-at-low-battery policy.
    pub fn stop_charging_at_low_battery(&self) -> bool {
        self.state.stop_at_low_battery
    }

    /// USB input attached.
    pub fn usb_online(&self) -> bool {
        self.state.usb_present
    }

    /// DC input attached.
    pub fn dc_online(&self) -> bool {
        self.state.dc_present
    }

    /// Reported DC input maximum, milliamps.
    pub fn dc_current_max(&self) -> u32 {
        self.state.dc_current_max_ma
    }

    /// Engine state snapshot.
    pub fn state(&self) -> &ChargerState {
        &self.state
    }

    /// Current EOC consecutive-sample count.
    pub fn eoc_count(&self) -> u8 {
        self.eoc.count()
    }

    /// The configuration the engine runs with.
    pub fn config(&self) -> &ChargerConfig {
        &self.config
    }

    /// Shared input current registry.
    pub fn limits(&self) -> &LimitRegistry {
        self.limits
    }

    // ── Ports ────────────────────────────────────────────────────────────

    /// Register port.
    pub fn registers(&self) -> &R {
        self.hw.registers()
    }

    /// Register port, mutably.
    pub fn registers_mut(&mut self) -> &mut R {
        self.hw.registers_mut()
    }

    /// Sensor port.
    pub fn sensors(&self) -> &S {
        &self.sensors
    }

    /// Sensor port, mutably.
    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }

    /// Line mask.
    pub fn events(&self) -> &E {
        &self.events
    }

    /// State sink.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// State sink, mutably.
    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Scheduler.
    pub fn scheduler(&self) -> &Q {
        &self.scheduler
    }

    /// Scheduler, mutably.
    pub fn scheduler_mut(&mut self) -> &mut Q {
        &mut self.scheduler
    }
}

/// Rail sampled for an input path.
const fn input_rail(path: InputPath) -> Rail {
    Rail::Input(path)
}
