//! External supply notifications, property setters and the health poll.

use platform::{Domain, EventSource, InputPath, RegisterPort, Scheduler, SensorPort, Sink};

use super::eoc::USB_CURRENT_MAX_MIN_MA;
use super::{logged, ChargerEngine};
use crate::limits::LimitUpdate;
use crate::protect::Batfet;
use crate::task::TaskId;

impl<R, S, E, K, Q> ChargerEngine<'_, R, S, E, K, Q>
where
    R: RegisterPort,
    S: SensorPort,
    E: EventSource,
    K: Sink,
    Q: Scheduler<TaskId>,
{
    /// Another power supply changed. `usb_current_max_ma` is the ceiling
    /// the USB source currently reports, if known.
    pub fn on_power_supply_changed(&mut self, usb_current_max_ma: Option<u32>) {
        let soc = self.sensors.state_of_charge().ok().map(|soc| soc.get());
        self.stop_at_low_battery(soc);

        let inputs = self.inputs();
        if let Some(ma) = usb_current_max_ma {
            if inputs.usb && ma != self.state.usb_current_max_ma {
                self.apply_usb_ceiling(ma);
            }
        }

        if inputs.any() {
            self.arm_input_monitors();
        }

        if let Some(soc) = soc {
            self.soc_recharge(soc);
        }
        self.sink.notify_changed(Domain::Battery);
    }

    fn stop_at_low_battery(&mut self, soc: Option<u8>) {
        if !self.state.stop_at_low_battery || self.state.disabled_for_shutdown || soc != Some(0) {
            return;
        }
        let discharging = self.sensors.battery_current_ma().is_ok_and(|ma| ma > 0);
        if discharging {
            warn!("battery empty, charging off until shutdown");
            self.state.charging_disabled = true;
            self.state.disabled_for_shutdown = true;
            self.disable_charge_with_batfet(Batfet::Close);
        }
    }

    fn apply_usb_ceiling(&mut self, ma: u32) {
        info!("usb ceiling {} mA", ma);
        let present = self.battery_present();
        if ma <= USB_CURRENT_MAX_MIN_MA
            && !self.config.features.use_default_battery_values
            && present
        {
            self.usb_suspend(true);
            self.limits.reset(InputPath::Usb, LimitUpdate::Set(0));
        } else {
            self.usb_suspend(false);
            self.limits.reset(InputPath::Usb, LimitUpdate::Set(ma));
        }
        self.state.usb_current_max_ma = ma;
    }

    fn soc_recharge(&mut self, soc: u8) {
        let delta = self.config.resume_delta_soc;
        if delta == 0 || !self.state.chg_done || self.scheduler.is_pending(TaskId::Eoc) {
            return;
        }
        if soc <= 100_u8.saturating_sub(delta) {
            info!("soc {} below resume threshold, recharging", soc);
            self.state.chg_done = false;
            logged("vbatdet", self.hw.set_vbatdet(self.config.max_voltage_mv));
            self.enable_charge(!self.state.charging_disabled);
            self.scheduler.schedule_after(TaskId::Eoc, TaskId::Eoc.period());
        }
    }

    /// The DC source reported a new maximum input current.
    pub fn on_dc_current_max(&mut self, ma: u32) {
        debug!("dc current max {} mA", ma);
        self.limits.reset(InputPath::Dc, LimitUpdate::Set(ma));
        self.state.dc_current_max_ma = ma;
        if self.inputs().any() {
            self.arm_input_monitors();
        }
        self.sink.notify_changed(Domain::DcMains);
    }

    /// Start the AICL ramp and the health poll unless already pending.
    pub(super) fn arm_input_monitors(&mut self) {
        if !self.scheduler.is_pending(TaskId::Aicl) {
            self.scheduler.schedule_after(TaskId::Aicl, TaskId::Aicl.period());
        }
        if !self.scheduler.is_pending(TaskId::HealthCheck) {
            self.scheduler
                .schedule_after(TaskId::HealthCheck, TaskId::HealthCheck.period());
        }
    }

    /// Allow or forbid charging.
    pub fn set_charging_enabled(&mut self, enabled: bool) {
        info!("charging enabled {}", enabled);
        self.state.charging_disabled = !enabled;
        self.enable_charge(enabled);
        self.sink.notify_changed(Domain::Battery);
    }

    /// Select thermal mitigation `level`; the last level stops charging.
    pub fn set_thermal_level(&mut self, level: u8) {
        self.select_thermal_level(level);
        self.sink.notify_changed(Domain::Battery);
    }

    /// Stop charging once the battery reaches 0 % while discharging.
    pub fn set_stop_charging_at_low_battery(&mut self, stop: bool) {
        self.state.stop_at_low_battery = stop;
        if stop
            && self.config.features.warm_disables_charging
            && !self.config.thermal_mitigation.is_empty()
        {
            self.select_thermal_level(0);
        }
        self.sink.notify_changed(Domain::Battery);
    }

    pub(super) fn health_tick(&mut self) {
        if !self.inputs().any() {
            debug!("health: no input, stopping");
            return;
        }
        self.refresh_health();
        if self.health.take_changed() {
            info!("battery health changed");
            self.sink.notify_changed(Domain::Battery);
        }
        self.scheduler
            .schedule_after(TaskId::HealthCheck, TaskId::HealthCheck.period());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use platform::mocks::{MockEvents, MockRegisters, MockSensors, RecordingSink};
    use platform::{Domain, InputPath, Scheduler, StateOfCharge, TimerQueue};

    use crate::hw::at;
    use crate::hw::registers::{
        BATT_PRES_RT, BATT_TEMP_HOT, BATT_TEMP_OK, INT_RT_STS, STATUS, USB_SUSP, USB_SUSPEND,
        USB_VALID,
    };
    use crate::{BatteryHealth, ChargerConfig, ChargerEngine, Features, LimitRegistry, TaskId};

    type Engine<'a> = ChargerEngine<
        'a,
        MockRegisters,
        MockSensors,
        MockEvents,
        RecordingSink,
        TimerQueue<TaskId, { TaskId::COUNT }>,
    >;

    fn engine(limits: &LimitRegistry, config: ChargerConfig) -> Engine<'_> {
        ChargerEngine::new(
            config,
            MockRegisters::new(),
            MockSensors::new(),
            MockEvents::new(),
            RecordingSink::new(),
            TimerQueue::new(),
            limits,
        )
        .unwrap()
    }

    fn plug_usb(e: &mut Engine<'_>) {
        e.registers_mut().poke(at(0x1300, STATUS), USB_VALID);
        e.registers_mut().poke(at(0x1200, INT_RT_STS), BATT_PRES_RT);
    }

    #[test]
    fn usb_ceiling_becomes_limit() {
        let limits = LimitRegistry::new();
        let mut e = engine(&limits, ChargerConfig::default());
        plug_usb(&mut e);
        e.on_power_supply_changed(Some(1500));
        assert_eq!(limits.snapshot(InputPath::Usb).limit_ma, 1500);
        assert_eq!(e.state().usb_current_max_ma, 1500);
        assert!(e.scheduler().is_pending(TaskId::Aicl));
        assert!(e.scheduler().is_pending(TaskId::HealthCheck));
    }

    #[test]
    fn tiny_usb_ceiling_suspends_input() {
        let limits = LimitRegistry::new();
        let mut e = engine(&limits, ChargerConfig::default());
        plug_usb(&mut e);
        e.on_power_supply_changed(Some(2));
        assert_eq!(limits.snapshot(InputPath::Usb).limit_ma, 0);
        assert_eq!(e.registers().peek(at(0x1300, USB_SUSP)) & USB_SUSPEND, USB_SUSPEND);
    }

    #[test]
    fn empty_battery_stops_charging_when_policy_set() {
        let limits = LimitRegistry::new();
        let config = ChargerConfig::builder()
            .features(Features {
                stop_charging_at_low_battery: true,
                ..Features::default()
            })
            .build()
            .unwrap();
        let mut e = engine(&limits, config);
        e.sensors_mut().soc = Ok(StateOfCharge::EMPTY);
        e.sensors_mut().battery_ma = Ok(300);
        e.on_power_supply_changed(None);
        assert!(e.state().disabled_for_shutdown);
        assert!(!e.charging_enabled());
    }

    #[test]
    fn soc_drop_after_done_restarts_charging() {
        let limits = LimitRegistry::new();
        let config = ChargerConfig::builder().resume_delta_soc(5).build().unwrap();
        let mut e = engine(&limits, config);
        plug_usb(&mut e);
        e.on_line(platform::Line::UsbPresent);
        e.scheduler_mut().cancel(TaskId::Eoc);
        e.run_task(TaskId::OvpCheck);

        // chg_done is only set by termination; drive one through the
        // assumed-EOC path.
        e.sensors_mut().soc = Ok(StateOfCharge::FULL);
        e.on_power_supply_changed(Some(1500));
        e.run_task(TaskId::Eoc);
        assert!(e.state().chg_done);

        e.sensors_mut().soc = Ok(StateOfCharge::new(94));
        e.on_power_supply_changed(None);
        assert!(!e.state().chg_done);
        assert!(e.scheduler().is_pending(TaskId::Eoc));
    }

    #[test]
    fn dc_current_max_publishes() {
        let limits = LimitRegistry::new();
        let mut e = engine(&limits, ChargerConfig::default());
        e.on_dc_current_max(1200);
        assert_eq!(limits.snapshot(InputPath::Dc).limit_ma, 1200);
        assert_eq!(e.dc_current_max(), 1200);
        assert_eq!(e.sink().changed_count(Domain::DcMains), 1);
    }

    #[test]
    fn health_tick_publishes_only_changes() {
        let limits = LimitRegistry::new();
        let mut e = engine(&limits, ChargerConfig::default());
        plug_usb(&mut e);
        e.registers_mut().poke(at(0x1200, STATUS), BATT_TEMP_OK);

        e.run_task(TaskId::HealthCheck);
        assert_eq!(e.sink().changed_count(Domain::Battery), 1);
        assert!(e.scheduler().is_pending(TaskId::HealthCheck));

        e.scheduler_mut().cancel(TaskId::HealthCheck);
        e.run_task(TaskId::HealthCheck);
        assert_eq!(e.sink().changed_count(Domain::Battery), 1);

        e.registers_mut().poke(at(0x1200, STATUS), BATT_TEMP_HOT);
        e.scheduler_mut().cancel(TaskId::HealthCheck);
        e.run_task(TaskId::HealthCheck);
        assert_eq!(e.sink().changed_count(Domain::Battery), 2);
        assert_eq!(e.battery_health(), BatteryHealth::Overheat);
    }
}
