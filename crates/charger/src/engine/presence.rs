//! Input presence tracking and the over-voltage check it schedules.

use platform::{
    DockState, Domain, EventSource, InputPath, RegisterPort, Scheduler, SensorPort, Sink,
};

use super::{input_rail, logged, ChargerEngine};
use crate::limits::LimitUpdate;
use crate::protect::{self, Batfet};
use crate::task::TaskId;

impl<R, S, E, K, Q> ChargerEngine<'_, R, S, E, K, Q>
where
    R: RegisterPort,
    S: SensorPort,
    E: EventSource,
    K: Sink,
    Q: Scheduler<TaskId>,
{
    /// Debounced USB presence edge.
    pub fn on_usb_edge(&mut self, present: bool) {
        if self.state.usb_present != present {
            self.state.usb_present = present;
            info!("usb present {}", present);
            self.path_changed(InputPath::Usb, present);
            self.sink.set_present(Domain::UsbMains, present);
        }
        self.after_presence_edge();
    }

    /// Debounced DC presence edge.
    pub fn on_dc_edge(&mut self, present: bool) {
        if self.state.dc_present != present {
            self.state.dc_present = present;
            info!("dc present {}", present);
            self.path_changed(InputPath::Dc, present);
            if self.otg_enabled() {
                self.force_run_on_battery(!present);
            }
            self.sink.set_present(Domain::DcMains, present);
            self.sink.notify_changed(Domain::DcMains);
            self.sink.notify_changed(Domain::Battery);
            self.publish_dock(if present { DockState::Desk } else { DockState::Undocked });
        }
        self.after_presence_edge();
    }

    fn path_changed(&mut self, path: InputPath, present: bool) {
        if present {
            self.state.chg_done = false;
            self.limits.reset(path, LimitUpdate::Keep);
            if !self.state.charging_disabled && !self.state.workaround_in_progress() {
                self.enable_charge(true);
            }
            self.scheduler.schedule_after(TaskId::Eoc, TaskId::Eoc.period());
            self.arm_input_monitors();
        } else {
            logged("clear charge failed", self.hw.clear_charge_failed());
            self.eoc.reset();
            self.apply_vbatdet();
            let set_ma = self.limits.reset(path, LimitUpdate::Keep);
            self.apply_input_limit(path, set_ma);
        }
    }

    fn after_presence_edge(&mut self) {
        if self.state.input_present() {
            self.sink.unplug_indication(false);
            self.scheduler.schedule_after(TaskId::OvpCheck, TaskId::OvpCheck.period());
            return;
        }
        self.state.chg_done = false;
        self.sink.unplug_indication(true);
        self.scheduler.cancel_and_wait(TaskId::Eoc);
        self.scheduler.cancel_and_wait(TaskId::HealthCheck);
        self.scheduler.cancel(TaskId::OvpCheck);
        if self.state.ovp_charge_disabled {
            info!("inputs gone, releasing over-voltage disable");
            self.state.ovp_charge_disabled = false;
            self.usb_suspend(false);
            self.enable_charge(!self.state.charging_disabled);
        }
    }

    fn publish_dock(&mut self, dock: DockState) {
        if self.dock != dock {
            self.dock = dock;
            self.sink.dock_changed(dock);
        }
    }

    /// Sample the rail of every present input and latch an over-voltage.
    pub(super) fn ovp_check(&mut self) {
        let mut over = false;
        for (path, present) in [
            (InputPath::Dc, self.state.dc_present),
            (InputPath::Usb, self.state.usb_present),
        ] {
            if !present || over {
                continue;
            }
            match self.sensors.rail_voltage_mv(input_rail(path)) {
                Ok(mv) if protect::is_over_voltage(mv) => {
                    warn!("input over-voltage: {} mV", mv);
                    over = true;
                }
                Ok(_) => {}
                Err(err) => error!("input rail read failed: {}", err),
            }
        }
        if over {
            self.state.ovp_charge_disabled = true;
            self.disable_charge_with_batfet(Batfet::Close);
            self.usb_suspend(true);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use platform::mocks::{MockEvents, MockRegisters, MockSensors, RecordingSink};
    use platform::{DockState, Domain, InputPath, Scheduler, TimerQueue};

    use crate::{ChargerConfig, ChargerEngine, LimitRegistry, TaskId};

    type Engine<'a> = ChargerEngine<
        'a,
        MockRegisters,
        MockSensors,
        MockEvents,
        RecordingSink,
        TimerQueue<TaskId, { TaskId::COUNT }>,
    >;

    fn engine(limits: &LimitRegistry) -> Engine<'_> {
        ChargerEngine::new(
            ChargerConfig::default(),
            MockRegisters::new(),
            MockSensors::new(),
            MockEvents::new(),
            RecordingSink::new(),
            TimerQueue::new(),
            limits,
        )
        .unwrap()
    }

    #[test]
    fn plug_arms_eoc_and_publishes() {
        let limits = LimitRegistry::new();
        let mut e = engine(&limits);
        e.on_usb_edge(true);
        assert!(e.scheduler().is_pending(TaskId::Eoc));
        assert!(e.scheduler().is_pending(TaskId::OvpCheck));
        assert!(e.scheduler().is_pending(TaskId::Aicl));
        assert!(e.scheduler().is_pending(TaskId::HealthCheck));
        assert_eq!(e.sink().presence.as_slice(), &[(Domain::UsbMains, true)]);
        assert_eq!(e.sink().unplug.last(), Some(&false));
    }

    #[test]
    fn repeated_edge_is_not_republished() {
        let limits = LimitRegistry::new();
        let mut e = engine(&limits);
        e.on_usb_edge(true);
        e.on_usb_edge(true);
        assert_eq!(e.sink().presence.len(), 1);
    }

    #[test]
    fn unplug_resets_set_and_raises_indication() {
        let limits = LimitRegistry::new();
        let mut e = engine(&limits);
        e.on_usb_edge(true);
        limits.reset(InputPath::Usb, crate::limits::LimitUpdate::Set(1500));
        limits.try_step(InputPath::Usb);
        e.on_usb_edge(false);
        assert_eq!(limits.snapshot(InputPath::Usb).set_ma, 100);
        assert_eq!(limits.snapshot(InputPath::Usb).limit_ma, 1500);
        assert_eq!(e.sink().unplug.last(), Some(&true));
        assert!(!e.scheduler().is_pending(TaskId::Eoc));
        assert_eq!(e.registers().last_write(0x1000 + 0x4A), Some(0x80));
    }

    #[test]
    fn dc_plug_starts_input_current_ramp() {
        let limits = LimitRegistry::new();
        let mut e = engine(&limits);
        e.on_dc_edge(true);
        assert!(e.scheduler().is_pending(TaskId::Aicl));
        assert!(e.scheduler().is_pending(TaskId::HealthCheck));
    }

    #[test]
    fn dock_event_follows_dc_presence() {
        let limits = LimitRegistry::new();
        let mut e = engine(&limits);
        e.on_dc_edge(true);
        e.on_dc_edge(false);
        assert_eq!(e.sink().dock.as_slice(), &[DockState::Desk, DockState::Undocked]);
    }

    #[test]
    fn over_voltage_latches_until_full_unplug() {
        let limits = LimitRegistry::new();
        let mut e = engine(&limits);
        e.sensors_mut().usb_in_mv = Ok(6800);
        e.on_usb_edge(true);
        e.run_task(TaskId::OvpCheck);
        assert!(e.state().ovp_charge_disabled);
        assert_eq!(e.registers().peek(0x1300 + 0x47) & 0x01, 0x01, "usb suspended");
        assert_eq!(e.registers().peek(0x1000 + 0x49) & 0x80, 0x00, "charging off");

        e.on_usb_edge(false);
        assert!(!e.state().ovp_charge_disabled);
        assert_eq!(e.registers().peek(0x1300 + 0x47) & 0x01, 0x00, "suspend released");
        assert_eq!(e.registers().peek(0x1000 + 0x49) & 0x80, 0x80, "charging back on");
    }
}
