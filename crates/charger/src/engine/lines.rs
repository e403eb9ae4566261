//! Interrupt line dispatch, the coarse-detect clock workaround and the
//! fast-charge poll.

use platform::{Domain, EventSource, Line, RegisterPort, Scheduler, SensorPort, Sink};

use super::{logged, ChargerEngine};
use crate::protect::Batfet;
use crate::task::TaskId;
use crate::thermal;

impl<R, S, E, K, Q> ChargerEngine<'_, R, S, E, K, Q>
where
    R: RegisterPort,
    S: SensorPort,
    E: EventSource,
    K: Sink,
    Q: Scheduler<TaskId>,
{
    /// An interrupt line fired.
    pub fn on_line(&mut self, line: Line) {
        trace!("line {}", line.name());
        match line {
            Line::UsbPresent => {
                if self.otg_enabled() {
                    debug!("usb edge ignored in host mode");
                    return;
                }
                let present = self.hw.usb_valid().unwrap_or(self.state.usb_present);
                self.on_usb_edge(present);
            }
            Line::DcPresent => {
                let present = self.hw.dc_valid().unwrap_or(self.state.dc_present);
                self.on_dc_edge(present);
            }
            Line::FastChargeOn => self.fast_charge_on(),
            Line::TrickleChargeOn => {
                self.state.chg_done = false;
                self.sink.notify_changed(Domain::Battery);
            }
            Line::ChargeFailed => self.notify_all(),
            Line::LowVoltageDetect => self.low_voltage_detect(),
            Line::BatteryPresent => self.battery_present_edge(),
            Line::InputCoarseDetect => {
                if !self.otg_enabled() && self.hw.capabilities().coarse_detect_clock_workaround {
                    self.start_clock_workaround();
                }
            }
            Line::InputGone => {
                self.scheduler.cancel(TaskId::Aicl);
                self.aicl_tick();
            }
        }
    }

    fn notify_all(&mut self) {
        self.sink.notify_changed(Domain::Battery);
        self.sink.notify_changed(Domain::UsbMains);
        self.sink.notify_changed(Domain::DcMains);
    }

    fn fast_charge_on(&mut self) {
        debug!("fast charge on");
        self.state.chg_done = false;
        self.notify_all();
        if self.config.resume_delta_soc == 0 {
            self.events.enable(Line::LowVoltageDetect);
        }
        self.scheduler.schedule_after(TaskId::Eoc, TaskId::Eoc.period());
    }

    fn low_voltage_detect(&mut self) {
        let chgr = logged("charger status", self.hw.charger_rt()).unwrap_or_default();
        if !self.state.charging_disabled && chgr.fast_charge_on() {
            debug!("battery below resume threshold, polling eoc");
            self.scheduler.schedule_after(TaskId::Eoc, TaskId::Eoc.period());
            self.events.disable(Line::LowVoltageDetect);
        } else {
            self.charge_en(!self.state.charging_disabled);
        }
        self.notify_all();
    }

    fn battery_present_edge(&mut self) {
        let present = self.battery_present();
        if present == self.state.battery_present {
            return;
        }
        info!("battery present {}", present);
        self.state.battery_present = present;
        self.sink.notify_changed(Domain::Battery);
        self.sink.notify_changed(Domain::UsbMains);
        if present {
            if let Some(jeita) = self.config.jeita {
                self.arm_window(thermal::normal_window(&jeita));
            }
        }
    }

    fn start_clock_workaround(&mut self) {
        if self.state.clock_workaround {
            return;
        }
        debug!("coarse detect: buck clock to software");
        self.state.clock_workaround = true;
        self.disable_charge_with_batfet(Batfet::Close);
        logged("buck clock override", self.hw.set_buck_clock_software(true));
        self.scheduler
            .schedule_after(TaskId::ClockRestore, TaskId::ClockRestore.period());
    }

    pub(super) fn clock_restore(&mut self) {
        debug!("coarse detect: buck clock back to hardware");
        logged("buck clock restore", self.hw.set_buck_clock_software(false));
        self.state.clock_workaround = false;
        self.enable_charge(!self.state.charging_disabled);
    }

    pub(super) fn fast_charge_poll(&mut self) {
        if let Some(chgr) = logged("charger status", self.hw.charger_rt()) {
            if chgr.fast_charge_on() {
                self.fast_charge_on();
            }
        }
        self.scheduler
            .schedule_after(TaskId::FastChargePoll, TaskId::FastChargePoll.period());
    }
}
