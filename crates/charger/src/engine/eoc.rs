//! End-of-charge poll.

use platform::{Domain, EventSource, Line, RegisterPort, Scheduler, SensorPort, Sink};

use super::{logged, ChargerEngine};
use crate::eoc::{self, Sample, Verdict};
use crate::protect::Batfet;
use crate::task::TaskId;

/// USB ceiling at or below which the source is treated as not having
/// reported one.
pub(crate) const USB_CURRENT_MAX_MIN_MA: u32 = 2;

impl<R, S, E, K, Q> ChargerEngine<'_, R, S, E, K, Q>
where
    R: RegisterPort,
    S: SensorPort,
    E: EventSource,
    K: Sink,
    Q: Scheduler<TaskId>,
{
    pub(super) fn eoc_tick(&mut self) {
        if self.state.clock_workaround {
            debug!("eoc: clock workaround running, skipping tick");
            self.reschedule_eoc();
            return;
        }
        if !self.state.reverse_boost_pending && !self.state.disabled_for_shutdown {
            self.enable_charge(!self.state.charging_disabled);
        }

        let Some(bat_if) = logged("battery interface status", self.hw.bat_if_rt()) else {
            self.reschedule_eoc();
            return;
        };
        let Some(buck) = logged("buck status", self.hw.buck_rt()) else {
            self.reschedule_eoc();
            return;
        };
        let Some(chgr) = logged("charger status", self.hw.charger_rt()) else {
            self.reschedule_eoc();
            return;
        };
        trace!("eoc: chgr={} bat_if={} buck={}", chgr.0, bat_if.0, buck.0);

        let inputs = self.inputs();
        if !inputs.any() {
            debug!("eoc: no input, stopping");
            self.stop_eoc();
            return;
        }

        if bat_if.fet_on() && chgr.charging() {
            let ibat = self.sensors.battery_current_ma();
            let vbat = self.battery_voltage_mv();
            let (Some(ibat_ma), Some(vbat_mv)) = (
                logged("battery current", ibat),
                logged("battery voltage", vbat),
            ) else {
                self.reschedule_eoc();
                return;
            };
            let resume_mv = self.config.resume_voltage_mv();
            let resume = i32::try_from(resume_mv).unwrap_or(i32::MAX);

            if self.config.resume_delta_soc == 0 && !chgr.vbat_det_low() && vbat_mv < resume {
                debug!("eoc: woke too early ({} mV)", vbat_mv);
                self.events.enable(Line::LowVoltageDetect);
                self.stop_eoc();
                return;
            }

            let in_cv = buck.in_cv_loop();
            if in_cv {
                self.adjust_vddmax(vbat_mv);
            }
            let sample = Sample { in_cv, ibat_ma, vbat_mv };
            match self.eoc.observe(sample, self.config.term_current_ma, resume_mv) {
                Verdict::Terminate => {
                    info!("end of charge: {} mV {} mA", vbat_mv, ibat_ma);
                    self.terminate_charge();
                    return;
                }
                Verdict::Counting(count) => debug!("eoc count {}", count),
                Verdict::Reset => debug!("eoc: sample disqualified ({} mA)", ibat_ma),
                Verdict::Waiting => {}
            }
        } else {
            debug!("eoc: not charging");
            if self.capacity() >= 100 {
                let usb_only = inputs.usb && !inputs.dc;
                if usb_only && self.state.usb_current_max_ma <= USB_CURRENT_MAX_MIN_MA {
                    info!("eoc: usb ceiling not reported yet");
                } else {
                    info!("assumed end of charge");
                    self.terminate_charge();
                    return;
                }
            }
        }
        self.reschedule_eoc();
    }

    fn reschedule_eoc(&mut self) {
        self.scheduler.schedule_after(TaskId::Eoc, TaskId::Eoc.period());
    }

    fn terminate_charge(&mut self) {
        self.disable_charge_with_batfet(Batfet::Open);
        self.state.chg_done = true;
        self.sink.notify_changed(Domain::Battery);
        if self.config.resume_delta_soc == 0 {
            self.events.enable(Line::LowVoltageDetect);
        }
        self.stop_eoc();
    }

    fn stop_eoc(&mut self) {
        self.eoc.reset();
        self.apply_vbatdet();
    }

    fn adjust_vddmax(&mut self, vbat_mv: i32) {
        let trim = eoc::vddmax_trim(
            self.config.max_voltage_mv,
            vbat_mv,
            self.state.vddmax_trim_mv,
        );
        let Some(trim) = trim else {
            trace!("vbat {} mV not low enough to raise vddmax", vbat_mv);
            return;
        };
        self.state.vddmax_trim_mv = trim;
        self.apply_vddmax();
    }
}
