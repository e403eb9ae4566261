//! AICL tick and the reverse-boost guard it gates.

use platform::{Domain, EventSource, Rail, RegisterPort, Scheduler, SensorPort, Sink};

use super::{logged, ChargerEngine};
use crate::aicl::{self, Decision};
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
    pub(super) fn aicl_tick(&mut self) {
        let inputs = self.inputs();
        if self.aicl_disconnect.tick(inputs) {
            info!("aicl: inputs gone, stopping");
            self.state.reverse_boost_pending = false;
            self.sink.set_present(Domain::UsbMains, false);
            self.sink.set_present(Domain::DcMains, false);
            return;
        }

        if self.state.reverse_boost_pending {
            debug!("aicl: reverse-boost recovery pending");
        } else if !self.aicl_step(inputs) {
            self.check_reverse_boost();
        }
        self.scheduler.schedule_after(TaskId::Aicl, TaskId::Aicl.period());
    }

    /// One AICL decision plus its register write. Returns whether AICL is
    /// actively working.
    fn aicl_step(&mut self, inputs: aicl::Inputs) -> bool {
        let vchg = self.sensors.rail_voltage_mv(Rail::Charger);
        if let Err(err) = &vchg {
            error!("vchg read failed: {}", err);
        }
        let decision = aicl::decide(self.limits, inputs, vchg);
        match decision {
            Decision::Step(step) => {
                match self.hw.set_input_current_limit(step.path, step.to_ma) {
                    Ok(()) => debug!("aicl: {} -> {} mA", step.from_ma, step.to_ma),
                    Err(err) => {
                        error!("aicl: input current write failed: {}", err);
                        self.limits.revert(step);
                    }
                }
            }
            Decision::AwaitingLimit => trace!("aicl: usb ceiling not reported"),
            Decision::Idle => {}
        }
        decision.working()
    }

    fn check_reverse_boost(&mut self) {
        let Some(discharging) = logged("battery current sign", self.hw.battery_discharging())
        else {
            return;
        };
        let Some(usb) = logged("usb status", self.hw.usb_rt()) else {
            return;
        };
        if protect::reverse_boost_suspected(
            discharging,
            usb,
            self.state.disabled_for_shutdown,
            self.state.clock_workaround,
        ) {
            warn!("reverse boost suspected, holding charge path");
            self.state.reverse_boost_pending = true;
            self.disable_charge_with_batfet(Batfet::Close);
            self.scheduler.schedule_after(
                TaskId::ReverseBoostRecovery,
                TaskId::ReverseBoostRecovery.period(),
            );
        }
    }

    pub(super) fn reverse_boost_recovery(&mut self) {
        self.state.reverse_boost_pending = false;
        if self.state.chg_done || self.state.disabled_for_shutdown || self.state.clock_workaround
        {
            debug!("reverse boost: charging stays off");
            return;
        }
        debug!("reverse boost: resuming");
        self.enable_charge(!self.state.charging_disabled);
    }
}
