//! JEITA crossings and thermal mitigation levels.

use platform::{Boundary, EventSource, RegisterPort, Scheduler, SensorPort, Sink};

use super::ChargerEngine;
use crate::task::TaskId;
use crate::thermal::{self, Zone};

impl<R, S, E, K, Q> ChargerEngine<'_, R, S, E, K, Q>
where
    R: RegisterPort,
    S: SensorPort,
    E: EventSource,
    K: Sink,
    Q: Scheduler<TaskId>,
{
    /// The thermistor monitor reported a crossing of `boundary`.
    ///
    /// The monitor is one-shot: a window is always re-armed, the new one on
    /// a transition, the previous one otherwise.
    pub fn on_temperature_crossed(&mut self, boundary: Boundary) {
        let Some(jeita) = self.config.jeita else {
            return;
        };
        let temp = match self.sensors.battery_temperature_decideg() {
            Ok(temp) => temp,
            Err(err) => {
                error!("battery temperature read failed: {}", err);
                self.arm_window(self.state.window);
                return;
            }
        };
        debug!("temperature {} crossed, warm={}", temp, boundary == Boundary::Warm);

        let Some(transition) = thermal::on_crossing(&jeita, boundary, temp) else {
            self.arm_window(self.state.window);
            return;
        };

        let mitigation_follows_zone = self.config.features.warm_disables_charging
            && !self.config.thermal_mitigation.is_empty()
            && !self.state.stop_at_low_battery;
        match (transition.zone, boundary) {
            (Zone::Warm, _) if mitigation_follows_zone => {
                let last = self.config.thermal_mitigation.len().saturating_sub(1);
                self.select_thermal_level(u8::try_from(last).unwrap_or(u8::MAX));
            }
            (Zone::Normal, Boundary::Cool) if mitigation_follows_zone => {
                self.select_thermal_level(0);
            }
            _ => {}
        }

        if transition.zone != self.state.zone {
            info!("battery zone change at {} decideg", temp);
            self.state.zone = transition.zone;
            self.apply_vddmax();
            self.apply_battery_current();
            self.apply_vbatdet();
        }
        self.arm_window(transition.window);
    }

    /// Select thermal mitigation `level`. The last level stops charging.
    ///
    /// Out-of-range levels are rejected and logged.
    pub(super) fn select_thermal_level(&mut self, level: u8) {
        let levels = self.config.thermal_mitigation.len();
        if usize::from(level) >= levels {
            warn!("unsupported thermal level {} of {}", level, levels);
            return;
        }
        self.state.thermal_level = level;
        if usize::from(level) == levels.saturating_sub(1) {
            self.buck_control(false);
        } else {
            self.buck_control(true);
            self.apply_battery_current();
        }
    }
}
