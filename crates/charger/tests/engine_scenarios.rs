//! End-to-end engine scenarios against the host mocks, driven through the
//! timer queue the way the firmware runner drives them.

#![allow(clippy::unwrap_used)]

use charger::hw::at;
use charger::hw::registers::{
    BATT_PRES_RT, BAT_FET_ON_RT, CHGR_CHG_CTRL, CHGR_IBAT_MAX, CHGR_VDD_MAX, CHG_EN,
    CHG_GONE_RT, DCIN_VALID_RT, FAST_CHG_ON_RT, INT_RT_STS, PATH_I_MAX, STATUS, USB_SUSP,
    USB_SUSPEND, USB_VALID, VDD_LOOP_RT,
};
use charger::{
    ChargerConfig, ChargerEngine, JeitaConfig, LimitRegistry, LimitUpdate, TaskId, Zone,
};
use embassy_time::Duration;
use platform::mocks::{MockEvents, MockRegisters, MockSensors, RecordingSink};
use platform::{Boundary, Domain, EventSource, InputPath, Line, Scheduler, TimerQueue};

const CHGR: u16 = 0x1000;
const BUCK: u16 = 0x1100;
const BAT_IF: u16 = 0x1200;
const USB: u16 = 0x1300;
const DC: u16 = 0x1400;

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

/// Advance the queue clock by `ms`, running every task that expires on the
/// way in deadline order.
fn run_for(e: &mut Engine<'_>, ms: u64) {
    let end = e
        .scheduler()
        .now()
        .checked_add(Duration::from_millis(ms))
        .unwrap();
    loop {
        let next = e.scheduler().next_deadline();
        match next {
            Some(deadline) if deadline <= end => {
                e.scheduler_mut().advance_to(deadline);
                while let Some(task) = e.scheduler_mut().pop_expired() {
                    e.run_task(task);
                }
            }
            _ => break,
        }
    }
    e.scheduler_mut().advance_to(end);
}

fn battery_in(e: &mut Engine<'_>, fet_on: bool) {
    let fet = if fet_on { BAT_FET_ON_RT } else { 0 };
    e.registers_mut().poke(at(BAT_IF, INT_RT_STS), BATT_PRES_RT | fet);
}

fn usb_in(e: &mut Engine<'_>, present: bool) {
    e.registers_mut().poke(at(USB, STATUS), if present { USB_VALID } else { 0 });
}

fn dc_in(e: &mut Engine<'_>, present: bool) {
    e.registers_mut().poke(at(DC, INT_RT_STS), if present { DCIN_VALID_RT } else { 0 });
}

fn charge_enabled(e: &Engine<'_>) -> bool {
    e.registers().peek(at(CHGR, CHGR_CHG_CTRL)) & CHG_EN != 0
}

#[test]
fn init_with_usb_attached_starts_charging() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.init().unwrap();

    assert!(e.usb_online());
    assert!(!e.dc_online());
    assert!(charge_enabled(&e));
    assert!(e.scheduler().is_pending(TaskId::Eoc));
    assert_eq!(e.sink().presence.as_slice(), &[(Domain::UsbMains, true)]);
}

#[test]
fn plug_after_unplug_rearms_eoc_and_clears_done() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    e.init().unwrap();
    assert!(!e.scheduler().is_pending(TaskId::Eoc));

    usb_in(&mut e, true);
    e.on_line(Line::UsbPresent);
    assert!(e.scheduler().is_pending(TaskId::Eoc));
    assert!(!e.state().chg_done);
    assert_eq!(e.sink().presence.last(), Some(&(Domain::UsbMains, true)));
}

#[test]
fn three_qualifying_cv_samples_terminate_charge() {
    let limits = LimitRegistry::new();
    let config = ChargerConfig::builder().term_current_ma(150).build().unwrap();
    let mut e = engine(&limits, config);
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.registers_mut().poke(at(CHGR, INT_RT_STS), FAST_CHG_ON_RT);
    e.registers_mut().poke(at(BUCK, INT_RT_STS), VDD_LOOP_RT);
    e.sensors_mut().battery_ma = Ok(-50);
    e.sensors_mut().battery_mv = Ok(4195);
    e.init().unwrap();
    e.on_line(Line::FastChargeOn);
    // First health reading is a change from unknown.
    e.run_task(TaskId::HealthCheck);
    e.sink_mut().clear();

    run_for(&mut e, 20_000);
    assert!(!e.state().chg_done);
    assert_eq!(e.eoc_count(), 2);

    run_for(&mut e, 10_000);
    assert!(e.state().chg_done);
    assert!(!charge_enabled(&e), "battery FET opened, charging off");
    assert_eq!(e.sink().changed_count(Domain::Battery), 1);
    assert!(!e.scheduler().is_pending(TaskId::Eoc));
    assert!(e.events().is_enabled(Line::LowVoltageDetect));
}

#[test]
fn leaving_cv_loop_restarts_the_count() {
    let limits = LimitRegistry::new();
    let config = ChargerConfig::builder().term_current_ma(150).build().unwrap();
    let mut e = engine(&limits, config);
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.registers_mut().poke(at(CHGR, INT_RT_STS), FAST_CHG_ON_RT);
    e.registers_mut().poke(at(BUCK, INT_RT_STS), VDD_LOOP_RT);
    e.sensors_mut().battery_ma = Ok(-50);
    e.sensors_mut().battery_mv = Ok(4195);
    e.init().unwrap();

    run_for(&mut e, 20_000);
    assert_eq!(e.eoc_count(), 2);
    e.registers_mut().poke(at(BUCK, INT_RT_STS), 0);
    run_for(&mut e, 10_000);
    assert_eq!(e.eoc_count(), 0);
    assert!(!e.state().chg_done);
    assert!(e.scheduler().is_pending(TaskId::Eoc));
}

#[test]
fn cv_sample_below_target_raises_vddmax_trim() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.registers_mut().poke(at(CHGR, INT_RT_STS), FAST_CHG_ON_RT);
    e.registers_mut().poke(at(BUCK, INT_RT_STS), VDD_LOOP_RT);
    e.sensors_mut().battery_mv = Ok(4150);
    e.init().unwrap();

    run_for(&mut e, 10_000);
    assert_eq!(e.state().vddmax_trim_mv, 50);
    // (4200 + 50 - 3240) / 10
    assert_eq!(e.registers().peek(at(CHGR, CHGR_VDD_MAX)), 101);
}

#[test]
fn aicl_steps_dc_and_leaves_usb_alone() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    dc_in(&mut e, true);
    e.init().unwrap();

    limits.reset(InputPath::Usb, LimitUpdate::Set(1500));
    e.on_dc_current_max(1500);
    while limits.snapshot(InputPath::Dc).set_ma < 500 {
        limits.try_step(InputPath::Dc).unwrap();
    }
    assert_eq!(limits.snapshot(InputPath::Dc).set_ma, 500);

    e.run_task(TaskId::Aicl);
    assert_eq!(limits.snapshot(InputPath::Dc).set_ma, 600);
    assert_eq!(limits.snapshot(InputPath::Usb).set_ma, 100);
    assert_eq!(e.registers().last_write(at(DC, PATH_I_MAX)), Some(6));
    assert!(e.scheduler().is_pending(TaskId::Aicl));
}

#[test]
fn dc_plug_with_reported_ceiling_ramps_input_current() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    e.init().unwrap();
    assert!(!e.scheduler().is_pending(TaskId::Aicl));

    dc_in(&mut e, true);
    e.on_line(Line::DcPresent);
    e.on_dc_current_max(1500);
    assert!(e.scheduler().is_pending(TaskId::Aicl));
    assert!(e.scheduler().is_pending(TaskId::HealthCheck));

    run_for(&mut e, 1_000);
    assert_eq!(limits.snapshot(InputPath::Dc).set_ma, 500);
    assert_eq!(e.registers().last_write(at(DC, PATH_I_MAX)), Some(5));

    run_for(&mut e, 5_000);
    assert_eq!(limits.snapshot(InputPath::Dc).set_ma, 1500);
    assert_eq!(e.registers().last_write(at(DC, PATH_I_MAX)), Some(15));
}

#[test]
fn odd_ceiling_ramps_to_what_the_register_holds() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    dc_in(&mut e, true);
    e.init().unwrap();
    e.on_dc_current_max(450);

    run_for(&mut e, 5_000);
    assert_eq!(limits.snapshot(InputPath::Dc).set_ma, 400);
    assert_eq!(e.registers().last_write(at(DC, PATH_I_MAX)), Some(4));

    e.on_dc_current_max(180);
    e.registers_mut().clear_log();
    run_for(&mut e, 5_000);
    assert_eq!(limits.snapshot(InputPath::Dc).set_ma, 150);
    assert_eq!(e.registers().last_write(at(DC, PATH_I_MAX)), Some(0x01));
}

#[test]
fn aicl_ramp_stops_at_reported_ceiling() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.init().unwrap();
    e.on_power_supply_changed(Some(500));

    run_for(&mut e, 5_000);
    assert_eq!(limits.snapshot(InputPath::Usb).set_ma, 500);
    assert_eq!(e.registers().last_write(at(USB, PATH_I_MAX)), Some(5));
}

#[test]
fn aicl_holds_when_input_rail_sags() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.init().unwrap();
    e.sensors_mut().charger_mv = Ok(4150);
    e.on_power_supply_changed(Some(1500));

    run_for(&mut e, 2_000);
    assert_eq!(limits.snapshot(InputPath::Usb).set_ma, 100);
}

#[test]
fn replug_resets_set_before_next_step() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.init().unwrap();
    e.on_power_supply_changed(Some(1500));
    run_for(&mut e, 1_000);
    assert!(limits.snapshot(InputPath::Usb).set_ma > 100);

    usb_in(&mut e, false);
    e.on_line(Line::UsbPresent);
    assert_eq!(limits.snapshot(InputPath::Usb).set_ma, 100);
    usb_in(&mut e, true);
    e.on_line(Line::UsbPresent);
    assert_eq!(limits.snapshot(InputPath::Usb).set_ma, 100);

    e.scheduler_mut().cancel(TaskId::Aicl);
    e.run_task(TaskId::Aicl);
    assert_eq!(limits.snapshot(InputPath::Usb).set_ma, 150);
}

#[test]
fn aicl_stops_after_three_ticks_without_input() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.init().unwrap();
    e.on_power_supply_changed(Some(1500));

    usb_in(&mut e, false);
    run_for(&mut e, 1_000);
    assert!(!e.scheduler().is_pending(TaskId::Aicl));
    assert!(e.sink().presence.contains(&(Domain::DcMains, false)));
}

#[test]
fn reverse_boost_suspends_then_recovers() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.init().unwrap();
    // Ceiling already reached: AICL idles and the guard runs.
    limits.reset(InputPath::Usb, LimitUpdate::Set(100));
    e.registers_mut().poke(at(USB, INT_RT_STS), CHG_GONE_RT);

    e.run_task(TaskId::Aicl);
    assert!(e.state().reverse_boost_pending);
    assert!(!charge_enabled(&e));
    assert!(e.scheduler().is_pending(TaskId::ReverseBoostRecovery));

    e.registers_mut().poke(at(USB, INT_RT_STS), 0);
    run_for(&mut e, 500);
    assert!(!e.state().reverse_boost_pending);
    assert!(charge_enabled(&e));
}

#[test]
fn reverse_boost_not_checked_while_aicl_ramps() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.init().unwrap();
    limits.reset(InputPath::Usb, LimitUpdate::Set(1500));
    e.registers_mut().poke(at(USB, INT_RT_STS), CHG_GONE_RT);

    e.run_task(TaskId::Aicl);
    assert!(!e.state().reverse_boost_pending);
    assert_eq!(limits.snapshot(InputPath::Usb).set_ma, 150);
}

#[test]
fn over_voltage_on_plug_holds_until_unplug() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    e.init().unwrap();

    e.sensors_mut().usb_in_mv = Ok(7000);
    usb_in(&mut e, true);
    e.on_line(Line::UsbPresent);
    run_for(&mut e, 0);
    assert!(e.state().ovp_charge_disabled);
    assert!(!charge_enabled(&e));

    // EOC re-asserts charging every tick; the over-voltage gate must win.
    run_for(&mut e, 10_000);
    assert!(!charge_enabled(&e));

    usb_in(&mut e, false);
    e.on_line(Line::UsbPresent);
    assert!(!e.state().ovp_charge_disabled);
    assert!(charge_enabled(&e));
}

fn jeita_config() -> ChargerConfig {
    ChargerConfig::builder()
        .jeita(JeitaConfig {
            warm_decideg: 450,
            cool_decideg: 100,
            warm_voltage_mv: 4100,
            cool_voltage_mv: 4100,
            warm_current_ma: 700,
            cool_current_ma: 500,
            hysteresis_decideg: 20,
        })
        .build()
        .unwrap()
}

#[test]
fn warm_zone_derates_and_hysteresis_holds() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, jeita_config());
    battery_in(&mut e, true);
    e.init().unwrap();
    assert_eq!(e.sensors().window_arms, 1);

    e.sensors_mut().temperature_decideg = Ok(460);
    e.on_temperature_crossed(Boundary::Warm);
    assert_eq!(e.state().zone, Zone::Warm);
    // (4100 - 3240) / 10
    assert_eq!(e.registers().peek(at(CHGR, CHGR_VDD_MAX)), 86);
    assert_eq!(e.registers().peek(at(CHGR, CHGR_IBAT_MAX)) & 0x3F, 14);

    // Inside the band: no flip, previous window re-armed.
    e.sensors_mut().temperature_decideg = Ok(440);
    let window = e.sensors().window;
    e.on_temperature_crossed(Boundary::Cool);
    assert_eq!(e.state().zone, Zone::Warm);
    assert_eq!(e.sensors().window, window);

    e.sensors_mut().temperature_decideg = Ok(420);
    e.on_temperature_crossed(Boundary::Cool);
    assert_eq!(e.state().zone, Zone::Normal);
    // (4200 - 3240) / 10
    assert_eq!(e.registers().peek(at(CHGR, CHGR_VDD_MAX)), 96);
}

#[test]
fn last_thermal_level_stops_charging() {
    let limits = LimitRegistry::new();
    let config = ChargerConfig::builder()
        .thermal_mitigation(&[1500, 700, 0])
        .build()
        .unwrap();
    let mut e = engine(&limits, config);
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.init().unwrap();

    e.set_thermal_level(1);
    assert_eq!(e.thermal_level(), 1);
    assert_eq!(e.registers().peek(at(CHGR, CHGR_IBAT_MAX)) & 0x3F, 14);
    assert!(charge_enabled(&e));

    e.set_thermal_level(2);
    assert!(!charge_enabled(&e));

    e.set_thermal_level(3);
    assert_eq!(e.thermal_level(), 2, "out-of-range level rejected");
}

#[test]
fn disabled_charging_survives_eoc_ticks() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.init().unwrap();
    e.set_charging_enabled(false);
    run_for(&mut e, 30_000);
    assert!(!charge_enabled(&e));
    assert!(!e.charging_enabled());
}

#[test]
fn fast_charge_polling_replaces_the_line() {
    let limits = LimitRegistry::new();
    let config = ChargerConfig::builder()
        .features(charger::Features {
            fast_charge_polling: true,
            ..charger::Features::default()
        })
        .build()
        .unwrap();
    let mut e = engine(&limits, config);
    battery_in(&mut e, true);
    e.init().unwrap();
    assert!(!e.events().is_enabled(Line::FastChargeOn));

    e.registers_mut().poke(at(CHGR, INT_RT_STS), FAST_CHG_ON_RT);
    run_for(&mut e, 5_000);
    assert!(e.scheduler().is_pending(TaskId::Eoc));
    assert!(e.scheduler().is_pending(TaskId::FastChargePoll));
}

#[test]
fn full_unplug_cancels_polling() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.init().unwrap();
    e.on_power_supply_changed(Some(1500));
    assert!(e.scheduler().is_pending(TaskId::HealthCheck));

    usb_in(&mut e, false);
    e.on_line(Line::UsbPresent);
    assert!(!e.scheduler().is_pending(TaskId::Eoc));
    assert!(!e.scheduler().is_pending(TaskId::HealthCheck));
    assert_eq!(e.sink().unplug.last(), Some(&true));
}

// ── Bus failures ─────────────────────────────────────────────────────────────

#[test]
fn failed_input_current_write_reverts_the_step() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    dc_in(&mut e, true);
    e.init().unwrap();
    e.on_dc_current_max(1500);
    e.registers_mut().clear_log();

    e.registers_mut().fail_at(at(DC, PATH_I_MAX));
    run_for(&mut e, 1_000);
    assert_eq!(limits.snapshot(InputPath::Dc).set_ma, 100);
    assert_eq!(e.registers().last_write(at(DC, PATH_I_MAX)), None);
    assert!(e.scheduler().is_pending(TaskId::Aicl), "ramp keeps trying");

    e.registers_mut().fail_all(false);
    run_for(&mut e, 200);
    assert_eq!(limits.snapshot(InputPath::Dc).set_ma, 150);
    assert_eq!(e.registers().last_write(at(DC, PATH_I_MAX)), Some(0x01));
}

#[test]
fn failed_charge_enable_write_keeps_the_request() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.init().unwrap();
    assert!(charge_enabled(&e));

    e.registers_mut().fail_at(at(CHGR, CHGR_CHG_CTRL));
    e.set_charging_enabled(false);
    assert!(!e.charging_enabled());
    assert!(!e.state().ovp_charge_disabled);
    assert!(charge_enabled(&e), "write never landed");

    e.registers_mut().fail_all(false);
    run_for(&mut e, 10_000);
    assert!(!charge_enabled(&e), "next eoc tick applies the request");
    assert!(!e.charging_enabled());
}

#[test]
fn failed_protective_write_is_retried_while_over_voltage_holds() {
    let limits = LimitRegistry::new();
    let mut e = engine(&limits, ChargerConfig::default());
    battery_in(&mut e, true);
    e.init().unwrap();

    e.sensors_mut().usb_in_mv = Ok(7000);
    usb_in(&mut e, true);
    e.on_line(Line::UsbPresent);
    assert!(charge_enabled(&e));

    e.registers_mut().fail_at(at(CHGR, CHGR_CHG_CTRL));
    run_for(&mut e, 0);
    assert!(e.state().ovp_charge_disabled);
    assert_eq!(e.registers().peek(at(USB, USB_SUSP)) & USB_SUSPEND, USB_SUSPEND);
    assert!(charge_enabled(&e), "batfet write failed");
    assert!(e.scheduler().is_pending(TaskId::Eoc));

    e.registers_mut().fail_all(false);
    run_for(&mut e, 10_000);
    assert!(!charge_enabled(&e));
    assert!(e.state().ovp_charge_disabled);
}

#[test]
fn status_read_failure_skips_the_eoc_sample_and_retries() {
    let limits = LimitRegistry::new();
    let config = ChargerConfig::builder().term_current_ma(150).build().unwrap();
    let mut e = engine(&limits, config);
    battery_in(&mut e, true);
    usb_in(&mut e, true);
    e.registers_mut().poke(at(CHGR, INT_RT_STS), FAST_CHG_ON_RT);
    e.registers_mut().poke(at(BUCK, INT_RT_STS), VDD_LOOP_RT);
    e.sensors_mut().battery_ma = Ok(-50);
    e.sensors_mut().battery_mv = Ok(4195);
    e.init().unwrap();

    e.registers_mut().fail_at(at(BAT_IF, INT_RT_STS));
    run_for(&mut e, 20_000);
    assert_eq!(e.eoc_count(), 0);
    assert!(!e.state().chg_done);
    assert!(e.scheduler().is_pending(TaskId::Eoc));

    e.registers_mut().fail_all(false);
    run_for(&mut e, 30_000);
    assert!(e.state().chg_done);
}
