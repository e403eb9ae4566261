//! Async driver for the charger engine.
//!
//! The engine is synchronous and single-threaded: every entry point runs to
//! completion on the charger task. Interrupt glue, the thermal monitor and
//! power-supply clients never call it directly; they post a
//! [`ChargerEvent`] into [`CHARGER_EVENTS`] and the runner applies it in
//! arrival order, interleaved with the engine's deferred tasks as their
//! deadlines come due.
//!
//! # Overflow handling
//!
//! [`try_send`] never blocks. If the charger task stalls and the channel
//! reaches [`CHARGER_EVENT_DEPTH`], new events are dropped with a warning.
//! Presence lines are level-triggered: the next edge re-reads the hardware
//! status, so a dropped line event is recovered on the following interrupt.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_time::{Instant, Timer};

use charger::{ChargerEngine, ChargerError, TaskId};
use platform::{Boundary, EventSource, Line, RegisterPort, SensorPort, Sink, TimerQueue};

// ── Channel ──────────────────────────────────────────────────────────────────

/// Depth of the static event channel.
pub const CHARGER_EVENT_DEPTH: usize = 16;

/// Event channel type shared by producers and the charger task.
pub type EventChannel = Channel<CriticalSectionRawMutex, ChargerEvent, CHARGER_EVENT_DEPTH>;
/// Producer half of an [`EventChannel`].
pub type EventSender<'a> = Sender<'a, CriticalSectionRawMutex, ChargerEvent, CHARGER_EVENT_DEPTH>;
/// Consumer half of an [`EventChannel`].
pub type EventReceiver<'a> =
    Receiver<'a, CriticalSectionRawMutex, ChargerEvent, CHARGER_EVENT_DEPTH>;

// CriticalSectionRawMutex: producers include EXTI tasks and the thermal
// monitor; each queue operation holds the critical section for a handful of
// instructions.
/// Global event channel feeding the charger task.
pub static CHARGER_EVENTS: EventChannel = Channel::new();

/// Input to the charger engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargerEvent {
    /// A PMIC interrupt line fired.
    Line(Line),
    /// The battery temperature left the armed window.
    TemperatureCrossed(Boundary),
    /// A USB client negotiated a new input ceiling, mA.
    UsbCurrentMax(u32),
    /// A new DC input ceiling, mA.
    DcCurrentMax(u32),
    /// Something outside the charger changed (fuel gauge, external supply).
    SupplyChanged,
    /// User or system request to enable or disable charging.
    SetChargingEnabled(bool),
    /// Select a thermal mitigation level.
    SetThermalLevel(u8),
    /// Stop charging at a low state of charge.
    SetStopAtLowBattery(bool),
}

impl ChargerEvent {
    /// Short name for log output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Line(line) => line.name(),
            Self::TemperatureCrossed(Boundary::Warm) => "temp-warm",
            Self::TemperatureCrossed(Boundary::Cool) => "temp-cool",
            Self::UsbCurrentMax(_) => "usb-current-max",
            Self::DcCurrentMax(_) => "dc-current-max",
            Self::SupplyChanged => "supply-changed",
            Self::SetChargingEnabled(_) => "set-charging-enabled",
            Self::SetThermalLevel(_) => "set-thermal-level",
            Self::SetStopAtLowBattery(_) => "set-stop-at-low-battery",
        }
    }
}

/// Attempt to send a [`ChargerEvent`] without blocking.
///
/// Returns `true` if the event was enqueued, `false` if the channel was full
/// and the event was dropped.
pub fn try_send(tx: &EventSender<'_>, event: ChargerEvent) -> bool {
    match tx.try_send(event) {
        Ok(()) => true,
        Err(_) => {
            warn!("charger event dropped: {}", event.name());
            false
        }
    }
}

/// Post `event` to [`CHARGER_EVENTS`] without blocking.
pub fn post_event(event: ChargerEvent) -> bool {
    try_send(&CHARGER_EVENTS.sender(), event)
}

// ── Engine driving ───────────────────────────────────────────────────────────

/// Timer queue the runner drives on the embassy clock.
pub type ChargerQueue = TimerQueue<TaskId, { TaskId::COUNT }>;

/// The engine as the runner owns it.
pub type Engine<'a, R, S, E, K> = ChargerEngine<'a, R, S, E, K, ChargerQueue>;

/// Apply one event to the engine.
pub fn dispatch<R, S, E, K>(engine: &mut Engine<'_, R, S, E, K>, event: ChargerEvent)
where
    R: RegisterPort,
    S: SensorPort,
    E: EventSource,
    K: Sink,
{
    debug!("charger event {}", event.name());
    match event {
        ChargerEvent::Line(line) => engine.on_line(line),
        ChargerEvent::TemperatureCrossed(boundary) => engine.on_temperature_crossed(boundary),
        ChargerEvent::UsbCurrentMax(ma) => engine.on_power_supply_changed(Some(ma)),
        ChargerEvent::DcCurrentMax(ma) => engine.on_dc_current_max(ma),
        ChargerEvent::SupplyChanged => engine.on_power_supply_changed(None),
        ChargerEvent::SetChargingEnabled(enabled) => engine.set_charging_enabled(enabled),
        ChargerEvent::SetThermalLevel(level) => engine.set_thermal_level(level),
        ChargerEvent::SetStopAtLowBattery(stop) => engine.set_stop_charging_at_low_battery(stop),
    }
}

/// Move the queue clock to `now` and run every task that has expired.
///
/// Returns the number of tasks run.
pub fn drain_expired<R, S, E, K>(engine: &mut Engine<'_, R, S, E, K>, now: Instant) -> usize
where
    R: RegisterPort,
    S: SensorPort,
    E: EventSource,
    K: Sink,
{
    engine.scheduler_mut().advance_to(now);
    let mut ran = 0usize;
    while let Some(task) = engine.scheduler_mut().pop_expired() {
        engine.run_task(task);
        ran = ran.saturating_add(1);
    }
    ran
}

/// Sync the queue clock with the embassy clock and initialize the engine.
///
/// Deferred work scheduled during init is measured from the current time,
/// not from boot.
pub fn start<R, S, E, K>(engine: &mut Engine<'_, R, S, E, K>) -> Result<(), ChargerError>
where
    R: RegisterPort,
    S: SensorPort,
    E: EventSource,
    K: Sink,
{
    engine.scheduler_mut().advance_to(Instant::now());
    engine.init()
}

/// Wait for the next event or the next task deadline, whichever comes
/// first, and process everything that is due.
pub async fn step<R, S, E, K>(engine: &mut Engine<'_, R, S, E, K>, rx: &EventReceiver<'_>)
where
    R: RegisterPort,
    S: SensorPort,
    E: EventSource,
    K: Sink,
{
    engine.scheduler_mut().advance_to(Instant::now());
    let deadline = engine.scheduler().next_deadline();
    let timer = async {
        match deadline {
            Some(at) => Timer::at(at).await,
            None => core::future::pending::<()>().await,
        }
    };
    if let Either::First(event) = select(rx.receive(), timer).await {
        engine.scheduler_mut().advance_to(Instant::now());
        dispatch(engine, event);
    }
    drain_expired(engine, Instant::now());
}

/// Charger task body. Never returns.
pub async fn run_charger<R, S, E, K>(
    mut engine: Engine<'_, R, S, E, K>,
    rx: EventReceiver<'_>,
) -> !
where
    R: RegisterPort,
    S: SensorPort,
    E: EventSource,
    K: Sink,
{
    if let Err(err) = start(&mut engine) {
        error!("charger init failed: {}", err);
    }
    info!("charger runner up, {} tasks pending", engine.scheduler().len());
    loop {
        step(&mut engine, &rx).await;
    }
}
