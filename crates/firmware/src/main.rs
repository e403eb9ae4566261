//! PMIC charger firmware - main entry point.
//!
//! Hardware-only entry point for STM32H743ZI with the charger PMIC on I2C2.

#![no_std]
#![no_main]

use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32::dma::NoDma;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{AnyPin, Input, Pull};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::peripherals::I2C2;
use embassy_stm32::time::Hertz;
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_time::{Duration, Timer};

use charger::{ChargerConfig, ChargerEngine, LimitRegistry};
use firmware::{
    check_temperature, post_event, run_charger, ChannelSink, ChargerEvent, ChargerQueue,
    Engine, SharedSnapshot, SnapshotSensors, CHARGER_EVENTS,
};
use platform::{I2cRegisterPort, Line, SoftLineMask};

// Panic handler
use panic_probe as _;

bind_interrupts!(struct Irqs {
    I2C2_EV => i2c::EventInterruptHandler<peripherals::I2C2>;
    I2C2_ER => i2c::ErrorInterruptHandler<peripherals::I2C2>;
});

/// 7-bit I2C address of the charger PMIC.
const PMIC_I2C_ADDR: u8 = 0x08;

/// IWDG timeout. The heartbeat below pets it every second.
const WATCHDOG_TIMEOUT_US: u32 = 8_000_000;

/// Heartbeat: watchdog pet and thermistor window check.
const HEARTBEAT: Duration = Duration::from_secs(1);

/// Input current limits shared with power-supply clients.
static LIMITS: LimitRegistry = LimitRegistry::new();

/// Latest fuel-gauge and rail measurements, published by the gauge client.
static SNAPSHOT: SharedSnapshot = SharedSnapshot::new();

type PmicBus = I2c<'static, I2C2, NoDma, NoDma>;
type HwEngine = Engine<
    'static,
    I2cRegisterPort<PmicBus>,
    SnapshotSensors<'static>,
    SoftLineMask,
    ChannelSink<'static>,
>;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    defmt::info!("PMIC charger firmware v{=str}", env!("CARGO_PKG_VERSION"));
    let p = embassy_stm32::init(embassy_stm32::Config::default());

    let mut watchdog = embassy_stm32::wdg::IndependentWatchdog::new(p.IWDG1, WATCHDOG_TIMEOUT_US);
    watchdog.unleash(); // cannot be stopped after this point
    defmt::info!("IWDG watchdog armed: timeout={=u32}us", WATCHDOG_TIMEOUT_US);

    // PF1 = I2C2_SCL, PF0 = I2C2_SDA
    let bus: PmicBus = I2c::new(
        p.I2C2,
        p.PF1,
        p.PF0,
        Irqs,
        NoDma,
        NoDma,
        Hertz(400_000),
        i2c::Config::default(),
    );

    let config = match ChargerConfig::builder()
        .max_voltage_mv(4200)
        .min_voltage_mv(4000)
        .safe_voltage_mv(4200)
        .term_current_ma(150)
        .max_input_usb_ma(1500)
        .thermal_mitigation(&[1500, 1000, 500, 0])
        .build()
    {
        Ok(config) => config,
        Err(err) => {
            defmt::error!("charger config rejected: {}", err);
            ChargerConfig::default()
        }
    };

    let engine = match ChargerEngine::new(
        config,
        I2cRegisterPort::new(bus, PMIC_I2C_ADDR),
        SnapshotSensors::new(&SNAPSHOT),
        SoftLineMask::new(),
        ChannelSink::global(),
        ChargerQueue::new(),
        &LIMITS,
    ) {
        Ok(engine) => engine,
        Err(err) => {
            defmt::error!("charger engine rejected config: {}", err);
            loop {
                Timer::after(HEARTBEAT).await;
                watchdog.pet();
            }
        }
    };

    if let Err(err) = spawner.spawn(charger_task(engine)) {
        defmt::error!("failed to spawn charger task: {}", defmt::Debug2Format(&err));
    }

    // PE7 = PMIC summary interrupt, active-low open drain (EXTI7)
    let pmic_irq: ExtiInput<'static, AnyPin> =
        ExtiInput::new(Input::new(p.PE7, Pull::Up).degrade(), p.EXTI7.degrade());
    if let Err(err) = spawner.spawn(pmic_irq_task(pmic_irq)) {
        defmt::error!("failed to spawn PMIC IRQ task: {}", defmt::Debug2Format(&err));
    }

    defmt::info!("Entering main loop");
    loop {
        Timer::after(HEARTBEAT).await;
        if let Some(boundary) = check_temperature(&SNAPSHOT) {
            post_event(ChargerEvent::TemperatureCrossed(boundary));
        }
        watchdog.pet();
    }
}

/// Owns the engine for the lifetime of the program.
#[embassy_executor::task]
async fn charger_task(engine: HwEngine) {
    run_charger(engine, CHARGER_EVENTS.receiver()).await
}

/// Forwards PMIC summary interrupts as presence lines followed by a supply
/// change.
///
/// The engine re-reads the realtime status registers for every presence
/// line, so posting all three on each edge is idempotent. The supply change
/// re-checks the low-battery stop and keeps the AICL ramp armed.
#[embassy_executor::task]
async fn pmic_irq_task(mut irq: ExtiInput<'static, AnyPin>) {
    loop {
        irq.wait_for_falling_edge().await;
        for line in [Line::UsbPresent, Line::DcPresent, Line::BatteryPresent] {
            post_event(ChargerEvent::Line(line));
        }
        post_event(ChargerEvent::SupplyChanged);
    }
}
