//! PMIC charger firmware glue.
//!
//! Binds the synchronous [`charger::ChargerEngine`] to an embassy executor:
//! interrupt tasks and the rest of the system post [`runner::ChargerEvent`]s,
//! the charger task drains them and fires the engine's deferred work on the
//! embassy clock, and state changes leave through a channel-backed
//! [`platform::Sink`].
//!
//! # Architecture
//!
//! ```text
//! PMIC IRQ / thermal monitor / power-supply clients
//!         ↓  CHARGER_EVENTS
//! runner (one task, owns the engine and its timer queue)
//!         ↓  CHARGER_NOTICES
//! consumers (battery UI, dock LED, logging)
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for the STM32H7 target (embassy executor, HAL, RTT)
//! - `defmt` - Log through defmt and derive `defmt::Format`
//! - `std` - Host builds; log through tracing
//!
//! ## Hardware Target
//!
//! ```bash
//! cargo build --release --target thumbv7em-none-eabihf --features hardware
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Critical correctness: deny these
#![deny(clippy::await_holding_lock)] // holding a blocking Mutex across .await is a bug
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline (allow println in tests via clippy.toml)
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
#![allow(clippy::must_use_candidate)]

#[macro_use]
mod fmt;

pub mod runner;
pub mod sensors;
pub mod sink;

pub use runner::{
    dispatch, drain_expired, post_event, run_charger, start, step, try_send, ChargerEvent,
    ChargerQueue, Engine, EventChannel, EventReceiver, EventSender, CHARGER_EVENTS,
    CHARGER_EVENT_DEPTH,
};
pub use sensors::{check_temperature, SensorSnapshot, SharedSnapshot, SnapshotSensors};
pub use sink::{ChannelSink, ChargerNotice, NoticeChannel, CHARGER_NOTICES, NOTICE_DEPTH};
