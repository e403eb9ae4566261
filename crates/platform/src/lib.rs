//! Collaborator seams for the PMIC charger controller.
//!
//! The charger decision engine never touches a bus, an ADC or a timer
//! directly. Everything it needs from the outside world goes through the
//! traits defined here, which keeps the engine host-testable and lets the
//! firmware crate bind them to real peripherals.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate: async runner, ISR glue)
//!         ↓
//! Decision Engine (charger crate)
//!         ↓
//! Platform seams (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (Embassy HAL + PAC, PMIC over I2C/SPMI)
//! ```
//!
//! # Seams
//!
//! - [`RegisterPort`] - byte-wide register read / write / masked write
//! - [`SensorPort`] - battery voltage, current, temperature, rails, SOC
//! - [`EventSource`] - per-line interrupt enable / disable
//! - [`Scheduler`] - one-shot and periodic deferred tasks
//! - [`Sink`] - state-changed notifications to the rest of the system
//!
//! # Features
//!
//! - `std`: expose [`mocks`] outside this crate's own tests
//! - `defmt`: derive `defmt::Format` on all public types
//!
//! # Example
//!
//! ```no_run
//! use platform::{BusError, RegisterPort};
//!
//! fn charge_enabled<R: RegisterPort>(regs: &mut R) -> Result<bool, BusError> {
//!     Ok(regs.read_byte(0x1049)? & 0x80 != 0)
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware seam crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors; callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod event;
pub mod mocks;
pub mod register;
pub mod scheduler;
pub mod sensor;
pub mod sink;
pub mod units;

pub use event::{EventSource, Line, LineSet, SoftLineMask};
pub use register::{BusError, I2cRegisterPort, RegisterPort};
pub use scheduler::{Scheduler, TimerQueue};
pub use sensor::{Boundary, InputPath, Rail, SensorError, SensorPort, TemperatureWindow};
pub use sink::{DockState, Domain, Sink};
pub use units::{OutOfRangeError, StateOfCharge};
