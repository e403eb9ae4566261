//! Battery charger decision engine for switch-mode PMIC charger blocks.
//!
//! The engine reacts to interrupt lines, deferred-task expiries,
//! thermistor crossings and supply notifications, and turns them into
//! register writes on the charger, buck, battery-interface, USB and DC
//! blocks. All hardware access goes through the [`platform`] seams.
//!
//! # Components
//!
//! - [`LimitRegistry`] - per-input ceiling and applied input current
//! - presence tracking - debounced USB / DC edges, dock and unplug
//!   publication ([`ChargerEngine::on_usb_edge`])
//! - end-of-charge detection - [`eoc::EocCounter`] and the 10 s poll
//! - JEITA compliance - [`thermal::on_crossing`] and the window it re-arms
//! - AICL - [`aicl::decide`] stepping the input current every 200 ms
//! - protection - input over-voltage and the reverse-boost guard
//!
//! # Features
//!
//! - `std`: re-export the mock seams for host tests
//! - `defmt`: `defmt::Format` derives and defmt logging
//! - `tracing`: log through `tracing` on the host

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
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;

#[macro_use]
mod fmt;

pub mod aicl;
pub mod config;
pub mod engine;
pub mod eoc;
pub mod health;
pub mod hw;
pub mod limits;
pub mod protect;
pub mod state;
pub mod task;
pub mod thermal;
pub mod variant;

pub use config::{
    BpdScheme, ChargerConfig, ChargerConfigBuilder, Features, JeitaConfig, PeripheralBases,
    ThermalTable, MAX_THERMAL_LEVELS,
};
pub use engine::ChargerEngine;
pub use error::{ChargerError, ConfigError};
pub use health::{BatteryHealth, BatteryStatus, ChargeType};
pub use limits::{LimitRegistry, LimitUpdate, PathLimit};
pub use protect::Batfet;
pub use state::ChargerState;
pub use task::TaskId;
pub use thermal::Zone;
pub use variant::{Capabilities, ChipVariant};
