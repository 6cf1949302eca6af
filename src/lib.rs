//! Greenhouse controller library.
//!
//! Closed-loop control of one greenhouse bay: a heater, two coolers, a
//! water pump and an LED grow-light, driven once per tick from the latest
//! sensor reading and the active crop's setpoints. Operators can take any
//! module over for a while, and photo captures force the LED on.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                     │
//! │  SensorFeed · CropProfiles · KvStore · MqttCommandPublisher   │
//! │  RelayBoard · LogEventSink · JsonConfigFile · SystemClock     │
//! │                                                               │
//! │  ──────────────── Port Trait Boundary ─────────────────       │
//! │                                                               │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │ ControlLoop: overrides · duty cycles · heater/pump gates│  │
//! │  │              light accrual · climate/irrigation rules   │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! │                                                               │
//! │  Scheduler (delegate-driven) · ControlHandle (request side)   │
//! └───────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod duty_cycle;
pub mod error;
pub mod model;
pub mod overrides;
pub mod safety;
pub mod scheduler;

pub use error::{Error, Result};
