//! Application core — control decisions, no direct I/O.
//!
//! This module holds the greenhouse control loop, its request surface and
//! the port traits it is written against. Storage, the broker and the
//! relays are reached only through [`ports`], so the loop runs unchanged
//! against mock adapters in tests.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
