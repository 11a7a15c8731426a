//! DHT11 Sensor Driver for Embedded Rust
//!
//! This crate provides a platform-agnostic driver for DHT11 temperature and
//! humidity sensors, built on top of the [`embedded-hal`] traits. Several
//! sensors can share one interrupt-driven capture pipeline.
//!
//! # Features
//! - Blocking reads that busy-poll the line against a microsecond counter
//! - Non-blocking reads that capture edges from the pin interrupt
//! - An [`Arbiter`] admitting one sensor at a time from a FIFO queue
//! - A pure [`decode`] function turning edge timestamps into data
//! - Designed for `no_std` environments, no allocation, no locks
//!
//! # Wiring the interrupt
//!
//! Each sensor gets a [`Capture`], usually in a `static`. The pin interrupt
//! handler records edges with [`Capture::handle_edge`]; a background task
//! calls [`Arbiter::tick`] every millisecond or so, which starts
//! transmissions and delivers results.
//!
//! # Optional Features
//! - `defmt`: Implements `defmt::Format` and emits driver logs via `defmt`
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;

pub mod arbiter;
pub mod capture;
pub mod codec;
pub mod dht11;
pub mod error;
pub mod pin;
pub mod timing;

#[cfg(test)]
mod testing;

pub use arbiter::{Arbiter, DeviceId, Reader, Tick};
pub use capture::{AcquisitionState, Capture};
pub use codec::{SensorResult, decode};
pub use dht11::{Callback, Dht11};
pub use error::DhtError;
pub use pin::{Direction, PinDriver};
pub use timing::{TimeSource, Timing, Window};
