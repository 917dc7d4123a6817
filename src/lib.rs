//! # thermolink
//!
//! Acquisition and decoding for the MAX31855 cold-junction-compensated K-type
//! thermocouple digitizer, read over a receive-only SPI bus.
//!
//! ## Features
//!
//! - **Timed bus transaction**: select-line pulse, conversion wait and 32-bit
//!   readout, over any `embedded-hal` SPI bus, select pin and delay
//! - **Frame decoding**: fault classification and sign-extended thermocouple
//!   and cold-junction temperatures, as pure functions of the raw word
//! - **Sampling pipeline**: periodic producer with a bounded, drop-oldest
//!   handoff to a consumer
//! - **Simulator**: software device with fault injection for host runs and tests
//!
//! ## Quick Start
//!
//! ```rust
//! use thermolink::decoder::{decode, FaultCode};
//! use thermolink::frame::RawFrame;
//!
//! let reading = decode(RawFrame::new(0x064C_6490)).unwrap();
//! assert_eq!(reading.thermocouple_c(), 100.75);
//! assert_eq!(reading.cold_junction_c(), 100.5625);
//!
//! assert_eq!(decode(RawFrame::new(0)), Err(FaultCode::ReadFailure));
//! ```
//!
//! ## Architecture
//!
//! - [`transactor`] - bus session and the timed acquisition cycle
//! - [`frame`] - raw frame and its bit-field layout
//! - [`decoder`] - fault classification and temperature conversion
//! - [`sampler`] - periodic producer
//! - [`handoff`] - producer-to-consumer channel
//! - [`config`] - bus and sampler configuration
//! - [`simulator`] - software MAX31855

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod clock;
pub mod config;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod handoff;
pub mod sampler;
pub mod simulator;
pub mod transactor;

// Re-export main public types for convenience
pub use config::{BusConfig, Config, SamplerConfig};
pub use decoder::{decode, FaultCode, TemperatureReading};
pub use error::{BusError, ConfigError, InitError};
pub use frame::RawFrame;
pub use sampler::{Sample, Sampler};
pub use transactor::{BusSession, FrameSource};
