//! Error types for session setup, bus transactions and configuration.
//!
//! Device-reported sensor faults are not errors; they are decoded into
//! [`crate::decoder::FaultCode`] and travel with the data.

use thiserror::Error;

/// Which half of the acquisition cycle a bus failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Select-line pulse that aborts and restarts a conversion.
    Trigger,
    /// Select assertion and 32-bit clock-out.
    Readout,
}

impl core::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CyclePhase::Trigger => write!(f, "trigger"),
            CyclePhase::Readout => write!(f, "readout"),
        }
    }
}

/// Fatal at startup: the session could not be brought up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("chip-select line could not be driven to its idle level")]
    ChipSelect,
    #[error("bus clock must be non-zero")]
    ZeroClock,
    #[error("bus clock {0} Hz exceeds the device maximum of 5 MHz")]
    ClockTooFast(u32),
}

/// A single acquisition cycle failed; the next scheduled cycle is the retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("chip-select transition failed during {0}")]
    ChipSelect(CyclePhase),
    #[error("SPI transfer failed")]
    Transfer,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bus clock {0} Hz is outside 1..=5000000")]
    ClockOutOfRange(u32),
    #[error("sample interval {0} ms is below the {1} ms conversion time")]
    IntervalTooShort(u32, u32),
    #[error("handoff channel capacity must be at least 1")]
    ZeroCapacity,
    #[error("receive timeout must be non-zero")]
    ZeroTimeout,
}
