use crate::error::ConfigError;
use crate::transactor::CONVERSION_TIME_MS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Highest SPI clock the device tolerates.
pub const MAX_CLOCK_HZ: u32 = 5_000_000;
const DEFAULT_CLOCK_HZ: u32 = 1_000_000;

const DEFAULT_MISO_PIN: u8 = 12;
const DEFAULT_SCLK_PIN: u8 = 14;
const DEFAULT_CS_PIN: u8 = 15;

const DEFAULT_INTERVAL_MS: u32 = CONVERSION_TIME_MS;
const DEFAULT_CHANNEL_CAPACITY: usize = 5;
const DEFAULT_RECEIVE_TIMEOUT_MS: u32 = 2000;
const DEFAULT_CONSUMER_PAUSE_MS: u32 = 500;

/// Board wiring. The device never receives data, so there is no MOSI pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinAssignment {
    pub miso: u8,
    pub sclk: u8,
    pub cs: u8,
}

impl Default for PinAssignment {
    fn default() -> Self {
        Self {
            miso: DEFAULT_MISO_PIN,
            sclk: DEFAULT_SCLK_PIN,
            cs: DEFAULT_CS_PIN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub clock_hz: u32,
    pub pins: PinAssignment,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            clock_hz: DEFAULT_CLOCK_HZ,
            pins: PinAssignment::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Time between the starts of two acquisition cycles.
    pub interval_ms: u32,
    /// Most samples left waiting for the consumer; older ones are dropped.
    pub channel_capacity: usize,
    /// How long the consumer waits for a sample before idling.
    pub receive_timeout_ms: u32,
    /// Consumer pause after each received sample.
    pub consumer_pause_ms: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            consumer_pause_ms: DEFAULT_CONSUMER_PAUSE_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bus: BusConfig,
    pub sampler: SamplerConfig,
}

impl Config {
    /// Parse and validate a JSON document. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.clock_hz == 0 || self.bus.clock_hz > MAX_CLOCK_HZ {
            return Err(ConfigError::ClockOutOfRange(self.bus.clock_hz));
        }
        if self.sampler.interval_ms < CONVERSION_TIME_MS {
            return Err(ConfigError::IntervalTooShort(self.sampler.interval_ms, CONVERSION_TIME_MS));
        }
        if self.sampler.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.sampler.receive_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
