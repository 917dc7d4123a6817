//! Timed SPI transaction that starts a conversion and clocks out one frame.
//!
//! The device converts continuously while its select line is high. Pulling
//! select low aborts the conversion in flight and releasing it starts a fresh
//! one; the result is only valid [`CONVERSION_TIME_MS`] later. A full cycle is
//! therefore: pulse select, wait out the conversion, select again and read
//! 32 bits.

use crate::config::{BusConfig, MAX_CLOCK_HZ};
use crate::error::{BusError, CyclePhase, InitError};
use crate::frame::RawFrame;
use embedded_hal::blocking::delay::{DelayMs, DelayUs};
use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;
use embedded_hal::spi::{Mode, MODE_1};
use tracing::{debug, info, trace};

/// Wait after power-up before the first conversion can be trusted.
pub const POWER_UP_TIME_MS: u32 = 200;
/// Conversion latency; caps the sample rate at roughly 10 Hz.
pub const CONVERSION_TIME_MS: u32 = 100;
/// Minimum select-low pulse that aborts and restarts a conversion.
pub const TRIGGER_PULSE_US: u32 = 1;

/// SPI mode the bus must be configured with: clock idles low, the device
/// shifts data out after the rising edge and it is sampled on the falling one.
/// The session cannot check this itself; whoever builds the SPI peripheral
/// passes it in.
pub const MODE: Mode = MODE_1;

/// Anything that can produce one fresh frame per call.
pub trait FrameSource {
    fn trigger_and_read(&mut self) -> Result<RawFrame, BusError>;
}

/// Exclusive ownership of the bus, the select line and the delay provider for
/// as long as the session lives.
pub struct BusSession<SPI, CS, D> {
    spi: SPI,
    cs: CS,
    delay: D,
    config: BusConfig,
}

impl<SPI, CS, D> BusSession<SPI, CS, D>
where
    SPI: Transfer<u8>,
    CS: OutputPin,
    D: DelayMs<u32> + DelayUs<u32>,
{
    /// Take over an already configured SPI peripheral (read-only, [`MODE`]),
    /// park the select line at its idle level and wait out the power-up time.
    pub fn initialize(spi: SPI, mut cs: CS, mut delay: D, config: &BusConfig) -> Result<Self, InitError> {
        if config.clock_hz == 0 {
            return Err(InitError::ZeroClock);
        }
        if config.clock_hz > MAX_CLOCK_HZ {
            return Err(InitError::ClockTooFast(config.clock_hz));
        }

        cs.set_high().map_err(|_| InitError::ChipSelect)?;
        delay.delay_ms(POWER_UP_TIME_MS);

        info!(
            clock_hz = config.clock_hz,
            mode = ?MODE,
            miso = config.pins.miso,
            sclk = config.pins.sclk,
            cs = config.pins.cs,
            "thermocouple bus session ready"
        );

        Ok(Self {
            spi,
            cs,
            delay,
            config: *config,
        })
    }

    /// Run one full acquisition cycle and return the frame it produced.
    ///
    /// Blocks for the conversion time; a bus failure in either phase is
    /// returned as is, without retrying.
    pub fn trigger_and_read(&mut self) -> Result<RawFrame, BusError> {
        self.trigger()?;
        self.delay.delay_ms(CONVERSION_TIME_MS);
        let frame = self.read_frame()?;

        debug!(frame = %frame, "frame received");
        trace!(bits = %frame.bit_pattern(), "frame bits");
        Ok(frame)
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// End the session and hand the peripherals back.
    pub fn release(self) -> (SPI, CS, D) {
        (self.spi, self.cs, self.delay)
    }

    fn trigger(&mut self) -> Result<(), BusError> {
        let phase_error = |_| BusError::ChipSelect(CyclePhase::Trigger);
        self.cs.set_low().map_err(phase_error)?;
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.cs.set_high().map_err(phase_error)
    }

    fn read_frame(&mut self) -> Result<RawFrame, BusError> {
        self.cs
            .set_low()
            .map_err(|_| BusError::ChipSelect(CyclePhase::Readout))?;

        // Outgoing bytes are don't-care; the device has no data input.
        let mut buffer = [0u8; RawFrame::LEN];
        let transfer = self.spi.transfer(&mut buffer).map(|_| ());

        // Deselect even when the transfer failed so the next cycle starts clean.
        let release = self.cs.set_high();
        transfer.map_err(|_| BusError::Transfer)?;
        release.map_err(|_| BusError::ChipSelect(CyclePhase::Readout))?;

        Ok(RawFrame::from_bytes(buffer))
    }
}

impl<SPI, CS, D> FrameSource for BusSession<SPI, CS, D>
where
    SPI: Transfer<u8>,
    CS: OutputPin,
    D: DelayMs<u32> + DelayUs<u32>,
{
    fn trigger_and_read(&mut self) -> Result<RawFrame, BusError> {
        BusSession::trigger_and_read(self)
    }
}
