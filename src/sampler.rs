use crate::decoder::{decode, FaultCode, TemperatureReading};
use crate::error::BusError;
use crate::frame::RawFrame;
use crate::handoff::SampleSender;
use crate::transactor::{FrameSource, CONVERSION_TIME_MS};
use embedded_hal::blocking::delay::DelayMs;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Outcome of one acquisition cycle, as handed to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sample {
    Reading(TemperatureReading),
    Fault { code: FaultCode, frame: RawFrame },
}

impl Sample {
    pub fn from_frame(frame: RawFrame) -> Self {
        match decode(frame) {
            Ok(reading) => Sample::Reading(reading),
            Err(code) => Sample::Fault { code, frame },
        }
    }

    pub fn fault_code(&self) -> FaultCode {
        match self {
            Sample::Reading(reading) => reading.fault(),
            Sample::Fault { code, .. } => *code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SamplerStats {
    pub cycles: u64,
    pub readings: u64,
    pub faults: u64,
    pub bus_errors: u64,
    /// Samples published while no consumer was attached.
    pub undelivered: u64,
}

/// Periodic producer: one trigger/read/decode per cycle.
pub struct Sampler<S, D> {
    source: S,
    delay: D,
    interval_ms: u32,
    idle_ms: u32,
    stats: SamplerStats,
}

impl<S, D> Sampler<S, D>
where
    S: FrameSource,
    D: DelayMs<u32>,
{
    /// `interval_ms` is the cycle period; the conversion wait inside each
    /// successful cycle already accounts for [`CONVERSION_TIME_MS`] of it.
    pub fn new(source: S, delay: D, interval_ms: u32) -> Self {
        Self {
            source,
            delay,
            interval_ms,
            idle_ms: interval_ms.saturating_sub(CONVERSION_TIME_MS),
            stats: SamplerStats::default(),
        }
    }

    pub fn cycle(&mut self) -> Result<Sample, BusError> {
        self.stats.cycles += 1;

        let frame = match self.source.trigger_and_read() {
            Ok(frame) => frame,
            Err(error) => {
                self.stats.bus_errors += 1;
                return Err(error);
            }
        };

        let sample = Sample::from_frame(frame);
        match &sample {
            Sample::Reading(_) => self.stats.readings += 1,
            Sample::Fault { code, frame } => {
                self.stats.faults += 1;
                warn!(fault = %code, frame = %frame, nibble = frame.fault_nibble(), "sensor fault reported");
            }
        }
        Ok(sample)
    }

    /// Sample until `running` is cleared or `max_cycles` cycles have run.
    ///
    /// Bus errors are logged and counted; the loop carries on with the next
    /// cycle. A failed cycle may have ended before its conversion wait, so the
    /// next one is held off for the whole interval.
    pub fn run(&mut self, sender: &SampleSender, running: &AtomicBool, max_cycles: Option<u64>) -> SamplerStats {
        let mut completed = 0u64;
        let mut hold_off_ms = 0u32;

        loop {
            if !running.load(Ordering::Relaxed) || max_cycles.is_some_and(|max| completed >= max) {
                break;
            }
            if hold_off_ms > 0 {
                self.delay.delay_ms(hold_off_ms);
                if !running.load(Ordering::Relaxed) {
                    break;
                }
            }

            hold_off_ms = match self.cycle() {
                Ok(sample) => {
                    if !sender.publish(sample) {
                        self.stats.undelivered += 1;
                        debug!("no consumer attached; sample discarded");
                    }
                    self.idle_ms
                }
                Err(error) => {
                    warn!(%error, retry_in_ms = self.interval_ms, "acquisition cycle failed");
                    self.interval_ms
                }
            };
            completed += 1;
        }

        self.stats
    }

    pub fn stats(&self) -> &SamplerStats {
        &self.stats
    }

    pub fn into_source(self) -> S {
        self.source
    }
}
