//! Software MAX31855 that plugs into a [`BusSession`](crate::transactor::BusSession)
//! through the same embedded-hal traits as real hardware.
//!
//! The model follows the device's select-line behaviour: releasing select
//! starts a conversion, asserting it latches the last completed conversion
//! (or keeps the previous result if the conversion had not finished) and
//! enables the data output.

use crate::frame::{RawFrame, OPEN_CIRCUIT_BIT, SHORT_TO_GND_BIT, SHORT_TO_VCC_BIT};
use crate::transactor::{CONVERSION_TIME_MS, MODE};
use core::convert::Infallible;
use core::str::FromStr;
use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;
use embedded_hal::spi::{Mode, MODE_0};
use heapless::Deque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

const MAX_QUEUED_FAULTS: usize = 8;
const CONVERSION_TIME: Duration = Duration::from_millis(CONVERSION_TIME_MS as u64);

/// Conditions the simulated probe can be put into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFault {
    OpenCircuit,
    ShortToGnd,
    ShortToVcc,
    /// Fault flag without a class bit.
    Unclassified,
    /// Data line never driven: every bit reads zero.
    NoResponse,
    /// The SPI transfer itself fails.
    BusFailure,
}

impl FromStr for InjectedFault {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(InjectedFault::OpenCircuit),
            "gnd" => Ok(InjectedFault::ShortToGnd),
            "vcc" => Ok(InjectedFault::ShortToVcc),
            "unknown" => Ok(InjectedFault::Unclassified),
            "no-response" => Ok(InjectedFault::NoResponse),
            "bus" => Ok(InjectedFault::BusFailure),
            other => Err(format!("unknown fault kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("transfer attempted while the device was not selected")]
    NotSelected,
    #[error("injected bus failure")]
    BusFailure,
    #[error("bus clocked in {0:?}; the device shifts out in mode 1")]
    WrongMode(Mode),
}

#[derive(Debug)]
struct DeviceState {
    thermocouple_c: f32,
    cold_junction_c: f32,
    fault: Option<InjectedFault>,
    queued: Deque<InjectedFault, MAX_QUEUED_FAULTS>,
    selected: bool,
    conversion_started: Option<Instant>,
    latched: RawFrame,
    latched_from_queue: bool,
    failing_transfer: bool,
    frames_served: u32,
}

impl DeviceState {
    fn select(&mut self) {
        if self.selected {
            return;
        }
        self.selected = true;

        let completed = self
            .conversion_started
            .take()
            .is_some_and(|started| started.elapsed() >= CONVERSION_TIME);
        if completed {
            self.latch();
        } else {
            debug!("select asserted mid-conversion; output keeps previous result");
        }
    }

    fn deselect(&mut self) {
        if !self.selected {
            return;
        }
        self.selected = false;
        self.conversion_started = Some(Instant::now());
    }

    fn latch(&mut self) {
        // A queued fault stays queued until a frame carrying it is shifted out.
        let (fault, from_queue) = match self.queued.front() {
            Some(fault) => (Some(*fault), true),
            None => (self.fault, false),
        };
        self.latched_from_queue = from_queue;
        self.failing_transfer = false;

        let frame = RawFrame::encode(self.thermocouple_c, self.cold_junction_c);

        self.latched = match fault {
            None => frame,
            Some(InjectedFault::OpenCircuit) => frame.with_fault_bits(1 << OPEN_CIRCUIT_BIT),
            Some(InjectedFault::ShortToGnd) => frame.with_fault_bits(1 << SHORT_TO_GND_BIT),
            Some(InjectedFault::ShortToVcc) => frame.with_fault_bits(1 << SHORT_TO_VCC_BIT),
            Some(InjectedFault::Unclassified) => frame.with_fault_bits(0),
            Some(InjectedFault::NoResponse) => RawFrame::new(0),
            Some(InjectedFault::BusFailure) => {
                self.failing_transfer = true;
                return;
            }
        };
    }

    fn shift_out(&mut self, words: &mut [u8]) -> Result<(), SimError> {
        if !self.selected {
            return Err(SimError::NotSelected);
        }
        if self.latched_from_queue {
            self.queued.pop_front();
            self.latched_from_queue = false;
        }
        if self.failing_transfer {
            self.failing_transfer = false;
            return Err(SimError::BusFailure);
        }

        let bytes = self.latched.value().to_be_bytes();
        for (i, word) in words.iter_mut().enumerate() {
            *word = bytes.get(i).copied().unwrap_or(0);
        }
        self.frames_served = self.frames_served.wrapping_add(1);
        Ok(())
    }
}

type Shared = Arc<Mutex<DeviceState>>;

fn lock(state: &Shared) -> MutexGuard<'_, DeviceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build a simulated device reading the given temperatures.
///
/// The device starts deselected with a conversion already running. Like a
/// freshly built peripheral, the bus starts in mode 0 and has to be set to
/// [`MODE`] with [`SimSpi::set_mode`] before frames can be read.
pub fn simulated_max31855(thermocouple_c: f32, cold_junction_c: f32) -> (ProbeHandle, SimSpi, SimChipSelect) {
    let state = Arc::new(Mutex::new(DeviceState {
        thermocouple_c,
        cold_junction_c,
        fault: None,
        queued: Deque::new(),
        selected: false,
        conversion_started: Some(Instant::now()),
        latched: RawFrame::default(),
        latched_from_queue: false,
        failing_transfer: false,
        frames_served: 0,
    }));

    (
        ProbeHandle { state: Arc::clone(&state) },
        SimSpi { state: Arc::clone(&state), mode: MODE_0 },
        SimChipSelect { state },
    )
}

/// Test-bench side of the simulator: sets what the probe "measures".
#[derive(Debug, Clone)]
pub struct ProbeHandle {
    state: Shared,
}

impl ProbeHandle {
    pub fn set_thermocouple(&self, celsius: f32) {
        lock(&self.state).thermocouple_c = celsius;
    }

    pub fn set_cold_junction(&self, celsius: f32) {
        lock(&self.state).cold_junction_c = celsius;
    }

    /// Persistent fault, applied to every conversion until cleared with `None`.
    pub fn set_fault(&self, fault: Option<InjectedFault>) {
        lock(&self.state).fault = fault;
    }

    /// One-shot fault for the next conversion, ahead of any persistent one.
    /// Hands the fault back if the queue is full.
    pub fn queue_fault(&self, fault: InjectedFault) -> Result<(), InjectedFault> {
        lock(&self.state).queued.push_back(fault)
    }

    pub fn frames_served(&self) -> u32 {
        lock(&self.state).frames_served
    }

    /// Frame the device would shift out right now.
    pub fn latched_frame(&self) -> RawFrame {
        lock(&self.state).latched
    }
}

#[derive(Debug)]
pub struct SimSpi {
    state: Shared,
    mode: Mode,
}

impl SimSpi {
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

impl Transfer<u8> for SimSpi {
    type Error = SimError;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
        if self.mode != MODE {
            return Err(SimError::WrongMode(self.mode));
        }
        lock(&self.state).shift_out(words)?;
        Ok(words)
    }
}

#[derive(Debug)]
pub struct SimChipSelect {
    state: Shared,
}

impl OutputPin for SimChipSelect {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        lock(&self.state).select();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        lock(&self.state).deselect();
        Ok(())
    }
}
