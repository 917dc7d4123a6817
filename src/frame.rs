//! Raw 32-bit MAX31855 frame and its bit-field layout.
//!
//! The device shifts out one 32-bit word per conversion, MSB first:
//!
//! ```text
//!  31  30........18  17  16  15  14........4  3   2   1   0
//! [TS][ thermocouple][ID][F ][CS][cold junct.][ID][SCV][SCG][OC]
//! ```
//!
//! Every field is read through [`BitField`], so the masks and shifts for the
//! layout live in this module only.

use core::fmt::{self, Write};
use heapless::String;
use serde::Serialize;
use static_assertions::const_assert;

/// A contiguous run of bits inside a 32-bit word, addressed by its lowest bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub lsb: u8,
    pub width: u8,
}

impl BitField {
    pub const fn new(lsb: u8, width: u8) -> Self {
        Self { lsb, width }
    }

    /// Zero-based mask covering `width` bits.
    pub const fn mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    /// Isolate the field and shift it down to bit 0.
    pub const fn extract(&self, word: u32) -> u32 {
        (word >> self.lsb) & self.mask()
    }

    /// Inverse of [`BitField::extract`]: truncate `value` to the field width and move it into place.
    pub const fn place(&self, value: u32) -> u32 {
        (value & self.mask()) << self.lsb
    }
}

pub const THERMOCOUPLE_SIGN_BIT: u8 = 31;
pub const THERMOCOUPLE_MAGNITUDE: BitField = BitField::new(18, 13);
pub const FAULT_FLAG_BIT: u8 = 16;
pub const COLD_JUNCTION_SIGN_BIT: u8 = 15;
pub const COLD_JUNCTION_MAGNITUDE: BitField = BitField::new(4, 11);
pub const FAULT_BITS: BitField = BitField::new(0, 3);

pub const SHORT_TO_VCC_BIT: u8 = 2;
pub const SHORT_TO_GND_BIT: u8 = 1;
pub const OPEN_CIRCUIT_BIT: u8 = 0;

/// Degrees Celsius per thermocouple LSB.
pub const THERMOCOUPLE_RESOLUTION_C: f32 = 0.25;
/// Degrees Celsius per cold-junction LSB.
pub const COLD_JUNCTION_RESOLUTION_C: f32 = 0.0625;

// Magnitudes are sign-extended inside a 16-bit word, and each sign bit sits
// directly above its magnitude.
const_assert!(THERMOCOUPLE_MAGNITUDE.width < 16);
const_assert!(COLD_JUNCTION_MAGNITUDE.width < 16);
const_assert!(THERMOCOUPLE_MAGNITUDE.lsb + THERMOCOUPLE_MAGNITUDE.width == THERMOCOUPLE_SIGN_BIT);
const_assert!(COLD_JUNCTION_MAGNITUDE.lsb + COLD_JUNCTION_MAGNITUDE.width == COLD_JUNCTION_SIGN_BIT);

/// Length of [`RawFrame::bit_pattern`]: 32 digits plus three separators.
pub const BIT_PATTERN_LEN: usize = 35;

/// One 32-bit word as clocked out of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct RawFrame(u32);

impl RawFrame {
    /// Bytes clocked per transaction.
    pub const LEN: usize = 4;

    pub const fn new(word: u32) -> Self {
        Self(word)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Concatenate received bytes, first byte on the wire being the most significant.
    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
    }

    pub const fn bit(self, position: u8) -> bool {
        (self.0 >> position) & 1 == 1
    }

    pub const fn field(self, field: BitField) -> u32 {
        field.extract(self.0)
    }

    /// An all-zero word: nothing drove the data line.
    pub const fn is_blank(self) -> bool {
        self.0 == 0
    }

    pub const fn fault_flag(self) -> bool {
        self.bit(FAULT_FLAG_BIT)
    }

    /// D16 and D2..D0 packed into four bits (`D16 << 3 | D2 D1 D0`).
    pub const fn fault_nibble(self) -> u8 {
        let flag = if self.fault_flag() { 1u8 << 3 } else { 0 };
        flag | FAULT_BITS.extract(self.0) as u8
    }

    /// Byte-grouped binary rendering, e.g. `00000110 01001100 01100100 10010000`.
    pub fn bit_pattern(self) -> String<BIT_PATTERN_LEN> {
        let mut out = String::new();
        for (i, byte) in self.0.to_be_bytes().iter().enumerate() {
            if i > 0 {
                let _ = out.push(' ');
            }
            let _ = write!(out, "{byte:08b}");
        }
        out
    }

    /// Build the frame the device would emit for the given temperatures.
    ///
    /// Values are rounded to the nearest LSB and clamped to what each field can
    /// represent. Fault bits are left clear; see [`RawFrame::with_fault_bits`].
    pub fn encode(thermocouple_c: f32, cold_junction_c: f32) -> Self {
        let (tc_negative, tc_magnitude) =
            encode_field(thermocouple_c, THERMOCOUPLE_MAGNITUDE, THERMOCOUPLE_RESOLUTION_C);
        let (cj_negative, cj_magnitude) =
            encode_field(cold_junction_c, COLD_JUNCTION_MAGNITUDE, COLD_JUNCTION_RESOLUTION_C);

        let mut word = THERMOCOUPLE_MAGNITUDE.place(tc_magnitude) | COLD_JUNCTION_MAGNITUDE.place(cj_magnitude);
        if tc_negative {
            word |= 1 << THERMOCOUPLE_SIGN_BIT;
        }
        if cj_negative {
            word |= 1 << COLD_JUNCTION_SIGN_BIT;
        }
        Self(word)
    }

    /// Raise the fault flag and replace D2..D0 with `bits`.
    pub const fn with_fault_bits(self, bits: u8) -> Self {
        let cleared = self.0 & !FAULT_BITS.place(u32::MAX);
        Self(cleared | (1 << FAULT_FLAG_BIT) | FAULT_BITS.place(bits as u32))
    }
}

fn encode_field(celsius: f32, field: BitField, resolution: f32) -> (bool, u32) {
    // A W-bit magnitude plus its sign bit holds -2^W..2^W-1 counts.
    let limit = 1i32 << field.width;
    let counts = ((celsius / resolution).round() as i32).clamp(-limit, limit - 1);
    (counts < 0, (counts as u32) & field.mask())
}

impl From<u32> for RawFrame {
    fn from(word: u32) -> Self {
        Self(word)
    }
}

impl From<RawFrame> for u32 {
    fn from(frame: RawFrame) -> Self {
        frame.0
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
