//! Frame decoding: fault classification and temperature conversion.
//!
//! Everything here is a pure function of the [`RawFrame`]; nothing touches the
//! bus, so the whole module is testable from literal frames.

use crate::frame::{
    BitField, RawFrame, COLD_JUNCTION_MAGNITUDE, COLD_JUNCTION_RESOLUTION_C, COLD_JUNCTION_SIGN_BIT,
    OPEN_CIRCUIT_BIT, SHORT_TO_GND_BIT, SHORT_TO_VCC_BIT, THERMOCOUPLE_MAGNITUDE, THERMOCOUPLE_RESOLUTION_C,
    THERMOCOUPLE_SIGN_BIT,
};
use serde::Serialize;

/// Sensor condition reported by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FaultCode {
    Ok,
    ShortToVcc,
    ShortToGnd,
    OpenCircuit,
    /// Fault flag raised without any of the three class bits.
    Unknown,
    /// All-zero frame: the device did not drive the data line.
    ReadFailure,
}

impl FaultCode {
    pub const fn is_ok(self) -> bool {
        matches!(self, FaultCode::Ok)
    }

    /// Numeric code, stable across releases (0 = ok).
    pub const fn code(self) -> u8 {
        match self {
            FaultCode::Ok => 0,
            FaultCode::ShortToVcc => 1,
            FaultCode::ShortToGnd => 2,
            FaultCode::OpenCircuit => 3,
            FaultCode::Unknown => 4,
            FaultCode::ReadFailure => 5,
        }
    }
}

impl core::fmt::Display for FaultCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FaultCode::Ok => write!(f, "ok"),
            FaultCode::ShortToVcc => write!(f, "thermocouple shorted to VCC"),
            FaultCode::ShortToGnd => write!(f, "thermocouple shorted to GND"),
            FaultCode::OpenCircuit => write!(f, "thermocouple open circuit"),
            FaultCode::Unknown => write!(f, "unclassified fault"),
            FaultCode::ReadFailure => write!(f, "no response from device"),
        }
    }
}

/// One decoded conversion. Fahrenheit values are always derived from the
/// Celsius ones via [`celsius_to_fahrenheit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureReading {
    thermocouple_c: f32,
    thermocouple_f: f32,
    cold_junction_c: f32,
    cold_junction_f: f32,
    fault: FaultCode,
}

impl TemperatureReading {
    pub fn from_celsius(thermocouple_c: f32, cold_junction_c: f32) -> Self {
        Self {
            thermocouple_c,
            thermocouple_f: celsius_to_fahrenheit(thermocouple_c),
            cold_junction_c,
            cold_junction_f: celsius_to_fahrenheit(cold_junction_c),
            fault: FaultCode::Ok,
        }
    }

    pub fn thermocouple_c(&self) -> f32 {
        self.thermocouple_c
    }

    pub fn thermocouple_f(&self) -> f32 {
        self.thermocouple_f
    }

    pub fn cold_junction_c(&self) -> f32 {
        self.cold_junction_c
    }

    pub fn cold_junction_f(&self) -> f32 {
        self.cold_junction_f
    }

    pub fn fault(&self) -> FaultCode {
        self.fault
    }
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    1.8 * celsius + 32.0
}

/// Classify a frame. A blank frame wins over everything, then the fault flag
/// with its class bits checked in VCC, GND, open-circuit order.
pub fn classify(frame: RawFrame) -> FaultCode {
    if frame.is_blank() {
        return FaultCode::ReadFailure;
    }
    if !frame.fault_flag() {
        return FaultCode::Ok;
    }

    if frame.bit(SHORT_TO_VCC_BIT) {
        FaultCode::ShortToVcc
    } else if frame.bit(SHORT_TO_GND_BIT) {
        FaultCode::ShortToGnd
    } else if frame.bit(OPEN_CIRCUIT_BIT) {
        FaultCode::OpenCircuit
    } else {
        FaultCode::Unknown
    }
}

/// Convert a `width`-bit magnitude and its sign bit into degrees.
///
/// With the sign bit set the magnitude is the low `width` bits of a negative
/// two's-complement number: it is widened by filling every bit of a 16-bit
/// word above the field with ones and read back as `i16`. With the sign bit
/// clear the magnitude is taken as is.
pub fn signed_from_field(raw: u32, sign_bit: bool, width: u8, resolution: f32) -> f32 {
    debug_assert!(width < 16, "field width {width} does not fit a 16-bit word");

    let magnitude = (raw & BitField::new(0, width).mask()) as u16;
    let word = if sign_bit {
        ((u16::MAX >> width) << width) | magnitude
    } else {
        magnitude
    };
    f32::from(word as i16) * resolution
}

/// Thermocouple temperature carried by `frame`, regardless of its fault bits.
pub fn thermocouple_celsius(frame: RawFrame) -> f32 {
    signed_from_field(
        frame.field(THERMOCOUPLE_MAGNITUDE),
        frame.bit(THERMOCOUPLE_SIGN_BIT),
        THERMOCOUPLE_MAGNITUDE.width,
        THERMOCOUPLE_RESOLUTION_C,
    )
}

/// Cold-junction temperature carried by `frame`, regardless of its fault bits.
pub fn cold_junction_celsius(frame: RawFrame) -> f32 {
    signed_from_field(
        frame.field(COLD_JUNCTION_MAGNITUDE),
        frame.bit(COLD_JUNCTION_SIGN_BIT),
        COLD_JUNCTION_MAGNITUDE.width,
        COLD_JUNCTION_RESOLUTION_C,
    )
}

/// Decode a frame into a reading, or the fault it reports.
///
/// The `Err` side never carries [`FaultCode::Ok`].
pub fn decode(frame: RawFrame) -> Result<TemperatureReading, FaultCode> {
    match classify(frame) {
        FaultCode::Ok => Ok(TemperatureReading::from_celsius(
            thermocouple_celsius(frame),
            cold_junction_celsius(frame),
        )),
        fault => Err(fault),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_ones_negative_field_is_minus_one_lsb() {
        assert_eq!(signed_from_field(0x1FFF, true, 13, 0.25), -0.25);
        assert_eq!(signed_from_field(0x7FF, true, 11, 0.0625), -0.0625);
    }

    #[test]
    fn test_positive_field_is_unchanged() {
        assert_eq!(signed_from_field(0x0001, false, 13, 0.25), 0.25);
        assert_eq!(signed_from_field(0x1FFF, false, 13, 0.25), 2047.75);
        assert_eq!(signed_from_field(0, false, 11, 0.0625), 0.0);
    }

    #[test]
    fn test_most_negative_field() {
        assert_eq!(signed_from_field(0, true, 13, 0.25), -2048.0);
        assert_eq!(signed_from_field(0, true, 11, 0.0625), -128.0);
    }

    #[test]
    fn test_raw_bits_above_width_are_ignored() {
        assert_eq!(signed_from_field(0xFFFF_0001, false, 13, 0.25), 0.25);
    }

    #[test]
    fn test_fault_codes_are_distinct() {
        let codes = [
            FaultCode::Ok,
            FaultCode::ShortToVcc,
            FaultCode::ShortToGnd,
            FaultCode::OpenCircuit,
            FaultCode::Unknown,
            FaultCode::ReadFailure,
        ];
        for (i, code) in codes.iter().enumerate() {
            assert_eq!(code.code() as usize, i);
        }
        assert!(FaultCode::Ok.is_ok());
        assert!(!FaultCode::Unknown.is_ok());
    }
}
