use thermolink::decoder::{
    celsius_to_fahrenheit, classify, cold_junction_celsius, decode, signed_from_field, thermocouple_celsius, FaultCode,
};
use thermolink::frame::{RawFrame, FAULT_FLAG_BIT};

const SAMPLE_POSITIVE: u32 = 0b0000_0110_0100_1100_0110_0100_1001_0000;
const SAMPLE_NEGATIVE: u32 = 0b1111_1111_1111_1100_1111_1111_1111_0000;
const SAMPLE_SHORT_TO_GND: u32 = 0b1111_0000_0110_0001_1100_1001_0000_0010;

/// Deterministic word generator so property-style loops are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 32) as u32
    }
}

#[cfg(test)]
mod reference_vector_tests {
    use super::*;

    #[test]
    fn test_positive_sample_vector() {
        assert_eq!(SAMPLE_POSITIVE, 0x064C_6490);

        let reading = decode(RawFrame::new(SAMPLE_POSITIVE)).expect("sample frame carries no fault");
        assert_eq!(reading.thermocouple_c(), 100.75);
        assert_eq!(reading.cold_junction_c(), 100.5625);
        assert_eq!(reading.fault(), FaultCode::Ok);
    }

    #[test]
    fn test_negative_sample_vector() {
        assert_eq!(SAMPLE_NEGATIVE, 0xFFFC_FFF0);

        let reading = decode(RawFrame::new(SAMPLE_NEGATIVE)).expect("sample frame carries no fault");
        assert_eq!(reading.thermocouple_c(), -0.25);
        assert_eq!(reading.cold_junction_c(), -0.0625);
        assert_eq!(reading.fault(), FaultCode::Ok);
    }

    #[test]
    fn test_fault_sample_vector_still_carries_temperatures() {
        let frame = RawFrame::new(SAMPLE_SHORT_TO_GND);
        assert_eq!(decode(frame), Err(FaultCode::ShortToGnd));
        assert_eq!(thermocouple_celsius(frame), -250.0);
        assert_eq!(cold_junction_celsius(frame), -55.0);
    }

    #[test]
    fn test_sign_extension_vectors() {
        assert_eq!(signed_from_field(0x1FFF, true, 13, 0.25), -0.25);
        assert_eq!(signed_from_field(0x0001, false, 13, 0.25), 0.25);
    }
}

#[cfg(test)]
mod fault_classification_tests {
    use super::*;

    const FAULT: u32 = 1 << FAULT_FLAG_BIT;

    #[test]
    fn test_all_zero_frame_is_read_failure() {
        assert_eq!(classify(RawFrame::new(0)), FaultCode::ReadFailure);
        assert_eq!(decode(RawFrame::new(0)), Err(FaultCode::ReadFailure));
    }

    #[test]
    fn test_fault_class_priority() {
        assert_eq!(classify(RawFrame::new(FAULT | 0b100)), FaultCode::ShortToVcc);
        assert_eq!(classify(RawFrame::new(FAULT | 0b111)), FaultCode::ShortToVcc);
        assert_eq!(classify(RawFrame::new(FAULT | 0b010)), FaultCode::ShortToGnd);
        assert_eq!(classify(RawFrame::new(FAULT | 0b011)), FaultCode::ShortToGnd);
        assert_eq!(classify(RawFrame::new(FAULT | 0b001)), FaultCode::OpenCircuit);
    }

    #[test]
    fn test_fault_flag_without_class_is_unknown() {
        assert_eq!(classify(RawFrame::new(FAULT)), FaultCode::Unknown);
        assert_eq!(decode(RawFrame::new(0x064C_6490 | FAULT)), Err(FaultCode::Unknown));
    }

    #[test]
    fn test_class_bits_without_flag_are_ignored() {
        let frame = RawFrame::new(0x064C_6490 | 0b111);
        assert_eq!(classify(frame), FaultCode::Ok);
        assert_eq!(decode(frame).unwrap().thermocouple_c(), 100.75);
    }

    #[test]
    fn test_random_frames_with_fault_flag_always_fault() {
        let mut rng = Lcg(0x1234_5678_9ABC_DEF0);
        for _ in 0..10_000 {
            let frame = RawFrame::new(rng.next_u32() | FAULT);
            let code = decode(frame).unwrap_err();
            assert_ne!(code, FaultCode::Ok);
            assert_ne!(code, FaultCode::ReadFailure);
        }
    }
}

#[cfg(test)]
mod temperature_tests {
    use super::*;

    #[test]
    fn test_random_frames_without_fault_flag_never_fault() {
        let mut rng = Lcg(42);
        for _ in 0..10_000 {
            let word = rng.next_u32() & !(1 << FAULT_FLAG_BIT);
            if word == 0 {
                continue;
            }
            let frame = RawFrame::new(word);
            let reading = decode(frame).expect("fault flag is clear");
            assert_eq!(reading.thermocouple_c(), thermocouple_celsius(frame));
            assert_eq!(reading.cold_junction_c(), cold_junction_celsius(frame));
            assert!((-2048.0..=2047.75).contains(&reading.thermocouple_c()));
            assert!((-128.0..=127.9375).contains(&reading.cold_junction_c()));
        }
    }

    #[test]
    fn test_fahrenheit_is_derived_exactly() {
        let mut rng = Lcg(7);
        for _ in 0..10_000 {
            let word = rng.next_u32() & !(1 << FAULT_FLAG_BIT);
            let Ok(reading) = decode(RawFrame::new(word)) else {
                continue;
            };
            assert_eq!(reading.thermocouple_f(), 1.8 * reading.thermocouple_c() + 32.0);
            assert_eq!(reading.cold_junction_f(), 1.8 * reading.cold_junction_c() + 32.0);
        }
    }

    #[test]
    fn test_fahrenheit_landmarks() {
        assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert_eq!(celsius_to_fahrenheit(-40.0), -40.0);
    }

    #[test]
    fn test_device_range_round_trips() {
        // Thermocouple -270..1372 °C, cold junction -40..125 °C. Both at zero
        // would encode to the blank frame, which reads as a failure.
        let cases = [
            (-270.0, -40.0),
            (-200.3, -12.34),
            (-0.1, 19.5),
            (0.0, 21.0),
            (24.6, 22.07),
            (700.12, 85.5),
            (1372.0, 125.0),
        ];
        for (thermocouple_c, cold_junction_c) in cases {
            let reading = decode(RawFrame::encode(thermocouple_c, cold_junction_c)).expect("encoded frame has no fault");
            assert!(
                (reading.thermocouple_c() - thermocouple_c).abs() <= 0.25,
                "thermocouple {thermocouple_c} decoded as {}",
                reading.thermocouple_c()
            );
            assert!(
                (reading.cold_junction_c() - cold_junction_c).abs() <= 0.0625,
                "cold junction {cold_junction_c} decoded as {}",
                reading.cold_junction_c()
            );
        }
    }
}
