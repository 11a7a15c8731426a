//! Decoding of captured edge timestamps into sensor data.
//!
//! Each bit on the wire is a ~50us low "bit-start" pulse followed by a high
//! "bit-value" pulse whose width encodes the bit. The decoder only looks at
//! timestamps, it never touches hardware.

use crate::timing::{BITS, Timing};

/// Data decoded from one transmission.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SensorResult {
    /// Payload bytes: humidity integral/decimal, temperature integral/decimal.
    pub data: [u8; 4],
    /// Checksum byte as transmitted by the sensor.
    pub checksum: u8,
    /// `true` if every bit was classified and the checksum matches.
    pub valid: bool,
    /// Number of bits whose pulse width matched neither window, or that were
    /// missing from the capture.
    pub errors: u8,
}

impl SensorResult {
    /// Raw relative humidity bytes as `(integral, decimal)`.
    pub fn humidity(&self) -> (u8, u8) {
        (self.data[0], self.data[1])
    }

    /// Raw temperature bytes as `(integral, decimal)`.
    pub fn temperature(&self) -> (u8, u8) {
        (self.data[2], self.data[3])
    }
}

/// Sum of the payload bytes, truncated to one byte.
pub fn checksum(data: &[u8; 4]) -> u8 {
    data.iter().fold(0u8, |sum, v| sum.wrapping_add(*v))
}

/// Decodes a sequence of edge timestamps.
///
/// `edges[0]` is the falling edge opening the first bit-start pulse. Bit `k`
/// is carried by the interval `edges[2k + 1]..edges[2k + 2]`. Bits missing
/// from a short capture, and bits whose width fits neither window, are left
/// clear and counted in [`SensorResult::errors`]. Timestamps may wrap.
pub fn decode(edges: &[u32], timing: &Timing) -> SensorResult {
    let mut bits: u64 = 0;
    let mut errors: u8 = 0;

    for k in 0..BITS {
        let (Some(rise), Some(fall)) = (edges.get(2 * k + 1), edges.get(2 * k + 2)) else {
            errors += 1;
            continue;
        };

        match timing.classify(fall.wrapping_sub(*rise)) {
            Some(true) => bits |= 1 << (BITS - 1 - k),
            Some(false) => {}
            None => errors += 1,
        }
    }

    let [_, _, _, d0, d1, d2, d3, checksum_byte] = bits.to_be_bytes();
    let data = [d0, d1, d2, d3];

    SensorResult {
        data,
        checksum: checksum_byte,
        valid: errors == 0 && checksum(&data) == checksum_byte,
        errors,
    }
}
