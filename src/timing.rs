//! Protocol timing: constants, pulse-width windows and the time source.

/// Duration (in milliseconds) the host holds the line low to wake the sensor.
pub const START_LOW_MS: u32 = 18;

/// Duration (in microseconds) the host drives the line high after the start
/// pulse before handing it over to the sensor (blocking reads).
pub const RELEASE_US: u32 = 30;

/// Maximum time to wait (in microseconds) for each acknowledgement edge.
///
/// Used to detect a missing or unpowered sensor in blocking reads.
pub const ACK_TIMEOUT_US: u32 = 100;

/// Maximum time to wait (in microseconds) between two data edges before a
/// blocking capture gives up on the rest of the frame.
pub const EDGE_TIMEOUT_US: u32 = 100;

/// Number of acknowledgement edges (80us low, 80us high) preceding the data.
pub const HANDSHAKE_EDGES: u8 = 2;

/// Number of data bits in one transmission: 4 payload bytes and a checksum.
pub const BITS: usize = 40;

/// Number of edges captured per transmission.
///
/// The falling edge opening the first bit, two edges per bit, and the rising
/// edge closing the end-of-frame low pulse.
pub const CAPTURE_LEN: usize = 2 * BITS + 2;

/// A source of free-running microsecond timestamps.
///
/// Timestamps are monotonic and wrap around at `u32::MAX`. Implementations
/// must be callable from interrupt context without blocking.
pub trait TimeSource {
    /// Returns the current time in microseconds.
    fn now_micros(&self) -> u32;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now_micros(&self) -> u32 {
        (**self).now_micros()
    }
}

/// Nominal pulse-width range, in microseconds.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    /// Shortest nominal width.
    pub low: u32,
    /// Longest nominal width.
    pub high: u32,
}

impl Window {
    /// Returns `true` if `width` lies in the window widened by `margin` on
    /// both sides. Both bounds are inclusive.
    pub fn contains(&self, width: u32, margin: u32) -> bool {
        let low = self.low.saturating_sub(margin);
        let high = self.high.saturating_add(margin);
        (low..=high).contains(&width)
    }
}

/// Pulse-width classification used by the decoder.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// High-pulse width encoding a `0` bit.
    pub zero: Window,
    /// High-pulse width encoding a `1` bit.
    pub one: Window,
    /// Tolerance added to both sides of each window.
    pub margin: u32,
}

impl Timing {
    /// Default windows with a custom tolerance margin.
    pub const fn with_margin(margin: u32) -> Self {
        Timing {
            zero: Window { low: 26, high: 28 },
            one: Window { low: 64, high: 76 },
            margin,
        }
    }

    /// Classifies a bit-value pulse width.
    ///
    /// The zero window is checked first, so a width inside both (only
    /// possible with an oversized margin) is a `0`. Returns `None` for a
    /// width in neither window.
    pub fn classify(&self, width: u32) -> Option<bool> {
        if self.zero.contains(width, self.margin) {
            Some(false)
        } else if self.one.contains(width, self.margin) {
            Some(true)
        } else {
            None
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::with_margin(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_default() {
        let timing = Timing::default();

        assert_eq!(timing.classify(27), Some(false));
        assert_eq!(timing.classify(16), Some(false));
        assert_eq!(timing.classify(38), Some(false));
        assert_eq!(timing.classify(70), Some(true));
        assert_eq!(timing.classify(54), Some(true));
        assert_eq!(timing.classify(86), Some(true));

        assert_eq!(timing.classify(15), None);
        assert_eq!(timing.classify(45), None);
        assert_eq!(timing.classify(87), None);
    }

    #[test]
    fn test_overlapping_windows_prefer_zero() {
        // zero: 0..=58, one: 34..=106
        let timing = Timing::with_margin(30);

        assert_eq!(timing.classify(40), Some(false));
        assert_eq!(timing.classify(58), Some(false));
        assert_eq!(timing.classify(59), Some(true));
    }

    #[test]
    fn test_window_saturates() {
        let window = Window { low: 2, high: u32::MAX - 1 };

        assert!(window.contains(0, 5));
        assert!(window.contains(u32::MAX, 5));
    }
}
