use crate::arbiter::DeviceId;

/// Possible errors from the DHT11 driver.
///
/// Timing and checksum problems are not errors: they are reported through
/// [`SensorResult::valid`](crate::SensorResult::valid) and
/// [`SensorResult::errors`](crate::SensorResult::errors).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq)]
pub enum DhtError<E> {
    /// Timed out waiting for the sensor to acknowledge a blocking read.
    Timeout,
    /// The arbiter queue is full. The request was not admitted; retry later.
    QueueFull,
    /// The active device was not among the devices handed to the arbiter.
    UnknownDevice(DeviceId),
    /// Error from the GPIO pin (input/output).
    PinError(E),
}

impl<E> From<E> for DhtError<E> {
    fn from(value: E) -> Self {
        Self::PinError(value)
    }
}
