use embedded_hal::delay::DelayNs;

use crate::arbiter::{Arbiter, DeviceId, Reader};
use crate::capture::{AcquisitionState, Capture};
use crate::codec::{self, SensorResult};
use crate::error::DhtError;
use crate::pin::{Direction, PinDriver};
use crate::timing::{
    ACK_TIMEOUT_US, CAPTURE_LEN, EDGE_TIMEOUT_US, RELEASE_US, START_LOW_MS, TimeSource, Timing,
};

/// One-shot completion callback of a non-blocking read.
pub type Callback<'a> = &'a dyn Fn(DeviceId, SensorResult);

/// Driver for one DHT11 temperature and humidity sensor.
///
/// Reads are either blocking ([`read_blocking`](Self::read_blocking)), which
/// busy-polls the line, or non-blocking
/// ([`read_non_blocking`](Self::read_non_blocking)), which hands the device to
/// an [`Arbiter`] and captures edges from the pin interrupt into the shared
/// [`Capture`].
pub struct Dht11<'a, PIN, D, T> {
    id: DeviceId,
    pin: PIN,
    delay: D,
    timer: T,
    timing: Timing,
    capture: &'a Capture,
    callback: Option<Callback<'a>>,
}

impl<'a, PIN, D, T, E> Dht11<'a, PIN, D, T>
where
    PIN: PinDriver<Error = E>,
    D: DelayNs,
    T: TimeSource,
{
    /// Creates a new instance of the DHT11 driver.
    ///
    /// # Arguments
    ///
    /// * `pin` - The GPIO pin connected to the DHT11 data line.
    /// * `delay` - A delay provider implementing the `DelayNs` trait.
    /// * `timer` - Free-running microsecond counter, used by blocking reads.
    /// * `capture` - Edge buffer fed by this pin's interrupt handler.
    /// * `id` - The interrupt channel of the pin.
    pub fn new(pin: PIN, delay: D, timer: T, capture: &'a Capture, id: DeviceId) -> Self {
        Self::with_timing(pin, delay, timer, capture, id, Timing::default())
    }

    /// Like [`new`](Self::new), with custom pulse-width windows.
    pub fn with_timing(
        pin: PIN,
        delay: D,
        timer: T,
        capture: &'a Capture,
        id: DeviceId,
        timing: Timing,
    ) -> Self {
        debug!("{} created", id);
        Dht11 {
            id,
            pin,
            delay,
            timer,
            timing,
            capture,
            callback: None,
        }
    }

    /// Returns the interrupt channel this device was created with.
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Returns the state of the current non-blocking acquisition.
    pub fn state(&self) -> AcquisitionState {
        self.capture.state()
    }

    /// Requests a reading through `arbiter`.
    ///
    /// `callback` is invoked exactly once, from [`Arbiter::tick`], when the
    /// acquisition completes. If `arbiter` already holds a request for this
    /// device, that request and its first callback are kept.
    ///
    /// # Errors
    ///
    /// `DhtError::QueueFull` if the arbiter cannot admit the request. Nothing
    /// is registered in that case.
    pub fn read_non_blocking<const N: usize>(
        &mut self,
        arbiter: &mut Arbiter<N>,
        callback: Callback<'a>,
    ) -> Result<(), DhtError<E>> {
        debug!("{} non-blocking read", self.id);
        let admitted = arbiter.contains(self.id);
        if !arbiter.enqueue(self.id) {
            return Err(DhtError::QueueFull);
        }
        if !admitted || self.callback.is_none() {
            self.callback = Some(callback);
        }
        Ok(())
    }

    /// Sends the start condition and arms interrupt-driven capture.
    ///
    /// Holds the line low for the wake-up interval, then releases it and
    /// enables the edge interrupt. The sensor's acknowledgement edges are
    /// skipped by the [`Capture`].
    pub fn start_transmission(&mut self) -> Result<(), DhtError<E>> {
        info!("{} starting transmission", self.id);
        self.capture.clear();

        self.pin.set_direction(Direction::Output)?;
        self.pin.set_low()?;
        self.delay.delay_ms(START_LOW_MS);
        self.pin.set_direction(Direction::Input)?;

        self.capture.arm();
        self.pin.enable_edge_interrupt();
        Ok(())
    }

    /// Extracts the result of a finished non-blocking acquisition.
    ///
    /// Returns `None` while the capture is still running. Once complete, the
    /// edges are decoded, the registered callback (if any) is invoked and
    /// the device is [`reset`](Self::reset).
    pub fn poll_completion(&mut self) -> Result<Option<SensorResult>, DhtError<E>> {
        if self.capture.state() != AcquisitionState::ReadComplete {
            return Ok(None);
        }

        let mut edges = [0; CAPTURE_LEN];
        let len = self.capture.read_into(&mut edges);
        let result = self.decode(&edges[..len]);

        if let Some(callback) = self.callback.take() {
            callback(self.id, result);
        }
        self.reset()?;
        Ok(Some(result))
    }

    /// Returns the line to idle: interrupt off, pin driven high, capture
    /// cleared, callback dropped.
    pub fn reset(&mut self) -> Result<(), DhtError<E>> {
        self.pin.disable_edge_interrupt();
        self.capture.clear();
        self.callback = None;

        self.release_line()?;
        debug!("{} reset", self.id);
        Ok(())
    }

    /// Reads the sensor synchronously, busy-polling the line.
    ///
    /// Blocks for the whole acquisition (about 23 ms). Must not run while a
    /// non-blocking read of this device is in progress, nor from interrupt
    /// context. A request still waiting in the arbiter queue is kept, along
    /// with its callback. The line is driven high again on return, errors
    /// included.
    ///
    /// # Returns
    ///
    /// * `Ok(SensorResult)` once the frame has been captured. A truncated or
    ///   garbled frame gives an invalid result, not an error.
    /// * `Err(DhtError::Timeout)` if the sensor does not acknowledge.
    /// * `Err(DhtError::PinError)` on GPIO failure.
    pub fn read_blocking(&mut self) -> Result<SensorResult, DhtError<E>> {
        info!("{} blocking read", self.id);
        self.pin.disable_edge_interrupt();
        self.release_line()?;

        let mut edges = [0; CAPTURE_LEN];
        let captured = self.capture_blocking(&mut edges);
        self.release_line()?;

        Ok(self.decode(&edges[..captured?]))
    }

    /// Sends the start request and busy-polls the frame into `edges`.
    /// Returns the number of edges captured.
    fn capture_blocking(
        &mut self,
        edges: &mut [u32; CAPTURE_LEN],
    ) -> Result<usize, DhtError<E>> {
        // MCU sends start request
        self.pin.set_low()?;
        self.delay.delay_ms(START_LOW_MS);
        self.pin.set_high()?;
        self.delay.delay_us(RELEASE_US);
        self.pin.set_direction(Direction::Input)?;

        // Waiting for DHT11 response: 80us low, 80us high
        let released = self.timer.now_micros();
        let ack = self.wait_for_level(false, released, ACK_TIMEOUT_US)?;
        let ack = self.wait_for_level(true, ack, ACK_TIMEOUT_US)?;

        edges[0] = self.wait_for_level(false, ack, ACK_TIMEOUT_US)?;

        let mut len = 1;
        let mut high = false;
        while len < CAPTURE_LEN {
            match self.wait_for_level(!high, edges[len - 1], EDGE_TIMEOUT_US) {
                Ok(at) => {
                    edges[len] = at;
                    len += 1;
                    high = !high;
                }
                Err(DhtError::Timeout) => break,
                Err(err) => return Err(err),
            }
        }
        Ok(len)
    }

    /// Drives the line high, its idle state.
    fn release_line(&mut self) -> Result<(), DhtError<E>> {
        self.pin.set_direction(Direction::Output)?;
        self.pin.set_high()?;
        Ok(())
    }

    fn decode(&self, edges: &[u32]) -> SensorResult {
        let result = codec::decode(edges, &self.timing);
        debug!(
            "{} response {} check {} (computed {}) errors {}",
            self.id,
            result.data,
            result.checksum,
            codec::checksum(&result.data),
            result.errors
        );
        result
    }

    /// Busy-waits until the line reads `high`, and returns the timestamp at
    /// which it did.
    ///
    /// Gives up with `DhtError::Timeout` once more than `timeout_us` have
    /// passed since `since`.
    fn wait_for_level(
        &mut self,
        high: bool,
        since: u32,
        timeout_us: u32,
    ) -> Result<u32, DhtError<E>> {
        loop {
            let now = self.timer.now_micros();
            if self.pin.is_high()? == high {
                return Ok(now);
            }
            if now.wrapping_sub(since) > timeout_us {
                return Err(DhtError::Timeout);
            }
        }
    }
}

impl<PIN, D, T, E> Reader for Dht11<'_, PIN, D, T>
where
    PIN: PinDriver<Error = E>,
    D: DelayNs,
    T: TimeSource,
{
    type Error = E;

    fn id(&self) -> DeviceId {
        self.id
    }

    fn start_transmission(&mut self) -> Result<(), DhtError<E>> {
        Dht11::start_transmission(self)
    }

    fn poll_completion(&mut self) -> Result<Option<SensorResult>, DhtError<E>> {
        Dht11::poll_completion(self)
    }

    fn reset(&mut self) -> Result<(), DhtError<E>> {
        Dht11::reset(self)
    }
}
