//! Serializes acquisitions of several sensors sharing one capture pipeline.
//!
//! Only one device may drive its line and take edge interrupts at a time.
//! Requests wait in a bounded FIFO and are admitted one by one from a
//! background task calling [`Arbiter::tick`] at a short, fixed cadence.
//!
//! The arbiter only stores [`DeviceId`]s; the devices themselves are lent to
//! each call. When several tasks enqueue requests, share the arbiter behind
//! a mutex.

use heapless::Deque;

use crate::codec::SensorResult;
use crate::error::DhtError;

/// Default number of pending requests the arbiter can hold.
pub const QUEUE_LEN: usize = 8;

/// Identifies a sensor by its interrupt channel.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u8);

/// A sensor the arbiter can drive.
pub trait Reader {
    /// Error of the underlying pin.
    type Error;

    /// Identifier the device is queued under.
    fn id(&self) -> DeviceId;

    /// Issues the start condition and arms edge capture.
    fn start_transmission(&mut self) -> Result<(), DhtError<Self::Error>>;

    /// Returns the result once the capture is complete, `None` before.
    fn poll_completion(&mut self) -> Result<Option<SensorResult>, DhtError<Self::Error>>;

    /// Abandons any acquisition and returns the line to idle.
    fn reset(&mut self) -> Result<(), DhtError<Self::Error>>;
}

/// What a call to [`Arbiter::tick`] did.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Nothing active, nothing queued.
    Idle,
    /// The device was admitted and its transmission started.
    Started(DeviceId),
    /// The active device is still capturing.
    Pending(DeviceId),
    /// The active device finished; the slot is free again.
    Completed(DeviceId, SensorResult),
}

/// Single-active-reader arbiter with a FIFO admission queue.
pub struct Arbiter<const N: usize = QUEUE_LEN> {
    queue: Deque<DeviceId, N>,
    active: Option<DeviceId>,
}

impl<const N: usize> Arbiter<N> {
    /// Creates an arbiter with an empty queue and no active device.
    pub const fn new() -> Self {
        Arbiter {
            queue: Deque::new(),
            active: None,
        }
    }

    /// Admits a read request for `id`.
    ///
    /// Returns `false` if the queue is full; the request was not admitted and
    /// should be retried later. A device that is already queued or active is
    /// left where it is and `true` is returned.
    pub fn enqueue(&mut self, id: DeviceId) -> bool {
        if self.contains(id) {
            debug!("{} already admitted", id);
            return true;
        }

        match self.queue.push_back(id) {
            Ok(()) => true,
            Err(_) => {
                warn!("{} rejected, queue full", id);
                false
            }
        }
    }

    /// Returns `true` if `id` is queued or active.
    pub fn contains(&self, id: DeviceId) -> bool {
        self.active == Some(id) || self.queue.iter().any(|queued| *queued == id)
    }

    /// The device currently allowed to capture, if any.
    pub fn active(&self) -> Option<DeviceId> {
        self.active
    }

    /// Number of requests waiting for admission.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if no further request can be admitted.
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    /// Advances the arbiter by one step.
    ///
    /// With no active device, the oldest queued request is admitted and its
    /// transmission started. Otherwise the active device is polled, and once
    /// it completes the slot is released so the next request is admitted on
    /// the following tick.
    ///
    /// `devices` must contain every device that may be enqueued. Queued ids
    /// without a matching device are dropped. An active device missing from
    /// `devices` keeps the slot and is reported as pending until it is
    /// provided again.
    pub fn tick<E>(
        &mut self,
        devices: &mut [&mut dyn Reader<Error = E>],
    ) -> Result<Tick, DhtError<E>> {
        let Some(id) = self.active else {
            return self.admit_next(devices);
        };

        let Some(device) = find(devices, id) else {
            warn!("{} active but not provided", id);
            return Ok(Tick::Pending(id));
        };

        match device.poll_completion() {
            Ok(Some(result)) => {
                self.active = None;
                Ok(Tick::Completed(id, result))
            }
            Ok(None) => {
                trace!("{} pending", id);
                Ok(Tick::Pending(id))
            }
            Err(err) => {
                self.active = None;
                // The poll error is the one worth reporting.
                let _ = device.reset();
                Err(err)
            }
        }
    }

    /// Resets the active device without delivering a result and frees the
    /// slot. Use this to bound how long an acquisition may take.
    ///
    /// Returns the aborted device, or `None` if nothing was active.
    ///
    /// # Errors
    ///
    /// `DhtError::UnknownDevice` if the active device is not in `devices`;
    /// the slot stays taken since the device cannot be reset.
    pub fn abort<E>(
        &mut self,
        devices: &mut [&mut dyn Reader<Error = E>],
    ) -> Result<Option<DeviceId>, DhtError<E>> {
        let Some(id) = self.active else {
            return Ok(None);
        };
        let Some(device) = find(devices, id) else {
            return Err(DhtError::UnknownDevice(id));
        };

        warn!("{} aborted", id);
        self.active = None;
        device.reset()?;
        Ok(Some(id))
    }

    fn admit_next<E>(
        &mut self,
        devices: &mut [&mut dyn Reader<Error = E>],
    ) -> Result<Tick, DhtError<E>> {
        while let Some(id) = self.queue.pop_front() {
            let Some(device) = find(devices, id) else {
                warn!("{} queued but not provided, dropped", id);
                continue;
            };

            if let Err(err) = device.start_transmission() {
                let _ = device.reset();
                return Err(err);
            }
            self.active = Some(id);
            return Ok(Tick::Started(id));
        }
        Ok(Tick::Idle)
    }
}

impl<const N: usize> Default for Arbiter<N> {
    fn default() -> Self {
        Self::new()
    }
}

fn find<'d, 'r, E>(
    devices: &'d mut [&'r mut dyn Reader<Error = E>],
    id: DeviceId,
) -> Option<&'d mut (dyn Reader<Error = E> + 'r)> {
    devices
        .iter_mut()
        .find(|device| device.id() == id)
        .map(|device| &mut **device)
}
