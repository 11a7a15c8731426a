//! Edge capture shared between the pin interrupt and the polling task.
//!
//! The interrupt handler is the only writer of the buffer and the cursor;
//! the task only reads the buffer after observing [`AcquisitionState::ReadComplete`].
//! Everything is atomic, so a [`Capture`] can live in a `static` and be
//! reached from the interrupt handler without locks.

use portable_atomic::{AtomicU8, AtomicU32, AtomicUsize, Ordering};

use crate::timing::{CAPTURE_LEN, HANDSHAKE_EDGES};

/// Progress of one acquisition.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquisitionState {
    /// No handshake issued.
    Idle,
    /// Handshake issued, skipping the sensor's acknowledgement edges.
    Waiting,
    /// Capturing data edges.
    Reading,
    /// Capture finished, result pending extraction.
    ReadComplete,
}

impl AcquisitionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => AcquisitionState::Waiting,
            2 => AcquisitionState::Reading,
            3 => AcquisitionState::ReadComplete,
            _ => AcquisitionState::Idle,
        }
    }
}

/// Capture buffer, write cursor and state of one sensor.
pub struct Capture {
    state: AtomicU8,
    handshake: AtomicU8,
    cursor: AtomicUsize,
    edges: [AtomicU32; CAPTURE_LEN],
}

impl Capture {
    /// Creates an empty, idle capture. Usable in a `static`.
    pub const fn new() -> Self {
        Capture {
            state: AtomicU8::new(AcquisitionState::Idle as u8),
            handshake: AtomicU8::new(0),
            cursor: AtomicUsize::new(0),
            edges: [const { AtomicU32::new(0) }; CAPTURE_LEN],
        }
    }

    /// Current acquisition state, as last published by either side.
    pub fn state(&self) -> AcquisitionState {
        AcquisitionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Number of edges captured so far.
    pub fn len(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Returns `true` if no data edge has been captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records one edge. Call from the pin interrupt handler.
    ///
    /// Edges are ignored unless an acquisition is in progress. The first
    /// [`HANDSHAKE_EDGES`] edges after [`arm`](Self::arm) are the sensor's
    /// acknowledgement and are not stored.
    pub fn handle_edge(&self, timestamp: u32) {
        match self.state() {
            AcquisitionState::Waiting => {
                let seen = self.handshake.fetch_add(1, Ordering::Relaxed) + 1;
                if seen >= HANDSHAKE_EDGES {
                    self.set_state(AcquisitionState::Reading);
                }
            }
            AcquisitionState::Reading => {
                let pos = self.cursor.load(Ordering::Relaxed);
                if pos < CAPTURE_LEN {
                    self.edges[pos].store(timestamp, Ordering::Relaxed);
                    self.cursor.store(pos + 1, Ordering::Release);
                }
                if pos + 1 >= CAPTURE_LEN {
                    self.set_state(AcquisitionState::ReadComplete);
                }
            }
            AcquisitionState::Idle | AcquisitionState::ReadComplete => {}
        }
    }

    /// Copies the captured edges into `out` and returns how many there are.
    ///
    /// Only meaningful once the state is [`AcquisitionState::ReadComplete`].
    pub fn read_into(&self, out: &mut [u32; CAPTURE_LEN]) -> usize {
        let len = self.len().min(CAPTURE_LEN);
        for (slot, edge) in out.iter_mut().zip(&self.edges[..len]) {
            *slot = edge.load(Ordering::Relaxed);
        }
        len
    }

    /// Starts accepting edges. The handshake edges are skipped first.
    pub(crate) fn arm(&self) {
        self.handshake.store(0, Ordering::Relaxed);
        self.cursor.store(0, Ordering::Relaxed);
        self.set_state(AcquisitionState::Waiting);
    }

    /// Drops any captured edges and returns to [`AcquisitionState::Idle`].
    pub(crate) fn clear(&self) {
        self.set_state(AcquisitionState::Idle);
        self.handshake.store(0, Ordering::Relaxed);
        self.cursor.store(0, Ordering::Release);
    }

    fn set_state(&self, state: AcquisitionState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl Default for Capture {
    fn default() -> Self {
        Self::new()
    }
}
