//! Test doubles for the hardware collaborators.

use core::cell::Cell;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal_mock::eh1::digital::{Mock as PinMock, State as PinState, Transaction as PinTx};

use crate::pin::{Direction, PinDriver};
use crate::timing::TimeSource;

/// Non-level pin operations, in call order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineEvent {
    Direction(Direction),
    InterruptEnabled,
    InterruptDisabled,
}

/// A mocked data line: levels go through `embedded-hal-mock`, direction and
/// interrupt changes are recorded.
pub struct MockLine {
    pub pin: PinMock,
    pub events: Vec<LineEvent>,
}

impl MockLine {
    /// Creates a line expecting the given level transactions.
    pub fn new(expectations: &[PinTx]) -> Self {
        MockLine {
            pin: PinMock::new(expectations),
            events: Vec::new(),
        }
    }

    /// Checks that every expected level transaction was consumed.
    pub fn done(&mut self) {
        self.pin.done();
    }
}

impl ErrorType for MockLine {
    type Error = <PinMock as ErrorType>::Error;
}

impl InputPin for MockLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.pin.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.pin.is_low()
    }
}

impl OutputPin for MockLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high()
    }
}

impl PinDriver for MockLine {
    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error> {
        self.events.push(LineEvent::Direction(direction));
        Ok(())
    }

    fn enable_edge_interrupt(&mut self) {
        self.events.push(LineEvent::InterruptEnabled);
    }

    fn disable_edge_interrupt(&mut self) {
        self.events.push(LineEvent::InterruptDisabled);
    }
}

/// A clock that advances by one microsecond every time it is read.
pub struct StepTimer {
    now: Cell<u32>,
}

impl StepTimer {
    /// Creates a clock whose first reading is `start`.
    pub fn new(start: u32) -> Self {
        StepTimer {
            now: Cell::new(start),
        }
    }
}

impl TimeSource for StepTimer {
    fn now_micros(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(1));
        now
    }
}

/// Level reads for a pulse lasting `width_us` on a [`StepTimer`].
pub fn pulse(high: bool, width_us: u32) -> impl Iterator<Item = PinTx> {
    (0..width_us).map(move |_| PinTx::get(if high { PinState::High } else { PinState::Low }))
}
