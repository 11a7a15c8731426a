use embedded_hal::digital::{InputPin, OutputPin};

/// Direction of the data pin.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// The GPIO pin connected to the sensor data line.
///
/// Level access comes from `embedded-hal`; direction switching and the
/// pin-change interrupt are platform specific and provided by the
/// implementor (register twiddling, NVIC/EXTI control, ...).
pub trait PinDriver: InputPin + OutputPin {
    /// Switches the pin between input and push-pull output.
    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error>;

    /// Enables the edge interrupt associated with the pin.
    fn enable_edge_interrupt(&mut self);

    /// Disables the edge interrupt associated with the pin.
    fn disable_edge_interrupt(&mut self);
}
