//! Press-and-release detection for the game button.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::InputPin;

use crate::shutdown::Shutdown;

/// Electrical level that means "pressed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Pull-down wiring, the pin reads high while pressed.
    ActiveHigh,
    /// Pull-up wiring, the pin reads low while pressed.
    ActiveLow,
}

/// Outcome of waiting for the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Press {
    /// The button went down and came back up.
    Released,
    /// A shutdown was requested while waiting.
    Cancelled,
}

/// Source of "pressed then released" events.
///
/// Blocks until one full press cycle has been seen.
pub trait PressRelease {
    type Error;

    fn wait_for_press_release(&mut self) -> Result<Press, Self::Error>;
}

/// Busy-waits on a pin, sleeping `poll_ms` between reads.
///
/// The poll interval doubles as debounce.
pub struct PolledButton<'a, P, D> {
    pin: P,
    delay: D,
    polarity: Polarity,
    poll_ms: u32,
    shutdown: &'a Shutdown,
}

impl<'a, P, D> PolledButton<'a, P, D>
where
    P: InputPin,
    D: DelayMs<u32>,
{
    pub fn new(pin: P, delay: D, polarity: Polarity, poll_ms: u32, shutdown: &'a Shutdown) -> Self {
        Self {
            pin,
            delay,
            polarity,
            poll_ms,
            shutdown,
        }
    }

    pub fn is_pressed(&self) -> Result<bool, P::Error> {
        match self.polarity {
            Polarity::ActiveHigh => self.pin.is_high(),
            Polarity::ActiveLow => self.pin.is_low(),
        }
    }

    /// Polls until the button reads `pressed`. Returns false on shutdown.
    fn wait_until(&mut self, pressed: bool) -> Result<bool, P::Error> {
        while self.is_pressed()? != pressed {
            if self.shutdown.is_requested() {
                return Ok(false);
            }
            self.delay.delay_ms(self.poll_ms);
        }
        Ok(true)
    }
}

impl<P, D> PressRelease for PolledButton<'_, P, D>
where
    P: InputPin,
    D: DelayMs<u32>,
{
    type Error = P::Error;

    fn wait_for_press_release(&mut self) -> Result<Press, P::Error> {
        // A button still held from the previous round must be let go first
        if !self.wait_until(false)? || !self.wait_until(true)? || !self.wait_until(false)? {
            return Ok(Press::Cancelled);
        }
        Ok(Press::Released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use core::cell::{Cell, RefCell};
    use core::convert::Infallible;
    use std::collections::VecDeque;

    /// Pin that replays a scripted sequence of levels, then holds the last.
    struct ScriptedPin {
        levels: RefCell<VecDeque<bool>>,
        last: Cell<bool>,
        reads: Cell<usize>,
    }

    impl ScriptedPin {
        fn new(levels: &[bool]) -> Self {
            Self {
                levels: RefCell::new(levels.iter().copied().collect()),
                last: Cell::new(levels.last().copied().unwrap_or(false)),
                reads: Cell::new(0),
            }
        }
    }

    impl InputPin for ScriptedPin {
        type Error = Infallible;

        fn is_high(&self) -> Result<bool, Infallible> {
            self.reads.set(self.reads.get() + 1);
            match self.levels.borrow_mut().pop_front() {
                Some(level) => {
                    self.last.set(level);
                    Ok(level)
                }
                None => Ok(self.last.get()),
            }
        }

        fn is_low(&self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        total_ms: u32,
    }

    impl DelayMs<u32> for CountingDelay {
        fn delay_ms(&mut self, ms: u32) {
            self.total_ms += ms;
        }
    }

    #[test]
    fn waits_for_full_press_cycle() {
        let shutdown = Shutdown::new();
        let pin = ScriptedPin::new(&[false, false, true, true, true, false]);
        let mut button = PolledButton::new(pin, CountingDelay::default(), Polarity::ActiveHigh, 10, &shutdown);

        assert_eq!(button.wait_for_press_release(), Ok(Press::Released));
        assert_eq!(button.delay.total_ms, 30);
    }

    #[test]
    fn active_low_inverts_levels() {
        let shutdown = Shutdown::new();
        let pin = ScriptedPin::new(&[true, false, false, true]);
        let mut button = PolledButton::new(pin, CountingDelay::default(), Polarity::ActiveLow, 10, &shutdown);

        assert_eq!(button.wait_for_press_release(), Ok(Press::Released));
        assert_eq!(button.pin.reads.get(), 4);
    }

    #[test]
    fn held_button_must_be_released_first() {
        let shutdown = Shutdown::new();
        // Still held from before, then a fresh press
        let pin = ScriptedPin::new(&[true, true, false, true, false]);
        let mut button = PolledButton::new(pin, CountingDelay::default(), Polarity::ActiveHigh, 10, &shutdown);

        assert_eq!(button.wait_for_press_release(), Ok(Press::Released));
        assert_eq!(button.pin.reads.get(), 5);
    }

    #[test]
    fn shutdown_interrupts_the_wait() {
        let shutdown = Shutdown::new();
        shutdown.request();
        let pin = ScriptedPin::new(&[false]);
        let mut button = PolledButton::new(pin, CountingDelay::default(), Polarity::ActiveHigh, 10, &shutdown);

        assert_eq!(button.wait_for_press_release(), Ok(Press::Cancelled));
    }
}
