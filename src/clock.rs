//! Bus pacing.
//!
//! The engine never measures time itself: it asks a [`Clock`] to block for
//! one half of the bus period between line transitions. Two pacing sources
//! are provided, a microsecond delay and a periodic timer.

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::timer::{CountDown, Periodic};
use nb::block;

/// Blocks for one half of a bus clock period.
pub trait Clock {
    /// Return once half a bus period has elapsed.
    fn wait_half_period(&mut self);
}

/// Paces the bus with a blocking microsecond delay.
pub struct DelayClock<D> {
    delay: D,
    half_period_us: u32,
}

impl<D> DelayClock<D>
where
    D: DelayUs<u32>,
{
    /// Wrap `delay`, sleeping `half_period_us` per half period.
    pub fn new(delay: D, half_period_us: u32) -> Self {
        DelayClock {
            delay,
            half_period_us,
        }
    }

    /// Length of one half period in microseconds.
    pub fn half_period_us(&self) -> u32 {
        self.half_period_us
    }

    /// Give back the delay provider.
    pub fn free(self) -> D {
        self.delay
    }
}

impl<D> Clock for DelayClock<D>
where
    D: DelayUs<u32>,
{
    #[inline]
    fn wait_half_period(&mut self) {
        self.delay.delay_us(self.half_period_us);
    }
}

/// Paces the bus with a periodic timer.
///
/// The timer must already be started at twice the desired bus frequency.
pub struct TimerClock<T> {
    timer: T,
}

impl<T> TimerClock<T>
where
    T: CountDown + Periodic,
{
    /// Wrap an already started `timer`.
    pub fn new(timer: T) -> Self {
        TimerClock { timer }
    }

    /// Give back the timer.
    pub fn free(self) -> T {
        self.timer
    }
}

impl<T> Clock for TimerClock<T>
where
    T: CountDown + Periodic,
{
    #[inline]
    fn wait_half_period(&mut self) {
        block!(self.timer.wait()).ok();
    }
}
