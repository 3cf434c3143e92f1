//! This is a [bit banging] I2C bus master for two open-drain GPIO pins,
//! built on the [`embedded-hal`] traits.
//!
//! [bit banging]: https://en.wikipedia.org/wiki/Bit_banging
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal
//!
//! The engine is layered bottom-up: START/STOP and single-bit signalling,
//! byte transfer with the acknowledgment handshake, and register-style
//! transactions on top. See [`i2c`] for usage.

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

pub mod clock;
pub mod i2c;
pub mod scan;

pub use crate::clock::{Clock, DelayClock, TimerClock};
pub use crate::i2c::{Config, Error, SoftI2c};
pub use crate::scan::ScanResult;
