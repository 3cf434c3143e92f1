//! Bus scanning.
//!
//! Checks a range of 7-bit addresses one after the other and collects the
//! ones that acknowledge. Each check is a complete address-only transaction.

use core::ops::RangeInclusive;

use embedded_hal::digital::v2::{InputPin, OutputPin};
use heapless::Vec;

use crate::clock::Clock;
use crate::i2c::{Error, SoftI2c, MAX_ADDRESS};

/// Lowest non-reserved 7-bit address (0x00-0x07 are reserved).
pub const FIRST_ADDRESS: u8 = 0x08;
/// Highest non-reserved 7-bit address (0x78-0x7F are reserved).
pub const LAST_ADDRESS: u8 = 0x77;

/// Addresses that answered a scan, in ascending order.
pub type ScanResult = Vec<u8, 128>;

impl<SCL, SDA, CLK, E> SoftI2c<SCL, SDA, CLK>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    CLK: Clock,
{
    /// Check every non-reserved address for a device.
    pub fn scan(&mut self) -> Result<ScanResult, Error<E>> {
        self.scan_range(FIRST_ADDRESS..=LAST_ADDRESS)
    }

    /// Check each address in `range`. Addresses above 0x7F are skipped.
    pub fn scan_range(&mut self, range: RangeInclusive<u8>) -> Result<ScanResult, Error<E>> {
        let mut found = ScanResult::new();
        for address in range.filter(|address| *address <= MAX_ADDRESS) {
            if self.is_device_ready(address)? {
                log::debug!("device at {:#04x}", address);
                // at most 128 valid addresses exist
                let pushed = found.push(address);
                debug_assert!(pushed.is_ok());
            }
        }
        Ok(found)
    }
}
