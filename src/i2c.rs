/*!
  # Blocking I2C bus master over two bit-banged GPIO pins

  This implementation consumes the following hardware resources:
  - Two GPIO pins for the SCL and SDA lines.
  - A pacing source: a microsecond delay or a periodic timer.

  Only a single master is supported. Clock stretching and arbitration are
  not handled; a peer holding a line low is simply read as whatever level
  is present.

  ## Hardware requirements

  1. Configure both GPIO pins as open-drain outputs with pull-ups.
  2. Either pass a `DelayUs<u32>` provider together with a [`Config`], or
     start a periodic timer at twice the desired bus frequency.

  ## Register access

  ```ignore
    use soft_i2c::i2c::{Config, SoftI2c};

    let mut i2c = SoftI2c::new(scl, sda, delay, Config::STANDARD);
    i2c.init()?;

    i2c.write_register(0x50, 0x10, &[0x55, 0xAA])?;

    let mut data = [0u8; 2];
    i2c.read_register(0x50, 0x10, &mut data)?;
  ```

  Every transaction ends with a STOP condition, including the ones that
  fail, so the bus is idle whenever control returns to the caller.
*/

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::blocking::i2c::{Read, Write, WriteRead};
use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::timer::{CountDown, Periodic};

use crate::clock::{Clock, DelayClock, TimerClock};

/// Highest valid 7-bit bus address.
pub const MAX_ADDRESS: u8 = 0x7F;

/// I2C error
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// GPIO error
    Bus(E),
    /// No ack received
    NoAck,
    /// Invalid input
    InvalidData,
}

/// Bus timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Length of half a clock period in microseconds.
    pub half_period_us: u32,
}

impl Config {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self { half_period_us: 5 };

    /// Fast mode, as close to 400 kHz as whole microseconds allow
    pub const FAST: Self = Self { half_period_us: 2 };

    /// Pick the half period for a bus frequency in Hz.
    ///
    /// The half period is rounded up, so the resulting bus never runs faster
    /// than requested, and is never shorter than one microsecond.
    pub fn from_frequency(hz: u32) -> Self {
        let hz = hz.max(1);
        let mut half_period_us = 500_000 / hz;
        if 500_000 % hz != 0 {
            half_period_us += 1;
        }
        Self {
            half_period_us: half_period_us.max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Write = 0,
    Read = 1,
}

/// Bit banging I2C master
pub struct SoftI2c<SCL, SDA, CLK> {
    scl: SCL,
    sda: SDA,
    clk: CLK,
}

impl<SCL, SDA, D> SoftI2c<SCL, SDA, DelayClock<D>>
where
    D: DelayUs<u32>,
{
    /// Create an instance paced by a microsecond delay.
    ///
    /// The lines are not touched until [`SoftI2c::init`] or the first
    /// transaction.
    pub fn new(scl: SCL, sda: SDA, delay: D, config: Config) -> Self {
        SoftI2c {
            scl,
            sda,
            clk: DelayClock::new(delay, config.half_period_us),
        }
    }
}

impl<SCL, SDA, T> SoftI2c<SCL, SDA, TimerClock<T>>
where
    T: CountDown + Periodic,
{
    /// Create an instance paced by a timer running at twice the bus frequency.
    pub fn with_timer(scl: SCL, sda: SDA, timer: T) -> Self {
        SoftI2c {
            scl,
            sda,
            clk: TimerClock::new(timer),
        }
    }
}

impl<SCL, SDA, CLK, E> SoftI2c<SCL, SDA, CLK>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    CLK: Clock,
{
    /// Release both lines so the bus starts out idle.
    pub fn init(&mut self) -> Result<(), Error<E>> {
        self.set_sda_high()?;
        self.wait_for_clk();

        self.set_scl_high()?;
        self.wait_for_clk();
        Ok(())
    }

    /// Give back the pins and the pacing source.
    pub fn free(self) -> (SCL, SDA, CLK) {
        (self.scl, self.sda, self.clk)
    }

    /// Send a raw START condition: SDA falls while SCL is high.
    ///
    /// Also used as a repeated START when SCL is low after an
    /// acknowledgment bit.
    ///
    /// **This is a low-level control function.** Use the register and
    /// readiness transactions for normal device access.
    pub fn generate_start(&mut self) -> Result<(), Error<E>> {
        self.set_sda_high()?;
        self.wait_for_clk();

        self.set_scl_high()?;
        self.wait_for_clk();

        self.set_sda_low()?;
        self.wait_for_clk();

        self.set_scl_low()
    }

    /// Send a raw STOP condition: SDA rises while SCL is high.
    ///
    /// Leaves both lines released.
    ///
    /// **This is a low-level control function.**
    pub fn generate_stop(&mut self) -> Result<(), Error<E>> {
        self.set_scl_low()?;
        self.set_sda_low()?;
        self.wait_for_clk();

        self.set_scl_high()?;
        self.wait_for_clk();

        self.set_sda_high()
    }

    /// Clock out one bit. SDA only changes while SCL is low.
    pub fn transmit_bit(&mut self, bit: bool) -> Result<(), Error<E>> {
        if bit {
            self.set_sda_high()?;
        } else {
            self.set_sda_low()?;
        }
        self.wait_for_clk();

        self.set_scl_high()?;
        self.wait_for_clk();

        self.set_scl_low()
    }

    /// Release SDA and clock in one bit driven by the peer.
    pub fn sample_bit(&mut self) -> Result<bool, Error<E>> {
        self.set_sda_high()?;
        self.wait_for_clk();

        self.set_scl_high()?;
        self.wait_for_clk();

        let bit = self.sda.is_high().map_err(Error::Bus)?;

        self.set_scl_low()?;

        Ok(bit)
    }

    /// Shift out a byte, most significant bit first.
    ///
    /// The acknowledgment bit is not clocked; follow up with
    /// [`SoftI2c::wait_for_ack`].
    pub fn send_byte(&mut self, byte: u8) -> Result<(), Error<E>> {
        for bit_offset in 0..8 {
            let out_bit = (byte >> (7 - bit_offset)) & 0b1;
            self.transmit_bit(out_bit == 1)?;
        }

        Ok(())
    }

    /// Shift in a byte, most significant bit first, then answer with ACK
    /// (`send_ack`) or NACK.
    pub fn receive_byte(&mut self, send_ack: bool) -> Result<u8, Error<E>> {
        let mut byte: u8 = 0;

        self.set_sda_high()?;

        for _ in 0..8 {
            byte = (byte << 1) | self.sample_bit()? as u8;
        }

        // ACK is SDA held low during the ninth clock
        self.transmit_bit(!send_ack)?;

        Ok(byte)
    }

    /// Clock the acknowledgment bit. `true` when the peer pulled SDA low.
    pub fn wait_for_ack(&mut self) -> Result<bool, Error<E>> {
        Ok(!self.sample_bit()?)
    }

    /// Write `data` to consecutive registers starting at `register`.
    ///
    /// Stops at the first byte the device does not acknowledge; bytes after
    /// it are never put on the bus.
    pub fn write_register(
        &mut self,
        address: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), Error<E>> {
        let write = Self::address_byte(address, Direction::Write)?;
        log::trace!(
            "write {} bytes to {:#04x} register {:#04x}",
            data.len(),
            address,
            register
        );

        self.transaction(|bus| {
            bus.write_acked(write)?;
            bus.write_acked(register)?;
            bus.write_to_slave(data)
        })
    }

    /// Fill `buffer` from consecutive registers starting at `register`.
    ///
    /// The register is selected in write direction, then a repeated START
    /// switches to read direction. Every byte but the last is acknowledged.
    ///
    /// An empty buffer selects the register and stops without switching
    /// direction. Once a device has acknowledged its read address it drives
    /// the first data bit, which could hold SDA low through the STOP.
    ///
    /// On failure, bytes already received stay in `buffer` and the rest is
    /// left untouched.
    pub fn read_register(
        &mut self,
        address: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), Error<E>> {
        let write = Self::address_byte(address, Direction::Write)?;
        let read = Self::address_byte(address, Direction::Read)?;
        log::trace!(
            "read {} bytes from {:#04x} register {:#04x}",
            buffer.len(),
            address,
            register
        );

        self.transaction(|bus| {
            bus.write_acked(write)?;
            bus.write_acked(register)?;
            if buffer.is_empty() {
                return Ok(());
            }

            // SR
            bus.generate_start()?;

            bus.write_acked(read)?;
            bus.read_from_slave(buffer)
        })
    }

    /// Check whether a device acknowledges `address`.
    ///
    /// No data is transferred. An address above [`MAX_ADDRESS`] is reported
    /// as absent without touching the bus.
    pub fn is_device_ready(&mut self, address: u8) -> Result<bool, Error<E>> {
        let write = match Self::address_byte(address, Direction::Write) {
            Ok(byte) => byte,
            Err(_) => return Ok(false),
        };

        self.transaction(|bus| {
            bus.send_byte(write)?;
            bus.wait_for_ack()
        })
    }

    /// Run `body` between a START and a STOP.
    ///
    /// The STOP is sent whatever `body` returns. An error from `body` is
    /// reported in preference to one from the STOP.
    fn transaction<T, F>(&mut self, body: F) -> Result<T, Error<E>>
    where
        F: FnOnce(&mut Self) -> Result<T, Error<E>>,
    {
        // ST
        let outcome = self.generate_start().and_then(|()| body(self));

        // SP
        let stopped = self.generate_stop();

        let value = outcome?;
        stopped?;
        Ok(value)
    }

    fn address_byte(address: u8, direction: Direction) -> Result<u8, Error<E>> {
        if address > MAX_ADDRESS {
            return Err(Error::InvalidData);
        }
        Ok((address << 1) | direction as u8)
    }

    #[inline]
    fn read_from_slave(&mut self, input: &mut [u8]) -> Result<(), Error<E>> {
        let last = input.len().saturating_sub(1);
        for (i, slot) in input.iter_mut().enumerate() {
            *slot = self.receive_byte(i != last)?;
        }
        Ok(())
    }

    #[inline]
    fn write_to_slave(&mut self, output: &[u8]) -> Result<(), Error<E>> {
        for byte in output {
            self.write_acked(*byte)?;
        }
        Ok(())
    }

    #[inline]
    fn write_acked(&mut self, byte: u8) -> Result<(), Error<E>> {
        self.send_byte(byte)?;
        self.check_ack(byte)
    }

    #[inline]
    fn check_ack(&mut self, byte: u8) -> Result<(), Error<E>> {
        if !self.wait_for_ack()? {
            log::debug!("no ack for byte {:#04x}", byte);
            Err(Error::NoAck)
        } else {
            Ok(())
        }
    }

    #[inline]
    fn set_scl_high(&mut self) -> Result<(), Error<E>> {
        self.scl.set_high().map_err(Error::Bus)
    }

    #[inline]
    fn set_scl_low(&mut self) -> Result<(), Error<E>> {
        self.scl.set_low().map_err(Error::Bus)
    }

    #[inline]
    fn set_sda_high(&mut self) -> Result<(), Error<E>> {
        self.sda.set_high().map_err(Error::Bus)
    }

    #[inline]
    fn set_sda_low(&mut self) -> Result<(), Error<E>> {
        self.sda.set_low().map_err(Error::Bus)
    }

    #[inline]
    fn wait_for_clk(&mut self) {
        self.clk.wait_half_period();
    }
}

impl<SCL, SDA, CLK, E> Write for SoftI2c<SCL, SDA, CLK>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    CLK: Clock,
{
    type Error = Error<E>;

    fn write(&mut self, addr: u8, output: &[u8]) -> Result<(), Self::Error> {
        let write = Self::address_byte(addr, Direction::Write)?;

        self.transaction(|bus| {
            // SAD + W
            bus.write_acked(write)?;
            bus.write_to_slave(output)
        })
    }
}

impl<SCL, SDA, CLK, E> Read for SoftI2c<SCL, SDA, CLK>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    CLK: Clock,
{
    type Error = Error<E>;

    fn read(&mut self, addr: u8, input: &mut [u8]) -> Result<(), Self::Error> {
        let read = Self::address_byte(addr, Direction::Read)?;
        if input.is_empty() {
            return Ok(());
        }

        self.transaction(|bus| {
            // SAD + R
            bus.write_acked(read)?;
            bus.read_from_slave(input)
        })
    }
}

impl<SCL, SDA, CLK, E> WriteRead for SoftI2c<SCL, SDA, CLK>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    CLK: Clock,
{
    type Error = Error<E>;

    fn write_read(&mut self, addr: u8, output: &[u8], input: &mut [u8]) -> Result<(), Self::Error> {
        if output.is_empty() || input.is_empty() {
            return Err(Error::InvalidData);
        }
        let write = Self::address_byte(addr, Direction::Write)?;
        let read = Self::address_byte(addr, Direction::Read)?;

        self.transaction(|bus| {
            // SAD + W
            bus.write_acked(write)?;
            bus.write_to_slave(output)?;

            // SR
            bus.generate_start()?;

            // SAD + R
            bus.write_acked(read)?;
            bus.read_from_slave(input)
        })
    }
}
