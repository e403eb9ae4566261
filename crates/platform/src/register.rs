//! Register bus seam.
//!
//! PMIC charger blocks are a flat space of 8-bit registers addressed by a
//! 16-bit `base + offset` pair (SPMI style). [`RegisterPort`] is the only
//! way the charger engine talks to silicon. [`I2cRegisterPort`] adapts any
//! `embedded_hal::i2c::I2c` bus to it for PMICs exposed over I2C.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

/// Register I/O failure.
///
/// Always logged by the caller; the operation that hit it is abandoned and
/// retried on the next scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The device did not acknowledge its address or a data byte.
    #[error("register access not acknowledged")]
    Nack,
    /// The bus layer gave up waiting for the transfer.
    #[error("register access timed out")]
    Timeout,
    /// Arbitration loss, overrun or any other bus-level fault.
    #[error("register bus fault")]
    Bus,
}

/// Byte-wide register access.
///
/// Only [`read`](RegisterPort::read) and [`write`](RegisterPort::write) are
/// required; the single-byte helpers and
/// [`masked_write`](RegisterPort::masked_write) have default
/// implementations built on them.
pub trait RegisterPort {
    /// Read `buf.len()` consecutive registers starting at `addr`.
    fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), BusError>;

    /// Write `data` to consecutive registers starting at `addr`.
    fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), BusError>;

    /// Read a single register.
    fn read_byte(&mut self, addr: u16) -> Result<u8, BusError> {
        let mut buf = [0u8; 1];
        self.read(addr, &mut buf)?;
        let [value] = buf;
        Ok(value)
    }

    /// Write a single register.
    fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        self.write(addr, &[value])
    }

    /// Read-modify-write of the bits selected by `mask`.
    ///
    /// Not atomic on the bus. Callers serialize access to the same register.
    fn masked_write(&mut self, addr: u16, mask: u8, value: u8) -> Result<(), BusError> {
        let current = self.read_byte(addr)?;
        let updated = (current & !mask) | (value & mask);
        self.write_byte(addr, updated)
    }
}

impl<T: RegisterPort + ?Sized> RegisterPort for &mut T {
    fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), BusError> {
        T::read(self, addr, buf)
    }

    fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), BusError> {
        T::write(self, addr, data)
    }
}

/// Largest burst accepted by [`I2cRegisterPort::write`] (two address bytes
/// plus data).
pub const I2C_MAX_BURST: usize = 8;

/// [`RegisterPort`] over an I2C device using 16-bit big-endian register
/// addresses.
pub struct I2cRegisterPort<I> {
    i2c: I,
    addr: u8,
}

impl<I: I2c> I2cRegisterPort<I> {
    /// Wrap `i2c`, talking to the 7-bit device address `addr`.
    pub fn new(i2c: I, addr: u8) -> Self {
        Self { i2c, addr }
    }

    /// Give the bus back.
    pub fn release(self) -> I {
        self.i2c
    }
}

fn map_i2c_error<E: embedded_hal::i2c::Error>(err: &E) -> BusError {
    match err.kind() {
        ErrorKind::NoAcknowledge(_) => BusError::Nack,
        _ => BusError::Bus,
    }
}

impl<I: I2c> RegisterPort for I2cRegisterPort<I> {
    fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), BusError> {
        self.i2c
            .write_read(self.addr, &addr.to_be_bytes(), buf)
            .map_err(|e| map_i2c_error(&e))
    }

    fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), BusError> {
        let mut frame: heapless::Vec<u8, I2C_MAX_BURST> = heapless::Vec::new();
        frame
            .extend_from_slice(&addr.to_be_bytes())
            .map_err(|_| BusError::Bus)?;
        frame.extend_from_slice(data).map_err(|_| BusError::Bus)?;
        self.i2c
            .write(self.addr, &frame)
            .map_err(|e| map_i2c_error(&e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    const DEV: u8 = 0x08;

    #[test]
    fn read_byte_sends_big_endian_address() {
        let expectations = [Transaction::write_read(DEV, vec![0x10, 0x49], vec![0x80])];
        let mut port = I2cRegisterPort::new(I2cMock::new(&expectations), DEV);
        assert_eq!(port.read_byte(0x1049), Ok(0x80));
        port.release().done();
    }

    #[test]
    fn masked_write_preserves_unmasked_bits() {
        let expectations = [
            Transaction::write_read(DEV, vec![0x13, 0x47], vec![0b1010_0000]),
            Transaction::write(DEV, vec![0x13, 0x47, 0b1010_0001]),
        ];
        let mut port = I2cRegisterPort::new(I2cMock::new(&expectations), DEV);
        port.masked_write(0x1347, 0x01, 0xFF).unwrap();
        port.release().done();
    }

    #[test]
    fn masked_write_clears_only_masked_bits() {
        let expectations = [
            Transaction::write_read(DEV, vec![0x10, 0x49], vec![0x81]),
            Transaction::write(DEV, vec![0x10, 0x49, 0x01]),
        ];
        let mut port = I2cRegisterPort::new(I2cMock::new(&expectations), DEV);
        port.masked_write(0x1049, 0x80, 0x00).unwrap();
        port.release().done();
    }

    #[test]
    fn nack_maps_to_bus_nack() {
        use embedded_hal::i2c::NoAcknowledgeSource;
        let expectations = [Transaction::write_read(DEV, vec![0x12, 0x10], vec![0x00])
            .with_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))];
        let mut port = I2cRegisterPort::new(I2cMock::new(&expectations), DEV);
        assert_eq!(port.read_byte(0x1210), Err(BusError::Nack));
        port.release().done();
    }

    #[test]
    fn oversized_burst_is_rejected_without_touching_the_bus() {
        let expectations: [Transaction; 0] = [];
        let mut port = I2cRegisterPort::new(I2cMock::new(&expectations), DEV);
        let data = [0u8; I2C_MAX_BURST];
        assert_eq!(port.write(0x1000, &data), Err(BusError::Bus));
        port.release().done();
    }
}
