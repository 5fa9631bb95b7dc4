//! IrDA SIR over a USART.
//!
//! With IREN set the USART shapes every zero bit into a 3/16 pulse for an
//! IR LED, so the byte-level API is plain serial.

use embedded_hal_nb::serial::{Read, Write};

/// USART BRR value, rounded to nearest. `None` for a zero baud rate.
pub const fn brr(clock: u32, baud: u32) -> Option<u32> {
    if baud == 0 {
        return None;
    }
    Some(((clock as u64 + baud as u64 / 2) / baud as u64) as u32)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Config {
    pub baudrate: u32,
}

impl Default for Config {
    /// 115200 8N1
    fn default() -> Self {
        Self { baudrate: 115200 }
    }
}

impl Config {
    pub const fn brr(&self, clock: u32) -> Option<u32> {
        brr(clock, self.baudrate)
    }
}

pub struct IrDa<S> {
    serial: S,
}

impl<S, E> IrDa<S>
where
    S: Read<u8, Error = E> + Write<u8, Error = E>,
{
    pub fn new(serial: S) -> Self {
        Self { serial }
    }

    pub fn send_char(&mut self, c: u8) -> Result<(), E> {
        nb::block!(self.serial.write(c))
    }

    pub fn send(&mut self, data: &[u8]) -> Result<(), E> {
        for &c in data {
            self.send_char(c)?;
        }
        nb::block!(self.serial.flush())
    }

    pub fn get_char(&mut self) -> Result<u8, E> {
        nb::block!(self.serial.read())
    }

    /// `Ok(None)` when nothing has arrived.
    pub fn try_get_char(&mut self) -> Result<Option<u8>, E> {
        match self.serial.read() {
            Ok(c) => Ok(Some(c)),
            Err(nb::Error::WouldBlock) => Ok(None),
            Err(nb::Error::Other(e)) => Err(e),
        }
    }

    pub fn release(self) -> S {
        self.serial
    }
}
