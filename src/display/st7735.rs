//! ST7735 TFT controller over a 4-wire SPI bus.
//!
//! Chip select belongs to the [`SpiDevice`]; DC selects command (low) or
//! data (high).

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;

use super::tft::{PixelWindow, Tft};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Instruction {
    SWRESET = 0x01,
    SLPIN = 0x10,
    SLPOUT = 0x11,
    NORON = 0x13,
    INVOFF = 0x20,
    INVON = 0x21,
    DISPOFF = 0x28,
    DISPON = 0x29,
    CASET = 0x2A,
    RASET = 0x2B,
    RAMWR = 0x2C,
    MADCTL = 0x36,
    COLMOD = 0x3A,
    GAMCTRP = 0xE0,
    GAMCTRN = 0xE1,
}

/// Row address order.
pub const MADCTL_MY: u8 = 0x80;
/// Column address order.
pub const MADCTL_MX: u8 = 0x40;
/// Row/column exchange.
pub const MADCTL_MV: u8 = 0x20;
/// Vertical refresh order.
pub const MADCTL_ML: u8 = 0x10;
/// BGR when clear.
pub const MADCTL_RGB: u8 = 0x08;

/// 16 bits per pixel.
pub const COLMOD_16BIT: u8 = 0x05;

const GAMMA_POSITIVE: [u8; 16] = [
    0x09, 0x16, 0x09, 0x20, 0x21, 0x1B, 0x13, 0x19, 0x17, 0x15, 0x1E, 0x2B, 0x04, 0x05, 0x02, 0x0E,
];
const GAMMA_NEGATIVE: [u8; 16] = [
    0x0B, 0x14, 0x08, 0x1E, 0x22, 0x1D, 0x18, 0x1E, 0x1B, 0x1A, 0x24, 0x2B, 0x06, 0x06, 0x02, 0x0F,
];

/// Pixels converted per SPI write.
const CHUNK_PIXELS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    Spi(E),
    Pin,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Config {
    pub width: u16,
    pub height: u16,
    /// Column offset of the visible area in controller RAM.
    pub x_offset: u16,
    /// Row offset of the visible area in controller RAM.
    pub y_offset: u16,
    pub madctl: u8,
}

impl Default for Config {
    /// 160x80 landscape panel
    fn default() -> Self {
        Self {
            width: 160,
            height: 80,
            x_offset: 1,
            y_offset: 26,
            madctl: MADCTL_MY | MADCTL_MV,
        }
    }
}

pub struct St7735<SPI, DC, RST> {
    spi: SPI,
    dc: DC,
    rst: RST,
    config: Config,
}

impl<SPI, DC, RST> St7735<SPI, DC, RST>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
{
    pub fn new(spi: SPI, dc: DC, rst: RST, config: Config) -> Self {
        Self { spi, dc, rst, config }
    }

    pub fn release(self) -> (SPI, DC, RST) {
        (self.spi, self.dc, self.rst)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Holds RST low for 100 ms.
    pub fn hard_reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error<SPI::Error>> {
        self.rst.set_low().map_err(|_| Error::Pin)?;
        delay.delay_ms(100);
        self.rst.set_high().map_err(|_| Error::Pin)
    }

    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error<SPI::Error>> {
        self.command(Instruction::SWRESET, &[])?;
        delay.delay_ms(110);
        self.command(Instruction::SLPOUT, &[])?;
        delay.delay_ms(20);

        self.command(Instruction::COLMOD, &[COLMOD_16BIT])?;
        self.command(Instruction::INVON, &[])?;
        self.command(Instruction::NORON, &[])?;
        self.command(Instruction::MADCTL, &[self.config.madctl])?;
        self.command(Instruction::GAMCTRP, &GAMMA_POSITIVE)?;
        self.command(Instruction::GAMCTRN, &GAMMA_NEGATIVE)?;
        self.command(Instruction::DISPON, &[])?;

        debug!("st7735: up, {=u16}x{=u16}", self.config.width, self.config.height);
        Ok(())
    }

    /// Sends one instruction followed by its parameters.
    pub fn command(&mut self, instruction: Instruction, params: &[u8]) -> Result<(), Error<SPI::Error>> {
        self.dc.set_low().map_err(|_| Error::Pin)?;
        self.spi.write(&[instruction as u8]).map_err(Error::Spi)?;
        if params.is_empty() {
            return Ok(());
        }
        self.dc.set_high().map_err(|_| Error::Pin)?;
        self.spi.write(params).map_err(Error::Spi)
    }

    pub fn set_display_on(&mut self, on: bool) -> Result<(), Error<SPI::Error>> {
        let instruction = if on { Instruction::DISPON } else { Instruction::DISPOFF };
        self.command(instruction, &[])
    }

    /// Sleep in or out. Leaving sleep needs 120 ms before the next sleep-in.
    pub fn set_sleep(&mut self, sleep: bool) -> Result<(), Error<SPI::Error>> {
        let instruction = if sleep { Instruction::SLPIN } else { Instruction::SLPOUT };
        self.command(instruction, &[])
    }

    pub fn set_inverted(&mut self, inverted: bool) -> Result<(), Error<SPI::Error>> {
        let instruction = if inverted { Instruction::INVON } else { Instruction::INVOFF };
        self.command(instruction, &[])
    }

    /// Opens the inclusive window `(x0, y0)..=(x1, y1)` and starts a RAM write.
    pub fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), Error<SPI::Error>> {
        // controller addresses stop at 0xFFFF
        let (xo, yo) = (self.config.x_offset, self.config.y_offset);
        self.command(Instruction::CASET, &address_pair(x0.saturating_add(xo), x1.saturating_add(xo)))?;
        self.command(Instruction::RASET, &address_pair(y0.saturating_add(yo), y1.saturating_add(yo)))?;
        self.command(Instruction::RAMWR, &[])
    }

    /// Streams native 565 words into the open window, MSB first.
    pub fn write_pixels(&mut self, pixels: &[u16]) -> Result<(), Error<SPI::Error>> {
        self.dc.set_high().map_err(|_| Error::Pin)?;

        let mut buf = [0u8; CHUNK_PIXELS * 2];
        for chunk in pixels.chunks(CHUNK_PIXELS) {
            for (dst, px) in buf.chunks_exact_mut(2).zip(chunk) {
                dst.copy_from_slice(&px.to_be_bytes());
            }
            self.spi.write(&buf[..chunk.len() * 2]).map_err(Error::Spi)?;
        }

        Ok(())
    }
}

fn address_pair(start: u16, end: u16) -> [u8; 4] {
    let [s0, s1] = start.to_be_bytes();
    let [e0, e1] = end.to_be_bytes();
    [s0, s1, e0, e1]
}

/// Converts to the panel's BGR word layout.
pub fn native_color(color: Rgb565) -> u16 {
    color.r() as u16 | (color.g() as u16) << 5 | (color.b() as u16) << 11
}

impl<SPI, DC, RST> PixelWindow for St7735<SPI, DC, RST>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
{
    type Error = Error<SPI::Error>;

    fn dimensions(&self) -> (u16, u16) {
        (self.config.width, self.config.height)
    }

    fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), Self::Error> {
        St7735::set_window(self, x0, y0, x1, y1)
    }

    fn write_pixels(&mut self, pixels: &[u16]) -> Result<(), Self::Error> {
        St7735::write_pixels(self, pixels)
    }
}

impl<SPI, DC, RST> OriginDimensions for St7735<SPI, DC, RST>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
{
    fn size(&self) -> Size {
        Size::new(self.config.width as u32, self.config.height as u32)
    }
}

impl<SPI, DC, RST> DrawTarget for St7735<SPI, DC, RST>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
{
    type Color = Rgb565;
    type Error = Error<SPI::Error>;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let bounds = self.bounding_box();
        for Pixel(point, color) in pixels {
            if !bounds.contains(point) {
                continue;
            }
            let (x, y) = (point.x as u16, point.y as u16);
            St7735::set_window(self, x, y, x, y)?;
            St7735::write_pixels(self, &[native_color(color)])?;
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if area.is_zero_sized() {
            return Ok(());
        }
        self.fill_rect(
            area.top_left.x,
            area.top_left.y,
            area.size.width as i32,
            area.size.height as i32,
            native_color(color),
        )
    }
}
