//! SPI TFT panels.
//!
//! [`st7735`] drives the panel itself; [`tft`] draws text and shapes on
//! anything that can open a pixel window and stream RGB565 into it.

pub mod st7735;
pub mod tft;

pub use st7735::{Config, Error, Instruction, St7735};
pub use tft::{PixelWindow, Tft};

/// Packs 8-bit channels into the panel's native 565 word.
///
/// The panel runs in BGR order, so red lands in the low bits.
pub const fn rgb(r: u8, g: u8, b: u8) -> u16 {
    (r as u16 >> 3) | ((g as u16 & 0xFC) << 3) | ((b as u16 & 0xF8) << 8)
}

pub const BLACK: u16 = rgb(0, 0, 0);
pub const WHITE: u16 = rgb(0xFF, 0xFF, 0xFF);
pub const RED: u16 = rgb(0xFF, 0, 0);
pub const GREEN: u16 = rgb(0, 0xFF, 0);
pub const BLUE: u16 = rgb(0, 0, 0xFF);
pub const PURPLE: u16 = rgb(0x80, 0, 0x80);
pub const YELLOW: u16 = rgb(0xFF, 0xFF, 0);
pub const CYAN: u16 = rgb(0, 0xFF, 0xFF);
pub const MAGENTA: u16 = rgb(0xFF, 0, 0xFF);
pub const ORANGE: u16 = rgb(0xFF, 0x80, 0);
