#![cfg_attr(not(test), no_std)]
#![allow(unexpected_cfgs)]
//! Peripheral recipes and small drivers for WCH CH32V/CH32X/CH5xx parts.
//!
//! Everything here is either protocol logic or a driver generic over the
//! `embedded-hal` 1.0 traits. Register programming is left to a board crate
//! such as `ch32-hal`; DMA buffers are filled by pure functions that such a
//! crate hands to its DMA engine.

// This must go FIRST so that all the other modules see its macros.
mod macros;

pub mod time;

pub mod debug;
pub mod delay;

pub mod adc;
pub mod can;
pub mod dac;
pub mod display;
pub mod hx711;
pub mod imu;
pub mod ir;
pub mod isler;
pub mod lora;
pub mod net;
pub mod power;
pub mod rtc;
pub mod ws2812;

pub mod prelude {
    pub use embedded_can::Frame as _;
    pub use embedded_hal::delay::DelayNs as _;
    pub use embedded_hal::digital::{InputPin as _, OutputPin as _};

    pub use crate::display::tft::Tft as _;
    pub use crate::time::U32Ext as _;
}
