//! Acceptance filters.
//!
//! Each bank owns two 32-bit registers (FR1/FR2). Their meaning depends on
//! the bank's scale (one 32-bit or two 16-bit images per register) and mode
//! (id + mask, or a list of exact ids).

mod bit16;
mod bit32;

pub use bit16::{Bit16IdReg, Bit16MaskReg};
pub use bit32::{Bit32IdReg, Bit32MaskReg};

use super::CanFifo;

/// Filter mode, either identifier mask or identifier list
pub trait FilterMode {
    fn val_bool(&self) -> bool;
}

/// Matches the incoming ID to a predefined value after applying a predefined bit mask.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskMode;
/// Matches the incoming ID against a list of exact values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListMode;

impl FilterMode for MaskMode {
    fn val_bool(&self) -> bool {
        false
    }
}

impl FilterMode for ListMode {
    fn val_bool(&self) -> bool {
        true
    }
}

pub trait BitMode {
    fn val_bool(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Bit16Mode;
#[derive(Debug, Clone, Copy, Default)]
pub struct Bit32Mode;

impl BitMode for Bit16Mode {
    fn val_bool(&self) -> bool {
        false
    }
}

impl BitMode for Bit32Mode {
    fn val_bool(&self) -> bool {
        true
    }
}

/// One filter bank.
#[derive(Debug, Clone, Copy)]
pub struct CanFilter<BIT: BitMode, MODE: FilterMode> {
    /// Filter bank number, 0-27
    pub bank: usize,
    /// FR1 image
    pub id_value: u32,
    /// FR2 image. In list mode this holds more ids, like `id_value`.
    pub id_mask: u32,
    pub bit_mode: BIT,
    pub mode: MODE,
}

impl<BIT: BitMode, MODE: FilterMode> CanFilter<BIT, MODE> {
    pub fn set_bank(&mut self, bank: usize) -> &mut Self {
        self.bank = bank;

        self
    }

    /// Offset in `u32` words for bank `n` filter register 1
    pub fn fr_id_value_reg(&self) -> usize {
        self.bank * 2
    }

    /// Offset in `u32` words for bank `n` filter register 2
    pub fn fr_id_mask_reg(&self) -> usize {
        self.bank * 2 + 1
    }

    /// Bank-wide configuration bits for routing this filter to `fifo`.
    pub fn bank_config(&self, fifo: CanFifo) -> FilterBankConfig {
        FilterBankConfig {
            bank: self.bank,
            scale_32bit: self.bit_mode.val_bool(),
            list_mode: self.mode.val_bool(),
            fifo,
            active: true,
        }
    }
}

/// By default rtr is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterOptions {
    pub use_rtr: bool,
    pub use_extended_id: bool,
}

/// Bits of one bank in the shared filter configuration registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterBankConfig {
    pub bank: usize,
    pub scale_32bit: bool,
    pub list_mode: bool,
    pub fifo: CanFifo,
    pub active: bool,
}

impl FilterBankConfig {
    fn bit(&self) -> u32 {
        1 << self.bank
    }

    fn update(&self, current: u32, set: bool) -> u32 {
        if set {
            current | self.bit()
        } else {
            current & !self.bit()
        }
    }

    /// Filter mode register, set for list mode
    pub fn fmcfgr(&self, current: u32) -> u32 {
        self.update(current, self.list_mode)
    }

    /// Filter scale register, set for 32-bit scale
    pub fn fscfgr(&self, current: u32) -> u32 {
        self.update(current, self.scale_32bit)
    }

    /// FIFO assignment register, set for FIFO 1
    pub fn fafifor(&self, current: u32) -> u32 {
        self.update(current, self.fifo.val_bool())
    }

    /// Filter activation register
    pub fn fwr(&self, current: u32) -> u32 {
        self.update(current, self.active)
    }
}
