//! bxCAN-style controller: frames, filters, bit timing and mailbox images.

mod can;
mod enums;
pub mod filter;
mod frame;
pub mod mailbox;
pub mod timing;

pub use can::{Can, Config, Registers};
pub use embedded_can::{ExtendedId, Id, StandardId};
pub use enums::{CanError, CanFifo, CanMode, TxStatus};
pub use filter::{Bit16Mode, Bit32Mode, CanFilter, FilterBankConfig, FilterOptions, ListMode, MaskMode};
pub use frame::CanFrame;
pub use timing::{Baud, BitTiming};

/// Extended identifier sent by the demo node.
pub const DEMO_EXT_ID: u32 = 0x0BAD_C0DE;
/// Standard identifier sent by the demo node.
pub const DEMO_STD_ID: u16 = 0x123;
/// Demo payload.
pub const DEMO_DATA: [u8; 8] = [0xFE, 0x7A, 0xBE, 0xE5, 0xC0, 0xFF, 0xEE, 0x45];
