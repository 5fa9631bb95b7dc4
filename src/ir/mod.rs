//! Infrared remote control: NEC send and receive, plus IrDA serial.

pub mod irda;
pub mod nec;
pub mod receiver;

pub use nec::{Carrier, NecFrame, NecSender, PwmCarrier, SoftCarrier};
pub use receiver::NecReceiver;
