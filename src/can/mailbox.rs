//! Transmit mailbox and receive FIFO register images.

use embedded_can::{ExtendedId, Id, StandardId};

use super::{CanFrame, TxStatus};

/// Identifier extension bit of TXMIR/RXMIR.
pub const IDE: u32 = 1 << 2;
/// Remote transmission request bit of TXMIR/RXMIR.
pub const RTR: u32 = 1 << 1;
/// Transmit request bit of TXMIR.
pub const TXRQ: u32 = 1 << 0;

const RQCP: u32 = 1 << 0;
const TXOK: u32 = 1 << 1;
const ALST: u32 = 1 << 2;
const TERR: u32 = 1 << 3;
const TME0: u32 = 1 << 26;

/// FIFO message pending count in RFIFOx.
const FMP_MASK: u32 = 0b11;
/// FIFO overrun flag in RFIFOx.
const FOVR: u32 = 1 << 4;
/// Release output mailbox bit in RFIFOx.
pub const RFOM: u32 = 1 << 5;

pub fn encode_id(id: Id) -> u32 {
    match id {
        Id::Extended(id) => (id.as_raw() << 3) | IDE,
        Id::Standard(id) => (id.as_raw() as u32) << 21,
    }
}

pub fn decode_id(mir: u32) -> Id {
    if mir & IDE != 0 {
        Id::Extended(ExtendedId::new(mir >> 3).unwrap_or(ExtendedId::ZERO))
    } else {
        Id::Standard(StandardId::new((mir >> 21) as u16).unwrap_or(StandardId::ZERO))
    }
}

/// Splits a payload into the low and high data words, first byte lowest.
pub fn pack_data(data: &[u8]) -> (u32, u32) {
    let mut bytes = [0u8; 8];
    let len = data.len().min(8);
    bytes[..len].copy_from_slice(&data[..len]);

    (
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
    )
}

pub fn unpack_data(dlr: u32, dhr: u32, dlc: usize) -> [u8; 8] {
    let mut data = [0u8; 8];
    data[..4].copy_from_slice(&dlr.to_le_bytes());
    data[4..].copy_from_slice(&dhr.to_le_bytes());
    data[dlc.min(8)..].fill(0);
    data
}

/// First empty mailbox according to TME0..TME2 of TSTATR.
pub fn free_mailbox(tstatr: u32) -> Option<usize> {
    (0..3).find(|&mb| tstatr & (TME0 << mb) != 0)
}

fn mailbox_status(tstatr: u32, mailbox: usize) -> u32 {
    (tstatr >> (mailbox * 8)) & 0xFF
}

/// Request completed, transmitted, and the mailbox is empty again.
pub fn message_sent(tstatr: u32, mailbox: usize) -> bool {
    if mailbox > 2 {
        return false;
    }
    let status = mailbox_status(tstatr, mailbox);
    status & (RQCP | TXOK) == (RQCP | TXOK) && tstatr & (TME0 << mailbox) != 0
}

/// Outcome of the last request on `mailbox`, `None` while still pending.
pub fn tx_status(tstatr: u32, mailbox: usize) -> Option<TxStatus> {
    if mailbox > 2 {
        return Some(TxStatus::OtherError);
    }
    let status = mailbox_status(tstatr, mailbox);
    if status & RQCP == 0 {
        None
    } else if status & TXOK != 0 {
        Some(TxStatus::Sent)
    } else if status & ALST != 0 {
        Some(TxStatus::ArbitrationError)
    } else {
        // TERR, or completed without any flag
        Some(TxStatus::OtherError)
    }
}

/// Write-1-to-clear mask for the status bits of `mailbox`.
pub fn clear_request_mask(mailbox: usize) -> u32 {
    (RQCP | TXOK | ALST | TERR) << (mailbox * 8)
}

/// Frames waiting in a receive FIFO.
pub fn fifo_pending(rfifo: u32) -> u8 {
    (rfifo & FMP_MASK) as u8
}

pub fn fifo_overrun(rfifo: u32) -> bool {
    rfifo & FOVR != 0
}

/// Register image of one mailbox: identifier, length, and two data words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MailboxRegs {
    pub mir: u32,
    pub mdtr: u32,
    pub mdlr: u32,
    pub mdhr: u32,
}

impl MailboxRegs {
    /// Identifier word without TXRQ; see [`MailboxRegs::request`].
    pub fn from_frame(frame: &CanFrame) -> Self {
        let mut mir = encode_id(frame.id);
        if frame.is_remote {
            mir |= RTR;
        }
        let (mdlr, mdhr) = pack_data(frame.data());

        Self {
            mir,
            mdtr: frame.dlc as u32 & 0xF,
            mdlr,
            mdhr,
        }
    }

    /// Identifier word with the transmit request set.
    pub fn request(&self) -> u32 {
        self.mir | TXRQ
    }

    pub fn to_frame(&self) -> CanFrame {
        let id = decode_id(self.mir);
        let dlc = (self.mdtr & 0xF) as usize;

        if self.mir & RTR != 0 {
            CanFrame {
                id,
                dlc: dlc.min(8),
                data: [0; 8],
                is_remote: true,
            }
        } else {
            let data = ((self.mdhr as u64) << 32) | self.mdlr as u64;
            CanFrame::new_from_data_registers(id, data, dlc)
        }
    }

    /// Filter match index of a received frame (RXMDTR bits 8..=15).
    pub fn filter_match_index(&self) -> u8 {
        (self.mdtr >> 8) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::can::{DEMO_DATA, DEMO_EXT_ID, DEMO_STD_ID};

    #[test]
    fn id_words() {
        let ext = Id::Extended(ExtendedId::new(DEMO_EXT_ID).unwrap());
        assert_eq!(encode_id(ext), (0x0BAD_C0DE << 3) | IDE);
        assert_eq!(decode_id(encode_id(ext)), ext);

        let std = Id::Standard(StandardId::new(DEMO_STD_ID).unwrap());
        assert_eq!(encode_id(std), 0x123 << 21);
        assert_eq!(decode_id(encode_id(std) | TXRQ), std);
    }

    #[test]
    fn data_words_little_endian() {
        let (lo, hi) = pack_data(&DEMO_DATA);
        assert_eq!(lo, 0xE5BE_7AFE);
        assert_eq!(hi, 0x45EE_FFC0);
        assert_eq!(unpack_data(lo, hi, 8), DEMO_DATA);
        assert_eq!(unpack_data(lo, hi, 2), [0xFE, 0x7A, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn mailbox_selection() {
        assert_eq!(free_mailbox(0), None);
        assert_eq!(free_mailbox(0b111 << 26), Some(0));
        assert_eq!(free_mailbox(0b110 << 26), Some(1));
        assert_eq!(free_mailbox(0b100 << 26), Some(2));
    }

    #[test]
    fn sent_needs_rqcp_txok_and_tme() {
        let tstatr = (0b11 << 8) | (TME0 << 1);
        assert!(message_sent(tstatr, 1));
        assert!(!message_sent(0b11 << 8, 1));
        assert!(!message_sent(tstatr, 0));
        assert_eq!(tx_status(tstatr, 1), Some(TxStatus::Sent));
        assert_eq!(tx_status(0b101, 0), Some(TxStatus::ArbitrationError));
        assert_eq!(tx_status(0, 0), None);
        assert_eq!(clear_request_mask(2), 0x0F << 16);
    }

    #[test]
    fn frame_images() {
        let id = ExtendedId::new(DEMO_EXT_ID).unwrap();
        let frame = CanFrame::new(id, &DEMO_DATA).unwrap();
        let regs = MailboxRegs::from_frame(&frame);
        assert_eq!(regs.mdtr, 8);
        assert_eq!(regs.request() & TXRQ, TXRQ);
        assert_eq!(regs.to_frame(), frame);

        let remote = CanFrame::new_remote(StandardId::new(0x42).unwrap(), 3).unwrap();
        let regs = MailboxRegs::from_frame(&remote);
        assert_eq!(regs.mir & RTR, RTR);
        assert_eq!(regs.to_frame(), remote);
    }

    #[test]
    fn fifo_status() {
        assert_eq!(fifo_pending(0b10_0011), 3);
        assert!(fifo_overrun(FOVR));
    }
}
