use super::enums::*;
use super::filter::{BitMode, CanFilter, FilterBankConfig, FilterMode};
use super::mailbox::{self, MailboxRegs};
use super::timing::{Baud, BitTiming};
use super::CanFrame;

const CAN_TX_TIMEOUT: u32 = 0xFFF;

/// Register access used by [`Can`].
///
/// A board crate implements this over its CAN peripheral. Every method maps
/// to a plain register read or write; the protocol logic stays here.
pub trait Registers {
    /// Enter init mode, write BTIMR, leave init mode.
    fn configure(&mut self, btimr: u32);
    /// Program one filter bank inside filter init mode.
    fn write_filter(&mut self, bank: FilterBankConfig, fr1: u32, fr2: u32);
    fn tstatr(&self) -> u32;
    /// Write-1-to-clear on TSTATR.
    fn clear_tstatr(&mut self, mask: u32);
    /// Load data, length and finally the identifier word (with TXRQ).
    fn write_mailbox(&mut self, mailbox: usize, regs: MailboxRegs, txmir: u32);
    fn rfifo(&self, fifo: CanFifo) -> u32;
    fn read_fifo(&self, fifo: CanFifo) -> MailboxRegs;
    /// Set RFOM so the next pending frame moves up.
    fn release_fifo(&mut self, fifo: CanFifo);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub timing: BitTiming,
    pub mode: CanMode,
    pub fifo: CanFifo,
}

impl Default for Config {
    /// 500 kbit/s at 72 MHz, normal mode, FIFO 0
    fn default() -> Self {
        Self {
            timing: Baud::K500.timing(),
            mode: CanMode::Normal,
            fifo: CanFifo::Fifo0,
        }
    }
}

pub struct Can<R: Registers> {
    regs: R,
    fifo: CanFifo,
    last_mailbox_used: usize,
}

impl<R: Registers> Can<R> {
    pub fn new(mut regs: R, config: Config) -> Self {
        regs.configure(config.timing.btimr_with_mode(config.mode));
        debug!("can: btimr {=u32:#x}", config.timing.btimr_with_mode(config.mode));

        Self {
            regs,
            fifo: config.fifo,
            last_mailbox_used: usize::MAX,
        }
    }

    /// Routes frames matching `filter` into this instance's FIFO.
    pub fn add_filter<BIT: BitMode, MODE: FilterMode>(&mut self, filter: &CanFilter<BIT, MODE>) {
        self.regs
            .write_filter(filter.bank_config(self.fifo), filter.id_value, filter.id_mask);
    }

    /// Puts a frame in the transmit buffer to be sent on the bus.
    ///
    /// Returns `Err(WouldBlock)` if all three mailboxes are busy. Pending
    /// frames are never replaced, so the `Ok` value is always `None`.
    pub fn transmit(&mut self, frame: &CanFrame) -> nb::Result<Option<CanFrame>, CanError> {
        let mailbox_num = match mailbox::free_mailbox(self.regs.tstatr()) {
            Some(n) => n,
            None => return Err(nb::Error::WouldBlock),
        };

        let image = MailboxRegs::from_frame(frame);
        self.regs.clear_tstatr(mailbox::clear_request_mask(mailbox_num));
        self.regs.write_mailbox(mailbox_num, image, image.request());
        self.last_mailbox_used = mailbox_num;
        trace!("can: queued in mailbox {=usize}", mailbox_num);

        Ok(None)
    }

    /// Retrieves status of the last frame transmission
    pub fn transmit_status(&self) -> TxStatus {
        if self.last_mailbox_used > 2 {
            return TxStatus::OtherError;
        }

        for _ in 0..CAN_TX_TIMEOUT {
            if let Some(status) = mailbox::tx_status(self.regs.tstatr(), self.last_mailbox_used) {
                return status;
            }
        }

        TxStatus::TimeoutError
    }

    /// Returns a received frame if available.
    pub fn receive(&mut self) -> nb::Result<CanFrame, CanError> {
        let rfifo = self.regs.rfifo(self.fifo);
        if mailbox::fifo_overrun(rfifo) {
            warn!("can: fifo {=usize} overrun", self.fifo.val());
        }
        if mailbox::fifo_pending(rfifo) == 0 {
            return Err(nb::Error::WouldBlock);
        }

        let frame = self.regs.read_fifo(self.fifo).to_frame();
        self.regs.release_fifo(self.fifo);

        Ok(frame)
    }

    pub fn release(self) -> R {
        self.regs
    }
}

impl<R: Registers> embedded_can::nb::Can for Can<R> {
    type Frame = CanFrame;
    type Error = CanError;

    fn transmit(&mut self, frame: &Self::Frame) -> nb::Result<Option<Self::Frame>, Self::Error> {
        Can::transmit(self, frame)
    }

    fn receive(&mut self) -> nb::Result<Self::Frame, Self::Error> {
        Can::receive(self)
    }
}
