//! `smoltcp` PHY over the ECM bulk endpoints.
//!
//! Bulk OUT packets go into [`EcmDevice::on_bulk_out`]. Frames the interface
//! transmits wait in a small queue until the board pulls them with
//! [`EcmDevice::pop_frame`] and sends them as [`ecm::tx_chunks`].

use heapless::{Deque, Vec};
use smoltcp::phy::{self, DeviceCapabilities, Medium};
use smoltcp::time::Instant;

use super::ecm::{self, RxAssembler};
use super::MTU;

/// Frames the interface may queue before it has to wait for the host.
pub const TX_QUEUE_LEN: usize = 4;

pub type Frame = Vec<u8, MTU>;

#[derive(Default)]
pub struct EcmDevice {
    rx: RxAssembler<MTU>,
    tx: Deque<Frame, TX_QUEUE_LEN>,
}

impl EcmDevice {
    /// One packet from the bulk OUT endpoint.
    pub fn on_bulk_out(&mut self, packet: &[u8]) {
        self.rx.on_packet(packet);
    }

    /// Whether a received frame waits for the interface.
    pub fn rx_ready(&self) -> bool {
        self.rx.is_ready()
    }

    /// Oldest frame waiting for the bulk IN endpoint.
    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.tx.pop_front()
    }

    pub fn tx_pending(&self) -> usize {
        self.tx.len()
    }

    /// Bulk IN packets of the oldest waiting frame, handed to `send` one at a
    /// time. Returns false when nothing was waiting.
    pub fn send_next(&mut self, mut send: impl FnMut(&[u8])) -> bool {
        match self.tx.pop_front() {
            Some(frame) => {
                ecm::tx_chunks(&frame).for_each(&mut send);
                true
            }
            None => false,
        }
    }
}

impl phy::Device for EcmDevice {
    type RxToken<'a>
        = RxToken<'a>
    where
        Self: 'a;
    type TxToken<'a>
        = TxToken<'a>
    where
        Self: 'a;

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        if self.rx.is_ready() && !self.tx.is_full() {
            Some((RxToken { rx: &mut self.rx }, TxToken { tx: &mut self.tx }))
        } else {
            None
        }
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        if self.tx.is_full() {
            None
        } else {
            Some(TxToken { tx: &mut self.tx })
        }
    }

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.medium = Medium::Ethernet;
        caps.max_transmission_unit = MTU;
        caps.max_burst_size = Some(TX_QUEUE_LEN);
        caps
    }
}

pub struct RxToken<'a> {
    rx: &'a mut RxAssembler<MTU>,
}

impl<'a> phy::RxToken for RxToken<'a> {
    fn consume<R, F>(self, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let r = match self.rx.frame_mut() {
            Some(frame) => f(frame),
            None => f(&mut []),
        };
        self.rx.rearm();
        r
    }
}

pub struct TxToken<'a> {
    tx: &'a mut Deque<Frame, TX_QUEUE_LEN>,
}

impl<'a> phy::TxToken for TxToken<'a> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let mut frame = Frame::new();
        if frame.resize(len.min(MTU), 0).is_err() {
            warn!("ecm: frame of {=usize} bytes clipped", len);
        }
        let r = f(&mut frame);
        trace!("ecm: queued {=usize} byte frame", frame.len());
        if self.tx.push_back(frame).is_err() {
            warn!("ecm: tx queue full, frame dropped");
        }
        r
    }
}
