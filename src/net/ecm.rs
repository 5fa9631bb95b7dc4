//! CDC-ECM function glue: class requests, the connection notification and
//! splitting Ethernet frames into full-speed bulk packets.
//!
//! The USB device stack itself belongs to the board crate; it forwards class
//! requests to [`EcmControl`] and bulk OUT data to [`RxAssembler`], and sends
//! [`tx_chunks`] on the IN endpoint.

/// Class-specific requests, CDC ECM 1.2 section 6.2.
pub mod request {
    pub const SET_ETHERNET_MULTICAST_FILTERS: u8 = 0x40;
    pub const SET_ETHERNET_POWER_MANAGEMENT_PATTERN_FILTER: u8 = 0x41;
    pub const GET_ETHERNET_POWER_MANAGEMENT_PATTERN_FILTER: u8 = 0x42;
    pub const SET_ETHERNET_PACKET_FILTER: u8 = 0x43;
    pub const GET_ETHERNET_STATISTIC: u8 = 0x44;
}

pub const EP_NOTIFY: u8 = 1;
pub const EP_RECV: u8 = 2;
pub const EP_SEND: u8 = 3;

pub const NOTIFY_INTERFACE: u16 = 0;

/// Full-speed bulk max packet size.
pub const MAX_PACKET_SIZE: usize = 64;

const NETWORK_CONNECTION: u8 = 0x00;
const CONNECTED: u16 = 1;
const REQUEST_TYPE_CLASS_INTERFACE_IN: u8 = 0xA1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlResponse {
    Ack,
    Nak,
}

/// An 8-byte notification on the interrupt endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Notification {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl Notification {
    pub const fn network_connection(interface: u16) -> Self {
        Self {
            request_type: REQUEST_TYPE_CLASS_INTERFACE_IN,
            request: NETWORK_CONNECTION,
            value: CONNECTED,
            index: interface,
            length: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; 8] {
        let [v0, v1] = self.value.to_le_bytes();
        let [i0, i1] = self.index.to_le_bytes();
        let [l0, l1] = self.length.to_le_bytes();
        [self.request_type, self.request, v0, v1, i0, i1, l0, l1]
    }
}

/// Control-side state of the ECM function.
#[derive(Default)]
pub struct EcmControl {
    pending: Option<Notification>,
    connected: bool,
}

impl EcmControl {
    /// Handles a class request addressed to the communication interface.
    ///
    /// SET_ETHERNET_PACKET_FILTER is the one the host cannot do without;
    /// answering it queues the NETWORK_CONNECTION notification.
    pub fn handle_class_request(&mut self, code: u8, index: u16) -> ControlResponse {
        match code {
            request::SET_ETHERNET_PACKET_FILTER => {
                debug!("ecm: packet filter set, interface {=u16}", index);
                self.pending = Some(Notification::network_connection(index));
                ControlResponse::Ack
            }
            request::SET_ETHERNET_MULTICAST_FILTERS
            | request::SET_ETHERNET_POWER_MANAGEMENT_PATTERN_FILTER
            | request::GET_ETHERNET_POWER_MANAGEMENT_PATTERN_FILTER
            | request::GET_ETHERNET_STATISTIC => ControlResponse::Ack,
            _ => ControlResponse::Nak,
        }
    }

    /// The notification to send on [`EP_NOTIFY`], if one is due.
    pub fn take_notification(&mut self) -> Option<[u8; 8]> {
        let notification = self.pending.take()?;
        self.connected = true;
        Some(notification.to_bytes())
    }

    /// True once the host has been told the link is up.
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Collects bulk OUT packets into one Ethernet frame.
///
/// A packet shorter than [`MAX_PACKET_SIZE`] ends the frame. Until the frame
/// is taken, further packets are dropped.
pub struct RxAssembler<const N: usize = { super::MTU }> {
    buf: [u8; N],
    len: usize,
    busy: bool,
}

impl<const N: usize> Default for RxAssembler<N> {
    fn default() -> Self {
        Self {
            buf: [0; N],
            len: 0,
            busy: false,
        }
    }
}

impl<const N: usize> RxAssembler<N> {
    pub fn on_packet(&mut self, data: &[u8]) {
        if self.busy {
            trace!("ecm: busy, dropped {=usize} bytes", data.len());
            return;
        }
        if self.len + data.len() > N {
            warn!("ecm: frame overflow, discarding");
            self.len = 0;
            return;
        }

        self.buf[self.len..self.len + data.len()].copy_from_slice(data);
        self.len += data.len();
        if data.len() < MAX_PACKET_SIZE {
            self.busy = true;
        }
    }

    pub fn is_ready(&self) -> bool {
        self.busy
    }

    /// The completed frame, in place.
    pub fn frame_mut(&mut self) -> Option<&mut [u8]> {
        if self.busy {
            Some(&mut self.buf[..self.len])
        } else {
            None
        }
    }

    /// Drops the completed frame and accepts packets again.
    pub fn rearm(&mut self) {
        self.len = 0;
        self.busy = false;
    }

    /// Copies a completed frame into `out` and rearms the assembler.
    pub fn take(&mut self, out: &mut [u8]) -> Option<usize> {
        if !self.busy {
            return None;
        }

        let len = self.len.min(out.len());
        out[..len].copy_from_slice(&self.buf[..len]);
        self.rearm();
        Some(len)
    }
}

/// Bulk IN packets for one frame, ending with a zero-length packet when the
/// frame fills its last packet exactly.
pub fn tx_chunks(frame: &[u8]) -> TxChunks<'_> {
    TxChunks { frame, pos: 0, zlp: false }
}

pub struct TxChunks<'a> {
    frame: &'a [u8],
    pos: usize,
    zlp: bool,
}

impl<'a> Iterator for TxChunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos < self.frame.len() {
            let end = (self.pos + MAX_PACKET_SIZE).min(self.frame.len());
            let chunk = &self.frame[self.pos..end];
            self.pos = end;
            self.zlp = chunk.len() == MAX_PACKET_SIZE && end == self.frame.len();
            return Some(chunk);
        }
        if self.zlp {
            self.zlp = false;
            return Some(&[]);
        }
        None
    }
}
