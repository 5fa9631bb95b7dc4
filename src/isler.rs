//! Frames for the CH5xx iSLER radio link.
//!
//! A node broadcasts a BLE-style advertisement that carries a small remote
//! command in its manufacturer data, on each of the three advertising
//! channels. The gateway listens, checks the advertiser address and decodes
//! the command.

/// Encoded size of a [`MessDataFrame`].
pub const DATA_FRAME_LEN: usize = 30;
/// Encoded size of an [`IslerFrame`].
pub const FRAME_LEN: usize = 65;
/// Encoded size of a [`RemoteCommand`].
pub const COMMAND_LEN: usize = 9;
pub const PAYLOAD_LEN: usize = 16;
pub const NAME_LEN: usize = 20;

/// Bytes the receiver puts in front of a frame: RSSI and length.
pub const RX_META_LEN: usize = 2;

pub const ADV_CHANNELS: [u8; 3] = [37, 38, 39];

pub const NODE_MAC: [u8; 6] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
pub const NODE_NAME: &[u8] = b"bee-555";

const ADV_FLAGS: [u8; 3] = [0x02, 0x01, 0x06];
const NAME_TYPE: u8 = 0x09;
/// Manufacturer specific data, company 0x07D7.
const SERVICE_DATA: [u8; 3] = [0xFF, 0xD7, 0x07];

// mac, flags, name length and type, name, data length, service data
const HEADER_LEN: usize = 6 + 3 + 2 + NAME_LEN + 1 + 3;
const PAYLOAD_OFFSET: usize = HEADER_LEN + DATA_FRAME_LEN - PAYLOAD_LEN;

pub mod command {
    /// A button press; `value1` counts wakeups.
    pub const BUTTON: u8 = 0xAA;
    pub const LED_LOAD: u8 = 0xBB;
    pub const PING: u8 = 0xF1;
    pub const PONG: u8 = 0xF2;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RemoteCommand {
    pub command: u8,
    pub value1: u32,
    pub value2: u32,
}

impl RemoteCommand {
    pub const fn new(command: u8, value1: u32, value2: u32) -> Self {
        Self {
            command,
            value1,
            value2,
        }
    }

    pub fn to_bytes(&self) -> [u8; COMMAND_LEN] {
        let mut out = [0; COMMAND_LEN];
        out[0] = self.command;
        out[1..5].copy_from_slice(&self.value1.to_le_bytes());
        out[5..9].copy_from_slice(&self.value2.to_le_bytes());
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        let buf = buf.get(..COMMAND_LEN)?;
        Some(Self {
            command: buf[0],
            value1: u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]),
            value2: u32::from_le_bytes([buf[5], buf[6], buf[7], buf[8]]),
        })
    }

    /// What the gateway sends back: a ping is answered with a pong carrying
    /// the same values.
    pub fn reply(&self) -> Option<Self> {
        match self.command {
            command::PING => Some(Self { command: command::PONG, ..*self }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessDataFrame {
    pub preamble: u16,
    pub control: u16,
    pub msg_code: u16,
    pub dest: [u8; 6],
    pub group_id: u8,
    pub data_len: u8,
    pub payload: [u8; PAYLOAD_LEN],
}

impl Default for MessDataFrame {
    /// Broadcast header used by the demo nodes, with an empty command.
    fn default() -> Self {
        Self {
            preamble: 0xA1A2,
            control: 0xB1B2,
            msg_code: 0xC1C2,
            dest: [0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6],
            group_id: 0x55,
            data_len: COMMAND_LEN as u8,
            payload: [0; PAYLOAD_LEN],
        }
    }
}

impl MessDataFrame {
    pub fn set_command(&mut self, cmd: &RemoteCommand) {
        self.payload = [0; PAYLOAD_LEN];
        self.payload[..COMMAND_LEN].copy_from_slice(&cmd.to_bytes());
        self.data_len = COMMAND_LEN as u8;
    }

    pub fn command(&self) -> Option<RemoteCommand> {
        RemoteCommand::from_bytes(&self.payload)
    }

    pub fn encode(&self, out: &mut [u8; DATA_FRAME_LEN]) {
        out[0..2].copy_from_slice(&self.preamble.to_le_bytes());
        out[2..4].copy_from_slice(&self.control.to_le_bytes());
        out[4..6].copy_from_slice(&self.msg_code.to_le_bytes());
        out[6..12].copy_from_slice(&self.dest);
        out[12] = self.group_id;
        out[13] = self.data_len;
        out[14..30].copy_from_slice(&self.payload);
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        let buf = buf.get(..DATA_FRAME_LEN)?;
        let mut dest = [0; 6];
        dest.copy_from_slice(&buf[6..12]);
        let mut payload = [0; PAYLOAD_LEN];
        payload.copy_from_slice(&buf[14..30]);
        Some(Self {
            preamble: u16::from_le_bytes([buf[0], buf[1]]),
            control: u16::from_le_bytes([buf[2], buf[3]]),
            msg_code: u16::from_le_bytes([buf[4], buf[5]]),
            dest,
            group_id: buf[12],
            data_len: buf[13],
            payload,
        })
    }
}

/// An advertisement carrying a [`MessDataFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IslerFrame {
    pub mac: [u8; 6],
    pub name: [u8; NAME_LEN],
    pub data: MessDataFrame,
}

impl Default for IslerFrame {
    /// [`NODE_MAC`] named [`NODE_NAME`].
    fn default() -> Self {
        Self::new(NODE_MAC, NODE_NAME)
    }
}

impl IslerFrame {
    /// `name` is cut to 20 bytes and padded with zeros.
    pub fn new(mac: [u8; 6], name: &[u8]) -> Self {
        let mut padded = [0; NAME_LEN];
        let len = name.len().min(NAME_LEN);
        padded[..len].copy_from_slice(&name[..len]);
        Self {
            mac,
            name: padded,
            data: MessDataFrame::default(),
        }
    }

    pub fn with_command(mut self, cmd: &RemoteCommand) -> Self {
        self.data.set_command(cmd);
        self
    }

    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut out = [0; FRAME_LEN];
        out[0..6].copy_from_slice(&self.mac);
        out[6..9].copy_from_slice(&ADV_FLAGS);
        out[9] = (NAME_LEN + 1) as u8;
        out[10] = NAME_TYPE;
        out[11..31].copy_from_slice(&self.name);
        out[31] = (DATA_FRAME_LEN + SERVICE_DATA.len()) as u8;
        out[32..35].copy_from_slice(&SERVICE_DATA);

        let mut data = [0; DATA_FRAME_LEN];
        self.data.encode(&mut data);
        out[HEADER_LEN..].copy_from_slice(&data);
        out
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        let buf = buf.get(..FRAME_LEN)?;
        if buf[32..35] != SERVICE_DATA {
            return None;
        }
        let mut mac = [0; 6];
        mac.copy_from_slice(&buf[0..6]);
        let mut name = [0; NAME_LEN];
        name.copy_from_slice(&buf[11..31]);
        Some(Self {
            mac,
            name,
            data: MessDataFrame::decode(&buf[HEADER_LEN..])?,
        })
    }
}

/// RSSI of a received buffer, from the first metadata byte.
pub fn rx_rssi(buf: &[u8]) -> Option<i8> {
    buf.first().map(|&b| b as i8)
}

/// Command in a buffer handed over by the receiver, if it was sent by
/// `target_mac`.
pub fn decode_rx(buf: &[u8], target_mac: &[u8; 6]) -> Option<RemoteCommand> {
    let frame = buf.get(RX_META_LEN..)?;
    if frame.get(..6)? != target_mac {
        return None;
    }
    let cmd = RemoteCommand::from_bytes(frame.get(PAYLOAD_OFFSET..)?)?;
    debug!(
        "isler: cmd {=u8:#x} v1 {=u32} v2 {=u32}",
        cmd.command, cmd.value1, cmd.value2
    );
    Some(cmd)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phy {
    #[default]
    Phy1M,
    Phy2M,
    CodedS2,
    CodedS8,
}

/// The radio's raw transmit primitive.
pub trait RadioTx {
    type Error;

    fn transmit(&mut self, frame: &[u8], channel: u8, phy: Phy) -> Result<(), Self::Error>;
}

/// Broadcasts commands from one node.
pub struct Advertiser<R> {
    radio: R,
    frame: IslerFrame,
    phy: Phy,
}

impl<R: RadioTx> Advertiser<R> {
    pub fn new(radio: R, frame: IslerFrame, phy: Phy) -> Self {
        Self { radio, frame, phy }
    }

    pub fn release(self) -> R {
        self.radio
    }

    /// Sends `cmd` once on every advertising channel.
    pub fn send(&mut self, cmd: &RemoteCommand) -> Result<(), R::Error> {
        let frame = self.frame.with_command(cmd).encode();
        for channel in ADV_CHANNELS {
            trace!("isler: tx on channel {=u8}", channel);
            self.radio.transmit(&frame, channel, self.phy)?;
        }
        Ok(())
    }
}
