use embedded_can::Id;

/// A classic CAN frame, data or remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanFrame {
    pub(crate) id: Id,
    pub(crate) dlc: usize,
    pub(crate) data: [u8; 8],
    pub(crate) is_remote: bool,
}

impl CanFrame {
    pub fn new(id: impl Into<Id>, raw_data: &[u8]) -> Option<Self> {
        if raw_data.len() > 8 {
            return None;
        }

        let mut data = [0; 8];
        data[..raw_data.len()].copy_from_slice(raw_data);

        Some(CanFrame {
            id: id.into(),
            dlc: raw_data.len(),
            data,
            is_remote: false,
        })
    }

    pub fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > 8 {
            return None;
        }

        Some(CanFrame {
            id: id.into(),
            dlc,
            data: [0; 8],
            is_remote: true,
        })
    }

    /// Builds a frame from the two mailbox data words, low byte first.
    pub(crate) fn new_from_data_registers(id: impl Into<Id>, frame_data_unordered: u64, dlc: usize) -> Self {
        let dlc = dlc.min(8);
        let mut data: [u8; 8] = [0; 8];

        data.iter_mut().take(dlc).enumerate().for_each(|(i, byte)| {
            *byte = ((frame_data_unordered >> (i * 8)) & 0xFF) as u8;
        });

        Self {
            id: id.into(),
            data,
            dlc,
            is_remote: false,
        }
    }

    /// Return ID
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Return length of `data`
    pub fn dlc(&self) -> usize {
        self.dlc
    }

    /// Payload bytes, empty for remote frames
    pub fn data(&self) -> &[u8] {
        if self.is_remote {
            &[]
        } else {
            &self.data[..self.dlc]
        }
    }

    pub fn is_remote(&self) -> bool {
        self.is_remote
    }
}

impl embedded_can::Frame for CanFrame {
    fn new(id: impl Into<Id>, raw_data: &[u8]) -> Option<Self> {
        CanFrame::new(id, raw_data)
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        CanFrame::new_remote(id, dlc)
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.is_remote
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlc
    }

    fn data(&self) -> &[u8] {
        CanFrame::data(self)
    }
}
