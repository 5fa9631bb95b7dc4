#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CanError {
    /// The receive FIFO was overrun.
    Overrun,
    // MAC sublayer errors
    /// The monitored bit value differs from the bit value sent.
    Bit,
    /// Bit stuffing error, more than 5 equal bits
    Stuff,
    /// The CRC of a received message does not match the calculated one.
    Crc,
    /// Form error, a fixed format part of a received message has wrong format
    Form,
    /// The transmitted message was not acknowledged by another node.
    Acknowledge,
    /// Controller is in Bus_Off state.
    BusOff,
    /// Controller is in the Error_Passive state.
    BusPassive,
    /// At least one error counter has reached the warning limit of 96.
    BusWarning,
    /// Timeout error.
    Timeout,
}

impl CanError {
    /// Decodes the LEC field (bits 4..=6) of the error status register.
    pub fn from_lec(errsr: u32) -> Option<Self> {
        match (errsr >> 4) & 0b111 {
            1 => Some(Self::Stuff),
            2 => Some(Self::Form),
            3 => Some(Self::Acknowledge),
            4 | 5 => Some(Self::Bit),
            6 => Some(Self::Crc),
            _ => None,
        }
    }
}

impl core::fmt::Display for CanError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Overrun => write!(f, "Receive FIFO overrun"),
            Self::Bit => write!(f, "Monitored bit differs from the bit sent"),
            Self::Stuff => write!(f, "Sixth consecutive equal bit detected"),
            Self::Crc => write!(f, "CRC mismatch on received frame"),
            Self::Form => write!(f, "Illegal bit in a fixed-form field"),
            Self::Acknowledge => write!(f, "Frame was not acknowledged"),
            Self::BusOff => write!(f, "Controller is bus off"),
            Self::BusPassive => write!(f, "Controller is error passive"),
            Self::BusWarning => write!(f, "Error counter reached the warning limit"),
            Self::Timeout => write!(f, "Operation timed out"),
        }
    }
}

impl From<CanError> for embedded_can::ErrorKind {
    fn from(err: CanError) -> Self {
        match err {
            CanError::Overrun => embedded_can::ErrorKind::Overrun,
            CanError::Bit => embedded_can::ErrorKind::Bit,
            CanError::Stuff => embedded_can::ErrorKind::Stuff,
            CanError::Crc => embedded_can::ErrorKind::Crc,
            CanError::Form => embedded_can::ErrorKind::Form,
            CanError::Acknowledge => embedded_can::ErrorKind::Acknowledge,
            CanError::BusOff | CanError::BusPassive | CanError::BusWarning | CanError::Timeout => {
                embedded_can::ErrorKind::Other
            }
        }
    }
}

impl embedded_can::Error for CanError {
    fn kind(&self) -> embedded_can::ErrorKind {
        (*self).into()
    }
}

/// Test modes of the controller, set through BTIMR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CanMode {
    Normal,
    Silent,
    Loopback,
    SilentLoopback,
}

pub(crate) struct CanModeRegs {
    /// Loopback mode setting
    pub(crate) lbkm: bool,
    /// Silent mode setting
    pub(crate) silm: bool,
}

impl CanMode {
    pub(crate) fn regs(&self) -> CanModeRegs {
        match self {
            CanMode::Normal => CanModeRegs {
                lbkm: false,
                silm: false,
            },
            CanMode::Silent => CanModeRegs {
                lbkm: false,
                silm: true,
            },
            CanMode::Loopback => CanModeRegs {
                lbkm: true,
                silm: false,
            },
            CanMode::SilentLoopback => CanModeRegs { lbkm: true, silm: true },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CanFifo {
    Fifo0,
    Fifo1,
}

impl CanFifo {
    pub fn val(&self) -> usize {
        match self {
            CanFifo::Fifo0 => 0,
            CanFifo::Fifo1 => 1,
        }
    }

    pub fn val_bool(&self) -> bool {
        matches!(self, CanFifo::Fifo1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStatus {
    /// Message was sent correctly
    Sent,
    /// Message wasn't sent correctly due to send timeout
    TimeoutError,
    /// Message wasn't sent correctly due to arbitration
    ArbitrationError,
    /// Message wasn't sent correctly due to error
    OtherError,
}
