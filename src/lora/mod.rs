//! Semtech SX126x LoRa transceiver.
//!
//! Commands are small structs that encode themselves into an SPI frame and
//! name the type of their reply. The driver polls the BUSY line before every
//! frame.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::{Operation, SpiDevice};

use crate::time::Hertz;

pub mod cmds;
pub mod commands;

pub use commands::*;

use cmds::irq;

/// Opcode, parameters and reply of the longest frame: a full buffer write.
const FRAME_LEN: usize = 2 + 256;

pub trait Response {
    fn decode(buf: &[u8]) -> Self;
    fn expected_len() -> usize {
        1
    }
}

pub trait Command {
    type Response: Response;
    /// Replies start after one status byte unless the reply is the status.
    const STATUS_PREFIX: bool = true;
    fn encode(&self, buf: &mut [u8]) -> usize;
}

impl Response for () {
    fn decode(_buf: &[u8]) -> Self {}
    fn expected_len() -> usize {
        0
    }
}

impl Response for u8 {
    fn decode(buf: &[u8]) -> Self {
        buf[0]
    }
}

impl Response for u16 {
    fn decode(buf: &[u8]) -> Self {
        u16::from_be_bytes([buf[0], buf[1]])
    }
    fn expected_len() -> usize {
        2
    }
}

impl Response for (u8, u8) {
    fn decode(buf: &[u8]) -> Self {
        (buf[0], buf[1])
    }
    fn expected_len() -> usize {
        2
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Status(pub u8);

impl Response for Status {
    fn decode(buf: &[u8]) -> Self {
        Self(buf[0])
    }
}

impl Status {
    pub const MODE_STBY_RC: u8 = 0x02;
    pub const MODE_STBY_XOSC: u8 = 0x03;
    pub const MODE_FS: u8 = 0x04;
    pub const MODE_RX: u8 = 0x05;
    pub const MODE_TX: u8 = 0x06;

    pub fn command_status(&self) -> u8 {
        (self.0 & 0b1110) >> 1
    }

    pub fn chip_mode(&self) -> u8 {
        (self.0 & 0b0111_0000) >> 4
    }

    /// Timeout, processing error or failure to execute.
    pub fn is_error(&self) -> bool {
        (3..=5).contains(&self.command_status())
    }

    pub fn is_data_ready(&self) -> bool {
        self.command_status() == 0x02
    }

    pub fn is_standby_rc(&self) -> bool {
        self.chip_mode() == Self::MODE_STBY_RC
    }
}

impl core::fmt::Debug for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Status")
            .field("error", &self.is_error())
            .field("command_status", &self.command_status())
            .field("chip_mode", &self.chip_mode())
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Status {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Status {{ command_status: {=u8}, chip_mode: {=u8} }}",
            self.command_status(),
            self.chip_mode()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    Spi(E),
    Pin,
    /// BUSY stayed high.
    Busy,
    /// TX_DONE never came.
    TxTimeout,
    PayloadTooLong,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Config {
    pub frequency: Hertz,
    pub modulation: SetModulationParams,
    pub packet: SetLoRaPacketParams,
    pub pa_config: SetPaConfig,
    pub tx_params: SetTxParams,
    pub sync_word: u16,
    pub use_dio2_as_rfswitch: bool,
    pub use_dcdc: bool,
    /// TCXO supply voltage and startup delay in ms.
    pub dio3_as_tcxo_ctrl: Option<(TcxoVoltage, u32)>,
    /// BUSY reads, 10 µs apart, before a command gives up.
    pub busy_polls: u32,
    /// IRQ status reads, 1 ms apart, while waiting for TX_DONE.
    pub tx_polls: u32,
}

impl Default for Config {
    /// 915 MHz, SF7/125 kHz, 14 dBm
    fn default() -> Self {
        Self {
            frequency: Hertz::mhz(915),
            modulation: SetModulationParams::LORA_DEFAULT,
            packet: SetLoRaPacketParams::DEFAULT,
            pa_config: SetPaConfig::POWER_14DBM,
            tx_params: SetTxParams::new(14, RampTime::_800U),
            sync_word: cmds::LORA_SYNC_WORD_PRIVATE,
            use_dio2_as_rfswitch: true,
            use_dcdc: true,
            dio3_as_tcxo_ctrl: None,
            busy_polls: 10_000,
            tx_polls: 5_000,
        }
    }
}

pub struct Sx126x<SPI, BUSY, RST, D> {
    spi: SPI,
    busy: BUSY,
    rst: RST,
    delay: D,
    config: Config,
}

impl<SPI, BUSY, RST, D> Sx126x<SPI, BUSY, RST, D>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    RST: OutputPin,
    D: DelayNs,
{
    pub fn new(spi: SPI, busy: BUSY, rst: RST, delay: D, config: Config) -> Self {
        Self {
            spi,
            busy,
            rst,
            delay,
            config,
        }
    }

    pub fn release(self) -> (SPI, BUSY, RST, D) {
        (self.spi, self.busy, self.rst, self.delay)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn reset(&mut self) -> Result<(), Error<SPI::Error>> {
        self.rst.set_low().map_err(|_| Error::Pin)?;
        self.delay.delay_ms(100);
        self.rst.set_high().map_err(|_| Error::Pin)?;
        self.delay.delay_ms(100);
        Ok(())
    }

    /// Brings the radio up in LoRa mode on the configured channel.
    pub fn init(&mut self) -> Result<(), Error<SPI::Error>> {
        let config = self.config;

        self.send_command(SetStandby::RC)?;

        if let Some((voltage, delay_ms)) = config.dio3_as_tcxo_ctrl {
            self.send_command(SetDIO3AsTCXOCtrl::new(voltage, delay_ms))?;
            self.send_command(ClearDeviceErrors)?;
            self.send_command(Calibrate::ALL)?;
        }
        if config.use_dio2_as_rfswitch {
            self.send_command(SetDIO2AsRfSwitchCtrl(true))?;
        }
        if config.use_dcdc {
            self.send_command(SetRegulatorMode::DCDC)?;
        }

        self.send_command(SetBufferBaseAddress::default())?;
        self.send_command(SetPacketType::LORA)?;
        self.send_command(SetRfFrequency::from(config.frequency))?;
        self.send_command(CalibrateImage::for_freq(config.frequency))?;
        self.send_command(config.modulation)?;
        self.send_command(config.packet)?;
        self.set_sync_word(config.sync_word)?;
        self.send_command(config.pa_config)?;
        self.send_command(config.tx_params)?;
        self.send_command(SetDioIrqParams::DEFAULT)?;

        let status = self.get_status()?;
        info!(
            "sx126x: up at {=u32} Hz, mode {=u8}",
            config.frequency.to_Hz(),
            status.chip_mode()
        );
        Ok(())
    }

    /// Transmits `payload` and blocks until TX_DONE.
    pub fn send(&mut self, payload: &[u8]) -> Result<(), Error<SPI::Error>> {
        if payload.len() > u8::MAX as usize {
            return Err(Error::PayloadTooLong);
        }

        self.write_buffer(0, payload)?;
        self.send_command(self.config.packet.with_payload_len(payload.len() as u8))?;
        self.send_command(ClearIrqStatus(irq::ALL))?;
        self.send_command(SetTx::default())?;

        for _ in 0..self.config.tx_polls {
            if self.get_irq_status()? & irq::TX_DONE != 0 {
                self.send_command(ClearIrqStatus(irq::TX_DONE))?;
                debug!("sx126x: sent {=usize} bytes", payload.len());
                return Ok(());
            }
            self.delay.delay_ms(1);
        }

        warn!("sx126x: no TX_DONE");
        Err(Error::TxTimeout)
    }

    /// Listens until told otherwise.
    pub fn set_rx_continuous(&mut self) -> Result<(), Error<SPI::Error>> {
        self.send_command(SetDioIrqParams::DEFAULT)?;
        self.send_command(self.config.packet.with_payload_len(0xFF))?;
        self.send_command(ClearIrqStatus(irq::ALL))?;
        self.send_command(SetRx::CONTINUOUS)
    }

    /// `(length, buffer offset)` of a freshly received packet.
    ///
    /// Packets failing their CRC are dropped.
    pub fn parse_packet(&mut self) -> Result<Option<(u8, u8)>, Error<SPI::Error>> {
        let status = self.get_irq_status()?;
        if status & irq::RX_DONE == 0 {
            return Ok(None);
        }
        self.send_command(ClearIrqStatus(irq::RX_DONE | irq::CRC_ERR | irq::HEADER_ERR))?;

        if status & (irq::CRC_ERR | irq::HEADER_ERR) != 0 {
            warn!("sx126x: dropped corrupt packet, irq {=u16:#x}", status);
            return Ok(None);
        }

        let (len, offset) = self.send_command(GetRxBufferStatus)?;
        Ok((len > 0).then_some((len, offset)))
    }

    /// Copies a packet found by [`parse_packet`](Self::parse_packet) into `buf`.
    pub fn received_message(&mut self, buf: &mut [u8], len: u8, offset: u8) -> Result<PacketStatus, Error<SPI::Error>> {
        let len = (len as usize).min(buf.len());
        self.read_buffer(offset, &mut buf[..len])?;
        self.send_command(GetPacketStatus)
    }

    pub fn get_status(&mut self) -> Result<Status, Error<SPI::Error>> {
        self.send_command(GetStatus)
    }

    pub fn get_irq_status(&mut self) -> Result<u16, Error<SPI::Error>> {
        self.send_command(GetIrqStatus)
    }

    pub fn get_device_errors(&mut self) -> Result<u16, Error<SPI::Error>> {
        self.send_command(GetDeviceErrors)
    }

    pub fn set_sync_word(&mut self, sync_word: u16) -> Result<(), Error<SPI::Error>> {
        self.write_registers(cmds::regs::LORA_SYNC_WORD_MSB, &sync_word.to_be_bytes())
    }

    pub fn write_registers(&mut self, address: u16, data: &[u8]) -> Result<(), Error<SPI::Error>> {
        if data.len() > FRAME_LEN - 3 {
            return Err(Error::PayloadTooLong);
        }
        self.send_command(WriteRegister { address, data })
    }

    pub fn read_registers(&mut self, address: u16, data: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        let [hi, lo] = address.to_be_bytes();
        self.wait_busy()?;
        self.spi
            .transaction(&mut [
                Operation::Write(&[cmds::READ_REGISTER, hi, lo, cmds::NOP]),
                Operation::Read(data),
            ])
            .map_err(Error::Spi)
    }

    pub fn write_buffer(&mut self, offset: u8, data: &[u8]) -> Result<(), Error<SPI::Error>> {
        if data.len() > FRAME_LEN - 2 {
            return Err(Error::PayloadTooLong);
        }
        self.send_command(WriteBuffer { offset, data })
    }

    pub fn read_buffer(&mut self, offset: u8, data: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        self.wait_busy()?;
        self.spi
            .transaction(&mut [
                Operation::Write(&[cmds::READ_BUFFER, offset, cmds::NOP]),
                Operation::Read(data),
            ])
            .map_err(Error::Spi)
    }

    /// Clocks one command frame and decodes its reply.
    pub fn send_command<C: Command>(&mut self, cmd: C) -> Result<C::Response, Error<SPI::Error>> {
        let mut buf = [0u8; FRAME_LEN];
        let len = cmd.encode(&mut buf);
        let reply_at = if C::STATUS_PREFIX { len + 1 } else { len };
        let reply_len = C::Response::expected_len();
        let total = if reply_len == 0 { len } else { reply_at + reply_len };

        self.wait_busy()?;
        self.spi.transfer_in_place(&mut buf[..total]).map_err(Error::Spi)?;

        Ok(C::Response::decode(&buf[reply_at.min(total)..total]))
    }

    fn wait_busy(&mut self) -> Result<(), Error<SPI::Error>> {
        for _ in 0..self.config.busy_polls {
            if !self.busy.is_high().map_err(|_| Error::Pin)? {
                return Ok(());
            }
            self.delay.delay_us(10);
        }
        error!("sx126x: busy timeout");
        Err(Error::Busy)
    }
}
