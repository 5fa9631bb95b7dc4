//! HX711 24-bit load-cell bridge ADC.
//!
//! Two-wire protocol: the chip pulls DOUT low when a conversion is ready,
//! then 24 clock pulses shift the result out MSB first. One to three extra
//! pulses select channel and gain for the next conversion.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

pub mod console;

/// Channel A at gain 128 is the power-on default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    /// Channel A, gain 128
    #[default]
    G128,
    /// Channel A, gain 64
    G64,
    /// Channel B, gain 32
    G32,
}

impl Gain {
    /// Extra clock pulses after the 24 data bits.
    pub const fn pulses(self) -> u8 {
        match self {
            Gain::G128 => 1,
            Gain::G64 => 3,
            Gain::G32 => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub gain: Gain,
    /// Counts per unit, times 100. `100` is a scale of 1.00.
    pub scale: i32,
    /// Raw reading subtracted before scaling
    pub offset: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gain: Gain::G128,
            scale: 100,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    Pin(E),
    /// A scale of zero would divide by zero.
    ZeroScale,
    /// An average over zero readings was requested.
    NoSamples,
}

/// Extends a 24-bit two's complement reading to `i32`.
pub const fn sign_extend(raw: u32) -> i32 {
    ((raw << 8) as i32) >> 8
}

pub struct Hx711<SCK, DT, D> {
    sck: SCK,
    dt: DT,
    delay: D,
    config: Config,
}

impl<SCK, DT, D, E> Hx711<SCK, DT, D>
where
    SCK: OutputPin<Error = E>,
    DT: InputPin<Error = E>,
    D: DelayNs,
{
    pub fn new(sck: SCK, dt: DT, delay: D, config: Config) -> Self {
        Self { sck, dt, delay, config }
    }

    pub fn release(self) -> (SCK, DT, D) {
        (self.sck, self.dt, self.delay)
    }

    pub fn is_ready(&mut self) -> Result<bool, Error<E>> {
        self.dt.is_low().map_err(Error::Pin)
    }

    /// Polls every `delay_ms` until a conversion is ready.
    pub fn wait_ready(&mut self, delay_ms: u32) -> Result<(), Error<E>> {
        while !self.is_ready()? {
            self.delay.delay_ms(delay_ms);
        }
        Ok(())
    }

    /// Polls at most `retries` times.
    pub fn wait_ready_retry(&mut self, retries: u8, delay_ms: u32) -> Result<bool, Error<E>> {
        for _ in 0..retries {
            if self.is_ready()? {
                return Ok(true);
            }
            self.delay.delay_ms(delay_ms);
        }
        Ok(false)
    }

    /// Polls until ready or until the summed delays reach `timeout_ms`.
    pub fn wait_ready_timeout(&mut self, timeout_ms: u32, delay_ms: u32) -> Result<bool, Error<E>> {
        let step = delay_ms.max(1);
        let mut elapsed = 0u32;

        while elapsed < timeout_ms {
            if self.is_ready()? {
                return Ok(true);
            }
            self.delay.delay_ms(delay_ms);
            elapsed = elapsed.saturating_add(step);
        }
        Ok(false)
    }

    fn pulse(&mut self) -> Result<(), Error<E>> {
        self.sck.set_high().map_err(Error::Pin)?;
        self.delay.delay_us(1);
        self.sck.set_low().map_err(Error::Pin)?;
        self.delay.delay_us(1);
        Ok(())
    }

    fn shift_in(&mut self) -> Result<u32, Error<E>> {
        let mut value = 0u32;

        for _ in 0..24 {
            self.sck.set_high().map_err(Error::Pin)?;
            self.delay.delay_us(1);
            let bit = self.dt.is_high().map_err(Error::Pin)?;
            value = (value << 1) | bit as u32;
            self.sck.set_low().map_err(Error::Pin)?;
            self.delay.delay_us(1);
        }

        for _ in 0..self.config.gain.pulses() {
            self.pulse()?;
        }

        Ok(value)
    }

    /// Blocks until a conversion is ready and reads it.
    ///
    /// The clock must not stay high for more than 60 µs or the chip powers
    /// down, so the transfer runs inside a critical section.
    pub fn read(&mut self) -> Result<i32, Error<E>> {
        self.wait_ready(1)?;

        let raw = critical_section::with(|_| self.shift_in())?;
        let value = sign_extend(raw);
        trace!("hx711: raw {=i32}", value);

        Ok(value)
    }

    pub fn read_average(&mut self, times: u8) -> Result<i32, Error<E>> {
        if times == 0 {
            return Err(Error::NoSamples);
        }

        let mut sum = 0i64;
        for _ in 0..times {
            sum += self.read()? as i64;
        }
        Ok((sum / times as i64) as i32)
    }

    /// Average reading minus the tare offset.
    pub fn get_value(&mut self, times: u8) -> Result<i32, Error<E>> {
        Ok(self.read_average(times)?.wrapping_sub(self.config.offset))
    }

    /// Scaled reading in whole units, rounded to nearest and saturated to
    /// the `i32` range.
    pub fn get_units(&mut self, times: u8) -> Result<i32, Error<E>> {
        let scale = self.checked_scale()?;
        Ok(div_round(self.get_value(times)? as i64 * 100, scale))
    }

    /// Scaled reading in hundredths of a unit, rounded and saturated like
    /// [`Self::get_units`].
    pub fn get_units_centi(&mut self, times: u8) -> Result<i32, Error<E>> {
        let scale = self.checked_scale()?;
        Ok(div_round(self.get_value(times)? as i64 * 10_000, scale))
    }

    fn checked_scale(&self) -> Result<i64, Error<E>> {
        match self.config.scale {
            0 => Err(Error::ZeroScale),
            scale => Ok(scale as i64),
        }
    }

    /// Takes the current load as zero.
    pub fn tare(&mut self, times: u8) -> Result<(), Error<E>> {
        let offset = self.read_average(times)?;
        debug!("hx711: tare offset {=i32}", offset);
        self.config.offset = offset;
        Ok(())
    }

    /// Sets the scale, times 100.
    pub fn set_scale(&mut self, scale: i32) -> Result<(), Error<E>> {
        if scale == 0 {
            return Err(Error::ZeroScale);
        }
        self.config.scale = scale;
        Ok(())
    }

    pub fn scale(&self) -> i32 {
        self.config.scale
    }

    pub fn set_offset(&mut self, offset: i32) {
        self.config.offset = offset;
    }

    pub fn offset(&self) -> i32 {
        self.config.offset
    }

    /// A low-to-high clock edge held high puts the chip to sleep.
    pub fn power_down(&mut self) -> Result<(), Error<E>> {
        self.sck.set_low().map_err(Error::Pin)?;
        self.sck.set_high().map_err(Error::Pin)
    }

    pub fn power_up(&mut self) -> Result<(), Error<E>> {
        self.sck.set_low().map_err(Error::Pin)
    }
}

/// `num / den` rounded half away from zero, saturated to `i32`. `den` is
/// never zero.
fn div_round(num: i64, den: i64) -> i32 {
    let (q, r) = (num / den, num % den);
    let q = if 2 * r.abs() >= den.abs() {
        q + if (num < 0) == (den < 0) { 1 } else { -1 }
    } else {
        q
    };
    q.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

#[cfg(test)]
pub(crate) mod tests {
    use std::vec::Vec;

    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State as PinState, Transaction as PinTransaction};

    use super::*;

    /// Pin expectations for one ready check followed by a full read.
    pub(crate) fn read_transactions(raw: u32, gain: Gain) -> (Vec<PinTransaction>, Vec<PinTransaction>) {
        let mut sck = Vec::new();
        let mut dt = vec![PinTransaction::get(PinState::Low)];

        for i in (0..24).rev() {
            sck.push(PinTransaction::set(PinState::High));
            dt.push(PinTransaction::get(if raw & (1 << i) != 0 {
                PinState::High
            } else {
                PinState::Low
            }));
            sck.push(PinTransaction::set(PinState::Low));
        }
        for _ in 0..gain.pulses() {
            sck.push(PinTransaction::set(PinState::High));
            sck.push(PinTransaction::set(PinState::Low));
        }

        (sck, dt)
    }

    pub(crate) fn scripted(raws: &[u32], gain: Gain) -> (PinMock, PinMock) {
        let mut sck = Vec::new();
        let mut dt = Vec::new();
        for &raw in raws {
            let (s, d) = read_transactions(raw, gain);
            sck.extend(s);
            dt.extend(d);
        }
        (PinMock::new(&sck), PinMock::new(&dt))
    }

    #[test]
    fn gain_pulses() {
        assert_eq!(Gain::G128.pulses(), 1);
        assert_eq!(Gain::G64.pulses(), 3);
        assert_eq!(Gain::G32.pulses(), 2);
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(0x7F_FFFF), 8_388_607);
        assert_eq!(sign_extend(0x80_0000), -8_388_608);
        assert_eq!(sign_extend(0xFF_FFFF), -1);
    }

    #[test]
    fn read_shifts_msb_first() {
        let (mut sck, mut dt) = scripted(&[0x12_3456], Gain::G64);
        let mut hx = Hx711::new(sck.clone(), dt.clone(), NoopDelay, Config {
            gain: Gain::G64,
            ..Default::default()
        });

        assert_eq!(hx.read(), Ok(0x12_3456));

        sck.done();
        dt.done();
    }

    #[test]
    fn negative_reading() {
        let (mut sck, mut dt) = scripted(&[0xFF_FF00], Gain::G128);
        let mut hx = Hx711::new(sck.clone(), dt.clone(), NoopDelay, Config::default());

        assert_eq!(hx.read(), Ok(-256));

        sck.done();
        dt.done();
    }

    #[test]
    fn tare_and_units() {
        let (mut sck, mut dt) = scripted(&[1000, 1000, 3000, 5000], Gain::G128);
        let mut hx = Hx711::new(sck.clone(), dt.clone(), NoopDelay, Config::default());

        hx.tare(2).unwrap();
        assert_eq!(hx.offset(), 1000);
        hx.set_scale(200).unwrap();
        // (3000 + 5000) / 2 - 1000 = 3000 counts at 2.00 counts per unit
        assert_eq!(hx.get_units(2), Ok(1500));

        sck.done();
        dt.done();
    }

    #[test]
    fn rounding_division() {
        assert_eq!(div_round(100_000, 300), 333);
        assert_eq!(div_round(100_100, 300), 334);
        assert_eq!(div_round(-100_100, 300), -334);
        assert_eq!(div_round(100_100, -300), -334);
        assert_eq!(div_round(150, 100), 2);
        assert_eq!(div_round(-150, 100), -2);
        assert_eq!(div_round(i64::MAX / 2, 1), i32::MAX);
        assert_eq!(div_round(i64::MIN / 2, 1), i32::MIN);
    }

    #[test]
    fn units_round_and_saturate() {
        let (mut sck, mut dt) = scripted(&[1001, 0x7F_FFFF], Gain::G128);
        let mut hx = Hx711::new(sck.clone(), dt.clone(), NoopDelay, Config::default());

        hx.set_scale(300).unwrap();
        // 1001 counts at 3.00 counts per unit is 333.67
        assert_eq!(hx.get_units(1), Ok(334));
        hx.set_scale(1).unwrap();
        assert_eq!(hx.get_units_centi(1), Ok(i32::MAX));

        sck.done();
        dt.done();
    }

    #[test]
    fn zero_scale_and_zero_samples_are_rejected() {
        let mut sck = PinMock::new(&[]);
        let mut dt = PinMock::new(&[]);
        let mut hx = Hx711::new(sck.clone(), dt.clone(), NoopDelay, Config::default());

        assert_eq!(hx.set_scale(0), Err(Error::ZeroScale));
        assert_eq!(hx.scale(), 100);
        assert_eq!(hx.read_average(0), Err(Error::NoSamples));

        sck.done();
        dt.done();
    }

    #[test]
    fn bounded_waits() {
        let mut sck = PinMock::new(&[]);
        let mut dt = PinMock::new(&[
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::Low),
        ]);
        let mut hx = Hx711::new(sck.clone(), dt.clone(), NoopDelay, Config::default());

        assert_eq!(hx.wait_ready_retry(2, 5), Ok(false));
        assert_eq!(hx.wait_ready_timeout(10, 5), Ok(false));
        assert_eq!(hx.wait_ready_timeout(10, 5), Ok(true));

        sck.done();
        dt.done();
    }

    #[test]
    fn power_sequences() {
        let mut sck = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let mut dt = PinMock::new(&[]);
        let mut hx = Hx711::new(sck.clone(), dt.clone(), NoopDelay, Config::default());

        hx.power_down().unwrap();
        hx.power_up().unwrap();

        sck.done();
        dt.done();
    }
}
