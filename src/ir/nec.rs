//! NEC frame encoding and carrier keying.
//!
//! A frame is a 9 ms leader mark, a 4.5 ms space, 32 data bits and a stop
//! mark. Every bit is a 560 µs mark of 38 kHz carrier; the following space
//! encodes the value.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::time::Hertz;

pub const LEADER_MARK_US: u32 = 9000;
pub const LEADER_SPACE_US: u32 = 4500;
pub const PULSE_WIDTH_US: u32 = 560;
pub const LOGIC_1_SPACE_US: u32 = 1690;
pub const LOGIC_0_SPACE_US: u32 = 560;
pub const STOP_SPACE_US: u32 = 1000;

pub const CARRIER: Hertz = Hertz::khz(38);
/// Half period of the software carrier, 38 kHz rounded.
pub const HALF_PERIOD_US: u32 = 13;

/// Pulses per frame: leader, 32 bits and stop.
pub const PULSES: usize = 34;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NecFrame {
    pub address: u16,
    pub command: u16,
}

impl Default for NecFrame {
    fn default() -> Self {
        Self {
            address: 0x00FF,
            command: 0xA56D,
        }
    }
}

impl NecFrame {
    pub const fn new(address: u16, command: u16) -> Self {
        Self { address, command }
    }

    /// `(mark_us, space_us)` pairs of the whole frame.
    pub fn pulses(&self) -> impl Iterator<Item = (u32, u32)> {
        let word = ((self.address as u32) << 16) | self.command as u32;

        core::iter::once((LEADER_MARK_US, LEADER_SPACE_US))
            .chain((0..32).rev().map(move |i| {
                let space = if word & (1 << i) != 0 {
                    LOGIC_1_SPACE_US
                } else {
                    LOGIC_0_SPACE_US
                };
                (PULSE_WIDTH_US, space)
            }))
            .chain(core::iter::once((PULSE_WIDTH_US, STOP_SPACE_US)))
    }
}

/// Timer period for the carrier, e.g. 1263 at 48 MHz.
pub fn carrier_period(sysclk: Hertz) -> u16 {
    (sysclk / CARRIER).min(u16::MAX as u32) as u16
}

/// 50 % compare value for [`carrier_period`], rounded up.
pub fn carrier_duty(period: u16) -> u16 {
    period.div_ceil(2)
}

/// Something that can emit a burst of modulated carrier.
pub trait Carrier {
    type Error;

    /// Keys the carrier for `duration_us`, leaving the output idle after.
    fn mark<D: DelayNs>(&mut self, duration_us: u32, delay: &mut D) -> Result<(), Self::Error>;
}

/// Hardware carrier: a timer channel already running at [`CARRIER`].
pub struct PwmCarrier<P: SetDutyCycle> {
    pwm: P,
}

impl<P: SetDutyCycle> PwmCarrier<P> {
    pub fn new(mut pwm: P) -> Result<Self, P::Error> {
        pwm.set_duty_cycle_fully_off()?;
        Ok(Self { pwm })
    }

    pub fn release(self) -> P {
        self.pwm
    }
}

impl<P: SetDutyCycle> Carrier for PwmCarrier<P> {
    type Error = P::Error;

    fn mark<D: DelayNs>(&mut self, duration_us: u32, delay: &mut D) -> Result<(), Self::Error> {
        self.pwm.set_duty_cycle_percent(50)?;
        delay.delay_us(duration_us);
        self.pwm.set_duty_cycle_fully_off()
    }
}

/// Bit-banged carrier on a plain output pin.
pub struct SoftCarrier<P: OutputPin> {
    pin: P,
}

impl<P: OutputPin> SoftCarrier<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> Carrier for SoftCarrier<P> {
    type Error = P::Error;

    fn mark<D: DelayNs>(&mut self, duration_us: u32, delay: &mut D) -> Result<(), Self::Error> {
        let cycles = duration_us / (HALF_PERIOD_US * 2);

        for _ in 0..cycles {
            self.pin.set_high()?;
            delay.delay_us(HALF_PERIOD_US);
            self.pin.set_low()?;
            delay.delay_us(HALF_PERIOD_US);
        }

        self.pin.set_low()
    }
}

pub struct NecSender<C: Carrier, D: DelayNs> {
    carrier: C,
    delay: D,
}

impl<C: Carrier, D: DelayNs> NecSender<C, D> {
    pub fn new(carrier: C, delay: D) -> Self {
        Self { carrier, delay }
    }

    pub fn send(&mut self, frame: &NecFrame) -> Result<(), C::Error> {
        debug!("ir: send {=u16:#x} {=u16:#x}", frame.address, frame.command);

        for (mark, space) in frame.pulses() {
            self.carrier.mark(mark, &mut self.delay)?;
            self.delay.delay_us(space);
        }

        Ok(())
    }

    pub fn release(self) -> (C, D) {
        (self.carrier, self.delay)
    }
}
