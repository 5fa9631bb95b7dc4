//! DAC, Digital to Analog Converter
//!
//! Three ways to drive the dual 12-bit DAC: a custom waveform streamed by
//! circular DMA on a timer trigger, the built-in triangle generator, and
//! plain software writes to the holding registers.

use crate::time::Hertz;

/// DAC full scale.
pub const DAC_MAX: u16 = 0xFFF;

/// Samples in one period of the custom waveform.
pub const DAC_BUF_SIZE: usize = 2048;

/// Period of the custom waveform.
pub const WAVE_PERIOD_US: u32 = 300_000;

/// `(ch1, ch2)` values stepped through in software trigger mode.
pub const SOFTWARE_STEPS: [(u16, u16); 3] = [(0, 2047), (1023, 4095), (2047, 0)];

/// Word for the dual-channel right-aligned holding register: channel 1 in
/// bits 11..0, channel 2 in bits 27..16. Values clamp to 12 bits.
pub const fn dual_channel_word(ch1: u16, ch2: u16) -> u32 {
    let ch1 = if ch1 > DAC_MAX { DAC_MAX } else { ch1 };
    let ch2 = if ch2 > DAC_MAX { DAC_MAX } else { ch2 };
    ((ch2 as u32) << 16) | ch1 as u32
}

/// Peak of the hardware triangle wave, the MAMP field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriangleAmplitude(u8);

impl TriangleAmplitude {
    pub const MAX: Self = Self(11);

    /// `mamp` in 0..=11
    pub const fn new(mamp: u8) -> Option<Self> {
        if mamp <= 11 {
            Some(Self(mamp))
        } else {
            None
        }
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Peak output code, `2^(mamp+1) - 1`.
    pub const fn amplitude(&self) -> u16 {
        (1 << (self.0 + 1)) - 1
    }

    /// Smallest setting whose peak reaches `peak`, saturating at full scale.
    pub fn at_least(peak: u16) -> Self {
        (0..=11)
            .map(Self)
            .find(|a| a.amplitude() >= peak)
            .unwrap_or(Self::MAX)
    }
}

pub mod wave {
    use micromath::F32Ext;

    use super::{dual_channel_word, DAC_MAX};

    const TAU: f32 = core::f32::consts::PI * 2.0;

    /// One period of a sine on channel 2 and a cosine on channel 1, both
    /// shifted into `0..=0xFFF`.
    pub fn compute_waves(buf: &mut [u32]) {
        let len = buf.len() as f32;
        for (i, word) in buf.iter_mut().enumerate() {
            let t = i as f32 / len;
            let sin = (F32Ext::sin(TAU * t) + 1.0) / 2.0;
            let cos = (F32Ext::cos(TAU * t) + 1.0) / 2.0;
            *word = dual_channel_word(scale(cos), scale(sin));
        }
    }

    fn scale(unit: f32) -> u16 {
        (unit * DAC_MAX as f32) as u16
    }
}

/// Trigger timer arithmetic.
pub mod timer {
    use crate::time::Hertz;

    /// PSC for a counter ticking at `tick`, `sysclk / tick - 1`.
    pub fn prescaler_for_tick(sysclk: Hertz, tick: Hertz) -> u16 {
        let div = (sysclk / tick).max(1) - 1;
        div.min(u16::MAX as u32) as u16
    }

    /// ATRLR so that `samples` updates span `period_us`, rounded to nearest.
    pub fn reload_for_period(period_us: u32, samples: u32, tick_us: u32) -> u16 {
        let step = (samples * tick_us).max(1);
        let ticks = (period_us + step / 2) / step;
        ticks.saturating_sub(1).min(u16::MAX as u32) as u16
    }
}

/// Timer settings for the custom waveform on a given core clock: 10 µs
/// ticks, [`DAC_BUF_SIZE`] samples per [`WAVE_PERIOD_US`].
pub fn wave_timer(sysclk: Hertz) -> (u16, u16) {
    (
        timer::prescaler_for_tick(sysclk, Hertz::khz(100)),
        timer::reload_for_period(WAVE_PERIOD_US, DAC_BUF_SIZE as u32, 10),
    )
}
