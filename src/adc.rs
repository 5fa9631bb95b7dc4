//! ADC, Analog to Digital Converter
//!
//! Clock, sample time and sequence arithmetic for the regular channel group,
//! plus a reader that drains a circular DMA buffer in chunks.

use crate::time::Hertz;

/// ADC bit resolution
pub const ADC_BITS: u8 = 12;
pub const ADC_MAX: u32 = (1 << ADC_BITS) - 1;

// No calibration data, voltage should be 1.2V (1.16 to 1.24)
pub const VREF_INT: u32 = 1200;

/// Highest ADC clock the converter is rated for.
pub const ADC_CLOCK_MAX: Hertz = Hertz::mhz(14);

/// Sampling period of one conversion, in ADC clock cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SampleTime {
    CYCLES3 = 0,
    CYCLES9 = 1,
    CYCLES15 = 2,
    CYCLES30 = 3,
    CYCLES43 = 4,
    CYCLES57 = 5,
    CYCLES73 = 6,
    CYCLES241 = 7,
}

impl SampleTime {
    const ALL: [Self; 8] = [
        Self::CYCLES3,
        Self::CYCLES9,
        Self::CYCLES15,
        Self::CYCLES30,
        Self::CYCLES43,
        Self::CYCLES57,
        Self::CYCLES73,
        Self::CYCLES241,
    ];

    pub const fn cycles(&self) -> u16 {
        match self {
            Self::CYCLES3 => 3,
            Self::CYCLES9 => 9,
            Self::CYCLES15 => 15,
            Self::CYCLES30 => 30,
            Self::CYCLES43 => 43,
            Self::CYCLES57 => 57,
            Self::CYCLES73 => 73,
            Self::CYCLES241 => 241,
        }
    }

    /// SMP field value.
    pub const fn bits(&self) -> u8 {
        *self as u8
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        Self::ALL.get(bits as usize).copied()
    }

    /// Shortest sample time of at least `cycles`, or the longest one.
    pub fn from_cycles(cycles: u16) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.cycles() >= cycles)
            .unwrap_or(Self::CYCLES241)
    }
}

/// ADCPRE, the PCLK2 divider feeding the ADC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcClockDiv {
    Div2,
    Div4,
    Div6,
    Div8,
}

impl AdcClockDiv {
    pub const fn divisor(&self) -> u32 {
        match self {
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div6 => 6,
            Self::Div8 => 8,
        }
    }

    /// Fastest divider that keeps the ADC clock within [`ADC_CLOCK_MAX`].
    pub fn for_pclk2(pclk2: Hertz) -> Self {
        [Self::Div2, Self::Div4, Self::Div6, Self::Div8]
            .into_iter()
            .find(|div| adc_clock(pclk2, *div) <= ADC_CLOCK_MAX)
            .unwrap_or(Self::Div8)
    }
}

pub fn adc_clock(pclk2: Hertz, div: AdcClockDiv) -> Hertz {
    pclk2 / div.divisor()
}

/// Conversion time in nanoseconds: sampling plus 12.5 cycles of conversion.
pub fn conversion_time_ns(adc_clk: Hertz, sample_time: SampleTime) -> u32 {
    let half_cycles = sample_time.cycles() as u64 * 2 + 25;
    (half_cycles * 1_000_000_000 / (adc_clk.to_Hz() as u64 * 2)) as u32
}

pub struct Config {
    pub clock_div: AdcClockDiv,
    pub sample_time: SampleTime,
}

impl Default for Config {
    /// 72 MHz PCLK2 divided by 6, longest sampling.
    fn default() -> Self {
        Self {
            clock_div: AdcClockDiv::Div6,
            sample_time: SampleTime::CYCLES241,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleRegister {
    Samptr1,
    Samptr2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequenceRegister {
    Rsqr1,
    Rsqr2,
    Rsqr3,
}

/// Where the SMP field of `channel` lives: channels 0..=9 in SAMPTR2,
/// the rest in SAMPTR1. Returns the register and bit offset.
pub fn sample_slot(channel: u8) -> Option<(SampleRegister, u8)> {
    match channel {
        0..=9 => Some((SampleRegister::Samptr2, channel * 3)),
        10..=17 => Some((SampleRegister::Samptr1, (channel - 10) * 3)),
        _ => None,
    }
}

/// Where the SQ field of regular sequence `rank` (1..=16) lives.
pub fn sequence_slot(rank: u8) -> Option<(SequenceRegister, u8)> {
    match rank {
        1..=6 => Some((SequenceRegister::Rsqr3, (rank - 1) * 5)),
        7..=12 => Some((SequenceRegister::Rsqr2, (rank - 7) * 5)),
        13..=16 => Some((SequenceRegister::Rsqr1, (rank - 13) * 5)),
        _ => None,
    }
}

/// Scales a `bits`-wide conversion to `vref_mv`. Readings above full scale
/// clamp to it. `None` for widths outside 1..=16, which a `u16` sample cannot
/// carry.
pub fn to_millivolts(raw: u16, vref_mv: u32, bits: u8) -> Option<u32> {
    if !(1..=16).contains(&bits) {
        return None;
    }
    let full_scale = (1u64 << bits) - 1;
    let mv = (raw as u64).min(full_scale) * vref_mv as u64 / full_scale;
    Some(mv as u32)
}

/// Supply voltage from a conversion of the internal reference.
pub fn vdd_from_vrefint(raw_vrefint: u16) -> Option<u32> {
    if raw_vrefint == 0 {
        return None;
    }
    Some(VREF_INT * ADC_MAX / raw_vrefint as u32)
}

pub mod ring {
    use core::ops::Range;

    /// Largest chunk handed out at once, in samples.
    pub const MAX_CHUNK: usize = 256;

    /// Follows a DMA engine writing 16-bit samples into a circular buffer of
    /// `N` entries and yields the span written since the last call.
    ///
    /// Chunks are multiples of four samples so a consumer sending 8-byte
    /// units never splits one.
    pub struct RingReader<const N: usize> {
        base: u32,
        last: usize,
    }

    impl<const N: usize> RingReader<N> {
        const POWER_OF_TWO: () = assert!(N.is_power_of_two());

        /// `base` is the address of the first sample.
        pub const fn new(base: u32) -> Self {
            #[allow(clippy::let_unit_value)]
            let () = Self::POWER_OF_TWO;
            Self { base, last: 0 }
        }

        /// Sample index the DMA engine will write next, given its current
        /// memory address.
        pub fn head(&self, dma_addr: u32) -> usize {
            (dma_addr.wrapping_sub(self.base) / 2) as usize & (N - 1)
        }

        /// Index of the first sample not yet handed out.
        pub fn position(&self) -> usize {
            self.last
        }

        /// Samples ready since the previous chunk. A chunk never crosses the
        /// end of the buffer.
        pub fn next_chunk(&mut self, dma_addr: u32) -> Option<Range<usize>> {
            let head = self.head(dma_addr);
            let delta = if head < self.last {
                N - self.last
            } else {
                head.wrapping_sub(self.last) & (N - 1)
            };
            let delta = delta.min(MAX_CHUNK) & !0x3;
            if delta == 0 {
                return None;
            }

            let chunk = self.last..self.last + delta;
            self.last = (self.last + delta) & (N - 1);
            Some(chunk)
        }
    }
}
