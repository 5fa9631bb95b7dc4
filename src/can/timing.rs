//! Bit timing register (BTIMR) values.
//!
//! One bit is `1 + (ts1 + 1) + (ts2 + 1)` time quanta of `brp + 1` CAN clock
//! cycles each. Field values are stored as written to the register.

use super::CanMode;
use crate::time::Hertz;

const TS1_SHIFT: u32 = 16;
const TS2_SHIFT: u32 = 20;
const LBKM: u32 = 1 << 30;
const SILM: u32 = 1 << 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitTiming {
    /// Time segment 1 minus one, 0..=15
    pub ts1: u8,
    /// Time segment 2 minus one, 0..=7
    pub ts2: u8,
    /// Baud rate prescaler minus one, 0..=1023
    pub brp: u16,
}

/// Preset rates for a 72 MHz PCLK1, 12 quanta per bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Baud {
    K25,
    K50,
    K100,
    K125,
    K250,
    K500,
    K750,
    M1,
}

impl Baud {
    pub const fn timing(self) -> BitTiming {
        let brp = match self {
            Baud::K25 => 239,
            Baud::K50 => 119,
            Baud::K100 => 59,
            Baud::K125 => 47,
            Baud::K250 => 23,
            Baud::K500 => 11,
            Baud::K750 => 7,
            Baud::M1 => 5,
        };
        BitTiming { ts1: 5, ts2: 4, brp }
    }
}

impl From<Baud> for BitTiming {
    fn from(baud: Baud) -> Self {
        baud.timing()
    }
}

impl BitTiming {
    pub const fn btimr(&self) -> u32 {
        ((self.ts1 as u32 & 0xF) << TS1_SHIFT) | ((self.ts2 as u32 & 0x7) << TS2_SHIFT) | (self.brp as u32 & 0x3FF)
    }

    /// Register value with the test-mode bits of `mode`. SJW stays at one quantum.
    pub fn btimr_with_mode(&self, mode: CanMode) -> u32 {
        let regs = mode.regs();
        let mut value = self.btimr();
        if regs.lbkm {
            value |= LBKM;
        }
        if regs.silm {
            value |= SILM;
        }
        value
    }

    pub const fn from_btimr(btimr: u32) -> Self {
        Self {
            ts1: ((btimr >> TS1_SHIFT) & 0xF) as u8,
            ts2: ((btimr >> TS2_SHIFT) & 0x7) as u8,
            brp: (btimr & 0x3FF) as u16,
        }
    }

    /// Quanta per bit.
    pub const fn quanta(&self) -> u32 {
        self.ts1 as u32 + self.ts2 as u32 + 3
    }

    pub const fn baud(&self, pclk1: Hertz) -> u32 {
        pclk1.0 / (self.quanta() * (self.brp as u32 + 1))
    }

    /// Sample point in per mille.
    pub const fn sample_point(&self) -> u32 {
        (self.ts1 as u32 + 2) * 1000 / self.quanta()
    }

    /// Finds an exact timing for `bitrate`, preferring more quanta per bit
    /// and a sample point near 87.5 %.
    pub fn for_bitrate(pclk1: Hertz, bitrate: u32) -> Option<Self> {
        if bitrate == 0 {
            return None;
        }

        for quanta in (8..=25u32).rev() {
            let per_bit = match bitrate.checked_mul(quanta) {
                Some(v) => v,
                None => continue,
            };
            if pclk1.0 % per_bit != 0 {
                continue;
            }
            let prescaler = pclk1.0 / per_bit;
            if prescaler == 0 || prescaler > 1024 {
                continue;
            }

            let seg2 = (quanta - (quanta * 875 + 500) / 1000).clamp(1, 8);
            let seg1 = quanta - 1 - seg2;
            if !(1..=16).contains(&seg1) {
                continue;
            }

            return Some(Self {
                ts1: (seg1 - 1) as u8,
                ts2: (seg2 - 1) as u8,
                brp: (prescaler - 1) as u16,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_hit_their_rates() {
        let pclk1 = Hertz::mhz(72);
        let rates = [
            (Baud::K25, 25_000),
            (Baud::K50, 50_000),
            (Baud::K100, 100_000),
            (Baud::K125, 125_000),
            (Baud::K250, 250_000),
            (Baud::K500, 500_000),
            (Baud::K750, 750_000),
            (Baud::M1, 1_000_000),
        ];
        for (preset, rate) in rates {
            assert_eq!(preset.timing().baud(pclk1), rate);
        }
    }

    #[test]
    fn register_layout() {
        let t = Baud::K500.timing();
        assert_eq!(t.btimr(), (5 << 16) | (4 << 20) | 11);
        assert_eq!(BitTiming::from_btimr(t.btimr()), t);
        assert_eq!(t.btimr_with_mode(CanMode::Loopback), t.btimr() | (1 << 30));
        assert_eq!(t.btimr_with_mode(CanMode::Normal), t.btimr());
    }

    #[test]
    fn search_finds_exact_rates() {
        for rate in [125_000, 250_000, 500_000, 1_000_000] {
            let t = BitTiming::for_bitrate(Hertz::mhz(36), rate).unwrap();
            assert_eq!(t.baud(Hertz::mhz(36)), rate);
            assert!(t.sample_point() >= 800);
        }
        assert!(BitTiming::for_bitrate(Hertz::mhz(36), 0).is_none());
        assert!(BitTiming::for_bitrate(Hertz::hz(1000), 1_000_000).is_none());
    }
}
