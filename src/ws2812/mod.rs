//! WS2812 output through DMA writes to a GPIO BSHR register.
//!
//! A timer paces a circular DMA transfer from a two-LED buffer of BSHR words
//! to the port. Every bit of the GRB color becomes three or four time slices
//! (`hi`, value, [value], `lo`). The half-transfer and transfer-complete
//! interrupts refill whichever half is not being streamed, one LED at a time.

use crate::time::Hertz;

pub mod effects;

pub const BITS_PER_LED: usize = 24;

/// Time slices per encoded bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeSlices {
    /// `[hi, v, lo]`, less DMA traffic
    Three,
    /// `[hi, v, v, lo]`, more tolerant timing
    #[default]
    Four,
}

impl TimeSlices {
    pub const fn count(self) -> usize {
        match self {
            TimeSlices::Three => 3,
            TimeSlices::Four => 4,
        }
    }
}

/// BSHR words per LED.
pub const fn words_per_led(slices: TimeSlices) -> usize {
    BITS_PER_LED * slices.count()
}

/// Length of the circular two-LED DMA buffer.
pub const fn buffer_len(slices: TimeSlices) -> usize {
    words_per_led(slices) * 2
}

/// BSHR word that sets `pin`. A port has 16 pins, only the low four bits
/// of `pin` count.
pub const fn hi(pin: u8) -> u32 {
    1 << (pin & 0xF)
}

/// BSHR word that resets `pin`.
pub const fn lo(pin: u8) -> u32 {
    1 << ((pin & 0xF) + 16)
}

/// Timer auto-reload value at 48 MHz: 3 MHz slice rate for four slices,
/// 2.66 MHz for three.
pub const fn timer_reload(slices: TimeSlices) -> u16 {
    match slices {
        TimeSlices::Four => 15,
        TimeSlices::Three => 17,
    }
}

/// [`timer_reload`] scaled to another timer clock.
pub fn timer_reload_for(sysclk: Hertz, slices: TimeSlices) -> u16 {
    let divisor = timer_reload(slices) as u64 + 1;
    let reload = sysclk.0 as u64 * divisor / 48_000_000;
    reload.saturating_sub(1).min(u16::MAX as u64) as u16
}

/// Encodes one 24-bit color, MSB first, into the slot at the start of `buf`.
pub fn fill_led(buf: &mut [u32], color: u32, pin: u8, slices: TimeSlices) {
    let (hi, lo) = (hi(pin), lo(pin));
    let mut bits = (color << 8) as i32;

    for slot in buf.chunks_exact_mut(slices.count()).take(BITS_PER_LED) {
        let val = if bits < 0 { hi } else { lo };
        bits <<= 1;

        match slot {
            [a, b, c, d] => {
                *a = hi;
                *b = val;
                *c = val;
                *d = lo;
            }
            [a, b, c] => {
                *a = hi;
                *b = val;
                *c = lo;
            }
            _ => {}
        }
    }
}

/// Holds the line low for one LED slot.
pub fn fill_reset(buf: &mut [u32], pin: u8, slices: TimeSlices) {
    let len = buf.len().min(words_per_led(slices));
    buf[..len].fill(lo(pin));
}

/// Supplies the color of each LED.
pub trait ColorSource {
    /// GRB color of `led` for animation step `frame`.
    fn color(&mut self, led: usize, frame: u32) -> u32;
}

impl ColorSource for &[u32] {
    fn color(&mut self, led: usize, _frame: u32) -> u32 {
        self.get(led).copied().unwrap_or(0)
    }
}

/// Streams `count` LEDs followed by four reset slots, forever.
pub struct BitStream<E: ColorSource> {
    source: E,
    count: usize,
    pin: u8,
    slices: TimeSlices,
    ledno: usize,
    frame: u32,
}

impl<E: ColorSource> BitStream<E> {
    pub fn new(source: E, count: usize, pin: u8, slices: TimeSlices) -> Self {
        Self {
            source,
            count,
            pin,
            slices,
            ledno: 0,
            frame: 0,
        }
    }

    /// Fills one LED slot and advances.
    pub fn fill_next(&mut self, slot: &mut [u32]) {
        if self.ledno >= self.count {
            fill_reset(slot, self.pin, self.slices);
            self.ledno += 1;
            if self.ledno > self.count + 3 {
                self.ledno = 0;
            }
        } else {
            let color = self.source.color(self.ledno, self.frame);
            fill_led(slot, color, self.pin, self.slices);
            if self.ledno == 0 {
                self.frame = self.frame.wrapping_add(1);
            }
            self.ledno += 1;
        }
    }

    /// DMA half-transfer: the first LED slot is free.
    pub fn on_half_transfer(&mut self, buf: &mut [u32]) {
        let half = words_per_led(self.slices).min(buf.len());
        self.fill_next(&mut buf[..half]);
    }

    /// DMA transfer complete: the second LED slot is free.
    pub fn on_transfer_complete(&mut self, buf: &mut [u32]) {
        let half = words_per_led(self.slices).min(buf.len());
        self.fill_next(&mut buf[half..]);
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn led_index(&self) -> usize {
        self.ledno
    }

    pub fn source_mut(&mut self) -> &mut E {
        &mut self.source
    }
}
