//! NEC decoding from timer input-capture timestamps.
//!
//! A timer with a large prescaler captures every falling edge of the
//! demodulated IR signal, and a circular DMA transfer copies the captured
//! counter values into a ring. The gap between two edges tells leader marks
//! from data bits and ones from zeros.

use super::NecFrame;

/// TIM1 prescaler for the capture timer; one tick is 512 core clocks.
pub const CAPTURE_PRESCALER: u16 = 0x1FF;

/// Gap that marks the start of a frame.
pub const START_TICKS: u16 = 500;
/// Gaps above this are repeat leaders and are skipped.
pub const REPEAT_TICKS: u16 = 1000;
/// Gaps above this are logical ones.
pub const ONE_TICKS: u16 = 150;
/// Quiet time after the start edge before a frame is handed out.
pub const FRAME_TIMEOUT_MS: u32 = 100;

const MAX_BITS: u32 = 64;

#[cfg(feature = "embassy")]
pub static FRAMES: embassy_sync::channel::Channel<
    embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex,
    NecFrame,
    4,
> = embassy_sync::channel::Channel::new();

pub struct NecReceiver<const N: usize = 64> {
    tail: usize,
    started: bool,
    start_ms: u32,
    bits: u32,
    data: [u16; 4],
}

impl<const N: usize> Default for NecReceiver<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> NecReceiver<N> {
    const RING_OK: () = assert!(N.is_power_of_two(), "capture ring length must be a power of two");

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::RING_OK;

        Self {
            tail: 0,
            started: false,
            start_ms: 0,
            bits: 0,
            data: [0; 4],
        }
    }

    /// Write position of the DMA engine, from its remaining transfer count.
    pub fn head(remaining: u16) -> usize {
        N.wrapping_sub(remaining as usize) & (N - 1)
    }

    /// Bits decoded so far in the current frame.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Consumes new capture entries and returns a frame once it timed out.
    ///
    /// `remaining` is the DMA channel's transfer counter and `now_ms` a
    /// millisecond clock.
    pub fn poll(&mut self, ring: &[u16; N], remaining: u16, now_ms: u32) -> Option<NecFrame> {
        let head = Self::head(remaining);

        while self.tail != head {
            let time = ring[self.tail];
            let prev = ring[self.tail.wrapping_sub(1) & (N - 1)];
            let diff = time.wrapping_sub(prev);
            self.tail = (self.tail + 1) & (N - 1);

            if self.started {
                if diff > REPEAT_TICKS {
                    continue;
                }
                self.push_bit(diff > ONE_TICKS);
            } else if diff > START_TICKS {
                self.started = true;
                self.start_ms = now_ms;
            }
        }

        if self.started && now_ms.wrapping_sub(self.start_ms) > FRAME_TIMEOUT_MS {
            let frame = (self.bits > 0).then(|| NecFrame {
                address: self.data[0],
                command: self.data[1],
            });
            if self.bits > MAX_BITS {
                warn!("ir: {=u32} bits captured, kept {=u32}", self.bits, MAX_BITS);
            }
            self.reset();
            return frame;
        }

        None
    }

    /// Like [`poll`](Self::poll), publishing the frame on [`FRAMES`].
    ///
    /// Returns `false` when no frame was decoded or the channel was full.
    #[cfg(feature = "embassy")]
    pub fn poll_into(&mut self, ring: &[u16; N], remaining: u16, now_ms: u32) -> bool {
        match self.poll(ring, remaining, now_ms) {
            Some(frame) => FRAMES.try_send(frame).is_ok(),
            None => false,
        }
    }

    fn push_bit(&mut self, one: bool) {
        if self.bits < MAX_BITS {
            let word = (self.bits >> 4) as usize;
            let pos = 15 - (self.bits & 0x0F);
            if one {
                self.data[word] |= 1 << pos;
            }
        }
        self.bits = self.bits.saturating_add(1);
    }

    fn reset(&mut self) {
        self.data = [0; 4];
        self.started = false;
        self.bits = 0;
    }
}
