//! Simple busy-loop delay provider

use crate::time::Hertz;

/// Busy-loop iterations covering `ns` nanoseconds.
///
/// One loop iteration of `qingke::riscv::asm::delay` takes about 1.5 core
/// cycles.
pub const fn cycles_for_ns(sysclk: Hertz, ns: u32) -> u32 {
    (ns as u64 * sysclk.0 as u64 / 1_500_000_000) as u32
}

/// Busy-loop iterations per microsecond.
pub const fn cycles_per_us(sysclk: Hertz) -> u32 {
    sysclk.0 / 1_500_000
}

/// A delay provided by busy-looping
#[derive(Clone, Copy, Debug)]
pub struct CycleDelay {
    pub sysclk: Hertz,
}

impl CycleDelay {
    pub const fn new(sysclk: Hertz) -> Self {
        Self { sysclk }
    }
}

#[cfg(target_arch = "riscv32")]
impl embedded_hal::delay::DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        unsafe {
            qingke::riscv::asm::delay(cycles_for_ns(self.sysclk, ns));
        }
    }

    fn delay_us(&mut self, us: u32) {
        let cycles = us as u64 * self.sysclk.0 as u64 / 1_500_000;

        unsafe {
            qingke::riscv::asm::delay(cycles as u32);
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        let per_ms = cycles_per_us(self.sysclk) * 1000;

        for _ in 0..ms {
            unsafe {
                qingke::riscv::asm::delay(per_ms);
            }
        }
    }
}
