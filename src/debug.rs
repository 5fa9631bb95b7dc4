//! SDI debug print.
//!
//! The host side (WCH-LinkE) polls two debug data registers. Byte 0 of DATA0
//! carries the number of payload bytes, so each transfer moves at most 7
//! bytes of text.

/// Maximum payload bytes per SDI transfer.
pub const CHUNK_LEN: usize = 7;

/// Packs up to 7 bytes into the `(data0, data1)` register pair.
///
/// Returns `None` for chunks that do not fit a single transfer.
pub fn encode_chunk(chunk: &[u8]) -> Option<(u32, u32)> {
    if chunk.len() > CHUNK_LEN {
        return None;
    }

    let mut data = [0u8; 8];
    data[0] = chunk.len() as u8;
    data[1..chunk.len() + 1].copy_from_slice(chunk);

    let data0 = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let data1 = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    Some((data0, data1))
}

#[cfg(target_arch = "riscv32")]
pub use self::target::SDIPrint;

#[cfg(target_arch = "riscv32")]
mod target {
    use qingke::riscv;

    use super::{encode_chunk, CHUNK_LEN};

    #[cfg(not(feature = "qingke-v2"))]
    mod regs {
        pub const DEBUG_DATA0_ADDRESS: *mut u32 = 0xE000_0380 as *mut u32;
        pub const DEBUG_DATA1_ADDRESS: *mut u32 = 0xE000_0384 as *mut u32;
    }

    #[cfg(feature = "qingke-v2")]
    mod regs {
        pub const DEBUG_DATA0_ADDRESS: *mut u32 = 0xE000_00F4 as *mut u32;
        pub const DEBUG_DATA1_ADDRESS: *mut u32 = 0xE000_00F8 as *mut u32;
    }

    pub struct SDIPrint;

    impl SDIPrint {
        pub fn enable() {
            unsafe {
                core::ptr::write_volatile(regs::DEBUG_DATA0_ADDRESS, 0);
                riscv::asm::delay(100000);
            }
        }

        #[inline]
        fn is_busy() -> bool {
            unsafe { core::ptr::read_volatile(regs::DEBUG_DATA0_ADDRESS) != 0 }
        }
    }

    impl core::fmt::Write for SDIPrint {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            for chunk in s.as_bytes().chunks(CHUNK_LEN) {
                let (data0, data1) = encode_chunk(chunk).ok_or(core::fmt::Error)?;

                while SDIPrint::is_busy() {}

                // DATA0 last: writing it hands the transfer to the debugger
                unsafe {
                    core::ptr::write_volatile(regs::DEBUG_DATA1_ADDRESS, data1);
                    core::ptr::write_volatile(regs::DEBUG_DATA0_ADDRESS, data0);
                }
            }

            Ok(())
        }
    }
}

#[cfg(target_arch = "riscv32")]
#[macro_export]
macro_rules! println {
    ($($arg:tt)*) => {
        {
            use core::fmt::Write;
            use core::writeln;

            let _ = writeln!(&mut $crate::debug::SDIPrint, $($arg)*);
        }
    }
}

#[cfg(target_arch = "riscv32")]
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        {
            use core::fmt::Write;
            use core::write;

            let _ = write!(&mut $crate::debug::SDIPrint, $($arg)*);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_goes_in_first_byte() {
        let (d0, d1) = encode_chunk(b"hello").unwrap();
        assert_eq!(d0.to_le_bytes(), [5, b'h', b'e', b'l']);
        assert_eq!(d1.to_le_bytes(), [b'l', b'o', 0, 0]);
    }

    #[test]
    fn full_and_oversized_chunks() {
        let (d0, d1) = encode_chunk(b"1234567").unwrap();
        assert_eq!(d0 & 0xff, 7);
        assert_eq!(d1.to_le_bytes(), *b"4567");
        assert!(encode_chunk(b"12345678").is_none());
    }
}
