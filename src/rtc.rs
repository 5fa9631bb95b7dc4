//! RTC, Real Time Clock
//!
//! Counter and alarm arithmetic for the 32-bit RTC of the CH32V parts and
//! the 32 kHz tick counter of the CH5xx BLE parts.

/// Written to a backup register once the RTC is configured.
pub const BKP_MAGIC: u16 = 0xDEAD;

/// LSE crystal frequency.
pub const RTC_FREQ: u32 = 32768;

/// Causes of the last reset, from RCC_RSTSCKR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetFlags {
    /// Power on or power down reset.
    pub por: bool,
    /// NRST pin reset.
    pub pin: bool,
}

impl ResetFlags {
    const PINRSTF: u32 = 1 << 26;
    const PORRSTF: u32 = 1 << 27;

    pub const fn from_rstsckr(bits: u32) -> Self {
        Self {
            por: bits & Self::PORRSTF != 0,
            pin: bits & Self::PINRSTF != 0,
        }
    }
}

/// Whether the RTC has to be set up again.
///
/// Backup domain contents survive everything but a power loss, so the RTC is
/// kept unless the magic value is gone. A pin reset forces a fresh setup.
pub fn needs_init(flags: ResetFlags, bkp: u16) -> bool {
    (!flags.por && bkp != BKP_MAGIC) || flags.pin
}

/// RTC prescaler load value for a counter ticking at `tick_hz`.
pub const fn prescaler_for(clock_hz: u32, tick_hz: u32) -> u32 {
    clock_hz / tick_hz - 1
}

/// Alarm register value `secs` seconds and `ms` milliseconds after
/// `counter`, for a counter running at `prescaled_hz`.
pub fn alarm_relative(counter: u32, secs: u32, ms: u32, prescaled_hz: u32) -> u32 {
    let ticks = secs.wrapping_mul(prescaled_hz).wrapping_add(ms_to_rtc(ms, prescaled_hz));
    counter.wrapping_add(ticks)
}

/// `ms` milliseconds in ticks of a counter running at `rtc_hz`, rounded down.
pub const fn ms_to_rtc(ms: u32, rtc_hz: u32) -> u32 {
    (ms as u64 * rtc_hz as u64 / 1000) as u32
}

pub const fn rtc_to_ms(ticks: u32, rtc_hz: u32) -> u32 {
    (ticks as u64 * 1000 / rtc_hz as u64) as u32
}

/// Counter and alarm of an RTC.
pub trait RtcCounter {
    fn counter(&mut self) -> u32;
    fn set_alarm(&mut self, value: u32);
}

/// Arms the alarm `secs` seconds and `ms` milliseconds from now and returns
/// the value written.
pub fn set_alarm_relative<R: RtcCounter + ?Sized>(rtc: &mut R, secs: u32, ms: u32, prescaled_hz: u32) -> u32 {
    let now = rtc.counter();
    let alarm = alarm_relative(now, secs, ms, prescaled_hz);
    debug!("rtc: counter {=u32}, alarm at {=u32}", now, alarm);
    rtc.set_alarm(alarm);
    alarm
}

/// The CH5xx 32 kHz tick counter, which rolls over at [`Rtc32k::MAX_COUNT`]
/// (one day of ticks) instead of 2^32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rtc32k {
    freq: u32,
}

impl Default for Rtc32k {
    /// Clocked from the 32768 Hz crystal.
    fn default() -> Self {
        Self { freq: RTC_FREQ }
    }
}

impl Rtc32k {
    pub const MAX_COUNT: u32 = 0xA8C0_0000;

    pub const fn new(freq: u32) -> Self {
        Self { freq }
    }

    pub const fn freq(&self) -> u32 {
        self.freq
    }

    /// Trigger value `ms` milliseconds after `now`, wrapped into the counter
    /// range.
    pub fn rtc_trigger_after(&self, now: u32, ms: u32) -> u32 {
        let ticks = ms_to_rtc(ms, self.freq) as u64;
        ((now as u64 + ticks) % Self::MAX_COUNT as u64) as u32
    }

    /// Ticks from `from` to `to`, across a rollover.
    pub fn elapsed(&self, from: u32, to: u32) -> u32 {
        if to >= from {
            to - from
        } else {
            Self::MAX_COUNT - from + to
        }
    }

    pub fn elapsed_ms(&self, from: u32, to: u32) -> u32 {
        rtc_to_ms(self.elapsed(from, to), self.freq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_decision() {
        let flags = |por, pin| ResetFlags { por, pin };

        assert!(needs_init(flags(false, false), 0));
        assert!(!needs_init(flags(false, false), BKP_MAGIC));
        assert!(!needs_init(flags(true, false), 0));
        assert!(needs_init(flags(true, true), BKP_MAGIC));
        assert!(needs_init(flags(false, true), BKP_MAGIC));
    }

    #[test]
    fn reset_flags_from_register() {
        assert_eq!(
            ResetFlags::from_rstsckr(0x0C00_0000),
            ResetFlags { por: true, pin: true }
        );
        assert_eq!(ResetFlags::from_rstsckr(1 << 26), ResetFlags { por: false, pin: true });
        assert_eq!(ResetFlags::from_rstsckr(0), ResetFlags::default());
    }

    #[test]
    fn alarms() {
        assert_eq!(prescaler_for(RTC_FREQ, 1), 32767);
        assert_eq!(alarm_relative(100, 10, 0, 1), 110);
        assert_eq!(alarm_relative(0, 1, 500, 1000), 1500);
        assert_eq!(alarm_relative(u32::MAX, 0, 2, 1000), 1);
    }

    #[test]
    fn tick_conversion() {
        assert_eq!(ms_to_rtc(1000, RTC_FREQ), 32768);
        assert_eq!(ms_to_rtc(333, RTC_FREQ), 10911);
        assert_eq!(rtc_to_ms(32768, RTC_FREQ), 1000);
    }

    struct FakeRtc {
        counter: u32,
        alarm: Option<u32>,
    }

    impl RtcCounter for FakeRtc {
        fn counter(&mut self) -> u32 {
            self.counter
        }

        fn set_alarm(&mut self, value: u32) {
            self.alarm = Some(value);
        }
    }

    #[test]
    fn arm_alarm() {
        let mut rtc = FakeRtc {
            counter: 42,
            alarm: None,
        };
        assert_eq!(set_alarm_relative(&mut rtc, 10, 0, 1), 52);
        assert_eq!(rtc.alarm, Some(52));
    }

    #[test]
    fn rtc32k_wraps() {
        let rtc = Rtc32k::default();
        assert_eq!(rtc.rtc_trigger_after(0, 333), 10911);
        assert_eq!(rtc.rtc_trigger_after(Rtc32k::MAX_COUNT - 100, 1000), 32668);
        assert_eq!(rtc.elapsed(Rtc32k::MAX_COUNT - 100, 32668), 32768);
        assert_eq!(rtc.elapsed_ms(10, 32778), 1000);
    }
}
