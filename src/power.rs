//! Low-power modes, the auto-wakeup timer and reset causes.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::time::Hertz;

/// Nominal LSI frequency clocking the auto-wakeup unit.
pub const LSI_FREQ: Hertz = Hertz::khz(128);

/// Largest AWU window value, a 6-bit field.
pub const AWU_WINDOW_MAX: u8 = 0x3F;

#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetReason {
    LowPower,
    WWDG,
    IWDG,
    Software,
    PowerOn,
    ResetPin,
    Unknown,
}

impl ResetReason {
    const LPWRRSTF: u32 = 1 << 31;
    const WWDGRSTF: u32 = 1 << 30;
    const IWDGRSTF: u32 = 1 << 29;
    const SFTRSTF: u32 = 1 << 28;
    const PORRSTF: u32 = 1 << 27;
    const PINRSTF: u32 = 1 << 26;

    /// Most significant cause in RCC_RSTSCKR. A power-on reset also sets the
    /// pin flag, so it is checked first.
    pub const fn from_rstsckr(bits: u32) -> Self {
        if bits & Self::PORRSTF != 0 {
            Self::PowerOn
        } else if bits & Self::PINRSTF != 0 {
            Self::ResetPin
        } else if bits & Self::LPWRRSTF != 0 {
            Self::LowPower
        } else if bits & Self::WWDGRSTF != 0 {
            Self::WWDG
        } else if bits & Self::IWDGRSTF != 0 {
            Self::IWDG
        } else if bits & Self::SFTRSTF != 0 {
            Self::Software
        } else {
            Self::Unknown
        }
    }
}

/// True when PWR_CSR says the core came back from standby, with both the
/// wakeup and standby flags set.
pub const fn is_standby_exit(pwr_csr: u32) -> bool {
    const WUF: u32 = 1 << 0;
    const SBF: u32 = 1 << 1;
    pwr_csr & WUF != 0 && pwr_csr & SBF != 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LowPowerMode {
    /// Core clock stopped, peripherals running.
    Sleep,
    /// All clocks stopped, RAM and registers kept.
    Stop,
    /// Core domain powered down; waking is a reset.
    Standby,
}

impl LowPowerMode {
    /// SLEEPDEEP in the PFIC system control register.
    pub const fn sleep_deep(&self) -> bool {
        !matches!(self, Self::Sleep)
    }

    /// PDDS in PWR_CTLR.
    pub const fn power_down_deep_sleep(&self) -> bool {
        matches!(self, Self::Standby)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AwuPrescaler {
    Div1,
    Div2,
    Div4,
    Div8,
    Div16,
    Div32,
    Div64,
    Div128,
    Div256,
    Div512,
    Div1024,
    Div2048,
    Div4096,
    Div10240,
    Div61440,
}

impl AwuPrescaler {
    const ALL: [Self; 15] = [
        Self::Div1,
        Self::Div2,
        Self::Div4,
        Self::Div8,
        Self::Div16,
        Self::Div32,
        Self::Div64,
        Self::Div128,
        Self::Div256,
        Self::Div512,
        Self::Div1024,
        Self::Div2048,
        Self::Div4096,
        Self::Div10240,
        Self::Div61440,
    ];

    pub const fn divisor(&self) -> u32 {
        match self {
            Self::Div1 => 1,
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
            Self::Div16 => 16,
            Self::Div32 => 32,
            Self::Div64 => 64,
            Self::Div128 => 128,
            Self::Div256 => 256,
            Self::Div512 => 512,
            Self::Div1024 => 1024,
            Self::Div2048 => 2048,
            Self::Div4096 => 4096,
            Self::Div10240 => 10240,
            Self::Div61440 => 61440,
        }
    }

    /// AWU_PSC field value. Code 1 is unused.
    pub const fn bits(&self) -> u8 {
        match self {
            Self::Div1 => 0x0,
            Self::Div2 => 0x2,
            Self::Div4 => 0x3,
            Self::Div8 => 0x4,
            Self::Div16 => 0x5,
            Self::Div32 => 0x6,
            Self::Div64 => 0x7,
            Self::Div128 => 0x8,
            Self::Div256 => 0x9,
            Self::Div512 => 0xA,
            Self::Div1024 => 0xB,
            Self::Div2048 => 0xC,
            Self::Div4096 => 0xD,
            Self::Div10240 => 0xE,
            Self::Div61440 => 0xF,
        }
    }
}

/// Auto-wakeup timer: the core wakes after `window` prescaled LSI ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AwuConfig {
    pub prescaler: AwuPrescaler,
    pub window: u8,
}

impl Default for AwuConfig {
    /// 10 ticks of LSI / 10240, 0.8 s at 128 kHz.
    fn default() -> Self {
        Self {
            prescaler: AwuPrescaler::Div10240,
            window: 10,
        }
    }
}

impl AwuConfig {
    pub fn wake_period_ms(&self, lsi: Hertz) -> u32 {
        let ticks = self.window.min(AWU_WINDOW_MAX) as u64 * self.prescaler.divisor() as u64;
        (ticks * 1000 / lsi.to_Hz() as u64) as u32
    }

    /// Finest setting that wakes about `period_ms` from now, or `None` when
    /// the period is zero or beyond the timer's reach.
    pub fn for_period(lsi: Hertz, period_ms: u32) -> Option<Self> {
        let lsi_ticks = period_ms as u64 * lsi.to_Hz() as u64 / 1000;
        if lsi_ticks == 0 {
            return None;
        }
        AwuPrescaler::ALL.into_iter().find_map(|prescaler| {
            let div = prescaler.divisor() as u64;
            let window = (lsi_ticks + div / 2) / div;
            (1..=AWU_WINDOW_MAX as u64)
                .contains(&window)
                .then_some(Self {
                    prescaler,
                    window: window as u8,
                })
        })
    }
}

/// Power controller of the board: arms the wakeup source and parks the core.
pub trait PowerControl {
    fn configure_awu(&mut self, config: &AwuConfig);

    /// Selects `mode` and executes WFI. Returns after wakeup, except from
    /// standby.
    fn enter(&mut self, mode: LowPowerMode);
}

pub struct Config {
    pub mode: LowPowerMode,
    pub awu: AwuConfig,
    /// How long the indicator stays lit before each sleep.
    pub indicator_ms: u32,
}

impl Default for Config {
    /// Stop mode with the default wakeup period, 50 ms blink.
    fn default() -> Self {
        Self {
            mode: LowPowerMode::Stop,
            awu: AwuConfig::default(),
            indicator_ms: 50,
        }
    }
}

/// Blink, sleep, wake, repeat.
pub struct SleepCycle<P, LED, D> {
    power: P,
    led: LED,
    delay: D,
    config: Config,
    wakeups: u32,
}

impl<P: PowerControl, LED: OutputPin, D: DelayNs> SleepCycle<P, LED, D> {
    pub fn new(power: P, led: LED, delay: D, config: Config) -> Self {
        Self {
            power,
            led,
            delay,
            config,
            wakeups: 0,
        }
    }

    pub fn release(self) -> (P, LED, D) {
        (self.power, self.led, self.delay)
    }

    pub fn wakeups(&self) -> u32 {
        self.wakeups
    }

    /// One cycle: light the indicator, arm the wakeup timer and sleep.
    pub fn run_once(&mut self) -> Result<(), LED::Error> {
        self.led.set_high()?;
        self.delay.delay_ms(self.config.indicator_ms);
        self.led.set_low()?;

        self.power.configure_awu(&self.config.awu);
        trace!("power: sleeping, window {=u8}", self.config.awu.window);
        self.power.enter(self.config.mode);

        self.wakeups = self.wakeups.wrapping_add(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State as PinState, Transaction as PinTransaction};

    use super::*;

    #[test]
    fn reset_reasons() {
        assert_eq!(ResetReason::from_rstsckr(0x0C00_0000), ResetReason::PowerOn);
        assert_eq!(ResetReason::from_rstsckr(1 << 26), ResetReason::ResetPin);
        assert_eq!(ResetReason::from_rstsckr(0x9000_0000), ResetReason::LowPower);
        assert_eq!(ResetReason::from_rstsckr(1 << 29), ResetReason::IWDG);
        assert_eq!(ResetReason::from_rstsckr(1 << 28), ResetReason::Software);
        assert_eq!(ResetReason::from_rstsckr(0), ResetReason::Unknown);
    }

    #[test]
    fn standby_exit_needs_both_flags() {
        assert!(is_standby_exit(0b11));
        assert!(!is_standby_exit(0b01));
        assert!(!is_standby_exit(0b10));
    }

    #[test]
    fn mode_bits() {
        assert!(!LowPowerMode::Sleep.sleep_deep());
        assert!(LowPowerMode::Stop.sleep_deep());
        assert!(!LowPowerMode::Stop.power_down_deep_sleep());
        assert!(LowPowerMode::Standby.power_down_deep_sleep());
    }

    #[test]
    fn awu_periods() {
        assert_eq!(AwuConfig::default().wake_period_ms(LSI_FREQ), 800);
        assert_eq!(AwuPrescaler::Div10240.bits(), 0xE);

        assert_eq!(
            AwuConfig::for_period(LSI_FREQ, 4370),
            Some(AwuConfig {
                prescaler: AwuPrescaler::Div10240,
                window: 55
            })
        );
        assert_eq!(
            AwuConfig::for_period(LSI_FREQ, 1),
            Some(AwuConfig {
                prescaler: AwuPrescaler::Div4,
                window: 32
            })
        );
        assert_eq!(AwuConfig::for_period(LSI_FREQ, 0), None);
        assert_eq!(AwuConfig::for_period(LSI_FREQ, 60_000), None);
    }

    #[derive(Default)]
    struct FakePower {
        armed: Option<AwuConfig>,
        entered: Vec<LowPowerMode>,
    }

    impl PowerControl for FakePower {
        fn configure_awu(&mut self, config: &AwuConfig) {
            self.armed = Some(*config);
        }

        fn enter(&mut self, mode: LowPowerMode) {
            self.entered.push(mode);
        }
    }

    #[test]
    fn cycle_blinks_then_sleeps() {
        let led = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let mut cycle = SleepCycle::new(FakePower::default(), led, NoopDelay::new(), Config::default());

        cycle.run_once().unwrap();
        cycle.run_once().unwrap();
        assert_eq!(cycle.wakeups(), 2);

        let (power, mut led, _) = cycle.release();
        assert_eq!(power.armed, Some(AwuConfig::default()));
        assert_eq!(power.entered, [LowPowerMode::Stop, LowPowerMode::Stop]);
        led.done();
    }
}
