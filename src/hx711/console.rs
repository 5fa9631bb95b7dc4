//! Line console for reading and calibrating a scale.
//!
//! Commands, one per line:
//! - `V`: print the current weight as `x.yy`
//! - `C`: three-step calibration against known weights in grams

use core::fmt::Write;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;

use super::{Error, Hx711};

pub const LINE_LEN: usize = 64;
pub const CALIBRATION_STEPS: u8 = 3;
/// Readings averaged per measurement.
pub const SAMPLES: u8 = 10;

const PROMPT: &str = "Place known weight and enter its value (g, integer):\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Calibrating { step: u8, accum: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleError<E> {
    Scale(Error<E>),
    Output,
}

impl<E> From<Error<E>> for ConsoleError<E> {
    fn from(err: Error<E>) -> Self {
        ConsoleError::Scale(err)
    }
}

impl<E> From<core::fmt::Error> for ConsoleError<E> {
    fn from(_: core::fmt::Error) -> Self {
        ConsoleError::Output
    }
}

/// Digits among the first six characters, e.g. `"1a2"` is 12.
pub fn parse_weight(line: &[u8]) -> u32 {
    line.iter()
        .take(6)
        .filter(|c| c.is_ascii_digit())
        .fold(0, |acc, c| acc * 10 + (c - b'0') as u32)
}

/// Writes a value in hundredths as `x.yy`.
pub fn write_centi<W: Write>(out: &mut W, centi: i64) -> core::fmt::Result {
    let sign = if centi < 0 { "-" } else { "" };
    let abs = centi.unsigned_abs();
    writeln!(out, "{}{}.{:02}", sign, abs / 100, abs % 100)
}

pub struct Console {
    line: Vec<u8, LINE_LEN>,
    state: State,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub const fn new() -> Self {
        Self {
            line: Vec::new(),
            state: State::Idle,
        }
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.state, State::Calibrating { .. })
    }

    /// Echoes `input` and runs every completed line.
    pub fn feed<SCK, DT, D, E, W>(
        &mut self,
        input: &[u8],
        scale: &mut Hx711<SCK, DT, D>,
        out: &mut W,
    ) -> Result<(), ConsoleError<E>>
    where
        SCK: OutputPin<Error = E>,
        DT: InputPin<Error = E>,
        D: DelayNs,
        W: Write,
    {
        for &c in input {
            out.write_char(c as char)?;
        }

        for &c in input {
            if c == b'\n' || c == b'\r' {
                let line = core::mem::take(&mut self.line);
                self.run_line(&line, scale, out)?;
            } else if self.line.len() < LINE_LEN - 1 {
                let _ = self.line.push(c);
            }
        }

        Ok(())
    }

    fn run_line<SCK, DT, D, E, W>(
        &mut self,
        line: &[u8],
        scale: &mut Hx711<SCK, DT, D>,
        out: &mut W,
    ) -> Result<(), ConsoleError<E>>
    where
        SCK: OutputPin<Error = E>,
        DT: InputPin<Error = E>,
        D: DelayNs,
        W: Write,
    {
        match self.state {
            State::Idle => match line {
                b"V" => {
                    let centi = scale.get_units_centi(SAMPLES)?;
                    write_centi(out, centi as i64)?;
                }
                b"C" => {
                    scale.set_scale(100)?;
                    scale.tare(1)?;
                    out.write_str("Ok\n")?;
                    out.write_str(PROMPT)?;
                    self.state = State::Calibrating { step: 0, accum: 0 };
                }
                _ => {}
            },
            State::Calibrating { step, accum } => {
                if line.is_empty() {
                    return Ok(());
                }

                let weight = parse_weight(line);
                if weight == 0 {
                    out.write_str("Invalid weight\n")?;
                    out.write_str(PROMPT)?;
                    return Ok(());
                }

                // scale is 1.00 here, so units are raw counts
                let measured = scale.get_units(SAMPLES)? as i64;
                let divider = measured * 100 / weight as i64;
                debug!("hx711: step {=u8} divider x100 {=i64}", step, divider);
                out.write_str("Ok\n")?;

                let (step, accum) = (step + 1, accum + divider);
                if step < CALIBRATION_STEPS {
                    self.state = State::Calibrating { step, accum };
                    out.write_str(PROMPT)?;
                    return Ok(());
                }

                self.state = State::Idle;
                let divider = accum / CALIBRATION_STEPS as i64;
                out.write_str("Calibration divider: ")?;
                write_centi(out, divider)?;

                match scale.set_scale(divider as i32) {
                    Ok(()) => out.write_str("Calibrated\n")?,
                    Err(_) => {
                        warn!("hx711: calibration produced a zero divider");
                        out.write_str("Calibration failed\n")?;
                        scale.set_scale(100)?;
                    }
                }
            }
        }

        Ok(())
    }
}
