use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};

/// Motor axes on the controller kit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Pan (horizontal rotation).
    X,
    /// Tilt (vertical rotation).
    Y,
    /// Lens zoom.
    A,
    /// Lens focus.
    B,
}

impl Axis {
    pub fn letter(&self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::A => 'A',
            Axis::B => 'B',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'A' => Some(Axis::A),
            'B' => Some(Axis::B),
            _ => None,
        }
    }
}

/// Machine codes used by the controller kit.
pub mod mcode {
    pub const WAKE: u16 = 238;
    pub const ENABLE: u16 = 8;
    pub const EXPOSURE_MODE: u16 = 241;
    pub const BRIGHTNESS: u16 = 240;
    pub const GAIN: u16 = 250;
    pub const IR_CUT: u16 = 242;
    pub const AUTOFOCUS: u16 = 246;
}

/// One line of the controller-kit command set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KitCommand {
    /// `G0 <axis><value>`: move an axis (absolute or relative per positioning mode).
    Move { axis: Axis, value: i32 },
    /// `M0 <axis>`: release an axis after a move.
    Release(Axis),
    /// `G91`
    RelativePositioning,
    /// `G90`
    AbsolutePositioning,
    /// `M<code>` or `M<code> A<arg>`.
    Machine { code: u16, arg: Option<u32> },
    /// `version`: firmware query.
    Version,
}

impl KitCommand {
    pub fn machine(code: u16) -> Self {
        KitCommand::Machine { code, arg: None }
    }

    pub fn machine_arg(code: u16, arg: u32) -> Self {
        KitCommand::Machine {
            code,
            arg: Some(arg),
        }
    }
}

impl fmt::Display for KitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KitCommand::Move { axis, value } => write!(f, "G0 {}{}", axis.letter(), value),
            KitCommand::Release(axis) => write!(f, "M0 {}", axis.letter()),
            KitCommand::RelativePositioning => write!(f, "G91"),
            KitCommand::AbsolutePositioning => write!(f, "G90"),
            KitCommand::Machine { code, arg: None } => write!(f, "M{}", code),
            KitCommand::Machine {
                code,
                arg: Some(arg),
            } => write!(f, "M{} A{}", code, arg),
            KitCommand::Version => write!(f, "version"),
        }
    }
}

impl FromStr for KitCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let head = parts.next().ok_or_else(|| anyhow!("empty command line"))?;
        let operand = parts.next();
        if parts.next().is_some() {
            bail!("unexpected trailing operands in '{}'", line.trim());
        }

        if head.eq_ignore_ascii_case("version") && operand.is_none() {
            return Ok(KitCommand::Version);
        }

        let head = head.to_ascii_uppercase();
        match (head.as_str(), operand) {
            ("G90", None) => Ok(KitCommand::AbsolutePositioning),
            ("G91", None) => Ok(KitCommand::RelativePositioning),
            ("G0", Some(op)) => {
                let (axis, rest) = split_axis(op)?;
                let value = rest
                    .parse::<i32>()
                    .with_context(|| format!("bad move value in '{}'", line.trim()))?;
                Ok(KitCommand::Move { axis, value })
            }
            ("M0", Some(op)) if op.len() == 1 => {
                let (axis, _) = split_axis(op)?;
                Ok(KitCommand::Release(axis))
            }
            (m, op) if m.starts_with('M') => {
                let code = m[1..]
                    .parse::<u16>()
                    .with_context(|| format!("bad machine code in '{}'", line.trim()))?;
                let arg = match op {
                    None => None,
                    Some(op) => {
                        let digits = op
                            .strip_prefix('A')
                            .or_else(|| op.strip_prefix('a'))
                            .ok_or_else(|| anyhow!("machine argument must be A<n> in '{}'", line.trim()))?;
                        Some(
                            digits
                                .parse::<u32>()
                                .with_context(|| format!("bad machine argument in '{}'", line.trim()))?,
                        )
                    }
                };
                Ok(KitCommand::Machine { code, arg })
            }
            _ => Err(anyhow!("unrecognised command '{}'", line.trim())),
        }
    }
}

fn split_axis(op: &str) -> Result<(Axis, &str)> {
    let mut chars = op.chars();
    let letter = chars.next().ok_or_else(|| anyhow!("missing axis"))?;
    let axis = Axis::from_letter(letter).ok_or_else(|| anyhow!("unknown axis '{}'", letter))?;
    Ok((axis, chars.as_str()))
}
