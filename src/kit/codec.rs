use anyhow::{anyhow, bail, Result};

use crate::control::{PtzCommand, ZoomAction};
use crate::kit::command::{Axis, KitCommand};

pub const DEFAULT_PAN_STEP: i32 = 100;
pub const DEFAULT_TILT_STEP: i32 = 100;
pub const DEFAULT_ZOOM_STEP: i32 = 500;

/// Motor steps per speed level, and the accepted level range.
///
/// Tracking runs in relative positioning, so a pan level of -3 becomes
/// `G0 X-300` with the default step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KitScale {
    pub pan_step: i32,
    pub tilt_step: i32,
    pub zoom_step: i32,
    pub max_level: i8,
}

impl KitScale {
    /// Steps must be positive and a full-speed move must fit the kit's
    /// integer range.
    pub fn validate(&self) -> Result<()> {
        if self.max_level < 1 {
            bail!("max level must be >= 1, got {}", self.max_level);
        }
        for (name, step) in [
            ("pan", self.pan_step),
            ("tilt", self.tilt_step),
            ("zoom", self.zoom_step),
        ] {
            if step <= 0 {
                bail!("{} step must be positive, got {}", name, step);
            }
            if step.checked_mul(self.max_level as i32).is_none() {
                bail!(
                    "{} step {} at level {} overflows a kit move",
                    name,
                    step,
                    self.max_level
                );
            }
        }
        Ok(())
    }
}

impl Default for KitScale {
    fn default() -> Self {
        Self {
            pan_step: DEFAULT_PAN_STEP,
            tilt_step: DEFAULT_TILT_STEP,
            zoom_step: DEFAULT_ZOOM_STEP,
            max_level: crate::control::mapping::DEFAULT_MAX_SPEED_LEVEL,
        }
    }
}

/// Encode a tracking command as kit lines.
///
/// Each moving axis gets a relative move followed by its release; `HOLD`
/// releases pan, tilt and zoom.
pub fn encode(command: &PtzCommand, scale: &KitScale) -> Result<Vec<KitCommand>> {
    check_level("pan", command.pan, scale.max_level)?;
    check_level("tilt", command.tilt, scale.max_level)?;

    if command.is_hold() {
        return Ok(vec![
            KitCommand::Release(Axis::X),
            KitCommand::Release(Axis::Y),
            KitCommand::Release(Axis::A),
        ]);
    }

    let mut lines = Vec::with_capacity(6);
    let mut push_move = |axis: Axis, value: i32| {
        lines.push(KitCommand::Move { axis, value });
        lines.push(KitCommand::Release(axis));
    };
    if command.pan != 0 {
        push_move(Axis::X, scaled("pan", command.pan, scale.pan_step)?);
    }
    if command.tilt != 0 {
        push_move(Axis::Y, scaled("tilt", command.tilt, scale.tilt_step)?);
    }
    match command.zoom {
        ZoomAction::In => push_move(Axis::A, scaled("zoom", 1, scale.zoom_step)?),
        ZoomAction::Out => push_move(Axis::A, scaled("zoom", -1, scale.zoom_step)?),
        ZoomAction::Hold => {}
    }
    Ok(lines)
}

fn scaled(name: &str, level: i8, step: i32) -> Result<i32> {
    (level as i32)
        .checked_mul(step)
        .ok_or_else(|| anyhow!("{} level {} with step {} overflows a kit move", name, level, step))
}

/// Recover the tracking command from kit lines produced by `encode`.
pub fn decode(lines: &[KitCommand], scale: &KitScale) -> Result<PtzCommand> {
    let mut command = PtzCommand::HOLD;
    for line in lines {
        match line {
            KitCommand::Move { axis: Axis::X, value } => {
                command.pan = to_level("pan", *value, scale.pan_step, scale.max_level)?;
            }
            KitCommand::Move { axis: Axis::Y, value } => {
                command.tilt = to_level("tilt", *value, scale.tilt_step, scale.max_level)?;
            }
            KitCommand::Move { axis: Axis::A, value } => {
                command.zoom = if *value > 0 {
                    ZoomAction::In
                } else if *value < 0 {
                    ZoomAction::Out
                } else {
                    ZoomAction::Hold
                };
            }
            KitCommand::Release(_) | KitCommand::RelativePositioning => {}
            other => bail!("'{}' is not part of a tracking command", other),
        }
    }
    Ok(command)
}

fn check_level(name: &str, level: i8, max: i8) -> Result<()> {
    if (level as i16).abs() > max as i16 {
        bail!("{} level {} outside accepted range ±{}", name, level, max);
    }
    Ok(())
}

fn to_level(name: &str, value: i32, step: i32, max: i8) -> Result<i8> {
    if step == 0 || value % step != 0 {
        return Err(anyhow!(
            "{} move {} is not a multiple of step {}",
            name,
            value,
            step
        ));
    }
    let level = value / step;
    if level.abs() > max as i32 {
        bail!("{} level {} outside accepted range ±{}", name, level, max);
    }
    Ok(level as i8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(cmds: &[KitCommand]) -> Vec<String> {
        cmds.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn encodes_pan_left_with_zoom_in() -> Result<()> {
        let cmd = PtzCommand::new(-4, 0, ZoomAction::In);
        let encoded = encode(&cmd, &KitScale::default())?;
        assert_eq!(lines(&encoded), vec!["G0 X-400", "M0 X", "G0 A500", "M0 A"]);
        Ok(())
    }

    #[test]
    fn hold_releases_motion_axes() -> Result<()> {
        let encoded = encode(&PtzCommand::HOLD, &KitScale::default())?;
        assert_eq!(lines(&encoded), vec!["M0 X", "M0 Y", "M0 A"]);
        Ok(())
    }

    #[test]
    fn round_trips_through_kit_text() -> Result<()> {
        let scale = KitScale::default();
        let zooms = [ZoomAction::In, ZoomAction::Out, ZoomAction::Hold];
        for pan in -scale.max_level..=scale.max_level {
            for tilt in [-2i8, 0, 3] {
                for zoom in zooms {
                    let cmd = PtzCommand::new(pan, tilt, zoom);
                    let text = lines(&encode(&cmd, &scale)?);
                    let parsed: Vec<KitCommand> = text
                        .iter()
                        .map(|l| l.parse())
                        .collect::<Result<_>>()?;
                    assert_eq!(decode(&parsed, &scale)?, cmd, "via {text:?}");
                }
            }
        }
        Ok(())
    }

    #[test]
    fn oversized_steps_are_rejected_not_wrapped() {
        let scale = KitScale {
            pan_step: 1_000_000_000,
            ..KitScale::default()
        };
        assert!(scale.validate().is_err());
        let err = encode(&PtzCommand::new(-4, 0, ZoomAction::Hold), &scale).unwrap_err();
        assert!(err.to_string().contains("overflows"));
        assert!(encode(&PtzCommand::new(2, 0, ZoomAction::Hold), &scale).is_ok());

        let zoom = KitScale {
            zoom_step: i32::MIN,
            ..KitScale::default()
        };
        assert!(zoom.validate().is_err());
        assert!(encode(&PtzCommand::new(0, 0, ZoomAction::Out), &zoom).is_err());
        assert!(KitScale::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_levels() {
        let scale = KitScale::default();
        assert!(encode(&PtzCommand::new(5, 0, ZoomAction::Hold), &scale).is_err());
        assert!(encode(&PtzCommand::new(0, -128, ZoomAction::Hold), &scale).is_err());
        let too_far = [KitCommand::Move {
            axis: Axis::X,
            value: 900,
        }];
        assert!(decode(&too_far, &scale).is_err());
        let off_grid = [KitCommand::Move {
            axis: Axis::Y,
            value: 150,
        }];
        assert!(decode(&off_grid, &scale).is_err());
    }

    #[test]
    fn decode_rejects_foreign_lines() {
        assert!(decode(&[KitCommand::Version], &KitScale::default()).is_err());
    }
}
