use anyhow::{Context, Result};

use crate::control::PtzCommand;
use crate::kit::codec::{encode, KitScale};
use crate::kit::command::{mcode, Axis, KitCommand};
use crate::transport::CommandLink;

/// Lighting profile for the camera module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LightMode {
    Day,
    Night,
}

/// An open session with the camera controller kit.
///
/// Owns the link for its whole lifetime. Dropping the session releases the
/// motion axes (best effort) before the link itself is closed.
pub struct CameraKit<L: CommandLink> {
    link: L,
    scale: KitScale,
    relative: bool,
}

impl<L: CommandLink> CameraKit<L> {
    pub fn new(link: L, scale: KitScale) -> Self {
        Self {
            link,
            scale,
            relative: false,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Send one command and return the kit's reply.
    pub fn send(&mut self, command: &KitCommand) -> Result<String> {
        let line = command.to_string();
        let reply = self
            .link
            .send_line(&line)
            .with_context(|| format!("send '{}' via {}", line, self.link.describe()))?;
        match command {
            KitCommand::RelativePositioning => self.relative = true,
            KitCommand::AbsolutePositioning => self.relative = false,
            _ => {}
        }
        Ok(reply)
    }

    fn send_all(&mut self, commands: &[KitCommand]) -> Result<()> {
        for command in commands {
            self.send(command)?;
        }
        Ok(())
    }

    /// Power up the camera module and report the firmware version.
    pub fn wake_up(&mut self) -> Result<String> {
        self.send(&KitCommand::machine(mcode::WAKE))?;
        self.send(&KitCommand::machine(mcode::ENABLE))?;
        let version = self.send(&KitCommand::Version)?;
        self.set_ir(false)?;
        Ok(version)
    }

    pub fn set_ir(&mut self, on: bool) -> Result<()> {
        self.send(&KitCommand::machine_arg(mcode::IR_CUT, on as u32))?;
        Ok(())
    }

    pub fn set_mode(&mut self, mode: LightMode) -> Result<()> {
        let (brightness, gain, ir) = match mode {
            LightMode::Day => (50, 10, false),
            LightMode::Night => (5, 40, true),
        };
        self.send_all(&[
            KitCommand::machine_arg(mcode::EXPOSURE_MODE, 0),
            KitCommand::machine_arg(mcode::BRIGHTNESS, brightness),
            KitCommand::machine_arg(mcode::GAIN, gain),
        ])?;
        self.set_ir(ir)
    }

    /// Lens autofocus routine built into the kit firmware.
    pub fn autofocus(&mut self) -> Result<()> {
        self.send_all(&[
            KitCommand::RelativePositioning,
            KitCommand::machine(mcode::AUTOFOCUS),
            KitCommand::machine_arg(mcode::BRIGHTNESS, 50),
            KitCommand::Move {
                axis: Axis::A,
                value: 30000,
            },
            KitCommand::Release(Axis::A),
        ])
    }

    /// Absolute move of one axis, followed by its release.
    pub fn move_to(&mut self, axis: Axis, value: i32) -> Result<()> {
        if self.relative {
            self.send(&KitCommand::AbsolutePositioning)?;
        }
        self.send_all(&[KitCommand::Move { axis, value }, KitCommand::Release(axis)])
    }

    pub fn pan_to(&mut self, value: i32) -> Result<()> {
        self.move_to(Axis::X, value)
    }

    pub fn tilt_to(&mut self, value: i32) -> Result<()> {
        self.move_to(Axis::Y, value)
    }

    pub fn zoom_to(&mut self, value: i32) -> Result<()> {
        self.move_to(Axis::A, value)
    }

    pub fn focus_to(&mut self, value: i32) -> Result<()> {
        self.move_to(Axis::B, value)
    }

    /// Switch to relative positioning for tracking corrections.
    pub fn begin_tracking(&mut self) -> Result<()> {
        self.send(&KitCommand::RelativePositioning)?;
        Ok(())
    }

    /// Send one tracking correction.
    ///
    /// If a line fails, the releases still pending in the sequence are tried
    /// before the error is returned, so no axis is left running.
    pub fn apply(&mut self, command: &PtzCommand) -> Result<()> {
        let lines = encode(command, &self.scale)?;
        if !self.relative && !command.is_hold() {
            self.begin_tracking()?;
        }
        for (i, line) in lines.iter().enumerate() {
            if let Err(err) = self.send(line) {
                self.release_pending(&lines[i..]);
                return Err(err);
            }
        }
        Ok(())
    }

    fn release_pending(&mut self, remaining: &[KitCommand]) {
        for line in remaining {
            if let KitCommand::Release(axis) = line {
                if let Err(err) = self.send(line) {
                    log::warn!("failed to release axis {}: {:#}", axis.letter(), err);
                }
            }
        }
    }
}

impl<L: CommandLink> Drop for CameraKit<L> {
    fn drop(&mut self) {
        for axis in [Axis::X, Axis::Y, Axis::A] {
            if let Err(err) = self.link.send_line(&KitCommand::Release(axis).to_string()) {
                log::warn!("failed to release axis {} on shutdown: {}", axis.letter(), err);
                break;
            }
        }
    }
}
