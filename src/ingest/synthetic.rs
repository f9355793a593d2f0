//! Synthetic frame source (`stub://<scene>`).
//!
//! Draws a bright subject on a dark background so the stub detector has
//! something to find. Scenes:
//! - `center`: subject parked at the frame centre
//! - `left`: subject parked at the far left edge
//! - `sweep`: subject moves back and forth across the frame
//! - `empty`: background only

use std::str::FromStr;

use anyhow::{anyhow, Result};

use super::{VideoConfig, VideoStats, STUB_SCHEME};
use crate::frame::{rgb_len, Frame};

const BACKGROUND: u8 = 24;
const SUBJECT: u8 = 240;
/// Frames for one left-to-right pass of the sweep scene.
const SWEEP_PERIOD: u64 = 120;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scene {
    Center,
    Left,
    Sweep,
    Empty,
}

impl FromStr for Scene {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "center" => Ok(Scene::Center),
            "left" => Ok(Scene::Left),
            "sweep" => Ok(Scene::Sweep),
            "empty" => Ok(Scene::Empty),
            other => Err(anyhow!("unknown synthetic scene '{}'", other)),
        }
    }
}

pub struct SyntheticSource {
    config: VideoConfig,
    scene: Scene,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(config: VideoConfig) -> Result<Self> {
        let scene = config
            .source
            .trim()
            .strip_prefix(STUB_SCHEME)
            .unwrap_or_default()
            .parse()?;
        if config.width < 8 || config.height < 8 {
            return Err(anyhow!(
                "synthetic frames must be at least 8x8, got {}x{}",
                config.width,
                config.height
            ));
        }
        Ok(Self {
            config,
            scene,
            frame_count: 0,
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.config.source,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        let (w, h) = (self.config.width, self.config.height);
        let mut pixels = vec![BACKGROUND; rgb_len(w, h)?];

        if let Some((x0, y0, x1, y1)) = self.subject_rect() {
            for y in y0..y1 {
                let row = (y * w) as usize * 3;
                pixels[row + x0 as usize * 3..row + x1 as usize * 3].fill(SUBJECT);
            }
        }

        Frame::new(pixels, w, h)
    }

    /// Subject rectangle (x0, y0, x1, y1), exclusive on the far edges.
    fn subject_rect(&self) -> Option<(u32, u32, u32, u32)> {
        let (w, h) = (self.config.width, self.config.height);
        let (sw, sh) = (w / 8, h / 3);
        let y0 = (h - sh) / 2;
        let x0 = match self.scene {
            Scene::Empty => return None,
            Scene::Center => (w - sw) / 2,
            Scene::Left => 0,
            Scene::Sweep => {
                let travel = (w - sw) as u64;
                let phase = self.frame_count % (2 * SWEEP_PERIOD);
                let pos = if phase < SWEEP_PERIOD {
                    phase
                } else {
                    2 * SWEEP_PERIOD - phase
                };
                (travel * pos / SWEEP_PERIOD) as u32
            }
        };
        Some((x0, y0, x0 + sw, y0 + sh))
    }

    pub fn stats(&self) -> VideoStats {
        VideoStats {
            frames_captured: self.frame_count,
            source: self.config.source.clone(),
        }
    }
}
