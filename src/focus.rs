//! Focus sweep driven by image sharpness.
//!
//! Sharpness is the variance of the 4-neighbour Laplacian over the grayscale
//! frame: in-focus images have strong local contrast, so the response spreads
//! out. The sweep steps the focus axis through a range, scores one frame per
//! position and finishes at the best one.

use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::kit::CameraKit;
use crate::transport::CommandLink;

#[derive(Clone, Debug)]
pub struct FocusSweep {
    pub min: i32,
    pub max: i32,
    pub step: i32,
    /// Wait after each focus move before capturing.
    pub settle: Duration,
}

impl Default for FocusSweep {
    fn default() -> Self {
        Self {
            min: 0,
            max: 60_000,
            step: 2_000,
            settle: Duration::from_millis(150),
        }
    }
}

impl FocusSweep {
    pub fn positions(&self) -> Result<Vec<i32>> {
        if self.step <= 0 {
            return Err(anyhow!("focus step must be positive"));
        }
        if self.min > self.max {
            return Err(anyhow!(
                "focus range is empty ({}..={})",
                self.min,
                self.max
            ));
        }
        Ok((self.min..=self.max).step_by(self.step as usize).collect())
    }
}

/// Outcome of a sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct FocusResult {
    pub position: i32,
    pub sharpness: f64,
    pub frames_scored: usize,
}

/// Variance of the Laplacian of the frame's luma.
pub fn sharpness(frame: &Frame) -> f64 {
    let (w, h) = (frame.width as usize, frame.height as usize);
    if w < 3 || h < 3 {
        return 0.0;
    }
    let luma = frame.luma();

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut n = 0usize;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let c = luma[y * w + x];
            let lap = luma[(y - 1) * w + x] + luma[(y + 1) * w + x] + luma[y * w + x - 1]
                + luma[y * w + x + 1]
                - 4.0 * c;
            let lap = lap as f64;
            sum += lap;
            sum_sq += lap * lap;
            n += 1;
        }
    }
    let mean = sum / n as f64;
    (sum_sq / n as f64 - mean * mean).max(0.0)
}

/// Step the focus axis through `sweep`, then move to the sharpest position.
///
/// Positions whose frame cannot be read are skipped. If no frame was scored
/// at all, focus is left at `sweep.min`.
pub fn focus_sweep<L: CommandLink, S: FrameSource>(
    kit: &mut CameraKit<L>,
    source: &mut S,
    sweep: &FocusSweep,
) -> Result<FocusResult> {
    let mut best = FocusResult {
        position: sweep.min,
        sharpness: -1.0,
        frames_scored: 0,
    };

    log::info!(
        "running focus sweep {}..={} step {}",
        sweep.min,
        sweep.max,
        sweep.step
    );
    for position in sweep.positions()? {
        kit.focus_to(position)?;
        if !sweep.settle.is_zero() {
            thread::sleep(sweep.settle);
        }
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(err) => {
                log::warn!("focus {}: frame read failed: {:#}", position, err);
                continue;
            }
        };
        let score = sharpness(&frame);
        best.frames_scored += 1;
        log::info!("focus {} -> variance {:.2}", position, score);
        if score > best.sharpness {
            best.position = position;
            best.sharpness = score;
        }
    }

    if best.frames_scored == 0 {
        best.sharpness = 0.0;
    }
    log::info!(
        "best focus {} (variance {:.2})",
        best.position,
        best.sharpness
    );
    kit.focus_to(best.position)?;
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{VideoConfig, VideoSource};
    use crate::kit::KitScale;
    use crate::transport::RecordingLink;

    fn flat(value: u8) -> Frame {
        Frame::new(vec![value; 16 * 16 * 3], 16, 16).unwrap()
    }

    fn checkerboard() -> Frame {
        let mut data = Vec::with_capacity(16 * 16 * 3);
        for y in 0..16 {
            for x in 0..16 {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v, v]);
            }
        }
        Frame::new(data, 16, 16).unwrap()
    }

    #[test]
    fn flat_frames_have_no_sharpness() {
        assert!(sharpness(&flat(128)) < 1e-6);
    }

    #[test]
    fn edges_are_sharper_than_flat() {
        assert!(sharpness(&checkerboard()) > sharpness(&flat(40)));
    }

    #[test]
    fn positions_cover_range_inclusively() -> Result<()> {
        let sweep = FocusSweep {
            min: 0,
            max: 6000,
            step: 2000,
            settle: Duration::ZERO,
        };
        assert_eq!(sweep.positions()?, vec![0, 2000, 4000, 6000]);
        assert!(FocusSweep {
            step: 0,
            ..sweep.clone()
        }
        .positions()
        .is_err());
        Ok(())
    }

    #[test]
    fn sweep_visits_positions_and_parks_on_best() -> Result<()> {
        let mut kit = CameraKit::new(RecordingLink::new(), KitScale::default());
        let mut source = VideoSource::new(VideoConfig {
            source: "stub://center".to_string(),
            width: 64,
            height: 48,
            ..VideoConfig::default()
        })?;
        source.connect()?;
        let sweep = FocusSweep {
            min: 0,
            max: 2000,
            step: 1000,
            settle: Duration::ZERO,
        };
        let result = focus_sweep(&mut kit, &mut source, &sweep)?;
        assert_eq!(result.frames_scored, 3);
        // identical synthetic frames: the first position wins ties
        assert_eq!(result.position, 0);
        let lines = kit.link().lines();
        assert_eq!(lines.first().map(String::as_str), Some("G0 B0"));
        assert_eq!(
            &lines[lines.len() - 2..],
            ["G0 B0".to_string(), "M0 B".to_string()]
        );
        Ok(())
    }
}
