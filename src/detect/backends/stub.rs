use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};
use crate::frame::{Frame, RGB_CHANNELS};

/// Luma at or above which a pixel counts as part of the subject.
const DEFAULT_LUMA_THRESHOLD: u8 = 200;
/// Fewer bright pixels than this is treated as noise.
const DEFAULT_MIN_PIXELS: usize = 64;
const STUB_CONFIDENCE: f32 = 0.9;

/// Stub backend. Reports one person covering the bright region of the frame.
///
/// The synthetic video source draws its subject as a bright block on a dark
/// background, so the two together exercise the whole loop without a model.
pub struct StubBackend {
    luma_threshold: u8,
    min_pixels: usize,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            luma_threshold: DEFAULT_LUMA_THRESHOLD,
            min_pixels: DEFAULT_MIN_PIXELS,
        }
    }

    pub fn with_min_pixels(mut self, min_pixels: usize) -> Self {
        self.min_pixels = min_pixels;
        self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let width = frame.width as usize;
        let threshold = self.luma_threshold as u32;
        let mut count = 0usize;
        let (mut x_min, mut y_min) = (usize::MAX, usize::MAX);
        let (mut x_max, mut y_max) = (0usize, 0usize);

        for (i, px) in frame.pixels().chunks_exact(RGB_CHANNELS).enumerate() {
            // integer BT.601 luma
            let luma = (299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32) / 1000;
            if luma < threshold {
                continue;
            }
            let (x, y) = (i % width, i / width);
            count += 1;
            x_min = x_min.min(x);
            y_min = y_min.min(y);
            x_max = x_max.max(x);
            y_max = y_max.max(y);
        }

        if count < self.min_pixels {
            return Ok(Vec::new());
        }

        let bbox = BoundingBox::new(
            x_min as f32,
            y_min as f32,
            (x_max + 1) as f32,
            (y_max + 1) as f32,
        );
        Ok(vec![Detection::person(STUB_CONFIDENCE, bbox)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::ObjectClass;

    fn frame_with_block(x0: u32, y0: u32, x1: u32, y1: u32) -> Frame {
        let (w, h) = (64u32, 48u32);
        let mut data = vec![16u8; (w * h * 3) as usize];
        for y in y0..y1 {
            for x in x0..x1 {
                let idx = ((y * w + x) * 3) as usize;
                data[idx..idx + 3].copy_from_slice(&[250, 250, 250]);
            }
        }
        Frame::new(data, w, h).unwrap()
    }

    #[test]
    fn stub_reports_bright_block() -> Result<()> {
        let mut backend = StubBackend::new();
        let detections = backend.detect(&frame_with_block(10, 5, 30, 25))?;
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class, ObjectClass::Person);
        assert_eq!(
            detections[0].bbox,
            BoundingBox::new(10.0, 5.0, 30.0, 25.0)
        );
        Ok(())
    }

    #[test]
    fn stub_ignores_dark_frames_and_specks() -> Result<()> {
        let mut backend = StubBackend::new();
        assert!(backend.detect(&frame_with_block(0, 0, 0, 0))?.is_empty());
        // 4x4 = 16 bright pixels, below the noise floor
        assert!(backend.detect(&frame_with_block(0, 0, 4, 4))?.is_empty());
        let mut lenient = StubBackend::new().with_min_pixels(1);
        assert_eq!(lenient.detect(&frame_with_block(0, 0, 4, 4))?.len(), 1);
        Ok(())
    }
}
