//! Captured video frames.
//!
//! - `Frame`: one RGB24 image, owned by the capture loop for a single iteration.
//! - `FrameGeometry`: the frame dimensions alone, which is all the controller needs.
//!
//! Frames are produced by the ingestion layer and consumed immediately by the
//! detector. Nothing retains a frame past the iteration that captured it.

use anyhow::{anyhow, Result};

/// Bytes per RGB24 pixel.
pub const RGB_CHANNELS: usize = 3;

/// Width and height of a frame in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Frame centre in pixel coordinates.
    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.width as f32 * self.height as f32
    }
}

/// One RGB24 frame (row-major, no padding).
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap an RGB24 buffer. The buffer length must be exactly `width * height * 3`.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.width, self.height)
    }

    /// Raw RGB24 pixels.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// RGB triple at (x, y). Returns `None` outside the frame.
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * RGB_CHANNELS;
        let px = self.data.get(idx..idx + RGB_CHANNELS)?;
        Some([px[0], px[1], px[2]])
    }

    /// BT.601 luma for every pixel, row-major.
    pub fn luma(&self) -> Vec<f32> {
        self.data
            .chunks_exact(RGB_CHANNELS)
            .map(|px| 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32)
            .collect()
    }
}

/// Byte length of an RGB24 buffer, checking for overflow.
pub fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(RGB_CHANNELS))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_wrong_length() {
        assert!(Frame::new(vec![0; 10], 2, 2).is_err());
        assert!(Frame::new(vec![0; 12], 2, 2).is_ok());
    }

    #[test]
    fn rgb_at_indexes_row_major() -> Result<()> {
        let mut data = vec![0u8; 2 * 2 * 3];
        // pixel (1, 1)
        data[9] = 10;
        data[10] = 20;
        data[11] = 30;
        let frame = Frame::new(data, 2, 2)?;
        assert_eq!(frame.rgb_at(1, 1), Some([10, 20, 30]));
        assert_eq!(frame.rgb_at(0, 0), Some([0, 0, 0]));
        assert_eq!(frame.rgb_at(2, 0), None);
        Ok(())
    }

    #[test]
    fn geometry_center_and_area() {
        let g = FrameGeometry::new(640, 480);
        assert_eq!(g.center(), (320.0, 240.0));
        assert_eq!(g.area(), 307_200.0);
    }

    #[test]
    fn luma_of_white_is_full_scale() -> Result<()> {
        let frame = Frame::new(vec![255; 3], 1, 1)?;
        let luma = frame.luma();
        assert!((luma[0] - 255.0).abs() < 0.01);
        Ok(())
    }
}
