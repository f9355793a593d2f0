#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection, ObjectClass};
use crate::frame::Frame;

/// Box coordinates (cx, cy, w, h) precede the class scores in each anchor.
const BOX_FIELDS: usize = 4;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Tract-based YOLOv8 detector.
///
/// Loads a local ONNX export (`yolov8n.onnx` and friends) and expects the
/// standard detect head output of shape `[1, 4 + classes, anchors]`.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    width: u32,
    height: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!(
            "TractBackend: loaded {} ({}x{} input)",
            model_path.display(),
            width,
            height
        );

        Ok(Self {
            model,
            width,
            height,
            confidence_threshold: 0.3,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Nearest-neighbour resize of the frame into a normalised NCHW tensor.
    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        if frame.width == 0 || frame.height == 0 {
            return Err(anyhow!("empty frame"));
        }
        let (in_w, in_h) = (self.width as usize, self.height as usize);
        let (src_w, src_h) = (frame.width as usize, frame.height as usize);
        let pixels = frame.pixels();

        let input = tract_ndarray::Array4::from_shape_fn((1, 3, in_h, in_w), |(_, c, y, x)| {
            let sx = (x * src_w / in_w).min(src_w - 1);
            let sy = (y * src_h / in_h).min(src_h - 1);
            pixels[(sy * src_w + sx) * 3 + c] as f32 / 255.0
        });

        Ok(input.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let preds = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = preds.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 || shape[1] <= BOX_FIELDS {
            return Err(anyhow!("unexpected YOLO output shape {:?}", shape));
        }
        let (fields, anchors) = (shape[1], shape[2]);
        let preds = preds
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("YOLO output is not three-dimensional")?;

        let scale_x = frame.width as f32 / self.width as f32;
        let scale_y = frame.height as f32 / self.height as f32;

        let mut candidates = Vec::new();
        for a in 0..anchors {
            let (class_id, score) = (BOX_FIELDS..fields)
                .map(|f| (f - BOX_FIELDS, preds[[0, f, a]]))
                .fold((0usize, f32::NEG_INFINITY), |best, cur| {
                    if cur.1 > best.1 {
                        cur
                    } else {
                        best
                    }
                });
            if !score.is_finite() || score < self.confidence_threshold {
                continue;
            }
            let bbox = BoundingBox::from_center(
                preds[[0, 0, a]] * scale_x,
                preds[[0, 1, a]] * scale_y,
                preds[[0, 2, a]] * scale_x,
                preds[[0, 3, a]] * scale_y,
            )
            .clamp_to(frame.geometry());
            candidates.push(Detection::new(
                ObjectClass::from_coco(class_id as u32),
                score,
                bbox,
            ));
        }

        non_max_suppression(&mut candidates, self.iou_threshold);
        Ok(candidates)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, frame)
    }
}

/// Greedy per-class NMS, highest confidence first.
fn non_max_suppression(xs: &mut Vec<Detection>, iou_threshold: f32) {
    xs.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept = 0;
    for index in 0..xs.len() {
        let drop = (0..kept).any(|prev| {
            xs[prev].class == xs[index].class && xs[prev].bbox.iou(&xs[index].bbox) > iou_threshold
        });
        if !drop {
            xs.swap(kept, index);
            kept += 1;
        }
    }
    xs.truncate(kept);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nms_drops_overlapping_same_class() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(1.0, 1.0, 11.0, 11.0);
        let mut xs = vec![
            Detection::person(0.5, b),
            Detection::person(0.9, a),
            Detection::new(ObjectClass::Other(2), 0.7, b),
        ];
        non_max_suppression(&mut xs, 0.45);
        assert_eq!(xs.len(), 2);
        assert_eq!(xs[0].confidence, 0.9);
        assert_eq!(xs[1].class, ObjectClass::Other(2));
    }

    #[test]
    fn missing_model_fails_to_load() {
        assert!(TractBackend::new("/nonexistent/yolov8n.onnx", 640, 640).is_err());
    }
}
