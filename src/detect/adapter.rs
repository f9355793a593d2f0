use anyhow::{Context, Result};

use crate::config::DetectorSettings;
use crate::detect::backend::DetectorBackend;
use crate::detect::backends::StubBackend;
use crate::detect::result::{Detection, ObjectClass};
use crate::detect::BackendKind;
use crate::frame::Frame;

/// Detector adapter: one backend plus the class and confidence filter applied
/// to its output.
pub struct Detector {
    backend: Box<dyn DetectorBackend>,
    target_class: ObjectClass,
    min_confidence: f32,
}

impl Detector {
    pub fn new(backend: Box<dyn DetectorBackend>, min_confidence: f32) -> Self {
        Self {
            backend,
            target_class: ObjectClass::Person,
            min_confidence,
        }
    }

    /// Build the configured backend. Model loading happens here, so any
    /// failure is a startup failure.
    pub fn from_settings(settings: &DetectorSettings) -> Result<Self> {
        let backend: Box<dyn DetectorBackend> = match settings.backend {
            BackendKind::Stub => Box::new(StubBackend::new()),
            BackendKind::Tract => tract_backend(settings)?,
        };
        let mut detector = Self::new(backend, settings.confidence);
        detector
            .backend
            .warm_up()
            .with_context(|| format!("warm up {} detector", detector.backend.name()))?;
        Ok(detector)
    }

    pub fn with_target_class(mut self, class: ObjectClass) -> Self {
        self.target_class = class;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    /// Run inference on a frame.
    ///
    /// The returned iterator yields only detections of the target class at or
    /// above the confidence floor. It is consumed once; run `detect` again for
    /// the next frame.
    pub fn detect(&mut self, frame: &Frame) -> Result<Detections> {
        let raw = self
            .backend
            .detect(frame)
            .with_context(|| format!("{} inference failed", self.backend.name()))?;
        Ok(Detections {
            inner: raw.into_iter(),
            class: self.target_class,
            min_confidence: self.min_confidence,
        })
    }
}

#[cfg(feature = "backend-tract")]
fn tract_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    use crate::detect::backends::TractBackend;

    let backend = TractBackend::new(
        &settings.model_path,
        settings.input_width,
        settings.input_height,
    )?
    .with_threshold(settings.confidence);
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn tract_backend(_settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow::anyhow!(
        "the tract detector requires the backend-tract feature"
    ))
}

/// Single-pass detections for one frame, filtered lazily.
pub struct Detections {
    inner: std::vec::IntoIter<Detection>,
    class: ObjectClass,
    min_confidence: f32,
}

impl Iterator for Detections {
    type Item = Detection;

    fn next(&mut self) -> Option<Detection> {
        let class = self.class;
        let floor = self.min_confidence;
        self.inner
            .by_ref()
            .find(|d| d.class == class && d.confidence >= floor)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}
