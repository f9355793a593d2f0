mod adapter;
mod backend;
mod backends;
mod result;

use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::Deserialize;

pub use adapter::{Detections, Detector};
pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{BoundingBox, Detection, ObjectClass};

/// Which detector backend to construct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Bright-subject detector for synthetic sources and bench tests.
    Stub,
    /// YOLOv8 ONNX model via tract.
    Tract,
}

impl BackendKind {
    /// `tract` when it is compiled in, `stub` otherwise.
    pub fn default_for_build() -> Self {
        if cfg!(feature = "backend-tract") {
            BackendKind::Tract
        } else {
            BackendKind::Stub
        }
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(BackendKind::Stub),
            "tract" => Ok(BackendKind::Tract),
            other => Err(anyhow!("unknown detector backend '{}'", other)),
        }
    }
}
