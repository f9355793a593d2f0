//! PTZ person follower
//!
//! Keeps a person centred in the view of a pan/tilt/zoom camera rig. Each
//! video frame goes through a detector; the chosen subject's offset from the
//! frame centre becomes a pan/tilt/zoom correction, which is sent to the
//! camera controller kit over a serial line.
//!
//! # Module Structure
//!
//! - `frame`: RGB24 frames and their geometry
//! - `ingest`: frame sources (synthetic scenes, V4L2 devices, local files)
//! - `detect`: detector backends and the person-filtering adapter
//! - `control`: target selection, offset-to-command mapping, debounce
//! - `kit`: controller-kit command set and session
//! - `transport`: serial and in-memory command links
//! - `focus`: sharpness-driven focus sweep
//! - `config`: layered configuration
//! - `tracker`: the closed loop

pub mod config;
pub mod control;
pub mod detect;
pub mod focus;
pub mod frame;
pub mod ingest;
pub mod kit;
pub mod tracker;
pub mod transport;

pub use config::{ControlSettings, DetectorSettings, LoopSettings, TrackerConfig};
pub use control::{
    select_target, PtzCommand, SelectionPolicy, TrackingController, ZoomAction,
};
pub use detect::{BackendKind, BoundingBox, Detection, Detections, Detector, ObjectClass};
pub use focus::{focus_sweep, sharpness, FocusResult, FocusSweep};
pub use frame::{Frame, FrameGeometry};
pub use ingest::{FrameSource, VideoConfig, VideoSource};
pub use kit::{Axis, CameraKit, KitCommand, KitScale, LightMode};
pub use tracker::{FrameOutcome, LoopSummary, StopReason, TrackingLoop};
pub use transport::{CommandLink, RecordingLink, SerialConfig, SerialLink};
