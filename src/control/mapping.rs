//! Offset-to-command mapping.
//!
//! Offsets are normalised to [-1, 1] per axis relative to the frame centre.
//! Inside the dead zone an axis gets no command. The boundary value itself is
//! on the no-command side. Once an axis is moving it keeps moving until the
//! offset falls to `dead_zone - hysteresis`, so a subject hovering on the
//! boundary does not toggle the motor every frame.
//!
//! Outside the dead zone the remaining range `(dead_zone, 1]` is split evenly
//! into `max_speed_level` steps. Zoom follows the box area as a fraction of
//! the frame area.

use crate::control::command::{PtzCommand, ZoomAction};
use crate::detect::BoundingBox;
use crate::frame::FrameGeometry;

pub const DEFAULT_DEAD_ZONE: f32 = 0.10;
pub const DEFAULT_HYSTERESIS: f32 = 0.02;
pub const DEFAULT_MAX_SPEED_LEVEL: i8 = 4;
pub const DEFAULT_ZOOM_IN_BELOW: f32 = 0.05;
pub const DEFAULT_ZOOM_OUT_ABOVE: f32 = 0.35;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MappingConfig {
    pub dead_zone: f32,
    pub hysteresis: f32,
    pub max_speed_level: i8,
    /// Zoom in while the box covers less than this fraction of the frame.
    pub zoom_in_below: f32,
    /// Zoom out while the box covers more than this fraction of the frame.
    pub zoom_out_above: f32,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            dead_zone: DEFAULT_DEAD_ZONE,
            hysteresis: DEFAULT_HYSTERESIS,
            max_speed_level: DEFAULT_MAX_SPEED_LEVEL,
            zoom_in_below: DEFAULT_ZOOM_IN_BELOW,
            zoom_out_above: DEFAULT_ZOOM_OUT_ABOVE,
        }
    }
}

/// Whether each motion axis was moving after the previous frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AxisLatch {
    pub pan: bool,
    pub tilt: bool,
}

impl AxisLatch {
    pub fn from_command(command: &PtzCommand) -> Self {
        Self {
            pan: command.pan != 0,
            tilt: command.tilt != 0,
        }
    }
}

/// Box-centre offset from the frame centre, each axis in [-1, 1].
///
/// Positive x means the subject is right of centre, positive y below it.
pub fn normalized_offset(bbox: &BoundingBox, geometry: FrameGeometry) -> (f32, f32) {
    let (cx, cy) = geometry.center();
    let (bx, by) = bbox.center();
    (axis_offset(bx, cx), axis_offset(by, cy))
}

fn axis_offset(position: f32, half: f32) -> f32 {
    if half <= 0.0 {
        return 0.0;
    }
    ((position - half) / half).clamp(-1.0, 1.0)
}

/// Signed speed level for one axis. Zero means no command on this axis.
pub fn speed_level(offset: f32, engaged: bool, config: &MappingConfig) -> i8 {
    let max = config.max_speed_level.max(1);
    let magnitude = offset.abs();
    let threshold = if engaged {
        config.dead_zone - config.hysteresis
    } else {
        config.dead_zone
    };
    // NaN offsets fall through here as "no command"
    if !(magnitude > threshold) {
        return 0;
    }

    let span = (1.0 - config.dead_zone).max(f32::EPSILON);
    let fraction = ((magnitude - config.dead_zone) / span).clamp(0.0, 1.0);
    let level = ((fraction * max as f32).ceil() as i8).clamp(1, max);
    if offset < 0.0 {
        -level
    } else {
        level
    }
}

/// Zoom decision from the box area relative to the frame area.
pub fn zoom_action(bbox: &BoundingBox, geometry: FrameGeometry, config: &MappingConfig) -> ZoomAction {
    let frame_area = geometry.area();
    if frame_area <= 0.0 {
        return ZoomAction::Hold;
    }
    let ratio = bbox.area() / frame_area;
    if ratio < config.zoom_in_below {
        ZoomAction::In
    } else if ratio > config.zoom_out_above {
        ZoomAction::Out
    } else {
        ZoomAction::Hold
    }
}

/// Map the selected subject to a command, given which axes were already moving.
pub fn map_target(
    bbox: &BoundingBox,
    geometry: FrameGeometry,
    latch: AxisLatch,
    config: &MappingConfig,
) -> PtzCommand {
    let (dx, dy) = normalized_offset(bbox, geometry);
    PtzCommand {
        pan: speed_level(dx, latch.pan, config),
        tilt: speed_level(dy, latch.tilt, config),
        zoom: zoom_action(bbox, geometry, config),
    }
}
