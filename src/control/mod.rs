//! Closed-loop tracking control.
//!
//! Per frame: select a target among the detections, turn its offset from the
//! frame centre into a `PtzCommand`, and let `TrackingController` decide
//! whether the command is sent (debounce and throttle).

mod command;
mod controller;
pub mod mapping;
mod select;

pub use command::{PtzCommand, ZoomAction};
pub use controller::{TrackingController, DEFAULT_MIN_COMMAND_INTERVAL};
pub use mapping::{map_target, normalized_offset, speed_level, zoom_action, AxisLatch, MappingConfig};
pub use select::{select_target, SelectionPolicy};
