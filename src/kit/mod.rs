//! Camera controller kit command set.
//!
//! The kit takes G-code style lines: `G0 <axis><value>` moves an axis,
//! `M0 <axis>` releases it, `G90`/`G91` switch between absolute and relative
//! positioning, and `M<code> [A<arg>]` drives the camera module itself
//! (wake, exposure, IR cut filter, autofocus).

mod codec;
mod command;
mod session;

pub use codec::{decode, encode, KitScale, DEFAULT_PAN_STEP, DEFAULT_TILT_STEP, DEFAULT_ZOOM_STEP};
pub use command::{mcode, Axis, KitCommand};
pub use session::{CameraKit, LightMode};
