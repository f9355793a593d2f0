use std::fmt;

/// Lens zoom decision for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ZoomAction {
    In,
    Out,
    #[default]
    Hold,
}

/// One pan/tilt/zoom correction.
///
/// `pan` and `tilt` are signed speed levels: positive pan turns right,
/// positive tilt turns down (image y grows downward), zero leaves the axis
/// alone. The all-zero command with `ZoomAction::Hold` means "stop".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PtzCommand {
    pub pan: i8,
    pub tilt: i8,
    pub zoom: ZoomAction,
}

impl PtzCommand {
    pub const HOLD: PtzCommand = PtzCommand {
        pan: 0,
        tilt: 0,
        zoom: ZoomAction::Hold,
    };

    pub fn new(pan: i8, tilt: i8, zoom: ZoomAction) -> Self {
        Self { pan, tilt, zoom }
    }

    pub fn is_hold(&self) -> bool {
        *self == Self::HOLD
    }

    pub fn has_pan_tilt(&self) -> bool {
        self.pan != 0 || self.tilt != 0
    }
}

impl fmt::Display for PtzCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_hold() {
            return write!(f, "hold");
        }
        let zoom = match self.zoom {
            ZoomAction::In => "in",
            ZoomAction::Out => "out",
            ZoomAction::Hold => "-",
        };
        write!(f, "pan={:+} tilt={:+} zoom={}", self.pan, self.tilt, zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_is_the_default() {
        assert!(PtzCommand::default().is_hold());
        assert!(!PtzCommand::new(0, 0, ZoomAction::In).is_hold());
        assert!(!PtzCommand::new(0, 0, ZoomAction::In).has_pan_tilt());
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(PtzCommand::HOLD.to_string(), "hold");
        assert_eq!(
            PtzCommand::new(-4, 1, ZoomAction::Out).to_string(),
            "pan=-4 tilt=+1 zoom=out"
        );
    }
}
