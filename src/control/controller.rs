use std::time::{Duration, Instant};

use crate::control::command::PtzCommand;
use crate::control::mapping::{map_target, AxisLatch, MappingConfig};
use crate::detect::Detection;
use crate::frame::FrameGeometry;

pub const DEFAULT_MIN_COMMAND_INTERVAL: Duration = Duration::from_millis(50);

/// Closed-loop controller state.
///
/// Holds everything that carries over between frames: which axes are moving,
/// the last command sent and when it was sent. One command at most is issued
/// per frame; nothing is queued.
#[derive(Debug)]
pub struct TrackingController {
    mapping: MappingConfig,
    min_interval: Duration,
    latch: AxisLatch,
    last_sent: Option<PtzCommand>,
    last_sent_at: Option<Instant>,
}

impl TrackingController {
    pub fn new(mapping: MappingConfig) -> Self {
        Self {
            mapping,
            min_interval: DEFAULT_MIN_COMMAND_INTERVAL,
            latch: AxisLatch::default(),
            last_sent: None,
            last_sent_at: None,
        }
    }

    /// Minimum spacing between motion commands.
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn last_sent(&self) -> Option<PtzCommand> {
        self.last_sent
    }

    /// Decide the command for this frame.
    ///
    /// - No target, or a target needing no correction: a single `HOLD` after
    ///   motion, otherwise nothing.
    /// - Motion: emitted unless the previous command went out less than
    ///   `min_interval` ago.
    pub fn update(
        &mut self,
        geometry: FrameGeometry,
        target: Option<&Detection>,
        now: Instant,
    ) -> Option<PtzCommand> {
        let intent = match target {
            Some(detection) => map_target(&detection.bbox, geometry, self.latch, &self.mapping),
            None => PtzCommand::HOLD,
        };
        self.latch = AxisLatch::from_command(&intent);

        if intent.is_hold() {
            return match self.last_sent {
                Some(last) if !last.is_hold() => Some(self.record(intent, now)),
                _ => None,
            };
        }

        if let Some(at) = self.last_sent_at {
            if now.saturating_duration_since(at) < self.min_interval {
                log::trace!("throttled {}", intent);
                return None;
            }
        }
        Some(self.record(intent, now))
    }

    fn record(&mut self, command: PtzCommand, now: Instant) -> PtzCommand {
        self.last_sent = Some(command);
        self.last_sent_at = Some(now);
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::command::ZoomAction;
    use crate::detect::BoundingBox;

    const FRAME: FrameGeometry = FrameGeometry {
        width: 640,
        height: 480,
    };

    fn at(x0: f32, y0: f32, x1: f32, y1: f32) -> Detection {
        Detection::person(0.9, BoundingBox::new(x0, y0, x1, y1))
    }

    fn controller() -> TrackingController {
        TrackingController::new(MappingConfig::default()).with_min_interval(Duration::ZERO)
    }

    #[test]
    fn centred_subject_issues_no_pan_tilt() {
        let mut c = controller();
        let cmd = c.update(FRAME, Some(&at(270.0, 190.0, 370.0, 290.0)), Instant::now());
        // the 100x100 box is small, so only zoom is requested
        assert_eq!(cmd, Some(PtzCommand::new(0, 0, ZoomAction::In)));
    }

    #[test]
    fn far_left_subject_pans_left_fast() {
        let mut c = controller();
        let cmd = c
            .update(FRAME, Some(&at(0.0, 190.0, 100.0, 290.0)), Instant::now())
            .unwrap();
        assert!(cmd.pan <= -3);
        assert_eq!(cmd.tilt, 0);
    }

    #[test]
    fn empty_frame_issues_nothing_when_idle() {
        let mut c = controller();
        assert_eq!(c.update(FRAME, None, Instant::now()), None);
        assert_eq!(c.last_sent(), None);
    }

    #[test]
    fn losing_the_subject_stops_once() {
        let mut c = controller();
        let now = Instant::now();
        assert!(c.update(FRAME, Some(&at(0.0, 190.0, 100.0, 290.0)), now).is_some());
        assert_eq!(c.update(FRAME, None, now), Some(PtzCommand::HOLD));
        assert_eq!(c.update(FRAME, None, now), None);
        assert_eq!(c.last_sent(), Some(PtzCommand::HOLD));
    }

    #[test]
    fn motion_is_throttled() {
        let mut c =
            TrackingController::new(MappingConfig::default()).with_min_interval(Duration::from_millis(50));
        let t0 = Instant::now();
        let left = at(0.0, 190.0, 100.0, 290.0);
        assert!(c.update(FRAME, Some(&left), t0).is_some());
        assert!(c.update(FRAME, Some(&left), t0 + Duration::from_millis(10)).is_none());
        assert!(c
            .update(FRAME, Some(&left), t0 + Duration::from_millis(60))
            .is_some());
    }

    #[test]
    fn stop_is_not_throttled() {
        let mut c = TrackingController::new(MappingConfig::default())
            .with_min_interval(Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(c
            .update(FRAME, Some(&at(0.0, 190.0, 100.0, 290.0)), t0)
            .is_some());
        assert_eq!(c.update(FRAME, None, t0), Some(PtzCommand::HOLD));
    }

    #[test]
    fn hysteresis_keeps_axis_moving_near_boundary() {
        let mut c = controller();
        let now = Instant::now();
        // mid-size box so zoom holds; centre x = 400 -> offset 0.25
        let outside = at(310.0, 150.0, 490.0, 330.0);
        let first = c.update(FRAME, Some(&outside), now).unwrap();
        assert!(first.pan > 0);
        // centre x = 349 -> offset ~0.0906, inside the dead zone but above 0.08
        let hovering = at(259.0, 150.0, 439.0, 330.0);
        let second = c.update(FRAME, Some(&hovering), now).unwrap();
        assert_eq!(second.pan, 1);
        // a fresh controller would not move at that offset
        let mut fresh = controller();
        assert_eq!(fresh.update(FRAME, Some(&hovering), now), None);
    }
}
