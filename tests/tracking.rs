use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use anyhow::Result;

use ptz_follow::control::MappingConfig;
use ptz_follow::kit::{decode, encode};
use ptz_follow::{
    BoundingBox, CameraKit, Detection, Detector, FrameGeometry, KitCommand, KitScale,
    LoopSettings, PtzCommand, RecordingLink, SelectionPolicy, StopReason, TrackingController,
    TrackingLoop, VideoConfig, VideoSource,
};

const FRAME: FrameGeometry = FrameGeometry {
    width: 640,
    height: 480,
};

fn controller() -> TrackingController {
    TrackingController::new(MappingConfig::default()).with_min_interval(Duration::ZERO)
}

fn person(x0: f32, y0: f32, x1: f32, y1: f32) -> Detection {
    Detection::person(0.8, BoundingBox::new(x0, y0, x1, y1))
}

#[test]
fn centred_box_issues_no_pan_or_tilt() {
    let mut ctl = controller();
    let target = person(270.0, 190.0, 370.0, 290.0);
    let command = ctl.update(FRAME, Some(&target), Instant::now());
    if let Some(command) = command {
        assert!(!command.has_pan_tilt(), "unexpected {}", command);
    }
}

#[test]
fn far_left_box_pans_left_at_top_speed() {
    let mut ctl = controller();
    let target = person(0.0, 190.0, 100.0, 290.0);
    let command = ctl
        .update(FRAME, Some(&target), Instant::now())
        .expect("far-left subject must move the camera");
    assert_eq!(command.pan, -MappingConfig::default().max_speed_level);
    assert_eq!(command.tilt, 0);
}

#[test]
fn empty_frame_issues_nothing_until_after_motion() {
    let mut ctl = controller();
    let now = Instant::now();
    assert_eq!(ctl.update(FRAME, None, now), None);

    let target = person(0.0, 190.0, 100.0, 290.0);
    assert!(ctl.update(FRAME, Some(&target), now).is_some());
    assert_eq!(ctl.update(FRAME, None, now), Some(PtzCommand::HOLD));
    assert_eq!(ctl.update(FRAME, None, now), None);
}

#[test]
fn mapped_commands_survive_the_wire() -> Result<()> {
    let scale = KitScale::default();
    let boxes = [
        person(0.0, 190.0, 100.0, 290.0),
        person(500.0, 0.0, 640.0, 120.0),
        person(200.0, 300.0, 260.0, 480.0),
        person(100.0, 40.0, 600.0, 470.0),
    ];
    for target in &boxes {
        let mut ctl = controller();
        let Some(command) = ctl.update(FRAME, Some(target), Instant::now()) else {
            continue;
        };
        let wire: Vec<String> = encode(&command, &scale)?
            .iter()
            .map(ToString::to_string)
            .collect();
        let parsed = wire
            .iter()
            .map(|line| line.parse::<KitCommand>())
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(decode(&parsed, &scale)?, command, "wire: {:?}", wire);
    }
    Ok(())
}

#[test]
fn dry_run_follows_a_sweeping_subject() -> Result<()> {
    let mut source = VideoSource::new(VideoConfig {
        source: "stub://sweep".to_string(),
        width: 320,
        height: 240,
        ..VideoConfig::default()
    })?;
    source.connect()?;
    let detector = Detector::new(Box::new(ptz_follow::detect::StubBackend::new()), 0.3);
    let mut tracker = TrackingLoop::new(
        source,
        detector,
        controller(),
        CameraKit::new(RecordingLink::new(), KitScale::default()),
        SelectionPolicy::Largest,
        LoopSettings {
            frame_interval: Duration::ZERO,
            max_consecutive_frame_failures: 1,
            max_frames: Some(60),
        },
    );

    let summary = tracker.run(&AtomicBool::new(false))?;
    assert_eq!(summary.stop_reason, StopReason::FrameLimit);
    assert_eq!(summary.frames, 60);
    assert_eq!(summary.frames_with_target, 60);
    assert!(summary.commands_sent > 0);
    assert_eq!(summary.write_failures, 0);

    let lines = tracker.kit().link().lines();
    assert!(lines.iter().any(|l| l.starts_with("G0 X")));
    for line in lines {
        line.parse::<KitCommand>()?;
    }
    Ok(())
}
