use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use ptz_follow::{BackendKind, LightMode, SelectionPolicy, TrackerConfig};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "PTZ_CONFIG",
        "PTZ_SERIAL_PORT",
        "PTZ_BAUD_RATE",
        "PTZ_VIDEO",
        "PTZ_BACKEND",
        "PTZ_MODEL",
        "PTZ_CONFIDENCE",
        "PTZ_DEAD_ZONE",
        "PTZ_MAX_SPEED",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = TrackerConfig::load().expect("load defaults");
    assert_eq!(cfg.serial.port, "/dev/ttyACM0");
    assert_eq!(cfg.serial.baud_rate, 115_200);
    assert_eq!(cfg.serial.ready_delay, Duration::from_secs(2));
    assert_eq!(cfg.video.source, "/dev/video0");
    assert_eq!((cfg.video.width, cfg.video.height), (640, 480));
    assert_eq!(cfg.detector.model_path, PathBuf::from("yolov8n.onnx"));
    assert!((cfg.detector.confidence - 0.3).abs() < f32::EPSILON);
    assert_eq!(cfg.control.selection, SelectionPolicy::Largest);
    assert_eq!(cfg.control.mode, LightMode::Day);
    assert_eq!(cfg.control.scale.zoom_step, 500);
    assert_eq!(cfg.run_loop.max_consecutive_frame_failures, 5);
    assert_eq!(cfg.run_loop.frame_interval, Duration::from_millis(50));
}

#[test]
fn loads_json_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "serial": { "port": "/dev/ttyUSB1", "baud_rate": 57600, "ready_delay_ms": 500 },
        "video": { "source": "stub://sweep", "width": 320, "height": 240 },
        "detector": { "backend": "stub", "confidence": 0.5 },
        "control": {
            "selection": "central",
            "dead_zone": 0.15,
            "pan_step": 80,
            "mode": "night"
        },
        "loop": { "max_consecutive_frame_failures": 8 }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("PTZ_CONFIG", file.path());
    std::env::set_var("PTZ_SERIAL_PORT", "/dev/ttyACM3");
    std::env::set_var("PTZ_CONFIDENCE", "0.45");
    std::env::set_var("PTZ_MAX_SPEED", "6");

    let cfg = TrackerConfig::load().expect("load config");

    assert_eq!(cfg.serial.port, "/dev/ttyACM3");
    assert_eq!(cfg.serial.baud_rate, 57600);
    assert_eq!(cfg.serial.ready_delay, Duration::from_millis(500));
    assert_eq!(cfg.video.source, "stub://sweep");
    assert_eq!((cfg.video.width, cfg.video.height), (320, 240));
    assert_eq!(cfg.detector.backend, BackendKind::Stub);
    assert!((cfg.detector.confidence - 0.45).abs() < 1e-6);
    assert_eq!(cfg.control.selection, SelectionPolicy::Central);
    assert!((cfg.control.mapping.dead_zone - 0.15).abs() < 1e-6);
    assert_eq!(cfg.control.scale.pan_step, 80);
    assert_eq!(cfg.control.mode, LightMode::Night);
    assert_eq!(cfg.control.mapping.max_speed_level, 6);
    assert_eq!(cfg.control.scale.max_level, 6);
    assert_eq!(cfg.run_loop.max_consecutive_frame_failures, 8);

    clear_env();
}

#[test]
fn loads_toml_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
[serial]
port = "/dev/ttyS0"

[control]
selection = "confident"
zoom_in_below = 0.1
zoom_out_above = 0.5

[loop]
frame_interval_ms = 100
"#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    std::env::set_var("PTZ_CONFIG", file.path());

    let cfg = TrackerConfig::load().expect("load config");
    assert_eq!(cfg.serial.port, "/dev/ttyS0");
    assert_eq!(cfg.control.selection, SelectionPolicy::Confident);
    assert!((cfg.control.mapping.zoom_in_below - 0.1).abs() < 1e-6);
    assert!((cfg.control.mapping.zoom_out_above - 0.5).abs() < 1e-6);
    assert_eq!(cfg.run_loop.frame_interval, Duration::from_millis(100));

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PTZ_DEAD_ZONE", "1.5");
    assert!(TrackerConfig::load().is_err());
    std::env::remove_var("PTZ_DEAD_ZONE");

    std::env::set_var("PTZ_BAUD_RATE", "fast");
    assert!(TrackerConfig::load().is_err());
    std::env::remove_var("PTZ_BAUD_RATE");

    std::env::set_var("PTZ_BACKEND", "opencv");
    assert!(TrackerConfig::load().is_err());
    std::env::remove_var("PTZ_BACKEND");

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"{ not json").expect("write config");
    std::env::set_var("PTZ_CONFIG", file.path());
    assert!(TrackerConfig::load().is_err());

    clear_env();
}
