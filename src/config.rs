use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::control::{MappingConfig, SelectionPolicy, DEFAULT_MIN_COMMAND_INTERVAL};
use crate::detect::BackendKind;
use crate::ingest::VideoConfig;
use crate::kit::{KitScale, LightMode, DEFAULT_PAN_STEP, DEFAULT_TILT_STEP, DEFAULT_ZOOM_STEP};
use crate::transport::SerialConfig;

const DEFAULT_MODEL_PATH: &str = "yolov8n.onnx";
const DEFAULT_CONFIDENCE: f32 = 0.3;
const DEFAULT_MODEL_INPUT: u32 = 640;
const DEFAULT_FRAME_INTERVAL_MS: u64 = 50;
const DEFAULT_MAX_FRAME_FAILURES: u32 = 5;

#[derive(Debug, Deserialize, Default)]
struct TrackerConfigFile {
    serial: Option<SerialConfigFile>,
    video: Option<VideoConfigFile>,
    detector: Option<DetectorConfigFile>,
    control: Option<ControlConfigFile>,
    #[serde(rename = "loop")]
    run_loop: Option<LoopConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SerialConfigFile {
    port: Option<String>,
    baud_rate: Option<u32>,
    timeout_ms: Option<u64>,
    ready_delay_ms: Option<u64>,
    response_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct VideoConfigFile {
    source: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<BackendKind>,
    model_path: Option<PathBuf>,
    confidence: Option<f32>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ControlConfigFile {
    selection: Option<SelectionPolicy>,
    dead_zone: Option<f32>,
    hysteresis: Option<f32>,
    max_speed_level: Option<i8>,
    zoom_in_below: Option<f32>,
    zoom_out_above: Option<f32>,
    pan_step: Option<i32>,
    tilt_step: Option<i32>,
    zoom_step: Option<i32>,
    min_command_interval_ms: Option<u64>,
    mode: Option<LightMode>,
}

#[derive(Debug, Deserialize, Default)]
struct LoopConfigFile {
    frame_interval_ms: Option<u64>,
    max_consecutive_frame_failures: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: BackendKind,
    pub model_path: PathBuf,
    pub confidence: f32,
    pub input_width: u32,
    pub input_height: u32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default_for_build(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            confidence: DEFAULT_CONFIDENCE,
            input_width: DEFAULT_MODEL_INPUT,
            input_height: DEFAULT_MODEL_INPUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlSettings {
    pub selection: SelectionPolicy,
    pub mapping: MappingConfig,
    pub scale: KitScale,
    pub min_command_interval: Duration,
    /// Lighting profile applied right after wake-up.
    pub mode: LightMode,
}

#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Pause between iterations.
    pub frame_interval: Duration,
    /// Consecutive frame read failures tolerated before giving up.
    pub max_consecutive_frame_failures: u32,
    /// Stop after this many frames (bench runs).
    pub max_frames: Option<u64>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
            max_consecutive_frame_failures: DEFAULT_MAX_FRAME_FAILURES,
            max_frames: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub serial: SerialConfig,
    pub video: VideoConfig,
    pub detector: DetectorSettings,
    pub control: ControlSettings,
    pub run_loop: LoopSettings,
}

impl TrackerConfig {
    /// Defaults, then the file named by `PTZ_CONFIG`, then `PTZ_*` overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PTZ_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: TrackerConfigFile) -> Self {
        let serial_defaults = SerialConfig::default();
        let serial_file = file.serial.unwrap_or_default();
        let serial = SerialConfig {
            port: serial_file.port.unwrap_or(serial_defaults.port),
            baud_rate: serial_file.baud_rate.unwrap_or(serial_defaults.baud_rate),
            timeout: serial_file
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(serial_defaults.timeout),
            ready_delay: serial_file
                .ready_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(serial_defaults.ready_delay),
            response_delay: serial_file
                .response_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(serial_defaults.response_delay),
        };

        let video_defaults = VideoConfig::default();
        let video_file = file.video.unwrap_or_default();
        let video = VideoConfig {
            source: video_file.source.unwrap_or(video_defaults.source),
            target_fps: video_file.target_fps.unwrap_or(video_defaults.target_fps),
            width: video_file.width.unwrap_or(video_defaults.width),
            height: video_file.height.unwrap_or(video_defaults.height),
        };

        let detector_defaults = DetectorSettings::default();
        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: detector_file.backend.unwrap_or(detector_defaults.backend),
            model_path: detector_file
                .model_path
                .unwrap_or(detector_defaults.model_path),
            confidence: detector_file
                .confidence
                .unwrap_or(detector_defaults.confidence),
            input_width: detector_file
                .input_width
                .unwrap_or(detector_defaults.input_width),
            input_height: detector_file
                .input_height
                .unwrap_or(detector_defaults.input_height),
        };

        let mapping_defaults = MappingConfig::default();
        let control_file = file.control.unwrap_or_default();
        let max_speed_level = control_file
            .max_speed_level
            .unwrap_or(mapping_defaults.max_speed_level);
        let control = ControlSettings {
            selection: control_file.selection.unwrap_or_default(),
            mapping: MappingConfig {
                dead_zone: control_file.dead_zone.unwrap_or(mapping_defaults.dead_zone),
                hysteresis: control_file
                    .hysteresis
                    .unwrap_or(mapping_defaults.hysteresis),
                max_speed_level,
                zoom_in_below: control_file
                    .zoom_in_below
                    .unwrap_or(mapping_defaults.zoom_in_below),
                zoom_out_above: control_file
                    .zoom_out_above
                    .unwrap_or(mapping_defaults.zoom_out_above),
            },
            scale: KitScale {
                pan_step: control_file.pan_step.unwrap_or(DEFAULT_PAN_STEP),
                tilt_step: control_file.tilt_step.unwrap_or(DEFAULT_TILT_STEP),
                zoom_step: control_file.zoom_step.unwrap_or(DEFAULT_ZOOM_STEP),
                max_level: max_speed_level,
            },
            min_command_interval: control_file
                .min_command_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_MIN_COMMAND_INTERVAL),
            mode: control_file.mode.unwrap_or(LightMode::Day),
        };

        let loop_defaults = LoopSettings::default();
        let loop_file = file.run_loop.unwrap_or_default();
        let run_loop = LoopSettings {
            frame_interval: loop_file
                .frame_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(loop_defaults.frame_interval),
            max_consecutive_frame_failures: loop_file
                .max_consecutive_frame_failures
                .unwrap_or(loop_defaults.max_consecutive_frame_failures),
            max_frames: None,
        };

        Self {
            serial,
            video,
            detector,
            control,
            run_loop,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(port) = env_nonempty("PTZ_SERIAL_PORT") {
            self.serial.port = port;
        }
        if let Some(baud) = env_nonempty("PTZ_BAUD_RATE") {
            self.serial.baud_rate = baud
                .parse()
                .map_err(|_| anyhow!("PTZ_BAUD_RATE must be an integer"))?;
        }
        if let Some(video) = env_nonempty("PTZ_VIDEO") {
            self.video.source = video;
        }
        if let Some(backend) = env_nonempty("PTZ_BACKEND") {
            self.detector.backend = backend.parse()?;
        }
        if let Some(model) = env_nonempty("PTZ_MODEL") {
            self.detector.model_path = PathBuf::from(model);
        }
        if let Some(conf) = env_nonempty("PTZ_CONFIDENCE") {
            self.detector.confidence = conf
                .parse()
                .map_err(|_| anyhow!("PTZ_CONFIDENCE must be a number"))?;
        }
        if let Some(dead_zone) = env_nonempty("PTZ_DEAD_ZONE") {
            self.control.mapping.dead_zone = dead_zone
                .parse()
                .map_err(|_| anyhow!("PTZ_DEAD_ZONE must be a number"))?;
        }
        if let Some(level) = env_nonempty("PTZ_MAX_SPEED") {
            let level: i8 = level
                .parse()
                .map_err(|_| anyhow!("PTZ_MAX_SPEED must be a small integer"))?;
            self.set_max_speed_level(level);
        }
        Ok(())
    }

    /// Keep the mapping and the kit encoding on the same level range.
    pub fn set_max_speed_level(&mut self, level: i8) {
        self.control.mapping.max_speed_level = level;
        self.control.scale.max_level = level;
    }

    pub fn validate(&self) -> Result<()> {
        let conf = self.detector.confidence;
        if !(0.0..=1.0).contains(&conf) {
            return Err(anyhow!("confidence must be within 0..=1, got {}", conf));
        }
        let m = &self.control.mapping;
        if !(0.0..1.0).contains(&m.dead_zone) {
            return Err(anyhow!("dead_zone must be within 0..1, got {}", m.dead_zone));
        }
        if !(0.0..=m.dead_zone).contains(&m.hysteresis) {
            return Err(anyhow!(
                "hysteresis {} must be within 0..=dead_zone (dead_zone is {}); lower hysteresis or raise dead_zone",
                m.hysteresis,
                m.dead_zone
            ));
        }
        if m.max_speed_level < 1 {
            return Err(anyhow!("max_speed_level must be >= 1"));
        }
        if !(m.zoom_in_below > 0.0 && m.zoom_in_below <= m.zoom_out_above && m.zoom_out_above <= 1.0)
        {
            return Err(anyhow!(
                "zoom thresholds must satisfy 0 < zoom_in_below <= zoom_out_above <= 1"
            ));
        }
        self.control.scale.validate()?;
        if self.serial.baud_rate == 0 {
            return Err(anyhow!("baud rate must be greater than zero"));
        }
        if self.run_loop.max_consecutive_frame_failures == 0 {
            return Err(anyhow!("max_consecutive_frame_failures must be >= 1"));
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return Err(anyhow!("model input size must be non-zero"));
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::from_file(TrackerConfigFile::default())
    }
}

fn read_config_file(path: &Path) -> Result<TrackerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
