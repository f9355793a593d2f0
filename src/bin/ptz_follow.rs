//! ptz_follow - keep a person centred with a PTZ camera rig.
//!
//! Reads frames from a capture device, file or synthetic scene, detects
//! people, and sends pan/tilt/zoom corrections to the controller kit until
//! interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ptz_follow::{
    focus_sweep, BackendKind, CameraKit, CommandLink, Detector, FocusSweep, LightMode,
    RecordingLink, SelectionPolicy, SerialLink, TrackerConfig, TrackingController, TrackingLoop,
    VideoSource,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "ptz_follow",
    about = "Follow a person with a serial-controlled PTZ camera"
)]
struct Args {
    /// Serial port of the controller kit
    #[arg(long, value_name = "PATH")]
    serial: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Video source: /dev/videoN, a local file, or stub://<scene>
    #[arg(long, value_name = "SOURCE")]
    video: Option<String>,

    /// ONNX model for the tract backend
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Minimum detection confidence
    #[arg(long)]
    conf: Option<f32>,

    /// Detector backend
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Which detection to follow when several people are visible
    #[arg(long, value_enum)]
    selection: Option<SelectionPolicy>,

    /// Lighting profile applied before tracking [default: day]
    #[arg(long, value_enum)]
    mode: Option<LightMode>,

    /// Run a focus sweep before tracking
    #[arg(long)]
    autofocus: bool,

    /// Log kit commands instead of opening the serial port
    #[arg(long, env = "PTZ_DRY_RUN")]
    dry_run: bool,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    frames: Option<u64>,

    /// UI mode for stderr progress
    #[arg(long, value_enum, default_value_t = ui::UiMode::Auto)]
    ui: ui::UiMode,
}

impl Args {
    fn apply(&self, cfg: &mut TrackerConfig) {
        if let Some(serial) = &self.serial {
            cfg.serial.port = serial.clone();
        }
        if let Some(baud) = self.baud {
            cfg.serial.baud_rate = baud;
        }
        if let Some(video) = &self.video {
            cfg.video.source = video.clone();
        }
        if let Some(model) = &self.model {
            cfg.detector.model_path = model.clone();
        }
        if let Some(conf) = self.conf {
            cfg.detector.confidence = conf;
        }
        if let Some(backend) = self.backend {
            cfg.detector.backend = backend;
        }
        if let Some(selection) = self.selection {
            cfg.control.selection = selection;
        }
        if let Some(mode) = self.mode {
            cfg.control.mode = mode;
        }
        if self.frames.is_some() {
            cfg.run_loop.max_frames = self.frames;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::new(args.ui, std::io::stderr().is_terminal());

    let mut cfg = TrackerConfig::load()?;
    args.apply(&mut cfg);
    cfg.validate()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        })
        .context("error setting Ctrl-C handler")?;
    }

    let source = {
        let stage = ui.stage("Open video source");
        let mut source = VideoSource::new(cfg.video.clone())?;
        source.connect()?;
        stage.done();
        source
    };

    let detector = {
        let stage = ui.stage("Load detector");
        let detector = Detector::from_settings(&cfg.detector)?;
        stage.done();
        detector
    };

    if args.dry_run {
        log::info!("dry run: kit commands are logged, not sent");
        follow(&ui, &cfg, &args, RecordingLink::echoing(), source, detector, &shutdown)
    } else {
        let link = {
            let stage = ui.stage("Open serial port");
            let link = SerialLink::open(cfg.serial.clone())?;
            stage.done();
            link
        };
        follow(&ui, &cfg, &args, link, source, detector, &shutdown)
    }
}

fn follow<L: CommandLink>(
    ui: &ui::Ui,
    cfg: &TrackerConfig,
    args: &Args,
    link: L,
    mut source: VideoSource,
    detector: Detector,
    shutdown: &AtomicBool,
) -> Result<()> {
    let mut kit = CameraKit::new(link, cfg.control.scale);
    {
        let stage = ui.stage("Wake camera kit");
        let version = kit.wake_up()?;
        if !version.is_empty() {
            log::info!("kit firmware: {}", version);
        }
        kit.set_mode(cfg.control.mode)?;
        stage.done();
    }

    if args.autofocus {
        let stage = ui.stage("Focus sweep");
        let result = focus_sweep(&mut kit, &mut source, &FocusSweep::default())?;
        log::info!(
            "focus parked at {} after {} frames",
            result.position,
            result.frames_scored
        );
        stage.done();
    }

    let controller = TrackingController::new(cfg.control.mapping)
        .with_min_interval(cfg.control.min_command_interval);
    let mut tracker = TrackingLoop::new(
        source,
        detector,
        controller,
        kit,
        cfg.control.selection,
        cfg.run_loop.clone(),
    );
    let summary = tracker.run(shutdown)?;
    println!(
        "ptz_follow: {} frames, {} with a target, {} commands sent, {} write failures",
        summary.frames, summary.frames_with_target, summary.commands_sent, summary.write_failures
    );
    Ok(())
}
