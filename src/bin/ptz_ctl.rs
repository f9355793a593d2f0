//! ptz_ctl - one-shot commands for the camera controller kit.
//!
//! Handy for checking wiring and calibrating before running the follower:
//! wake the camera, switch lighting profiles, move single axes, or run a
//! focus sweep against a live video source.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::time::Duration;

use ptz_follow::{
    focus_sweep, CameraKit, CommandLink, FocusSweep, KitCommand, LightMode, SerialLink,
    TrackerConfig, VideoConfig, VideoSource,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(name = "ptz_ctl", about = "Send commands to the PTZ camera controller kit")]
struct Args {
    /// Serial port of the controller kit
    #[arg(long, value_name = "PATH")]
    serial: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// UI mode for stderr progress
    #[arg(long, value_enum, default_value_t = ui::UiMode::Auto)]
    ui: ui::UiMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Power up the camera module
    Wake,
    /// Apply a lighting profile
    Mode {
        #[arg(value_enum)]
        mode: LightMode,
    },
    /// Switch the IR cut filter
    Ir {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Move pan to an absolute position
    Pan {
        #[arg(allow_negative_numbers = true)]
        position: i32,
    },
    /// Move tilt to an absolute position
    Tilt {
        #[arg(allow_negative_numbers = true)]
        position: i32,
    },
    /// Move zoom to an absolute position
    Zoom { position: i32 },
    /// Move focus to an absolute position
    Focus { position: i32 },
    /// Run the kit's built-in autofocus routine
    Autofocus,
    /// Step focus through a range and park at the sharpest position
    FocusSweep {
        /// Video source to score frames from
        #[arg(long, default_value = "/dev/video0")]
        video: String,
        #[arg(long, default_value_t = 0)]
        min: i32,
        #[arg(long, default_value_t = 60_000)]
        max: i32,
        #[arg(long, default_value_t = 2_000)]
        step: i32,
        /// Settle time after each move, in milliseconds
        #[arg(long, default_value_t = 150)]
        settle_ms: u64,
    },
    /// Send one raw command line
    Raw { line: String },
    /// Print the kit firmware version
    Version,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::new(args.ui, std::io::stderr().is_terminal());

    let mut cfg = TrackerConfig::load()?;
    if let Some(serial) = &args.serial {
        cfg.serial.port = serial.clone();
    }
    if let Some(baud) = args.baud {
        cfg.serial.baud_rate = baud;
    }
    cfg.validate()?;

    let link = {
        let stage = ui.stage("Open serial port");
        let link = SerialLink::open(cfg.serial.clone())?;
        stage.done();
        link
    };
    let mut kit = CameraKit::new(link, cfg.control.scale);

    match args.command {
        Command::Wake => {
            let version = kit.wake_up()?;
            println!("ptz_ctl: camera awake ({})", display_reply(&version));
        }
        Command::Mode { mode } => {
            kit.set_mode(mode)?;
            println!("ptz_ctl: {:?} mode applied", mode);
        }
        Command::Ir { state } => kit.set_ir(matches!(state, Switch::On))?,
        Command::Pan { position } => kit.pan_to(position)?,
        Command::Tilt { position } => kit.tilt_to(position)?,
        Command::Zoom { position } => kit.zoom_to(position)?,
        Command::Focus { position } => kit.focus_to(position)?,
        Command::Autofocus => kit.autofocus()?,
        Command::FocusSweep {
            video,
            min,
            max,
            step,
            settle_ms,
        } => {
            let mut source = {
                let stage = ui.stage("Open video source");
                let mut source = VideoSource::new(VideoConfig {
                    source: video,
                    ..cfg.video.clone()
                })?;
                source.connect()?;
                stage.done();
                source
            };
            let sweep = FocusSweep {
                min,
                max,
                step,
                settle: Duration::from_millis(settle_ms),
            };
            let stage = ui.stage("Focus sweep");
            let result = focus_sweep(&mut kit, &mut source, &sweep)?;
            stage.done();
            println!(
                "ptz_ctl: best focus {} (variance {:.2}, {} frames)",
                result.position, result.sharpness, result.frames_scored
            );
        }
        Command::Raw { line } => {
            if let Err(err) = line.parse::<KitCommand>() {
                log::warn!("sending unrecognised line as-is: {}", err);
            }
            let reply = kit.link_mut().send_line(&line)?;
            println!("{}", display_reply(&reply));
        }
        Command::Version => {
            let reply = kit.send(&KitCommand::Version)?;
            println!("{}", display_reply(&reply));
        }
    }
    Ok(())
}

fn display_reply(reply: &str) -> &str {
    if reply.is_empty() {
        "no reply"
    } else {
        reply
    }
}
