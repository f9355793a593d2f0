//! The closed tracking loop.
//!
//! Per iteration: capture a frame, run the detector, pick a target, let the
//! controller decide on a command and hand it to the kit. The loop owns the
//! source, the detector and the kit session for its whole lifetime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};

use crate::config::LoopSettings;
use crate::control::{select_target, PtzCommand, SelectionPolicy, TrackingController};
use crate::detect::Detector;
use crate::ingest::FrameSource;
use crate::kit::CameraKit;
use crate::transport::CommandLink;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown flag raised (Ctrl-C).
    Interrupted,
    /// The source has no more frames.
    EndOfStream,
    /// The configured frame budget was used up.
    FrameLimit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
    pub frames_with_target: u64,
    pub commands_sent: u64,
    pub write_failures: u64,
    pub frame_failures: u64,
    pub stop_reason: StopReason,
}

/// Result of one iteration that produced a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameOutcome {
    pub target_found: bool,
    pub command: Option<PtzCommand>,
    /// `false` when the command could not be written to the kit.
    pub delivered: bool,
}

pub struct TrackingLoop<S: FrameSource, L: CommandLink> {
    source: S,
    detector: Detector,
    controller: TrackingController,
    kit: CameraKit<L>,
    selection: SelectionPolicy,
    settings: LoopSettings,
}

impl<S: FrameSource, L: CommandLink> TrackingLoop<S, L> {
    pub fn new(
        source: S,
        detector: Detector,
        controller: TrackingController,
        kit: CameraKit<L>,
        selection: SelectionPolicy,
        settings: LoopSettings,
    ) -> Self {
        Self {
            source,
            detector,
            controller,
            kit,
            selection,
            settings,
        }
    }

    pub fn kit(&self) -> &CameraKit<L> {
        &self.kit
    }

    pub fn kit_mut(&mut self) -> &mut CameraKit<L> {
        &mut self.kit
    }

    /// Run until `shutdown` is raised, the source ends, or the frame limit is
    /// reached.
    ///
    /// Read failures are retried on the next iteration; after
    /// `max_consecutive_frame_failures` in a row the loop gives up with an
    /// error. Detector errors end the loop. Write failures are logged and the
    /// stale command is dropped.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<LoopSummary> {
        let mut summary = LoopSummary {
            frames: 0,
            frames_with_target: 0,
            commands_sent: 0,
            write_failures: 0,
            frame_failures: 0,
            stop_reason: StopReason::Interrupted,
        };
        let mut consecutive_failures = 0u32;
        let mut last_health_log = Instant::now();

        log::info!(
            "tracking with {} detector (conf >= {:.2}), selection {:?}, via {}",
            self.detector.backend_name(),
            self.detector.min_confidence(),
            self.selection,
            self.kit.link().describe()
        );

        loop {
            if shutdown.load(Ordering::SeqCst) {
                summary.stop_reason = StopReason::Interrupted;
                break;
            }
            if let Some(limit) = self.settings.max_frames {
                if summary.frames >= limit {
                    summary.stop_reason = StopReason::FrameLimit;
                    break;
                }
            }
            let started = Instant::now();

            match self.process_frame(started) {
                Ok(Some(outcome)) => {
                    consecutive_failures = 0;
                    summary.frames += 1;
                    if outcome.target_found {
                        summary.frames_with_target += 1;
                    }
                    if outcome.command.is_some() {
                        if outcome.delivered {
                            summary.commands_sent += 1;
                        } else {
                            summary.write_failures += 1;
                        }
                    }
                }
                Ok(None) => {
                    log::info!("video source ended");
                    summary.stop_reason = StopReason::EndOfStream;
                    break;
                }
                Err(err) if is_frame_read_failure(&err) => {
                    consecutive_failures += 1;
                    summary.frame_failures += 1;
                    log::warn!(
                        "frame read failed ({}/{}): {:#}",
                        consecutive_failures,
                        self.settings.max_consecutive_frame_failures,
                        err
                    );
                    if consecutive_failures >= self.settings.max_consecutive_frame_failures {
                        bail!(
                            "giving up after {} consecutive frame read failures",
                            consecutive_failures
                        );
                    }
                }
                Err(err) => return Err(err),
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                log::info!(
                    "source health={} frames={} targets={} commands={} write_failures={}",
                    self.source.is_healthy(),
                    summary.frames,
                    summary.frames_with_target,
                    summary.commands_sent,
                    summary.write_failures
                );
                last_health_log = Instant::now();
            }

            let elapsed = started.elapsed();
            if elapsed < self.settings.frame_interval {
                thread::sleep(self.settings.frame_interval - elapsed);
            }
        }

        log::info!(
            "tracking stopped ({:?}): frames={} commands={} write_failures={} frame_failures={}",
            summary.stop_reason,
            summary.frames,
            summary.commands_sent,
            summary.write_failures,
            summary.frame_failures
        );
        Ok(summary)
    }

    /// One iteration. `Ok(None)` when the source is exhausted.
    ///
    /// Frame read errors come back wrapped in `FrameReadError`; everything
    /// else is a detector failure.
    pub fn process_frame(&mut self, now: Instant) -> Result<Option<FrameOutcome>> {
        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(None),
            Err(err) => return Err(err.context(FrameReadError)),
        };
        let geometry = frame.geometry();

        let detections = self.detector.detect(&frame)?;
        let target = select_target(detections, self.selection, geometry);
        if let Some(t) = &target {
            log::debug!(
                "target {} conf={:.2} box=({:.0},{:.0})-({:.0},{:.0})",
                t.class.label(),
                t.confidence,
                t.bbox.x_min,
                t.bbox.y_min,
                t.bbox.x_max,
                t.bbox.y_max
            );
        }

        let command = self.controller.update(geometry, target.as_ref(), now);
        let mut delivered = true;
        if let Some(cmd) = &command {
            log::debug!("command {}", cmd);
            if let Err(err) = self.kit.apply(cmd) {
                log::error!("failed to send {}: {:#}", cmd, err);
                delivered = false;
            }
        }

        Ok(Some(FrameOutcome {
            target_found: target.is_some(),
            command,
            delivered,
        }))
    }
}

/// Context marker for errors that came from the frame source.
#[derive(Debug)]
pub struct FrameReadError;

impl std::fmt::Display for FrameReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("frame read failed")
    }
}

fn is_frame_read_failure(err: &anyhow::Error) -> bool {
    err.downcast_ref::<FrameReadError>().is_some()
}
