use anyhow::{anyhow, Result};

use super::CommandLink;

/// In-memory link. Never touches hardware.
///
/// The default link records every line so tests can inspect them and use
/// `fail_next` to simulate write errors. The echoing link behind
/// `ptz_follow --dry-run` only logs lines, so an unattended run keeps no
/// history.
#[derive(Debug, Default)]
pub struct RecordingLink {
    lines: Vec<String>,
    failures_pending: usize,
    echo: bool,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log each line at info level as it is "sent", without keeping it.
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    /// Make the next `count` sends fail.
    pub fn fail_next(&mut self, count: usize) {
        self.failures_pending = count;
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn take_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

impl CommandLink for RecordingLink {
    fn describe(&self) -> String {
        "dry-run".to_string()
    }

    fn send_line(&mut self, line: &str) -> Result<String> {
        if self.failures_pending > 0 {
            self.failures_pending -= 1;
            return Err(anyhow!("simulated write failure for '{}'", line.trim()));
        }
        if self.echo {
            log::info!(">>> {}", line.trim());
        } else {
            self.lines.push(line.trim().to_string());
        }
        Ok(String::new())
    }
}
