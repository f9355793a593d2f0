//! Command transports to the camera controller kit.
//!
//! The kit speaks a line protocol: one ASCII command per line, terminated by
//! `\r\n`, with an optional free-form reply. `CommandLink` is that single
//! operation. `SerialLink` is the real device; `RecordingLink` keeps the lines
//! in memory for dry runs and tests.

mod recording;
mod serial;

use anyhow::Result;

pub use recording::RecordingLink;
pub use serial::{SerialConfig, SerialLink};

pub trait CommandLink {
    /// Human-readable endpoint, for logs.
    fn describe(&self) -> String;

    /// Send one command line and return whatever the kit answered.
    ///
    /// The line is passed without terminator. An empty string means no reply
    /// arrived before the response window closed.
    fn send_line(&mut self, line: &str) -> Result<String>;
}
