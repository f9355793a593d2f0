use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use super::CommandLink;

/// Line terminator expected by the controller kit.
const LINE_END: &str = "\r\n";

/// Serial port settings for the controller kit.
#[derive(Clone, Debug)]
pub struct SerialConfig {
    /// Device path (e.g., "/dev/ttyACM0").
    pub port: String,
    pub baud_rate: u32,
    /// Read/write timeout applied by the serial driver.
    pub timeout: Duration,
    /// Time the kit needs after the port opens before it accepts commands.
    pub ready_delay: Duration,
    /// Wait after each write before collecting the reply.
    pub response_delay: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 115_200,
            timeout: Duration::from_secs(1),
            ready_delay: Duration::from_secs(2),
            response_delay: Duration::from_millis(50),
        }
    }
}

/// Serial connection to the controller kit.
///
/// The port is held for the lifetime of the link and closed when it drops.
pub struct SerialLink {
    config: SerialConfig,
    port: Box<dyn serialport::SerialPort>,
    lines_sent: u64,
}

impl SerialLink {
    /// Open the port and wait for the kit to come up.
    pub fn open(config: SerialConfig) -> Result<Self> {
        let port = serialport::new(config.port.as_str(), config.baud_rate)
            .timeout(config.timeout)
            .open()
            .with_context(|| {
                format!(
                    "failed to open serial port {} at {} baud",
                    config.port, config.baud_rate
                )
            })?;

        if !config.ready_delay.is_zero() {
            thread::sleep(config.ready_delay);
        }
        log::info!(
            "SerialLink: connected to {} ({} baud)",
            config.port,
            config.baud_rate
        );

        Ok(Self {
            config,
            port,
            lines_sent: 0,
        })
    }

    /// Drain whatever the kit has sent back. Read failures only cost the reply.
    fn read_available(&mut self) -> String {
        let pending = match self.port.bytes_to_read() {
            Ok(n) => n as usize,
            Err(err) => {
                log::warn!("SerialLink: cannot poll {}: {}", self.config.port, err);
                return String::new();
            }
        };
        if pending == 0 {
            return String::new();
        }

        let mut buf = vec![0u8; pending];
        match self.port.read(&mut buf) {
            Ok(n) => String::from_utf8_lossy(&buf[..n]).trim().to_string(),
            Err(err) => {
                log::warn!("SerialLink: read from {} failed: {}", self.config.port, err);
                String::new()
            }
        }
    }
}

impl CommandLink for SerialLink {
    fn describe(&self) -> String {
        format!("serial:{}@{}", self.config.port, self.config.baud_rate)
    }

    fn send_line(&mut self, line: &str) -> Result<String> {
        let framed = format!("{}{}", line.trim(), LINE_END);
        self.port
            .write_all(framed.as_bytes())
            .with_context(|| format!("write '{}' to {}", line.trim(), self.config.port))?;
        self.port
            .flush()
            .with_context(|| format!("flush {}", self.config.port))?;
        self.lines_sent += 1;
        log::debug!(">>> {}", line.trim());

        if !self.config.response_delay.is_zero() {
            thread::sleep(self.config.response_delay);
        }
        let reply = self.read_available();
        if !reply.is_empty() {
            log::debug!("<<< {}", reply);
        }
        Ok(reply)
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        log::info!(
            "SerialLink: closing {} after {} lines",
            self.config.port,
            self.lines_sent
        );
    }
}
