//! # Radio Module
//!
//! Application-layer transport for telemetry frames.
//!
//! This module handles:
//! - The [`RadioTransport`] collaborator interface (send / receive)
//! - A serial-attached radio modem carrying one frame per line
//! - An in-memory loopback link for simulation and tests
//!
//! Bus sharing with other SPI devices and the radio PHY/MAC are owned by the
//! modem firmware, not by this crate.

pub mod port;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{PayloadError, Result};
use port::{SerialPortIO, TokioSerialPort};

/// Default UART baud rate of the radio modem
pub const RADIO_BAUD_RATE: u32 = 115_200;

/// Longest line accepted from the modem before it is discarded as garbage
///
/// A full frame carries `DETECTOR_CAPACITY` hot-spot pairs. At up to 20
/// bytes per pair (`-122.4194,-122.4194,`) plus the fixed fields and a Unix
/// timestamp that stays under 800 bytes.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Frame terminator on the serial link
const LINE_TERMINATOR: u8 = b'\n';

/// Default radio device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters (most common for modem boards)
    "/dev/ttyACM0", // USB CDC devices
];

/// One received message and its signal strength
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioPacket {
    /// Message text with line terminators removed
    pub message: String,

    /// Received signal strength in dBm, when the link reports it
    pub rssi: Option<i32>,
}

/// Radio link carrying telemetry text frames
#[async_trait]
pub trait RadioTransport: Send {
    /// Transmit one message
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the message could not be handed to the link.
    async fn send(&mut self, message: &str) -> Result<()>;

    /// Receive one message, or `None` if nothing arrived
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the link failed.
    async fn receive(&mut self) -> Result<Option<RadioPacket>>;
}

/// In-memory radio link
///
/// Clones share one queue, so a flight-side clone and a ground-side clone
/// talk to each other.
#[derive(Debug, Clone)]
pub struct LoopbackRadio {
    queue: Arc<Mutex<VecDeque<String>>>,
    rssi: i32,
}

impl LoopbackRadio {
    /// Create a link reporting `rssi` dBm for every received message
    pub fn new(rssi: i32) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            rssi,
        }
    }

    /// Number of messages sent but not yet received
    pub fn pending(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    fn with_queue<T>(&self, f: impl FnOnce(&mut VecDeque<String>) -> T) -> Result<T> {
        let mut queue = self
            .queue
            .lock()
            .map_err(|_| PayloadError::Transport("loopback queue poisoned".to_string()))?;
        Ok(f(&mut queue))
    }
}

#[async_trait]
impl RadioTransport for LoopbackRadio {
    async fn send(&mut self, message: &str) -> Result<()> {
        self.with_queue(|q| q.push_back(message.to_string()))?;
        debug!("Loopback sent {} bytes", message.len());
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<RadioPacket>> {
        let rssi = self.rssi;
        let message = self.with_queue(|q| q.pop_front())?;
        Ok(message.map(|message| RadioPacket {
            message,
            rssi: Some(rssi),
        }))
    }
}

/// Radio modem attached over a serial port
///
/// Each frame travels as one `\n`-terminated line. The modem does not report
/// signal strength over this interface.
pub struct SerialRadio<P: SerialPortIO = TokioSerialPort> {
    port: P,
    device_path: String,
    read_timeout: Duration,
    buffer: BytesMut,
}

impl<P: SerialPortIO> std::fmt::Debug for SerialRadio<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialRadio")
            .field("device_path", &self.device_path)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl SerialRadio<TokioSerialPort> {
    /// Open the radio modem on the first default device path that works
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if no device could be opened.
    pub fn open(baud_rate: u32, read_timeout: Duration) -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate, read_timeout)
    }

    /// Open the radio modem trying `paths` in order
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - UART baud rate of the modem
    /// * `read_timeout` - How long `receive` waits for data before giving up
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` listing every path tried.
    pub fn open_with_paths(paths: &[&str], baud_rate: u32, read_timeout: Duration) -> Result<Self> {
        for path in paths {
            debug!("Trying to open radio serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(stream) => {
                    info!("Successfully opened radio modem at {}", path);
                    return Ok(Self::with_port(
                        TokioSerialPort::new(stream),
                        path,
                        read_timeout,
                    ));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(PayloadError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| PayloadError::Transport(format!("Failed to open {}: {}", path, e)))
    }
}

impl<P: SerialPortIO> SerialRadio<P> {
    /// Wrap an already-open port
    pub fn with_port(port: P, device_path: &str, read_timeout: Duration) -> Self {
        Self {
            port,
            device_path: device_path.to_string(),
            read_timeout,
            buffer: BytesMut::with_capacity(MAX_LINE_LENGTH),
        }
    }

    /// Device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Pop the next complete non-empty line from the receive buffer
    fn take_line(&mut self) -> Option<String> {
        while let Some(end) = self.buffer.iter().position(|&b| b == LINE_TERMINATOR) {
            let line = self.buffer.split_to(end + 1);
            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\r', '\n']);
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
        None
    }
}

#[async_trait]
impl<P: SerialPortIO> RadioTransport for SerialRadio<P> {
    async fn send(&mut self, message: &str) -> Result<()> {
        let mut line = Vec::with_capacity(message.len() + 1);
        line.extend_from_slice(message.as_bytes());
        line.push(LINE_TERMINATOR);

        self.port
            .write_all(&line)
            .await
            .map_err(|e| PayloadError::Transport(format!("Failed to write frame: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| PayloadError::Transport(format!("Failed to flush radio port: {}", e)))?;

        debug!("Sent telemetry frame ({} bytes)", line.len());
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<RadioPacket>> {
        let mut chunk = [0u8; 128];

        loop {
            if let Some(message) = self.take_line() {
                debug!("Received telemetry frame ({} bytes)", message.len());
                return Ok(Some(RadioPacket {
                    message,
                    rssi: None,
                }));
            }

            if self.buffer.len() > MAX_LINE_LENGTH {
                warn!(
                    "Discarding {} bytes without line terminator",
                    self.buffer.len()
                );
                self.buffer.clear();
            }

            let read = tokio::time::timeout(self.read_timeout, self.port.read(&mut chunk)).await;
            let n = match read {
                Err(_) => return Ok(None),
                Ok(Err(e)) => {
                    return Err(PayloadError::Transport(format!(
                        "Failed to read radio port: {}",
                        e
                    )))
                }
                Ok(Ok(n)) => n,
            };

            if n == 0 {
                return Ok(None);
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }
}
