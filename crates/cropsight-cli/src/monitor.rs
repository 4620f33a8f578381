//! Plant height sensor monitor.
//!
//! The sensor prints one `Height: <value>cm` line per reading over a serial
//! link and resets its servos when it receives `RESET\n`. The monitor keeps a
//! bounded window of recent readings and logs running statistics.

use crate::config::MonitorConfig;
use serde::Serialize;
use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

pub const RESET_COMMAND: &[u8] = b"RESET\n";

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Failed to open sensor device {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unrecognised sensor line: {0:?}")]
    Malformed(String),

    #[error("Sensor read failed {attempts} times in a row: {source}")]
    ReadFailed {
        attempts: u32,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write to sensor: {0}")]
    Write(#[source] io::Error),
}

/// Parse `Height: 12.5cm` into centimetres. Surrounding whitespace is allowed.
pub fn parse_height_line(line: &str) -> Result<f64, MonitorError> {
    let malformed = || MonitorError::Malformed(line.to_string());
    let value = line
        .trim()
        .strip_prefix("Height:")
        .and_then(|rest| rest.strip_suffix("cm"))
        .ok_or_else(malformed)?;
    let height: f64 = value.trim().parse().map_err(|_| malformed())?;
    if height.is_finite() {
        Ok(height)
    } else {
        Err(malformed())
    }
}

/// Summary of the readings currently held.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeightStats {
    pub current: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// The latest `capacity` readings, oldest first.
#[derive(Debug, Clone)]
pub struct HeightHistory {
    capacity: usize,
    readings: VecDeque<f64>,
}

impl HeightHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            readings: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, height: f64) {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(height);
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn readings(&self) -> impl Iterator<Item = f64> + '_ {
        self.readings.iter().copied()
    }

    pub fn stats(&self) -> Option<HeightStats> {
        let current = *self.readings.back()?;
        let (min, max, sum) = self.readings.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &h| (min.min(h), max.max(h), sum + h),
        );
        Some(HeightStats {
            current,
            average: sum / self.readings.len() as f64,
            min,
            max,
            count: self.readings.len(),
        })
    }
}

pub struct HeightMonitor {
    history: HeightHistory,
    max_read_failures: u32,
    retry_delay: Duration,
}

impl HeightMonitor {
    pub fn new(history: usize, max_read_failures: u32, retry_delay: Duration) -> Self {
        Self {
            history: HeightHistory::new(history),
            max_read_failures,
            retry_delay,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            config.history,
            config.max_read_failures,
            Duration::from_millis(config.retry_delay_ms),
        )
    }

    pub fn history(&self) -> &HeightHistory {
        &self.history
    }

    /// Read sensor lines until EOF or until `shutdown` turns true.
    ///
    /// Malformed lines are skipped. A read error is retried after the retry
    /// delay; more than `max_read_failures` in a row ends the run with an error.
    pub async fn run<R>(
        &mut self,
        mut reader: R,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Option<HeightStats>, MonitorError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line = Vec::new();
        let mut failures = 0u32;

        loop {
            let stop = *shutdown.borrow();
            if stop {
                tracing::info!("Monitor shutting down");
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                read = reader.read_until(b'\n', &mut line) => match read {
                    Ok(0) => {
                        tracing::info!("Sensor stream closed");
                        break;
                    }
                    Ok(_) => {
                        failures = 0;
                        self.record(&String::from_utf8_lossy(&line));
                        line.clear();
                    }
                    Err(e) => {
                        // Drop any partial line read before the failure.
                        line.clear();
                        failures += 1;
                        if failures > self.max_read_failures {
                            return Err(MonitorError::ReadFailed { attempts: failures, source: e });
                        }
                        tracing::warn!(error = %e, attempt = failures, "Sensor read failed, retrying");
                        tokio::select! {
                            _ = tokio::time::sleep(self.retry_delay) => {}
                            _ = shutdown.changed() => {}
                        }
                    }
                },
            }
        }

        Ok(self.history.stats())
    }

    fn record(&mut self, line: &str) {
        match parse_height_line(line) {
            Ok(height) => {
                self.history.push(height);
                if let Some(stats) = self.history.stats() {
                    tracing::info!(
                        height,
                        average = stats.average,
                        min = stats.min,
                        max = stats.max,
                        count = stats.count,
                        "Height reading"
                    );
                }
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }
}

/// Open a serial device or FIFO for reading and writing.
///
/// Both halves are registered with the reactor rather than the blocking pool,
/// so a pending read never holds up runtime shutdown. The read half is opened
/// read-write so a FIFO without a writer does not report EOF.
#[cfg(target_os = "linux")]
pub fn open_sensor(
    path: &std::path::Path,
) -> Result<(tokio::net::unix::pipe::Receiver, tokio::net::unix::pipe::Sender), MonitorError> {
    use tokio::net::unix::pipe;

    let open_err = |source| MonitorError::Open {
        path: path.to_path_buf(),
        source,
    };
    let reader = pipe::OpenOptions::new()
        .read_write(true)
        .unchecked(true)
        .open_receiver(path)
        .map_err(open_err)?;
    let writer = pipe::OpenOptions::new()
        .unchecked(true)
        .open_sender(path)
        .map_err(open_err)?;
    Ok((reader, writer))
}

/// Ask the sensor to reset its servos.
pub async fn send_reset<W: AsyncWrite + Unpin>(writer: &mut W) -> Result<(), MonitorError> {
    writer
        .write_all(RESET_COMMAND)
        .await
        .map_err(MonitorError::Write)?;
    writer.flush().await.map_err(MonitorError::Write)?;
    tracing::info!("Reset command sent");
    Ok(())
}
