use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use bytes::BytesMut;
use log::{info, warn};

use super::{EP_IN, TIMEOUT};
use crate::capture::CaptureDevice;
use crate::error::StreamingError;
use crate::RunFlag;

pub const TRANSFER_SIZE: usize = 0x4000;

const SINK_RETRY: Duration = Duration::from_millis(10);
const ERROR_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ERROR_BACKOFF_MAX: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub transfers: u64,
    pub bytes_forwarded: u64,
    pub transfer_errors: u64,
    pub sink_errors: u64,
}

/// Relay payload from the bulk IN endpoint to `sink` until `run_flag` stops.
///
/// Reads time out after a second so the flag is re-checked even when the
/// device is idle. Failed transfers are retried with a growing delay, and a
/// stalled endpoint is cleared first; only a disconnected device ends the
/// loop. Failed writes to the sink are logged once per outage and the data
/// is dropped until the sink accepts writes again.
pub fn run<D, W>(
    handle: &mut D,
    sink: &mut W,
    run_flag: &RunFlag,
) -> Result<StreamStats, StreamingError>
where
    D: CaptureDevice + ?Sized,
    W: Write + ?Sized,
{
    let mut stats = StreamStats::default();
    let mut buf = BytesMut::zeroed(TRANSFER_SIZE);
    let mut sink_broken = false;
    let mut backoff: Option<Duration> = None;

    while run_flag.is_running() {
        let len = match handle.read_bulk(EP_IN, &mut buf, TIMEOUT) {
            Ok(len) => len,
            Err(rusb::Error::Timeout) | Err(rusb::Error::Interrupted) => continue,
            Err(rusb::Error::NoDevice) => return Err(StreamingError::DeviceLost),
            Err(err) => {
                stats.transfer_errors += 1;
                let delay = match backoff {
                    None => {
                        warn!("could not read from endpoint: {}", err);
                        ERROR_BACKOFF_MIN
                    }
                    Some(delay) => (delay * 2).min(ERROR_BACKOFF_MAX),
                };
                backoff = Some(delay);

                if err == rusb::Error::Pipe {
                    if let Err(err) = handle.clear_halt(EP_IN) {
                        warn!("could not clear endpoint halt: {}", err);
                    }
                }
                thread::sleep(delay);
                continue;
            }
        };

        if backoff.take().is_some() {
            info!(
                "Endpoint recovered after {} failed transfers",
                stats.transfer_errors
            );
        }

        stats.transfers += 1;
        if len == 0 {
            continue;
        }

        match forward(sink, &buf[..len], run_flag) {
            Ok(true) => {
                stats.bytes_forwarded += len as u64;
                if sink_broken {
                    info!("Reader attached again, resuming output.");
                    sink_broken = false;
                }
            }
            Ok(false) => break,
            Err(err) => {
                stats.sink_errors += 1;
                if !sink_broken {
                    warn!("could not write to sink: {}", err);
                    sink_broken = true;
                }
            }
        }
    }

    info!(
        "Capture stopped after {} transfers ({} bytes)",
        stats.transfers, stats.bytes_forwarded
    );
    Ok(stats)
}

/// Write all of `data`, waiting while a slow reader drains the sink.
/// Returns `Ok(false)` and drops the rest if `run_flag` stops meanwhile.
fn forward<W: Write + ?Sized>(
    sink: &mut W,
    mut data: &[u8],
    run_flag: &RunFlag,
) -> io::Result<bool> {
    while !data.is_empty() {
        match sink.write(data) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(written) => data = &data[written..],
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                if !run_flag.is_running() {
                    return Ok(false);
                }
                thread::sleep(SINK_RETRY);
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                if !run_flag.is_running() {
                    return Ok(false);
                }
            }
            Err(err) => return Err(err),
        }
    }

    Ok(true)
}
