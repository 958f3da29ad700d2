//! Termination handling.
//!
//! SIGINT and SIGTERM only flip the run flag and print one line; the
//! device is reset later, on the main path, once the capture loop has
//! noticed. SIGPIPE is ignored so a reader going away surfaces as a
//! failed write instead of killing the process.

use std::sync::OnceLock;

use thiserror::Error;

use crate::RunFlag;

static SHUTDOWN_FLAG: OnceLock<RunFlag> = OnceLock::new();

const STOP_MESSAGE: &str = "\nStop signal received.\nYour device is going to be reset. Please wait and do not interrupt or unplug your device.";

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("shutdown handler already installed")]
    AlreadyInstalled,
    #[error(transparent)]
    Handler(#[from] ctrlc::Error),
}

/// Stop the flag registered with [`install`], if any.
pub fn request_shutdown() {
    if let Some(flag) = SHUTDOWN_FLAG.get() {
        flag.stop();
    }
}

/// Route SIGINT/SIGTERM to `flag` and ignore SIGPIPE. Only one flag can be
/// registered per process.
///
/// The handler runs on a dedicated thread, so the flag drops shortly after
/// the signal arrives rather than inside it.
pub fn install(flag: &RunFlag) -> Result<(), InstallError> {
    SHUTDOWN_FLAG
        .set(flag.clone())
        .map_err(|_| InstallError::AlreadyInstalled)?;

    ctrlc::set_handler(|| {
        request_shutdown();
        eprintln!("{}", STOP_MESSAGE);
    })?;

    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
    Ok(())
}
