use std::env;
use std::path::PathBuf;

use crate::error::PreconditionError;

pub const FIRMWARE_IDLE: &str = "mb86h57_h58_idle.bin";
pub const FIRMWARE_ENC: &str = "mb86h57_h58_enc_h.bin";

pub const DEFAULT_FIRMWARE_DIR: &str = "/usr/lib/firmware/gchd";
pub const DEFAULT_SCRIPT_DIR: &str = "/usr/share/gchd";
pub const DEFAULT_SINK_PATH: &str = "/tmp/elgato_gchd.ts";
pub const DEFAULT_SINK_MODE: u32 = 0o644;

/// Filesystem locations used by a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub firmware_dir: PathBuf,
    pub script_dir: PathBuf,
    pub sink_path: PathBuf,
    pub sink_mode: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            firmware_dir: PathBuf::from(DEFAULT_FIRMWARE_DIR),
            script_dir: PathBuf::from(DEFAULT_SCRIPT_DIR),
            sink_path: PathBuf::from(DEFAULT_SINK_PATH),
            sink_mode: DEFAULT_SINK_MODE,
        }
    }
}

impl Config {
    /// Defaults, with `GCHD_FIRMWARE_DIR`, `GCHD_SCRIPT_DIR` and
    /// `GCHD_SINK_PATH` taking precedence when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var_os(name).map(PathBuf::from))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<PathBuf>) -> Self {
        let defaults = Self::default();

        Self {
            firmware_dir: lookup("GCHD_FIRMWARE_DIR").unwrap_or(defaults.firmware_dir),
            script_dir: lookup("GCHD_SCRIPT_DIR").unwrap_or(defaults.script_dir),
            sink_path: lookup("GCHD_SINK_PATH").unwrap_or(defaults.sink_path),
            sink_mode: defaults.sink_mode,
        }
    }

    pub fn firmware_paths(&self) -> [PathBuf; 2] {
        [
            self.firmware_dir.join(FIRMWARE_IDLE),
            self.firmware_dir.join(FIRMWARE_ENC),
        ]
    }

    /// Both firmware files must exist before the device is touched.
    pub fn check_firmware(&self) -> Result<(), PreconditionError> {
        match self.firmware_paths().into_iter().find(|path| !path.exists()) {
            Some(missing) => Err(PreconditionError::MissingFirmwareAsset(missing)),
            None => Ok(()),
        }
    }
}
