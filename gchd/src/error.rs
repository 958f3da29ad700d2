use std::io;
use std::path::PathBuf;

use simple_error::SimpleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("firmware file missing: {}", .0.display())]
    MissingFirmwareAsset(PathBuf),
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("error initializing libusb: {0}")]
    UsbInit(#[source] rusb::Error),

    #[error("unable to find device")]
    NotFound,

    #[error("this revision of the Elgato Game Capture HD ({vendor_id:04x}:{product_id:04x}) is currently not supported")]
    UnsupportedRevision { vendor_id: u16, product_id: u16 },

    #[error("device {vendor_id:04x}:{product_id:04x} found but failed to open: {source}")]
    Open {
        vendor_id: u16,
        product_id: u16,
        source: rusb::Error,
    },
}

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("could not activate configuration: {0}")]
    ConfigurationFailed(#[source] rusb::Error),

    #[error("failed to claim interface: {0}")]
    ClaimFailed(#[source] rusb::Error),
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("device command failed: {0}")]
    DeviceCommandFailed(#[source] rusb::Error),

    #[error("could not read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("bad script `{name}`: {source}")]
    Script { name: String, source: SimpleError },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("could not create {}: {source}", path.display())]
    Create { path: PathBuf, source: io::Error },

    #[error("could not open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
}

#[derive(Debug, Error)]
pub enum StreamingError {
    #[error("device disconnected while streaming")]
    DeviceLost,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Streaming(#[from] StreamingError),
}

impl Error {
    /// Process exit status for this failure. Usage errors (2) belong to the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Precondition(_) => 3,
            Error::Discovery(_) => 4,
            Error::Acquisition(_) => 5,
            Error::Configuration(_) => 6,
            Error::Sink(_) => 7,
            Error::Streaming(_) => 8,
        }
    }
}
