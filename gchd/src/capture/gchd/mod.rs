//! Elgato Game Capture HD.

pub mod script;
pub mod stream;

use std::time::Duration;

use log::{debug, info, warn};

use super::{CaptureDevice, UsbStack};
use crate::error::{AcquisitionError, DiscoveryError};

pub const ELGATO_VENDOR: u16 = 0x0fd9;

pub const INTERFACE_NUM: u8 = 0x00;
pub const CONFIGURATION: u8 = 0x01;

pub const EP_OUT: u8 = 0x02;
pub const EP_IN: u8 = 0x81;

pub(crate) const TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub supported: bool,
}

impl DeviceIdentity {
    const fn new(product_id: u16, supported: bool) -> Self {
        Self {
            vendor_id: ELGATO_VENDOR,
            product_id,
            supported,
        }
    }
}

/// Known hardware revisions, tried in this order.
pub const IDENTITIES: [DeviceIdentity; 4] = [
    DeviceIdentity::new(0x0044, true),
    DeviceIdentity::new(0x004e, true),
    DeviceIdentity::new(0x0051, true),
    DeviceIdentity::new(0x005d, false),
];

/// Open the first identity present on the bus. A match on an unsupported
/// revision is reported as such and its handle is closed right away.
pub fn locate<S: UsbStack>(
    stack: &mut S,
    identities: &[DeviceIdentity],
) -> Result<S::Device, DiscoveryError> {
    for identity in identities {
        let opened = stack
            .open_device(identity.vendor_id, identity.product_id)
            .map_err(|source| DiscoveryError::Open {
                vendor_id: identity.vendor_id,
                product_id: identity.product_id,
                source,
            })?;

        let Some(handle) = opened else {
            debug!(
                "no device at {:04x}:{:04x}",
                identity.vendor_id, identity.product_id
            );
            continue;
        };

        if !identity.supported {
            drop(handle);
            return Err(DiscoveryError::UnsupportedRevision {
                vendor_id: identity.vendor_id,
                product_id: identity.product_id,
            });
        }

        info!(
            "Opened {:04x}:{:04x}",
            identity.vendor_id, identity.product_id
        );
        return Ok(handle);
    }

    Err(DiscoveryError::NotFound)
}

/// Detach any kernel driver, select the configuration and claim the
/// interface.
pub fn acquire<D: CaptureDevice + ?Sized>(handle: &mut D) -> Result<(), AcquisitionError> {
    match handle.kernel_driver_active(INTERFACE_NUM) {
        Ok(true) => {
            if let Err(err) = handle.detach_kernel_driver(INTERFACE_NUM) {
                warn!("could not detach kernel driver: {}", err);
            }
        }
        Ok(false) | Err(rusb::Error::NotSupported) => {}
        Err(err) => debug!("kernel driver query failed: {}", err),
    }

    handle
        .set_active_configuration(CONFIGURATION)
        .map_err(AcquisitionError::ConfigurationFailed)?;

    handle
        .claim_interface(INTERFACE_NUM)
        .map_err(AcquisitionError::ClaimFailed)
}
