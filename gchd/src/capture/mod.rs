pub mod gchd;

use std::time::Duration;

use rusb::{Context, DeviceHandle, UsbContext};

/// Device operations needed to drive a capture card.
pub trait CaptureDevice {
    fn kernel_driver_active(&mut self, iface: u8) -> rusb::Result<bool>;

    fn detach_kernel_driver(&mut self, iface: u8) -> rusb::Result<()>;

    fn set_active_configuration(&mut self, config: u8) -> rusb::Result<()>;

    fn claim_interface(&mut self, iface: u8) -> rusb::Result<()>;

    fn release_interface(&mut self, iface: u8) -> rusb::Result<()>;

    fn clear_halt(&mut self, endpoint: u8) -> rusb::Result<()>;

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;

    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;

    fn write_bulk(&mut self, endpoint: u8, buf: &[u8], timeout: Duration) -> rusb::Result<usize>;

    fn read_bulk(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration)
        -> rusb::Result<usize>;
}

/// An initialized USB access context. Dropping it tears the context down.
pub trait UsbStack {
    type Device: CaptureDevice;

    fn open_device(&mut self, vid: u16, pid: u16) -> rusb::Result<Option<Self::Device>>;
}

impl UsbStack for Context {
    type Device = DeviceHandle<Context>;

    fn open_device(&mut self, vid: u16, pid: u16) -> rusb::Result<Option<DeviceHandle<Context>>> {
        let devices = self.devices()?;

        for device in devices.iter() {
            let device_desc = match device.device_descriptor() {
                Ok(d) => d,
                Err(_) => continue,
            };

            if device_desc.vendor_id() == vid && device_desc.product_id() == pid {
                return device.open().map(Some);
            }
        }

        Ok(None)
    }
}

impl<T: UsbContext> CaptureDevice for DeviceHandle<T> {
    fn kernel_driver_active(&mut self, iface: u8) -> rusb::Result<bool> {
        DeviceHandle::kernel_driver_active(self, iface)
    }

    fn detach_kernel_driver(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::detach_kernel_driver(self, iface)
    }

    fn set_active_configuration(&mut self, config: u8) -> rusb::Result<()> {
        DeviceHandle::set_active_configuration(self, config)
    }

    fn claim_interface(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::claim_interface(self, iface)
    }

    fn release_interface(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::release_interface(self, iface)
    }

    fn clear_halt(&mut self, endpoint: u8) -> rusb::Result<()> {
        DeviceHandle::clear_halt(self, endpoint)
    }

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        DeviceHandle::write_control(self, request_type, request, value, index, buf, timeout)
    }

    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        DeviceHandle::read_control(self, request_type, request, value, index, buf, timeout)
    }

    fn write_bulk(&mut self, endpoint: u8, buf: &[u8], timeout: Duration) -> rusb::Result<usize> {
        DeviceHandle::write_bulk(self, endpoint, buf, timeout)
    }

    fn read_bulk(
        &mut self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        DeviceHandle::read_bulk(self, endpoint, buf, timeout)
    }
}
