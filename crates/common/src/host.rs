//! Host platform seam
//!
//! The device watcher never reaches for a global USB service. It is handed a
//! [`UsbHost`] and talks to the platform only through it, which lets tests
//! substitute [`crate::test_utils::FakeUsbHost`].

use crate::usb_types::UsbDeviceInfo;

/// Outbound calls from the watcher to the host platform
pub trait UsbHost {
    /// List every USB device attached right now
    ///
    /// Must not fail: a host without a usable USB subsystem reports no
    /// devices.
    fn devices(&self) -> Vec<UsbDeviceInfo>;

    /// Ask the host for access to `device`
    ///
    /// Returns immediately. The outcome is delivered later as a
    /// [`crate::HostEvent::PermissionResult`] on the event bus.
    fn request_permission(&self, device: &UsbDeviceInfo);
}

impl<H: UsbHost + ?Sized> UsbHost for &H {
    fn devices(&self) -> Vec<UsbDeviceInfo> {
        (**self).devices()
    }

    fn request_permission(&self, device: &UsbDeviceInfo) {
        (**self).request_permission(device)
    }
}

impl<H: UsbHost + ?Sized> UsbHost for Box<H> {
    fn devices(&self) -> Vec<UsbDeviceInfo> {
        (**self).devices()
    }

    fn request_permission(&self, device: &UsbDeviceInfo) {
        (**self).request_permission(device)
    }
}
