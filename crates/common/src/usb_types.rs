//! USB device data model
//!
//! A [`UsbDeviceInfo`] is an immutable snapshot of one attached device and a
//! [`DeviceList`] is the ordered set of snapshots taken by one refresh. Both
//! are replaced wholesale on every refresh and never patched in place.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Snapshot of one attached USB device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsbDeviceInfo {
    /// Device name/path, unique among currently attached devices
    pub name: String,
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
}

impl UsbDeviceInfo {
    pub fn new(name: impl Into<String>, vendor_id: u16, product_id: u16) -> Self {
        Self {
            name: name.into(),
            vendor_id,
            product_id,
        }
    }

    /// Device node path used by libusb-backed hosts, e.g. `/dev/bus/usb/001/004`
    pub fn bus_path(bus_number: u8, address: u8) -> String {
        format!("/dev/bus/usb/{:03}/{:03}", bus_number, address)
    }
}

impl fmt::Display for UsbDeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:04x}:{:04x})",
            self.name, self.vendor_id, self.product_id
        )
    }
}

/// Devices attached right now, in host enumeration order
///
/// Cloning is cheap: the entries live behind an `Arc` so a published list can
/// be handed to any number of readers without copying.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceList(Arc<[UsbDeviceInfo]>);

impl DeviceList {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a device by its name
    pub fn find(&self, name: &str) -> Option<&UsbDeviceInfo> {
        self.0.iter().find(|device| device.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

impl From<Vec<UsbDeviceInfo>> for DeviceList {
    fn from(devices: Vec<UsbDeviceInfo>) -> Self {
        Self(devices.into())
    }
}

impl FromIterator<UsbDeviceInfo> for DeviceList {
    fn from_iter<I: IntoIterator<Item = UsbDeviceInfo>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Deref for DeviceList {
    type Target = [UsbDeviceInfo];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> IntoIterator for &'a DeviceList {
    type Item = &'a UsbDeviceInfo;
    type IntoIter = std::slice::Iter<'a, UsbDeviceInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
