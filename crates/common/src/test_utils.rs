//! Test utilities for usb-watcher
//!
//! Provides a scriptable [`UsbHost`] and helper functions for testing across
//! crates.
//!
//! # Example
//!
//! ```
//! use common::UsbHost;
//! use common::test_utils::{FakeUsbHost, create_mock_device_info};
//!
//! let host = FakeUsbHost::with_devices(vec![create_mock_device_info(1, 0x1234, 0x5678)]);
//! assert_eq!(host.devices().len(), 1);
//! ```

use crate::channel::{EventSender, HostEvent};
use crate::host::UsbHost;
use crate::usb_types::UsbDeviceInfo;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a mock UsbDeviceInfo for testing
///
/// The name follows the libusb host format, with `id` used as the address on
/// bus 1.
pub fn create_mock_device_info(id: u8, vendor_id: u16, product_id: u16) -> UsbDeviceInfo {
    UsbDeviceInfo::new(UsbDeviceInfo::bus_path(1, id), vendor_id, product_id)
}

/// Create `count` mock devices with distinct names and IDs
pub fn create_mock_device_list(count: u8) -> Vec<UsbDeviceInfo> {
    (1..=count)
        .map(|i| create_mock_device_info(i, 0x1000 + u16::from(i), 0x2000 + u16::from(i)))
        .collect()
}

/// Run a future with a timeout
pub async fn with_timeout<F: Future>(
    timeout: Duration,
    future: F,
) -> Result<F::Output, tokio::time::error::Elapsed> {
    tokio::time::timeout(timeout, future).await
}

/// How a [`FakeUsbHost`] answers permission requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionPolicy {
    /// Record the request and never answer
    Silent,
    /// Answer every request with a grant
    GrantAll,
    /// Answer every request with a denial
    DenyAll,
}

#[derive(Debug)]
struct FakeState {
    devices: Vec<UsbDeviceInfo>,
    permission_requests: Vec<String>,
    enumerations: usize,
}

/// In-memory USB host
///
/// Clones share state, so a test can keep one handle while the watcher owns
/// another and plug or unplug devices underneath it.
#[derive(Debug, Clone)]
pub struct FakeUsbHost {
    state: Arc<Mutex<FakeState>>,
    events: Option<EventSender>,
    policy: PermissionPolicy,
}

impl Default for FakeUsbHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeUsbHost {
    /// Host with no devices attached
    pub fn new() -> Self {
        Self::with_devices(Vec::new())
    }

    /// Host with `devices` attached
    pub fn with_devices(devices: Vec<UsbDeviceInfo>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                devices,
                permission_requests: Vec::new(),
                enumerations: 0,
            })),
            events: None,
            policy: PermissionPolicy::Silent,
        }
    }

    /// Connect the host to an event bus
    ///
    /// Attach/detach helpers then post notifications, and permission requests
    /// are answered according to `policy`.
    pub fn with_event_sender(mut self, events: EventSender, policy: PermissionPolicy) -> Self {
        self.events = Some(events);
        self.policy = policy;
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn post(&self, event: HostEvent) {
        if let Some(events) = &self.events {
            let _ = events.send_blocking(event);
        }
    }

    /// Plug in a device and post a `DeviceAttached` notification
    pub fn attach(&self, device: UsbDeviceInfo) {
        let device_name = device.name.clone();
        self.state().devices.push(device);
        self.post(HostEvent::DeviceAttached { device_name });
    }

    /// Unplug a device by name and post a `DeviceDetached` notification
    pub fn detach(&self, name: &str) {
        self.state().devices.retain(|d| d.name != name);
        self.post(HostEvent::DeviceDetached {
            device_name: name.to_string(),
        });
    }

    /// Replace the attached devices without posting any notification
    pub fn set_devices(&self, devices: Vec<UsbDeviceInfo>) {
        self.state().devices = devices;
    }

    /// Names of every device a permission request was issued for, in order
    pub fn permission_requests(&self) -> Vec<String> {
        self.state().permission_requests.clone()
    }

    /// Forget recorded permission requests
    pub fn clear_permission_requests(&self) {
        self.state().permission_requests.clear();
    }

    /// Number of times the device list was enumerated
    pub fn enumerations(&self) -> usize {
        self.state().enumerations
    }
}

impl UsbHost for FakeUsbHost {
    fn devices(&self) -> Vec<UsbDeviceInfo> {
        let mut state = self.state();
        state.enumerations += 1;
        state.devices.clone()
    }

    fn request_permission(&self, device: &UsbDeviceInfo) {
        self.state().permission_requests.push(device.name.clone());

        let granted = match self.policy {
            PermissionPolicy::Silent => return,
            PermissionPolicy::GrantAll => true,
            PermissionPolicy::DenyAll => false,
        };
        self.post(HostEvent::PermissionResult {
            device_name: device.name.clone(),
            granted,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::create_event_bus;

    #[test]
    fn test_mock_device_list_is_unique() {
        let devices = create_mock_device_list(4);
        assert_eq!(devices.len(), 4);
        assert_eq!(devices[0].name, "/dev/bus/usb/001/001");
        assert_eq!(devices[3].name, "/dev/bus/usb/001/004");
        assert_ne!(devices[0].vendor_id, devices[1].vendor_id);
    }

    #[test]
    fn test_fake_host_clones_share_state() {
        let host = FakeUsbHost::new();
        let other = host.clone();

        host.attach(create_mock_device_info(1, 0x1234, 0x5678));
        assert_eq!(other.devices().len(), 1);

        other.detach("/dev/bus/usb/001/001");
        assert!(host.devices().is_empty());
        assert_eq!(host.enumerations(), 2);
    }

    #[test]
    fn test_fake_host_answers_permission_requests() {
        let (tx, bus) = create_event_bus();
        let host = FakeUsbHost::new().with_event_sender(tx, PermissionPolicy::DenyAll);
        let device = create_mock_device_info(3, 0x1, 0x2);

        host.request_permission(&device);

        assert_eq!(host.permission_requests(), vec![device.name.clone()]);
        assert_eq!(
            bus.try_recv(),
            Some(HostEvent::PermissionResult {
                device_name: device.name,
                granted: false,
            })
        );
    }

    #[test]
    fn test_silent_host_posts_nothing() {
        let (tx, bus) = create_event_bus();
        let host = FakeUsbHost::new().with_event_sender(tx, PermissionPolicy::Silent);

        host.request_permission(&create_mock_device_info(1, 0, 0));

        assert!(bus.is_empty());
        assert_eq!(host.permission_requests().len(), 1);
    }
}
