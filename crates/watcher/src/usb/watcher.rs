//! Device watcher
//!
//! Owns the list of currently attached USB devices. The list is recomputed
//! wholesale on start-up, on explicit refresh, and whenever the host reports
//! an attach or detach. Every refresh issues one permission request per
//! listed device. Permission outcomes are logged and do not alter the list.
//!
//! Readers get the list through a `watch` channel, so each one sees either
//! the previous list or the new one, never a mix.

use common::{DeviceList, EventBus, HostEvent, UsbHost};
use tokio::sync::watch;
use tracing::{debug, info};

/// Device watcher bound to a host platform
pub struct DeviceWatcher<H: UsbHost> {
    /// Host used for enumeration and permission requests
    host: H,
    /// Current device list, published to subscribers
    devices: watch::Sender<DeviceList>,
    /// Number of refreshes performed since creation
    refresh_count: u64,
}

impl<H: UsbHost> DeviceWatcher<H> {
    /// Create a watcher and perform the initial refresh
    pub fn new(host: H) -> Self {
        let (devices, _) = watch::channel(DeviceList::empty());
        let mut watcher = Self {
            host,
            devices,
            refresh_count: 0,
        };
        watcher.refresh();
        watcher
    }

    /// Re-enumerate attached devices and replace the current list
    ///
    /// After the new list is published, a permission request is issued for
    /// every device in it, including devices that were already granted.
    pub fn refresh(&mut self) -> DeviceList {
        let list = DeviceList::from(self.host.devices());

        self.devices.send_replace(list.clone());
        self.refresh_count += 1;
        debug!(
            "Refresh #{} found {} device(s)",
            self.refresh_count,
            list.len()
        );

        for device in &list {
            debug!("Requesting permission for {}", device);
            self.host.request_permission(device);
        }

        list
    }

    /// Record the outcome of a permission request
    ///
    /// Results for devices that are no longer attached are ignored.
    pub fn on_permission_result(&self, device_name: &str, granted: bool) {
        let devices = self.devices.borrow();

        match devices.find(device_name) {
            None => debug!(
                "Ignoring permission result for {} (granted: {}), device is no longer attached",
                device_name, granted
            ),
            Some(device) if granted => info!("Permission granted for device: {}", device),
            Some(device) => info!("Permission denied for device: {}", device),
        }
    }

    /// A device was attached
    pub fn on_device_attached(&mut self) -> DeviceList {
        self.refresh()
    }

    /// A device was detached
    pub fn on_device_detached(&mut self) -> DeviceList {
        self.refresh()
    }

    /// Dispatch one host event
    ///
    /// Returns the new list if the event caused a refresh.
    pub fn handle_event(&mut self, event: HostEvent) -> Option<DeviceList> {
        match event {
            HostEvent::PermissionResult {
                device_name,
                granted,
            } => {
                self.on_permission_result(&device_name, granted);
                None
            }
            HostEvent::DeviceAttached { device_name } => {
                info!("Device attached: {}", device_name);
                Some(self.on_device_attached())
            }
            HostEvent::DeviceDetached { device_name } => {
                info!("Device detached: {}", device_name);
                Some(self.on_device_detached())
            }
        }
    }

    /// Process every event already queued on the bus without waiting
    ///
    /// Returns the number of events handled.
    pub fn drain(&mut self, bus: &EventBus) -> usize {
        let mut handled = 0;
        while let Some(event) = bus.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Process events in delivery order until the bus closes
    pub async fn run(&mut self, bus: &EventBus) {
        while let Ok(event) = bus.recv().await {
            self.handle_event(event);
        }
        debug!("Host event bus closed, device watcher stopping");
    }

    /// Snapshot of the current device list
    pub fn devices(&self) -> DeviceList {
        self.devices.borrow().clone()
    }

    /// Subscribe to device list updates
    pub fn subscribe(&self) -> watch::Receiver<DeviceList> {
        self.devices.subscribe()
    }

    /// Number of refreshes performed since creation
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }
}
