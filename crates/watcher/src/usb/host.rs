//! libusb-backed host
//!
//! Enumerates devices through a shared `rusb::Context` and forwards
//! permission requests to the USB worker thread, which answers them on the
//! host event bus.

use crate::config::UsbSettings;
use crate::usb::filter::FilterSet;
use crate::usb::worker::UsbCommand;
use common::{UsbDeviceInfo, UsbHost};
use rusb::{Context, Device, UsbContext};
use tracing::{debug, warn};

/// Linux Foundation vendor ID, used by root hubs
const ROOT_HUB_VENDOR_ID: u16 = 0x1d6b;
/// USB hub device class
const HUB_CLASS: u8 = 9;

/// USB host backed by libusb
pub struct RusbHost {
    /// USB context shared with the worker thread
    context: Context,
    /// Command channel to the worker thread
    commands: async_channel::Sender<UsbCommand>,
    /// Devices the host is allowed to report
    filters: FilterSet,
    /// Hide root hubs from enumeration
    skip_root_hubs: bool,
}

impl RusbHost {
    pub fn new(
        context: Context,
        commands: async_channel::Sender<UsbCommand>,
        settings: &UsbSettings,
    ) -> common::Result<Self> {
        let filters = FilterSet::parse(&settings.filters)
            .map_err(|e| common::Error::Config(e.to_string()))?;

        Ok(Self {
            context,
            commands,
            filters,
            skip_root_hubs: settings.skip_root_hubs,
        })
    }

    /// Snapshot one device, or `None` if it is filtered out or unreadable
    fn snapshot(&self, device: &Device<Context>) -> Option<UsbDeviceInfo> {
        let name = UsbDeviceInfo::bus_path(device.bus_number(), device.address());

        let desc = match device.device_descriptor() {
            Ok(desc) => desc,
            Err(e) => {
                debug!("Skipping {}: cannot read device descriptor: {}", name, e);
                return None;
            }
        };

        if self.skip_root_hubs
            && desc.vendor_id() == ROOT_HUB_VENDOR_ID
            && desc.class_code() == HUB_CLASS
        {
            debug!("Skipping root hub {}", name);
            return None;
        }

        if !self.filters.allows(desc.vendor_id(), desc.product_id()) {
            debug!(
                "Device ignored by filter: {}, vid={:#06x}, pid={:#06x}",
                name,
                desc.vendor_id(),
                desc.product_id()
            );
            return None;
        }

        Some(UsbDeviceInfo::new(name, desc.vendor_id(), desc.product_id()))
    }
}

impl UsbHost for RusbHost {
    fn devices(&self) -> Vec<UsbDeviceInfo> {
        match self.context.devices() {
            Ok(list) => list.iter().filter_map(|d| self.snapshot(&d)).collect(),
            Err(e) => {
                warn!("Failed to enumerate USB devices: {}", e);
                Vec::new()
            }
        }
    }

    fn request_permission(&self, device: &UsbDeviceInfo) {
        let cmd = UsbCommand::RequestPermission {
            device_name: device.name.clone(),
        };
        if let Err(e) = self.commands.try_send(cmd) {
            warn!("Failed to queue permission request for {}: {}", device, e);
        }
    }
}
