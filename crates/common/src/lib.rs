//! Common utilities for usb-watcher
//!
//! This crate provides the pieces shared between the watcher binary and its
//! tests: the USB device data model, the host platform seam, the host event
//! bus, error handling, and logging setup.

pub mod channel;
pub mod error;
pub mod host;
pub mod logging;
pub mod test_utils;
pub mod usb_types;

pub use channel::{EventBus, EventSender, HostEvent, create_event_bus};
pub use error::{Error, Result};
pub use host::UsbHost;
pub use logging::{LogTarget, setup_logging};
pub use usb_types::{DeviceList, UsbDeviceInfo};
