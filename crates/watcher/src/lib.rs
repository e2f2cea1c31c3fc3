//! usb-watcher
//!
//! Watches the USB devices attached to this machine, requests access to each
//! of them, and shows the live list in a terminal UI or logs it headless.

pub mod config;
pub mod service;
pub mod tui;
pub mod usb;

pub use config::WatcherConfig;
pub use usb::DeviceWatcher;
