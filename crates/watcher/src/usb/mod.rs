//! USB subsystem
//!
//! Device enumeration, hot-plug detection and permission handling.
//!
//! - [`DeviceWatcher`] owns the device list and reacts to host events.
//! - [`RusbHost`] is the libusb implementation of [`common::UsbHost`].
//! - The worker thread runs the libusb event loop so the Tokio runtime is
//!   never blocked by it.

pub mod filter;
pub mod host;
pub mod watcher;
pub mod worker;

pub use filter::{DeviceFilter, FilterSet};
pub use host::RusbHost;
pub use watcher::DeviceWatcher;
pub use worker::{UsbCommand, spawn_usb_worker};

use crate::config::UsbSettings;
use common::EventSender;
use std::thread::JoinHandle;
use tracing::{error, info};

/// Capacity of the command channel to the USB thread
const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Running USB worker thread
pub struct UsbWorkerHandle {
    commands: async_channel::Sender<UsbCommand>,
    thread: JoinHandle<Result<(), rusb::Error>>,
}

impl UsbWorkerHandle {
    /// Stop the worker thread and wait for it to exit
    pub fn shutdown(self) {
        info!("Shutting down USB subsystem...");
        // A send error means the thread already exited
        let _ = self.commands.send_blocking(UsbCommand::Shutdown);

        match self.thread.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("USB worker exited with error: {}", e),
            Err(e) => error!("USB worker thread panicked: {:?}", e),
        }
    }
}

/// Start the libusb host and its worker thread
///
/// Events produced by the worker (hot-plug, permission results) are posted
/// on `events`.
pub fn start(
    settings: &UsbSettings,
    events: EventSender,
) -> common::Result<(RusbHost, UsbWorkerHandle)> {
    let context = rusb::Context::new().map_err(|e| common::Error::Usb(e.to_string()))?;
    let (cmd_tx, cmd_rx) = async_channel::bounded(COMMAND_CHANNEL_CAPACITY);

    let host = RusbHost::new(context.clone(), cmd_tx.clone(), settings)?;
    let thread = spawn_usb_worker(context, cmd_rx, events)?;

    Ok((
        host,
        UsbWorkerHandle {
            commands: cmd_tx,
            thread,
        },
    ))
}
