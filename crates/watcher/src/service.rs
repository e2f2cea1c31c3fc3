//! Headless service mode
//!
//! Runs the device watcher without a terminal UI, logging every refresh,
//! until Ctrl+C. Under systemd (Type=notify) the sd-notify protocol is used
//! to report readiness and shutdown.

use crate::usb::DeviceWatcher;
use anyhow::{Context, Result};
use common::{EventBus, UsbHost};
use std::env;
use std::os::unix::net::UnixDatagram;
use tokio::signal;
use tracing::{debug, error, info};

/// Send a state string to systemd if `NOTIFY_SOCKET` is set
fn notify(state: &str) -> Result<()> {
    if let Ok(socket_path) = env::var("NOTIFY_SOCKET") {
        let socket = UnixDatagram::unbound().context("Failed to create Unix socket")?;
        socket
            .send_to(state.as_bytes(), &socket_path)
            .with_context(|| format!("Failed to send {} notification to systemd", state))?;
        debug!("Notified systemd: {}", state);
    } else {
        debug!("NOTIFY_SOCKET not set, skipping systemd notification");
    }
    Ok(())
}

/// Notify systemd that the service is ready
pub fn notify_ready() -> Result<()> {
    notify("READY=1")
}

/// Notify systemd that the service is stopping
pub fn notify_stopping() -> Result<()> {
    notify("STOPPING=1")
}

/// Check if running under systemd
pub fn is_systemd() -> bool {
    env::var("INVOCATION_ID").is_ok() || env::var("NOTIFY_SOCKET").is_ok()
}

/// Log a device list, one line per device
fn log_devices(devices: &common::DeviceList) {
    if devices.is_empty() {
        info!("No USB devices found");
        return;
    }

    info!("{} USB device(s) connected", devices.len());
    for device in devices {
        info!(
            "  {} vendor={} product={}",
            device.name, device.vendor_id, device.product_id
        );
    }
}

/// Run the watcher headless until Ctrl+C or until the event bus closes
pub async fn run<H: UsbHost>(watcher: &mut DeviceWatcher<H>, bus: &EventBus) -> Result<()> {
    info!("Starting USB watcher in service mode");

    if is_systemd() {
        info!("Running under systemd");
    }

    log_devices(&watcher.devices());

    notify_ready().context("Failed to notify systemd ready")?;

    info!("Press Ctrl+C to shutdown");

    loop {
        tokio::select! {
            event = bus.recv() => {
                match event {
                    Ok(event) => {
                        if let Some(devices) = watcher.handle_event(event) {
                            log_devices(&devices);
                        }
                    }
                    Err(e) => {
                        error!("Host event bus closed: {}", e);
                        break;
                    }
                }
            }
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Received Ctrl+C, shutting down gracefully..."),
                    Err(e) => error!("Error waiting for Ctrl+C: {}", e),
                }
                break;
            }
        }
    }

    notify_stopping().context("Failed to notify systemd stopping")?;

    info!("Service shutdown complete");
    Ok(())
}
