//! usb-watcher
//!
//! Lists the USB devices attached to this machine, requests access to each of
//! them, and keeps the list current as devices are plugged in and removed.

use anyhow::{Context, Result};
use clap::Parser;
use common::{LogTarget, UsbHost, create_event_bus, setup_logging};
use std::path::PathBuf;
use tracing::info;
use usb_watcher::{DeviceWatcher, WatcherConfig, service, tui, usb};

#[derive(Parser, Debug)]
#[command(name = "usb-watcher")]
#[command(
    author,
    version,
    about = "USB Watcher - Live list of attached USB devices"
)]
#[command(long_about = "
Enumerates the USB devices attached to this machine, requests access to
each of them, and refreshes the list whenever a device is plugged in or
removed.

EXAMPLES:
    # Show the live device list
    usb-watcher

    # Run with custom config
    usb-watcher --config /path/to/watcher.toml

    # List USB devices once and exit
    usb-watcher --list-devices

    # Run as systemd service (no TUI)
    usb-watcher --service

    # Run with debug logging
    usb-watcher --log-level debug

CONFIGURATION:
    The watcher looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/usb-watcher/watcher.toml
    3. /etc/usb-watcher/watcher.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Run as systemd service (no TUI)
    #[arg(long)]
    service: bool,

    /// List USB devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = WatcherConfig::default();
        let path = WatcherConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        WatcherConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        WatcherConfig::load_or_default()
    };

    // Use CLI log level if specified, otherwise use config value
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.watcher.log_level);

    let service_mode = args.service || config.watcher.service_mode;
    let tui_mode = !service_mode && !args.list_devices;

    // The terminal UI owns stdout, so its logs go to a file
    let log_target = if tui_mode {
        LogTarget::File(config.watcher.log_file_path())
    } else {
        LogTarget::Stdout
    };
    setup_logging(log_level, log_target).context("Failed to setup logging")?;

    info!("usb-watcher v{}", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", log_level);

    let (events, bus) = create_event_bus();
    let (host, usb_worker) =
        usb::start(&config.usb, events).context("Failed to start USB subsystem")?;

    let result = if args.list_devices {
        list_devices_mode(&host);
        Ok(())
    } else {
        let mut watcher = DeviceWatcher::new(host);
        if service_mode {
            info!("Running in service mode (headless)");
            service::run(&mut watcher, &bus).await
        } else {
            info!("Running in TUI mode (interactive)");
            tui::run(&mut watcher, &bus, config.watcher.tick_rate()).await
        }
    };

    usb_worker.shutdown();

    result
}

/// List USB devices and exit
fn list_devices_mode(host: &impl UsbHost) {
    info!("Listing USB devices...");

    let devices = host.devices();

    if devices.is_empty() {
        println!("No USB devices found.");
        return;
    }

    println!("Found {} USB device(s):\n", devices.len());
    for device in devices {
        println!("  Device Name: {}", device.name);
        println!("      Vendor ID: {}", device.vendor_id);
        println!("      Product ID: {}", device.product_id);
        println!();
    }
}
