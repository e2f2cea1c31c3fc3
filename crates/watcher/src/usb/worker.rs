//! USB worker thread
//!
//! Dedicated thread that runs the libusb event loop, owns the hotplug
//! registration and answers permission requests. It only produces
//! [`HostEvent`]s; the device list itself is owned by the watcher task.

use common::{EventSender, HostEvent, UsbDeviceInfo};
use rusb::{Context, Device, Hotplug, HotplugBuilder, Registration, UsbContext};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long one `handle_events` call may block before commands are checked
const EVENT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Commands from the async side to the USB thread
#[derive(Debug)]
pub enum UsbCommand {
    /// Probe whether the named device can be opened
    RequestPermission { device_name: String },
    /// Stop the worker loop
    Shutdown,
}

/// USB worker thread state
pub struct UsbWorker {
    /// USB context shared with the host
    context: Context,
    /// Commands from the async side
    commands: async_channel::Receiver<UsbCommand>,
    /// Host event bus
    events: EventSender,
    /// Hot-plug registration, deregistered on drop
    _hotplug_registration: Option<Registration<Context>>,
}

impl UsbWorker {
    /// Create the worker and register hot-plug callbacks when supported
    pub fn new(
        context: Context,
        commands: async_channel::Receiver<UsbCommand>,
        events: EventSender,
    ) -> Result<Self, rusb::Error> {
        let registration = if rusb::has_hotplug() {
            let registration: Registration<Context> = HotplugBuilder::new()
                .enumerate(false)
                .register(&context, Box::new(HotplugForwarder::new(events.clone())))?;
            debug!("Hot-plug callbacks registered");
            Some(registration)
        } else {
            warn!("libusb hot-plug API unsupported, the device list only updates on manual refresh");
            None
        };

        Ok(Self {
            context,
            commands,
            events,
            _hotplug_registration: registration,
        })
    }

    /// Run the event loop until a Shutdown command arrives or the command
    /// channel closes
    pub fn run(self) -> Result<(), rusb::Error> {
        info!("USB worker thread started");

        while self.process_commands() {
            match self.context.handle_events(Some(EVENT_POLL_TIMEOUT)) {
                Ok(()) => {}
                Err(rusb::Error::Interrupted) => {
                    debug!("USB event handling interrupted");
                }
                Err(e) => {
                    warn!("Error handling USB events: {}", e);
                    std::thread::sleep(EVENT_POLL_TIMEOUT);
                }
            }
        }

        info!("USB worker thread stopped");
        Ok(())
    }

    /// Handle every queued command without blocking
    ///
    /// Returns `false` once a Shutdown command arrives or the command channel
    /// closes.
    fn process_commands(&self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(UsbCommand::RequestPermission { device_name }) => {
                    self.handle_permission_request(device_name);
                }
                Ok(UsbCommand::Shutdown) | Err(async_channel::TryRecvError::Closed) => {
                    info!("USB worker shutting down");
                    return false;
                }
                Err(async_channel::TryRecvError::Empty) => return true,
            }
        }
    }

    /// Answer a permission request with an access probe
    fn handle_permission_request(&self, device_name: String) {
        let granted = match self.find_device(&device_name) {
            Some(device) => match device.open() {
                Ok(_handle) => true,
                Err(e) => {
                    debug!("Cannot open {}: {}", device_name, e);
                    false
                }
            },
            None => {
                debug!("Permission requested for {} which is gone", device_name);
                false
            }
        };

        if let Err(e) = self.events.send_blocking(HostEvent::PermissionResult {
            device_name,
            granted,
        }) {
            error!("Failed to send PermissionResult event: {}", e);
        }
    }

    fn find_device(&self, device_name: &str) -> Option<Device<Context>> {
        let devices = match self.context.devices() {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Failed to enumerate USB devices: {}", e);
                return None;
            }
        };

        devices
            .iter()
            .find(|d| UsbDeviceInfo::bus_path(d.bus_number(), d.address()) == device_name)
    }
}

/// Forwards libusb hot-plug callbacks onto the host event bus
struct HotplugForwarder {
    events: EventSender,
}

impl HotplugForwarder {
    fn new(events: EventSender) -> Self {
        Self { events }
    }

    fn forward(&self, event: HostEvent) {
        if let Err(e) = self.events.send_blocking(event) {
            error!("Failed to forward hot-plug event: {}", e);
        }
    }
}

impl<T: UsbContext> Hotplug<T> for HotplugForwarder {
    fn device_arrived(&mut self, device: Device<T>) {
        let device_name = UsbDeviceInfo::bus_path(device.bus_number(), device.address());
        debug!("Hot-plug callback: device arrived ({})", device_name);
        self.forward(HostEvent::DeviceAttached { device_name });
    }

    fn device_left(&mut self, device: Device<T>) {
        let device_name = UsbDeviceInfo::bus_path(device.bus_number(), device.address());
        debug!("Hot-plug callback: device left ({})", device_name);
        self.forward(HostEvent::DeviceDetached { device_name });
    }
}

/// Spawn the USB worker thread
///
/// Returns once the worker is set up, so a failed hot-plug registration is
/// reported to the caller instead of silently closing the event bus. The
/// thread then runs until a Shutdown command is received or the command
/// channel closes.
pub fn spawn_usb_worker(
    context: Context,
    commands: async_channel::Receiver<UsbCommand>,
    events: EventSender,
) -> common::Result<JoinHandle<Result<(), rusb::Error>>> {
    spawn_worker_thread(
        move || UsbWorker::new(context, commands, events),
        UsbWorker::run,
    )
}

/// Start `init` on a new thread, wait for it to finish, then hand the result
/// to `run` on that same thread
fn spawn_worker_thread<W, I, R>(
    init: I,
    run: R,
) -> common::Result<JoinHandle<Result<(), rusb::Error>>>
where
    I: FnOnce() -> Result<W, rusb::Error> + Send + 'static,
    R: FnOnce(W) -> Result<(), rusb::Error> + Send + 'static,
{
    let (ready_tx, ready_rx) = async_channel::bounded::<Result<(), String>>(1);

    let thread = std::thread::Builder::new()
        .name("usb-worker".to_string())
        .spawn(move || match init() {
            Ok(worker) => {
                let _ = ready_tx.send_blocking(Ok(()));
                run(worker)
            }
            Err(e) => {
                let _ = ready_tx.send_blocking(Err(e.to_string()));
                Err(e)
            }
        })?;

    match ready_rx.recv_blocking() {
        Ok(Ok(())) => Ok(thread),
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(common::Error::Usb(format!("USB worker failed to start: {}", e)))
        }
        Err(_) => {
            let _ = thread.join();
            Err(common::Error::Usb(
                "USB worker exited during startup".to_string(),
            ))
        }
    }
}
