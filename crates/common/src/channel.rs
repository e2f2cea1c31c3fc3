//! Host event bus
//!
//! Notifications from the host platform (permission results, attach and
//! detach) travel to the device watcher over a single bounded channel, so
//! they are processed one at a time in delivery order. The USB thread sends
//! with the blocking half; the watcher task receives asynchronously.

use async_channel::{Receiver, Sender, TryRecvError, bounded};

/// Capacity of the host event channel
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Events delivered by the host platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A previously issued permission request was resolved
    PermissionResult {
        /// Name of the device the request was issued for
        device_name: String,
        /// Whether access was granted
        granted: bool,
    },

    /// A device was plugged in
    DeviceAttached {
        /// Name of the device, for logging only
        device_name: String,
    },

    /// A device was unplugged
    DeviceDetached {
        /// Name of the device, for logging only
        device_name: String,
    },
}

impl HostEvent {
    /// Name of the device this event refers to
    pub fn device_name(&self) -> &str {
        match self {
            HostEvent::PermissionResult { device_name, .. }
            | HostEvent::DeviceAttached { device_name }
            | HostEvent::DeviceDetached { device_name } => device_name,
        }
    }
}

/// Sending half of the event bus (host side)
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<HostEvent>,
}

impl EventSender {
    /// Send an event from async context
    pub async fn send(&self, event: HostEvent) -> crate::Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Send an event from a blocking thread (USB worker)
    pub fn send_blocking(&self, event: HostEvent) -> crate::Result<()> {
        self.tx
            .send_blocking(event)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Whether the receiving side has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of the event bus (watcher side)
#[derive(Debug)]
pub struct EventBus {
    rx: Receiver<HostEvent>,
}

impl EventBus {
    /// Receive the next event
    ///
    /// Fails once every sender has been dropped and the queue is empty.
    pub async fn recv(&self) -> crate::Result<HostEvent> {
        self.rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&self) -> Option<HostEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Number of events waiting to be processed
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Create the event bus
///
/// Returns (EventSender for the host, EventBus for the watcher)
pub fn create_event_bus() -> (EventSender, EventBus) {
    let (tx, rx) = bounded(EVENT_BUS_CAPACITY);
    (EventSender { tx }, EventBus { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_roundtrip() {
        let (tx, bus) = create_event_bus();

        let handle = std::thread::spawn(move || {
            tx.send_blocking(HostEvent::DeviceAttached {
                device_name: "/dev/bus/usb/001/002".to_string(),
            })
            .unwrap();
        });

        let event = bus.recv().await.unwrap();
        assert_eq!(event.device_name(), "/dev/bus/usb/001/002");
        assert!(matches!(event, HostEvent::DeviceAttached { .. }));

        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_recv_fails_after_senders_dropped() {
        let (tx, bus) = create_event_bus();
        drop(tx);
        assert!(matches!(bus.recv().await, Err(crate::Error::Channel(_))));
    }

    #[test]
    fn test_try_recv_empty() {
        let (_tx, bus) = create_event_bus();
        assert!(bus.try_recv().is_none());
        assert!(bus.is_empty());
    }
}
