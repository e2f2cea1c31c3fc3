//! Event Bus Integration Tests
//!
//! Tests for the channel carrying host notifications to the device watcher.
//!
//! # Test Scenarios
//! - Events sent from a blocking thread arrive in the async receiver
//! - Delivery order is preserved across many senders' events
//! - Closing behaviour once every sender is dropped
//!
//! Run with: `cargo test -p common --test event_bus_tests`

use common::channel::EVENT_BUS_CAPACITY;
use common::test_utils::{DEFAULT_TEST_TIMEOUT, with_timeout};
use common::{HostEvent, create_event_bus};
use std::thread;

fn attached(n: usize) -> HostEvent {
    HostEvent::DeviceAttached {
        device_name: format!("/dev/bus/usb/001/{:03}", n),
    }
}

#[tokio::test]
async fn test_blocking_sender_to_async_receiver() {
    let (tx, bus) = create_event_bus();

    let handle = thread::spawn(move || {
        tx.send_blocking(HostEvent::PermissionResult {
            device_name: "/dev/bus/usb/002/003".to_string(),
            granted: true,
        })
        .expect("Failed to send event");
    });

    let event = with_timeout(DEFAULT_TEST_TIMEOUT, bus.recv())
        .await
        .expect("Timed out")
        .expect("Bus closed");

    assert_eq!(
        event,
        HostEvent::PermissionResult {
            device_name: "/dev/bus/usb/002/003".to_string(),
            granted: true,
        }
    );
    handle.join().expect("Sender thread panicked");
}

#[tokio::test]
async fn test_delivery_order_is_preserved() {
    let (tx, bus) = create_event_bus();

    let handle = thread::spawn(move || {
        for n in 0..100 {
            tx.send_blocking(attached(n)).unwrap();
        }
    });

    for n in 0..100 {
        let event = with_timeout(DEFAULT_TEST_TIMEOUT, bus.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, attached(n));
    }

    handle.join().unwrap();
}

#[tokio::test]
async fn test_cloned_senders_share_one_queue() {
    let (tx, bus) = create_event_bus();
    let tx2 = tx.clone();

    tx.send(attached(1)).await.unwrap();
    tx2.send(HostEvent::DeviceDetached {
        device_name: "/dev/bus/usb/001/001".to_string(),
    })
    .await
    .unwrap();

    assert_eq!(bus.len(), 2);
    assert!(matches!(bus.try_recv(), Some(HostEvent::DeviceAttached { .. })));
    assert!(matches!(bus.try_recv(), Some(HostEvent::DeviceDetached { .. })));
    assert!(bus.try_recv().is_none());
}

#[tokio::test]
async fn test_queued_events_survive_sender_drop() {
    let (tx, bus) = create_event_bus();
    tx.send(attached(5)).await.unwrap();
    drop(tx);

    assert_eq!(bus.recv().await.unwrap(), attached(5));
    assert!(bus.recv().await.is_err());
}

#[test]
fn test_sender_reports_closed_bus() {
    let (tx, bus) = create_event_bus();
    assert!(!tx.is_closed());

    drop(bus);
    assert!(tx.is_closed());
    assert!(tx.send_blocking(attached(1)).is_err());
}

#[test]
fn test_capacity_is_bounded() {
    let (tx, bus) = create_event_bus();

    for n in 0..EVENT_BUS_CAPACITY {
        tx.send_blocking(attached(n)).unwrap();
    }

    assert_eq!(bus.len(), EVENT_BUS_CAPACITY);
}
