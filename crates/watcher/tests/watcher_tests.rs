//! Integration tests for the device watcher
//!
//! Drives a DeviceWatcher with a FakeUsbHost connected to a real event bus:
//! - Refresh on attach/detach tracks the host exactly
//! - One permission request per device per refresh
//! - Permission results (including stale ones) never change the list
//! - Events are processed in delivery order
//!
//! Run with: `cargo test -p usb-watcher --test watcher_tests`

use common::test_utils::{
    DEFAULT_TEST_TIMEOUT, FakeUsbHost, PermissionPolicy, create_mock_device_info,
    create_mock_device_list, with_timeout,
};
use common::{DeviceList, HostEvent, UsbDeviceInfo, UsbHost, create_event_bus};
use usb_watcher::DeviceWatcher;

fn names(list: &DeviceList) -> Vec<String> {
    list.iter().map(|d| d.name.clone()).collect()
}

// ============================================================================
// Attach / detach tracking
// ============================================================================

#[test]
fn test_list_matches_host_after_every_event() {
    let (tx, bus) = create_event_bus();
    let host = FakeUsbHost::new().with_event_sender(tx, PermissionPolicy::Silent);
    let mut watcher = DeviceWatcher::new(host.clone());

    let plan: [(bool, u8); 6] = [
        (true, 1),
        (true, 2),
        (true, 3),
        (false, 2),
        (true, 4),
        (false, 1),
    ];

    for (attach, id) in plan {
        if attach {
            host.attach(create_mock_device_info(id, 0x1000 + u16::from(id), 0x2000));
        } else {
            host.detach(&UsbDeviceInfo::bus_path(1, id));
        }

        let event = bus.try_recv().expect("host posted a notification");
        let list = watcher.handle_event(event).expect("attach/detach refreshes");

        assert_eq!(&*list, host.devices().as_slice());
        assert_eq!(watcher.devices(), list);
    }

    assert_eq!(
        names(&watcher.devices()),
        vec!["/dev/bus/usb/001/003", "/dev/bus/usb/001/004"]
    );
}

#[test]
fn test_logitech_receiver_scenario() {
    let (tx, bus) = create_event_bus();
    let host = FakeUsbHost::new().with_event_sender(tx, PermissionPolicy::Silent);
    let mut watcher = DeviceWatcher::new(host.clone());

    host.set_devices(vec![UsbDeviceInfo::new("usb:1-1", 0x046D, 0xC52B)]);
    let list = watcher.refresh();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0], UsbDeviceInfo::new("usb:1-1", 0x046D, 0xC52B));

    host.detach("usb:1-1");
    assert_eq!(watcher.drain(&bus), 1);
    assert!(watcher.devices().is_empty());
}

#[test]
fn test_refresh_with_no_devices() {
    let mut watcher = DeviceWatcher::new(FakeUsbHost::new());
    assert!(watcher.refresh().is_empty());
}

#[test]
fn test_back_to_back_refreshes_are_identical() {
    let host = FakeUsbHost::with_devices(create_mock_device_list(5));
    let mut watcher = DeviceWatcher::new(host);

    assert_eq!(watcher.refresh(), watcher.refresh());
}

// ============================================================================
// Permission requests
// ============================================================================

#[test]
fn test_one_permission_request_per_device_per_refresh() {
    let host = FakeUsbHost::with_devices(create_mock_device_list(3));
    let mut watcher = DeviceWatcher::new(host.clone());

    for _ in 0..3 {
        host.clear_permission_requests();
        let list = watcher.refresh();
        assert_eq!(host.permission_requests(), names(&list));
    }
}

#[test]
fn test_attach_requests_permission_for_whole_list() {
    let (tx, bus) = create_event_bus();
    let host = FakeUsbHost::with_devices(create_mock_device_list(2))
        .with_event_sender(tx, PermissionPolicy::Silent);
    let mut watcher = DeviceWatcher::new(host.clone());
    host.clear_permission_requests();

    host.attach(create_mock_device_info(7, 0xabcd, 0x0001));
    watcher.drain(&bus);

    // No memoization: previously seen devices are asked again
    assert_eq!(host.permission_requests(), names(&watcher.devices()));
    assert_eq!(host.permission_requests().len(), 3);
}

#[test]
fn test_granted_results_leave_list_untouched() {
    let (tx, bus) = create_event_bus();
    let host = FakeUsbHost::with_devices(create_mock_device_list(2))
        .with_event_sender(tx, PermissionPolicy::GrantAll);
    let mut watcher = DeviceWatcher::new(host.clone());
    let before = watcher.devices();

    // Two PermissionResult events from the initial refresh
    assert_eq!(bus.len(), 2);
    assert_eq!(watcher.drain(&bus), 2);

    assert_eq!(watcher.devices(), before);
    assert_eq!(watcher.refresh_count(), 1);
}

#[test]
fn test_denied_results_leave_list_untouched() {
    let (tx, bus) = create_event_bus();
    let host = FakeUsbHost::with_devices(create_mock_device_list(2))
        .with_event_sender(tx, PermissionPolicy::DenyAll);
    let mut watcher = DeviceWatcher::new(host.clone());
    let before = watcher.devices();

    watcher.drain(&bus);

    assert_eq!(watcher.devices(), before);
}

#[test]
fn test_stale_permission_result_after_detach() {
    let (tx, bus) = create_event_bus();
    let host = FakeUsbHost::with_devices(vec![create_mock_device_info(1, 0x046d, 0xc52b)])
        .with_event_sender(tx.clone(), PermissionPolicy::Silent);
    let mut watcher = DeviceWatcher::new(host.clone());

    // Device leaves before its permission request resolves
    host.detach("/dev/bus/usb/001/001");
    watcher.drain(&bus);
    assert!(watcher.devices().is_empty());

    tx.send_blocking(HostEvent::PermissionResult {
        device_name: "/dev/bus/usb/001/001".to_string(),
        granted: true,
    })
    .unwrap();

    assert_eq!(watcher.drain(&bus), 1);
    assert!(watcher.devices().is_empty());
}

// ============================================================================
// Event ordering and the async loop
// ============================================================================

#[tokio::test]
async fn test_run_processes_events_in_order_until_bus_closes() {
    let (tx, bus) = create_event_bus();
    let host = FakeUsbHost::new();
    let mut watcher = DeviceWatcher::new(host.clone());
    let mut updates = watcher.subscribe();

    // Each event lands while the host shows a different device set, so the
    // published lists only line up if events are handled one by one in order
    let steps = [
        (1, HostEvent::DeviceAttached {
            device_name: "/dev/bus/usb/001/001".to_string(),
        }),
        (3, HostEvent::DeviceAttached {
            device_name: "/dev/bus/usb/001/003".to_string(),
        }),
        (2, HostEvent::DeviceDetached {
            device_name: "/dev/bus/usb/001/003".to_string(),
        }),
    ];

    let driver_host = host.clone();
    let driver = async move {
        let mut published = Vec::new();
        for (count, event) in steps {
            driver_host.set_devices(create_mock_device_list(count));
            tx.send(event).await.unwrap();
            updates.changed().await.unwrap();
            published.push(names(&updates.borrow_and_update()));
        }

        tx.send(HostEvent::PermissionResult {
            device_name: "/dev/bus/usb/001/001".to_string(),
            granted: false,
        })
        .await
        .unwrap();
        drop(tx);
        published
    };

    let ((), published) = with_timeout(DEFAULT_TEST_TIMEOUT, async {
        tokio::join!(watcher.run(&bus), driver)
    })
    .await
    .expect("watcher loop did not stop");

    assert_eq!(
        published,
        vec![
            names(&create_mock_device_list(1).into()),
            names(&create_mock_device_list(3).into()),
            names(&create_mock_device_list(2).into()),
        ]
    );

    // Initial empty refresh plus one per attach/detach
    assert_eq!(watcher.refresh_count(), 4);
    assert_eq!(
        host.permission_requests(),
        vec![
            "/dev/bus/usb/001/001",
            "/dev/bus/usb/001/001",
            "/dev/bus/usb/001/002",
            "/dev/bus/usb/001/003",
            "/dev/bus/usb/001/001",
            "/dev/bus/usb/001/002",
        ]
    );
}

#[tokio::test]
async fn test_subscriber_sees_whole_lists_only() {
    let host = FakeUsbHost::with_devices(create_mock_device_list(3));
    let mut watcher = DeviceWatcher::new(host.clone());
    let mut updates = watcher.subscribe();

    let reader = tokio::spawn(async move {
        let mut seen = Vec::new();
        while updates.changed().await.is_ok() {
            seen.push(updates.borrow_and_update().len());
        }
        seen
    });

    host.set_devices(create_mock_device_list(1));
    watcher.refresh();
    tokio::task::yield_now().await;
    host.set_devices(create_mock_device_list(4));
    watcher.refresh();
    drop(watcher);

    let seen = with_timeout(DEFAULT_TEST_TIMEOUT, reader)
        .await
        .expect("reader did not finish")
        .expect("reader panicked");

    assert!(!seen.is_empty());
    assert!(seen.iter().all(|len| *len == 1 || *len == 4));
    assert_eq!(seen.last(), Some(&4));
}
