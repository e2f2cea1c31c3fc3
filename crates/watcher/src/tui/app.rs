//! TUI application state
//!
//! Holds what the screen shows: the latest device list published by the
//! watcher, the selection, and the open dialog. The app never modifies the
//! device list; a manual refresh is only requested and carried out by the
//! event loop.

use common::DeviceList;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::debug;

use super::events::Action;

/// Current dialog/popup being displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    /// No dialog open
    None,
    /// Help dialog showing keybindings
    Help,
}

/// Application state
pub struct App {
    /// Device list currently on screen
    devices: DeviceList,
    /// Updates published by the device watcher
    updates: watch::Receiver<DeviceList>,
    /// Currently selected device index
    selected_index: usize,
    /// Current dialog being displayed
    dialog: Dialog,
    /// Whether the app should quit
    should_quit: bool,
    /// Whether the user asked for a manual refresh
    refresh_requested: bool,
    /// Number of device lists received, including the initial one
    updates_seen: u64,
    /// When the last device list was received
    last_update: Instant,
}

impl App {
    /// Create a new application instance showing the watcher's current list
    pub fn new(mut updates: watch::Receiver<DeviceList>) -> Self {
        let devices = updates.borrow_and_update().clone();
        Self {
            devices,
            updates,
            selected_index: 0,
            dialog: Dialog::None,
            should_quit: false,
            refresh_requested: false,
            updates_seen: 1,
            last_update: Instant::now(),
        }
    }

    /// Pull the latest list from the watcher if a new one was published
    ///
    /// Returns true when the list on screen changed.
    pub fn sync_devices(&mut self) -> bool {
        if !self.updates.has_changed().unwrap_or(false) {
            return false;
        }

        self.devices = self.updates.borrow_and_update().clone();
        self.updates_seen += 1;
        self.last_update = Instant::now();
        self.clamp_selection();
        debug!("Screen now shows {} device(s)", self.devices.len());
        true
    }

    fn clamp_selection(&mut self) {
        if self.devices.is_empty() {
            self.selected_index = 0;
        } else if self.selected_index >= self.devices.len() {
            self.selected_index = self.devices.len() - 1;
        }
    }

    /// Get the device list for display
    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    /// Get the selected index
    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    /// Get the current dialog
    pub fn dialog(&self) -> Dialog {
        self.dialog
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Number of device lists received
    pub fn updates_seen(&self) -> u64 {
        self.updates_seen
    }

    /// Time since the last device list was received
    pub fn since_last_update(&self) -> Duration {
        self.last_update.elapsed()
    }

    /// Consume a pending manual refresh request
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    /// Handle user action
    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => {
                if self.dialog != Dialog::None {
                    self.dialog = Dialog::None;
                } else {
                    self.should_quit = true;
                }
            }
            Action::CloseDialog => {
                self.dialog = Dialog::None;
            }
            Action::Up => {
                if self.dialog == Dialog::None && self.selected_index > 0 {
                    self.selected_index -= 1;
                }
            }
            Action::Down => {
                if self.dialog == Dialog::None && self.selected_index + 1 < self.devices.len() {
                    self.selected_index += 1;
                }
            }
            Action::Refresh => {
                debug!("Refresh requested");
                self.refresh_requested = true;
            }
            Action::ShowHelp => {
                self.dialog = Dialog::Help;
            }
            Action::None => {}
        }
    }
}
