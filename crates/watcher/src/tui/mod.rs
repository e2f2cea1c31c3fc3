//! Terminal User Interface
//!
//! Shows the device watcher's list and keeps it current. The event loop is
//! the single place where watcher operations run: host events and manual
//! refresh requests are handled here one at a time, in arrival order.

pub mod app;
pub mod events;
pub mod ui;

pub use app::{App, Dialog};
pub use events::{Action, Event, EventHandler};

use crate::usb::DeviceWatcher;
use anyhow::Result;
use common::{EventBus, UsbHost};
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::time::Duration;
use tracing::{error, info, warn};

/// Terminal wrapper for setup/teardown
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    /// Create and initialize the terminal
    pub fn new() -> Result<Self> {
        let backend = CrosstermBackend::new(io::stdout());
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }

    /// Enter TUI mode (raw mode, alternate screen)
    pub fn enter(&mut self) -> Result<()> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        self.terminal.hide_cursor()?;
        self.terminal.clear()?;
        Ok(())
    }

    /// Exit TUI mode (restore terminal state)
    pub fn exit(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    /// Draw the UI
    pub fn draw(&mut self, app: &App) -> Result<()> {
        self.terminal.draw(|frame| {
            ui::render(frame, app);
        })?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        // Best effort cleanup
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Run the TUI application
///
/// Blocks until the user quits or the terminal event stream ends.
pub async fn run<H: UsbHost>(
    watcher: &mut DeviceWatcher<H>,
    bus: &EventBus,
    tick_rate: Duration,
) -> Result<()> {
    let mut tui = Tui::new()?;
    tui.enter()?;

    let mut app = App::new(watcher.subscribe());
    let mut events = EventHandler::new(tick_rate);

    loop {
        app.sync_devices();

        if let Err(e) = tui.draw(&app) {
            error!("Failed to draw UI: {:#}", e);
            break;
        }

        tokio::select! {
            // Terminal events (keyboard, resize, tick)
            event = events.next() => {
                match event {
                    Some(Event::Key(key)) => {
                        app.handle_action(Action::from(key));
                        if app.take_refresh_request() {
                            info!("Manual refresh");
                            watcher.refresh();
                        }
                    }
                    Some(Event::Resize(_, _)) => {
                        // Terminal resize is handled automatically by ratatui
                    }
                    Some(Event::Tick) => {
                        // Redraw so the "last refresh" timer advances
                    }
                    None => {
                        // Event channel closed
                        break;
                    }
                }
            }

            // Host events (permission results, hot-plug)
            host_event = bus.recv() => {
                match host_event {
                    Ok(event) => {
                        watcher.handle_event(event);
                    }
                    Err(e) => {
                        warn!("Host event bus closed: {:#}", e);
                        break;
                    }
                }
            }
        }

        if app.should_quit() {
            break;
        }
    }

    tui.exit()?;

    Ok(())
}
