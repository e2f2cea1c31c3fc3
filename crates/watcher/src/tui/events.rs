//! TUI event handling
//!
//! Handles terminal events (keyboard, resize) using crossterm.
//! Provides an async event stream that integrates with tokio.

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc;

/// Terminal event types
#[derive(Debug, Clone)]
pub enum Event {
    /// Keyboard input event
    Key(KeyEvent),
    /// Terminal resize event
    Resize(u16, u16),
    /// Tick event for periodic UI updates
    Tick,
}

/// User actions derived from keyboard input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Quit the application
    Quit,
    /// Move selection up
    Up,
    /// Move selection down
    Down,
    /// Refresh device list
    Refresh,
    /// Show help dialog
    ShowHelp,
    /// Close dialog/popup
    CloseDialog,
    /// No action
    None,
}

impl From<KeyEvent> for Action {
    fn from(key: KeyEvent) -> Self {
        match key.code {
            // Quit
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Esc => Action::CloseDialog,

            // Navigation
            KeyCode::Up | KeyCode::Char('k') => Action::Up,
            KeyCode::Down | KeyCode::Char('j') => Action::Down,

            // Actions
            KeyCode::Char('r') | KeyCode::F(5) => Action::Refresh,
            KeyCode::Char('?') => Action::ShowHelp,

            _ => Action::None,
        }
    }
}

/// Event handler that polls terminal events in a background task
pub struct EventHandler {
    /// Receiver for events
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Create a new event handler
    ///
    /// Spawns a blocking task that polls for terminal events and sends them
    /// through the channel. The task ends when the handler is dropped.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::task::spawn_blocking(move || {
            let mut last_tick = std::time::Instant::now();

            loop {
                // Calculate timeout until next tick
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::ZERO);

                if event::poll(timeout).unwrap_or(false) {
                    let forwarded = match event::read() {
                        // Ignore key release events on some platforms
                        Ok(CrosstermEvent::Key(key))
                            if key.kind == event::KeyEventKind::Press =>
                        {
                            tx.send(Event::Key(key))
                        }
                        Ok(CrosstermEvent::Resize(width, height)) => {
                            tx.send(Event::Resize(width, height))
                        }
                        Ok(_) => Ok(()),
                        Err(_) => break,
                    };
                    if forwarded.is_err() {
                        break;
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = std::time::Instant::now();
                }
            }
        });

        Self { rx }
    }

    /// Receive the next event
    ///
    /// Returns None if the event channel is closed.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_key_quit() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(Action::from(key), Action::Quit);
    }

    #[test]
    fn test_action_ctrl_c_quit() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(Action::from(ctrl_c), Action::Quit);

        let plain_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert_eq!(Action::from(plain_c), Action::None);
    }

    #[test]
    fn test_action_from_key_navigation() {
        let up = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        assert_eq!(Action::from(up), Action::Up);

        let down = KeyEvent::new(KeyCode::Down, KeyModifiers::NONE);
        assert_eq!(Action::from(down), Action::Down);

        let k = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::NONE);
        assert_eq!(Action::from(k), Action::Up);

        let j = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE);
        assert_eq!(Action::from(j), Action::Down);
    }

    #[test]
    fn test_action_refresh_and_help() {
        let r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE);
        assert_eq!(Action::from(r), Action::Refresh);

        let f5 = KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE);
        assert_eq!(Action::from(f5), Action::Refresh);

        let help = KeyEvent::new(KeyCode::Char('?'), KeyModifiers::NONE);
        assert_eq!(Action::from(help), Action::ShowHelp);

        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(Action::from(esc), Action::CloseDialog);
    }
}
