//! TUI rendering with ratatui
//!
//! Lays out the status bar, the device table and the help bar, and draws
//! the help dialog on top when it is open.

use common::UsbDeviceInfo;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use std::time::Duration;

use super::app::{App, Dialog};

/// Screen title
const TITLE: &str = " Connected USB Devices ";

/// Main render function
///
/// Renders the complete UI based on current application state.
pub fn render(frame: &mut Frame, app: &App) {
    // Main layout: status bar (top), device list (center), help bar (bottom)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status bar
            Constraint::Min(5),    // Device list
            Constraint::Length(3), // Help bar
        ])
        .split(frame.area());

    render_status_bar(frame, app, chunks[0]);
    render_device_list(frame, app, chunks[1]);
    render_help_bar(frame, chunks[2]);

    match app.dialog() {
        Dialog::None => {}
        Dialog::Help => render_help_dialog(frame),
    }
}

/// Render the status bar (top panel)
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status_text = vec![
        Span::styled("Devices: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{}", app.devices().len()),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw("  |  "),
        Span::styled("Refreshes: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{}", app.updates_seen()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  |  "),
        Span::styled("Last refresh: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{} ago", format_duration(app.since_last_update())),
            Style::default().fg(Color::Green),
        ),
    ];

    let status = Paragraph::new(Line::from(status_text))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(TITLE)
                .title_alignment(Alignment::Center)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .alignment(Alignment::Center);

    frame.render_widget(status, area);
}

/// Render the device list (center panel)
fn render_device_list(frame: &mut Frame, app: &App, area: Rect) {
    let devices = app.devices();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" USB Devices ({}) ", devices.len()))
        .border_style(Style::default().fg(Color::Blue));

    if devices.is_empty() {
        let empty = Paragraph::new("No USB devices found")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let header_cells = ["Device Name", "Vendor ID", "Product ID", "VID:PID"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = devices.iter().map(create_device_row).collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(24),    // Device Name
            Constraint::Length(10), // Vendor ID
            Constraint::Length(11), // Product ID
            Constraint::Length(10), // VID:PID
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = TableState::default();
    state.select(Some(app.selected_index()));

    frame.render_stateful_widget(table, area, &mut state);
}

/// Create a table row for a device
fn create_device_row(device: &UsbDeviceInfo) -> Row<'static> {
    Row::new(vec![
        Cell::from(device.name.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(device.vendor_id.to_string()),
        Cell::from(device.product_id.to_string()),
        Cell::from(format!("{:04x}:{:04x}", device.vendor_id, device.product_id))
            .style(Style::default().fg(Color::Cyan)),
    ])
}

fn key_span(key: &'static str) -> Span<'static> {
    Span::styled(
        key,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

/// Render the help bar (bottom panel)
fn render_help_bar(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        key_span("q"),
        Span::raw(" Quit  "),
        key_span("j/k"),
        Span::raw(" Navigate  "),
        key_span("r"),
        Span::raw(" Refresh USB Devices  "),
        key_span("?"),
        Span::raw(" Help"),
    ];

    let help = Paragraph::new(Line::from(help_text))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .alignment(Alignment::Center);

    frame.render_widget(help, area);
}

/// Render the help dialog
fn render_help_dialog(frame: &mut Frame) {
    let area = centered_rect(60, 60, frame.area());

    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )])
    };
    let binding = |keys: &'static str, text: &'static str| {
        Line::from(vec![
            Span::styled(keys, Style::default().fg(Color::Cyan)),
            Span::raw(text),
        ])
    };

    let help_content = vec![
        section("Navigation"),
        Line::from(""),
        binding("  Up / k       ", "Move selection up"),
        binding("  Down / j     ", "Move selection down"),
        Line::from(""),
        section("Actions"),
        Line::from(""),
        binding("  r / F5       ", "Refresh device list"),
        Line::from(""),
        section("General"),
        Line::from(""),
        binding("  ?            ", "Show this help"),
        binding("  Esc          ", "Close dialog"),
        binding("  q / Ctrl+C   ", "Quit application"),
        Line::from(""),
        Line::from(Span::styled(
            "The list refreshes on its own when a device is plugged in or removed.",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help_paragraph = Paragraph::new(help_content)
        .block(
            Block::default()
                .title(" Help ")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    // Clear the area first
    frame.render_widget(Clear, area);
    frame.render_widget(help_paragraph, area);
}

/// Helper to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Format duration for display
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
