// Status bar widget: connection, auction id, tabs, last message.
// Also renders the one-line key help at the bottom of the screen.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use gavel_app::messages::ConnectionStatus;

use super::format_amount;
use crate::tui::{Mode, StatusMessage, TabId, ViewState};

/// Render the status bar into the given area.
///
/// Layout: [connection indicator] [auction] [increment] | [tab bar] [message]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = Vec::new();

    let (dot, dot_color) = connection_indicator(state.connection_status);
    spans.push(Span::styled(format!(" {dot} "), Style::default().fg(dot_color)));
    spans.push(Span::styled(
        format!("{} ", state.connection_status.label()),
        Style::default().fg(dot_color).add_modifier(Modifier::BOLD),
    ));

    if let Some(view) = &state.view {
        spans.push(Span::styled(
            format!("Auction {}", view.auction_id),
            Style::default().fg(Color::White),
        ));
        if state.mode == Mode::Console {
            spans.push(Span::styled(
                format!("  +{}", format_amount(view.increment)),
                Style::default().fg(Color::Cyan),
            ));
        }
    }

    spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
    spans.extend(tab_spans(state.active_tab));

    if let Some(message) = &state.message {
        let (text, color) = match message {
            StatusMessage::Notice(text) => (text, Color::Green),
            StatusMessage::Error(text) => (text, Color::Red),
        };
        spans.push(Span::styled(format!(" {text}"), Style::default().fg(color)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Return the connection dot character and its color.
pub fn connection_indicator(status: ConnectionStatus) -> (&'static str, Color) {
    match status {
        ConnectionStatus::Connecting => ("●", Color::Yellow),
        ConnectionStatus::Connected => ("●", Color::Green),
        ConnectionStatus::Disconnected => ("●", Color::Red),
    }
}

/// Tab indicator spans with the active tab highlighted.
pub fn tab_spans(active: TabId) -> Vec<Span<'static>> {
    let tabs = [
        (TabId::Queue, "Queue"),
        (TabId::Pool, "Pool"),
        (TabId::Teams, "Teams"),
    ];

    let mut spans = Vec::new();
    for (tab_id, label) in tabs {
        let style = if tab_id == active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!("[{label}]"), style));
        spans.push(Span::raw(" "));
    }
    spans
}

/// Key hints for the current mode and input state.
pub fn help_text(state: &ViewState) -> &'static str {
    if state.confirm_quit {
        return " y: quit  n: stay";
    }
    if state.filter_mode {
        return " type to search  Enter: keep  Esc: clear";
    }
    match (state.mode, state.active_tab) {
        (Mode::Console, _) => {
            " Enter: start  r/R: random  1-9/[ ] b: bid  u: undo  s: sell  x: unsold  p: pause  z: reset  +/-: step  d: sync  Tab  q"
        }
        (Mode::Viewer, TabId::Pool) => " f: status  c: category  /: search  Esc: clear  Tab: switch  l: reload  q: quit",
        (Mode::Viewer, _) => " Tab: switch  j/k: move  l: reload  q: quit",
    }
}

pub fn render_help(frame: &mut Frame, area: Rect, state: &ViewState) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        help_text(state),
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
