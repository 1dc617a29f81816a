// Live banner widget: the player on the block and the running bid.
//
// Line 1: "ON THE BLOCK: {player} ({role}, {category}) base {price}L"
// Line 2: "Bid: {bid}L | Leader: {team} | {STATUS}" (+ next bid in console mode)
// Line 3: SOLD/UNSOLD headline while a celebration is showing

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use gavel_app::messages::{AuctionView, SaleOutcome};
use gavel_core::model::AuctionStatus;

use super::format_amount;
use crate::tui::{Mode, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let outcome = state.celebration.as_ref().map(|(o, _)| o);
    let lines = match &state.view {
        Some(view) if view.loaded => build_lines(view, state.mode, outcome),
        _ => vec![dim_line("  Loading auction...")],
    };

    let border = match outcome.map(|o| o.status) {
        Some(AuctionStatus::Sold) => Color::Green,
        Some(_) => Color::Red,
        None => Color::Yellow,
    };
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Live")
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(paragraph, area);
}

fn build_lines(
    view: &AuctionView,
    mode: Mode,
    outcome: Option<&SaleOutcome>,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    match &view.current_player {
        Some(p) => lines.push(Line::from(vec![
            Span::styled(
                " ON THE BLOCK: ",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                p.name.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(
                    " ({}, {}) base {}",
                    p.role,
                    p.category_label(),
                    format_amount(p.base_price)
                ),
                Style::default().fg(Color::Gray),
            ),
        ])),
        None => lines.push(dim_line("  Waiting for the next player...")),
    }

    let mut bid_line = vec![
        Span::styled(" Bid: ", Style::default().fg(Color::Gray)),
        Span::styled(
            format_amount(view.live.current_bid),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" | Leader: ", Style::default().fg(Color::Gray)),
        Span::styled(
            view.leading_team.clone().unwrap_or_else(|| "--".to_string()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(" | ", Style::default().fg(Color::Gray)),
        Span::styled(
            view.live.status.label(),
            Style::default()
                .fg(status_color(view.live.status))
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if mode == Mode::Console {
        bid_line.push(Span::styled(" | Next: ", Style::default().fg(Color::Gray)));
        bid_line.push(Span::styled(
            format_amount(view.next_bid),
            Style::default().fg(Color::White),
        ));
        if view.bid_pending {
            bid_line.push(Span::styled(" (sending)", Style::default().fg(Color::DarkGray)));
        }
    }
    lines.push(Line::from(bid_line));

    if let Some(outcome) = outcome {
        let color = if outcome.status == AuctionStatus::Sold {
            Color::Green
        } else {
            Color::Red
        };
        lines.push(Line::from(Span::styled(
            format!(" {}", outcome.headline()),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
    }

    lines
}

pub fn status_color(status: AuctionStatus) -> Color {
    match status {
        AuctionStatus::Active => Color::Green,
        AuctionStatus::Paused => Color::Yellow,
        AuctionStatus::Sold => Color::Cyan,
        AuctionStatus::Unsold => Color::Red,
        AuctionStatus::Idle => Color::DarkGray,
    }
}

fn dim_line(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(
        text,
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
