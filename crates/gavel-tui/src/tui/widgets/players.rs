// Players widget: the nomination queue or the filtered player pool.
//
// Table: #, Name, Role, Category, Base, Status. The selected row is
// highlighted and the player on the block is marked.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Cell, Row, Table, TableState};
use ratatui::Frame;

use gavel_core::model::{Disposition, Player};

use super::format_amount;
use crate::tui::{TabId, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let players = state.selectable_players();
    let on_block = state
        .view
        .as_ref()
        .and_then(|v| v.live.current_player_id.as_deref());

    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from("Name"),
        Cell::from("Role"),
        Cell::from("Category"),
        Cell::from("Base"),
        Cell::from("Status"),
    ])
    .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = players
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let style = if on_block == Some(p.id.as_str()) {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(format!("{}", i + 1)),
                Cell::from(p.name.clone()),
                Cell::from(p.role.clone()),
                Cell::from(p.category_label().to_string()),
                Cell::from(format_amount(p.base_price)),
                Cell::from(status_text(p)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(14),
        Constraint::Length(12),
        Constraint::Length(14),
        Constraint::Length(7),
        Constraint::Length(12),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(build_title(state, players.len())),
        )
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol(">> ");

    let mut table_state = TableState::default();
    if !players.is_empty() {
        table_state.select(Some(state.selected.min(players.len() - 1)));
    }
    frame.render_stateful_widget(table, area, &mut table_state);
}

/// Status column: sale price for sold players, otherwise the disposition.
pub fn status_text(player: &Player) -> String {
    match player.disposition() {
        Disposition::Queued => "Open".to_string(),
        Disposition::Unsold => "Unsold".to_string(),
        Disposition::Sold => match player.sold_price {
            Some(price) => format!("Sold {}", format_amount(price)),
            None => "Sold".to_string(),
        },
    }
}

fn build_title(state: &ViewState, count: usize) -> Line<'static> {
    let mut title = match state.active_tab {
        TabId::Pool => format!("Player Pool [{}]", state.pool_filter.label()),
        _ => "Queue".to_string(),
    };
    if state.active_tab == TabId::Pool {
        if let Some(category) = &state.category_filter {
            title.push_str(&format!(" [{category}]"));
        }
        if !state.filter_text.is_empty() || state.filter_mode {
            title.push_str(&format!(" /{}", state.filter_text));
        }
    }
    title.push_str(&format!(" ({count})"));
    Line::from(title)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
