// Teams widget: purse table for every team.
//
// Compact (sidebar): Team, Left, Squad.
// Detailed (Teams tab): Team, Budget, Spent, Left, Squad, acquired players.
// The leading team is marked; overspent purses show in red.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Cell, Row, Table, TableState};
use ratatui::Frame;

use gavel_core::views::TeamStanding;

use super::{format_amount, team_color};
use crate::tui::{Mode, ViewState};

/// Render the purse table into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState, detailed: bool) {
    let standings: &[TeamStanding] = state
        .view
        .as_ref()
        .map(|v| v.derived.standings.as_slice())
        .unwrap_or(&[]);
    let leader = state
        .view
        .as_ref()
        .and_then(|v| v.live.leading_team_id.as_deref());

    let mut header_cells = vec![Cell::from("Team")];
    if detailed {
        header_cells.push(Cell::from("Budget"));
        header_cells.push(Cell::from("Spent"));
    }
    header_cells.push(Cell::from("Left"));
    header_cells.push(Cell::from("Squad"));
    if detailed {
        header_cells.push(Cell::from("Players"));
    }
    let header = Row::new(header_cells)
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = if standings.is_empty() {
        vec![Row::new(vec![Cell::from("  No teams yet")])]
    } else {
        standings
            .iter()
            .enumerate()
            .map(|(i, s)| team_row(i, s, leader == Some(s.team_id.as_str()), detailed))
            .collect()
    };

    let widths: Vec<Constraint> = if detailed {
        vec![
            Constraint::Length(20),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Min(10),
        ]
    } else {
        vec![
            Constraint::Min(12),
            Constraint::Length(8),
            Constraint::Length(6),
        ]
    };

    let title = if detailed { "Teams" } else { "Purses" };
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");

    // The bid cursor only exists for the auctioneer.
    let mut table_state = TableState::default();
    if state.mode == Mode::Console && !standings.is_empty() {
        table_state.select(Some(state.team_cursor.min(standings.len() - 1)));
    }
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn team_row(index: usize, s: &TeamStanding, leading: bool, detailed: bool) -> Row<'static> {
    // Bid keys 1-9 map to this order.
    let key = if index < 9 {
        format!("{} ", index + 1)
    } else {
        "  ".to_string()
    };
    let marker = if leading { "*" } else { " " };
    let mut name_style = Style::default().fg(team_color(s.color.as_deref()));
    if leading {
        name_style = name_style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
    }

    let mut cells = vec![Cell::from(Span::styled(
        format!("{key}{marker}{}", s.name),
        name_style,
    ))];
    if detailed {
        cells.push(Cell::from(format_amount(s.budget)));
        cells.push(Cell::from(format_amount(s.spent)));
    }
    cells.push(Cell::from(Span::styled(
        format_amount(s.remaining),
        Style::default().fg(remaining_color(s.remaining)),
    )));
    cells.push(Cell::from(format!("{}", s.squad.len())));
    if detailed {
        cells.push(Cell::from(squad_names(s)));
    }
    Row::new(cells)
}

pub fn remaining_color(remaining: i64) -> Color {
    if remaining < 0 {
        Color::Red
    } else {
        Color::Green
    }
}

/// Acquired players with their prices, e.g. "Opener 120L, Keeper 80L".
pub fn squad_names(s: &TeamStanding) -> String {
    if s.squad.is_empty() {
        return "--".to_string();
    }
    s.squad
        .iter()
        .map(|p| match p.sold_price {
            Some(price) => format!("{} {}", p.name, format_amount(price)),
            None => p.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::apply_ui_update;
    use crate::tui::tests::sample_view;
    use gavel_app::messages::UiUpdate;

    fn rendered(state: &ViewState, detailed: bool) -> String {
        let backend = ratatui::backend::TestBackend::new(100, 10);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), state, detailed))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn remaining_goes_red_when_overspent() {
        assert_eq!(remaining_color(-1), Color::Red);
        assert_eq!(remaining_color(0), Color::Green);
    }

    #[test]
    fn squad_names_list_prices() {
        let view = sample_view();
        let strikers = view.derived.standing("t1").unwrap();
        assert_eq!(squad_names(strikers), "Player s1 150L");
        let titans = view.derived.standing("t2").unwrap();
        assert_eq!(squad_names(titans), "--");
    }

    #[test]
    fn compact_table_marks_leader() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::View(Box::new(sample_view())));
        let text = rendered(&state, false);
        assert!(text.contains("Purses"));
        assert!(text.contains("1  Strikers"));
        assert!(text.contains("2 *Titans"));
        assert!(text.contains("850L"));
    }

    #[test]
    fn console_highlights_cursor_team_beyond_bid_keys() {
        let mut state = ViewState::new(Mode::Console);
        apply_ui_update(
            &mut state,
            UiUpdate::View(Box::new(crate::tui::tests::view_with_teams(12))),
        );
        state.move_team_cursor(10);
        let backend = ratatui::backend::TestBackend::new(60, 8);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), &state, false))
            .unwrap();
        let symbols: Vec<&str> = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        let lines: Vec<String> = symbols.chunks(60).map(|row| row.concat()).collect();
        let row = |name: &str| lines.iter().find(|l| l.contains(name)).cloned().unwrap_or_default();
        assert!(row("Team 11").trim_start_matches('│').starts_with('>'));
        assert!(!row("Team 10").contains('>'));
    }

    #[test]
    fn detailed_table_lists_squads() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::View(Box::new(sample_view())));
        let text = rendered(&state, true);
        assert!(text.contains("Budget"));
        assert!(text.contains("Player s1 150L"));
    }

    #[test]
    fn render_does_not_panic_empty() {
        let state = ViewState::default();
        assert!(rendered(&state, false).contains("No teams yet"));
    }
}
