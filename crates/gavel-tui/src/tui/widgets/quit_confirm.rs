// Quit confirmation overlay.
//
// Centered modal drawn over the main layout while
// `ViewState::confirm_quit` is set.

use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

const DIALOG_WIDTH: u16 = 30;
const DIALOG_HEIGHT: u16 = 3;

pub fn render(frame: &mut Frame, area: Rect) {
    let dialog_area = centered_rect(DIALOG_WIDTH, DIALOG_HEIGHT, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            " Quit? ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));

    let text = Line::from(vec![
        Span::raw(" Leave the auction? ("),
        Span::styled("y", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw("/"),
        Span::styled("n", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        Span::raw(")"),
    ]);

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

/// Centered rectangle of the given size, clamped to `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .split(area);
    let horizontal = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .split(vertical[0]);
    horizontal[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialog_is_centered() {
        let rect = centered_rect(DIALOG_WIDTH, DIALOG_HEIGHT, Rect::new(0, 0, 80, 24));
        assert_eq!(rect.width, DIALOG_WIDTH);
        assert_eq!(rect.height, DIALOG_HEIGHT);
        assert!((rect.x as i32 - 25).abs() <= 1);
    }

    #[test]
    fn dialog_clamps_to_small_area() {
        let rect = centered_rect(DIALOG_WIDTH, DIALOG_HEIGHT, Rect::new(0, 0, 20, 2));
        assert_eq!(rect.width, 20);
        assert_eq!(rect.height, 2);
    }
}
