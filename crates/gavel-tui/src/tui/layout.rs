// Screen layout.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Live Banner (5 rows)                              |
// +-------------------------+------------------------+
// | Main Panel (65%)        | Team Purses (35%)      |
// +-------------------------+------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Connection, auction id, increment, last message.
    pub status_bar: Rect,
    /// Player on the block, bid, leader, status.
    pub live_banner: Rect,
    /// Queue / pool / team detail, by tab.
    pub main_panel: Rect,
    /// Compact purse table.
    pub sidebar: Rect,
    /// Key hints.
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(5),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(vertical[2]);

    AppLayout {
        status_bar: vertical[0],
        live_banner: vertical[1],
        main_panel: horizontal[0],
        sidebar: horizontal[1],
        help_bar: vertical[3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zones_have_area() {
        let layout = build_layout(Rect::new(0, 0, 120, 40));
        for (name, rect) in [
            ("status_bar", layout.status_bar),
            ("live_banner", layout.live_banner),
            ("main_panel", layout.main_panel),
            ("sidebar", layout.sidebar),
            ("help_bar", layout.help_bar),
        ] {
            assert!(rect.width > 0 && rect.height > 0, "{name} has zero area: {rect:?}");
        }
    }

    #[test]
    fn fixed_rows_keep_their_height() {
        let layout = build_layout(Rect::new(0, 0, 120, 40));
        assert_eq!(layout.status_bar.height, 1);
        assert_eq!(layout.live_banner.height, 5);
        assert_eq!(layout.help_bar.height, 1);
        assert_eq!(layout.main_panel.height, 40 - 7);
    }

    #[test]
    fn main_panel_is_wider_than_sidebar() {
        let layout = build_layout(Rect::new(0, 0, 100, 30));
        assert!(layout.main_panel.width > layout.sidebar.width);
        assert_eq!(layout.main_panel.width + layout.sidebar.width, 100);
    }
}
