// TUI widget modules for each console panel.

pub mod live_banner;
pub mod players;
pub mod quit_confirm;
pub mod status_bar;
pub mod teams;

use ratatui::style::Color;

use gavel_core::model::Amount;

/// Format an amount in the auction currency, e.g. "120L".
pub fn format_amount(value: Amount) -> String {
    format!("{value}L")
}

/// Terminal color for a team's "#rrggbb" color, white when absent or malformed.
pub fn team_color(hex: Option<&str>) -> Color {
    hex.and_then(parse_hex).unwrap_or(Color::White)
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}
