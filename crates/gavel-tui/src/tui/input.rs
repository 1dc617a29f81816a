// Keyboard input handling and command dispatch.
//
// Translates key events into `UserCommand`s for the app loop, or into local
// `ViewState` changes (tabs, selection, filters). Action keys only work in
// console mode.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use gavel_app::messages::UserCommand;
use gavel_core::model::Disposition;

use super::{Mode, TabId, ViewState};

/// Handle a key press. Returns a command to forward, or `None` when the key
/// was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    if view_state.filter_mode {
        handle_filter_mode(key_event, view_state);
        return None;
    }

    match key_event.code {
        KeyCode::Tab => {
            view_state.active_tab = view_state.active_tab.next();
            view_state.selected = 0;
            None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            view_state.selected = view_state.selected.saturating_sub(1);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view_state.selected += 1;
            view_state.clamp_selection();
            None
        }
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }
        KeyCode::Char('l') => Some(UserCommand::Reload),

        // Pool filters
        KeyCode::Char('f') if view_state.active_tab == TabId::Pool => {
            view_state.pool_filter = view_state.pool_filter.next();
            view_state.selected = 0;
            None
        }
        KeyCode::Char('c') if view_state.active_tab == TabId::Pool => {
            view_state.cycle_category();
            None
        }
        KeyCode::Char('/') if view_state.active_tab == TabId::Pool => {
            view_state.filter_mode = true;
            None
        }
        KeyCode::Esc => {
            view_state.filter_text.clear();
            view_state.category_filter = None;
            view_state.message = None;
            view_state.selected = 0;
            None
        }

        _ if view_state.mode == Mode::Console => handle_console_key(key_event, view_state),
        _ => None,
    }
}

fn handle_console_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Enter => view_state
            .selected_player()
            .map(|p| UserCommand::StartPlayer(p.id.clone())),
        KeyCode::Char('r') => random_category(view_state)
            .map(|category| UserCommand::StartRandom { category }),
        KeyCode::Char('R') => Some(UserCommand::StartRandomUnsold),
        KeyCode::Char(c @ '1'..='9') => {
            let n = c.to_digit(10).map(|d| d as usize)?;
            view_state.team_for_key(n).map(UserCommand::PlaceBid)
        }
        KeyCode::Char('[') => {
            view_state.move_team_cursor(-1);
            None
        }
        KeyCode::Char(']') => {
            view_state.move_team_cursor(1);
            None
        }
        KeyCode::Char('b') => view_state.cursor_team().map(UserCommand::PlaceBid),
        KeyCode::Char('u') => Some(UserCommand::UndoBid),
        KeyCode::Char('s') => Some(UserCommand::Sell),
        KeyCode::Char('x') => Some(UserCommand::Unsell),
        KeyCode::Char('p') => Some(UserCommand::TogglePause),
        KeyCode::Char('z') => Some(UserCommand::ResetRound),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(UserCommand::AdjustIncrement(1)),
        KeyCode::Char('-') => Some(UserCommand::AdjustIncrement(-1)),
        KeyCode::Char('d') => Some(UserCommand::Refresh),
        _ => None,
    }
}

/// Category for a random pick: the selected queued player's, else the
/// first non-empty queue group.
fn random_category(view_state: &ViewState) -> Option<String> {
    if let Some(p) = view_state.selected_player() {
        if p.disposition() == Disposition::Queued {
            return Some(p.category_label().to_string());
        }
    }
    view_state
        .view
        .as_ref()?
        .derived
        .queue
        .first()
        .map(|g| g.category.clone())
}

fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') => Some(UserCommand::Quit),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

fn handle_filter_mode(key_event: KeyEvent, view_state: &mut ViewState) {
    match key_event.code {
        KeyCode::Esc => {
            view_state.filter_mode = false;
            view_state.filter_text.clear();
        }
        KeyCode::Enter => view_state.filter_mode = false,
        KeyCode::Backspace => {
            view_state.filter_text.pop();
        }
        KeyCode::Char(c) => view_state.filter_text.push(c),
        _ => {}
    }
    view_state.selected = 0;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::apply_ui_update;
    use crate::tui::tests::{sample_view, view_with_teams};
    use crossterm::event::KeyEventState;
    use gavel_app::messages::UiUpdate;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn console() -> ViewState {
        let mut state = ViewState::new(Mode::Console);
        apply_ui_update(&mut state, UiUpdate::View(Box::new(sample_view())));
        state
    }

    #[test]
    fn ctrl_c_quits_from_any_mode() {
        let mut state = console();
        state.filter_mode = true;
        let ev = KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..key(KeyCode::Char('c'))
        };
        assert_eq!(handle_key(ev, &mut state), Some(UserCommand::Quit));
    }

    #[test]
    fn q_asks_for_confirmation() {
        let mut state = console();
        assert_eq!(handle_key(key(KeyCode::Char('q')), &mut state), None);
        assert!(state.confirm_quit);
        assert_eq!(handle_key(key(KeyCode::Char('s')), &mut state), None);
        assert_eq!(handle_key(key(KeyCode::Char('n')), &mut state), None);
        assert!(!state.confirm_quit);
        handle_key(key(KeyCode::Char('q')), &mut state);
        assert_eq!(handle_key(key(KeyCode::Char('y')), &mut state), Some(UserCommand::Quit));
    }

    #[test]
    fn number_keys_bid_for_teams() {
        let mut state = console();
        assert_eq!(
            handle_key(key(KeyCode::Char('2')), &mut state),
            Some(UserCommand::PlaceBid("t2".into()))
        );
        assert_eq!(handle_key(key(KeyCode::Char('9')), &mut state), None);
    }

    #[test]
    fn enter_starts_selected_player() {
        let mut state = console();
        handle_key(key(KeyCode::Down), &mut state);
        assert_eq!(
            handle_key(key(KeyCode::Enter), &mut state),
            Some(UserCommand::StartPlayer("q1".into()))
        );
    }

    #[test]
    fn random_pick_uses_selected_category() {
        let mut state = console();
        assert_eq!(
            handle_key(key(KeyCode::Char('r')), &mut state),
            Some(UserCommand::StartRandom {
                category: "Marquee".into()
            })
        );
        // Unsold row selected: fall back to the first queue group.
        state.selected = 2;
        assert_eq!(
            handle_key(key(KeyCode::Char('r')), &mut state),
            Some(UserCommand::StartRandom {
                category: "Marquee".into()
            })
        );
        assert_eq!(
            handle_key(key(KeyCode::Char('R')), &mut state),
            Some(UserCommand::StartRandomUnsold)
        );
    }

    #[test]
    fn round_control_keys() {
        let mut state = console();
        let cases = [
            ('u', UserCommand::UndoBid),
            ('s', UserCommand::Sell),
            ('x', UserCommand::Unsell),
            ('p', UserCommand::TogglePause),
            ('z', UserCommand::ResetRound),
            ('+', UserCommand::AdjustIncrement(1)),
            ('-', UserCommand::AdjustIncrement(-1)),
            ('d', UserCommand::Refresh),
            ('l', UserCommand::Reload),
        ];
        for (c, expected) in cases {
            assert_eq!(handle_key(key(KeyCode::Char(c)), &mut state), Some(expected));
        }
    }

    #[test]
    fn viewer_cannot_submit_actions() {
        let mut state = ViewState::new(Mode::Viewer);
        apply_ui_update(&mut state, UiUpdate::View(Box::new(sample_view())));
        for c in ['1', 's', 'u', 'p', 'r'] {
            assert_eq!(handle_key(key(KeyCode::Char(c)), &mut state), None);
        }
        assert_eq!(handle_key(key(KeyCode::Enter), &mut state), None);
    }

    #[test]
    fn pool_search_captures_text() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::View(Box::new(sample_view())));
        handle_key(key(KeyCode::Tab), &mut state);
        assert_eq!(state.active_tab, TabId::Pool);
        handle_key(key(KeyCode::Char('/')), &mut state);
        for c in "q2".chars() {
            handle_key(key(KeyCode::Char(c)), &mut state);
        }
        handle_key(key(KeyCode::Enter), &mut state);
        assert!(!state.filter_mode);
        assert_eq!(state.filter_text, "q2");
        assert_eq!(state.selected_player().map(|p| p.id.as_str()), Some("q2"));
    }

    #[test]
    fn pool_filter_key_cycles_status() {
        let mut state = ViewState::default();
        state.active_tab = TabId::Pool;
        handle_key(key(KeyCode::Char('f')), &mut state);
        assert_eq!(state.pool_filter, gavel_core::views::PoolFilter::Sold);
    }

    #[test]
    fn release_events_are_ignored() {
        let mut state = console();
        let ev = KeyEvent {
            kind: KeyEventKind::Release,
            ..key(KeyCode::Char('s'))
        };
        assert_eq!(handle_key(ev, &mut state), None);
    }

    #[test]
    fn team_cursor_bids_past_the_ninth_team() {
        let mut state = ViewState::new(Mode::Console);
        apply_ui_update(&mut state, UiUpdate::View(Box::new(view_with_teams(12))));

        for _ in 0..11 {
            assert_eq!(handle_key(key(KeyCode::Char(']')), &mut state), None);
        }
        assert_eq!(
            handle_key(key(KeyCode::Char('b')), &mut state),
            Some(UserCommand::PlaceBid("t12".into()))
        );
        handle_key(key(KeyCode::Char('[')), &mut state);
        assert_eq!(
            handle_key(key(KeyCode::Char('b')), &mut state),
            Some(UserCommand::PlaceBid("t11".into()))
        );
        assert_eq!(
            handle_key(key(KeyCode::Char('9')), &mut state),
            Some(UserCommand::PlaceBid("t9".into()))
        );
    }

    #[test]
    fn viewer_cannot_bid_with_team_cursor() {
        let mut state = ViewState::new(Mode::Viewer);
        apply_ui_update(&mut state, UiUpdate::View(Box::new(view_with_teams(12))));
        handle_key(key(KeyCode::Char(']')), &mut state);
        assert_eq!(state.team_cursor, 0);
        assert_eq!(handle_key(key(KeyCode::Char('b')), &mut state), None);
    }
}
