// Console integration tests.
//
// Drive the console through its public API the way a terminal session
// would: apply updates from the app loop, press keys, and render full
// frames into a test backend.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use ratatui::backend::TestBackend;
use ratatui::Terminal;

use gavel_app::messages::{AuctionView, ConnectionStatus, SaleOutcome, UiUpdate, UserCommand};
use gavel_core::model::{AuctionStatus, LiveAuctionState, Player, Team};
use gavel_core::views::DerivedViews;
use gavel_tui::tui::input::handle_key;
use gavel_tui::tui::{apply_ui_update, render_frame, Mode, TabId, ViewState};

// ===========================================================================
// Test helpers
// ===========================================================================

fn player(id: &str, name: &str, category: &str) -> Player {
    Player {
        id: id.into(),
        name: name.into(),
        role: "Batsman".into(),
        category: Some(category.into()),
        base_price: 20,
        is_sold: false,
        is_unsold: false,
        sold_to: None,
        sold_price: None,
    }
}

fn team(id: &str, name: &str) -> Team {
    Team {
        id: id.into(),
        name: name.into(),
        budget: 500,
        spent: 0,
        color: Some("#3b82f6".into()),
        players: vec![],
    }
}

fn view(live: LiveAuctionState) -> AuctionView {
    let players = vec![
        player("p2", "Keeper", "Set 1"),
        player("p1", "Opener", "Marquee"),
    ];
    let teams = vec![team("t1", "Strikers"), team("t2", "Titans")];
    let current_player = live
        .current_player_id
        .as_deref()
        .and_then(|id| players.iter().find(|p| p.id == id))
        .cloned();
    let leading_team = live
        .leading_team_id
        .as_deref()
        .and_then(|id| teams.iter().find(|t| t.id == id))
        .map(|t| t.name.clone());
    AuctionView {
        auction_id: "A".into(),
        loaded: true,
        derived: DerivedViews::build(&teams, &players, None),
        players,
        current_player,
        leading_team,
        live,
        increment: 10,
        next_bid: 20,
        bid_pending: false,
    }
}

fn press(state: &mut ViewState, code: KeyCode) -> Option<UserCommand> {
    handle_key(
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        },
        state,
    )
}

fn screen(state: &ViewState) -> String {
    let mut terminal = Terminal::new(TestBackend::new(110, 30)).unwrap();
    terminal.draw(|frame| render_frame(frame, state)).unwrap();
    terminal
        .backend()
        .buffer()
        .content()
        .iter()
        .map(|c| c.symbol())
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn auctioneer_runs_a_round() {
    let mut state = ViewState::new(Mode::Console);
    apply_ui_update(&mut state, UiUpdate::ConnectionStatus(ConnectionStatus::Connected));
    apply_ui_update(&mut state, UiUpdate::View(Box::new(view(LiveAuctionState::default()))));

    // Marquee is queued ahead of Set 1.
    assert_eq!(
        press(&mut state, KeyCode::Enter),
        Some(UserCommand::StartPlayer("p1".into()))
    );

    let on_block = LiveAuctionState {
        current_bid: 20,
        leading_team_id: None,
        current_player_id: Some("p1".into()),
        status: AuctionStatus::Active,
    };
    apply_ui_update(&mut state, UiUpdate::View(Box::new(view(on_block))));
    assert!(screen(&state).contains("ON THE BLOCK: Opener"));

    assert_eq!(
        press(&mut state, KeyCode::Char('2')),
        Some(UserCommand::PlaceBid("t2".into()))
    );
    assert_eq!(press(&mut state, KeyCode::Char('s')), Some(UserCommand::Sell));

    apply_ui_update(
        &mut state,
        UiUpdate::Outcome(SaleOutcome {
            status: AuctionStatus::Sold,
            player_name: Some("Opener".into()),
            team_name: Some("Titans".into()),
            amount: 20,
        }),
    );
    assert!(screen(&state).contains("SOLD! Opener to Titans for 20L"));
}

#[test]
fn rejected_action_is_shown_in_status_bar() {
    let mut state = ViewState::new(Mode::Console);
    apply_ui_update(&mut state, UiUpdate::View(Box::new(view(LiveAuctionState::default()))));
    apply_ui_update(&mut state, UiUpdate::Error("team cannot afford 600L".into()));
    assert!(screen(&state).contains("team cannot afford 600L"));
}

#[test]
fn viewer_browses_pool_without_sending_actions() {
    let mut state = ViewState::new(Mode::Viewer);
    apply_ui_update(&mut state, UiUpdate::View(Box::new(view(LiveAuctionState::default()))));

    assert_eq!(press(&mut state, KeyCode::Enter), None);
    assert_eq!(press(&mut state, KeyCode::Char('1')), None);

    press(&mut state, KeyCode::Tab);
    assert_eq!(state.active_tab, TabId::Pool);
    press(&mut state, KeyCode::Char('c'));
    assert_eq!(state.category_filter.as_deref(), Some("Set 1"));
    let ids: Vec<&str> = state
        .selectable_players()
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(ids, vec!["p2"]);
    assert!(screen(&state).contains("Player Pool [Open] [Set 1] (1)"));
}

#[test]
fn lost_connection_is_visible() {
    let mut state = ViewState::new(Mode::Viewer);
    apply_ui_update(&mut state, UiUpdate::View(Box::new(view(LiveAuctionState::default()))));
    apply_ui_update(
        &mut state,
        UiUpdate::ConnectionStatus(ConnectionStatus::Disconnected),
    );
    assert!(screen(&state).contains("OFFLINE"));
}

#[test]
fn quit_needs_confirmation() {
    let mut state = ViewState::new(Mode::Console);
    assert_eq!(press(&mut state, KeyCode::Char('q')), None);
    assert!(screen(&state).contains("Leave the auction?"));
    assert_eq!(press(&mut state, KeyCode::Char('y')), Some(UserCommand::Quit));
}
