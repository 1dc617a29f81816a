// Terminal console: viewer and auctioneer screens.
//
// The console owns a `ViewState` holding the latest `AuctionView` pushed by
// the app loop plus purely local UI state (tab, selection, filters). Updates
// are applied as they arrive; the screen is redrawn at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use ratatui::Frame;

use gavel_app::messages::{AuctionView, ConnectionStatus, SaleOutcome, UiUpdate, UserCommand};
use gavel_core::model::Player;
use gavel_core::views::{filter_pool, PoolFilter};

use layout::build_layout;

/// How long a SOLD/UNSOLD banner stays up.
pub const CELEBRATION_TIME: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Read-only spectator screen.
    Viewer,
    /// Auctioneer console; keys submit actions.
    Console,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabId {
    Queue,
    Pool,
    Teams,
}

impl TabId {
    pub fn next(&self) -> Self {
        match self {
            TabId::Queue => TabId::Pool,
            TabId::Pool => TabId::Teams,
            TabId::Teams => TabId::Queue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Notice(String),
    Error(String),
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

pub struct ViewState {
    pub mode: Mode,
    /// Latest view from the app loop; `None` before the first one.
    pub view: Option<AuctionView>,
    pub connection_status: ConnectionStatus,
    pub active_tab: TabId,
    /// Row index into `selectable_players()`.
    pub selected: usize,
    pub pool_filter: PoolFilter,
    pub category_filter: Option<String>,
    pub filter_text: String,
    pub filter_mode: bool,
    pub celebration: Option<(SaleOutcome, Instant)>,
    pub message: Option<StatusMessage>,
    pub confirm_quit: bool,
    /// Standings row the `b` key bids for.
    pub team_cursor: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState::new(Mode::Viewer)
    }
}

impl ViewState {
    pub fn new(mode: Mode) -> Self {
        ViewState {
            mode,
            view: None,
            connection_status: ConnectionStatus::Connecting,
            active_tab: TabId::Queue,
            selected: 0,
            pool_filter: PoolFilter::default(),
            category_filter: None,
            filter_text: String::new(),
            filter_mode: false,
            celebration: None,
            message: None,
            confirm_quit: false,
            team_cursor: 0,
        }
    }

    /// Players listed on the active tab, in display order. The queue tab
    /// lists queued players by category, then unsold ones for re-auction.
    pub fn selectable_players(&self) -> Vec<&Player> {
        let Some(view) = self.view.as_ref() else {
            return Vec::new();
        };
        match self.active_tab {
            TabId::Queue => view
                .derived
                .queue
                .iter()
                .flat_map(|g| g.players.iter())
                .chain(view.derived.partitions.unsold.iter())
                .collect(),
            TabId::Pool => {
                let needle = self.filter_text.trim().to_lowercase();
                filter_pool(&view.players, self.pool_filter, self.category_filter.as_deref())
                    .into_iter()
                    .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
                    .collect()
            }
            TabId::Teams => Vec::new(),
        }
    }

    pub fn selected_player(&self) -> Option<&Player> {
        self.selectable_players().get(self.selected).copied()
    }

    /// Keep the selection inside the current list.
    pub fn clamp_selection(&mut self) {
        let len = self.selectable_players().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    /// Cycle the category filter through the categories seen in the pool.
    pub fn cycle_category(&mut self) {
        let categories = self
            .view
            .as_ref()
            .map(|v| v.derived.categories.clone())
            .unwrap_or_default();
        self.category_filter = match &self.category_filter {
            None => categories.first().cloned(),
            Some(current) => categories
                .iter()
                .position(|c| c == current)
                .and_then(|i| categories.get(i + 1))
                .cloned(),
        };
        self.selected = 0;
    }

    /// Team id bound to bid key `n` (1-based), in standings order.
    pub fn team_for_key(&self, n: usize) -> Option<String> {
        let view = self.view.as_ref()?;
        n.checked_sub(1)
            .and_then(|i| view.derived.standings.get(i))
            .map(|s| s.team_id.clone())
    }

    fn team_count(&self) -> usize {
        self.view.as_ref().map_or(0, |v| v.derived.standings.len())
    }

    /// Move the team cursor by `delta` rows, staying inside the standings.
    pub fn move_team_cursor(&mut self, delta: isize) {
        let last = self.team_count().saturating_sub(1);
        self.team_cursor = self.team_cursor.saturating_add_signed(delta).min(last);
    }

    /// Team id under the team cursor.
    pub fn cursor_team(&self) -> Option<String> {
        self.team_for_key(self.team_cursor + 1)
    }

    pub fn expire_celebration(&mut self, now: Instant) {
        if let Some((_, shown_at)) = &self.celebration {
            if now.duration_since(*shown_at) >= CELEBRATION_TIME {
                self.celebration = None;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::ConnectionStatus(status) => {
            state.connection_status = status;
        }
        UiUpdate::View(view) => {
            state.view = Some(*view);
            state.clamp_selection();
            state.move_team_cursor(0);
        }
        UiUpdate::Outcome(outcome) => {
            state.celebration = Some((outcome, Instant::now()));
        }
        UiUpdate::Notice(text) => {
            state.message = Some(StatusMessage::Notice(text));
        }
        UiUpdate::Error(text) => {
            state.message = Some(StatusMessage::Error(text));
        }
    }
}

// ---------------------------------------------------------------------------
// Render
// ---------------------------------------------------------------------------

pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::live_banner::render(frame, layout.live_banner, state);
    match state.active_tab {
        TabId::Teams => widgets::teams::render(frame, layout.main_panel, state, true),
        _ => widgets::players::render(frame, layout.main_panel, state),
    }
    widgets::teams::render(frame, layout.sidebar, state, false);
    widgets::status_bar::render_help(frame, layout.help_bar, state);

    if state.confirm_quit {
        widgets::quit_confirm::render(frame, frame.area());
    }
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the console until the operator quits or the app loop goes away.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
    mode: Mode,
) -> anyhow::Result<()> {
    // 1. Initialize terminal
    let mut terminal = ratatui::init();

    // 2. Restore the terminal if anything panics
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    // 3. Local state, input stream and render tick
    let mut view_state = ViewState::new(mode);
    let mut event_stream = EventStream::new();
    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // 4. Main loop
    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => apply_ui_update(&mut view_state, update),
                    None => break,
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break;
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }

            _ = render_tick.tick() => {
                view_state.expire_celebration(Instant::now());
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    // 5. Restore terminal
    ratatui::restore();

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use gavel_core::model::{AuctionStatus, LiveAuctionState, SquadEntry, Team};
    use gavel_core::views::DerivedViews;

    pub(crate) fn player(id: &str, category: &str) -> Player {
        Player {
            id: id.into(),
            name: format!("Player {id}"),
            role: "Bowler".into(),
            category: Some(category.into()),
            base_price: 20,
            is_sold: false,
            is_unsold: false,
            sold_to: None,
            sold_price: None,
        }
    }

    pub(crate) fn sample_view() -> AuctionView {
        let mut sold = player("s1", "Set 1");
        sold.is_sold = true;
        sold.sold_to = Some("t1".into());
        sold.sold_price = Some(150);
        let mut unsold = player("u1", "Set 2");
        unsold.is_unsold = true;
        let players = vec![
            player("q1", "Set 1"),
            player("q2", "Marquee"),
            sold,
            unsold,
        ];
        let teams = vec![
            Team {
                id: "t1".into(),
                name: "Strikers".into(),
                budget: 1000,
                spent: 150,
                color: Some("#ff0000".into()),
                players: vec![SquadEntry::Id("s1".into())],
            },
            Team {
                id: "t2".into(),
                name: "Titans".into(),
                budget: 1000,
                spent: 0,
                color: None,
                players: vec![],
            },
        ];
        let live = LiveAuctionState {
            current_bid: 40,
            leading_team_id: Some("t2".into()),
            current_player_id: Some("q1".into()),
            status: AuctionStatus::Active,
        };
        AuctionView {
            auction_id: "A".into(),
            loaded: true,
            derived: DerivedViews::build(&teams, &players, None),
            current_player: Some(players[0].clone()),
            leading_team: Some("Titans".into()),
            players,
            live,
            increment: 10,
            next_bid: 50,
            bid_pending: false,
        }
    }

    #[test]
    fn queue_lists_categories_in_order_then_unsold() {
        let mut state = ViewState::new(Mode::Console);
        apply_ui_update(&mut state, UiUpdate::View(Box::new(sample_view())));
        let ids: Vec<&str> = state.selectable_players().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["q2", "q1", "u1"]);
    }

    #[test]
    fn pool_filters_by_status_category_and_text() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::View(Box::new(sample_view())));
        state.active_tab = TabId::Pool;

        state.pool_filter = PoolFilter::Sold;
        assert_eq!(state.selectable_players().len(), 1);

        state.pool_filter = PoolFilter::All;
        state.category_filter = Some("Set 1".into());
        assert_eq!(state.selectable_players().len(), 2);

        state.filter_text = "q1".into();
        assert_eq!(state.selected_player().map(|p| p.id.as_str()), Some("q1"));
    }

    #[test]
    fn category_filter_cycles_through_seen_categories() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::View(Box::new(sample_view())));
        state.cycle_category();
        assert_eq!(state.category_filter.as_deref(), Some("Set 1"));
        state.cycle_category();
        assert_eq!(state.category_filter.as_deref(), Some("Marquee"));
        state.cycle_category();
        assert_eq!(state.category_filter.as_deref(), Some("Set 2"));
        state.cycle_category();
        assert_eq!(state.category_filter, None);
    }

    #[test]
    fn selection_is_clamped_when_list_shrinks() {
        let mut state = ViewState::new(Mode::Console);
        apply_ui_update(&mut state, UiUpdate::View(Box::new(sample_view())));
        state.selected = 2;
        let mut smaller = sample_view();
        smaller.derived.partitions.unsold.clear();
        apply_ui_update(&mut state, UiUpdate::View(Box::new(smaller)));
        assert_eq!(state.selected, 1);
    }

    #[test]
    fn bid_keys_follow_standings_order() {
        let mut state = ViewState::new(Mode::Console);
        assert_eq!(state.team_for_key(1), None);
        apply_ui_update(&mut state, UiUpdate::View(Box::new(sample_view())));
        assert_eq!(state.team_for_key(1).as_deref(), Some("t1"));
        assert_eq!(state.team_for_key(2).as_deref(), Some("t2"));
        assert_eq!(state.team_for_key(0), None);
        assert_eq!(state.team_for_key(3), None);
    }

    pub(crate) fn view_with_teams(count: usize) -> AuctionView {
        let teams: Vec<Team> = (1..=count)
            .map(|i| Team {
                id: format!("t{i}"),
                name: format!("Team {i:02}"),
                budget: 1000,
                spent: 0,
                color: None,
                players: vec![],
            })
            .collect();
        let mut view = sample_view();
        view.derived = DerivedViews::build(&teams, &view.players, None);
        view
    }

    #[test]
    fn team_cursor_reaches_every_team_and_stays_in_range() {
        let mut state = ViewState::new(Mode::Console);
        state.move_team_cursor(1);
        assert_eq!(state.team_cursor, 0);
        assert_eq!(state.cursor_team(), None);

        apply_ui_update(&mut state, UiUpdate::View(Box::new(view_with_teams(12))));
        assert_eq!(state.cursor_team().as_deref(), Some("t1"));
        state.move_team_cursor(-1);
        assert_eq!(state.team_cursor, 0);
        state.move_team_cursor(11);
        assert_eq!(state.cursor_team().as_deref(), Some("t12"));
        state.move_team_cursor(5);
        assert_eq!(state.cursor_team().as_deref(), Some("t12"));

        apply_ui_update(&mut state, UiUpdate::View(Box::new(view_with_teams(3))));
        assert_eq!(state.cursor_team().as_deref(), Some("t3"));
    }

    #[test]
    fn celebration_expires() {
        let mut state = ViewState::default();
        apply_ui_update(
            &mut state,
            UiUpdate::Outcome(SaleOutcome {
                status: AuctionStatus::Sold,
                player_name: Some("Player q1".into()),
                team_name: Some("Titans".into()),
                amount: 40,
            }),
        );
        let shown_at = state.celebration.as_ref().unwrap().1;
        state.expire_celebration(shown_at + Duration::from_secs(1));
        assert!(state.celebration.is_some());
        state.expire_celebration(shown_at + CELEBRATION_TIME);
        assert!(state.celebration.is_none());
    }

    #[test]
    fn errors_and_notices_replace_each_other() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::Error("a bid is already pending".into()));
        assert_eq!(
            state.message,
            Some(StatusMessage::Error("a bid is already pending".into()))
        );
        apply_ui_update(&mut state, UiUpdate::Notice("reloaded".into()));
        assert_eq!(state.message, Some(StatusMessage::Notice("reloaded".into())));
    }

    #[test]
    fn full_frame_renders_at_small_and_large_sizes() {
        for (w, h) in [(80, 24), (160, 50)] {
            let backend = ratatui::backend::TestBackend::new(w, h);
            let mut terminal = ratatui::Terminal::new(backend).unwrap();
            let mut state = ViewState::new(Mode::Console);
            apply_ui_update(&mut state, UiUpdate::View(Box::new(sample_view())));
            terminal.draw(|frame| render_frame(frame, &state)).unwrap();
            state.active_tab = TabId::Teams;
            terminal.draw(|frame| render_frame(frame, &state)).unwrap();
            state.confirm_quit = true;
            terminal.draw(|frame| render_frame(frame, &state)).unwrap();
        }
    }
}
