use chrono::{DateTime, Local, NaiveDateTime};
use ratatui::widgets::{ListState, TableState};

use crate::poll::{Overview, PollMsg};
use crate::source::{
    parse_game_timestamp, ChatMessage, FetchResult, Leaderboard, OnlinePlayer, PlayerList,
    PlayerStats, PlayerStatsSnapshot, RecentActivity, ServerStatus,
};

/// World size in game tiles.
pub const MAP_WIDTH: f64 = 19_800.0;
pub const MAP_HEIGHT: f64 = 15_900.0;
/// Shift applied to player coordinates so markers line up with the map.
pub const MARKER_OFFSET: (f64, f64) = (-150.0, -120.0);

const MIN_ZOOM: f64 = 1.0;
const MAX_ZOOM: f64 = 5.0;
const ZOOM_STEP: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Players,
    Map,
    Chat,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Overview, Tab::Players, Tab::Map, Tab::Chat];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Players => "Players",
            Tab::Map => "Map",
            Tab::Chat => "Chat",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Tab {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Tab {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn searchable(self) -> bool {
        matches!(self, Tab::Players | Tab::Chat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Nothing received yet.
    Loading,
    Live,
    Cached,
    /// Every fetch so far failed.
    Unavailable,
}

/// Latest data for one resource and where it came from.
#[derive(Debug)]
pub struct Feed<T> {
    pub data: Option<T>,
    pub freshness: Freshness,
}

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self {
            data: None,
            freshness: Freshness::Loading,
        }
    }
}

impl<T> Feed<T> {
    /// A result without data leaves the previous data (and its badge) in place.
    /// Returns the error message, if the fetch failed.
    fn apply(&mut self, result: FetchResult<T>) -> Option<String> {
        let live = result.source().is_live();
        let error = result.error().map(String::from);

        match result.into_data() {
            Some(data) => {
                self.data = Some(data);
                self.freshness = if live {
                    Freshness::Live
                } else {
                    Freshness::Cached
                };
            }
            None if self.data.is_none() => self.freshness = Freshness::Unavailable,
            None => {}
        }
        error
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub zoom: f64,
    /// Centre of the visible area in world coordinates.
    pub center: (f64, f64),
    pub show_offline: bool,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            zoom: MIN_ZOOM,
            center: (MAP_WIDTH / 2.0, MAP_HEIGHT / 2.0),
            show_offline: false,
        }
    }
}

impl MapView {
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + ZOOM_STEP).min(MAX_ZOOM);
        self.clamp_center();
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom - ZOOM_STEP).max(MIN_ZOOM);
        self.clamp_center();
    }

    pub fn reset(&mut self) {
        let show_offline = self.show_offline;
        *self = Self {
            show_offline,
            ..Self::default()
        };
    }

    /// Move by a fraction of the visible span.  Positive `dy` moves south.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let (w, h) = self.span();
        self.center.0 += dx * w;
        self.center.1 += dy * h;
        self.clamp_center();
    }

    /// Width and height of the visible area in world units.
    pub fn span(&self) -> (f64, f64) {
        (MAP_WIDTH / self.zoom, MAP_HEIGHT / self.zoom)
    }

    /// Visible world rectangle as `([x_min, x_max], [y_min, y_max])`, y growing south.
    pub fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let (w, h) = self.span();
        (
            [self.center.0 - w / 2.0, self.center.0 + w / 2.0],
            [self.center.1 - h / 2.0, self.center.1 + h / 2.0],
        )
    }

    fn clamp_center(&mut self) {
        let (w, h) = self.span();
        self.center.0 = self.center.0.clamp(w / 2.0, MAP_WIDTH - w / 2.0);
        self.center.1 = self.center.1.clamp(h / 2.0, MAP_HEIGHT - h / 2.0);
    }
}

/// Where a player's marker goes on the map, in world coordinates.
pub fn marker_position(player: &OnlinePlayer) -> Option<(f64, f64)> {
    player
        .position()
        .map(|(x, y)| (x + MARKER_OFFSET.0, y + MARKER_OFFSET.1))
}

#[derive(Debug, Clone, Copy)]
enum Move {
    Next,
    Previous,
    First,
    Last,
}

fn moved(current: Option<usize>, len: usize, m: Move) -> Option<usize> {
    if len == 0 {
        return current;
    }
    Some(match (m, current) {
        (Move::Next, Some(i)) => (i + 1).min(len - 1),
        (Move::Previous, Some(i)) => i.saturating_sub(1),
        (Move::Next | Move::Previous | Move::First, _) => 0,
        (Move::Last, _) => len - 1,
    })
}

pub struct App {
    pub tab: Tab,
    pub server: Feed<ServerStatus>,
    pub online: Feed<PlayerList>,
    pub stats: Feed<PlayerStatsSnapshot>,
    pub leaderboard: Feed<Leaderboard>,
    pub activity: Feed<RecentActivity>,
    pub locations: Feed<PlayerList>,
    pub last_update: Option<DateTime<Local>>,
    pub player_query: String,
    pub chat_query: String,
    /// `None` shows every chat type.
    pub chat_type: Option<String>,
    /// Keys go to the active tab's search box.
    pub searching: bool,
    pub player_state: TableState,
    pub chat_state: ListState,
    pub map: MapView,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Set by input, consumed by the main loop.
    pub refresh_requested: bool,
    /// Last poll status message.
    pub status: String,
    /// Latest failure of each polling loop, cleared by its next clean round.
    overview_error: Option<String>,
    map_error: Option<String>,
}

impl App {
    pub fn new() -> Self {
        Self {
            tab: Tab::Overview,
            server: Feed::default(),
            online: Feed::default(),
            stats: Feed::default(),
            leaderboard: Feed::default(),
            activity: Feed::default(),
            locations: Feed::default(),
            last_update: None,
            player_query: String::new(),
            chat_query: String::new(),
            chat_type: None,
            searching: false,
            player_state: TableState::default(),
            chat_state: ListState::default(),
            map: MapView::default(),
            quit: false,
            refresh_requested: false,
            status: "Starting…".into(),
            overview_error: None,
            map_error: None,
        }
    }

    /// Fold one poll message into the state.
    pub fn apply(&mut self, msg: PollMsg) {
        match msg {
            PollMsg::Overview(overview) => {
                let Overview {
                    status,
                    online,
                    stats,
                    leaderboard,
                    activity,
                } = *overview;
                let errors = [
                    self.server.apply(status),
                    self.online.apply(online),
                    self.stats.apply(stats),
                    self.leaderboard.apply(leaderboard),
                    self.activity.apply(activity),
                ];
                self.overview_error = errors.into_iter().flatten().next();
            }
            PollMsg::Locations(locations) => self.map_error = self.locations.apply(locations),
        }

        self.last_update = Some(Local::now());
        self.status = match self.overview_error.as_ref().or(self.map_error.as_ref()) {
            Some(e) => format!("Error: {e}"),
            None => "Up to date".into(),
        };
        self.clamp_selections();
    }

    /// Badge state for the active tab.
    pub fn freshness(&self) -> Freshness {
        match self.tab {
            Tab::Overview => self.server.freshness,
            Tab::Players => self.stats.freshness,
            Tab::Map => self.locations.freshness,
            Tab::Chat => self.activity.freshness,
        }
    }

    // -- tabs ----------------------------------------------------------------

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.searching = false;
    }

    // -- players -------------------------------------------------------------

    /// Players matching the search, most hours first.
    pub fn visible_players(&self) -> Vec<&PlayerStats> {
        let Some(snapshot) = &self.stats.data else {
            return Vec::new();
        };
        let query = self.player_query.to_lowercase();
        snapshot
            .by_hours()
            .into_iter()
            .filter(|p| query.is_empty() || p.username.to_lowercase().contains(&query))
            .collect()
    }

    pub fn selected_player(&self) -> Option<&PlayerStats> {
        let index = self.player_state.selected()?;
        self.visible_players().into_iter().nth(index)
    }

    // -- chat ----------------------------------------------------------------

    /// Distinct chat types in arrival order.
    pub fn chat_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        if let Some(activity) = &self.activity.data {
            for msg in &activity.chat_messages {
                if !types.contains(&msg.chat_type.as_str()) {
                    types.push(&msg.chat_type);
                }
            }
        }
        types
    }

    /// all → first type → … → last type → all.
    pub fn cycle_chat_type(&mut self) {
        let next = {
            let types = self.chat_types();
            match &self.chat_type {
                None => types.first().map(|t| t.to_string()),
                Some(current) => types
                    .iter()
                    .position(|t| t == current)
                    .and_then(|i| types.get(i + 1))
                    .map(|t| t.to_string()),
            }
        };
        self.chat_type = next;
        self.chat_state.select(None);
    }

    /// Messages matching the type filter and search, newest first.
    /// Messages with unreadable timestamps go last.
    pub fn visible_messages(&self) -> Vec<&ChatMessage> {
        let Some(activity) = &self.activity.data else {
            return Vec::new();
        };
        let query = self.chat_query.to_lowercase();

        let mut messages: Vec<(Option<NaiveDateTime>, &ChatMessage)> = activity
            .chat_messages
            .iter()
            .filter(|m| self.chat_type.as_deref().map_or(true, |t| m.chat_type == t))
            .filter(|m| {
                query.is_empty()
                    || m.author.to_lowercase().contains(&query)
                    || m.text.to_lowercase().contains(&query)
            })
            .map(|m| (parse_game_timestamp(&m.timestamp).ok(), m))
            .collect();

        messages.sort_by(|a, b| b.0.cmp(&a.0));
        messages.into_iter().map(|(_, m)| m).collect()
    }

    // -- map -----------------------------------------------------------------

    /// Players with a known position, hiding offline ones unless toggled on.
    pub fn map_players(&self) -> Vec<&OnlinePlayer> {
        let Some(list) = &self.locations.data else {
            return Vec::new();
        };
        list.players
            .iter()
            .filter(|p| p.online || self.map.show_offline)
            .filter(|p| p.position().is_some())
            .collect()
    }

    // -- search --------------------------------------------------------------

    pub fn start_search(&mut self) {
        if self.tab.searchable() {
            self.searching = true;
        }
    }

    pub fn end_search(&mut self) {
        self.searching = false;
    }

    pub fn query(&self) -> Option<&str> {
        match self.tab {
            Tab::Players => Some(&self.player_query),
            Tab::Chat => Some(&self.chat_query),
            _ => None,
        }
    }

    fn query_mut(&mut self) -> Option<&mut String> {
        match self.tab {
            Tab::Players => Some(&mut self.player_query),
            Tab::Chat => Some(&mut self.chat_query),
            _ => None,
        }
    }

    pub fn push_search(&mut self, c: char) {
        if let Some(query) = self.query_mut() {
            query.push(c);
        }
        self.reset_selection();
    }

    pub fn pop_search(&mut self) {
        if let Some(query) = self.query_mut() {
            query.pop();
        }
        self.reset_selection();
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        self.move_selection(Move::Next);
    }

    pub fn select_previous(&mut self) {
        self.move_selection(Move::Previous);
    }

    pub fn select_first(&mut self) {
        self.move_selection(Move::First);
    }

    pub fn select_last(&mut self) {
        self.move_selection(Move::Last);
    }

    fn move_selection(&mut self, m: Move) {
        match self.tab {
            Tab::Players => {
                let len = self.visible_players().len();
                let next = moved(self.player_state.selected(), len, m);
                self.player_state.select(next);
            }
            Tab::Chat => {
                let len = self.visible_messages().len();
                let next = moved(self.chat_state.selected(), len, m);
                self.chat_state.select(next);
            }
            Tab::Overview | Tab::Map => {}
        }
    }

    fn reset_selection(&mut self) {
        match self.tab {
            Tab::Players => self.player_state.select(None),
            Tab::Chat => self.chat_state.select(None),
            Tab::Overview | Tab::Map => {}
        }
    }

    /// Keep selections inside lists that may have shrunk.
    fn clamp_selections(&mut self) {
        let players = self.visible_players().len();
        if self.player_state.selected().is_some_and(|i| i >= players) {
            self.player_state.select(players.checked_sub(1));
        }
        let messages = self.visible_messages().len();
        if self.chat_state.selected().is_some_and(|i| i >= messages) {
            self.chat_state.select(messages.checked_sub(1));
        }
    }
}
