//! Payload types for each resource.
//!
//! The API and the snapshot files share the same shapes.  Fields that are
//! missing or `null` read as empty/zero so that a partial payload still decodes;
//! anything that is not an object of the expected shape is a decode failure
//! and the fetcher moves on to the next source.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerStatus {
    #[serde(deserialize_with = "nullable")]
    pub online: bool,
    #[serde(deserialize_with = "nullable")]
    pub timestamp: String,
    #[serde(deserialize_with = "nullable")]
    pub current_players: u32,
    #[serde(deserialize_with = "nullable")]
    pub max_players: u32,
    #[serde(deserialize_with = "nullable")]
    pub server_name: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub pvp_enabled: bool,
    #[serde(deserialize_with = "nullable")]
    pub map: String,
}

/// `{"players": [...]}` from the online-players and locations endpoints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerList {
    #[serde(deserialize_with = "nullable")]
    pub players: Vec<OnlinePlayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OnlinePlayer {
    #[serde(deserialize_with = "nullable")]
    pub username: String,
    #[serde(alias = "steamid", deserialize_with = "nullable")]
    pub steam_id: String,
    #[serde(deserialize_with = "nullable")]
    pub connected_at: String,
    #[serde(deserialize_with = "coordinate")]
    pub x: Option<f64>,
    #[serde(deserialize_with = "coordinate")]
    pub y: Option<f64>,
    #[serde(deserialize_with = "coordinate")]
    pub z: Option<f64>,
    #[serde(deserialize_with = "nullable")]
    pub online: bool,
}

impl OnlinePlayer {
    /// World position, if both horizontal coordinates are known.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.x?, self.y?))
    }
}

/// Coordinates arrive as numbers from the locations endpoint and as strings
/// from the online-players list.
fn coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Explicit `null` reads as the field's default, same as a missing key.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `{"players": {"username": {...}}}` from the stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerStatsSnapshot {
    #[serde(deserialize_with = "nullable")]
    pub players: BTreeMap<String, PlayerStats>,
}

impl PlayerStatsSnapshot {
    /// All players, most hours first.
    pub fn by_hours(&self) -> Vec<&PlayerStats> {
        let mut players: Vec<&PlayerStats> = self.players.values().collect();
        players.sort_by(|a, b| b.total_hours.total_cmp(&a.total_hours));
        players
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    #[serde(deserialize_with = "nullable")]
    pub username: String,
    #[serde(deserialize_with = "nullable")]
    pub steam_id: String,
    #[serde(deserialize_with = "nullable")]
    pub total_hours: f64,
    #[serde(deserialize_with = "nullable")]
    pub deaths: u32,
    #[serde(deserialize_with = "nullable")]
    pub skills: BTreeMap<String, u32>,
    #[serde(deserialize_with = "nullable")]
    pub level_ups: Vec<LevelUp>,
    #[serde(deserialize_with = "nullable")]
    pub last_seen: String,
    pub connections: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LevelUp {
    #[serde(deserialize_with = "nullable")]
    pub skill: String,
    #[serde(deserialize_with = "nullable")]
    pub level: String,
    #[serde(deserialize_with = "nullable")]
    pub timestamp: String,
}

/// Hours leaderboard.  Older snapshots call the list `leaderboard`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Leaderboard {
    pub hours: Option<Vec<LeaderboardEntry>>,
    pub leaderboard: Option<Vec<LeaderboardEntry>>,
}

impl Leaderboard {
    pub fn entries(&self) -> &[LeaderboardEntry] {
        self.hours
            .as_deref()
            .or(self.leaderboard.as_deref())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LeaderboardEntry {
    #[serde(deserialize_with = "nullable")]
    pub username: String,
    #[serde(deserialize_with = "nullable")]
    pub hours: f64,
    #[serde(deserialize_with = "nullable")]
    pub deaths: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecentActivity {
    #[serde(deserialize_with = "nullable")]
    pub chat_messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    #[serde(deserialize_with = "nullable")]
    pub timestamp: String,
    #[serde(deserialize_with = "nullable")]
    pub chat_type: String,
    #[serde(deserialize_with = "nullable")]
    pub author: String,
    #[serde(deserialize_with = "nullable")]
    pub text: String,
}
