//! The fixed set of resources the dashboard reads.

use serde_json::Value;

use super::fetcher::Fetcher;
use super::model::{Leaderboard, PlayerList, PlayerStatsSnapshot, RecentActivity, ServerStatus};
use super::result::FetchResult;

/// Where one logical resource lives on each source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub name: &'static str,
    pub endpoint: &'static str,
    pub fallback_file: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ResourceKind {
    ServerStatus,
    OnlinePlayers,
    /// The snapshot host has no locations, so this falls back to the online list.
    PlayerLocations,
    PlayerStats,
    Leaderboard,
    RecentActivity,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::ServerStatus,
        ResourceKind::OnlinePlayers,
        ResourceKind::PlayerLocations,
        ResourceKind::PlayerStats,
        ResourceKind::Leaderboard,
        ResourceKind::RecentActivity,
    ];

    pub const fn descriptor(self) -> ResourceDescriptor {
        let (name, endpoint, fallback_file) = match self {
            ResourceKind::ServerStatus => {
                ("server status", "/api/server/status", "server_status.json")
            }
            ResourceKind::OnlinePlayers => {
                ("online players", "/api/players/online", "online_players.json")
            }
            ResourceKind::PlayerLocations => {
                ("player locations", "/api/players/locations", "online_players.json")
            }
            ResourceKind::PlayerStats => ("player stats", "/api/players/stats", "player_stats.json"),
            ResourceKind::Leaderboard => {
                ("leaderboard", "/api/leaderboards/hours", "leaderboards.json")
            }
            ResourceKind::RecentActivity => {
                ("recent activity", "/api/activity/recent", "recent_activity.json")
            }
        };
        ResourceDescriptor {
            name,
            endpoint,
            fallback_file,
        }
    }
}

impl Fetcher {
    async fn fetch_kind<T>(&self, kind: ResourceKind) -> FetchResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let ResourceDescriptor {
            endpoint,
            fallback_file,
            ..
        } = kind.descriptor();
        self.fetch(endpoint, fallback_file).await
    }

    /// Any resource as untyped JSON.
    pub async fn fetch_raw(&self, kind: ResourceKind) -> FetchResult<Value> {
        self.fetch_kind(kind).await
    }

    pub async fn server_status(&self) -> FetchResult<ServerStatus> {
        self.fetch_kind(ResourceKind::ServerStatus).await
    }

    pub async fn online_players(&self) -> FetchResult<PlayerList> {
        self.fetch_kind(ResourceKind::OnlinePlayers).await
    }

    pub async fn player_locations(&self) -> FetchResult<PlayerList> {
        self.fetch_kind(ResourceKind::PlayerLocations).await
    }

    pub async fn player_stats(&self) -> FetchResult<PlayerStatsSnapshot> {
        self.fetch_kind(ResourceKind::PlayerStats).await
    }

    pub async fn leaderboard(&self) -> FetchResult<Leaderboard> {
        self.fetch_kind(ResourceKind::Leaderboard).await
    }

    pub async fn recent_activity(&self) -> FetchResult<RecentActivity> {
        self.fetch_kind(ResourceKind::RecentActivity).await
    }
}
