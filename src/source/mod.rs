//! Data acquisition layer.
//!
//! Every view in the dashboard gets its data through this module.  A
//! [`Fetcher`] resolves one logical resource by trying the primary API first
//! and a static snapshot host second, and always hands back a
//! [`FetchResult`] tagged with where the data came from.
//!
//! * **`fetcher`**: the two-step fetch with a bounded primary attempt.
//! * **`catalog`**: the fixed table of resources and their typed operations.
//! * **`model`**: payload types decoded at the catalog boundary.
//! * **`timestamp`**: the game server's `DD-MM-YY HH:MM:SS.mmm` format.
//!
//! ## For contributors: adding a new resource
//!
//! 1. Add a payload type to `model.rs` (derive `Deserialize`, default the
//!    envelope fields so a partial snapshot still decodes).
//! 2. Add a [`ResourceKind`] variant with its endpoint and fallback file.
//! 3. Add a zero-argument operation on [`Fetcher`] in `catalog.rs`.
//!
//! The poller and UI only ever see [`FetchResult`], so nothing else changes.

mod catalog;
mod fetcher;
mod model;
mod result;
mod timestamp;

pub use catalog::ResourceKind;
pub use fetcher::Fetcher;
pub use model::{
    ChatMessage, Leaderboard, OnlinePlayer, PlayerList, PlayerStats, PlayerStatsSnapshot,
    RecentActivity, ServerStatus,
};
pub use result::FetchResult;
pub use timestamp::{format_relative, parse_game_timestamp};

#[cfg(test)]
pub use fetcher::BOTH_SOURCES_FAILED;
#[cfg(test)]
pub use result::Source;
