//! Background polling.
//!
//! Runs on the tokio runtime, periodically fetching every resource the views
//! need and sending the results to the UI thread over an unbounded channel.
//!
//! Two loops run side by side: the overview loop fans out to status,
//! players, stats, leaderboard, and chat concurrently, and a faster map loop
//! fetches player locations.  Each round is a fresh set of fetches; nothing
//! is cached or coalesced between rounds.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::source::{
    FetchResult, Fetcher, Leaderboard, PlayerList, PlayerStatsSnapshot, RecentActivity,
    ServerStatus,
};

/// Messages sent from the poller to the UI thread.
#[derive(Debug)]
pub enum PollMsg {
    Overview(Box<Overview>),
    Locations(FetchResult<PlayerList>),
}

/// One round of the overview loop.
#[derive(Debug)]
pub struct Overview {
    pub status: FetchResult<ServerStatus>,
    pub online: FetchResult<PlayerList>,
    pub stats: FetchResult<PlayerStatsSnapshot>,
    pub leaderboard: FetchResult<Leaderboard>,
    pub activity: FetchResult<RecentActivity>,
}

#[derive(Debug, Clone, Copy)]
pub struct PollIntervals {
    pub overview: Duration,
    pub map: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            overview: Duration::from_secs(30),
            map: Duration::from_secs(10),
        }
    }
}

/// Wakes every polling loop for an immediate round.
#[derive(Debug, Clone)]
pub struct Refresh(Arc<watch::Sender<()>>);

impl Refresh {
    pub fn now(&self) {
        self.0.send_modify(|_| {});
    }
}

/// Spawn the polling loops on `handle`.
///
/// Returns the receiver the UI drains on every tick and a [`Refresh`] handle.
/// The loops stop once the receiver is dropped.
pub fn spawn(
    fetcher: Fetcher,
    intervals: PollIntervals,
    handle: &Handle,
) -> (mpsc::UnboundedReceiver<PollMsg>, Refresh) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (wake_tx, _) = watch::channel(());
    let refresh = Refresh(Arc::new(wake_tx));

    let overview_fetcher = fetcher.clone();
    handle.spawn(run_loop(
        "overview",
        tx.clone(),
        refresh.clone(),
        intervals.overview,
        move || {
            let fetcher = overview_fetcher.clone();
            async move {
                let (status, online, stats, leaderboard, activity) = tokio::join!(
                    fetcher.server_status(),
                    fetcher.online_players(),
                    fetcher.player_stats(),
                    fetcher.leaderboard(),
                    fetcher.recent_activity()
                );
                PollMsg::Overview(Box::new(Overview {
                    status,
                    online,
                    stats,
                    leaderboard,
                    activity,
                }))
            }
        },
    ));

    handle.spawn(run_loop("map", tx, refresh.clone(), intervals.map, move || {
        let fetcher = fetcher.clone();
        async move { PollMsg::Locations(fetcher.player_locations().await) }
    }));

    (rx, refresh)
}

async fn run_loop<F, Fut>(
    name: &'static str,
    tx: mpsc::UnboundedSender<PollMsg>,
    refresh: Refresh,
    every: Duration,
    round: F,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = PollMsg>,
{
    let mut wake = refresh.0.subscribe();

    loop {
        let msg = round().await;
        // If the receiver is gone the UI has exited; stop polling.
        if tx.send(msg).is_err() {
            debug!(name, "poll receiver dropped, stopping");
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(every) => {}
            changed = wake.changed() => {
                if changed.is_err() {
                    return;
                }
                debug!(name, "manual refresh");
            }
        }
    }
}
