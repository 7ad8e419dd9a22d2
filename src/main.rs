//! pz-dashboard: live statistics for a Project Zomboid server, in the terminal.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐  PollMsg   ┌──────────┐  draw()  ┌──────────┐
//! │  poll.rs │ ─────────► │  app.rs  │ ───────► │  ui.rs   │
//! │ (tokio)  │  (channel) │ (state)  │          │ (render) │
//! └──────────┘            └──────────┘          └──────────┘
//!      │                       ▲
//!      │ Fetcher               │ handle_key_event()
//!      ▼                  ┌──────────┐
//! ┌──────────┐            │ input.rs │
//! │ source/  │            └──────────┘
//! └──────────┘
//!   API (direct or via relay), then snapshot host
//! ```
//!
//! * **`source/`**: the [`source::Fetcher`] (primary with timeout, then
//!   fallback), the resource catalog, and payload types.
//! * **`relay`**: the `/api/proxy?endpoint=` forwarder for deployments that
//!   cannot reach the API directly.
//! * **`poll`**: tokio tasks that fetch on a timer and on demand.
//! * **`app`**: owns all application state (feeds, selections, map view).
//! * **`ui`**: pure rendering: reads `App` state and draws widgets.
//! * **`input`**: maps key events to `App` mutations.
//! * **`main`**: wires everything together: parse args, start logging, and
//!   run the chosen command.

mod app;
mod config;
mod input;
mod logging;
mod poll;
mod relay;
mod skills;
mod source;
#[cfg(test)]
mod testing;
mod ui;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::runtime::Runtime;
use tracing::info;

use app::App;
use config::{Cli, Command, FetchConfig, RelayConfig};
use logging::LogTarget;
use poll::PollIntervals;
use source::{Fetcher, ResourceKind};

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Tui);

    let target = match command {
        Command::Tui => LogTarget::File,
        Command::Fetch { .. } | Command::Relay { .. } => LogTarget::Stderr,
    };
    logging::setup_logging(&cli.logging, target)?;

    let runtime = Runtime::new().context("starting tokio runtime")?;

    match command {
        Command::Tui => run_tui(&runtime, FetchConfig::from(&cli.sources)),
        Command::Fetch { resource } => {
            runtime.block_on(fetch_once(FetchConfig::from(&cli.sources), resource))
        }
        Command::Relay { bind } => runtime.block_on(relay::serve(RelayConfig::new(bind, &cli.sources))),
    }
}

/// `pz-dashboard fetch <kind>`: one fetch, printed as `{data, source, error?}`.
async fn fetch_once(config: FetchConfig, kind: ResourceKind) -> Result<()> {
    let fetcher = Fetcher::new(config).context("building HTTP client")?;
    let result = fetcher.fetch_raw(kind).await;
    info!(resource = kind.descriptor().name, source = %result.source(), "fetched");
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_tui(runtime: &Runtime, config: FetchConfig) -> Result<()> {
    install_panic_hook();

    // -- start background polling --------------------------------------------
    let fetcher = Fetcher::new(config).context("building HTTP client")?;
    let sources = fetcher.config();
    info!(
        api = ?sources.api_url,
        proxy = ?sources.proxy_url,
        fallback = ?sources.fallback_url,
        "dashboard starting"
    );
    let (mut rx, refresh) = poll::spawn(fetcher, PollIntervals::default(), runtime.handle());

    // -- terminal setup (RAII: Drop restores on exit or panic) ---------------
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new();

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Drain any messages from the poller.
    //   2. Render the UI.
    //   3. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(msg) = rx.try_recv() {
            app.apply(msg);
        }

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.refresh_requested {
            app.refresh_requested = false;
            app.status = "Refreshing…".into();
            refresh.now();
        }

        if app.quit {
            break;
        }
    }

    info!("dashboard exiting");
    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
