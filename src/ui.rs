//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! ## For contributors
//!
//! * The layout is a header (tabs, source badge, update time), the active
//!   tab's body, and a one-line status bar.
//! * Each tab has its own `draw_*` function.  They only read [`App`]; the
//!   list and table states are the only things mutated while drawing.
//! * The map canvas uses y-up coordinates, so world positions are flipped
//!   with [`canvas_y`] before plotting.

use chrono::Local;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Points, Rectangle},
        Block, Borders, List, ListItem, Paragraph, Row, Table, Tabs, Wrap,
    },
    Frame,
};

use crate::app::{marker_position, App, Freshness, Tab, MAP_HEIGHT, MAP_WIDTH};
use crate::skills::{group_skills, level_bar};
use crate::source::{format_relative, parse_game_timestamp, PlayerStats};

const DEFAULT_SERVER_NAME: &str = "PZ Server";
const DEFAULT_DESCRIPTION: &str = "Project Zomboid Server Dashboard";
const LEADERBOARD_SIZE: usize = 5;
const RECENT_LEVEL_UPS: usize = 10;

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [header_area, body_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(app, frame, header_area);
    match app.tab {
        Tab::Overview => draw_overview(app, frame, body_area),
        Tab::Players => draw_players(app, frame, body_area),
        Tab::Map => draw_map(app, frame, body_area),
        Tab::Chat => draw_chat(app, frame, body_area),
    }
    draw_status_bar(app, frame, status_area);
}

fn draw_header(app: &App, frame: &mut Frame, area: Rect) {
    let [tabs_area, info_area] =
        Layout::horizontal([Constraint::Min(30), Constraint::Length(34)]).areas(area);

    let server_name = app
        .server
        .data
        .as_ref()
        .map(|s| s.server_name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_SERVER_NAME);

    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| Line::from(format!("{} {}", i + 1, tab.title())))
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(
            Block::default()
                .title(format!(" {server_name} "))
                .borders(Borders::ALL),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, tabs_area);

    let badge = match app.freshness() {
        Freshness::Loading => Span::styled("Loading…", Style::default().fg(Color::DarkGray)),
        Freshness::Live => Span::styled("● Live", Style::default().fg(Color::Green)),
        Freshness::Cached => Span::styled("● Cached", Style::default().fg(Color::Yellow)),
        Freshness::Unavailable => Span::styled("● Unavailable", Style::default().fg(Color::Red)),
    };
    let updated = app
        .last_update
        .map(|t| format!("Updated {}", t.format("%H:%M:%S")))
        .unwrap_or_default();
    let info = Paragraph::new(Line::from(vec![
        badge,
        Span::raw("  "),
        Span::styled(updated, Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(info, info_area);
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

fn draw_overview(app: &App, frame: &mut Frame, area: Rect) {
    let [top, bottom] =
        Layout::vertical([Constraint::Length(9), Constraint::Min(3)]).areas(area);
    let [status_area, leaderboard_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(top);

    let label = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();
    match &app.server.data {
        Some(status) => {
            let name = non_empty(&status.server_name, DEFAULT_SERVER_NAME);
            let description = non_empty(&status.description, DEFAULT_DESCRIPTION);
            let (state, colour) = if status.online {
                ("● Online", Color::Green)
            } else {
                ("● Offline", Color::Red)
            };
            lines.push(Line::from(Span::styled(
                name.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(description.to_string()));
            lines.push(Line::from(Span::styled(state, Style::default().fg(colour))));
            lines.push(Line::from(vec![
                Span::styled("Players  ", label),
                Span::raw(format!("{}/{}", status.current_players, status.max_players)),
            ]));
            lines.push(Line::from(vec![
                Span::styled("PvP      ", label),
                Span::raw(if status.pvp_enabled { "Enabled" } else { "Disabled" }),
            ]));
            lines.push(Line::from(vec![
                Span::styled("Map      ", label),
                Span::raw(non_empty(&status.map, "-").to_string()),
            ]));
        }
        None => lines.push(placeholder(app.server.freshness)),
    }
    if let Some(stats) = &app.stats.data {
        lines.push(Line::from(vec![
            Span::styled("Tracked  ", label),
            Span::raw(stats.players.len().to_string()),
        ]));
    }
    let status = Paragraph::new(lines)
        .block(Block::default().title(" Server ").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    frame.render_widget(status, status_area);

    let block = Block::default().title(" Top Survivors ").borders(Borders::ALL);
    match &app.leaderboard.data {
        Some(board) => {
            let rows = board
                .entries()
                .iter()
                .take(LEADERBOARD_SIZE)
                .enumerate()
                .map(|(i, entry)| {
                    Row::new(vec![
                        format!("#{}", i + 1),
                        entry.username.clone(),
                        format!("{:.1}h", entry.hours),
                        format!("{} deaths", entry.deaths),
                    ])
                });
            let table = Table::new(
                rows,
                [
                    Constraint::Length(4),
                    Constraint::Min(10),
                    Constraint::Length(9),
                    Constraint::Length(11),
                ],
            )
            .block(block);
            frame.render_widget(table, leaderboard_area);
        }
        None => frame.render_widget(
            Paragraph::new(placeholder(app.leaderboard.freshness)).block(block),
            leaderboard_area,
        ),
    }

    let online = app
        .online
        .data
        .as_ref()
        .map(|list| list.players.as_slice())
        .unwrap_or(&[]);
    let items: Vec<ListItem> = online
        .iter()
        .map(|p| {
            ListItem::new(Line::from(vec![
                Span::styled("● ", Style::default().fg(Color::Green)),
                Span::raw(p.username.clone()),
                Span::raw("  "),
                Span::styled(p.connected_at.clone(), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();
    let title = format!(" Online Now ({}) ", online.len());
    let list = if items.is_empty() {
        List::new(vec![ListItem::new(Span::styled(
            "No players online",
            Style::default().fg(Color::DarkGray),
        ))])
    } else {
        List::new(items)
    };
    frame.render_widget(
        list.block(Block::default().title(title).borders(Borders::ALL)),
        bottom,
    );
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

fn draw_players(app: &mut App, frame: &mut Frame, area: Rect) {
    let [list_area, detail_area] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(area);

    let rows: Vec<Row> = app
        .visible_players()
        .iter()
        .map(|p| {
            Row::new(vec![
                p.username.clone(),
                format!("{:.1}", p.total_hours),
                p.deaths.to_string(),
            ])
        })
        .collect();
    let title = if app.player_query.is_empty() {
        format!(" Players ({}) ", rows.len())
    } else {
        format!(" Players ({}) /{} ", rows.len(), app.player_query)
    };

    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(8),
            Constraint::Length(7),
        ],
    )
    .header(
        Row::new(vec!["Username", "Hours", "Deaths"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().title(title).borders(Borders::ALL))
    .row_highlight_style(
        Style::default()
            .add_modifier(Modifier::BOLD)
            .bg(Color::DarkGray),
    )
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, list_area, &mut app.player_state);

    let block = Block::default().title(" Details ").borders(Borders::ALL);
    let lines = match app.selected_player() {
        Some(player) => player_details(player),
        None if app.stats.data.is_none() => vec![placeholder(app.stats.freshness)],
        None => vec![Line::from(Span::styled(
            "Select a player with j/k",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        detail_area,
    );
}

fn player_details(player: &PlayerStats) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::DarkGray);
    let heading = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(Span::styled(
            player.username.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Hours        ", label),
            Span::raw(format!("{:.1}", player.total_hours)),
        ]),
        Line::from(vec![
            Span::styled("Deaths       ", label),
            Span::raw(player.deaths.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Connections  ", label),
            Span::raw(player.connections.unwrap_or(0).to_string()),
        ]),
        Line::from(vec![
            Span::styled("Last seen    ", label),
            Span::raw(last_seen(&player.last_seen)),
        ]),
    ];

    lines.push(Line::default());
    // Two skills per row keeps every category on screen.
    for group in group_skills(&player.skills) {
        lines.push(Line::from(Span::styled(group.category, heading)));
        for pair in group.skills.chunks(2) {
            let mut spans = Vec::new();
            for (name, level) in pair {
                spans.push(Span::raw(format!("  {name:<14}")));
                spans.push(Span::styled(level_bar(*level), Style::default().fg(Color::Yellow)));
                spans.push(Span::styled(format!(" {level:<2}"), label));
            }
            lines.push(Line::from(spans));
        }
    }

    if !player.level_ups.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Recent Level Ups", heading)));
        // The server stores level-ups newest first.
        for level_up in player.level_ups.iter().take(RECENT_LEVEL_UPS) {
            lines.push(Line::from(vec![
                Span::raw(format!("  {} → {}  ", level_up.skill, level_up.level)),
                Span::styled(level_up.timestamp.clone(), label),
            ]));
        }
    }

    lines
}

/// `MM/DD/YY HH:MM:SS (N mins ago)`, or the raw text if it does not parse.
fn last_seen(raw: &str) -> String {
    match parse_game_timestamp(raw) {
        Ok(ts) => format!(
            "{} ({})",
            ts.format("%m/%d/%y %H:%M:%S"),
            format_relative(ts, Local::now().naive_local())
        ),
        Err(_) if raw.is_empty() => "Never".to_string(),
        Err(_) => raw.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// World y grows south, canvas y grows north.
fn canvas_y(world_y: f64) -> f64 {
    MAP_HEIGHT - world_y
}

fn draw_map(app: &App, frame: &mut Frame, area: Rect) {
    let [canvas_area, side_area] =
        Layout::horizontal([Constraint::Min(20), Constraint::Length(28)]).areas(area);

    let players = app.map_players();
    let markers: Vec<(String, bool, (f64, f64))> = players
        .iter()
        .filter_map(|p| {
            marker_position(p).map(|(x, y)| (p.username.clone(), p.online, (x, canvas_y(y))))
        })
        .collect();

    let ([x_min, x_max], [y_min, y_max]) = app.map.bounds();
    let title = format!(
        " World Map  zoom {:.1}x{} ",
        app.map.zoom,
        if app.map.show_offline { "  +offline" } else { "" }
    );

    let canvas = Canvas::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .marker(Marker::Braille)
        .x_bounds([x_min, x_max])
        .y_bounds([canvas_y(y_max), canvas_y(y_min)])
        .paint(|ctx| {
            ctx.draw(&Rectangle {
                x: 0.0,
                y: 0.0,
                width: MAP_WIDTH,
                height: MAP_HEIGHT,
                color: Color::DarkGray,
            });
            ctx.layer();
            for (name, online, (x, y)) in &markers {
                let colour = if *online { Color::Green } else { Color::Red };
                ctx.draw(&Points {
                    coords: &[(*x, *y)],
                    color: colour,
                });
                ctx.print(*x, *y, Span::styled(name.clone(), Style::default().fg(colour)));
            }
        });
    frame.render_widget(canvas, canvas_area);

    let items: Vec<ListItem> = players
        .iter()
        .map(|p| {
            let (dot, colour) = if p.online {
                ("● ", Color::Green)
            } else {
                ("○ ", Color::Red)
            };
            let coords = p
                .position()
                .map(|(x, y)| format!(" {x:.0},{y:.0}"))
                .unwrap_or_default();
            ListItem::new(Line::from(vec![
                Span::styled(dot, Style::default().fg(colour)),
                Span::raw(p.username.clone()),
                Span::styled(coords, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();
    let title = format!(" Plotted ({}) ", items.len());
    let list = if items.is_empty() {
        List::new(vec![ListItem::new(placeholder_or(
            app.locations.freshness,
            "No players to show",
        ))])
    } else {
        List::new(items)
    };
    frame.render_widget(
        list.block(Block::default().title(title).borders(Borders::ALL)),
        side_area,
    );
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

fn draw_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = app
        .visible_messages()
        .iter()
        .map(|m| {
            let time = parse_game_timestamp(&m.timestamp)
                .map(|ts| ts.format("%m/%d %H:%M").to_string())
                .unwrap_or_else(|_| "--/-- --:--".into());
            ListItem::new(Line::from(vec![
                Span::styled(format!("{time:<12}"), Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!("[{}] ", m.chat_type),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    format!("{}: ", m.author),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(m.text.clone()),
            ]))
        })
        .collect();

    let mut title = format!(
        " Chat ({})  type: {} ",
        items.len(),
        app.chat_type.as_deref().unwrap_or("all")
    );
    if !app.chat_query.is_empty() {
        title.push_str(&format!(" /{} ", app.chat_query));
    }

    let list = if items.is_empty() {
        List::new(vec![ListItem::new(placeholder_or(
            app.activity.freshness,
            "No messages",
        ))])
    } else {
        List::new(items)
    };
    let list = list
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, &mut app.chat_state);
}

// ---------------------------------------------------------------------------
// Status bar
// ---------------------------------------------------------------------------

fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    if app.searching {
        let prompt = Paragraph::new(Line::from(vec![
            Span::styled(" /", Style::default().fg(Color::Yellow)),
            Span::raw(app.query().unwrap_or_default().to_string()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
            Span::styled("  Enter/Esc: done", Style::default().fg(Color::DarkGray)),
        ]));
        frame.render_widget(prompt, area);
        return;
    }

    let help = match app.tab {
        Tab::Overview => "q: quit  Tab/1-4: view  r: refresh",
        Tab::Players => "q: quit  j/k: select  /: search  r: refresh",
        Tab::Map => "q: quit  +/-/0: zoom  arrows: pan  o: offline  r: refresh",
        Tab::Chat => "q: quit  j/k: scroll  t: type  /: search  r: refresh",
    };
    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(app.status.clone(), Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(help, Style::default().fg(Color::DarkGray)),
    ]));
    frame.render_widget(status, area);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn non_empty<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

fn placeholder(freshness: Freshness) -> Line<'static> {
    placeholder_or(freshness, "No data")
}

fn placeholder_or(freshness: Freshness, empty: &'static str) -> Line<'static> {
    let text = match freshness {
        Freshness::Loading => "Loading…",
        Freshness::Unavailable => "Unavailable",
        Freshness::Live | Freshness::Cached => empty,
    };
    Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
}
