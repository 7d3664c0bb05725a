//! Terminal UI for raccolta that shows tomorrow's waste collections for a zone.

mod app;
mod config;
mod input;
mod ui;

use std::{fs::OpenOptions, io, sync::Arc, sync::Mutex, time::Duration as StdDuration};

use anyhow::{Context, Result, anyhow};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use raccolta_core::{FileCache, ScheduleService, SystemClock, ZoneId, ZoneReport};
use raccolta_provider_mantova as mantova;
use reqwest::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::{App, Screen};
use crate::config::HostConfig;
use crate::input::Action;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = HostConfig::from_env_or_toml()?;
    init_logging(&settings)?;

    // HTTP + service setup
    let client = Client::builder().user_agent("raccolta/0.1").build()?;
    let mut endpoint = mantova::Endpoint::new(client);
    if let Some(base_url) = &settings.base_url {
        endpoint = endpoint.with_base_url(base_url.as_str());
    }
    let plugin = Arc::new(mantova::plugin_for(&endpoint));

    let clock = Arc::new(SystemClock);
    let cache = Arc::new(
        FileCache::new(&settings.cache_dir, clock.clone())
            .with_context(|| format!("open cache at {}", settings.cache_dir.display()))?,
    );
    let service = Arc::new(ScheduleService::from_plugin(&plugin, cache, clock));

    // App state
    let configured_zone = settings.zone.clone();
    let mut app = App::new(service, plugin, settings);
    if let Some(zone) = configured_zone {
        open_zone(&mut app, zone, None).await?;
    }

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn init_logging(settings: &HostConfig) -> Result<()> {
    std::fs::create_dir_all(&settings.cache_dir)
        .with_context(|| format!("create {}", settings.cache_dir.display()))?;
    let log_path = settings.cache_dir.join("raccolta.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| anyhow!(err))
}

async fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    if app.zone.is_none() {
        load_zones(&mut app).await;
    }

    loop {
        if app.poll_due() {
            app.is_loading = true;
            terminal.draw(|frame| ui::draw(frame, &app))?;
            load_schedule(&mut app, false).await;
        }

        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
        {
            let action = input::handle_key_event(key, &mut app);

            match action {
                Action::Quit => break,
                Action::None => {}
                Action::LoadZones => {
                    app.is_loading = true;
                    terminal.draw(|frame| ui::draw(frame, &app))?;
                    load_zones(&mut app).await;
                }
                Action::OpenSelectedZone => {
                    let Some(zone) = app.select_current_zone() else {
                        app.error_message = Some("No zone selected (press r to load zones)".into());
                        continue;
                    };
                    if let Err(err) = open_zone(&mut app, zone.id, Some(zone.title)).await {
                        app.error_message = Some(format!("{err:#}"));
                    }
                }
                Action::ForceRefresh => {
                    app.is_loading = true;
                    terminal.draw(|frame| ui::draw(frame, &app))?;
                    load_schedule(&mut app, true).await;
                }
            }
        }
    }

    Ok(())
}

async fn open_zone(app: &mut App, zone: ZoneId, title: Option<String>) -> Result<()> {
    let config = app
        .settings
        .zone_config(zone.clone())
        .with_context(|| format!("invalid settings for zone {zone}"))?;
    let title = match title {
        Some(title) => title,
        None => app.plugin.zone_title(&zone).await,
    };
    info!(zone = %zone, "Watching zone {title}");
    app.enter_zone(config, title);
    Ok(())
}

async fn load_zones(app: &mut App) {
    app.is_loading = true;
    match app.plugin.zone_port.zones().await {
        Ok(zones) => {
            app.zones = zones;
            app.zone_list_index = 0;
            app.error_message = None;
        }
        Err(err) => {
            app.error_message = Some(format!("Could not load zones: {err}"));
        }
    }
    app.is_loading = false;
    app.screen = Screen::ZoneSelect;
}

async fn load_schedule(app: &mut App, force: bool) {
    let Some(zone) = app.zone.clone() else {
        return;
    };

    let result = if force {
        app.service.force_refresh(&zone.zone).await
    } else {
        app.service.get_schedule(&zone.zone, zone.window()).await
    };

    let today = app.service.clock().today();
    let report = result.map(|snapshot| {
        ZoneReport::build(
            &snapshot,
            &zone.tracked_waste_types,
            today,
            zone.next_dates_limit,
        )
    });

    app.is_loading = false;
    app.apply_result(&zone, report);
}
