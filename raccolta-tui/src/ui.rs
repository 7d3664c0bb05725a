use chrono::{Local, NaiveDate};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
};
use raccolta_core::{SnapshotSource, WasteTypeView, ZoneReport, catalog};

use crate::app::{App, Screen};

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: title, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    let header = Paragraph::new(format!(
        "raccolta – waste collection reminders · {}",
        app.plugin.meta.name
    ))
        .block(Block::default().borders(Borders::ALL).title("Raccolta"));
    frame.render_widget(header, *header_area);

    match app.screen {
        Screen::ZoneSelect => draw_zone_select(frame, app, *content_area),
        Screen::Schedule => draw_schedule(frame, app, *content_area),
    }

    let nav_hint = match app.screen {
        Screen::ZoneSelect => "↑/↓ move · Enter/Space select zone · r reload zones · q/Ctrl-C quit",
        Screen::Schedule => "r refresh now · z/Esc change zone · q/Ctrl-C quit",
    };

    let status_text = if app.is_loading {
        format!("Loading… · {nav_hint}")
    } else if let Some(msg) = &app.error_message {
        format!("{msg} · {nav_hint}")
    } else if let Some(report) = &app.report {
        format!("{} · {nav_hint}", freshness_label(report))
    } else {
        nav_hint.to_owned()
    };

    let stale = app.report.as_ref().is_some_and(|report| report.source == SnapshotSource::Fallback);
    let status_style = if app.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if app.is_loading || stale {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn draw_zone_select(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let items = if app.zones.is_empty() {
        vec![ListItem::new("No zones loaded. Press r to retry.")]
    } else {
        app.zones
            .iter()
            .enumerate()
            .map(|(idx, zone)| {
                let prefix = if idx == app.zone_list_index {
                    "> "
                } else {
                    "  "
                };
                ListItem::new(format!("{prefix}{} ({})", zone.title, zone.id))
            })
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Select zone (↑/↓, Enter)"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !app.zones.is_empty() {
        state.select(Some(app.zone_list_index));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_schedule(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(report) = &app.report else {
        let title = format!("Collections for {}", app.zone_title);
        let message = if app.is_loading {
            "Loading schedule…"
        } else {
            "No data available for this zone yet."
        };
        let paragraph = Paragraph::new(message)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    };

    let title = format!("Collections for {} ({})", app.zone_title, report.zone);

    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // tomorrow
            Constraint::Min(0),    // waste types
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [tomorrow_area, table_area] = chunks else {
        return;
    };

    let tomorrow_style = if report.tomorrow.is_empty() {
        Style::default()
    } else {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    };
    let tomorrow = Paragraph::new(report.tomorrow.state())
        .style(tomorrow_style)
        .block(Block::default().borders(Borders::ALL).title(format!(
            "Tomorrow ({} waste types)",
            report.tomorrow.count
        )));
    frame.render_widget(tomorrow, *tomorrow_area);

    let today = app.service.clock().today();
    let rows = report.waste_types.iter().map(|view| {
        let style = if view.is_tomorrow {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Row::new(vec![
            Cell::from(view_title(view)),
            Cell::from(if view.is_tomorrow { "yes" } else { "no" }),
            Cell::from(
                view.next_date()
                    .map_or_else(|| "–".to_owned(), |date| relative_day_label(date, today)),
            ),
            Cell::from(
                view.next_dates
                    .iter()
                    .map(|date| date.format("%d.%m").to_string())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        ])
        .style(style)
    });

    let column_widths = [
        Constraint::Length(24),
        Constraint::Length(9),
        Constraint::Length(12),
        Constraint::Min(20),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Waste type", "Tomorrow", "Next", "Upcoming"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .column_spacing(1);

    frame.render_widget(table, *table_area);
}

fn view_title(view: &WasteTypeView) -> String {
    view.title
        .clone()
        .unwrap_or_else(|| catalog::display_title(&view.waste_type))
}

fn freshness_label(report: &ZoneReport) -> String {
    let updated = report
        .last_update
        .with_timezone(&Local)
        .format("%d.%m.%Y %H:%M");
    match report.source {
        SnapshotSource::Fallback => format!("Offline, showing data from {updated}"),
        SnapshotSource::Cache | SnapshotSource::Fetched => format!("Last update {updated}"),
    }
}

fn relative_day_label(date: NaiveDate, today: NaiveDate) -> String {
    let delta = (date - today).num_days();
    match delta {
        0 => "today".to_owned(),
        1 => "tomorrow".to_owned(),
        days => format!("in {days} days"),
    }
}
