use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Screen};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Action {
    None,
    Quit,
    /// Resolve the highlighted zone and load its schedule
    OpenSelectedZone,
    /// Load the zone list for the selection screen
    LoadZones,
    /// Run `service.force_refresh(...)` for the current zone
    ForceRefresh,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{Char, Down, Enter, Esc, Left, Up};

    // Global quit shortcuts
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }
    if key.code == Char('q') && key.modifiers.is_empty() {
        return Action::Quit;
    }

    let mut action = Action::None;

    match app.screen {
        Screen::ZoneSelect => match key.code {
            Up | Char('k') => {
                if app.zone_list_index > 0 {
                    app.zone_list_index -= 1;
                }
            }
            Down | Char('j') => {
                if app.zone_list_index + 1 < app.zones.len() {
                    app.zone_list_index += 1;
                }
            }
            Enter | Char(' ') => {
                action = Action::OpenSelectedZone;
            }
            Char('r') => {
                action = Action::LoadZones;
            }
            Left | Esc => {
                if app.zone.is_some() {
                    app.screen = Screen::Schedule;
                }
            }
            _ => {}
        },

        Screen::Schedule => match key.code {
            Char('r') => {
                action = Action::ForceRefresh;
            }
            Char('z') | Left | Esc => {
                app.screen = Screen::ZoneSelect;
                if app.zones.is_empty() {
                    action = Action::LoadZones;
                }
            }
            _ => {}
        },
    }
    action
}
