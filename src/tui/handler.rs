use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::InputMode;
use crate::state::Section;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    MoveUp,
    MoveDown,
    MoveToTop,
    MoveToBottom,
    OpenDetail,
    CloseDetail,
    ReopenDetail,
    ToggleSection(Section),
    Generate(Section),
    OpenInBrowser,
    RefreshAll,
    ShowHelp,
    HideHelp,
    // Drawer actions
    ToggleDrawer,
    CloseDrawer,
    DrawerUp,
    DrawerDown,
    PullSource,
    // Add-source input actions
    AddSourceStart,
    AddSourceChar(char),
    AddSourceBackspace,
    AddSourceConfirm,
    AddSourceCancel,
}

pub fn handle_key_event(key: KeyEvent, mode: InputMode) -> Option<AppAction> {
    if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
        return Some(AppAction::Quit);
    }

    match mode {
        // If help is showing, any key closes it
        InputMode::Help => Some(AppAction::HideHelp),

        InputMode::AddSource => match key.code {
            KeyCode::Enter => Some(AppAction::AddSourceConfirm),
            KeyCode::Esc => Some(AppAction::AddSourceCancel),
            KeyCode::Backspace => Some(AppAction::AddSourceBackspace),
            KeyCode::Char(c) => Some(AppAction::AddSourceChar(c)),
            _ => None,
        },

        InputMode::Drawer => match key.code {
            KeyCode::Char('q') => Some(AppAction::Quit),
            KeyCode::Esc => Some(AppAction::CloseDrawer),
            KeyCode::Tab | KeyCode::Char('s') => Some(AppAction::ToggleDrawer),
            KeyCode::Char('j') | KeyCode::Down => Some(AppAction::DrawerDown),
            KeyCode::Char('k') | KeyCode::Up => Some(AppAction::DrawerUp),
            KeyCode::Char('a') => Some(AppAction::AddSourceStart),
            KeyCode::Char('d') | KeyCode::Enter => Some(AppAction::PullSource),
            KeyCode::Char('r') => Some(AppAction::RefreshAll),
            KeyCode::Char('?') => Some(AppAction::ShowHelp),
            _ => None,
        },

        InputMode::Detail => match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('h') | KeyCode::Left => {
                Some(AppAction::CloseDetail)
            }
            KeyCode::Char('j') | KeyCode::Down => Some(AppAction::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(AppAction::MoveUp),
            KeyCode::Char('1') => Some(AppAction::ToggleSection(Section::Content)),
            KeyCode::Char('2') => Some(AppAction::ToggleSection(Section::Analysis)),
            KeyCode::Char('3') => Some(AppAction::ToggleSection(Section::Counters)),
            KeyCode::Char('a') => Some(AppAction::Generate(Section::Analysis)),
            KeyCode::Char('c') => Some(AppAction::Generate(Section::Counters)),
            KeyCode::Char('o') => Some(AppAction::OpenInBrowser),
            KeyCode::Tab | KeyCode::Char('s') => Some(AppAction::ToggleDrawer),
            KeyCode::Char('?') => Some(AppAction::ShowHelp),
            _ => None,
        },

        InputMode::List => match key.code {
            KeyCode::Char('q') => Some(AppAction::Quit),

            KeyCode::Char('j') | KeyCode::Down => Some(AppAction::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(AppAction::MoveUp),
            KeyCode::Char('<') | KeyCode::Home => Some(AppAction::MoveToTop),
            KeyCode::Char('>') | KeyCode::End => Some(AppAction::MoveToBottom),

            KeyCode::Enter => Some(AppAction::OpenDetail),
            KeyCode::Char('l') | KeyCode::Right => Some(AppAction::ReopenDetail),

            KeyCode::Char('r') => Some(AppAction::RefreshAll),
            KeyCode::Char('o') => Some(AppAction::OpenInBrowser),
            KeyCode::Tab | KeyCode::Char('s') => Some(AppAction::ToggleDrawer),
            KeyCode::Char('a') => Some(AppAction::AddSourceStart),

            KeyCode::Char('?') => Some(AppAction::ShowHelp),

            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn help_swallows_every_key() {
        assert_eq!(
            handle_key_event(key(KeyCode::Char('q')), InputMode::Help),
            Some(AppAction::HideHelp)
        );
    }

    #[test]
    fn add_source_mode_captures_text() {
        assert_eq!(
            handle_key_event(key(KeyCode::Char('q')), InputMode::AddSource),
            Some(AppAction::AddSourceChar('q'))
        );
        assert_eq!(
            handle_key_event(key(KeyCode::Esc), InputMode::AddSource),
            Some(AppAction::AddSourceCancel)
        );
    }

    #[test]
    fn q_closes_detail_but_quits_list() {
        assert_eq!(
            handle_key_event(key(KeyCode::Char('q')), InputMode::Detail),
            Some(AppAction::CloseDetail)
        );
        assert_eq!(
            handle_key_event(key(KeyCode::Char('q')), InputMode::List),
            Some(AppAction::Quit)
        );
    }

    #[test]
    fn ctrl_c_quits_from_any_mode() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(ctrl_c, InputMode::AddSource), Some(AppAction::Quit));
        assert_eq!(handle_key_event(ctrl_c, InputMode::Detail), Some(AppAction::Quit));
    }

    #[test]
    fn detail_keys_map_to_sections() {
        assert_eq!(
            handle_key_event(key(KeyCode::Char('2')), InputMode::Detail),
            Some(AppAction::ToggleSection(Section::Analysis))
        );
        assert_eq!(
            handle_key_event(key(KeyCode::Char('c')), InputMode::Detail),
            Some(AppAction::Generate(Section::Counters))
        );
    }
}
