//! Composite chat state
//!
//! Each slice is reduced independently and shared behind an `Arc`, so a
//! snapshot is cheap to clone and an untouched slice keeps its identity.

use super::action::Action;
use super::connection::ConnectionState;
use super::format::FormatState;
use super::history::HistoryState;
use super::language::LanguageState;
use super::menu::MenuState;
use super::settings::SettingsState;
use super::shell::ShellState;
use std::sync::Arc;

/// A state slice with a pure, total reducer
pub trait Slice: Sized {
    /// The next state, or `None` when the action leaves this slice unchanged
    fn apply(&self, action: &Action) -> Option<Self>;
}

/// Reduce one slice, keeping the same `Arc` on a no-op
pub fn reduce_slice<S: Slice>(state: &Arc<S>, action: &Action) -> Arc<S> {
    state.apply(action).map_or_else(|| Arc::clone(state), Arc::new)
}

#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub history: Arc<HistoryState>,
    pub shell: Arc<ShellState>,
    pub connection: Arc<ConnectionState>,
    pub format: Arc<FormatState>,
    pub settings: Arc<SettingsState>,
    pub language: Arc<LanguageState>,
    pub menu: Arc<MenuState>,
}

impl ChatState {
    pub fn new(history: HistoryState, format: FormatState) -> Self {
        Self {
            history: Arc::new(history),
            format: Arc::new(format),
            ..Self::default()
        }
    }

    /// Reduce `action` through every slice
    #[must_use]
    pub fn reduce(&self, action: &Action) -> Self {
        Self {
            history: reduce_slice(&self.history, action),
            shell: reduce_slice(&self.shell, action),
            connection: reduce_slice(&self.connection, action),
            format: reduce_slice(&self.format, action),
            settings: reduce_slice(&self.settings, action),
            language: reduce_slice(&self.language, action),
            menu: reduce_slice(&self.menu, action),
        }
    }

    /// Whether every slice is the same allocation as in `other`
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.history, &other.history)
            && Arc::ptr_eq(&self.shell, &other.shell)
            && Arc::ptr_eq(&self.connection, &other.connection)
            && Arc::ptr_eq(&self.format, &other.format)
            && Arc::ptr_eq(&self.settings, &other.settings)
            && Arc::ptr_eq(&self.language, &other.language)
            && Arc::ptr_eq(&self.menu, &other.menu)
    }

    pub fn locale(&self) -> &str {
        &self.format.locale
    }
}
