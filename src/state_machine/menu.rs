//! Custom menu slice

use super::action::Action;
use super::activity::Activity;
use super::language::same_locale_group;
use super::state::Slice;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    /// Text posted to the peer
    pub sending_message: String,
    /// Text shown locally instead, if different
    #[serde(default)]
    pub displaying_message: Option<String>,
}

impl MenuEntry {
    pub fn display_text(&self) -> &str {
        self.displaying_message
            .as_deref()
            .unwrap_or(&self.sending_message)
    }
}

/// Menu entries offered for one locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleMenu {
    pub locale: String,
    pub messages: Vec<MenuEntry>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MenuState {
    pub show_menu: bool,
    pub menus: Vec<LocaleMenu>,
    /// Envelope awaiting `PushMenuMessage`
    pub pending: Option<Arc<Activity>>,
    pub pending_message: Option<String>,
}

impl MenuState {
    /// Entry for the pending message in the menu matching `locale`
    pub fn pending_entry(&self, locale: &str) -> Option<&MenuEntry> {
        let message = self.pending_message.as_deref()?;
        self.menus
            .iter()
            .find(|m| same_locale_group(&m.locale, locale))?
            .messages
            .iter()
            .find(|e| e.sending_message == message)
    }
}

impl Slice for MenuState {
    fn apply(&self, action: &Action) -> Option<Self> {
        match action {
            Action::SetMenuSetting { show_menu, menus } => Some(Self {
                show_menu: *show_menu,
                menus: menus.clone(),
                ..self.clone()
            }),
            Action::SendMenuMessage { activity, message } => Some(Self {
                pending: Some(Arc::clone(activity)),
                pending_message: Some(message.clone()),
                ..self.clone()
            }),
            Action::ToggleMenu => Some(Self {
                show_menu: !self.show_menu,
                ..self.clone()
            }),
            _ => None,
        }
    }
}
