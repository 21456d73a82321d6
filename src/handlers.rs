//! Effect handlers
//!
//! Each handler observes every reduced action together with the resulting
//! snapshot and returns the effects it wants executed. Handlers never write
//! state; follow-up actions go back through the log as [`Effect::Dispatch`].

mod language;
mod menu;
mod send;
mod session;
mod speech;
mod typing;
mod voice;
mod waiting;

use crate::state_machine::activity::{channel_keys, Activity, ChannelAccount};
use crate::state_machine::{Action, ChatState, Effect};
use serde_json::{json, Value};

pub use speech::speech_text;

/// A handler reacts to one reduced action
pub type Handler = fn(&Action, &ChatState) -> Vec<Effect>;

/// Ordered set of named handlers
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: Vec<(&'static str, Handler)>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl HandlerRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Every handler the chat engine runs
    pub fn standard() -> Self {
        Self::empty()
            .with("send", send::handle)
            .with("session", session::handle)
            .with("waiting", waiting::handle)
            .with("typing", typing::handle)
            .with("voice", voice::handle)
            .with("speech", speech::handle)
            .with("language", language::handle)
            .with("menu", menu::handle)
    }

    #[must_use]
    pub fn with(mut self, name: &'static str, handler: Handler) -> Self {
        self.handlers.push((name, handler));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.iter().map(|(name, _)| *name)
    }

    /// Run every handler in registration order
    pub fn run(&self, action: &Action, state: &ChatState) -> Vec<Effect> {
        self.handlers
            .iter()
            .flat_map(|(_, handler)| handler(action, state))
            .collect()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Announced on the first outbound envelope of a session
pub fn client_capabilities() -> Value {
    json!({
        "type": "ClientCapabilities",
        "requiresBotState": true,
        "supportsTts": true,
        "supportsListening": true
    })
}

/// Outbound copy of `activity` with session-level additions
pub(crate) fn envelope(activity: &Activity, state: &ChatState) -> Activity {
    let mut envelope = activity.clone();
    if state.history.is_first_outbound() {
        envelope.entities.push(client_capabilities());
    }
    if let Some(payload) = &state.settings.channel_data {
        envelope
            .channel_data
            .insert(channel_keys::PAYLOAD, payload.clone());
    }
    envelope
}

/// A peer-originated activity, as opposed to the echo of a local send
pub(crate) fn is_from_peer(activity: &Activity, state: &ChatState) -> bool {
    let user: &ChannelAccount = &state.connection.user;
    activity.correlation_id().is_none() && (user.id.is_none() || activity.from.id != user.id)
}
