//! Menu messages: resolve the selected entry, then post the pending envelope

use super::envelope;
use crate::state_machine::activity::{Activity, ChannelAccount};
use crate::state_machine::{Action, ChatState, Effect};
use chrono::Utc;
use std::sync::Arc;

const MENU_SENDER: &str = "send message bot";

pub(super) fn handle(action: &Action, state: &ChatState) -> Vec<Effect> {
    match action {
        Action::SendMenuMessage { activity, message } => {
            let Some(entry) = state.menu.pending_entry(state.locale()) else {
                tracing::debug!(message = %message, locale = state.locale(), "No menu entry for message");
                return vec![];
            };
            let now = Utc::now();
            let display = Activity {
                text: Some(entry.display_text().to_string()),
                from: ChannelAccount::new(uuid::Uuid::new_v4().to_string(), MENU_SENDER),
                timestamp: Some(now),
                ..activity.as_ref().clone()
            }
            .with_id(now.to_rfc3339());
            vec![Effect::dispatch(Action::PushMenuMessage {
                activity: Arc::new(display),
            })]
        }
        Action::PushMenuMessage { .. } => match &state.menu.pending {
            Some(pending) => vec![Effect::PostMenuMessage {
                activity: envelope(pending, state),
            }],
            None => vec![],
        },
        _ => vec![],
    }
}
