//! Typing indicators in both directions

use crate::state_machine::activity::{Activity, ActivityKind};
use crate::state_machine::{Action, ChatState, Effect};

pub(super) fn handle(action: &Action, state: &ChatState) -> Vec<Effect> {
    match action {
        Action::ShowTyping { activity } => match activity.server_id() {
            Some(id) => vec![Effect::ScheduleTypingExpiry { id: id.to_string() }],
            None => vec![],
        },
        Action::UpdateInput { .. } if state.shell.send_typing => vec![Effect::PostTyping {
            activity: Activity {
                kind: ActivityKind::Typing,
                from: state.connection.user.clone(),
                locale: Some(state.locale().to_string()),
                ..Activity::default()
            },
        }],
        _ => vec![],
    }
}
