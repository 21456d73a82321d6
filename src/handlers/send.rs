//! Optimistic send and retry chain
//!
//! `Send` → `SendTry` → post → `SendAcknowledge` | `SendFailed`, with
//! `Retry` re-entering at `SendTry` for the same correlation id.

use super::envelope;
use crate::state_machine::{Action, ChatState, Effect};

pub(super) fn handle(action: &Action, state: &ChatState) -> Vec<Effect> {
    match action {
        Action::Send { .. } => state
            .history
            .last_minted()
            .map(|correlation_id| Effect::dispatch(Action::SendTry { correlation_id }))
            .into_iter()
            .collect(),

        Action::SendTry { correlation_id } => {
            let Some((_, activity)) = state.history.find_by_correlation(correlation_id) else {
                tracing::debug!(correlation_id = %correlation_id, "Send superseded, nothing to post");
                return vec![];
            };
            if activity.id.is_assigned() {
                tracing::debug!(correlation_id = %correlation_id, "Already acknowledged, not reposting");
                return vec![];
            }
            vec![Effect::PostActivity {
                correlation_id: correlation_id.clone(),
                activity: envelope(activity, state),
            }]
        }

        Action::Retry { correlation_id } => {
            if state.history.find_by_correlation(correlation_id).is_none() {
                tracing::debug!(correlation_id = %correlation_id, "Retry for unknown activity");
                return vec![];
            }
            vec![Effect::dispatch(Action::SendTry {
                correlation_id: correlation_id.clone(),
            })]
        }

        _ => vec![],
    }
}
