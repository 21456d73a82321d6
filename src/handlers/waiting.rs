//! Waiting placeholders and the idle-interval timer

use super::is_from_peer;
use crate::state_machine::settings::interval_placeholder;
use crate::state_machine::{Action, ChatState, Effect};
use chrono::Utc;
use std::sync::Arc;

pub(super) fn handle(action: &Action, state: &ChatState) -> Vec<Effect> {
    let settings = &state.settings;
    match action {
        Action::Send { .. }
        | Action::ChangeLanguage { .. }
        | Action::SendMenuMessage { .. }
        | Action::SubmitForm
        | Action::HistoryDidMount => {
            let mut effects = vec![Effect::NotifyExternalContent];
            if let Some(waiting) = settings.waiting() {
                let placeholder = waiting.placeholder(state.locale(), Utc::now());
                effects.push(Effect::dispatch(Action::PushWaitingMessage {
                    activity: Arc::new(placeholder),
                }));
            }
            effects
        }

        Action::Receive { activity } if is_from_peer(activity, state) => reply_arrived(state),
        Action::ResetChangeLanguage => reply_arrived(state),

        Action::WaitInterval => {
            if !settings.interval.available {
                return vec![];
            }
            if state.history.last().is_some_and(|a| a.is_idle_placeholder()) {
                tracing::debug!("Placeholder already shown, skipping idle tick");
                return vec![];
            }
            let placeholder = interval_placeholder(settings.waiting(), state.locale(), Utc::now());
            vec![Effect::dispatch(Action::PushWaitingMessage {
                activity: Arc::new(placeholder),
            })]
        }

        Action::EnableIntervalController { .. } | Action::SetIntervalTime { .. }
            if settings.interval.enabled =>
        {
            vec![Effect::RestartIdleInterval {
                period: settings.interval.period(),
            }]
        }

        _ => vec![],
    }
}

fn reply_arrived(state: &ChatState) -> Vec<Effect> {
    let mut effects = vec![Effect::ResetIdleCountdown];
    if state.settings.waiting().is_some() || state.settings.interval.available {
        effects.push(Effect::dispatch(Action::RemoveWaitingMessage));
    }
    effects
}
