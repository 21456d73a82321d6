//! Session policy reacting to outbound user actions

use super::is_from_peer;
use crate::state_machine::activity::{Activity, ChannelAccount, TextFormat, TIMEOUT_ALERT_ID};
use crate::state_machine::{Action, ChatState, Effect};

const TIMEOUT_ALERT_TEXT: &str = "The response is taking longer than usual.";

pub(super) fn handle(action: &Action, state: &ChatState) -> Vec<Effect> {
    let mut effects = Vec::new();

    if matches!(
        action,
        Action::Send { .. } | Action::ChangeLanguage { .. } | Action::SendMenuMessage { .. }
    ) && !(state.connection.speaker_enabled && state.settings.interval.available)
    {
        effects.push(Effect::dispatch(Action::TurnOnSettings));
    }

    if matches!(
        action,
        Action::ChangeLanguage { .. } | Action::SendMenuMessage { .. } | Action::SubmitForm
    ) && state.shell.last_input_via_speech
    {
        effects.push(Effect::dispatch(Action::LastInputNotSpeech));
    }

    if action.awaits_reply() {
        effects.push(Effect::ArmResponseTimeout {
            alert: timeout_alert(state.locale()),
        });
    }

    let replied = match action {
        Action::Receive { activity } => is_from_peer(activity, state),
        Action::ResetChangeLanguage => true,
        _ => false,
    };
    if replied {
        effects.push(Effect::CancelResponseTimeout);
    }

    effects
}

fn timeout_alert(locale: &str) -> Activity {
    Activity {
        from: ChannelAccount::anonymous("timeout"),
        text: Some(TIMEOUT_ALERT_TEXT.to_string()),
        text_format: Some(TextFormat::Plain),
        locale: Some(locale.to_string()),
        timestamp: Some(chrono::Utc::now()),
        ..Activity::default()
    }
    .with_id(TIMEOUT_ALERT_ID)
}
