//! Speech output: what to say, in which locale, and when to stop

use super::is_from_peer;
use crate::state_machine::activity::Activity;
use crate::state_machine::language::by_confirmation;
use crate::state_machine::shell::SpeakingState;
use crate::state_machine::{Action, ChatState, Effect};
use regex::Regex;
use std::sync::LazyLock;

static URL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"https?://").ok());

pub(super) fn handle(action: &Action, state: &ChatState) -> Vec<Effect> {
    match action {
        Action::Speak {
            text,
            locale,
            auto_listen_after_speak,
        } => {
            let mut effects = vec![Effect::dispatch(Action::ListeningStopping)];
            if !text.is_empty() {
                effects.push(Effect::dispatch(Action::SpeakingStarted));
                effects.push(Effect::SpeakUtterance {
                    text: text.clone(),
                    locale: locale.clone(),
                    auto_listen: *auto_listen_after_speak
                        || state.settings.auto_listen_after_speak,
                });
            }
            effects
        }

        Action::UpdateInput { .. }
        | Action::ListeningStarting
        | Action::Send { .. }
        | Action::CardActionClicked
        | Action::StopSpeaking
            if state.shell.speaking == SpeakingState::Speaking =>
        {
            vec![Effect::StopSpeaking]
        }

        Action::Receive { activity } if should_speak(activity, state) => {
            let Some(text) = speech_text(activity) else {
                return vec![];
            };
            let locale = activity
                .text
                .as_deref()
                .and_then(by_confirmation)
                .map(|entry| entry.locale.to_string())
                .or_else(|| activity.locale.clone())
                .unwrap_or_else(|| state.locale().to_string());
            vec![Effect::dispatch(Action::Speak {
                text,
                locale,
                auto_listen_after_speak: activity.expects_answer(),
            })]
        }

        _ => vec![],
    }
}

fn should_speak(activity: &Activity, state: &ChatState) -> bool {
    activity.is_message()
        && is_from_peer(activity, state)
        && state.connection.speaker_enabled
        && (state.settings.always_speak || state.shell.last_input_via_speech)
}

/// Text to speak for `activity`, cut short before the first URL
pub fn speech_text(activity: &Activity) -> Option<String> {
    let chosen = activity
        .speak
        .as_deref()
        .or_else(|| {
            activity
                .is_plain_text()
                .then_some(activity.text.as_deref())
                .flatten()
        })
        .or_else(|| activity.channel_data.speak_text())
        .or_else(|| activity.attachments.first().and_then(|a| a.title()))?;

    let spoken = URL
        .as_ref()
        .and_then(|re| re.find(chosen))
        .and_then(|url| chosen.get(..url.start()))
        .unwrap_or(chosen);
    let spoken = spoken.trim();
    (!spoken.is_empty()).then(|| spoken.to_string())
}
