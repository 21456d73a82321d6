//! Language-switch negotiation
//!
//! A switch request is posted like any outbound message. The peer answers
//! with either a known confirmation greeting or a structured
//! `changeLanguage` event; either one moves the session locale and, when a
//! recognizer is held, the recognition language.

use super::envelope;
use crate::error::LanguageError;
use crate::state_machine::activity::Activity;
use crate::state_machine::language::{
    by_confirmation, by_locale, LanguageEntry, CHANGE_LANGUAGE_EVENT,
};
use crate::state_machine::{Action, ChatState, Effect};
use serde_json::Value;

pub(super) fn handle(action: &Action, state: &ChatState) -> Vec<Effect> {
    match action {
        Action::ChangeLanguage { activity, .. } => vec![Effect::PostLanguageChange {
            activity: envelope(activity, state),
        }],
        Action::Receive { activity } => match confirmed_language(activity) {
            Ok(Some(entry)) => apply_language(entry, state),
            Ok(None) => vec![],
            Err(err) => {
                tracing::info!(error = %err, "Ignoring language change");
                vec![]
            }
        },
        _ => vec![],
    }
}

/// The language a received activity confirms, if it is a confirmation at all
fn confirmed_language(activity: &Activity) -> Result<Option<&'static LanguageEntry>, LanguageError> {
    if let Some(value) = activity.value.as_ref().filter(|v| is_change_event(v)) {
        let code = value
            .get("language_code")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return by_locale(code)
            .map(Some)
            .ok_or_else(|| LanguageError::Unsupported {
                code: code.to_string(),
            });
    }
    Ok(activity.text.as_deref().and_then(by_confirmation))
}

fn is_change_event(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some(CHANGE_LANGUAGE_EVENT)
}

fn apply_language(entry: &'static LanguageEntry, state: &ChatState) -> Vec<Effect> {
    let mut effects = Vec::with_capacity(2);
    if let Some(recognizer) = state.language.recognizer.clone() {
        effects.push(Effect::SetRecognizerLanguage {
            recognizer,
            language: entry.recognizer_language,
        });
    }
    effects.push(Effect::dispatch(Action::SetLocale {
        locale: entry.locale.to_string(),
    }));
    effects
}
