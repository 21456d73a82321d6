//! Session settings slice: waiting placeholders, speech preferences and the
//! idle-interval controller

use super::action::Action;
use super::activity::{
    Activity, ActivityKind, Attachment, ChannelAccount, TextFormat, WAITING_CSS_ID,
    WAITING_IMAGE_ID, WAITING_INTERVAL_ID, WAITING_STRING_ID,
};
use super::state::Slice;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_INTERVAL_TEXT: &str = "waiting for the next message";
const CSS_PLACEHOLDER_TEXT: &str = "use css";
const PLACEHOLDER_SENDER: &str = "waiting";

/// What a waiting placeholder shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaitingKind {
    /// Plain text
    Message,
    /// Styling marker rendered by the host
    Css,
    /// Media attachment with this content type
    Media { content_type: String },
}

/// Configured waiting-message descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingMessage {
    pub kind: WaitingKind,
    pub content: String,
}

impl WaitingMessage {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            kind: WaitingKind::Message,
            content: text.into(),
        }
    }

    pub fn media(content_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: WaitingKind::Media {
                content_type: content_type.into(),
            },
            content: url.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// Placeholder pushed after an outbound user action
    pub fn placeholder(&self, locale: &str, now: DateTime<Utc>) -> Activity {
        let base = placeholder_base(locale, now);
        match &self.kind {
            WaitingKind::Message => Activity {
                text: Some(self.content.clone()),
                ..base
            }
            .with_id(WAITING_STRING_ID),
            WaitingKind::Css => Activity {
                text: Some(CSS_PLACEHOLDER_TEXT.to_string()),
                ..base
            }
            .with_id(WAITING_CSS_ID),
            WaitingKind::Media { content_type } => Activity {
                text_format: None,
                attachments: vec![Attachment::media(content_type.as_str(), self.content.as_str())],
                ..base
            }
            .with_id(WAITING_IMAGE_ID),
        }
    }
}

/// Placeholder injected by the idle timer
pub fn interval_placeholder(
    waiting: Option<&WaitingMessage>,
    locale: &str,
    now: DateTime<Utc>,
) -> Activity {
    let base = placeholder_base(locale, now);
    let activity = match waiting.filter(|w| w.is_valid()) {
        Some(WaitingMessage {
            kind: WaitingKind::Media { content_type },
            content,
        }) => Activity {
            text_format: None,
            attachments: vec![Attachment::media(content_type.as_str(), content.as_str())],
            ..base
        },
        Some(WaitingMessage {
            kind: WaitingKind::Message,
            content,
        }) => Activity {
            text: Some(content.clone()),
            ..base
        },
        _ => Activity {
            text: Some(DEFAULT_INTERVAL_TEXT.to_string()),
            ..base
        },
    };
    activity.with_id(WAITING_INTERVAL_ID)
}

fn placeholder_base(locale: &str, now: DateTime<Utc>) -> Activity {
    Activity {
        kind: ActivityKind::Message,
        from: ChannelAccount::anonymous(PLACEHOLDER_SENDER),
        locale: Some(locale.to_string()),
        text_format: Some(TextFormat::Plain),
        timestamp: Some(now),
        ..Activity::default()
    }
}

/// Idle-interval timer settings.
///
/// The timer itself lives in the runtime; this value only records what the
/// timer should be doing and changes exclusively through actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalController {
    pub seconds: u32,
    /// Set by `EnableIntervalController`; the timer runs only when enabled
    pub enabled: bool,
    /// Set on the first outbound user action; ticks are ignored until then
    pub available: bool,
}

impl Default for IntervalController {
    fn default() -> Self {
        Self {
            seconds: Self::MIN_SECONDS,
            enabled: false,
            available: false,
        }
    }
}

impl IntervalController {
    pub const MIN_SECONDS: u32 = 1;

    pub fn period(&self) -> Duration {
        Duration::from_secs(u64::from(self.seconds))
    }

    fn with_seconds(self, seconds: u32) -> Self {
        Self {
            seconds: seconds.max(Self::MIN_SECONDS),
            ..self
        }
    }

    fn step(self, scale: i32) -> Self {
        self.with_seconds(self.seconds.saturating_add_signed(scale))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettingsState {
    pub waiting_message: Option<WaitingMessage>,
    pub auto_listen_after_speak: bool,
    pub always_speak: bool,
    pub configurable: bool,
    pub show_config: bool,
    pub interval: IntervalController,
    pub conversation_id: Option<String>,
    /// Session payload merged into every outbound envelope
    pub channel_data: Option<Value>,
}

impl SettingsState {
    /// The waiting descriptor, if one is configured and usable
    pub fn waiting(&self) -> Option<&WaitingMessage> {
        self.waiting_message.as_ref().filter(|w| w.is_valid())
    }

    fn with_interval(&self, interval: IntervalController) -> Option<Self> {
        (self.interval != interval).then(|| Self {
            interval,
            ..self.clone()
        })
    }
}

impl Slice for SettingsState {
    fn apply(&self, action: &Action) -> Option<Self> {
        match action {
            Action::SetCustomSettings { waiting_message } => Some(Self {
                waiting_message: waiting_message.clone(),
                ..self.clone()
            }),
            Action::SetAutoListen {
                auto_listen_after_speak,
                always_speak,
            } => Some(Self {
                auto_listen_after_speak: *auto_listen_after_speak,
                always_speak: *always_speak,
                ..self.clone()
            }),
            Action::ToggleAlwaysSpeak => Some(Self {
                always_speak: !self.always_speak,
                ..self.clone()
            }),
            Action::ToggleAutoListenAfterSpeak => Some(Self {
                auto_listen_after_speak: !self.auto_listen_after_speak,
                ..self.clone()
            }),
            Action::EnableConfiguration => (!self.configurable).then(|| Self {
                configurable: true,
                ..self.clone()
            }),
            Action::ToggleConfig => Some(Self {
                show_config: !self.show_config,
                ..self.clone()
            }),
            Action::EnableIntervalController { seconds } => self.with_interval(IntervalController {
                enabled: true,
                ..self.interval.with_seconds(*seconds)
            }),
            Action::SetIntervalTime { scale } => self.with_interval(self.interval.step(*scale)),
            Action::TurnOnSettings => self.with_interval(IntervalController {
                available: true,
                ..self.interval
            }),
            Action::SetChannelData { payload } => Some(Self {
                channel_data: payload.clone(),
                ..self.clone()
            }),
            Action::SaveConversationId { conversation_id } => Some(Self {
                conversation_id: Some(conversation_id.clone()),
                ..self.clone()
            }),
            _ => None,
        }
    }
}
