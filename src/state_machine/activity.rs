//! Conversation activity records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Well-known `channelData` keys
pub mod channel_keys {
    pub const CLIENT_ACTIVITY_ID: &str = "clientActivityId";
    pub const POST_BACK: &str = "postBack";
    pub const PAYLOAD: &str = "payload";
    pub const SPEECH_OUTPUT: &str = "speechOutput";
    pub const SPEAK_TEXT: &str = "speakText";
    pub const BOT_STATE: &str = "botState";
}

/// Identifiers of synthetic placeholder activities
pub const WAITING_STRING_ID: &str = "waitingString";
pub const WAITING_CSS_ID: &str = "waitingCss";
pub const WAITING_IMAGE_ID: &str = "waitingImage";
pub const WAITING_INTERVAL_ID: &str = "waitingInterval";
pub const TIMEOUT_ALERT_ID: &str = "timeoutAlert";

pub const PLACEHOLDER_IDS: [&str; 4] = [
    WAITING_STRING_ID,
    WAITING_CSS_ID,
    WAITING_IMAGE_ID,
    WAITING_INTERVAL_ID,
];

/// Placeholders that already stand in for an idle tick; styling markers do not
pub const IDLE_PLACEHOLDER_IDS: [&str; 3] = [WAITING_STRING_ID, WAITING_IMAGE_ID, WAITING_INTERVAL_ID];

/// Bot state value that asks the client to listen right after speaking
pub const WAITING_FOR_ANSWER: &str = "WaitingForAnswerToQuestion";

/// Locally minted identifier linking an optimistic send to its acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wire value of the retry sentinel
pub const RETRY_SENTINEL: &str = "retry";

/// Server identity of an activity.
///
/// `Failed` is the retry sentinel: the activity exists but its last post
/// failed. `Unassigned` means it has never been acknowledged (or a retry
/// cleared the sentinel and it is eligible to be re-sent).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum ActivityId {
    #[default]
    Unassigned,
    Failed,
    Assigned(String),
}

impl ActivityId {
    pub fn assigned(id: impl Into<String>) -> Self {
        Self::Assigned(id.into())
    }

    /// The server id, if one has been assigned
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Assigned(id) => Some(id),
            Self::Unassigned | Self::Failed => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, Self::Assigned(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Whether the id is "defined" (assigned or carrying the retry sentinel)
    pub fn is_defined(&self) -> bool {
        !matches!(self, Self::Unassigned)
    }
}

impl From<Option<String>> for ActivityId {
    fn from(value: Option<String>) -> Self {
        match value {
            None => Self::Unassigned,
            Some(id) if id == RETRY_SENTINEL => Self::Failed,
            Some(id) => Self::Assigned(id),
        }
    }
}

impl From<ActivityId> for Option<String> {
    fn from(value: ActivityId) -> Self {
        match value {
            ActivityId::Unassigned => None,
            ActivityId::Failed => Some(RETRY_SENTINEL.to_string()),
            ActivityId::Assigned(id) => Some(id),
        }
    }
}

/// Participant identity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelAccount {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }

    /// Synthetic sender with no id (placeholders, alerts)
    pub fn anonymous(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    #[default]
    Message,
    Typing,
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    Plain,
    Markdown,
    Xml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputHint {
    AcceptingInput,
    ExpectingInput,
    IgnoringInput,
}

/// Media or card attachment
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: String,
    #[serde(default)]
    pub content_url: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Attachment {
    pub fn media(content_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            content_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Card title, used as a last resort when choosing text to speak
    pub fn title(&self) -> Option<&str> {
        self.content
            .as_ref()
            .and_then(|c| c.get("title"))
            .and_then(Value::as_str)
    }
}

/// Quick replies offered under a message until one is taken
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SuggestedActions {
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub actions: Vec<Value>,
}

/// Open key-value side channel with a few well-known keys.
///
/// Shape is validated once, when constructed from an untyped value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelData(Map<String, Value>);

impl ChannelData {
    /// Accept only JSON objects (or null, as empty)
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            Value::Null => Some(Self::default()),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.0
            .get(channel_keys::CLIENT_ACTIVITY_ID)
            .and_then(Value::as_str)
            .map(CorrelationId::new)
    }

    pub fn set_correlation_id(&mut self, id: &CorrelationId) {
        self.insert(
            channel_keys::CLIENT_ACTIVITY_ID,
            Value::String(id.as_str().to_string()),
        );
    }

    pub fn is_postback(&self) -> bool {
        self.0
            .get(channel_keys::POST_BACK)
            .is_some_and(|v| v.as_bool().unwrap_or(!v.is_null()))
    }

    pub fn speak_text(&self) -> Option<&str> {
        self.0
            .get(channel_keys::SPEECH_OUTPUT)
            .and_then(|s| s.get(channel_keys::SPEAK_TEXT))
            .and_then(Value::as_str)
    }

    pub fn bot_state(&self) -> Option<&str> {
        self.0.get(channel_keys::BOT_STATE).and_then(Value::as_str)
    }
}

/// A single conversation message or event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default)]
    pub id: ActivityId,
    #[serde(rename = "type", default)]
    pub kind: ActivityKind,
    #[serde(default)]
    pub from: ChannelAccount,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub text_format: Option<TextFormat>,
    #[serde(default)]
    pub speak: Option<String>,
    #[serde(default)]
    pub input_hint: Option<InputHint>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entities: Vec<Value>,
    #[serde(default)]
    pub channel_data: ChannelData,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub listen_for: Vec<String>,
    #[serde(default)]
    pub suggested_actions: Option<SuggestedActions>,
}

impl Activity {
    /// Plain-text message from `from`
    pub fn message(from: ChannelAccount, text: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            kind: ActivityKind::Message,
            from,
            text: Some(text.into()),
            text_format: Some(TextFormat::Plain),
            locale: Some(locale.into()),
            timestamp: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn typing(id: impl Into<String>, from: ChannelAccount) -> Self {
        Self {
            id: ActivityId::assigned(id),
            kind: ActivityKind::Typing,
            from,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = ActivityId::assigned(id);
        self
    }

    pub fn is_typing(&self) -> bool {
        self.kind == ActivityKind::Typing
    }

    pub fn is_message(&self) -> bool {
        self.kind == ActivityKind::Message
    }

    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.channel_data.correlation_id()
    }

    pub fn server_id(&self) -> Option<&str> {
        self.id.as_str()
    }

    pub fn sender_id(&self) -> Option<&str> {
        self.from.id.as_deref()
    }

    pub fn is_placeholder(&self) -> bool {
        self.server_id()
            .is_some_and(|id| PLACEHOLDER_IDS.contains(&id))
    }

    pub fn is_idle_placeholder(&self) -> bool {
        self.server_id()
            .is_some_and(|id| IDLE_PLACEHOLDER_IDS.contains(&id))
    }

    /// Whether a text format is absent or plain
    pub fn is_plain_text(&self) -> bool {
        matches!(self.text_format, None | Some(TextFormat::Plain))
    }

    /// Whether the sender asked the client to listen after speaking
    pub fn expects_answer(&self) -> bool {
        self.input_hint == Some(InputHint::ExpectingInput)
            || self.channel_data.bot_state() == Some(WAITING_FOR_ANSWER)
    }
}
