//! Actions appended to the action log

use super::activity::{Activity, ChannelAccount, CorrelationId};
use super::connection::{ConnectionStatus, TransportHandle};
use super::language::RecognizerHandle;
use super::menu::LocaleMenu;
use super::settings::WaitingMessage;
use serde_json::Value;
use std::sync::Arc;

/// Where an input buffer update came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Text,
    Speech,
}

/// Every stimulus the engine reacts to
#[derive(Debug, Clone)]
pub enum Action {
    // History
    /// Optimistic local send; the reducer mints a correlation id
    Send { activity: Arc<Activity> },
    SendTry { correlation_id: CorrelationId },
    SendAcknowledge {
        correlation_id: CorrelationId,
        id: String,
    },
    SendFailed { correlation_id: CorrelationId },
    Retry { correlation_id: CorrelationId },
    /// Server-originated activity (peer message or echo of a local send)
    Receive { activity: Arc<Activity> },
    ShowTyping { activity: Arc<Activity> },
    ClearTyping { id: String },
    /// Select by server id; `None` clears the selection
    SelectActivity { id: Option<String> },
    /// A suggested action under the activity with this server id was taken
    TakeSuggestedAction { id: String },
    PushWaitingMessage { activity: Arc<Activity> },
    RemoveWaitingMessage,
    TimeoutAlert { activity: Arc<Activity> },

    // Shell
    UpdateInput { input: String, source: InputSource },
    ListeningStarting,
    ListeningStart,
    ListeningStopping,
    ListeningStop,
    Speak {
        text: String,
        locale: String,
        auto_listen_after_speak: bool,
    },
    SpeakingStarted,
    SpeakingStopped,
    StopSpeaking,
    CardActionClicked,
    LastInputNotSpeech,
    SetSendTyping { send_typing: bool },

    // Connection
    StartConnection {
        transport: TransportHandle,
        user: ChannelAccount,
        bot: ChannelAccount,
    },
    ConnectionChange { status: ConnectionStatus },
    /// Speaker enabled and interval controller made available
    TurnOnSettings,

    // Format
    SetLocale { locale: String },
    SetChatTitle { title: Option<String> },
    SetMeasurements { carousel_margin: Option<u32> },
    ToggleUploadButton { show: bool },

    // Settings, waiting placeholders, idle interval
    SetCustomSettings { waiting_message: Option<WaitingMessage> },
    SetAutoListen {
        auto_listen_after_speak: bool,
        always_speak: bool,
    },
    ToggleAlwaysSpeak,
    ToggleAutoListenAfterSpeak,
    EnableConfiguration,
    ToggleConfig,
    EnableIntervalController { seconds: u32 },
    SetIntervalTime { scale: i32 },
    WaitInterval,
    SetChannelData { payload: Option<Value> },
    SaveConversationId { conversation_id: String },
    HistoryDidMount,
    SubmitForm,

    // Language switch
    ChangeLanguage {
        activity: Arc<Activity>,
        language: String,
    },
    ChangedLanguage,
    ChangeLanguageFail,
    ResetChangeLanguage,
    SaveRecognizer { recognizer: RecognizerHandle },
    SetLanguageSetting {
        display: bool,
        languages: Vec<String>,
    },

    // Menu
    SetMenuSetting {
        show_menu: bool,
        menus: Vec<LocaleMenu>,
    },
    SendMenuMessage {
        activity: Arc<Activity>,
        message: String,
    },
    PushMenuMessage { activity: Arc<Activity> },
    SentMenuMessage,
    SendMenuMessageFail,
    ToggleMenu,
}

impl Action {
    /// Stable name used for logging and the action log
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Send { .. } => "send",
            Action::SendTry { .. } => "send_try",
            Action::SendAcknowledge { .. } => "send_acknowledge",
            Action::SendFailed { .. } => "send_failed",
            Action::Retry { .. } => "retry",
            Action::Receive { .. } => "receive",
            Action::ShowTyping { .. } => "show_typing",
            Action::ClearTyping { .. } => "clear_typing",
            Action::SelectActivity { .. } => "select_activity",
            Action::TakeSuggestedAction { .. } => "take_suggested_action",
            Action::PushWaitingMessage { .. } => "push_waiting_message",
            Action::RemoveWaitingMessage => "remove_waiting_message",
            Action::TimeoutAlert { .. } => "timeout_alert",
            Action::UpdateInput { .. } => "update_input",
            Action::ListeningStarting => "listening_starting",
            Action::ListeningStart => "listening_start",
            Action::ListeningStopping => "listening_stopping",
            Action::ListeningStop => "listening_stop",
            Action::Speak { .. } => "speak",
            Action::SpeakingStarted => "speaking_started",
            Action::SpeakingStopped => "speaking_stopped",
            Action::StopSpeaking => "stop_speaking",
            Action::CardActionClicked => "card_action_clicked",
            Action::LastInputNotSpeech => "last_input_not_speech",
            Action::SetSendTyping { .. } => "set_send_typing",
            Action::StartConnection { .. } => "start_connection",
            Action::ConnectionChange { .. } => "connection_change",
            Action::TurnOnSettings => "turn_on_settings",
            Action::SetLocale { .. } => "set_locale",
            Action::SetChatTitle { .. } => "set_chat_title",
            Action::SetMeasurements { .. } => "set_measurements",
            Action::ToggleUploadButton { .. } => "toggle_upload_button",
            Action::SetCustomSettings { .. } => "set_custom_settings",
            Action::SetAutoListen { .. } => "set_auto_listen",
            Action::ToggleAlwaysSpeak => "toggle_always_speak",
            Action::ToggleAutoListenAfterSpeak => "toggle_auto_listen_after_speak",
            Action::EnableConfiguration => "enable_configuration",
            Action::ToggleConfig => "toggle_config",
            Action::EnableIntervalController { .. } => "enable_interval_controller",
            Action::SetIntervalTime { .. } => "set_interval_time",
            Action::WaitInterval => "wait_interval",
            Action::SetChannelData { .. } => "set_channel_data",
            Action::SaveConversationId { .. } => "save_conversation_id",
            Action::HistoryDidMount => "history_did_mount",
            Action::SubmitForm => "submit_form",
            Action::ChangeLanguage { .. } => "change_language",
            Action::ChangedLanguage => "changed_language",
            Action::ChangeLanguageFail => "change_language_fail",
            Action::ResetChangeLanguage => "reset_change_language",
            Action::SaveRecognizer { .. } => "save_recognizer",
            Action::SetLanguageSetting { .. } => "set_language_setting",
            Action::SetMenuSetting { .. } => "set_menu_setting",
            Action::SendMenuMessage { .. } => "send_menu_message",
            Action::PushMenuMessage { .. } => "push_menu_message",
            Action::SentMenuMessage => "sent_menu_message",
            Action::SendMenuMessageFail => "send_menu_message_fail",
            Action::ToggleMenu => "toggle_menu",
        }
    }

    pub fn send(activity: Activity) -> Self {
        Action::Send {
            activity: Arc::new(activity),
        }
    }

    pub fn receive(activity: Activity) -> Self {
        Action::Receive {
            activity: Arc::new(activity),
        }
    }

    pub fn send_acknowledge(correlation_id: CorrelationId, id: impl Into<String>) -> Self {
        Action::SendAcknowledge {
            correlation_id,
            id: id.into(),
        }
    }

    pub fn speech_input(input: impl Into<String>) -> Self {
        Action::UpdateInput {
            input: input.into(),
            source: InputSource::Speech,
        }
    }

    /// Outbound user actions that wait for a peer reply
    pub fn awaits_reply(&self) -> bool {
        matches!(
            self,
            Action::Send { .. }
                | Action::ChangeLanguage { .. }
                | Action::SendMenuMessage { .. }
                | Action::SubmitForm
        )
    }
}
