//! Effects produced by handlers

use super::action::Action;
use super::activity::{Activity, ChannelAccount, CorrelationId};
use super::language::RecognizerHandle;
use std::time::Duration;

/// Parameters of a recognition session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    pub locale: String,
    /// Grammar hints from the latest message's `listenFor`
    pub grammars: Vec<String>,
    /// Sender of the message built from the final transcript
    pub user: ChannelAccount,
}

/// Work to be executed after an action has been reduced
#[derive(Debug, Clone)]
pub enum Effect {
    /// Append a follow-up action (runs synchronously, in order)
    Dispatch(Action),

    /// Post an optimistic send; resolves to `SendAcknowledge` or `SendFailed`
    PostActivity {
        correlation_id: CorrelationId,
        activity: Activity,
    },

    /// Post a language-change request; resolves to `ChangedLanguage` or
    /// `ChangeLanguageFail`
    PostLanguageChange { activity: Activity },

    /// Post a menu message; resolves to `SentMenuMessage` or
    /// `SendMenuMessageFail`
    PostMenuMessage { activity: Activity },

    /// Post a typing indicator (throttled, failures ignored)
    PostTyping { activity: Activity },

    StartRecognizing(RecognitionRequest),

    /// Stop the recognizer, then dispatch `ListeningStop`
    StopRecognizing,

    ArmSilenceTimeout,
    CancelSilenceTimeout,

    /// Speak an utterance; completion dispatches `SpeakingStopped`, then
    /// `ListeningStarting` when `auto_listen` holds and recognition is
    /// available
    SpeakUtterance {
        text: String,
        locale: String,
        auto_listen: bool,
    },

    /// Interrupt speech output, then dispatch `SpeakingStopped`
    StopSpeaking,

    SetRecognizerLanguage {
        recognizer: RecognizerHandle,
        language: &'static str,
    },

    /// Tell an active external-content module that a message went out
    NotifyExternalContent,

    /// Dispatch `ClearTyping(id)` after the typing TTL
    ScheduleTypingExpiry { id: String },

    /// (Re)start the idle-interval timer with a new period
    RestartIdleInterval { period: Duration },

    /// Restart the idle countdown from zero
    ResetIdleCountdown,

    /// Start the response-timeout countdown; expiry pushes `alert`
    ArmResponseTimeout { alert: Activity },

    CancelResponseTimeout,
}

impl Effect {
    pub fn dispatch(action: Action) -> Self {
        Effect::Dispatch(action)
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::Dispatch(_) => "dispatch",
            Effect::PostActivity { .. } => "post_activity",
            Effect::PostLanguageChange { .. } => "post_language_change",
            Effect::PostMenuMessage { .. } => "post_menu_message",
            Effect::PostTyping { .. } => "post_typing",
            Effect::StartRecognizing(_) => "start_recognizing",
            Effect::StopRecognizing => "stop_recognizing",
            Effect::ArmSilenceTimeout => "arm_silence_timeout",
            Effect::CancelSilenceTimeout => "cancel_silence_timeout",
            Effect::SpeakUtterance { .. } => "speak_utterance",
            Effect::StopSpeaking => "stop_speaking",
            Effect::SetRecognizerLanguage { .. } => "set_recognizer_language",
            Effect::NotifyExternalContent => "notify_external_content",
            Effect::ScheduleTypingExpiry { .. } => "schedule_typing_expiry",
            Effect::RestartIdleInterval { .. } => "restart_idle_interval",
            Effect::ResetIdleCountdown => "reset_idle_countdown",
            Effect::ArmResponseTimeout { .. } => "arm_response_timeout",
            Effect::CancelResponseTimeout => "cancel_response_timeout",
        }
    }
}
