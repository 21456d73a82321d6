//! Input shell slice: input buffer plus the listening and speaking machines

use super::action::{Action, InputSource};
use super::state::Slice;
use serde::Serialize;
use std::fmt;

/// Voice input lifecycle
///
/// ```text
/// Stopped → Starting → Started → Stopping → Stopped
/// ```
///
/// `Starting` may go straight to `Stopping` (recognition failed before the
/// stream opened) and `ListeningStop` lands in `Stopped` from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListeningState {
    #[default]
    Stopped,
    Starting,
    Started,
    Stopping,
}

impl ListeningState {
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Stopped, Self::Starting)
                | (Self::Starting, Self::Started)
                | (Self::Starting | Self::Started, Self::Stopping)
                | (Self::Starting | Self::Started | Self::Stopping, Self::Stopped)
        )
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Started)
    }
}

impl fmt::Display for ListeningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakingState {
    #[default]
    Stopped,
    Speaking,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShellState {
    pub input: String,
    pub listening: ListeningState,
    pub speaking: SpeakingState,
    pub last_input_via_speech: bool,
    /// Post typing activities while the user edits the input
    pub send_typing: bool,
}

impl ShellState {
    fn listening_to(&self, target: ListeningState) -> Option<Self> {
        self.listening.can_transition_to(target).then(|| Self {
            listening: target,
            ..self.clone()
        })
    }

    fn speaking_to(&self, target: SpeakingState) -> Option<Self> {
        (self.speaking != target).then(|| Self {
            speaking: target,
            ..self.clone()
        })
    }

    fn with_speech_flag(&self, via_speech: bool) -> Option<Self> {
        (self.last_input_via_speech != via_speech).then(|| Self {
            last_input_via_speech: via_speech,
            ..self.clone()
        })
    }
}

impl Slice for ShellState {
    fn apply(&self, action: &Action) -> Option<Self> {
        match action {
            Action::UpdateInput { input, source } => {
                let via_speech = *source == InputSource::Speech;
                (self.input != *input || self.last_input_via_speech != via_speech).then(|| Self {
                    input: input.clone(),
                    last_input_via_speech: via_speech,
                    ..self.clone()
                })
            }
            Action::ListeningStarting => self.listening_to(ListeningState::Starting),
            Action::ListeningStart => self.listening_to(ListeningState::Started),
            Action::ListeningStopping => self.listening_to(ListeningState::Stopping),
            Action::ListeningStop => self.listening_to(ListeningState::Stopped),
            Action::SpeakingStarted => self.speaking_to(SpeakingState::Speaking),
            Action::SpeakingStopped => self.speaking_to(SpeakingState::Stopped),
            Action::Send { .. } => (!self.input.is_empty()).then(|| Self {
                input: String::new(),
                ..self.clone()
            }),
            Action::SetSendTyping { send_typing } => {
                (self.send_typing != *send_typing).then(|| Self {
                    send_typing: *send_typing,
                    ..self.clone()
                })
            }
            Action::CardActionClicked | Action::LastInputNotSpeech => self.with_speech_flag(false),
            _ => None,
        }
    }
}
