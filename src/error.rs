//! Collaborator error types
//!
//! None of these escape the engine; each is turned into an action or a log
//! line at the point where it is observed.

use thiserror::Error;

/// Transport post failure with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Rejected, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unavailable, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection dropped or timed out
    Network,
    /// Peer refused the activity
    Rejected,
    /// No live connection to post through
    Unavailable,
}

impl TransportErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Unavailable)
    }
}

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("speech recognition unavailable")]
    RecognitionUnavailable,
    #[error("speech recognition failed: {0}")]
    Recognition(String),
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
}

#[derive(Debug, Error)]
#[error("external content hook failed: {0}")]
pub struct HookError(pub String);

/// The runtime behind a dispatcher is gone
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("chat runtime has stopped")]
pub struct RuntimeStopped;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LanguageError {
    #[error("unsupported language: {code}")]
    Unsupported { code: String },
}
