//! Collaborator interfaces
//!
//! The transport, the speech engines and the external-content hook are owned
//! by the surrounding application. The runtime only ever holds them behind
//! these traits, so tests swap in the mocks from `testing`.

use crate::error::{HookError, TransportError, VoiceError};
use crate::state_machine::{Activity, RecognitionRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Posts activities to the conversational peer
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post `activity`, returning the server-assigned id
    async fn post(&self, activity: &Activity) -> Result<String, TransportError>;
}

/// Progress reported by a running recognizer
#[derive(Debug)]
pub enum RecognitionEvent {
    Partial(String),
    Final(String),
    /// Audio capture is live
    AudioStreamStarted,
    Failed(VoiceError),
}

/// Where a recognizer reports progress for one session
#[derive(Debug, Clone)]
pub struct RecognitionSink(mpsc::UnboundedSender<RecognitionEvent>);

impl RecognitionSink {
    pub fn new(tx: mpsc::UnboundedSender<RecognitionEvent>) -> Self {
        Self(tx)
    }

    pub fn partial(&self, text: impl Into<String>) {
        let _ = self.0.send(RecognitionEvent::Partial(text.into()));
    }

    pub fn final_result(&self, text: impl Into<String>) {
        let _ = self.0.send(RecognitionEvent::Final(text.into()));
    }

    pub fn stream_started(&self) {
        let _ = self.0.send(RecognitionEvent::AudioStreamStarted);
    }

    pub fn failed(&self, error: VoiceError) {
        let _ = self.0.send(RecognitionEvent::Failed(error));
    }
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    fn is_available(&self) -> bool;

    /// Begin a recognition session reporting through `sink`
    async fn start_recognizing(
        &self,
        request: &RecognitionRequest,
        sink: RecognitionSink,
    ) -> Result<(), VoiceError>;

    async fn stop_recognizing(&self);

    /// Prepare the engine ahead of the first session
    fn warmup(&self) {}

    fn set_language(&self, language: &str);
}

/// Called once speech output has actually started
pub type OnSpeechStarted = Box<dyn FnOnce() + Send>;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text`; resolves when the utterance finishes
    async fn speak(
        &self,
        text: &str,
        locale: &str,
        on_started: Option<OnSpeechStarted>,
    ) -> Result<(), VoiceError>;

    async fn stop_speaking(&self);
}

/// External content module notified when a message goes out
pub trait ExternalContentHook: Send + Sync {
    fn is_active(&self) -> bool;

    fn on_sent(&self) -> Result<(), HookError>;
}

/// Optional collaborators of a runtime
#[derive(Clone, Default)]
pub struct Collaborators {
    pub recognizer: Option<Arc<dyn SpeechRecognizer>>,
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    pub hook: Option<Arc<dyn ExternalContentHook>>,
}

impl Collaborators {
    pub fn with_recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn ExternalContentHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn recognition_available(&self) -> bool {
        self.recognizer.as_ref().is_some_and(|r| r.is_available())
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("recognizer", &self.recognizer.is_some())
            .field("synthesizer", &self.synthesizer.is_some())
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn post(&self, activity: &Activity) -> Result<String, TransportError> {
        (**self).post(activity).await
    }
}
