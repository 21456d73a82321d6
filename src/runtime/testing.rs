//! Mock implementations for testing
//!
//! These mocks enable integration testing without a real peer or speech
//! engine.

use super::traits::*;
use super::{ChatRuntime, Dispatcher};
use crate::config::EngineConfig;
use crate::error::{HookError, TransportError, VoiceError};
use crate::handlers::HandlerRegistry;
use crate::state_machine::format::FormatState;
use crate::state_machine::history::HistoryState;
use crate::state_machine::{Activity, ChannelAccount, ChatState, RecognitionRequest};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock Transport
// ============================================================================

/// Transport that returns queued results, acknowledging by default
pub struct MockTransport {
    results: Mutex<VecDeque<Result<String, TransportError>>>,
    posts: Mutex<Vec<Activity>>,
    next_id: AtomicU64,
    delay: Option<Duration>,
    /// Notified on every post (for test synchronization)
    pub posted: Arc<Notify>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            posts: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            delay: None,
            posted: Arc::new(Notify::new()),
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn queue_ack(&self, id: impl Into<String>) {
        self.results.lock().unwrap().push_back(Ok(id.into()));
    }

    pub fn queue_error(&self, error: TransportError) {
        self.results.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_posts(&self) -> Vec<Activity> {
        self.posts.lock().unwrap().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, activity: &Activity) -> Result<String, TransportError> {
        self.posts.lock().unwrap().push(activity.clone());
        self.posted.notify_one();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let queued = self.results.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst))))
    }
}

// ============================================================================
// Scripted Recognizer
// ============================================================================

/// Recognizer that replays scripted events when a session starts.
///
/// The sink of the latest session is kept so tests can report more progress.
pub struct ScriptedRecognizer {
    available: bool,
    script: Mutex<Vec<RecognitionEvent>>,
    start_error: Mutex<Option<VoiceError>>,
    sink: Mutex<Option<RecognitionSink>>,
    requests: Mutex<Vec<RecognitionRequest>>,
    languages: Mutex<Vec<String>>,
    stops: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new(script: Vec<RecognitionEvent>) -> Self {
        Self {
            available: true,
            script: Mutex::new(script),
            start_error: Mutex::new(None),
            sink: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            languages: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(vec![])
        }
    }

    pub fn fail_next_start(&self, error: VoiceError) {
        *self.start_error.lock().unwrap() = Some(error);
    }

    pub fn sink(&self) -> Option<RecognitionSink> {
        self.sink.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<RecognitionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn languages(&self) -> Vec<String> {
        self.languages.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn start_recognizing(
        &self,
        request: &RecognitionRequest,
        sink: RecognitionSink,
    ) -> Result<(), VoiceError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(error) = self.start_error.lock().unwrap().take() {
            return Err(error);
        }
        for event in self.script.lock().unwrap().drain(..) {
            match event {
                RecognitionEvent::Partial(text) => sink.partial(text),
                RecognitionEvent::Final(text) => sink.final_result(text),
                RecognitionEvent::AudioStreamStarted => sink.stream_started(),
                RecognitionEvent::Failed(error) => sink.failed(error),
            }
        }
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    async fn stop_recognizing(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn set_language(&self, language: &str) {
        self.languages.lock().unwrap().push(language.to_string());
    }
}

// ============================================================================
// Recording Synthesizer
// ============================================================================

/// Synthesizer that records utterances and finishes after an optional delay
pub struct RecordingSynthesizer {
    utterances: Mutex<Vec<(String, String)>>,
    delay: Option<Duration>,
    stops: AtomicUsize,
}

impl RecordingSynthesizer {
    pub fn new() -> Self {
        Self {
            utterances: Mutex::new(Vec::new()),
            delay: None,
            stops: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn utterances(&self) -> Vec<(String, String)> {
        self.utterances.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynthesizer {
    async fn speak(
        &self,
        text: &str,
        locale: &str,
        on_started: Option<OnSpeechStarted>,
    ) -> Result<(), VoiceError> {
        self.utterances
            .lock()
            .unwrap()
            .push((text.to_string(), locale.to_string()));
        if let Some(on_started) = on_started {
            on_started();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn stop_speaking(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Mock Hook
// ============================================================================

pub struct MockHook {
    active: bool,
    fail: bool,
    calls: AtomicUsize,
}

impl MockHook {
    pub fn new(active: bool, fail: bool) -> Self {
        Self {
            active,
            fail,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ExternalContentHook for MockHook {
    fn is_active(&self) -> bool {
        self.active
    }

    fn on_sent(&self) -> Result<(), HookError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(HookError("contents not ready".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Test Session
// ============================================================================

/// A running runtime connected to a [`MockTransport`]
pub struct TestSession {
    pub dispatcher: Dispatcher,
    pub transport: Arc<MockTransport>,
}

impl TestSession {
    pub async fn start(config: EngineConfig, collaborators: Collaborators) -> Self {
        Self::start_with(MockTransport::new(), config, collaborators).await
    }

    pub async fn start_with(
        transport: MockTransport,
        config: EngineConfig,
        collaborators: Collaborators,
    ) -> Self {
        let transport = Arc::new(transport);
        let (dispatcher, _) = detached_runtime(config, collaborators).spawn();
        let as_dyn: Arc<dyn Transport> = transport.clone();
        dispatcher
            .start_connection(&as_dyn, ChannelAccount::new("user", "User"), ChannelAccount::new("bot", "Bot"))
            .unwrap();
        let session = Self {
            dispatcher,
            transport,
        };
        session.until(|s| s.connection.transport().is_some()).await;
        session
    }

    /// Wait (in virtual time) for a state matching `predicate`
    pub async fn until(&self, predicate: impl FnMut(&ChatState) -> bool) -> ChatState {
        tokio::time::timeout(Duration::from_secs(60), self.dispatcher.wait_for(predicate))
            .await
            .expect("timed out waiting for state")
            .expect("runtime stopped")
    }
}

/// Runtime with deterministic correlation ids and no transport
pub fn detached_runtime(config: EngineConfig, collaborators: Collaborators) -> ChatRuntime {
    ChatRuntime::with_state(
        config,
        collaborators,
        ChatState::new(HistoryState::with_base("test"), FormatState::default()),
        HandlerRegistry::standard(),
    )
}

pub fn bot_message(id: &str, text: &str) -> Activity {
    Activity::message(ChannelAccount::new("bot", "Bot"), text, "en-us").with_id(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::client_capabilities;
    use crate::state_machine::activity::{InputHint, TIMEOUT_ALERT_ID, WAITING_INTERVAL_ID};
    use crate::state_machine::shell::{ListeningState, SpeakingState};
    use crate::state_machine::{Action, CorrelationId};

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    #[tokio::test]
    async fn test_mock_transport_defaults_to_ack() {
        let transport = MockTransport::new();
        transport.queue_error(TransportError::network("reset"));
        let activity = bot_message("x", "hi");
        assert!(transport.post(&activity).await.is_err());
        assert_eq!(transport.post(&activity).await.unwrap(), "srv-1");
        assert_eq!(transport.recorded_posts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_is_acknowledged() {
        let session = TestSession::start(config(), Collaborators::default()).await;
        session.transport.queue_ack("srv1");
        session.dispatcher.send_message("hello").unwrap();

        let state = session
            .until(|s| s.history.activities.first().is_some_and(|a| a.id.is_assigned()))
            .await;
        let sent = &state.history.activities[0];
        assert_eq!(sent.server_id(), Some("srv1"));
        assert_eq!(sent.correlation_id(), Some(CorrelationId::new("test.0")));
        assert_eq!(sent.sender_id(), Some("user"));

        let posts = session.transport.recorded_posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].entities, vec![client_capabilities()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_send_then_retry() {
        let session = TestSession::start(config(), Collaborators::default()).await;
        session.transport.queue_error(TransportError::network("connection reset"));
        session.transport.queue_ack("srv2");
        session.dispatcher.send_message("hi").unwrap();

        session
            .until(|s| s.history.activities.first().is_some_and(|a| a.id.is_failed()))
            .await;

        session.dispatcher.retry(CorrelationId::new("test.0")).unwrap();
        let state = session
            .until(|s| s.history.activities.first().is_some_and(|a| a.id.is_assigned()))
            .await;
        assert_eq!(state.history.activities.len(), 1);
        assert_eq!(state.history.activities[0].server_id(), Some("srv2"));
        assert_eq!(session.transport.recorded_posts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_without_transport_fails() {
        let (dispatcher, _) = detached_runtime(config(), Collaborators::default()).spawn();
        dispatcher.send_message("anyone?").unwrap();
        let state = tokio::time::timeout(
            Duration::from_secs(5),
            dispatcher.wait_for(|s| s.history.activities.first().is_some_and(|a| a.id.is_failed())),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(state.history.activities.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_timeout_stops_listening() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![RecognitionEvent::AudioStreamStarted]));
        let collaborators = Collaborators::default().with_recognizer(recognizer.clone());
        let session = TestSession::start(config(), collaborators).await;

        session.dispatcher.start_listening().unwrap();
        session.until(|s| s.shell.listening == ListeningState::Started).await;
        let started = tokio::time::Instant::now();

        session.until(|s| s.shell.listening == ListeningState::Stopped).await;
        assert!(started.elapsed() >= config().silence_timeout);
        assert_eq!(recognizer.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_cancels_silence_timeout() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![RecognitionEvent::AudioStreamStarted]));
        let collaborators = Collaborators::default().with_recognizer(recognizer.clone());
        let session = TestSession::start(config(), collaborators).await;

        session.dispatcher.start_listening().unwrap();
        session.until(|s| s.shell.listening == ListeningState::Started).await;
        recognizer.sink().unwrap().partial("what ti");
        session.until(|s| s.shell.input == "what ti").await;

        tokio::time::sleep(config().silence_timeout * 2).await;
        assert_eq!(session.dispatcher.snapshot().shell.listening, ListeningState::Started);
        assert_eq!(recognizer.stop_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_transcript_is_sent() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![
            RecognitionEvent::AudioStreamStarted,
            RecognitionEvent::Final("book a table.".to_string()),
        ]));
        let collaborators = Collaborators::default().with_recognizer(recognizer.clone());
        let session = TestSession::start(config(), collaborators).await;

        session.dispatcher.start_listening().unwrap();
        let state = session
            .until(|s| {
                s.shell.listening == ListeningState::Stopped
                    && s.history.activities.first().is_some_and(|a| a.id.is_assigned())
            })
            .await;
        assert_eq!(state.history.activities[0].text.as_deref(), Some("book a table"));
        assert!(state.shell.last_input_via_speech);
        assert!(state.shell.input.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_recognizer_returns_to_stopped() {
        let collaborators =
            Collaborators::default().with_recognizer(Arc::new(ScriptedRecognizer::unavailable()));
        let session = TestSession::start(config(), collaborators).await;
        assert_eq!(
            listening_cycle(&session).await,
            vec!["listening_starting", "listening_stopping", "listening_stop"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recognition_start_failure_returns_to_stopped() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![]));
        recognizer.fail_next_start(VoiceError::Recognition("microphone busy".to_string()));
        let collaborators = Collaborators::default().with_recognizer(recognizer.clone());
        let session = TestSession::start(config(), collaborators).await;

        assert_eq!(
            listening_cycle(&session).await,
            vec!["listening_starting", "listening_stopping", "listening_stop"]
        );
        assert_eq!(recognizer.requests().len(), 1);
        assert_eq!(recognizer.stop_count(), 1);
    }

    /// Start listening and collect listening actions until it stops again
    async fn listening_cycle(session: &TestSession) -> Vec<&'static str> {
        use tokio_stream::StreamExt;

        let mut log = session.dispatcher.subscribe_log();
        session.dispatcher.start_listening().unwrap();
        let mut kinds = Vec::new();
        while let Ok(Some(Ok(entry))) = tokio::time::timeout(Duration::from_secs(10), log.next()).await {
            if entry.kind().starts_with("listening_") {
                kinds.push(entry.kind());
            }
            if entry.kind() == "listening_stop" {
                break;
            }
        }
        kinds
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_post_in_flight_per_activity() {
        let transport = MockTransport::with_delay(Duration::from_secs(1));
        let session = TestSession::start_with(transport, config(), Collaborators::default()).await;
        session.dispatcher.send_message("slow").unwrap();
        session.transport.posted.notified().await;

        session.dispatcher.retry(CorrelationId::new("test.0")).unwrap();
        session
            .until(|s| s.history.activities.first().is_some_and(|a| a.id.is_assigned()))
            .await;
        assert_eq!(session.transport.recorded_posts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_interrupts_speech() {
        let synthesizer = Arc::new(RecordingSynthesizer::with_delay(Duration::from_secs(30)));
        let collaborators = Collaborators::default().with_synthesizer(synthesizer.clone());
        let session = TestSession::start(config(), collaborators).await;

        session
            .dispatcher
            .dispatch(Action::Speak {
                text: "a long announcement".to_string(),
                locale: "en-us".to_string(),
                auto_listen_after_speak: false,
            })
            .unwrap();
        session
            .until(|s| s.shell.speaking == SpeakingState::Speaking)
            .await;

        session.dispatcher.update_input("w").unwrap();
        session
            .until(|s| s.shell.speaking == SpeakingState::Stopped)
            .await;
        assert_eq!(synthesizer.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_language_confirmation_sets_locale() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![]));
        let collaborators = Collaborators::default().with_recognizer(recognizer.clone());
        let session = TestSession::start(config(), collaborators).await;
        session.until(|s| s.language.recognizer.is_some()).await;

        let mut confirmation = bot_message("srv9", "Hello,Language has been set to English.");
        confirmation.locale = Some("ja-jp".to_string());
        session.dispatcher.receive(confirmation).unwrap();

        let state = session.until(|s| s.format.locale == "en-US").await;
        assert_eq!(state.history.activities.len(), 1);
        assert_eq!(recognizer.languages(), vec!["en-US"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_language_round_trip() {
        let session = TestSession::start(config(), Collaborators::default()).await;
        session.dispatcher.change_language("japanese").unwrap();
        let state = session.until(|s| s.history.counter == 2).await;
        assert!(state.language.is_changing_language());

        let posts = session.transport.recorded_posts();
        assert_eq!(posts[0].text.as_deref(), Some("japanese"));
        assert!(state.history.activities.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_idle_tick_suppressed() {
        let session = TestSession::start(config(), Collaborators::default()).await;
        session.dispatcher.dispatch(Action::TurnOnSettings).unwrap();
        session
            .dispatcher
            .dispatch(Action::EnableIntervalController { seconds: 1 })
            .unwrap();
        session.until(|s| s.settings.interval.enabled).await;

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let state = session.dispatcher.snapshot();
        let placeholders = state
            .history
            .activities
            .iter()
            .filter(|a| a.server_id() == Some(WAITING_INTERVAL_ID))
            .count();
        assert_eq!(placeholders, 1);

        session.dispatcher.receive(bot_message("srv1", "back")).unwrap();
        let state = session.until(|s| !s.history.has_placeholder()).await;
        assert_eq!(state.history.activities.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spoken_reply_listens_again() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![]));
        let synthesizer = Arc::new(RecordingSynthesizer::with_delay(Duration::from_secs(2)));
        let collaborators = Collaborators::default()
            .with_recognizer(recognizer.clone())
            .with_synthesizer(synthesizer.clone());
        let session = TestSession::start(config(), collaborators).await;

        session.dispatcher.dispatch(Action::TurnOnSettings).unwrap();
        session.dispatcher.dispatch(Action::speech_input("hi")).unwrap();
        let mut question = bot_message("srv1", "What now?");
        question.input_hint = Some(InputHint::ExpectingInput);
        session.dispatcher.receive(question).unwrap();

        session
            .until(|s| s.shell.listening == ListeningState::Starting)
            .await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            synthesizer.utterances(),
            vec![("What now?".to_string(), "en-us".to_string())]
        );
        assert_eq!(recognizer.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hook_failure_is_ignored() {
        let hook = Arc::new(MockHook::new(true, true));
        let collaborators = Collaborators::default().with_hook(hook.clone());
        let session = TestSession::start(config(), collaborators).await;

        session.dispatcher.send_message("hello").unwrap();
        session
            .until(|s| s.history.activities.first().is_some_and(|a| a.id.is_assigned()))
            .await;
        assert_eq!(hook.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_timeout_alert() {
        let config = EngineConfig {
            response_timeout: Some(Duration::from_secs(2)),
            ..EngineConfig::default()
        };
        let session = TestSession::start(config, Collaborators::default()).await;
        session.dispatcher.send_message("hello?").unwrap();

        let state = session
            .until(|s| s.history.find_by_server_id(TIMEOUT_ALERT_ID).is_some())
            .await;
        assert_eq!(state.history.activities.len(), 2);

        session.dispatcher.receive(bot_message("srv5", "sorry")).unwrap();
        let state = session
            .until(|s| s.history.find_by_server_id("srv5").is_some())
            .await;
        assert!(state.history.find_by_server_id(TIMEOUT_ALERT_ID).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_cancels_response_timeout() {
        let config = EngineConfig {
            response_timeout: Some(Duration::from_secs(2)),
            ..EngineConfig::default()
        };
        let session = TestSession::start(config, Collaborators::default()).await;
        session.dispatcher.send_message("hello?").unwrap();
        session.dispatcher.receive(bot_message("srv5", "hi!")).unwrap();
        session
            .until(|s| s.history.find_by_server_id("srv5").is_some())
            .await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        let state = session.dispatcher.snapshot();
        assert!(state.history.find_by_server_id(TIMEOUT_ALERT_ID).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_posts_are_throttled() {
        let session = TestSession::start(config(), Collaborators::default()).await;
        session
            .dispatcher
            .dispatch(Action::SetSendTyping { send_typing: true })
            .unwrap();
        session.dispatcher.update_input("h").unwrap();
        session.dispatcher.update_input("he").unwrap();
        session.until(|s| s.shell.input == "he").await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let posts = session.transport.recorded_posts();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].is_typing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_interval_steps_until_released() {
        let session = TestSession::start(config(), Collaborators::default()).await;
        session
            .dispatcher
            .dispatch(Action::EnableIntervalController { seconds: 10 })
            .unwrap();
        session.until(|s| s.settings.interval.enabled).await;

        let guard = session.dispatcher.hold_interval(1);
        tokio::time::sleep(config().hold_repeat * 3 + Duration::from_millis(50)).await;
        guard.release();

        session.until(|s| s.settings.interval.seconds == 14).await;
        tokio::time::sleep(config().hold_repeat * 3).await;
        assert_eq!(session.dispatcher.snapshot().settings.interval.seconds, 14);
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_records_causes() {
        use tokio_stream::StreamExt;

        let session = TestSession::start(config(), Collaborators::default()).await;
        let mut log = session.dispatcher.subscribe_log();
        session.dispatcher.send_message("hello").unwrap();

        let send = log.next().await.unwrap().unwrap();
        assert_eq!(send.kind(), "send");
        let follow_up = log.next().await.unwrap().unwrap();
        assert_eq!(follow_up.kind(), "send_try");
        assert_eq!(follow_up.caused_by, Some(send.seq));
    }
}
