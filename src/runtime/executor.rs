//! Chat runtime executor

use super::dispatcher::Dispatcher;
use super::traits::{Collaborators, RecognitionEvent, RecognitionSink};
use crate::config::EngineConfig;
use crate::handlers::HandlerRegistry;
use crate::state_machine::format::FormatState;
use crate::state_machine::history::HistoryState;
use crate::state_machine::language::RecognizerHandle;
use crate::state_machine::{Action, Activity, ChatState, CorrelationId, Effect, RecognitionRequest};
use crate::store::{LoggedAction, Store};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const LOG_CAPACITY: usize = 256;

/// Owns the store and executes the effects its handlers produce.
///
/// Actions from collaborators, timers and the [`Dispatcher`] all arrive on one
/// channel and are reduced strictly in arrival order.
pub struct ChatRuntime {
    store: Store,
    config: EngineConfig,
    collaborators: Collaborators,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    state_tx: watch::Sender<ChatState>,
    log_tx: broadcast::Sender<LoggedAction>,
    shutdown: CancellationToken,
    /// Correlation ids with a post outstanding
    in_flight: HashSet<CorrelationId>,
    silence: Option<CancellationToken>,
    recognition: Option<CancellationToken>,
    response: Option<CancellationToken>,
    idle: Option<CancellationToken>,
    idle_period: Option<Duration>,
    last_typing_post: Option<Instant>,
}

impl ChatRuntime {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        let state = ChatState::new(
            HistoryState::default(),
            FormatState::with_locale(config.fallback_locale.clone()),
        );
        Self::with_state(config, collaborators, state, HandlerRegistry::standard())
    }

    pub fn with_state(
        config: EngineConfig,
        collaborators: Collaborators,
        state: ChatState,
        handlers: HandlerRegistry,
    ) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(state.clone());
        let (log_tx, _) = broadcast::channel(LOG_CAPACITY);
        Self {
            store: Store::new(state, handlers),
            config,
            collaborators,
            action_tx,
            action_rx,
            state_tx,
            log_tx,
            shutdown: CancellationToken::new(),
            in_flight: HashSet::new(),
            silence: None,
            recognition: None,
            response: None,
            idle: None,
            idle_period: None,
            last_typing_post: None,
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            self.action_tx.clone(),
            self.state_tx.subscribe(),
            self.log_tx.clone(),
            self.shutdown.clone(),
            self.config.hold_repeat,
        )
    }

    /// Run on a background task
    pub fn spawn(self) -> (Dispatcher, JoinHandle<()>) {
        let dispatcher = self.dispatcher();
        (dispatcher, tokio::spawn(self.run()))
    }

    pub async fn run(mut self) {
        tracing::info!(locale = self.store.state().locale(), "Starting chat runtime");

        if let Some(recognizer) = self.collaborators.recognizer.clone() {
            recognizer.warmup();
            self.process(Action::SaveRecognizer {
                recognizer: RecognizerHandle::new(&recognizer),
            });
        }

        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                Some(action) = self.action_rx.recv() => self.process(action),
                else => break,
            }
        }

        tracing::info!(actions = self.store.log().len(), "Chat runtime stopped");
    }

    fn process(&mut self, action: Action) {
        let dispatched = self.store.dispatch(action);

        for entry in &dispatched.appended {
            if let Action::SendAcknowledge { correlation_id, .. }
            | Action::SendFailed { correlation_id } = &entry.action
            {
                self.in_flight.remove(correlation_id);
            }
            let _ = self.log_tx.send(entry.clone());
        }
        self.state_tx.send_replace(self.store.state().clone());

        for effect in dispatched.effects {
            self.execute(effect);
        }
    }

    fn send(&self, action: Action) {
        let _ = self.action_tx.send(action);
    }

    fn execute(&mut self, effect: Effect) {
        tracing::trace!(effect = effect.kind(), "Executing effect");
        match effect {
            Effect::Dispatch(action) => self.send(action),

            Effect::PostActivity {
                correlation_id,
                activity,
            } => {
                if !self.in_flight.insert(correlation_id.clone()) {
                    tracing::debug!(correlation_id = %correlation_id, "Post already in flight");
                    return;
                }
                let failed = Action::SendFailed {
                    correlation_id: correlation_id.clone(),
                };
                self.post("message", activity, failed, move |id| {
                    Action::send_acknowledge(correlation_id, id)
                });
            }

            Effect::PostLanguageChange { activity } => {
                self.post("language change", activity, Action::ChangeLanguageFail, |_| {
                    Action::ChangedLanguage
                });
            }

            Effect::PostMenuMessage { activity } => {
                self.post("menu message", activity, Action::SendMenuMessageFail, |_| {
                    Action::SentMenuMessage
                });
            }

            Effect::PostTyping { activity } => self.post_typing(activity),

            Effect::StartRecognizing(request) => self.start_recognizing(request),
            Effect::StopRecognizing => self.stop_recognizing(),

            Effect::ArmSilenceTimeout => {
                let token = rearm(&mut self.silence, &self.shutdown);
                self.schedule(token, self.config.silence_timeout, Action::ListeningStopping);
            }
            Effect::CancelSilenceTimeout => disarm(&mut self.silence),

            Effect::SpeakUtterance {
                text,
                locale,
                auto_listen,
            } => self.speak(text, locale, auto_listen),
            Effect::StopSpeaking => self.stop_speaking(),

            Effect::SetRecognizerLanguage {
                recognizer,
                language,
            } => match recognizer.upgrade() {
                Some(recognizer) => recognizer.set_language(language),
                None => tracing::debug!(language, "Recognizer released, language not applied"),
            },

            Effect::NotifyExternalContent => {
                if let Some(hook) = self.collaborators.hook.as_ref().filter(|h| h.is_active()) {
                    if let Err(e) = hook.on_sent() {
                        tracing::debug!(error = %e, "Ignoring external content hook failure");
                    }
                }
            }

            Effect::ScheduleTypingExpiry { id } => {
                let token = self.shutdown.child_token();
                self.schedule(token, self.config.typing_ttl, Action::ClearTyping { id });
            }

            Effect::RestartIdleInterval { period } => {
                self.idle_period = Some(period);
                self.restart_idle();
            }
            Effect::ResetIdleCountdown => self.restart_idle(),

            Effect::ArmResponseTimeout { alert } => {
                let Some(timeout) = self.config.response_timeout else {
                    return;
                };
                let token = rearm(&mut self.response, &self.shutdown);
                self.schedule(
                    token,
                    timeout,
                    Action::TimeoutAlert {
                        activity: Arc::new(alert),
                    },
                );
            }
            Effect::CancelResponseTimeout => disarm(&mut self.response),
        }
    }

    /// Post through the connected transport, resolving to one of two actions
    fn post<F>(&self, what: &'static str, activity: Activity, on_failure: Action, on_success: F)
    where
        F: FnOnce(String) -> Action + Send + 'static,
    {
        let Some(transport) = self.store.state().connection.transport() else {
            tracing::warn!(what, "No transport connected, post failed");
            self.send(on_failure);
            return;
        };
        let tx = self.action_tx.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                () = shutdown.cancelled() => return,
                result = transport.post(&activity) => result,
            };
            let action = match result {
                Ok(id) => {
                    tracing::debug!(what, id = %id, "Post acknowledged");
                    on_success(id)
                }
                Err(e) => {
                    tracing::warn!(what, error = %e, retryable = e.is_retryable(), "Post failed");
                    on_failure
                }
            };
            let _ = tx.send(action);
        });
    }

    fn post_typing(&mut self, activity: Activity) {
        let now = Instant::now();
        if self
            .last_typing_post
            .is_some_and(|last| now.duration_since(last) < self.config.typing_throttle)
        {
            return;
        }
        let Some(transport) = self.store.state().connection.transport() else {
            return;
        };
        self.last_typing_post = Some(now);
        tokio::spawn(async move {
            if let Err(e) = transport.post(&activity).await {
                tracing::debug!(error = %e, "Typing post failed");
            }
        });
    }

    /// Dispatch `action` after `delay` unless `token` is cancelled first
    fn schedule(&self, token: CancellationToken, delay: Duration, action: Action) {
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = tx.send(action);
                }
            }
        });
    }

    fn restart_idle(&mut self) {
        let Some(period) = self.idle_period else {
            return;
        };
        let token = rearm(&mut self.idle, &self.shutdown);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if tx.send(Action::WaitInterval).is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    fn start_recognizing(&mut self, request: RecognitionRequest) {
        let Some(recognizer) = self
            .collaborators
            .recognizer
            .clone()
            .filter(|r| r.is_available())
        else {
            tracing::warn!("Speech recognition unavailable");
            self.send(Action::ListeningStopping);
            return;
        };
        let token = rearm(&mut self.recognition, &self.shutdown);
        let tx = self.action_tx.clone();

        tokio::spawn(async move {
            let (sink_tx, mut events) = mpsc::unbounded_channel();
            if let Err(e) = recognizer
                .start_recognizing(&request, RecognitionSink::new(sink_tx))
                .await
            {
                tracing::warn!(error = %e, "Speech recognition failed to start");
                let _ = tx.send(Action::ListeningStopping);
                return;
            }

            loop {
                let event = tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    Some(RecognitionEvent::AudioStreamStarted) => {
                        let _ = tx.send(Action::ListeningStart);
                    }
                    Some(RecognitionEvent::Partial(text)) => {
                        let _ = tx.send(Action::speech_input(text));
                    }
                    Some(RecognitionEvent::Final(text)) => {
                        for action in final_transcript(&request, &text) {
                            let _ = tx.send(action);
                        }
                        break;
                    }
                    Some(RecognitionEvent::Failed(e)) => {
                        tracing::warn!(error = %e, "Speech recognition interrupted");
                        let _ = tx.send(Action::ListeningStopping);
                        break;
                    }
                    None => break,
                }
            }
        });
    }

    fn stop_recognizing(&mut self) {
        disarm(&mut self.recognition);
        let recognizer = self.collaborators.recognizer.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            if let Some(recognizer) = recognizer {
                recognizer.stop_recognizing().await;
            }
            let _ = tx.send(Action::ListeningStop);
        });
    }

    fn speak(&self, text: String, locale: String, auto_listen: bool) {
        let Some(synthesizer) = self.collaborators.synthesizer.clone() else {
            tracing::warn!("No speech synthesizer, dropping utterance");
            self.send(Action::SpeakingStopped);
            return;
        };
        let listen_after = auto_listen && self.collaborators.recognition_available();
        let tx = self.action_tx.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let started: super::traits::OnSpeechStarted =
                Box::new(|| tracing::debug!("Speech output started"));
            let result = tokio::select! {
                biased;
                () = shutdown.cancelled() => return,
                result = synthesizer.speak(&text, &locale, Some(started)) => result,
            };
            if let Err(e) = &result {
                tracing::warn!(error = %e, "Speech output failed");
            }
            let _ = tx.send(Action::SpeakingStopped);
            if listen_after && result.is_ok() {
                let _ = tx.send(Action::ListeningStarting);
            }
        });
    }

    fn stop_speaking(&self) {
        let synthesizer = self.collaborators.synthesizer.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            if let Some(synthesizer) = synthesizer {
                synthesizer.stop_speaking().await;
            }
            let _ = tx.send(Action::SpeakingStopped);
        });
    }
}

/// Actions for a final transcript: fill the input, stop listening, send it
fn final_transcript(request: &RecognitionRequest, text: &str) -> Vec<Action> {
    let text = text.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if text.is_empty() {
        return vec![Action::ListeningStopping];
    }
    vec![
        Action::speech_input(text),
        Action::ListeningStopping,
        Action::send(Activity::message(
            request.user.clone(),
            text,
            request.locale.clone(),
        )),
    ]
}

/// Cancel the token in `slot` and install a fresh child of `parent`
fn rearm(slot: &mut Option<CancellationToken>, parent: &CancellationToken) -> CancellationToken {
    disarm(slot);
    let token = parent.child_token();
    *slot = Some(token.clone());
    token
}

fn disarm(slot: &mut Option<CancellationToken>) {
    if let Some(token) = slot.take() {
        token.cancel();
    }
}
