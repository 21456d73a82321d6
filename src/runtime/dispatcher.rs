//! Dispatch gateway
//!
//! The single entry point for host-originated stimuli. Every method appends
//! an action; none of them touch state directly.

use super::traits::Transport;
use crate::error::RuntimeStopped;
use crate::state_machine::connection::TransportHandle;
use crate::state_machine::{Action, Activity, ChannelAccount, ChatState, CorrelationId, InputSource};
use crate::store::LoggedAction;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Action>,
    state: watch::Receiver<ChatState>,
    log: broadcast::Sender<LoggedAction>,
    shutdown: CancellationToken,
    hold_repeat: Duration,
}

impl Dispatcher {
    pub(super) fn new(
        tx: mpsc::UnboundedSender<Action>,
        state: watch::Receiver<ChatState>,
        log: broadcast::Sender<LoggedAction>,
        shutdown: CancellationToken,
        hold_repeat: Duration,
    ) -> Self {
        Self {
            tx,
            state,
            log,
            shutdown,
            hold_repeat,
        }
    }

    pub fn dispatch(&self, action: Action) -> Result<(), RuntimeStopped> {
        if self.shutdown.is_cancelled() {
            return Err(RuntimeStopped);
        }
        self.tx.send(action).map_err(|_| RuntimeStopped)
    }

    /// Latest published state
    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    /// Every published state, starting with the current one
    pub fn subscribe_state(&self) -> WatchStream<ChatState> {
        WatchStream::new(self.state.clone())
    }

    /// Actions appended from now on
    pub fn subscribe_log(&self) -> BroadcastStream<LoggedAction> {
        BroadcastStream::new(self.log.subscribe())
    }

    /// Resolves with the first published state matching `predicate`
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<ChatState, RuntimeStopped>
    where
        F: FnMut(&ChatState) -> bool,
    {
        let mut rx = self.state.clone();
        let state = rx.wait_for(|s| predicate(s)).await.map_err(|_| RuntimeStopped)?;
        Ok(state.clone())
    }

    pub fn send_message(&self, text: impl Into<String>) -> Result<(), RuntimeStopped> {
        self.dispatch(Action::send(self.outbound(text.into())))
    }

    pub fn change_language(&self, language: impl Into<String>) -> Result<(), RuntimeStopped> {
        let language = language.into();
        self.dispatch(Action::ChangeLanguage {
            activity: Arc::new(self.outbound(language.clone())),
            language,
        })
    }

    pub fn send_menu_message(&self, message: impl Into<String>) -> Result<(), RuntimeStopped> {
        let message = message.into();
        self.dispatch(Action::SendMenuMessage {
            activity: Arc::new(self.outbound(message.clone())),
            message,
        })
    }

    pub fn update_input(&self, input: impl Into<String>) -> Result<(), RuntimeStopped> {
        self.dispatch(Action::UpdateInput {
            input: input.into(),
            source: InputSource::Text,
        })
    }

    pub fn start_listening(&self) -> Result<(), RuntimeStopped> {
        self.dispatch(Action::ListeningStarting)
    }

    pub fn stop_listening(&self) -> Result<(), RuntimeStopped> {
        self.dispatch(Action::ListeningStopping)
    }

    pub fn retry(&self, correlation_id: CorrelationId) -> Result<(), RuntimeStopped> {
        self.dispatch(Action::Retry { correlation_id })
    }

    /// Hide the suggested actions of the activity with server id `id`
    pub fn take_suggested_action(&self, id: impl Into<String>) -> Result<(), RuntimeStopped> {
        self.dispatch(Action::TakeSuggestedAction { id: id.into() })
    }

    /// Deliver an activity from the peer
    pub fn receive(&self, activity: Activity) -> Result<(), RuntimeStopped> {
        let activity = Arc::new(activity);
        if activity.is_typing() {
            self.dispatch(Action::ShowTyping { activity })
        } else {
            self.dispatch(Action::Receive { activity })
        }
    }

    pub fn start_connection(
        &self,
        transport: &Arc<dyn Transport>,
        user: ChannelAccount,
        bot: ChannelAccount,
    ) -> Result<(), RuntimeStopped> {
        self.dispatch(Action::StartConnection {
            transport: TransportHandle::new(transport),
            user,
            bot,
        })
    }

    /// Press-and-hold adjustment of the idle interval.
    ///
    /// Steps by `scale` every hold-repeat period until the guard is released.
    pub fn hold_interval(&self, scale: i32) -> HoldGuard {
        let token = self.shutdown.child_token();
        let period = self.hold_repeat;
        let tx = self.tx.clone();
        let stop = token.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    biased;
                    () = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        if tx.send(Action::SetIntervalTime { scale }).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        HoldGuard {
            token,
            tx: self.tx.clone(),
            scale,
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn outbound(&self, text: String) -> Activity {
        let state = self.state.borrow();
        Activity::message(state.connection.user.clone(), text, state.locale())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("stopped", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Repeating interval adjustment; dropping it stops the repeat
#[derive(Debug)]
pub struct HoldGuard {
    token: CancellationToken,
    tx: mpsc::UnboundedSender<Action>,
    scale: i32,
}

impl HoldGuard {
    /// Stop repeating and apply one final step
    pub fn release(self) {
        self.token.cancel();
        let _ = self.tx.send(Action::SetIntervalTime { scale: self.scale });
    }
}

impl Drop for HoldGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
