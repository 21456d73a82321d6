//! Connection slice

use super::action::Action;
use super::activity::ChannelAccount;
use super::state::Slice;
use crate::runtime::Transport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Uninitialized,
    Connecting,
    Online,
    ExpiredToken,
    FailedToConnect,
    Ended,
}

/// Back reference to a transport owned by the surrounding application.
///
/// Compared by identity. Upgrading fails once the owner drops it, which the
/// engine treats as "no transport" rather than an error.
#[derive(Clone)]
pub struct TransportHandle(Weak<dyn Transport>);

impl TransportHandle {
    pub fn new(transport: &Arc<dyn Transport>) -> Self {
        Self(Arc::downgrade(transport))
    }

    pub fn upgrade(&self) -> Option<Arc<dyn Transport>> {
        self.0.upgrade()
    }

    pub fn same_as(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportHandle")
            .field("alive", &(self.0.strong_count() > 0))
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub transport: Option<TransportHandle>,
    pub user: ChannelAccount,
    pub bot: ChannelAccount,
    /// Set once the user has sent something; gates speech on receipt
    pub speaker_enabled: bool,
}

impl ConnectionState {
    pub fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.transport.as_ref().and_then(TransportHandle::upgrade)
    }
}

impl PartialEq for ConnectionState {
    fn eq(&self, other: &Self) -> bool {
        let same_transport = match (&self.transport, &other.transport) {
            (Some(a), Some(b)) => a.same_as(b),
            (None, None) => true,
            _ => false,
        };
        same_transport
            && self.status == other.status
            && self.user == other.user
            && self.bot == other.bot
            && self.speaker_enabled == other.speaker_enabled
    }
}

impl Slice for ConnectionState {
    fn apply(&self, action: &Action) -> Option<Self> {
        match action {
            Action::StartConnection {
                transport,
                user,
                bot,
            } => Some(Self {
                transport: Some(transport.clone()),
                user: user.clone(),
                bot: bot.clone(),
                ..self.clone()
            }),
            Action::ConnectionChange { status } => (self.status != *status).then(|| Self {
                status: *status,
                ..self.clone()
            }),
            Action::TurnOnSettings => (!self.speaker_enabled).then(|| Self {
                speaker_enabled: true,
                ..self.clone()
            }),
            _ => None,
        }
    }
}
