//! Chat session state machine
//!
//! Actions are reduced by pure per-slice reducers into an immutable
//! [`ChatState`]; handlers turn the reduced state into [`Effect`]s.

pub mod action;
pub mod activity;
pub mod connection;
mod effect;
pub mod format;
pub mod history;
pub mod language;
pub mod menu;
pub mod settings;
pub mod shell;
pub mod state;


pub use action::{Action, InputSource};
pub use activity::{Activity, ActivityId, ChannelAccount, CorrelationId};
pub use effect::{Effect, RecognitionRequest};
pub use state::ChatState;
