//! Chat session orchestration engine
//!
//! Host stimuli become actions in an append-only log, pure reducers fold
//! them into immutable state slices, and handlers react with effects that
//! the runtime executes against the transport and speech collaborators.

#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod runtime;
pub mod state_machine;
pub mod store;

pub use config::EngineConfig;
pub use runtime::{ChatRuntime, Collaborators, Dispatcher};
pub use state_machine::{Action, Activity, ChatState};
