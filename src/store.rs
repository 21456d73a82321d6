//! State store and synchronous dispatch
//!
//! `dispatch` appends → reduces → runs handlers, and keeps going until no
//! handler asks for another action. Follow-up actions are processed in FIFO
//! order and record the action that caused them. Everything a handler wants
//! done outside the store comes back as an effect for the runtime.

mod log;

pub use log::{ActionLog, LoggedAction};

use crate::handlers::HandlerRegistry;
use crate::state_machine::{Action, ChatState, Effect};
use std::collections::VecDeque;

/// Result of dispatching one action
#[derive(Debug, Default)]
pub struct Dispatched {
    /// Every action appended, the dispatched one first
    pub appended: Vec<LoggedAction>,
    /// External effects, in emission order
    pub effects: Vec<Effect>,
}

#[derive(Debug)]
pub struct Store {
    state: ChatState,
    log: ActionLog,
    handlers: HandlerRegistry,
}

impl Store {
    pub fn new(state: ChatState, handlers: HandlerRegistry) -> Self {
        Self {
            state,
            log: ActionLog::new(),
            handlers,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    pub fn dispatch(&mut self, action: Action) -> Dispatched {
        let mut out = Dispatched::default();
        let mut queue: VecDeque<(Action, Option<u64>)> = VecDeque::from([(action, None)]);

        while let Some((action, caused_by)) = queue.pop_front() {
            let entry = self.log.append(action, caused_by).clone();
            self.state = self.state.reduce(&entry.action);

            let effects = self.handlers.run(&entry.action, &self.state);
            tracing::debug!(
                seq = entry.seq,
                action = entry.kind(),
                caused_by = ?entry.caused_by,
                effects = effects.len(),
                "Reduced action"
            );

            for effect in effects {
                match effect {
                    Effect::Dispatch(child) => queue.push_back((child, Some(entry.seq))),
                    other => out.effects.push(other),
                }
            }
            out.appended.push(entry);
        }

        out
    }
}
