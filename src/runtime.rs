//! Runtime for a chat session
//!
//! [`ChatRuntime`] owns the store and executes effects; [`Dispatcher`] is the
//! cloneable handle the host uses to append actions and observe state.

mod dispatcher;
mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use dispatcher::{Dispatcher, HoldGuard};
pub use executor::ChatRuntime;
pub use traits::*;
