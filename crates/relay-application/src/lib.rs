//! Application layer: conversational command handling.
//!
//! Ties the domain traits together into the inbound dispatch pipeline and the
//! proactive notification path. Everything here is transport-agnostic; the
//! webhook layer feeds [`CommandDispatcher::dispatch`] and supplies the
//! concrete stores and transport.

pub mod commands;
pub mod dispatcher;
pub mod notifier;
pub mod replies;
pub mod session_flow;

pub use commands::{builtin_commands, find_builtin_command, BuiltinCommand};
pub use dispatcher::{CommandDispatcher, DispatchOutcome};
pub use notifier::{NotifyOutcome, ProactiveNotifier};
pub use session_flow::SessionFlow;
