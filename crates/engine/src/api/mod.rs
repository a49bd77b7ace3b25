//! API layer - host hooks and delegated query entry points.

pub mod hooks;
pub mod queries;

pub use hooks::{HookDispatcher, HookError, HookOutcome, HostEvent};
pub use queries::{serve_delegated_queries, PrivilegedQueryHandler};
