//! End-to-end scenarios.
//!
//! Each test builds a full `App` over the in-memory world and drives it the
//! way the host does: hooks for lifecycle events, use cases for user actions.

mod delegation_tests;
mod swap_flow_tests;
