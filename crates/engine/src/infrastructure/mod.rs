//! Infrastructure implementations.
//!
//! Contains port trait implementations and shared runtime primitives.

pub mod cache;
pub mod clock;
pub mod config;
pub mod delegation;
pub mod events;
pub mod locks;
pub mod memory;
pub mod ports;
pub mod settings;
