//! Spellbook Protocol - Shared types for delegated operations
//!
//! Participants without write permission ask a privileged participant to act
//! for them. This crate holds everything that crosses that boundary:
//! - Delegated query envelopes ([`QueryEnvelope`], [`DelegatedQuery`])
//! - Curation and focus request payloads
//! - Response results with coarse error codes
//!
//! # Design Principles
//!
//! 1. **No business logic** - Pure data types and serialization
//! 2. **No domain IDs** - ids travel as plain strings and are validated on receipt

pub mod messages;
pub mod requests;
pub mod responses;

pub use messages::{DelegatedQuery, QueryEnvelope, TargetRole};
pub use requests::{CreateCustomListData, CurationRequest, FocusRequest, MergeListsData};
pub use responses::{ErrorCode, ResponseResult};
