//! Request payloads carried by delegated queries.

mod curation;
mod focus;

pub use curation::{CreateCustomListData, CurationRequest, MergeListsData};
pub use focus::FocusRequest;
