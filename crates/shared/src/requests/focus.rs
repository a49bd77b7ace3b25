use serde::{Deserialize, Serialize};

/// Set or clear a focus on a group actor.
///
/// `target_id` is a user id for user focus and a member actor id for actor focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusRequest {
    pub group_id: String,
    pub target_id: String,
    #[serde(default)]
    pub focus_id: Option<String>,
}
