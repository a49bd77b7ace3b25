//! The user performing an operation.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// A connected user and whether they hold GM privileges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    user_id: UserId,
    is_gm: bool,
}

impl Participant {
    pub fn player(user_id: UserId) -> Self {
        Self {
            user_id,
            is_gm: false,
        }
    }

    pub fn gm(user_id: UserId) -> Self {
        Self {
            user_id,
            is_gm: true,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn is_gm(&self) -> bool {
        self.is_gm
    }
}
