use serde::{Deserialize, Serialize};

/// Spell list curation operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CurationRequest {
    #[serde(rename_all = "camelCase")]
    DuplicateForEditing { list_id: String },
    CreateCustom { data: CreateCustomListData },
    Merge { data: MergeListsData },
    #[serde(rename_all = "camelCase")]
    Rename { list_id: String, name: String },
    #[serde(rename_all = "camelCase")]
    AddSpell { list_id: String, spell_id: String },
    #[serde(rename_all = "camelCase")]
    RemoveSpell { list_id: String, spell_id: String },
    #[serde(rename_all = "camelCase")]
    BulkApply {
        list_id: String,
        #[serde(default)]
        add: Vec<String>,
        #[serde(default)]
        remove: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    RestoreFromOriginal { list_id: String },
    #[serde(rename_all = "camelCase")]
    Delete { list_id: String },
    #[serde(rename_all = "camelCase")]
    SetRegistered { list_id: String, enabled: bool },
    #[serde(rename_all = "camelCase")]
    SetHidden { list_id: String, hidden: bool },
}

impl CurationRequest {
    pub fn name(&self) -> &'static str {
        match self {
            CurationRequest::DuplicateForEditing { .. } => "duplicateForEditing",
            CurationRequest::CreateCustom { .. } => "createCustom",
            CurationRequest::Merge { .. } => "merge",
            CurationRequest::Rename { .. } => "rename",
            CurationRequest::AddSpell { .. } => "addSpell",
            CurationRequest::RemoveSpell { .. } => "removeSpell",
            CurationRequest::BulkApply { .. } => "bulkApply",
            CurationRequest::RestoreFromOriginal { .. } => "restoreFromOriginal",
            CurationRequest::Delete { .. } => "delete",
            CurationRequest::SetRegistered { .. } => "setRegistered",
            CurationRequest::SetHidden { .. } => "setHidden",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomListData {
    pub name: String,
    pub identifier: String,
    #[serde(default)]
    pub is_subclass: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeListsData {
    pub source_ids: Vec<String>,
    pub name: String,
    /// Defaults to the first source's identifier.
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub hide_sources: bool,
}
