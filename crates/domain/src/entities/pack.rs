//! Content packs (compendia)

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::ids::PackId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PackDocumentType {
    JournalEntry,
    Item,
    Actor,
    Other,
}

/// Pack metadata as enumerated by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pack {
    pub id: PackId,
    pub label: String,
    /// Owning system or module package.
    pub package: String,
    pub document_type: PackDocumentType,
    #[serde(default)]
    pub folder_chain: Vec<String>,
    #[serde(default)]
    pub sort_key: i64,
}

impl Pack {
    pub fn journal(id: PackId, label: impl Into<String>, sort_key: i64) -> Self {
        let package = id.as_str().split('.').next().unwrap_or_default().to_string();
        Self {
            id,
            label: label.into(),
            package,
            document_type: PackDocumentType::JournalEntry,
            folder_chain: Vec::new(),
            sort_key,
        }
    }

    pub fn holds_lists(&self) -> bool {
        self.document_type == PackDocumentType::JournalEntry
    }

    /// Resolution order: configured sort key, then id.
    pub fn resolution_order(a: &Pack, b: &Pack) -> Ordering {
        a.sort_key
            .cmp(&b.sort_key)
            .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_uses_sort_key_then_id() {
        let mut packs = vec![
            Pack::journal(PackId::new("b.lists").unwrap(), "B", 10),
            Pack::journal(PackId::new("a.lists").unwrap(), "A", 10),
            Pack::journal(PackId::new("z.lists").unwrap(), "Z", 1),
        ];
        packs.sort_by(Pack::resolution_order);
        let ids: Vec<_> = packs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["z.lists", "a.lists", "b.lists"]);
        assert_eq!(packs[0].package, "z");
    }
}
