//! Spell list catalog.
//!
//! One explicit value owns pack enumeration, the per-session pack index
//! cache and the spell document cache. Production builds one in the
//! composition root; tests build their own.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use spellbook_domain::{
    DomainError, DomainEvent, ListName, Pack, PackId, Spell, SpellId, SpellList, SpellListHeader,
    SpellListId,
};

use crate::infrastructure::cache::TtlCache;
use crate::infrastructure::ports::{PackRepo, RepoError, SpellListRepo, SpellRepo};

/// Upper bound on numbered name suffixes tried before giving up.
const MAX_NAME_ATTEMPTS: u32 = 1_000;

pub struct Catalog {
    packs: Arc<dyn PackRepo>,
    lists: Arc<dyn SpellListRepo>,
    spells: Arc<dyn SpellRepo>,
    index: TtlCache<PackId, Arc<Vec<SpellListHeader>>>,
    spell_cache: TtlCache<SpellId, Spell>,
    module_pack: PackId,
}

impl Catalog {
    pub fn new(
        packs: Arc<dyn PackRepo>,
        lists: Arc<dyn SpellListRepo>,
        spells: Arc<dyn SpellRepo>,
        module_pack: PackId,
        ttl: Duration,
    ) -> Self {
        Self {
            packs,
            lists,
            spells,
            index: TtlCache::new(ttl),
            spell_cache: TtlCache::new(ttl),
            module_pack,
        }
    }

    /// Pack holding custom, merged, modified and spellbook lists.
    pub fn module_pack(&self) -> &PackId {
        &self.module_pack
    }

    /// Journal packs in resolution order.
    pub async fn packs(&self) -> Result<Vec<Pack>, RepoError> {
        let mut packs: Vec<Pack> = self
            .packs
            .list()
            .await?
            .into_iter()
            .filter(Pack::holds_lists)
            .collect();
        packs.sort_by(Pack::resolution_order);
        Ok(packs)
    }

    /// Cached list headers for one pack.
    pub async fn pack_index(&self, pack: &PackId) -> Result<Arc<Vec<SpellListHeader>>, RepoError> {
        if let Some(headers) = self.index.get(pack).await {
            return Ok(headers);
        }
        let mut headers = self.lists.list_headers(pack).await?;
        headers.sort_by(|a, b| a.id.cmp(&b.id));
        let headers = Arc::new(headers);
        self.index.insert(pack.clone(), headers.clone()).await;
        Ok(headers)
    }

    /// Every readable list header, packs in resolution order.
    ///
    /// Packs that cannot be enumerated or read are skipped with a warning.
    pub async fn headers(&self) -> Vec<SpellListHeader> {
        let packs = match self.packs().await {
            Ok(packs) => packs,
            Err(e) => {
                tracing::warn!(error = %e, "Pack enumeration failed, catalog is empty");
                return Vec::new();
            }
        };
        let indexes = join_all(packs.iter().map(|pack| self.pack_index(&pack.id))).await;
        let mut all = Vec::new();
        for (pack, index) in packs.iter().zip(indexes) {
            match index {
                Ok(headers) => all.extend(headers.iter().cloned()),
                Err(e) => tracing::warn!(
                    pack_id = %pack.id,
                    error = %e,
                    "Skipping unreadable pack"
                ),
            }
        }
        all
    }

    pub async fn get_list(&self, id: &SpellListId) -> Result<Option<SpellList>, RepoError> {
        self.lists.get(id).await
    }

    pub async fn require_list(&self, id: &SpellListId) -> Result<SpellList, RepoError> {
        self.lists
            .get(id)
            .await?
            .ok_or_else(|| RepoError::not_found("SpellList", id))
    }

    pub async fn save_list(&self, list: &SpellList) -> Result<(), RepoError> {
        self.lists.save(list).await?;
        self.index.invalidate(list.source_pack()).await;
        Ok(())
    }

    pub async fn delete_list(&self, list: &SpellList) -> Result<(), RepoError> {
        self.lists.delete(list.id()).await?;
        self.index.invalidate(list.source_pack()).await;
        Ok(())
    }

    /// Cached spell document.
    pub async fn spell(&self, id: &SpellId) -> Result<Option<Spell>, RepoError> {
        if let Some(spell) = self.spell_cache.get(id).await {
            return Ok(Some(spell));
        }
        let spell = self.spells.get(id).await?;
        if let Some(spell) = &spell {
            self.spell_cache.insert(id.clone(), spell.clone()).await;
        }
        Ok(spell)
    }

    /// Spell documents for `ids`; ids that do not resolve are left out.
    pub async fn spells<'a, I>(&self, ids: I) -> Result<BTreeMap<SpellId, Spell>, RepoError>
    where
        I: IntoIterator<Item = &'a SpellId>,
    {
        let mut found = BTreeMap::new();
        for id in ids {
            if let Some(spell) = self.spell(id).await? {
                found.insert(id.clone(), spell);
            }
        }
        Ok(found)
    }

    /// Whether another list already uses `name`, ignoring case.
    pub async fn name_taken(&self, name: &ListName, except: Option<&SpellListId>) -> bool {
        self.headers()
            .await
            .iter()
            .any(|h| Some(&h.id) != except && h.name.same_as(name))
    }

    /// `base`, or `base 2`, `base 3`... whichever is free first.
    pub async fn available_name(&self, base: &ListName) -> Result<ListName, DomainError> {
        let headers = self.headers().await;
        let taken = |name: &ListName| headers.iter().any(|h| h.name.same_as(name));
        if !taken(base) {
            return Ok(base.clone());
        }
        for n in 2..=MAX_NAME_ATTEMPTS {
            let candidate = base.with_suffix(&n.to_string())?;
            if !taken(&candidate) {
                return Ok(candidate);
            }
        }
        Err(DomainError::validation(format!(
            "No free name left for '{}'",
            base
        )))
    }

    /// Drop both caches. Called when the host reports pack content changed.
    pub async fn refresh(&self) {
        self.index.clear().await;
        self.spell_cache.clear().await;
        tracing::debug!("Catalog caches cleared");
    }

    pub async fn purge_expired(&self) -> usize {
        self.index.purge_expired().await + self.spell_cache.purge_expired().await
    }

    /// Invalidate what a domain event made stale.
    pub async fn apply_event(&self, event: &DomainEvent) {
        let DomainEvent::SpellListChanged { list_id, .. } = event else {
            return;
        };
        let dropped = self
            .index
            .invalidate_where(|_, headers| headers.iter().any(|h| &h.id == list_id))
            .await;
        let module = self.index.invalidate(&self.module_pack).await;
        tracing::debug!(list_id = %list_id, dropped, module, "Pack index invalidated");
    }
}
