use crate::riddle::model::{HintItem, PersistedHint};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Which attributes of a persisted hint an update touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HintChanges {
    pub kind: bool,
    pub text: bool,
    pub media: bool,
    pub order: bool,
}

impl HintChanges {
    pub fn any(&self) -> bool {
        self.kind || self.text || self.media || self.order
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintCreate {
    pub item: HintItem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintUpdate {
    pub persisted_id: String,
    pub item: HintItem,
    pub changes: HintChanges,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintDelete {
    pub persisted_id: String,
    pub local_id: String,
}

/// Operations that turn the persisted hint set into the submitted one
///
/// Creates and updates follow the submitted list order; deletes follow persisted order. A
/// duplicated `localId` can appear both as an update or unchanged and as a delete of its copy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HintDiff {
    pub creates: Vec<HintCreate>,
    pub updates: Vec<HintUpdate>,
    pub deletes: Vec<HintDelete>,
    /// localIds that need no write
    pub unchanged: Vec<String>,
}

impl HintDiff {
    /// True when nothing has to be written
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    pub fn operation_count(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len()
    }
}

fn changes_between(persisted: &PersistedHint, item: &HintItem) -> HintChanges {
    let content = &item.content;
    HintChanges {
        kind: persisted.content.kind != Some(content.kind()),
        text: persisted.content.text.as_deref() != content.text(),
        // Only a freshly picked file is a media change. A URL is never re-compared.
        media: content.media().map(|m| m.is_pending()).unwrap_or(false),
        order: persisted.order != item.order,
    }
}

/// Compute the minimal create/update/delete operations between `persisted` and `next`
///
/// Hints are matched by `localId`. When several persisted hints share a `localId`, the one with
/// the lowest order is matched and the other copies are deleted.
pub fn diff_hints(persisted: &[PersistedHint], next: &[HintItem]) -> HintDiff {
    let mut by_local_id: HashMap<&str, &PersistedHint> = HashMap::new();
    let mut extras: Vec<&PersistedHint> = Vec::new();
    for hint in persisted {
        match by_local_id.get(hint.local_id.as_str()).copied() {
            Some(kept) => {
                let (kept, extra) = if hint.order < kept.order {
                    (hint, kept)
                } else {
                    (kept, hint)
                };
                warn!(
                    "Hints {} and {} share localId {}; keeping {} and deleting {}",
                    kept.persisted_id,
                    extra.persisted_id,
                    hint.local_id,
                    kept.persisted_id,
                    extra.persisted_id
                );
                by_local_id.insert(hint.local_id.as_str(), kept);
                extras.push(extra);
            }
            None => {
                by_local_id.insert(hint.local_id.as_str(), hint);
            }
        }
    }

    let mut diff = HintDiff::default();
    let mut matched: HashSet<&str> = HashSet::new();

    for item in next {
        match by_local_id.get(item.local_id.as_str()) {
            None => diff.creates.push(HintCreate { item: item.clone() }),
            Some(existing) => {
                matched.insert(existing.local_id.as_str());
                let changes = changes_between(existing, item);
                if changes.any() {
                    diff.updates.push(HintUpdate {
                        persisted_id: existing.persisted_id.clone(),
                        item: item.clone(),
                        changes,
                    });
                } else {
                    diff.unchanged.push(item.local_id.clone());
                }
            }
        }
    }

    let mut deletes: Vec<&PersistedHint> = by_local_id
        .values()
        .filter(|hint| !matched.contains(hint.local_id.as_str()))
        .copied()
        .chain(extras)
        .collect();
    deletes.sort_by(|a, b| a.order.cmp(&b.order).then(a.persisted_id.cmp(&b.persisted_id)));
    diff.deletes = deletes
        .into_iter()
        .map(|hint| HintDelete {
            persisted_id: hint.persisted_id.clone(),
            local_id: hint.local_id.clone(),
        })
        .collect();

    diff
}
