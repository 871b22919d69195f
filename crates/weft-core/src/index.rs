// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Locator → topic identity index.
//!
//! The index is maintained eagerly by every identity-changing mutation on
//! [`crate::TopicMap`], so `is_auto_updated` is always `true` and no lookup
//! site needs a defensive rebuild. Merge decisions are read directly from
//! this index; a stale entry is a correctness bug, which is why mutations
//! repair it before returning rather than lazily.
use std::collections::BTreeMap;

use crate::ident::{IdentityKind, Locator, TopicId};
use crate::record::TopicRecord;

/// Three-way lookup from identity locators to topics.
#[derive(Clone, Debug, Default)]
pub struct IdentityIndex {
    /// Subject identifier → topic.
    by_subject_identifier: BTreeMap<Locator, TopicId>,
    /// Subject locator → topic.
    by_subject_locator: BTreeMap<Locator, TopicId>,
    /// Item identifier → topic.
    by_item_identifier: BTreeMap<Locator, TopicId>,
}

impl IdentityIndex {
    /// Creates an empty index.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Looks up the topic holding `locator` under the given identity kind.
    #[must_use]
    pub fn lookup(&self, kind: IdentityKind, locator: &Locator) -> Option<TopicId> {
        self.map_for(kind).get(locator).copied()
    }

    /// Returns `true`: the index is repaired by every mutation, never lazily.
    #[must_use]
    pub fn is_auto_updated(&self) -> bool {
        true
    }

    /// Records `locator` as an identity of `topic`, replacing any prior entry.
    pub(crate) fn insert(&mut self, kind: IdentityKind, locator: Locator, topic: TopicId) {
        self.map_for_mut(kind).insert(locator, topic);
    }

    /// Drops the entry for `locator` under the given kind.
    pub(crate) fn remove(&mut self, kind: IdentityKind, locator: &Locator) {
        self.map_for_mut(kind).remove(locator);
    }

    /// Rebuilds the index from scratch out of the topic arena.
    #[must_use]
    pub(crate) fn rebuild(topics: &BTreeMap<TopicId, TopicRecord>) -> Self {
        let mut index = Self::new();
        for (id, record) in topics {
            for locator in &record.subject_identifiers {
                index.insert(IdentityKind::SubjectIdentifier, locator.clone(), *id);
            }
            for locator in &record.subject_locators {
                index.insert(IdentityKind::SubjectLocator, locator.clone(), *id);
            }
            for locator in &record.item_identifiers {
                index.insert(IdentityKind::ItemIdentifier, locator.clone(), *id);
            }
        }
        index
    }

    /// Number of entries across all three kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_subject_identifier.len()
            + self.by_subject_locator.len()
            + self.by_item_identifier.len()
    }

    /// Returns `true` when no identity locator is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn map_for(&self, kind: IdentityKind) -> &BTreeMap<Locator, TopicId> {
        match kind {
            IdentityKind::SubjectIdentifier => &self.by_subject_identifier,
            IdentityKind::SubjectLocator => &self.by_subject_locator,
            IdentityKind::ItemIdentifier => &self.by_item_identifier,
        }
    }

    fn map_for_mut(&mut self, kind: IdentityKind) -> &mut BTreeMap<Locator, TopicId> {
        match kind {
            IdentityKind::SubjectIdentifier => &mut self.by_subject_identifier,
            IdentityKind::SubjectLocator => &mut self.by_subject_locator,
            IdentityKind::ItemIdentifier => &mut self.by_item_identifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_do_not_alias() {
        let mut index = IdentityIndex::new();
        let loc = Locator::new("http://example.org/shared");
        index.insert(IdentityKind::SubjectIdentifier, loc.clone(), TopicId(1));
        index.insert(IdentityKind::SubjectLocator, loc.clone(), TopicId(2));

        assert_eq!(
            index.lookup(IdentityKind::SubjectIdentifier, &loc),
            Some(TopicId(1))
        );
        assert_eq!(
            index.lookup(IdentityKind::SubjectLocator, &loc),
            Some(TopicId(2))
        );
        assert_eq!(index.lookup(IdentityKind::ItemIdentifier, &loc), None);
    }

    #[test]
    fn rebuild_matches_incremental_maintenance() {
        let mut topics: BTreeMap<TopicId, TopicRecord> = BTreeMap::new();
        let mut record = TopicRecord::default();
        record
            .subject_identifiers
            .insert(Locator::new("http://example.org/a"));
        record
            .item_identifiers
            .insert(Locator::new("http://example.org/b"));
        topics.insert(TopicId(7), record);

        let rebuilt = IdentityIndex::rebuild(&topics);
        assert_eq!(
            rebuilt.lookup(
                IdentityKind::SubjectIdentifier,
                &Locator::new("http://example.org/a")
            ),
            Some(TopicId(7))
        );
        assert_eq!(
            rebuilt.lookup(
                IdentityKind::ItemIdentifier,
                &Locator::new("http://example.org/b")
            ),
            Some(TopicId(7))
        );
        assert_eq!(rebuilt.len(), 2);
    }
}
