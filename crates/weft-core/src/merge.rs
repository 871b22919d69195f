// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Merge engine: topic merges, statement merges, reification resolution.
//!
//! Cascades (topic merge → statement merge → reifier fold → further topic
//! merge) run as a work-queue fixpoint loop, never recursion. Termination:
//! every merge strictly reduces `topic_count() + statement_count()`, so the
//! queue drains. Pairs already absorbed by earlier queue work are resolved
//! through a redirect table before being processed.
use std::collections::{BTreeMap, VecDeque};
use std::mem;

use crate::error::ModelError;
use crate::graph::TopicMap;
use crate::ident::{AssociationId, NameId, OccurrenceId, ReifiableId, RoleId, TopicId, VariantId};
use crate::signature::{
    association_signature, name_signature, occurrence_signature, statement_signature,
    variant_signature,
};

/// Pending topic merges; `(target, source)` with the target surviving.
pub(crate) type MergeQueue = VecDeque<(TopicId, TopicId)>;

fn resolve_merged(merged_into: &BTreeMap<TopicId, TopicId>, mut id: TopicId) -> TopicId {
    while let Some(next) = merged_into.get(&id) {
        id = *next;
    }
    id
}

impl TopicMap {
    /// Merges `source` into `target`: identity and type sets are unioned,
    /// every statement owned by `source` moves onto `target`, every reference
    /// to `source` (scope member, type, role player, reifier) is re-pointed,
    /// statements that become structural duplicates are folded, and `source`
    /// is drained and removed.
    ///
    /// The end graph content is identical regardless of argument order; only
    /// which `TopicId` survives is order-dependent.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConstruct`] if either id does not
    /// resolve. Returns [`ModelError::ReificationConflict`] when the cascade
    /// forces one topic to reify two structurally incompatible constructs;
    /// the cascade aborts at that point and merges already applied remain.
    pub fn merge_topics(&mut self, target: TopicId, source: TopicId) -> Result<(), ModelError> {
        self.require_topic(target, "merge target is not a known topic")?;
        self.require_topic(source, "merge source is not a known topic")?;
        if target == source {
            debug_assert!(false, "attempted to merge a topic with itself");
            return Ok(());
        }
        let mut queue = MergeQueue::new();
        queue.push_back((target, source));
        self.run_merge_queue(queue)
    }

    /// Assigns, replaces, or clears the reifier of a construct, enforcing the
    /// one-reifier / one-reified-construct exclusivity rule.
    ///
    /// Passing `None` clears the reifier. If the construct already has a
    /// different reifier R, R and `topic` are merged as topics (with `topic`
    /// surviving). If `topic` already reifies a different construct C, the
    /// two constructs are merged as statements when structurally compatible.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConstruct`] if the construct or topic
    /// does not resolve, and [`ModelError::ReificationConflict`] when
    /// `topic` already reifies a structurally incompatible construct.
    pub fn set_reifier(
        &mut self,
        construct: ReifiableId,
        reifier: Option<TopicId>,
    ) -> Result<(), ModelError> {
        if !self.construct_exists(construct) {
            return Err(ModelError::InvalidConstruct(
                "reified construct does not resolve",
            ));
        }
        match reifier {
            None => {
                if let Some(old) = self.reifier_of(construct) {
                    self.set_reifier_raw(construct, None);
                    if let Some(topic) = self.topics.get_mut(&old) {
                        topic.reified = None;
                    }
                }
                Ok(())
            }
            Some(topic) => {
                self.require_topic(topic, "reifier is not a known topic")?;
                self.apply_reifier(construct, topic)
            }
        }
    }

    fn apply_reifier(&mut self, construct: ReifiableId, topic: TopicId) -> Result<(), ModelError> {
        if self.reifier_of(construct) == Some(topic) {
            return Ok(());
        }
        if let Some(current) = self.reifier_of(construct) {
            // The construct keeps a reifier either way: merging `current`
            // into `topic` re-points the reified back-reference, resolving
            // against anything `topic` already reifies along the way.
            return self.merge_topics(topic, current);
        }
        let existing = self.topics.get(&topic).and_then(|record| record.reified);
        let Some(existing) = existing else {
            self.set_reifier_raw(construct, Some(topic));
            if let Some(record) = self.topics.get_mut(&topic) {
                record.reified = Some(construct);
            }
            return Ok(());
        };
        if existing == construct {
            debug_assert!(false, "reified back-reference desynced from reifier field");
            self.set_reifier_raw(construct, Some(topic));
            return Ok(());
        }
        let proposed_sig = statement_signature(self, construct);
        if proposed_sig.is_some() && proposed_sig == statement_signature(self, existing) {
            // Structurally compatible: the construct addressed by the call
            // survives and absorbs the one previously reified.
            self.set_reifier_raw(existing, None);
            if let Some(record) = self.topics.get_mut(&topic) {
                record.reified = None;
            }
            let mut queue = MergeQueue::new();
            self.merge_statement_pair(construct, existing, &mut queue);
            self.set_reifier_raw(construct, Some(topic));
            if let Some(record) = self.topics.get_mut(&topic) {
                record.reified = Some(construct);
            }
            self.run_merge_queue(queue)
        } else {
            Err(ModelError::ReificationConflict {
                reifier: topic,
                existing,
                proposed: construct,
            })
        }
    }

    /// Drains the queue of pending topic merges to fixpoint.
    pub(crate) fn run_merge_queue(&mut self, mut queue: MergeQueue) -> Result<(), ModelError> {
        let mut merged_into: BTreeMap<TopicId, TopicId> = BTreeMap::new();
        while let Some((target, source)) = queue.pop_front() {
            let target = resolve_merged(&merged_into, target);
            let source = resolve_merged(&merged_into, source);
            if target == source {
                continue;
            }
            if !self.topics.contains_key(&target) || !self.topics.contains_key(&source) {
                debug_assert!(false, "merge queue referenced a missing topic");
                continue;
            }
            self.merge_topic_pair(target, source, &mut queue)?;
            merged_into.insert(source, target);
        }
        Ok(())
    }

    fn merge_topic_pair(
        &mut self,
        target: TopicId,
        source: TopicId,
        queue: &mut MergeQueue,
    ) -> Result<(), ModelError> {
        #[cfg(feature = "telemetry")]
        crate::telemetry::topic_merge(target.value(), source.value());

        let Some(record) = self.topics.get_mut(&source) else {
            debug_assert!(false, "merge pair referenced a missing source topic");
            return Ok(());
        };
        let subject_identifiers = mem::take(&mut record.subject_identifiers);
        let subject_locators = mem::take(&mut record.subject_locators);
        let item_identifiers = mem::take(&mut record.item_identifiers);
        let types = mem::take(&mut record.types);
        let names = mem::take(&mut record.names);
        let occurrences = mem::take(&mut record.occurrences);
        let roles_played = mem::take(&mut record.roles_played);
        // `reified` stays on the record: the duplicate pass below may fold
        // the very statement the source reifies, and must see the live
        // back-reference while doing so.

        // Identity union; every index entry for a moved locator is repaired
        // here, before any statement is touched.
        for locator in &subject_identifiers {
            self.index.insert(
                crate::ident::IdentityKind::SubjectIdentifier,
                locator.clone(),
                target,
            );
        }
        for locator in &subject_locators {
            self.index.insert(
                crate::ident::IdentityKind::SubjectLocator,
                locator.clone(),
                target,
            );
        }
        for locator in &item_identifiers {
            self.index.insert(
                crate::ident::IdentityKind::ItemIdentifier,
                locator.clone(),
                target,
            );
        }
        if let Some(record) = self.topics.get_mut(&target) {
            record.subject_identifiers.extend(subject_identifiers);
            record.subject_locators.extend(subject_locators);
            record.item_identifiers.extend(item_identifiers);
            record.types.extend(types);
        }

        let mut touched_assocs: Vec<AssociationId> = Vec::new();
        let mut touched_roles: Vec<RoleId> = Vec::new();
        let mut touched_names: Vec<NameId> = Vec::new();
        let mut touched_variants: Vec<VariantId> = Vec::new();
        let mut touched_occurrences: Vec<OccurrenceId> = Vec::new();

        // Statements owned by the source move onto the target.
        for id in names {
            if let Some(name) = self.names.get_mut(&id) {
                name.parent = target;
            }
            if let Some(record) = self.topics.get_mut(&target) {
                record.names.insert(id);
            }
            touched_names.push(id);
        }
        for id in occurrences {
            if let Some(occurrence) = self.occurrences.get_mut(&id) {
                occurrence.parent = target;
            }
            if let Some(record) = self.topics.get_mut(&target) {
                record.occurrences.insert(id);
            }
            touched_occurrences.push(id);
        }

        // Roles the source plays re-point to the target.
        for id in roles_played {
            if let Some(role) = self.roles.get_mut(&id) {
                debug_assert_eq!(role.player, source, "roles_played back-reference desynced");
                role.player = target;
                touched_roles.push(id);
                touched_assocs.push(role.parent);
            }
            if let Some(record) = self.topics.get_mut(&target) {
                record.roles_played.insert(id);
            }
        }

        self.repoint_type_and_scope_refs(
            source,
            target,
            &mut touched_assocs,
            &mut touched_roles,
            &mut touched_names,
            &mut touched_variants,
            &mut touched_occurrences,
        );

        // Anything whose structure changed is re-checked for duplicates.
        // Roles first so association signatures settle before the global
        // association pass. This runs before the reifier transfer so that a
        // reification conflict can abort without leaving unfolded duplicates.
        for id in touched_roles {
            self.dedupe_role(id, queue);
        }
        for id in touched_variants {
            self.dedupe_variant(id, queue);
        }
        for id in touched_names {
            self.dedupe_name(id, queue);
        }
        for id in touched_occurrences {
            self.dedupe_occurrence(id, queue);
        }
        for id in touched_assocs {
            self.dedupe_association(id, queue);
        }

        // The construct reified by the source transfers to the target,
        // resolving against anything the target already reifies. Read fresh:
        // the duplicate pass may have folded or re-pointed it.
        let reified = self.topics.get(&source).and_then(|record| record.reified);
        if let Some(construct) = reified {
            let target_reified = self.topics.get(&target).and_then(|record| record.reified);
            match target_reified {
                None => {
                    self.set_reifier_raw(construct, Some(target));
                    if let Some(record) = self.topics.get_mut(&target) {
                        record.reified = Some(construct);
                    }
                }
                Some(existing) => {
                    debug_assert_ne!(existing, construct, "two topics reified one construct");
                    let moved_sig = statement_signature(self, construct);
                    if moved_sig.is_some() && moved_sig == statement_signature(self, existing) {
                        self.set_reifier_raw(construct, None);
                        self.merge_statement_pair(existing, construct, queue);
                    } else {
                        // Abort without removing the source: it keeps its
                        // reified back-reference, so the partially merged
                        // map stays internally consistent for the caller.
                        return Err(ModelError::ReificationConflict {
                            reifier: target,
                            existing,
                            proposed: construct,
                        });
                    }
                }
            }
            if let Some(record) = self.topics.get_mut(&source) {
                record.reified = None;
            }
        }

        let removed = self.topics.remove(&source);
        debug_assert!(
            removed.as_ref().is_some_and(|r| {
                r.has_no_identity()
                    && r.names.is_empty()
                    && r.occurrences.is_empty()
                    && r.reified.is_none()
            }),
            "source topic not fully drained before removal"
        );
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn repoint_type_and_scope_refs(
        &mut self,
        source: TopicId,
        target: TopicId,
        touched_assocs: &mut Vec<AssociationId>,
        touched_roles: &mut Vec<RoleId>,
        touched_names: &mut Vec<NameId>,
        touched_variants: &mut Vec<VariantId>,
        touched_occurrences: &mut Vec<OccurrenceId>,
    ) {
        let typed: Vec<TopicId> = self
            .topics
            .iter()
            .filter(|(_, record)| record.types.contains(&source))
            .map(|(id, _)| *id)
            .collect();
        for id in typed {
            if let Some(record) = self.topics.get_mut(&id) {
                record.types.remove(&source);
                record.types.insert(target);
            }
        }

        let assocs: Vec<AssociationId> = self
            .associations
            .iter()
            .filter(|(_, record)| record.ty == source || record.scope.contains(&source))
            .map(|(id, _)| *id)
            .collect();
        for id in assocs {
            if let Some(record) = self.associations.get_mut(&id) {
                if record.ty == source {
                    record.ty = target;
                }
                if record.scope.remove(&source) {
                    record.scope.insert(target);
                }
            }
            touched_assocs.push(id);
        }

        let roles: Vec<RoleId> = self
            .roles
            .iter()
            .filter(|(_, record)| record.ty == source)
            .map(|(id, _)| *id)
            .collect();
        for id in roles {
            let mut parent = None;
            if let Some(record) = self.roles.get_mut(&id) {
                record.ty = target;
                parent = Some(record.parent);
            }
            touched_roles.push(id);
            if let Some(parent) = parent {
                touched_assocs.push(parent);
            }
        }

        let names: Vec<NameId> = self
            .names
            .iter()
            .filter(|(_, record)| record.ty == source || record.scope.contains(&source))
            .map(|(id, _)| *id)
            .collect();
        for id in names {
            if let Some(record) = self.names.get_mut(&id) {
                if record.ty == source {
                    record.ty = target;
                }
                if record.scope.remove(&source) {
                    record.scope.insert(target);
                }
            }
            touched_names.push(id);
        }

        let variants: Vec<VariantId> = self
            .variants
            .iter()
            .filter(|(_, record)| record.scope.contains(&source))
            .map(|(id, _)| *id)
            .collect();
        for id in variants {
            if let Some(record) = self.variants.get_mut(&id) {
                if record.scope.remove(&source) {
                    record.scope.insert(target);
                }
            }
            touched_variants.push(id);
        }

        let occurrences: Vec<OccurrenceId> = self
            .occurrences
            .iter()
            .filter(|(_, record)| record.ty == source || record.scope.contains(&source))
            .map(|(id, _)| *id)
            .collect();
        for id in occurrences {
            if let Some(record) = self.occurrences.get_mut(&id) {
                if record.ty == source {
                    record.ty = target;
                }
                if record.scope.remove(&source) {
                    record.scope.insert(target);
                }
            }
            touched_occurrences.push(id);
        }
    }

    // ── Statement duplicate suppression ────────────────────────────────

    /// Folds `id` into an equal-signature sibling if one exists; returns the
    /// surviving id (the smaller of the two, deterministically).
    pub(crate) fn dedupe_association(
        &mut self,
        id: AssociationId,
        queue: &mut MergeQueue,
    ) -> AssociationId {
        let Some(sig) = association_signature(self, id) else {
            return id;
        };
        // O(n) scan over all associations. Acceptable for in-memory maps of
        // typical size; revisit with a signature table if profiles say so.
        let candidates: Vec<AssociationId> = self.associations.keys().copied().collect();
        for sibling in candidates {
            if sibling == id {
                continue;
            }
            if association_signature(self, sibling) == Some(sig) {
                let (survivor, dup) = if sibling < id { (sibling, id) } else { (id, sibling) };
                self.merge_association_pair(survivor, dup, queue);
                return survivor;
            }
        }
        id
    }

    /// Folds `id` into an equal-pair sibling role of the same association if
    /// one exists; returns the surviving id.
    pub(crate) fn dedupe_role(&mut self, id: RoleId, queue: &mut MergeQueue) -> RoleId {
        let Some(record) = self.roles.get(&id) else {
            return id;
        };
        let (parent, ty, player) = (record.parent, record.ty, record.player);
        let Some(assoc) = self.associations.get(&parent) else {
            debug_assert!(false, "role parent association does not resolve");
            return id;
        };
        let siblings: Vec<RoleId> = assoc.roles.iter().copied().collect();
        for sibling in siblings {
            if sibling == id {
                continue;
            }
            let matches = self
                .roles
                .get(&sibling)
                .is_some_and(|r| r.ty == ty && r.player == player);
            if matches {
                let (survivor, dup) = if sibling < id { (sibling, id) } else { (id, sibling) };
                self.merge_role_pair(survivor, dup, queue);
                return survivor;
            }
        }
        id
    }

    /// Folds `id` into an equal-signature sibling name if one exists; returns
    /// the surviving id.
    pub(crate) fn dedupe_name(&mut self, id: NameId, queue: &mut MergeQueue) -> NameId {
        let Some(record) = self.names.get(&id) else {
            return id;
        };
        let parent = record.parent;
        let Some(sig) = name_signature(self, id) else {
            return id;
        };
        let siblings: Vec<NameId> = self
            .topics
            .get(&parent)
            .map(|t| t.names.iter().copied().collect())
            .unwrap_or_default();
        for sibling in siblings {
            if sibling == id {
                continue;
            }
            if name_signature(self, sibling) == Some(sig) {
                let (survivor, dup) = if sibling < id { (sibling, id) } else { (id, sibling) };
                self.merge_name_pair(survivor, dup, queue);
                return survivor;
            }
        }
        id
    }

    /// Folds `id` into an equal-signature sibling variant if one exists;
    /// returns the surviving id.
    pub(crate) fn dedupe_variant(&mut self, id: VariantId, queue: &mut MergeQueue) -> VariantId {
        let Some(record) = self.variants.get(&id) else {
            return id;
        };
        let parent = record.parent;
        let Some(sig) = variant_signature(self, id) else {
            return id;
        };
        let siblings: Vec<VariantId> = self
            .names
            .get(&parent)
            .map(|n| n.variants.iter().copied().collect())
            .unwrap_or_default();
        for sibling in siblings {
            if sibling == id {
                continue;
            }
            if variant_signature(self, sibling) == Some(sig) {
                let (survivor, dup) = if sibling < id { (sibling, id) } else { (id, sibling) };
                self.merge_variant_pair(survivor, dup, queue);
                return survivor;
            }
        }
        id
    }

    /// Folds `id` into an equal-signature sibling occurrence if one exists;
    /// returns the surviving id.
    pub(crate) fn dedupe_occurrence(
        &mut self,
        id: OccurrenceId,
        queue: &mut MergeQueue,
    ) -> OccurrenceId {
        let Some(record) = self.occurrences.get(&id) else {
            return id;
        };
        let parent = record.parent;
        let Some(sig) = occurrence_signature(self, id) else {
            return id;
        };
        let siblings: Vec<OccurrenceId> = self
            .topics
            .get(&parent)
            .map(|t| t.occurrences.iter().copied().collect())
            .unwrap_or_default();
        for sibling in siblings {
            if sibling == id {
                continue;
            }
            if occurrence_signature(self, sibling) == Some(sig) {
                let (survivor, dup) = if sibling < id { (sibling, id) } else { (id, sibling) };
                self.merge_occurrence_pair(survivor, dup, queue);
                return survivor;
            }
        }
        id
    }

    // ── Statement merges ───────────────────────────────────────────────

    fn merge_statement_pair(
        &mut self,
        survivor: ReifiableId,
        dup: ReifiableId,
        queue: &mut MergeQueue,
    ) {
        match (survivor, dup) {
            (ReifiableId::Association(a), ReifiableId::Association(b)) => {
                self.merge_association_pair(a, b, queue);
            }
            (ReifiableId::Role(a), ReifiableId::Role(b)) => {
                let pa = self.roles.get(&a).map(|r| r.parent);
                let pb = self.roles.get(&b).map(|r| r.parent);
                match (pa, pb) {
                    (Some(pa), Some(pb)) if pa == pb => self.merge_role_pair(a, b, queue),
                    // Compatible roles under distinct associations mean the
                    // associations themselves are structural duplicates;
                    // merging them folds the roles pairwise.
                    (Some(pa), Some(pb)) => self.merge_association_pair(pa, pb, queue),
                    _ => debug_assert!(false, "role merge referenced a missing role"),
                }
            }
            (ReifiableId::Name(a), ReifiableId::Name(b)) => self.merge_name_pair(a, b, queue),
            (ReifiableId::Variant(a), ReifiableId::Variant(b)) => {
                self.merge_variant_pair(a, b, queue);
            }
            (ReifiableId::Occurrence(a), ReifiableId::Occurrence(b)) => {
                self.merge_occurrence_pair(a, b, queue);
            }
            _ => debug_assert!(false, "attempted to merge statements of different kinds"),
        }
    }

    fn merge_association_pair(
        &mut self,
        survivor: AssociationId,
        dup: AssociationId,
        queue: &mut MergeQueue,
    ) {
        debug_assert_ne!(survivor, dup, "attempted to merge an association with itself");
        #[cfg(feature = "telemetry")]
        crate::telemetry::statement_merge("association", survivor.value());
        let Some(dup_record) = self.associations.remove(&dup) else {
            debug_assert!(false, "association merge referenced a missing duplicate");
            return;
        };
        let survivor_roles: Vec<RoleId> = self
            .associations
            .get(&survivor)
            .map(|a| a.roles.iter().copied().collect())
            .unwrap_or_default();
        for role_id in dup_record.roles {
            let Some((ty, player)) = self.roles.get(&role_id).map(|r| (r.ty, r.player)) else {
                debug_assert!(false, "association roles referenced a missing role");
                continue;
            };
            let existing = survivor_roles.iter().copied().find(|sid| {
                self.roles
                    .get(sid)
                    .is_some_and(|r| r.ty == ty && r.player == player)
            });
            if let Some(existing) = existing {
                self.merge_role_pair(existing, role_id, queue);
            } else {
                if let Some(role) = self.roles.get_mut(&role_id) {
                    role.parent = survivor;
                }
                if let Some(assoc) = self.associations.get_mut(&survivor) {
                    assoc.roles.insert(role_id);
                }
            }
        }
        if let Some(assoc) = self.associations.get_mut(&survivor) {
            assoc.item_identifiers.extend(dup_record.item_identifiers);
        }
        self.fold_reifier_into(ReifiableId::Association(survivor), dup_record.reifier, queue);
    }

    fn merge_role_pair(&mut self, survivor: RoleId, dup: RoleId, queue: &mut MergeQueue) {
        debug_assert_ne!(survivor, dup, "attempted to merge a role with itself");
        let Some(dup_record) = self.roles.remove(&dup) else {
            debug_assert!(false, "role merge referenced a missing duplicate");
            return;
        };
        if let Some(assoc) = self.associations.get_mut(&dup_record.parent) {
            assoc.roles.remove(&dup);
        }
        if let Some(player) = self.topics.get_mut(&dup_record.player) {
            player.roles_played.remove(&dup);
        }
        if let Some(role) = self.roles.get_mut(&survivor) {
            role.item_identifiers.extend(dup_record.item_identifiers);
        }
        self.fold_reifier_into(ReifiableId::Role(survivor), dup_record.reifier, queue);
    }

    fn merge_name_pair(&mut self, survivor: NameId, dup: NameId, queue: &mut MergeQueue) {
        debug_assert_ne!(survivor, dup, "attempted to merge a name with itself");
        #[cfg(feature = "telemetry")]
        crate::telemetry::statement_merge("name", survivor.value());
        let Some(dup_record) = self.names.remove(&dup) else {
            debug_assert!(false, "name merge referenced a missing duplicate");
            return;
        };
        if let Some(topic) = self.topics.get_mut(&dup_record.parent) {
            topic.names.remove(&dup);
        }
        let survivor_scope = self
            .names
            .get(&survivor)
            .map(|n| n.scope.clone())
            .unwrap_or_default();
        let adopted: Vec<VariantId> = dup_record.variants.iter().copied().collect();
        for variant_id in adopted {
            if let Some(variant) = self.variants.get_mut(&variant_id) {
                variant.parent = survivor;
                variant.scope.extend(survivor_scope.iter().copied());
            }
            if let Some(name) = self.names.get_mut(&survivor) {
                name.variants.insert(variant_id);
            }
        }
        if let Some(name) = self.names.get_mut(&survivor) {
            name.item_identifiers.extend(dup_record.item_identifiers);
        }
        self.fold_reifier_into(ReifiableId::Name(survivor), dup_record.reifier, queue);
        let variants: Vec<VariantId> = self
            .names
            .get(&survivor)
            .map(|n| n.variants.iter().copied().collect())
            .unwrap_or_default();
        for variant_id in variants {
            self.dedupe_variant(variant_id, queue);
        }
    }

    fn merge_variant_pair(&mut self, survivor: VariantId, dup: VariantId, queue: &mut MergeQueue) {
        debug_assert_ne!(survivor, dup, "attempted to merge a variant with itself");
        let Some(dup_record) = self.variants.remove(&dup) else {
            debug_assert!(false, "variant merge referenced a missing duplicate");
            return;
        };
        if let Some(name) = self.names.get_mut(&dup_record.parent) {
            name.variants.remove(&dup);
        }
        if let Some(variant) = self.variants.get_mut(&survivor) {
            variant.item_identifiers.extend(dup_record.item_identifiers);
        }
        self.fold_reifier_into(ReifiableId::Variant(survivor), dup_record.reifier, queue);
    }

    fn merge_occurrence_pair(
        &mut self,
        survivor: OccurrenceId,
        dup: OccurrenceId,
        queue: &mut MergeQueue,
    ) {
        debug_assert_ne!(survivor, dup, "attempted to merge an occurrence with itself");
        #[cfg(feature = "telemetry")]
        crate::telemetry::statement_merge("occurrence", survivor.value());
        let Some(dup_record) = self.occurrences.remove(&dup) else {
            debug_assert!(false, "occurrence merge referenced a missing duplicate");
            return;
        };
        if let Some(topic) = self.topics.get_mut(&dup_record.parent) {
            topic.occurrences.remove(&dup);
        }
        if let Some(occurrence) = self.occurrences.get_mut(&survivor) {
            occurrence.item_identifiers.extend(dup_record.item_identifiers);
        }
        self.fold_reifier_into(ReifiableId::Occurrence(survivor), dup_record.reifier, queue);
    }

    /// Folds the reifier of an absorbed statement into the survivor: adopt it
    /// when the survivor is unreified, otherwise enqueue a merge of the two
    /// reifier topics (the survivor's reifier survives).
    fn fold_reifier_into(
        &mut self,
        survivor: ReifiableId,
        dup_reifier: Option<TopicId>,
        queue: &mut MergeQueue,
    ) {
        let Some(reifier) = dup_reifier else {
            return;
        };
        // The absorbed statement is gone; its reifier's back-reference is
        // cleared before any further resolution.
        if let Some(topic) = self.topics.get_mut(&reifier) {
            topic.reified = None;
        }
        match self.reifier_of(survivor) {
            None => {
                self.set_reifier_raw(survivor, Some(reifier));
                if let Some(topic) = self.topics.get_mut(&reifier) {
                    topic.reified = Some(survivor);
                }
            }
            Some(existing) if existing == reifier => {}
            Some(existing) => {
                #[cfg(feature = "telemetry")]
                crate::telemetry::reifier_fold(existing.value(), reifier.value());
                queue.push_back((existing, reifier));
            }
        }
    }

    // ── Reifiable plumbing ─────────────────────────────────────────────

    pub(crate) fn construct_exists(&self, construct: ReifiableId) -> bool {
        match construct {
            ReifiableId::Map => true,
            ReifiableId::Association(id) => self.associations.contains_key(&id),
            ReifiableId::Role(id) => self.roles.contains_key(&id),
            ReifiableId::Name(id) => self.names.contains_key(&id),
            ReifiableId::Variant(id) => self.variants.contains_key(&id),
            ReifiableId::Occurrence(id) => self.occurrences.contains_key(&id),
        }
    }

    pub(crate) fn set_reifier_raw(&mut self, construct: ReifiableId, reifier: Option<TopicId>) {
        match construct {
            ReifiableId::Map => self.map_reifier = reifier,
            ReifiableId::Association(id) => {
                if let Some(record) = self.associations.get_mut(&id) {
                    record.reifier = reifier;
                } else {
                    debug_assert!(false, "reifier write to a missing association");
                }
            }
            ReifiableId::Role(id) => {
                if let Some(record) = self.roles.get_mut(&id) {
                    record.reifier = reifier;
                } else {
                    debug_assert!(false, "reifier write to a missing role");
                }
            }
            ReifiableId::Name(id) => {
                if let Some(record) = self.names.get_mut(&id) {
                    record.reifier = reifier;
                } else {
                    debug_assert!(false, "reifier write to a missing name");
                }
            }
            ReifiableId::Variant(id) => {
                if let Some(record) = self.variants.get_mut(&id) {
                    record.reifier = reifier;
                } else {
                    debug_assert!(false, "reifier write to a missing variant");
                }
            }
            ReifiableId::Occurrence(id) => {
                if let Some(record) = self.occurrences.get_mut(&id) {
                    record.reifier = reifier;
                } else {
                    debug_assert!(false, "reifier write to a missing occurrence");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use crate::graph::{AssociationSpec, NameSpec, OccurrenceSpec, RoleSpec, TopicMap};
    use crate::ident::Locator;

    fn dt() -> Locator {
        Locator::new("http://www.w3.org/2001/XMLSchema#string")
    }

    #[test]
    fn merge_unions_identity_and_types() {
        let mut map = TopicMap::new();
        let ty = map.create_topic();
        let a = map.create_topic();
        let b = map.create_topic();
        map.add_subject_identifier(a, Locator::new("u:1")).unwrap();
        map.add_subject_identifier(b, Locator::new("u:2")).unwrap();
        map.add_type(b, ty).unwrap();

        map.merge_topics(a, b).unwrap();
        let record = map.topic(a).unwrap();
        assert!(record.subject_identifiers.contains(&Locator::new("u:1")));
        assert!(record.subject_identifiers.contains(&Locator::new("u:2")));
        assert!(record.types.contains(&ty));
        assert!(map.topic(b).is_none());
        assert_eq!(map.topic_by_subject_identifier(&Locator::new("u:2")), Some(a));
    }

    #[test]
    fn merge_moves_statements_and_folds_duplicates() {
        let mut map = TopicMap::new();
        let ty = map.create_topic();
        let a = map.create_topic();
        let b = map.create_topic();
        map.create_occurrence(
            a,
            &OccurrenceSpec {
                item_identifiers: vec![Locator::new("u:iid-a")],
                ..OccurrenceSpec::new(ty, "v", dt())
            },
        )
        .unwrap();
        map.create_occurrence(
            b,
            &OccurrenceSpec {
                item_identifiers: vec![Locator::new("u:iid-b")],
                ..OccurrenceSpec::new(ty, "v", dt())
            },
        )
        .unwrap();

        map.merge_topics(a, b).unwrap();
        let record = map.topic(a).unwrap();
        assert_eq!(record.occurrences.len(), 1);
        let occurrence = map
            .occurrence(*record.occurrences.iter().next().unwrap())
            .unwrap();
        assert!(occurrence.item_identifiers.contains(&Locator::new("u:iid-a")));
        assert!(occurrence.item_identifiers.contains(&Locator::new("u:iid-b")));
    }

    #[test]
    fn merge_repoints_scope_and_players() {
        let mut map = TopicMap::new();
        let at = map.create_topic();
        let rt = map.create_topic();
        let theme_a = map.create_topic();
        let theme_b = map.create_topic();
        let player = map.create_topic();
        let assoc = map
            .create_association(&AssociationSpec {
                scope: vec![theme_a],
                roles: vec![RoleSpec::new(rt, player)],
                ..AssociationSpec::new(at)
            })
            .unwrap();

        map.merge_topics(theme_b, theme_a).unwrap();
        let record = map.association(assoc).unwrap();
        assert!(record.scope.contains(&theme_b));
        assert!(!record.scope.contains(&theme_a));

        map.merge_topics(rt, player).unwrap();
        let record = map.association(assoc).unwrap();
        let role = map.role(*record.roles.iter().next().unwrap()).unwrap();
        assert_eq!(role.player, rt);
        assert!(map.topic(rt).unwrap().roles_played.contains(
            record.roles.iter().next().unwrap()
        ));
    }

    #[test]
    fn remerging_an_already_merged_pair_is_a_no_op() {
        let mut map = TopicMap::new();
        let ty = map.create_topic();
        let a = map.create_topic();
        let b = map.create_topic();
        map.create_name(a, &NameSpec::new(ty, "n")).unwrap();
        map.add_subject_identifier(a, Locator::new("u:1")).unwrap();
        map.add_subject_identifier(b, Locator::new("u:1")).unwrap();
        assert!(map.topic(a).is_none());

        let topics = map.topic_count();
        let statements = map.statement_count();
        map.add_subject_identifier(b, Locator::new("u:1")).unwrap();
        assert_eq!(map.topic_count(), topics);
        assert_eq!(map.statement_count(), statements);
    }

    #[test]
    fn cascade_reduces_counts_to_fixpoint() {
        let mut map = TopicMap::new();
        let ty = map.create_topic();
        let a = map.create_topic();
        let b = map.create_topic();
        let ra = map.create_topic();
        let rb = map.create_topic();
        let oa = map
            .create_occurrence(a, &OccurrenceSpec::new(ty, "v", dt()))
            .unwrap();
        let ob = map
            .create_occurrence(b, &OccurrenceSpec::new(ty, "v", dt()))
            .unwrap();
        map.set_reifier(oa.into(), Some(ra)).unwrap();
        map.set_reifier(ob.into(), Some(rb)).unwrap();
        map.add_subject_identifier(ra, Locator::new("u:r1")).unwrap();
        map.add_subject_identifier(rb, Locator::new("u:r2")).unwrap();

        // Merging a and b dedupes their occurrences, which folds the two
        // reifier topics into one: a second-order topic merge.
        let topics_before = map.topic_count();
        let statements_before = map.statement_count();
        map.merge_topics(a, b).unwrap();
        assert!(map.topic_count() < topics_before);
        assert!(map.statement_count() < statements_before);

        let record = map.topic(a).unwrap();
        assert_eq!(record.occurrences.len(), 1);
        let survivor = map.topic(ra).unwrap();
        assert!(survivor.subject_identifiers.contains(&Locator::new("u:r1")));
        assert!(survivor.subject_identifiers.contains(&Locator::new("u:r2")));
        assert!(map.topic(rb).is_none());
    }
}
