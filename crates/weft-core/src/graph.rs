// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory topic map store: arenas, factories, and the mutation surface.
//!
//! All constructs live in `BTreeMap` arenas addressed by opaque monotonic
//! ids, so merge-driven removals can never leave dangling native references;
//! every removal redirects or clears back-references before completing.
//! External parsers drive the map exclusively through the operations here;
//! each identity-changing call consults the identity index and, on a
//! collision, fires the merge engine rather than surfacing a conflict.
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::ModelError;
use crate::ident::{
    AssociationId, IdentityKind, Locator, NameId, OccurrenceId, ReifiableId, RoleId, TopicId,
    VariantId,
};
use crate::index::IdentityIndex;
use crate::record::{
    AssociationRecord, NameRecord, OccurrenceRecord, RoleRecord, TopicRecord, VariantRecord,
};

/// Creation parameters for a role inside [`AssociationSpec`].
#[derive(Clone, Debug)]
pub struct RoleSpec {
    /// Role type.
    pub ty: TopicId,
    /// Playing topic.
    pub player: TopicId,
}

impl RoleSpec {
    /// Builds a role spec from its two mandatory topics.
    #[must_use]
    pub fn new(ty: TopicId, player: TopicId) -> Self {
        Self { ty, player }
    }
}

/// Creation parameters for [`TopicMap::create_association`].
#[derive(Clone, Debug)]
pub struct AssociationSpec {
    /// Association type.
    pub ty: TopicId,
    /// Scope themes; empty means unconstrained.
    pub scope: Vec<TopicId>,
    /// Reifying topic, applied after duplicate suppression.
    pub reifier: Option<TopicId>,
    /// Item identifiers of the statement.
    pub item_identifiers: Vec<Locator>,
    /// Roles; exact (type, player) duplicates are collapsed.
    pub roles: Vec<RoleSpec>,
}

impl AssociationSpec {
    /// Builds a spec with the mandatory type and everything else empty.
    #[must_use]
    pub fn new(ty: TopicId) -> Self {
        Self {
            ty,
            scope: Vec::new(),
            reifier: None,
            item_identifiers: Vec::new(),
            roles: Vec::new(),
        }
    }
}

/// Creation parameters for [`TopicMap::create_name`].
#[derive(Clone, Debug)]
pub struct NameSpec {
    /// Name type.
    pub ty: TopicId,
    /// Name value.
    pub value: String,
    /// Scope themes; empty means unconstrained.
    pub scope: Vec<TopicId>,
    /// Reifying topic, applied after duplicate suppression.
    pub reifier: Option<TopicId>,
    /// Item identifiers of the statement.
    pub item_identifiers: Vec<Locator>,
    /// Variants to create on the (surviving) name.
    pub variants: Vec<VariantSpec>,
}

impl NameSpec {
    /// Builds a spec with the mandatory type and value, everything else empty.
    #[must_use]
    pub fn new(ty: TopicId, value: impl Into<String>) -> Self {
        Self {
            ty,
            value: value.into(),
            scope: Vec::new(),
            reifier: None,
            item_identifiers: Vec::new(),
            variants: Vec::new(),
        }
    }
}

/// Creation parameters for [`TopicMap::create_variant`].
#[derive(Clone, Debug)]
pub struct VariantSpec {
    /// Variant value.
    pub value: String,
    /// Datatype locator of the value.
    pub datatype: Locator,
    /// Additional scope themes; the parent name's scope is unioned in, so the
    /// superset invariant holds by construction.
    pub scope: Vec<TopicId>,
    /// Reifying topic, applied after duplicate suppression.
    pub reifier: Option<TopicId>,
    /// Item identifiers of the statement.
    pub item_identifiers: Vec<Locator>,
}

impl VariantSpec {
    /// Builds a spec with the mandatory value and datatype, everything else
    /// empty.
    #[must_use]
    pub fn new(value: impl Into<String>, datatype: Locator) -> Self {
        Self {
            value: value.into(),
            datatype,
            scope: Vec::new(),
            reifier: None,
            item_identifiers: Vec::new(),
        }
    }
}

/// Creation parameters for [`TopicMap::create_occurrence`].
#[derive(Clone, Debug)]
pub struct OccurrenceSpec {
    /// Occurrence type.
    pub ty: TopicId,
    /// Occurrence value.
    pub value: String,
    /// Datatype locator of the value.
    pub datatype: Locator,
    /// Scope themes; empty means unconstrained.
    pub scope: Vec<TopicId>,
    /// Reifying topic, applied after duplicate suppression.
    pub reifier: Option<TopicId>,
    /// Item identifiers of the statement.
    pub item_identifiers: Vec<Locator>,
}

impl OccurrenceSpec {
    /// Builds a spec with the mandatory type, value and datatype, everything
    /// else empty.
    #[must_use]
    pub fn new(ty: TopicId, value: impl Into<String>, datatype: Locator) -> Self {
        Self {
            ty,
            value: value.into(),
            datatype,
            scope: Vec::new(),
            reifier: None,
            item_identifiers: Vec::new(),
        }
    }
}

/// The topic map: owner of all topics and statements.
///
/// Single-threaded and synchronous; no operation suspends. Multi-threaded
/// use requires one external exclusive lock over the whole map, because a
/// single identity addition can cascade into merges touching arbitrary parts
/// of the graph.
#[derive(Clone, Debug, Default)]
pub struct TopicMap {
    pub(crate) topics: BTreeMap<TopicId, TopicRecord>,
    pub(crate) associations: BTreeMap<AssociationId, AssociationRecord>,
    pub(crate) roles: BTreeMap<RoleId, RoleRecord>,
    pub(crate) names: BTreeMap<NameId, NameRecord>,
    pub(crate) variants: BTreeMap<VariantId, VariantRecord>,
    pub(crate) occurrences: BTreeMap<OccurrenceId, OccurrenceRecord>,
    pub(crate) index: IdentityIndex,
    /// Item identifiers of the map itself.
    pub(crate) map_item_identifiers: BTreeSet<Locator>,
    /// Reifier of the map itself.
    pub(crate) map_reifier: Option<TopicId>,
    next_topic: u32,
    next_association: u32,
    next_role: u32,
    next_name: u32,
    next_variant: u32,
    next_occurrence: u32,
}

impl TopicMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Factories ──────────────────────────────────────────────────────

    /// Creates a fresh topic with no identity, types, or statements.
    pub fn create_topic(&mut self) -> TopicId {
        let id = TopicId(self.next_topic);
        self.next_topic += 1;
        self.topics.insert(id, TopicRecord::default());
        id
    }

    /// Creates an association with its roles, suppressing structural
    /// duplicates: if an equal-signature association already exists, the new
    /// statement is folded into it and the survivor's id is returned.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConstruct`] if any referenced topic id
    /// does not resolve (nothing is allocated in that case), and propagates
    /// [`ModelError::ReificationConflict`] from the reifier application.
    pub fn create_association(
        &mut self,
        spec: &AssociationSpec,
    ) -> Result<AssociationId, ModelError> {
        self.require_topic(spec.ty, "association type is not a known topic")?;
        self.require_topics(&spec.scope, "association scope theme is not a known topic")?;
        if let Some(reifier) = spec.reifier {
            self.require_topic(reifier, "association reifier is not a known topic")?;
        }
        for role in &spec.roles {
            self.require_topic(role.ty, "role type is not a known topic")?;
            self.require_topic(role.player, "role player is not a known topic")?;
        }

        let id = AssociationId(self.next_association);
        self.next_association += 1;
        self.associations.insert(
            id,
            AssociationRecord {
                ty: spec.ty,
                scope: spec.scope.iter().copied().collect(),
                roles: BTreeSet::new(),
                item_identifiers: spec.item_identifiers.iter().cloned().collect(),
                reifier: None,
            },
        );

        let mut seen_pairs: BTreeSet<(TopicId, TopicId)> = BTreeSet::new();
        for role in &spec.roles {
            if !seen_pairs.insert((role.ty, role.player)) {
                continue;
            }
            self.insert_role_record(id, role.ty, role.player);
        }

        let mut queue = VecDeque::new();
        let survivor = self.dedupe_association(id, &mut queue);
        self.run_merge_queue(queue)?;
        if let Some(reifier) = spec.reifier {
            self.set_reifier(ReifiableId::Association(survivor), Some(reifier))?;
        }
        Ok(survivor)
    }

    /// Creates a name on `parent`, suppressing structural duplicates, then
    /// creates the requested variants on the surviving name.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConstruct`] if any referenced topic id
    /// does not resolve (nothing is allocated in that case), and propagates
    /// [`ModelError::ReificationConflict`] from the reifier application.
    pub fn create_name(&mut self, parent: TopicId, spec: &NameSpec) -> Result<NameId, ModelError> {
        self.require_topic(parent, "name parent is not a known topic")?;
        self.require_topic(spec.ty, "name type is not a known topic")?;
        self.require_topics(&spec.scope, "name scope theme is not a known topic")?;
        if let Some(reifier) = spec.reifier {
            self.require_topic(reifier, "name reifier is not a known topic")?;
        }
        for variant in &spec.variants {
            self.require_topics(&variant.scope, "variant scope theme is not a known topic")?;
            if let Some(reifier) = variant.reifier {
                self.require_topic(reifier, "variant reifier is not a known topic")?;
            }
        }

        let id = NameId(self.next_name);
        self.next_name += 1;
        self.names.insert(
            id,
            NameRecord {
                parent,
                ty: spec.ty,
                value: spec.value.clone(),
                scope: spec.scope.iter().copied().collect(),
                variants: BTreeSet::new(),
                item_identifiers: spec.item_identifiers.iter().cloned().collect(),
                reifier: None,
            },
        );
        if let Some(topic) = self.topics.get_mut(&parent) {
            topic.names.insert(id);
        }

        let mut queue = VecDeque::new();
        let survivor = self.dedupe_name(id, &mut queue);
        self.run_merge_queue(queue)?;
        if let Some(reifier) = spec.reifier {
            self.set_reifier(ReifiableId::Name(survivor), Some(reifier))?;
        }
        for variant in &spec.variants {
            self.create_variant(survivor, variant)?;
        }
        Ok(survivor)
    }

    /// Creates a variant on `name`. The parent name's scope is unioned into
    /// the variant scope, and structural duplicates among the name's variants
    /// are suppressed.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConstruct`] if `name` or any referenced
    /// topic id does not resolve (nothing is allocated in that case), and
    /// propagates [`ModelError::ReificationConflict`] from the reifier
    /// application.
    pub fn create_variant(
        &mut self,
        name: NameId,
        spec: &VariantSpec,
    ) -> Result<VariantId, ModelError> {
        self.require_topics(&spec.scope, "variant scope theme is not a known topic")?;
        if let Some(reifier) = spec.reifier {
            self.require_topic(reifier, "variant reifier is not a known topic")?;
        }
        let Some(parent) = self.names.get(&name) else {
            return Err(ModelError::InvalidConstruct(
                "variant parent is not a known name",
            ));
        };
        let mut scope: BTreeSet<TopicId> = spec.scope.iter().copied().collect();
        scope.extend(parent.scope.iter().copied());

        let id = VariantId(self.next_variant);
        self.next_variant += 1;
        self.variants.insert(
            id,
            VariantRecord {
                parent: name,
                value: spec.value.clone(),
                datatype: spec.datatype.clone(),
                scope,
                item_identifiers: spec.item_identifiers.iter().cloned().collect(),
                reifier: None,
            },
        );
        if let Some(record) = self.names.get_mut(&name) {
            record.variants.insert(id);
        }

        let mut queue = VecDeque::new();
        let survivor = self.dedupe_variant(id, &mut queue);
        self.run_merge_queue(queue)?;
        if let Some(reifier) = spec.reifier {
            self.set_reifier(ReifiableId::Variant(survivor), Some(reifier))?;
        }
        Ok(survivor)
    }

    /// Creates an occurrence on `parent`, suppressing structural duplicates.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConstruct`] if any referenced topic id
    /// does not resolve (nothing is allocated in that case), and propagates
    /// [`ModelError::ReificationConflict`] from the reifier application.
    pub fn create_occurrence(
        &mut self,
        parent: TopicId,
        spec: &OccurrenceSpec,
    ) -> Result<OccurrenceId, ModelError> {
        self.require_topic(parent, "occurrence parent is not a known topic")?;
        self.require_topic(spec.ty, "occurrence type is not a known topic")?;
        self.require_topics(&spec.scope, "occurrence scope theme is not a known topic")?;
        if let Some(reifier) = spec.reifier {
            self.require_topic(reifier, "occurrence reifier is not a known topic")?;
        }

        let id = OccurrenceId(self.next_occurrence);
        self.next_occurrence += 1;
        self.occurrences.insert(
            id,
            OccurrenceRecord {
                parent,
                ty: spec.ty,
                value: spec.value.clone(),
                datatype: spec.datatype.clone(),
                scope: spec.scope.iter().copied().collect(),
                item_identifiers: spec.item_identifiers.iter().cloned().collect(),
                reifier: None,
            },
        );
        if let Some(topic) = self.topics.get_mut(&parent) {
            topic.occurrences.insert(id);
        }

        let mut queue = VecDeque::new();
        let survivor = self.dedupe_occurrence(id, &mut queue);
        self.run_merge_queue(queue)?;
        if let Some(reifier) = spec.reifier {
            self.set_reifier(ReifiableId::Occurrence(survivor), Some(reifier))?;
        }
        Ok(survivor)
    }

    // ── Identity mutation ──────────────────────────────────────────────

    /// Adds a subject identifier to `topic`. If the locator already belongs
    /// to a different topic (as subject identifier or item identifier, the
    /// two being mutually substitutable) that topic is merged into `topic`.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConstruct`] if `topic` does not resolve;
    /// propagates [`ModelError::ReificationConflict`] from a merge cascade.
    pub fn add_subject_identifier(
        &mut self,
        topic: TopicId,
        locator: Locator,
    ) -> Result<(), ModelError> {
        self.require_topic(topic, "identity target is not a known topic")?;
        let collision = self
            .index
            .lookup(IdentityKind::SubjectIdentifier, &locator)
            .or_else(|| self.index.lookup(IdentityKind::ItemIdentifier, &locator))
            .filter(|other| *other != topic);
        if let Some(record) = self.topics.get_mut(&topic) {
            record.subject_identifiers.insert(locator.clone());
        }
        self.index
            .insert(IdentityKind::SubjectIdentifier, locator, topic);
        match collision {
            Some(other) => self.merge_topics(topic, other),
            None => Ok(()),
        }
    }

    /// Adds a subject locator to `topic`, merging the current holder of the
    /// locator into `topic` on collision.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConstruct`] if `topic` does not resolve;
    /// propagates [`ModelError::ReificationConflict`] from a merge cascade.
    pub fn add_subject_locator(
        &mut self,
        topic: TopicId,
        locator: Locator,
    ) -> Result<(), ModelError> {
        self.require_topic(topic, "identity target is not a known topic")?;
        let collision = self
            .index
            .lookup(IdentityKind::SubjectLocator, &locator)
            .filter(|other| *other != topic);
        if let Some(record) = self.topics.get_mut(&topic) {
            record.subject_locators.insert(locator.clone());
        }
        self.index
            .insert(IdentityKind::SubjectLocator, locator, topic);
        match collision {
            Some(other) => self.merge_topics(topic, other),
            None => Ok(()),
        }
    }

    /// Adds an item identifier to `topic`. If the locator already belongs to
    /// a different topic (as item identifier or subject identifier) that
    /// topic is merged into `topic`.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConstruct`] if `topic` does not resolve;
    /// propagates [`ModelError::ReificationConflict`] from a merge cascade.
    pub fn add_item_identifier(
        &mut self,
        topic: TopicId,
        locator: Locator,
    ) -> Result<(), ModelError> {
        self.require_topic(topic, "identity target is not a known topic")?;
        let collision = self
            .index
            .lookup(IdentityKind::ItemIdentifier, &locator)
            .or_else(|| self.index.lookup(IdentityKind::SubjectIdentifier, &locator))
            .filter(|other| *other != topic);
        if let Some(record) = self.topics.get_mut(&topic) {
            record.item_identifiers.insert(locator.clone());
        }
        self.index
            .insert(IdentityKind::ItemIdentifier, locator, topic);
        match collision {
            Some(other) => self.merge_topics(topic, other),
            None => Ok(()),
        }
    }

    /// Adds `ty` to the type set of `topic`.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConstruct`] if either id does not
    /// resolve.
    pub fn add_type(&mut self, topic: TopicId, ty: TopicId) -> Result<(), ModelError> {
        self.require_topic(topic, "typed topic is not a known topic")?;
        self.require_topic(ty, "type is not a known topic")?;
        if let Some(record) = self.topics.get_mut(&topic) {
            record.types.insert(ty);
        }
        Ok(())
    }

    /// Adds an item identifier to the map itself. Map item identifiers do
    /// not participate in topic identity resolution.
    pub fn add_map_item_identifier(&mut self, locator: Locator) {
        self.map_item_identifiers.insert(locator);
    }

    // ── Read surface ───────────────────────────────────────────────────

    /// Returns a shared reference to a topic when it exists.
    #[must_use]
    pub fn topic(&self, id: TopicId) -> Option<&TopicRecord> {
        self.topics.get(&id)
    }

    /// Returns a shared reference to an association when it exists.
    #[must_use]
    pub fn association(&self, id: AssociationId) -> Option<&AssociationRecord> {
        self.associations.get(&id)
    }

    /// Returns a shared reference to a role when it exists.
    #[must_use]
    pub fn role(&self, id: RoleId) -> Option<&RoleRecord> {
        self.roles.get(&id)
    }

    /// Returns a shared reference to a name when it exists.
    #[must_use]
    pub fn name(&self, id: NameId) -> Option<&NameRecord> {
        self.names.get(&id)
    }

    /// Returns a shared reference to a variant when it exists.
    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&VariantRecord> {
        self.variants.get(&id)
    }

    /// Returns a shared reference to an occurrence when it exists.
    #[must_use]
    pub fn occurrence(&self, id: OccurrenceId) -> Option<&OccurrenceRecord> {
        self.occurrences.get(&id)
    }

    /// Iterates over all topics in ascending id order.
    pub fn iter_topics(&self) -> impl Iterator<Item = (TopicId, &TopicRecord)> {
        self.topics.iter().map(|(id, record)| (*id, record))
    }

    /// Iterates over all associations in ascending id order.
    pub fn iter_associations(&self) -> impl Iterator<Item = (AssociationId, &AssociationRecord)> {
        self.associations.iter().map(|(id, record)| (*id, record))
    }

    /// Looks up a topic by subject identifier.
    #[must_use]
    pub fn topic_by_subject_identifier(&self, locator: &Locator) -> Option<TopicId> {
        self.index.lookup(IdentityKind::SubjectIdentifier, locator)
    }

    /// Looks up a topic by subject locator.
    #[must_use]
    pub fn topic_by_subject_locator(&self, locator: &Locator) -> Option<TopicId> {
        self.index.lookup(IdentityKind::SubjectLocator, locator)
    }

    /// Looks up a topic by item identifier.
    #[must_use]
    pub fn topic_by_item_identifier(&self, locator: &Locator) -> Option<TopicId> {
        self.index.lookup(IdentityKind::ItemIdentifier, locator)
    }

    /// Returns the reifier of any reifiable construct, or `None` when the
    /// construct is unreified or does not resolve.
    #[must_use]
    pub fn reifier_of(&self, construct: ReifiableId) -> Option<TopicId> {
        match construct {
            ReifiableId::Map => self.map_reifier,
            ReifiableId::Association(id) => self.associations.get(&id).and_then(|r| r.reifier),
            ReifiableId::Role(id) => self.roles.get(&id).and_then(|r| r.reifier),
            ReifiableId::Name(id) => self.names.get(&id).and_then(|r| r.reifier),
            ReifiableId::Variant(id) => self.variants.get(&id).and_then(|r| r.reifier),
            ReifiableId::Occurrence(id) => self.occurrences.get(&id).and_then(|r| r.reifier),
        }
    }

    /// Returns the map's own reifier, if any.
    #[must_use]
    pub fn map_reifier(&self) -> Option<TopicId> {
        self.map_reifier
    }

    /// Returns the map's own item identifiers.
    #[must_use]
    pub fn map_item_identifiers(&self) -> &BTreeSet<Locator> {
        &self.map_item_identifiers
    }

    /// Returns the identity index.
    #[must_use]
    pub fn index(&self) -> &IdentityIndex {
        &self.index
    }

    /// Returns `true`: the index is repaired by every mutation.
    #[must_use]
    pub fn is_auto_updated(&self) -> bool {
        self.index.is_auto_updated()
    }

    /// Rebuilds the identity index from the topic arena.
    ///
    /// The index is auto-updated, so this is a defensive operation; it never
    /// changes lookup results unless an invariant was already broken
    /// elsewhere.
    pub fn reindex(&mut self) {
        self.index = IdentityIndex::rebuild(&self.topics);
    }

    /// Number of live topics.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Number of live associations.
    #[must_use]
    pub fn association_count(&self) -> usize {
        self.associations.len()
    }

    /// Number of live statements of all five kinds.
    ///
    /// Every merge strictly reduces `topic_count() + statement_count()`,
    /// which is the termination argument for the cascade loop.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.associations.len()
            + self.roles.len()
            + self.names.len()
            + self.variants.len()
            + self.occurrences.len()
    }

    // ── Internal helpers ───────────────────────────────────────────────

    pub(crate) fn require_topic(
        &self,
        id: TopicId,
        what: &'static str,
    ) -> Result<(), ModelError> {
        if self.topics.contains_key(&id) {
            Ok(())
        } else {
            Err(ModelError::InvalidConstruct(what))
        }
    }

    fn require_topics(&self, ids: &[TopicId], what: &'static str) -> Result<(), ModelError> {
        for id in ids {
            self.require_topic(*id, what)?;
        }
        Ok(())
    }

    pub(crate) fn insert_role_record(
        &mut self,
        parent: AssociationId,
        ty: TopicId,
        player: TopicId,
    ) -> RoleId {
        let id = RoleId(self.next_role);
        self.next_role += 1;
        self.roles.insert(
            id,
            RoleRecord {
                parent,
                ty,
                player,
                item_identifiers: BTreeSet::new(),
                reifier: None,
            },
        );
        if let Some(assoc) = self.associations.get_mut(&parent) {
            assoc.roles.insert(id);
        }
        if let Some(topic) = self.topics.get_mut(&player) {
            topic.roles_played.insert(id);
        }
        id
    }
}
