// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Construct records: topics and the five statement kinds.
//!
//! Records hold plain data plus back-references; ids are supplied externally
//! by the owning [`crate::TopicMap`] arenas. All sets are `BTreeSet` so that
//! iteration anywhere in the engine is deterministic.
use std::collections::BTreeSet;

use crate::ident::{
    AssociationId, Locator, NameId, OccurrenceId, ReifiableId, RoleId, TopicId, VariantId,
};

/// Materialised record for a single topic.
///
/// Invariants
/// - Across the whole map, no two distinct topics share a value in any of the
///   three identity sets (subject identifiers and item identifiers are
///   mutually substitutable for collision purposes).
/// - `names`, `occurrences` list constructs whose `parent` is this topic;
///   `roles_played` lists roles whose `player` is this topic.
/// - `reified` mirrors the `reifier` field of exactly one construct, or is
///   `None`.
#[derive(Clone, Debug, Default)]
pub struct TopicRecord {
    /// Subject identifier locators.
    pub subject_identifiers: BTreeSet<Locator>,
    /// Subject locator locators.
    pub subject_locators: BTreeSet<Locator>,
    /// Item identifier locators.
    pub item_identifiers: BTreeSet<Locator>,
    /// Topics typing this topic.
    pub types: BTreeSet<TopicId>,
    /// Names owned by this topic.
    pub names: BTreeSet<NameId>,
    /// Occurrences owned by this topic.
    pub occurrences: BTreeSet<OccurrenceId>,
    /// Roles in which this topic is the player (back-reference).
    pub roles_played: BTreeSet<RoleId>,
    /// Construct this topic reifies, if any (back-reference).
    pub reified: Option<ReifiableId>,
}

impl TopicRecord {
    /// Returns `true` when the topic carries no identity locator of any kind.
    #[must_use]
    pub fn has_no_identity(&self) -> bool {
        self.subject_identifiers.is_empty()
            && self.subject_locators.is_empty()
            && self.item_identifiers.is_empty()
    }
}

/// Materialised record for a top-level association.
///
/// Invariants
/// - Every id in `roles` resolves to a role whose `parent` is this
///   association.
/// - `reifier`, when present, is mirrored by that topic's `reified` field.
#[derive(Clone, Debug)]
pub struct AssociationRecord {
    /// Association type.
    pub ty: TopicId,
    /// Scope themes; empty means unconstrained.
    pub scope: BTreeSet<TopicId>,
    /// Roles owned by this association.
    pub roles: BTreeSet<RoleId>,
    /// Item identifiers of the statement itself.
    pub item_identifiers: BTreeSet<Locator>,
    /// Reifying topic, if any.
    pub reifier: Option<TopicId>,
}

/// Materialised record for a role, owned by exactly one association.
#[derive(Clone, Debug)]
pub struct RoleRecord {
    /// Owning association.
    pub parent: AssociationId,
    /// Role type.
    pub ty: TopicId,
    /// Playing topic.
    pub player: TopicId,
    /// Item identifiers of the statement itself.
    pub item_identifiers: BTreeSet<Locator>,
    /// Reifying topic, if any.
    pub reifier: Option<TopicId>,
}

/// Materialised record for a topic name.
#[derive(Clone, Debug)]
pub struct NameRecord {
    /// Owning topic.
    pub parent: TopicId,
    /// Name type.
    pub ty: TopicId,
    /// Name value.
    pub value: String,
    /// Scope themes; empty means unconstrained.
    pub scope: BTreeSet<TopicId>,
    /// Variants owned by this name.
    pub variants: BTreeSet<VariantId>,
    /// Item identifiers of the statement itself.
    pub item_identifiers: BTreeSet<Locator>,
    /// Reifying topic, if any.
    pub reifier: Option<TopicId>,
}

/// Materialised record for a name variant.
///
/// Invariants
/// - `scope` is a superset of the parent name's scope. The factory enforces
///   this constructively by unioning the parent scope in, and name merges
///   re-establish it when variants are adopted.
#[derive(Clone, Debug)]
pub struct VariantRecord {
    /// Owning name.
    pub parent: NameId,
    /// Variant value.
    pub value: String,
    /// Datatype locator of the value.
    pub datatype: Locator,
    /// Scope themes; a superset of the owning name's scope.
    pub scope: BTreeSet<TopicId>,
    /// Item identifiers of the statement itself.
    pub item_identifiers: BTreeSet<Locator>,
    /// Reifying topic, if any.
    pub reifier: Option<TopicId>,
}

/// Materialised record for an occurrence.
#[derive(Clone, Debug)]
pub struct OccurrenceRecord {
    /// Owning topic.
    pub parent: TopicId,
    /// Occurrence type.
    pub ty: TopicId,
    /// Occurrence value.
    pub value: String,
    /// Datatype locator of the value.
    pub datatype: Locator,
    /// Scope themes; empty means unconstrained.
    pub scope: BTreeSet<TopicId>,
    /// Item identifiers of the statement itself.
    pub item_identifiers: BTreeSet<Locator>,
    /// Reifying topic, if any.
    pub reifier: Option<TopicId>,
}
