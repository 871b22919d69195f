// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Structural statement signatures.
//!
//! Two statements are structural duplicates iff their signatures are equal.
//! Signatures are BLAKE3 digests over a canonical byte stream with a
//! domain-separation prefix per statement kind, so equal digests also imply
//! equal kinds. Encoding rules follow the engine-wide convention: ids as
//! fixed-size little-endian values, strings and sets length-prefixed with
//! 8-byte little-endian counts, sets iterated in sorted order.
//!
//! Name and occurrence signatures carry no parent: duplicate suppression
//! compares them only among siblings (the comparison sites are
//! parent-scoped), while reification compatibility compares them across
//! parents. Variant signatures bind the parent name id, so equal variant
//! signatures imply an identity-equal enclosing name; role signatures bind
//! the enclosing association's structural signature. Signatures hash arena
//! ids and are therefore intra-map keys only; the canonical form in
//! [`crate::canon`] is the cross-map comparator.
use std::collections::BTreeSet;

use blake3::Hasher;

use crate::graph::TopicMap;
use crate::ident::{
    AssociationId, Hash, Locator, NameId, OccurrenceId, ReifiableId, RoleId, TopicId, VariantId,
};

fn hash_topic(hasher: &mut Hasher, topic: TopicId) {
    hasher.update(&topic.value().to_le_bytes());
}

fn hash_scope(hasher: &mut Hasher, scope: &BTreeSet<TopicId>) {
    hasher.update(&(scope.len() as u64).to_le_bytes());
    for theme in scope {
        hash_topic(hasher, *theme);
    }
}

fn hash_str(hasher: &mut Hasher, value: &str) {
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn hash_locator(hasher: &mut Hasher, locator: &Locator) {
    hash_str(hasher, locator.as_str());
}

/// Signature of a (role type, player) pair, independent of the enclosing
/// association. These pair signatures are the role components of
/// [`association_signature`] and the intra-association duplicate key.
#[must_use]
pub fn role_pair_signature(ty: TopicId, player: TopicId) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(b"weft:rolepair:");
    hash_topic(&mut hasher, ty);
    hash_topic(&mut hasher, player);
    hasher.finalize().into()
}

/// Structural signature of an association: type, unordered scope, and the
/// unordered set of its role pair signatures.
///
/// Returns `None` when `id` does not resolve.
#[must_use]
pub fn association_signature(map: &TopicMap, id: AssociationId) -> Option<Hash> {
    let record = map.association(id)?;
    let mut role_sigs: Vec<Hash> = record
        .roles
        .iter()
        .filter_map(|role_id| {
            let role = map.role(*role_id)?;
            Some(role_pair_signature(role.ty, role.player))
        })
        .collect();
    role_sigs.sort_unstable();
    role_sigs.dedup();

    let mut hasher = Hasher::new();
    hasher.update(b"weft:assoc:");
    hash_topic(&mut hasher, record.ty);
    hash_scope(&mut hasher, &record.scope);
    hasher.update(&(role_sigs.len() as u64).to_le_bytes());
    for sig in role_sigs {
        hasher.update(&sig);
    }
    Some(hasher.finalize().into())
}

/// Structural signature of a role in context: the enclosing association's
/// structural signature plus the role's own (type, player) pair.
///
/// Used only for reification merge-compatibility, where two roles are
/// interchangeable iff both their pairs and their enclosing associations are
/// structurally equal. Returns `None` when `id` does not resolve.
#[must_use]
pub fn role_signature(map: &TopicMap, id: RoleId) -> Option<Hash> {
    let record = map.role(id)?;
    let parent_sig = association_signature(map, record.parent)?;
    let mut hasher = Hasher::new();
    hasher.update(b"weft:role:");
    hasher.update(&parent_sig);
    hash_topic(&mut hasher, record.ty);
    hash_topic(&mut hasher, record.player);
    Some(hasher.finalize().into())
}

/// Structural signature of a name: type, value, unordered scope.
///
/// Returns `None` when `id` does not resolve.
#[must_use]
pub fn name_signature(map: &TopicMap, id: NameId) -> Option<Hash> {
    let record = map.name(id)?;
    let mut hasher = Hasher::new();
    hasher.update(b"weft:name:");
    hash_topic(&mut hasher, record.ty);
    hash_str(&mut hasher, &record.value);
    hash_scope(&mut hasher, &record.scope);
    Some(hasher.finalize().into())
}

/// Structural signature of a variant: parent name, value, datatype,
/// unordered scope. Binding the parent name id makes equal signatures imply
/// an identity-equal enclosing name; a variant is never compared against its
/// parent's own scope. Returns `None` when `id` does not resolve.
#[must_use]
pub fn variant_signature(map: &TopicMap, id: VariantId) -> Option<Hash> {
    let record = map.variant(id)?;
    let mut hasher = Hasher::new();
    hasher.update(b"weft:variant:");
    hasher.update(&record.parent.value().to_le_bytes());
    hash_str(&mut hasher, &record.value);
    hash_locator(&mut hasher, &record.datatype);
    hash_scope(&mut hasher, &record.scope);
    Some(hasher.finalize().into())
}

/// Structural signature of an occurrence: type, value, datatype, unordered
/// scope. Returns `None` when `id` does not resolve.
#[must_use]
pub fn occurrence_signature(map: &TopicMap, id: OccurrenceId) -> Option<Hash> {
    let record = map.occurrence(id)?;
    let mut hasher = Hasher::new();
    hasher.update(b"weft:occ:");
    hash_topic(&mut hasher, record.ty);
    hash_str(&mut hasher, &record.value);
    hash_locator(&mut hasher, &record.datatype);
    hash_scope(&mut hasher, &record.scope);
    Some(hasher.finalize().into())
}

/// Dispatches to the kind-specific signature for any reifiable construct.
///
/// The map itself has no structural signature (`None`), which is what makes
/// a reification conflict against it unconditionally fatal.
#[must_use]
pub fn statement_signature(map: &TopicMap, id: ReifiableId) -> Option<Hash> {
    match id {
        ReifiableId::Map => None,
        ReifiableId::Association(assoc) => association_signature(map, assoc),
        ReifiableId::Role(role) => role_signature(map, role),
        ReifiableId::Name(name) => name_signature(map, name),
        ReifiableId::Variant(variant) => variant_signature(map, variant),
        ReifiableId::Occurrence(occurrence) => occurrence_signature(map, occurrence),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;
    use crate::graph::{AssociationSpec, OccurrenceSpec, RoleSpec};

    #[test]
    fn domain_prefixes_separate_statement_kinds() {
        // A name and an occurrence with identical parents, types, values and
        // scopes must never collide.
        let mut map = TopicMap::new();
        let parent = map.create_topic();
        let ty = map.create_topic();
        let name = map
            .create_name(parent, &crate::graph::NameSpec::new(ty, "v"))
            .unwrap();
        let occurrence = map
            .create_occurrence(
                parent,
                &OccurrenceSpec::new(ty, "v", Locator::new("http://www.w3.org/2001/XMLSchema#string")),
            )
            .unwrap();
        assert_ne!(
            name_signature(&map, name),
            occurrence_signature(&map, occurrence)
        );
    }

    #[test]
    fn association_signature_ignores_role_order() {
        let mut map = TopicMap::new();
        let ty = map.create_topic();
        let rt1 = map.create_topic();
        let rt2 = map.create_topic();
        let p1 = map.create_topic();
        let p2 = map.create_topic();

        let a = map
            .create_association(&AssociationSpec {
                roles: vec![RoleSpec::new(rt1, p1), RoleSpec::new(rt2, p2)],
                ..AssociationSpec::new(ty)
            })
            .unwrap();
        let sig_a = association_signature(&map, a);

        let mut other = TopicMap::new();
        let ty2 = other.create_topic();
        let rt1b = other.create_topic();
        let rt2b = other.create_topic();
        let p1b = other.create_topic();
        let p2b = other.create_topic();
        assert_eq!(ty.value(), ty2.value());
        assert_eq!(rt1.value(), rt1b.value());

        let b = other
            .create_association(&AssociationSpec {
                roles: vec![RoleSpec::new(rt2b, p2b), RoleSpec::new(rt1b, p1b)],
                ..AssociationSpec::new(ty2)
            })
            .unwrap();
        // Same arena ids on both sides, so the signatures are comparable.
        assert_eq!(sig_a, association_signature(&other, b));
    }

    #[test]
    fn scope_changes_the_signature() {
        let mut map = TopicMap::new();
        let parent = map.create_topic();
        let ty = map.create_topic();
        let theme = map.create_topic();
        let dt = Locator::new("http://www.w3.org/2001/XMLSchema#string");

        let plain = map
            .create_occurrence(parent, &OccurrenceSpec::new(ty, "v", dt.clone()))
            .unwrap();
        let scoped = map
            .create_occurrence(
                parent,
                &OccurrenceSpec {
                    scope: vec![theme],
                    ..OccurrenceSpec::new(ty, "v", dt)
                },
            )
            .unwrap();
        assert_ne!(
            occurrence_signature(&map, plain),
            occurrence_signature(&map, scoped)
        );
    }
}
