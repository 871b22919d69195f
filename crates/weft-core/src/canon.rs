// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical form: deterministic, build-order-independent serialization.
//!
//! Determinism contract
//! - The output is a line-oriented byte stream with a version header.
//!   Isomorphic maps (equal under the merge and duplicate-suppression rules)
//!   serialize to identical bytes regardless of construction order.
//! - Topics are totally ordered by their smallest `(locator, kind)` identity
//!   pair, kinds ranked subject identifier < subject locator < item
//!   identifier; topic references inside statements are 1-based ordinals in
//!   that order, so arena ids never leak into the output.
//! - Topics with no identity sort after all identified topics in creation
//!   order. Byte equality across build orders is therefore guaranteed for
//!   maps whose topics all carry at least one identity locator.
//! - Statements under a parent are ordered by composite structural key
//!   (type ordinal, scope ordinals, value, datatype); association roles by
//!   (type ordinal, player ordinal); variants by (value, datatype, scope
//!   ordinals).
//! - Locator text is emitted verbatim between angle brackets; string values
//!   are quoted with `\\`, `\"`, `\n`, `\r`, `\t` escapes.
//!
//! The serializer is read-only: it never mutates the map. Changing any rule
//! here is a breaking change to canonical identity and must be recorded by
//! bumping the header version.
use std::collections::BTreeSet;
use std::fmt::Write as _;

use rustc_hash::FxHashMap;

use crate::graph::TopicMap;
use crate::ident::{AssociationId, Hash, Locator, NameId, OccurrenceId, TopicId, VariantId};
use crate::record::TopicRecord;

/// Header line of canonical form version 1.
const HEADER: &str = "weft:canon:1";

/// Serializes the map into its canonical byte form.
///
/// Consumed by diff-based harnesses expecting byte-exact matches: two maps
/// with equal content produce equal bytes, independent of the order in which
/// topics and statements were created or merged.
#[must_use]
pub fn serialize(map: &TopicMap) -> Vec<u8> {
    let order = topic_order(map);
    let ordinals: FxHashMap<TopicId, usize> = order
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index + 1))
        .collect();

    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');

    for locator in map.map_item_identifiers() {
        let _ = writeln!(out, "~ ii <{locator}>");
    }
    if let Some(reifier) = map.map_reifier() {
        let _ = writeln!(out, "~ rf t{}", ordinal(&ordinals, reifier));
    }

    for (index, topic_id) in order.iter().enumerate() {
        let Some(record) = map.topic(*topic_id) else {
            debug_assert!(false, "topic order referenced a missing topic");
            continue;
        };
        let _ = writeln!(out, "t{}", index + 1);
        emit_topic(&mut out, map, &ordinals, record);
    }

    emit_associations(&mut out, map, &ordinals);
    out.into_bytes()
}

/// BLAKE3 digest of the canonical byte form, under a versioned domain
/// prefix. A compact stand-in for full byte comparison.
#[must_use]
pub fn canonical_hash(map: &TopicMap) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"WEFT_CANON_HASH_V1\0");
    hasher.update(&serialize(map));
    hasher.finalize().into()
}

/// Lowercase hex rendering of [`canonical_hash`], for fixtures and logs.
#[must_use]
pub fn canonical_hash_hex(map: &TopicMap) -> String {
    hex::encode(canonical_hash(map))
}

/// Total order over topics: identified topics by smallest `(locator, kind)`
/// pair, then zero-identity topics in creation order.
fn topic_order(map: &TopicMap) -> Vec<TopicId> {
    let mut identified: Vec<((&Locator, u8), TopicId)> = Vec::new();
    let mut anonymous: Vec<TopicId> = Vec::new();
    for (id, record) in map.iter_topics() {
        match identity_key(record) {
            Some(key) => identified.push((key, id)),
            None => anonymous.push(id),
        }
    }
    identified.sort_unstable();
    identified
        .into_iter()
        .map(|(_, id)| id)
        .chain(anonymous)
        .collect()
}

/// Smallest `(locator, kind rank)` pair across the three identity sets, or
/// `None` for a topic with no identity.
fn identity_key(record: &TopicRecord) -> Option<(&Locator, u8)> {
    let mut best: Option<(&Locator, u8)> = None;
    for (set, rank) in [
        (&record.subject_identifiers, 0u8),
        (&record.subject_locators, 1u8),
        (&record.item_identifiers, 2u8),
    ] {
        if let Some(locator) = set.iter().next() {
            let candidate = (locator, rank);
            if best.is_none_or(|current| candidate < current) {
                best = Some(candidate);
            }
        }
    }
    best
}

fn ordinal(ordinals: &FxHashMap<TopicId, usize>, id: TopicId) -> usize {
    ordinals.get(&id).copied().unwrap_or_else(|| {
        debug_assert!(false, "statement referenced a topic missing from the order");
        0
    })
}

fn scope_ordinals(ordinals: &FxHashMap<TopicId, usize>, scope: &BTreeSet<TopicId>) -> Vec<usize> {
    let mut ords: Vec<usize> = scope.iter().map(|theme| ordinal(ordinals, *theme)).collect();
    ords.sort_unstable();
    ords
}

fn push_scope(out: &mut String, ords: &[usize]) {
    out.push('@');
    for ord in ords {
        let _ = write!(out, " t{ord}");
    }
}

fn push_quoted(out: &mut String, value: &str) {
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
}

fn push_reifier_and_iids(
    out: &mut String,
    indent: &str,
    ordinals: &FxHashMap<TopicId, usize>,
    reifier: Option<TopicId>,
    item_identifiers: &BTreeSet<Locator>,
) {
    if let Some(topic) = reifier {
        let _ = writeln!(out, "{indent}rf t{}", ordinal(ordinals, topic));
    }
    for locator in item_identifiers {
        let _ = writeln!(out, "{indent}ii <{locator}>");
    }
}

fn emit_topic(
    out: &mut String,
    map: &TopicMap,
    ordinals: &FxHashMap<TopicId, usize>,
    record: &TopicRecord,
) {
    for locator in &record.subject_identifiers {
        let _ = writeln!(out, " si <{locator}>");
    }
    for locator in &record.subject_locators {
        let _ = writeln!(out, " sl <{locator}>");
    }
    for locator in &record.item_identifiers {
        let _ = writeln!(out, " ii <{locator}>");
    }

    let mut type_ords: Vec<usize> = record.types.iter().map(|ty| ordinal(ordinals, *ty)).collect();
    type_ords.sort_unstable();
    for ord in type_ords {
        let _ = writeln!(out, " isa t{ord}");
    }

    let mut names: Vec<(usize, Vec<usize>, NameId)> = record
        .names
        .iter()
        .filter_map(|id| {
            let name = map.name(*id)?;
            Some((
                ordinal(ordinals, name.ty),
                scope_ordinals(ordinals, &name.scope),
                *id,
            ))
        })
        .collect();
    names.sort_by(|a, b| {
        (a.0, &a.1, map.name(a.2).map(|n| n.value.as_str()))
            .cmp(&(b.0, &b.1, map.name(b.2).map(|n| n.value.as_str())))
    });
    for (ty_ord, scope_ords, id) in names {
        emit_name(out, map, ordinals, ty_ord, &scope_ords, id);
    }

    let mut occurrences: Vec<(usize, Vec<usize>, OccurrenceId)> = record
        .occurrences
        .iter()
        .filter_map(|id| {
            let occurrence = map.occurrence(*id)?;
            Some((
                ordinal(ordinals, occurrence.ty),
                scope_ordinals(ordinals, &occurrence.scope),
                *id,
            ))
        })
        .collect();
    occurrences.sort_by(|a, b| {
        let ka = map
            .occurrence(a.2)
            .map(|o| (o.value.as_str(), o.datatype.as_str()));
        let kb = map
            .occurrence(b.2)
            .map(|o| (o.value.as_str(), o.datatype.as_str()));
        (a.0, &a.1, ka).cmp(&(b.0, &b.1, kb))
    });
    for (ty_ord, scope_ords, id) in occurrences {
        emit_occurrence(out, map, ordinals, ty_ord, &scope_ords, id);
    }
}

fn emit_name(
    out: &mut String,
    map: &TopicMap,
    ordinals: &FxHashMap<TopicId, usize>,
    ty_ord: usize,
    scope_ords: &[usize],
    id: NameId,
) {
    let Some(record) = map.name(id) else {
        return;
    };
    let _ = write!(out, " n t{ty_ord} ");
    push_scope(out, scope_ords);
    out.push(' ');
    push_quoted(out, &record.value);
    out.push('\n');
    push_reifier_and_iids(out, "  ", ordinals, record.reifier, &record.item_identifiers);

    let mut variants: Vec<(String, String, Vec<usize>, VariantId)> = record
        .variants
        .iter()
        .filter_map(|vid| {
            let variant = map.variant(*vid)?;
            Some((
                variant.value.clone(),
                variant.datatype.as_str().to_owned(),
                scope_ordinals(ordinals, &variant.scope),
                *vid,
            ))
        })
        .collect();
    variants.sort();
    for (value, datatype, ords, vid) in variants {
        let _ = write!(out, "  v ");
        push_scope(out, &ords);
        out.push(' ');
        push_quoted(out, &value);
        let _ = writeln!(out, " ^<{datatype}>");
        if let Some(variant) = map.variant(vid) {
            push_reifier_and_iids(
                out,
                "   ",
                ordinals,
                variant.reifier,
                &variant.item_identifiers,
            );
        }
    }
}

fn emit_occurrence(
    out: &mut String,
    map: &TopicMap,
    ordinals: &FxHashMap<TopicId, usize>,
    ty_ord: usize,
    scope_ords: &[usize],
    id: OccurrenceId,
) {
    let Some(record) = map.occurrence(id) else {
        return;
    };
    let _ = write!(out, " o t{ty_ord} ");
    push_scope(out, scope_ords);
    out.push(' ');
    push_quoted(out, &record.value);
    let _ = writeln!(out, " ^<{}>", record.datatype);
    push_reifier_and_iids(out, "  ", ordinals, record.reifier, &record.item_identifiers);
}

fn emit_associations(out: &mut String, map: &TopicMap, ordinals: &FxHashMap<TopicId, usize>) {
    let mut assocs: Vec<(usize, Vec<usize>, Vec<(usize, usize)>, AssociationId)> = map
        .iter_associations()
        .map(|(id, record)| {
            let mut role_keys: Vec<(usize, usize)> = record
                .roles
                .iter()
                .filter_map(|rid| {
                    let role = map.role(*rid)?;
                    Some((ordinal(ordinals, role.ty), ordinal(ordinals, role.player)))
                })
                .collect();
            role_keys.sort_unstable();
            (
                ordinal(ordinals, record.ty),
                scope_ordinals(ordinals, &record.scope),
                role_keys,
                id,
            )
        })
        .collect();
    assocs.sort();

    for (ty_ord, scope_ords, _, id) in assocs {
        let Some(record) = map.association(id) else {
            continue;
        };
        let _ = write!(out, "a t{ty_ord} ");
        push_scope(out, &scope_ords);
        out.push('\n');
        push_reifier_and_iids(out, " ", ordinals, record.reifier, &record.item_identifiers);

        let mut roles: Vec<(usize, usize, crate::ident::RoleId)> = record
            .roles
            .iter()
            .filter_map(|rid| {
                let role = map.role(*rid)?;
                Some((
                    ordinal(ordinals, role.ty),
                    ordinal(ordinals, role.player),
                    *rid,
                ))
            })
            .collect();
        roles.sort_unstable();
        for (role_ty, player, rid) in roles {
            let _ = writeln!(out, " r t{role_ty} t{player}");
            if let Some(role) = map.role(rid) {
                push_reifier_and_iids(out, "  ", ordinals, role.reifier, &role.item_identifiers);
            }
        }
    }
}
