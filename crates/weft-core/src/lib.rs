// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! weft-core: deterministic topic-map identity and merge engine.
//!
//! The engine manipulates a semantic graph of typed topics connected by
//! typed, scoped statements (associations with roles, names with variants,
//! occurrences). Topic identity is carried by three locator-valued identity
//! properties; any collision merges the colliding topics, cascading into
//! structural-duplicate statement merges and reifier folding. A canonical
//! serialization compares maps independent of construction order.
//!
//! Concrete-syntax parsers and writers, query helpers, and configuration are
//! external collaborators driving the [`TopicMap`] mutation surface.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod canon;
mod error;
mod graph;
mod ident;
mod index;
mod merge;
mod record;
mod signature;
#[cfg(feature = "telemetry")]
mod telemetry;

// Re-exports for stable public API
/// Canonical form serializer and digest helpers.
pub use canon::{canonical_hash, canonical_hash_hex, serialize};
/// Errors surfaced by mutation operations.
pub use error::ModelError;
/// The topic map store, its mutation surface, and creation specs.
pub use graph::{AssociationSpec, NameSpec, OccurrenceSpec, RoleSpec, TopicMap, VariantSpec};
/// Core identifier types: locators, identity kinds, and arena ids.
pub use ident::{
    AssociationId, Hash, IdentityKind, Locator, NameId, OccurrenceId, ReifiableId, RoleId,
    TopicId, VariantId,
};
/// Locator → topic identity index.
pub use index::IdentityIndex;
/// Construct records stored in the map's arenas.
pub use record::{
    AssociationRecord, NameRecord, OccurrenceRecord, RoleRecord, TopicRecord, VariantRecord,
};
/// Structural signatures used for duplicate detection and reification
/// compatibility.
pub use signature::{
    association_signature, name_signature, occurrence_signature, role_pair_signature,
    role_signature, statement_signature, variant_signature,
};
