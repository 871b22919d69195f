// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Errors surfaced by topic map mutation operations.
use thiserror::Error;

use crate::ident::{ReifiableId, TopicId};

/// Errors emitted by the mutation surface.
///
/// Identity collisions are not represented here: they are resolved internally
/// by merging and never surface to callers. Internal invariant violations
/// (merging a topic with itself, merging statements of different kinds) are
/// programmer errors guarded by `debug_assert!`, not recoverable variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The proposed reifier already reifies a structurally incompatible
    /// construct. Fatal; the caller must resolve the modelling conflict.
    #[error("topic {reifier:?} already reifies {existing:?}, incompatible with {proposed:?}")]
    ReificationConflict {
        /// Topic that was proposed as reifier.
        reifier: TopicId,
        /// Construct the topic already reifies.
        existing: ReifiableId,
        /// Construct the topic was asked to reify.
        proposed: ReifiableId,
    },
    /// A factory or mutation was handed a construct reference that does not
    /// resolve, or a constraint a construct requires does not hold. Nothing
    /// is allocated or mutated when this is returned.
    #[error("invalid construct: {0}")]
    InvalidConstruct(&'static str),
}
