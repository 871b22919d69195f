// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier types: locators, arena ids, and the canonical hash alias.
use std::fmt;

/// Canonical 256-bit hash used for structural signatures and the canonical
/// form digest.
pub type Hash = [u8; 32];

/// Immutable absolute IRI used as an identity value.
///
/// Equality and ordering are plain string equality and ordering over the IRI
/// text; no normalisation is performed. Locators are the only cross-graph
/// identity currency: arena ids below are process-local and never compared
/// across maps.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Locator(String);

impl Locator {
    /// Wraps an absolute IRI string.
    #[must_use]
    pub fn new(iri: impl Into<String>) -> Self {
        Self(iri.into())
    }

    /// Returns the IRI text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three independent identity properties of a topic.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IdentityKind {
    /// Locator identifying the subject of discourse itself.
    SubjectIdentifier,
    /// Locator resolving to the subject (an information resource).
    SubjectLocator,
    /// Locator identifying the topic item within the map.
    ItemIdentifier,
}

/// Strongly typed identifier for a topic.
///
/// Ids are opaque handles allocated from a monotonic counter and are never
/// reused; after a merge drains a topic, its id simply stops resolving.
/// A dedicated wrapper per construct kind prevents accidental mixing of
/// arena handles.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopicId(pub(crate) u32);

/// Strongly typed identifier for an association.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssociationId(pub(crate) u32);

/// Strongly typed identifier for a role within an association.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoleId(pub(crate) u32);

/// Strongly typed identifier for a topic name.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NameId(pub(crate) u32);

/// Strongly typed identifier for a name variant.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariantId(pub(crate) u32);

/// Strongly typed identifier for an occurrence.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OccurrenceId(pub(crate) u32);

impl TopicId {
    /// Returns the raw arena value of this id.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl AssociationId {
    /// Returns the raw arena value of this id.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl RoleId {
    /// Returns the raw arena value of this id.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl NameId {
    /// Returns the raw arena value of this id.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl VariantId {
    /// Returns the raw arena value of this id.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl OccurrenceId {
    /// Returns the raw arena value of this id.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Closed set of reifiable constructs.
///
/// Every operation that dispatches over a statement kind matches this enum
/// exhaustively; there is no runtime type inspection anywhere in the engine.
/// `Map` is the topic map itself, which is reifiable but has no structural
/// signature and therefore never merges with anything.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReifiableId {
    /// The topic map itself.
    Map,
    /// A top-level association.
    Association(AssociationId),
    /// A role owned by an association.
    Role(RoleId),
    /// A name owned by a topic.
    Name(NameId),
    /// A variant owned by a name.
    Variant(VariantId),
    /// An occurrence owned by a topic.
    Occurrence(OccurrenceId),
}

impl From<AssociationId> for ReifiableId {
    fn from(id: AssociationId) -> Self {
        Self::Association(id)
    }
}

impl From<RoleId> for ReifiableId {
    fn from(id: RoleId) -> Self {
        Self::Role(id)
    }
}

impl From<NameId> for ReifiableId {
    fn from(id: NameId) -> Self {
        Self::Name(id)
    }
}

impl From<VariantId> for ReifiableId {
    fn from(id: VariantId) -> Self {
        Self::Variant(id)
    }
}

impl From<OccurrenceId> for ReifiableId {
    fn from(id: OccurrenceId) -> Self {
        Self::Occurrence(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_equality_is_string_equality() {
        let a = Locator::new("http://example.org/x");
        let b = Locator::new(String::from("http://example.org/x"));
        let c = Locator::new("http://example.org/X");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn locator_ordering_is_lexicographic() {
        let a = Locator::new("u:1");
        let b = Locator::new("u:10");
        let c = Locator::new("u:2");
        assert!(a < b);
        assert!(b < c);
    }
}
