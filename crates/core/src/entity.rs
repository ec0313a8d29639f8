//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Entities that record which principal owns them.
///
/// Ownership is fixed when the entity is created and is what ownership checks
/// compare the acting principal against.
pub trait Owned: Entity {
    fn owner_id(&self) -> crate::UserId;
}
