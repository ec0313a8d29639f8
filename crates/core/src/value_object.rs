//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, build a new value. `Email` is the canonical example here: two
/// addresses differing only in case are the same value once normalized.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
