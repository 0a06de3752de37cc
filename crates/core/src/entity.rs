//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Customers, bookings, orders, catalog services and inventory items are all
/// entities: two rows with the same id are the same thing even if every other
/// column changed.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
