//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are compared by their attribute values.
/// `Money` and a line item's (quantity, unit price) pair are value objects;
/// an `Order` is an entity.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Load {
///     kilograms: i64,
/// }
///
/// impl ValueObject for Load {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
