//! Inventory domain module.
//!
//! Stock rows, the draw-down an order needs when it enters Processing, and
//! the policy applied when stock on hand does not cover it. Pure domain logic:
//! no IO, no HTTP, no storage.

pub mod draw_down;
pub mod item;
pub mod policy;

pub use draw_down::{ConsumingLine, DrawDown, SupplyLink};
pub use item::InventoryItem;
pub use policy::{StockAdjustment, StockPolicy};
