//! Orders domain module.
//!
//! The order lifecycle state machine, payment status rules, order codes and
//! the edit / walk-in / booking-conversion planning that the workflow layer
//! applies inside a storage transaction.

pub mod code;
pub mod edit;
pub mod order;
pub mod payment;
pub mod status;
pub mod walk_in;

pub use code::{OrderCode, shop_date};
pub use edit::{EditPlan, plan_edit};
pub use order::{NewOrder, Order, OrderSource};
pub use payment::{PaymentStatus, derive_after_edit};
pub use status::{OrderStatus, TransitionEffect};
pub use walk_in::{WalkInOrder, WalkInPayment};
