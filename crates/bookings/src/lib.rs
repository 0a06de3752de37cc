//! Bookings domain module.
//!
//! Customer-submitted pickup requests. A booking starts Pending and is either
//! accepted (which creates an order) or declined.

pub mod booking;

pub use booking::{Booking, BookingStatus, NewBooking};
