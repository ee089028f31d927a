mod amount;
mod booking;
mod car;
mod status_change;

pub use amount::coerce_amount;
pub use booking::{Booking, BookingId, BookingRequest, Customer, Pricing, Status, Trip, TripKind};
pub use car::{Car, CarAvailability, CarCategory, CarType, CarUpdate, NewCar};
pub use status_change::StatusChange;

#[cfg(test)]
pub(crate) use booking::test_request;
