pub mod actor;
pub mod bookings;
pub mod cars;
pub mod dashboard;
