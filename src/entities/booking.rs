use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::amount::{deserialize_lenient, validate_amount};
use super::status_change::{StatusChange, MAX_CHANGED_BY_LEN};
use crate::error::{invalid_status_error, validation_error, Error};
use crate::policy::TransitionPolicy;

const BOOKING_ID_PREFIX: &str = "JTT";

/// Externally visible booking reference, e.g. `JTT17000000000042`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(String);

impl BookingId {
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    pub fn generate_at(now: DateTime<Utc>) -> Self {
        let suffix: u16 = rand::thread_rng().gen_range(0..10_000);

        Self(format!("{}{}{:04}", BOOKING_ID_PREFIX, now.timestamp(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BookingId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BookingId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Pending,
        Status::Confirmed,
        Status::InProgress,
        Status::Completed,
        Status::Cancelled,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Badge colour used by the admin panel.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Pending => "#ffc107",
            Self::Confirmed => "#28a745",
            Self::InProgress => "#17a2b8",
            Self::Completed => "#6c757d",
            Self::Cancelled => "#dc3545",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Statuses whose price counts as revenue.
    pub fn is_billable(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Completed)
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .iter()
            .find(|status| status.name() == s)
            .copied()
            .ok_or_else(|| invalid_status_error(s))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripKind {
    #[serde(rename = "one-way")]
    OneWay,
    #[serde(rename = "round-trip")]
    RoundTrip,
    #[serde(rename = "city")]
    CityRoaming,
}

impl Default for TripKind {
    fn default() -> Self {
        Self::OneWay
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trip {
    pub origin: String,
    pub destination: String,
    pub pickup_at: DateTime<Utc>,
    pub return_at: Option<DateTime<Utc>>,
    pub kind: TripKind,
}

/// Distance in km and price in INR.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    #[serde(default, deserialize_with = "deserialize_lenient")]
    distance_km: Decimal,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    price: Decimal,
}

impl Pricing {
    pub fn new(distance_km: Decimal, price: Decimal) -> Result<Self, Error> {
        Ok(Self {
            distance_km: validate_amount("distance", distance_km)?,
            price: validate_amount("price", price)?,
        })
    }

    pub fn distance_km(&self) -> Decimal {
        self.distance_km
    }

    pub fn price(&self) -> Decimal {
        self.price
    }
}

/// Everything a customer submits through the booking form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookingRequest {
    pub customer: Customer,
    pub trip: Trip,
    pub car_type: String,
    pub distance_km: Decimal,
    pub price: Decimal,
    pub special_requests: Option<String>,
    /// A specific car picked from the fleet page.
    pub car_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub booking_id: BookingId,
    pub customer: Customer,
    pub trip: Trip,
    pub pricing: Pricing,
    pub car_type_id: Option<Uuid>,
    pub assigned_car_id: Option<Uuid>,
    pub special_requests: Option<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
    pub admin_notes: Option<String>,
}

impl Booking {
    /// Validates the request and builds a pending booking together with its
    /// first history entry.
    pub fn new(
        request: BookingRequest,
        car_type_id: Option<Uuid>,
    ) -> Result<(Self, StatusChange), Error> {
        Self::new_at(request, car_type_id, Utc::now())
    }

    pub fn new_at(
        request: BookingRequest,
        car_type_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<(Self, StatusChange), Error> {
        validate_customer(&request.customer)?;
        validate_trip(&request.trip, now)?;

        let pricing = Pricing::new(request.distance_km, request.price)?;

        let booking = Self {
            id: Uuid::new_v4(),
            booking_id: BookingId::generate_at(now),
            customer: request.customer,
            trip: request.trip,
            pricing,
            car_type_id,
            assigned_car_id: None,
            special_requests: request.special_requests.filter(|s| !s.trim().is_empty()),
            status: Status::Pending,
            created_at: now,
            updated_at: now,
            is_active: true,
            admin_notes: None,
        };

        let created = StatusChange::new(
            booking.id,
            None,
            Status::Pending,
            "Customer",
            Some("Booking created by customer".into()),
            now,
        );

        Ok((booking, created))
    }

    /// Draws a fresh reference; only valid before the booking is first stored.
    pub(crate) fn regenerate_booking_id(&mut self) {
        self.booking_id = BookingId::generate();
    }

    pub fn price(&self) -> Decimal {
        self.pricing.price()
    }

    pub fn distance_km(&self) -> Decimal {
        self.pricing.distance_km()
    }

    pub fn is_round_trip(&self) -> bool {
        self.trip.kind == TripKind::RoundTrip
    }

    pub fn duration_days(&self) -> i64 {
        match (self.is_round_trip(), self.trip.return_at) {
            (true, Some(return_at)) => (return_at.date_naive() - self.trip.pickup_at.date_naive())
                .num_days(),
            _ => 0,
        }
    }

    /// Moves the booking to `new_status` and returns the history entry that
    /// must be stored in the same transaction as the booking itself.
    #[tracing::instrument(skip(self, policy), fields(booking_id = %self.booking_id))]
    pub fn change_status(
        &mut self,
        new_status: Status,
        changed_by: &str,
        notes: Option<String>,
        policy: TransitionPolicy,
    ) -> Result<StatusChange, Error> {
        if changed_by.trim().is_empty() || changed_by.chars().count() > MAX_CHANGED_BY_LEN {
            return Err(validation_error(format!(
                "actor name must be 1 to {} characters",
                MAX_CHANGED_BY_LEN
            )));
        }

        policy.check(self.status, new_status)?;

        let now = Utc::now();
        let old_status = self.status;
        let notes = notes
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Status updated by {}", changed_by));

        self.status = new_status;
        self.updated_at = now;

        Ok(StatusChange::new(
            self.id,
            Some(old_status),
            new_status,
            changed_by,
            Some(notes),
            now,
        ))
    }

    pub fn assign_car(&mut self, car_id: Option<Uuid>) {
        self.assigned_car_id = car_id;
        self.updated_at = Utc::now();
    }

    pub fn set_admin_notes(&mut self, notes: Option<String>) {
        self.admin_notes = notes.filter(|n| !n.trim().is_empty());
        self.updated_at = Utc::now();
    }

    pub fn archive(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

fn validate_customer(customer: &Customer) -> Result<(), Error> {
    if customer.name.trim().is_empty() {
        return Err(validation_error("name is required"));
    }

    if !validator::validate_email(customer.email.as_str()) {
        return Err(validation_error("email is not valid"));
    }

    Ok(())
}

fn validate_trip(trip: &Trip, now: DateTime<Utc>) -> Result<(), Error> {
    if trip.origin.trim().is_empty() || trip.destination.trim().is_empty() {
        return Err(validation_error("origin and destination are required"));
    }

    if trip.pickup_at < now {
        return Err(validation_error("pickup date cannot be in the past"));
    }

    if trip.kind == TripKind::RoundTrip {
        let return_at = trip
            .return_at
            .ok_or_else(|| validation_error("return date is required for round trips"))?;

        if return_at <= trip.pickup_at {
            return Err(validation_error("return date must be after pickup date"));
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn test_request(kind: TripKind, return_at: Option<&str>) -> BookingRequest {
    let parse = |s: &str| {
        DateTime::parse_from_rfc3339(s)
            .unwrap()
            .with_timezone(&Utc)
    };

    BookingRequest {
        customer: Customer {
            name: "Asha Patel".into(),
            email: "asha@example.com".into(),
            phone: "+91-9876543210".into(),
        },
        trip: Trip {
            origin: "Ahmedabad".into(),
            destination: "Udaipur".into(),
            pickup_at: parse("2099-01-01T10:00:00Z"),
            return_at: return_at.map(parse),
            kind,
        },
        car_type: "sedan".into(),
        distance_km: Decimal::new(26250, 2),
        price: Decimal::new(393750, 2),
        special_requests: None,
        car_id: None,
    }
}

#[test]
fn booking_id_format_test() {
    let now = DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let id = BookingId::generate_at(now);

    let s = id.as_str();
    assert!(s.starts_with("JTT1714521600"));
    assert_eq!(s.len(), "JTT".len() + 10 + 4);
    assert!(s[3..].chars().all(|c| c.is_ascii_digit()));
}

#[test]
fn booking_id_serializes_as_string_test() {
    let id = BookingId::from("JTT17000000000042");
    assert_eq!(serde_json::to_value(&id).unwrap(), "JTT17000000000042");
    assert_eq!(id.to_string(), "JTT17000000000042");
}

#[test]
fn status_parse_test() {
    for status in Status::ALL {
        assert_eq!(status.name().parse::<Status>().unwrap(), status);
    }

    let err = "bogus".parse::<Status>().unwrap_err();
    assert!(err.is_invalid_status_error());

    assert!("Confirmed".parse::<Status>().is_err());
    assert!("".parse::<Status>().is_err());
}

#[test]
fn status_serde_test() {
    let json = serde_json::to_string(&Status::InProgress).unwrap();
    assert_eq!(json, "\"in_progress\"");
    assert_eq!(Status::InProgress.label(), "In Progress");
}

#[test]
fn new_booking_is_pending_test() {
    let (booking, created) = Booking::new(test_request(TripKind::OneWay, None), None).unwrap();

    assert_eq!(booking.status, Status::Pending);
    assert!(booking.is_active);
    assert!(!booking.booking_id.as_str().is_empty());
    assert_eq!(booking.created_at, booking.updated_at);

    assert_eq!(created.booking_id, booking.id);
    assert_eq!(created.old_status, None);
    assert_eq!(created.new_status, Status::Pending);
    assert_eq!(created.changed_by, "Customer");
}

#[test]
fn round_trip_validation_test() {
    let err = Booking::new(test_request(TripKind::RoundTrip, None), None).unwrap_err();
    assert!(err.is_validation_error());

    let err = Booking::new(
        test_request(TripKind::RoundTrip, Some("2099-01-01T10:00:00Z")),
        None,
    )
    .unwrap_err();
    assert!(err.is_validation_error());

    let err = Booking::new(
        test_request(TripKind::RoundTrip, Some("2098-12-31T10:00:00Z")),
        None,
    )
    .unwrap_err();
    assert!(err.is_validation_error());

    let (booking, _) = Booking::new(
        test_request(TripKind::RoundTrip, Some("2099-01-03T18:00:00Z")),
        None,
    )
    .unwrap();
    assert!(booking.is_round_trip());
    assert_eq!(booking.duration_days(), 2);
}

#[test]
fn pickup_in_past_test() {
    let mut request = test_request(TripKind::OneWay, None);
    request.trip.pickup_at = Utc::now() - chrono::Duration::hours(1);

    let err = Booking::new(request, None).unwrap_err();
    assert!(err.is_validation_error());
}

#[test]
fn customer_validation_test() {
    let mut request = test_request(TripKind::CityRoaming, None);
    request.customer.email = "not-an-email".into();
    assert!(Booking::new(request, None).unwrap_err().is_validation_error());

    let mut request = test_request(TripKind::OneWay, None);
    request.customer.name = "  ".into();
    assert!(Booking::new(request, None).unwrap_err().is_validation_error());

    let mut request = test_request(TripKind::OneWay, None);
    request.price = Decimal::new(-500, 0);
    assert!(Booking::new(request, None).unwrap_err().is_validation_error());
}

#[test]
fn change_status_test() {
    let (mut booking, _) = Booking::new(test_request(TripKind::OneWay, None), None).unwrap();

    let change = booking
        .change_status(
            Status::Confirmed,
            "admin1",
            None,
            TransitionPolicy::Unrestricted,
        )
        .unwrap();

    assert_eq!(booking.status, Status::Confirmed);
    assert_eq!(change.old_status, Some(Status::Pending));
    assert_eq!(change.new_status, Status::Confirmed);
    assert_eq!(change.changed_by, "admin1");
    assert_eq!(change.notes.as_deref(), Some("Status updated by admin1"));
    assert_eq!(booking.updated_at, change.changed_at);

    // repeating the same change is still recorded
    let again = booking
        .change_status(
            Status::Confirmed,
            "admin1",
            Some("double checked".into()),
            TransitionPolicy::Unrestricted,
        )
        .unwrap();
    assert_eq!(again.old_status, Some(Status::Confirmed));
    assert_eq!(again.new_status, Status::Confirmed);
    assert_eq!(again.notes.as_deref(), Some("double checked"));
}

#[test]
fn change_status_actor_length_test() {
    let (mut booking, _) = Booking::new(test_request(TripKind::OneWay, None), None).unwrap();
    let before = booking.updated_at;

    let err = booking
        .change_status(
            Status::Confirmed,
            &"a".repeat(MAX_CHANGED_BY_LEN + 1),
            None,
            TransitionPolicy::Unrestricted,
        )
        .unwrap_err();

    assert!(err.is_validation_error());
    assert_eq!(booking.status, Status::Pending);
    assert_eq!(booking.updated_at, before);

    let change = booking
        .change_status(
            Status::Confirmed,
            &"a".repeat(MAX_CHANGED_BY_LEN),
            None,
            TransitionPolicy::Unrestricted,
        )
        .unwrap();
    assert_eq!(change.changed_by.len(), MAX_CHANGED_BY_LEN);
}

#[test]
fn rejected_change_leaves_booking_untouched_test() {
    let (mut booking, _) = Booking::new(test_request(TripKind::OneWay, None), None).unwrap();
    let before = booking.updated_at;

    let err = booking
        .change_status(Status::Completed, "admin1", None, TransitionPolicy::Forward)
        .unwrap_err();

    assert!(err.is_invalid_status_error());
    assert_eq!(booking.status, Status::Pending);
    assert_eq!(booking.updated_at, before);
}

#[test]
fn assign_car_keeps_status_test() {
    let (mut booking, _) = Booking::new(test_request(TripKind::OneWay, None), None).unwrap();
    let car_id = Uuid::new_v4();

    booking.assign_car(Some(car_id));
    assert_eq!(booking.assigned_car_id, Some(car_id));
    assert_eq!(booking.status, Status::Pending);

    booking.assign_car(None);
    assert_eq!(booking.assigned_car_id, None);
}

#[test]
fn legacy_pricing_is_coerced_test() {
    let (booking, _) = Booking::new(test_request(TripKind::OneWay, None), None).unwrap();

    let mut value = serde_json::to_value(&booking).unwrap();
    value["pricing"]["price"] = serde_json::json!("n/a");
    value["pricing"]["distance_km"] = serde_json::json!(null);

    let legacy: Booking = serde_json::from_value(value).unwrap();
    assert_eq!(legacy.price(), Decimal::ZERO);
    assert_eq!(legacy.distance_km(), Decimal::ZERO);
    assert_eq!(legacy.booking_id, booking.booking_id);
}
