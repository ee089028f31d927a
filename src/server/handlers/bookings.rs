use axum::extract::{Extension, Json, Path, Query};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{BookingFilter, BookingPage};
use crate::entities::{Booking, BookingRequest, Customer, StatusChange, Trip, TripKind};
use crate::error::{validation_error, Error};
use crate::server::handlers::actor::Actor;
use crate::server::DynAPI;

/// Booking form as posted by the website.
#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    name: String,
    email: String,
    phone: String,
    #[serde(default)]
    trip_type: TripKind,
    origin: String,
    destination: String,
    pickup_at: String,
    return_at: Option<String>,
    car_type: String,
    car_id: Option<Uuid>,
    distance_km: Decimal,
    price: Decimal,
    special_requests: Option<String>,
}

impl CreateParams {
    fn into_request(self) -> Result<BookingRequest, Error> {
        let return_at = match self.return_at.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(parse_timestamp("return_at", value)?),
        };

        Ok(BookingRequest {
            customer: Customer {
                name: self.name,
                email: self.email,
                phone: self.phone,
            },
            trip: Trip {
                origin: self.origin,
                destination: self.destination,
                pickup_at: parse_timestamp("pickup_at", &self.pickup_at)?,
                return_at,
                kind: self.trip_type,
            },
            car_type: self.car_type,
            distance_km: self.distance_km,
            price: self.price,
            special_requests: self.special_requests.filter(|s| !s.trim().is_empty()),
            car_id: self.car_id,
        })
    }
}

#[derive(Serialize, Deserialize)]
pub struct UpdateStatusParams {
    status: String,
    notes: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct AssignCarParams {
    car_id: Option<Uuid>,
}

#[derive(Serialize, Deserialize)]
pub struct UpdateNotesParams {
    admin_notes: Option<String>,
}

/// Accepts RFC 3339 as well as the `datetime-local` form format, which
/// carries no offset and is read as UTC.
pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, Error> {
    let value = value.trim();

    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .map(|t| Utc.from_utc_datetime(&t))
        .map_err(|_| validation_error(format!("{} is not a valid date and time", field)))
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Json(params): Json<CreateParams>,
) -> Result<Json<Booking>, Error> {
    let booking = api.create_booking(user, params.into_request()?).await?;

    Ok(booking.into())
}

pub async fn list(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<BookingPage>, Error> {
    let page = api.list_bookings(user, filter).await?;

    Ok(page.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Path(booking_id): Path<String>,
) -> Result<Json<Booking>, Error> {
    let booking = api.find_booking(user, &booking_id).await?;

    Ok(booking.into())
}

pub async fn history(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Path(booking_id): Path<String>,
) -> Result<Json<Vec<StatusChange>>, Error> {
    let history = api.status_history(user, &booking_id).await?;

    Ok(history.into())
}

pub async fn update_status(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Path(booking_id): Path<String>,
    Json(params): Json<UpdateStatusParams>,
) -> Result<Json<Booking>, Error> {
    let booking = api
        .update_status(user, &booking_id, &params.status, params.notes)
        .await?;

    Ok(booking.into())
}

pub async fn assign_car(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Path(booking_id): Path<String>,
    Json(params): Json<AssignCarParams>,
) -> Result<Json<Booking>, Error> {
    let booking = api.assign_car(user, &booking_id, params.car_id).await?;

    Ok(booking.into())
}

pub async fn update_notes(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Path(booking_id): Path<String>,
    Json(params): Json<UpdateNotesParams>,
) -> Result<Json<Booking>, Error> {
    let booking = api
        .update_admin_notes(user, &booking_id, params.admin_notes)
        .await?;

    Ok(booking.into())
}

pub async fn archive(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Path(booking_id): Path<String>,
) -> Result<Json<Booking>, Error> {
    let booking = api.archive_booking(user, &booking_id).await?;

    Ok(booking.into())
}

pub async fn delete(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Path(booking_id): Path<String>,
) -> Result<Json<()>, Error> {
    api.delete_booking(user, &booking_id).await?;

    Ok(().into())
}

#[test]
fn parse_timestamp_test() {
    let rfc = parse_timestamp("pickup_at", "2099-01-01T10:00:00+05:30").unwrap();
    assert_eq!(rfc.to_rfc3339(), "2099-01-01T04:30:00+00:00");

    let form = parse_timestamp("pickup_at", "2099-01-01T10:00").unwrap();
    assert_eq!(form.to_rfc3339(), "2099-01-01T10:00:00+00:00");

    let seconds = parse_timestamp("pickup_at", " 2099-01-01T10:00:30 ").unwrap();
    assert_eq!(seconds.to_rfc3339(), "2099-01-01T10:00:30+00:00");

    let err = parse_timestamp("pickup_at", "tomorrow").unwrap_err();
    assert!(err.is_validation_error());
    assert!(err.message.contains("pickup_at"));
}

#[test]
fn create_params_test() {
    let params: CreateParams = serde_json::from_value(serde_json::json!({
        "name": "Asha Patel",
        "email": "asha@example.com",
        "phone": "9876543210",
        "trip_type": "round-trip",
        "origin": "Ahmedabad",
        "destination": "Udaipur",
        "pickup_at": "2099-01-01T10:00",
        "return_at": "",
        "car_type": "sedan",
        "car_id": null,
        "distance_km": "262.50",
        "price": "3937.50",
        "special_requests": "  "
    }))
    .unwrap();

    let request = params.into_request().unwrap();

    assert_eq!(request.trip.kind, TripKind::RoundTrip);
    assert!(request.trip.return_at.is_none());
    assert!(request.special_requests.is_none());
    assert_eq!(request.price, Decimal::new(393750, 2));
}
