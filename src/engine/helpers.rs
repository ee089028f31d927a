use super::Database;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use sqlx::{postgres::PgRow, types::Json, Executor, Row, Transaction};
use uuid::Uuid;

use crate::{
    entities::{Booking, Car, CarCategory, CarType, Status, StatusChange},
    error::{not_found_error, unexpected_error, Error},
};

const MAX_BOOKING_ID_ATTEMPTS: usize = 5;

pub const BOOKING_COLUMNS: &str = "data, car_type_id, assigned_car_id";

/// Relations are authoritative in their own columns: a deleted car or car
/// type clears them through `ON DELETE SET NULL` without touching `data`.
pub fn booking_from_row(row: &PgRow) -> Result<Booking, Error> {
    let Json(mut booking): Json<Booking> = row.try_get("data")?;

    booking.car_type_id = row.try_get("car_type_id")?;
    booking.assigned_car_id = row.try_get("assigned_car_id")?;

    Ok(booking)
}

pub fn status_change_from_row(row: &PgRow) -> Result<StatusChange, Error> {
    let old_status: String = row.try_get("old_status")?;
    let new_status: String = row.try_get("new_status")?;

    Ok(StatusChange {
        id: row.try_get("id")?,
        booking_id: row.try_get("booking_id")?,
        old_status: match old_status.as_str() {
            "" => None,
            s => Some(s.parse::<Status>()?),
        },
        new_status: new_status.parse()?,
        changed_by: row.try_get("changed_by")?,
        changed_at: row.try_get("changed_at")?,
        notes: row.try_get("notes")?,
    })
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_booking_for_update(
    tx: &mut Transaction<'_, Database>,
    booking_id: &str,
) -> Result<Booking, Error> {
    let query = format!(
        "SELECT {} FROM bookings WHERE booking_id = $1 FOR UPDATE",
        BOOKING_COLUMNS
    );

    let row = tx
        .fetch_optional(sqlx::query(&query).bind(booking_id))
        .await?
        .ok_or_else(|| not_found_error("booking"))?;

    booking_from_row(&row)
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_car_for_update(
    tx: &mut Transaction<'_, Database>,
    id: &Uuid,
) -> Result<Car, Error> {
    let Json(car): Json<Car> = tx
        .fetch_optional(sqlx::query("SELECT data FROM cars WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(|| not_found_error("car"))?
        .try_get("data")?;

    Ok(car)
}

/// Finds the car type for a category, creating it with the default rate when
/// the catalog does not have it yet.
#[tracing::instrument(skip(tx))]
pub async fn resolve_car_type(
    tx: &mut Transaction<'_, Database>,
    category: CarCategory,
) -> Result<CarType, Error> {
    let candidate = CarType::with_default_rate(category);

    tx.execute(
        sqlx::query(
            "INSERT INTO car_types (id, name, data) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
        )
        .bind(&candidate.id)
        .bind(category.name())
        .bind(Json(&candidate)),
    )
    .await?;

    let Json(car_type): Json<CarType> = tx
        .fetch_one(sqlx::query("SELECT data FROM car_types WHERE name = $1").bind(category.name()))
        .await?
        .try_get("data")?;

    Ok(car_type)
}

/// Draws new booking references until one is free. The unique constraint
/// on `booking_id` still guards the insert itself.
#[tracing::instrument(skip_all)]
pub async fn ensure_unique_booking_id(
    tx: &mut Transaction<'_, Database>,
    booking: &mut Booking,
) -> Result<(), Error> {
    for _ in 0..MAX_BOOKING_ID_ATTEMPTS {
        let taken = tx
            .fetch_optional(
                sqlx::query("SELECT 1 FROM bookings WHERE booking_id = $1")
                    .bind(booking.booking_id.as_str()),
            )
            .await?
            .is_some();

        if !taken {
            return Ok(());
        }

        tracing::info!(booking_id = %booking.booking_id, "booking id taken, drawing another");
        booking.regenerate_booking_id();
    }

    Err(unexpected_error())
}

#[tracing::instrument(skip_all, fields(booking_id = %booking.booking_id))]
pub async fn insert_booking(
    tx: &mut Transaction<'_, Database>,
    booking: &Booking,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query(
            "INSERT INTO bookings (id, booking_id, status, car_type_id, assigned_car_id, is_active, created_at, data) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&booking.id)
        .bind(booking.booking_id.as_str())
        .bind(booking.status.name())
        .bind(&booking.car_type_id)
        .bind(&booking.assigned_car_id)
        .bind(booking.is_active)
        .bind(&booking.created_at)
        .bind(Json(booking)),
    )
    .await?;

    Ok(())
}

/// The single write path for an existing booking row.
#[tracing::instrument(skip_all, fields(booking_id = %booking.booking_id))]
pub async fn update_booking(
    tx: &mut Transaction<'_, Database>,
    booking: &Booking,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query(
            "UPDATE bookings SET status = $2, assigned_car_id = $3, is_active = $4, data = $5 WHERE id = $1",
        )
        .bind(&booking.id)
        .bind(booking.status.name())
        .bind(&booking.assigned_car_id)
        .bind(booking.is_active)
        .bind(Json(booking)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip_all, fields(new_status = %change.new_status))]
pub async fn insert_status_change(
    tx: &mut Transaction<'_, Database>,
    change: &StatusChange,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query(
            "INSERT INTO booking_status_changes (id, booking_id, old_status, new_status, changed_by, changed_at, notes) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&change.id)
        .bind(&change.booking_id)
        .bind(change.old_status_name())
        .bind(change.new_status.name())
        .bind(&change.changed_by)
        .bind(&change.changed_at)
        .bind(&change.notes),
    )
    .await?;

    Ok(())
}

/// The single write path for an existing car row.
#[tracing::instrument(skip_all, fields(car_id = %car.id))]
pub async fn save_car(tx: &mut Transaction<'_, Database>, car: &Car) -> Result<(), Error> {
    tx.execute(
        sqlx::query(
            "UPDATE cars SET car_type_id = $2, registration_number = $3, is_available = $4, data = $5 WHERE id = $1",
        )
        .bind(&car.id)
        .bind(&car.car_type_id)
        .bind(&car.registration_number)
        .bind(car.is_available)
        .bind(Json(car)),
    )
    .await?;

    Ok(())
}

pub fn month_start(now: DateTime<Utc>) -> Result<DateTime<Utc>, Error> {
    chrono::NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .ok_or_else(unexpected_error)
}

#[test]
fn month_start_test() {
    let now = DateTime::parse_from_rfc3339("2024-02-29T17:45:10Z")
        .unwrap()
        .with_timezone(&Utc);

    let start = month_start(now).unwrap();
    assert_eq!(start.to_rfc3339(), "2024-02-01T00:00:00+00:00");
}

