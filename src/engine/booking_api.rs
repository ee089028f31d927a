use super::helpers::{
    booking_from_row, ensure_unique_booking_id, fetch_booking_for_update, fetch_car_for_update,
    insert_booking, insert_status_change, month_start, resolve_car_type, status_change_from_row,
    update_booking, BOOKING_COLUMNS,
};
use super::Engine;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Row};
use uuid::Uuid;

use crate::{
    api::{BookingAPI, BookingFilter, BookingPage, BookingSummary, StatusCount, BOOKINGS_PER_PAGE},
    auth::User,
    entities::{coerce_amount, Booking, BookingRequest, CarCategory, Status, StatusChange},
    error::{not_found_error, validation_error, Error},
    notify::notify_detached,
};

// $1 status, $2 active only, $3 created since, $4 search pattern
const BOOKING_FILTER: &str = "($1::VARCHAR IS NULL OR status = $1) \
    AND (NOT $2 OR is_active) \
    AND ($3::TIMESTAMPTZ IS NULL OR created_at >= $3) \
    AND ($4::VARCHAR IS NULL OR booking_id ILIKE $4 \
        OR data->'customer'->>'name' ILIKE $4 \
        OR data->'customer'->>'email' ILIKE $4 \
        OR data->'trip'->>'origin' ILIKE $4 \
        OR data->'trip'->>'destination' ILIKE $4)";

#[async_trait]
impl BookingAPI for Engine {
    #[tracing::instrument(skip(self, request))]
    async fn create_booking(&self, user: User, request: BookingRequest) -> Result<Booking, Error> {
        self.authorize(&user, "create_booking")?;

        let category: CarCategory = request.car_type.parse()?;
        let requested_car_id = request.car_id;

        // validate before touching the database
        let (mut booking, created) = Booking::new(request, None)?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let car_type = resolve_car_type(&mut tx, category).await?;
        booking.car_type_id = Some(car_type.id);

        if let Some(car_id) = requested_car_id {
            let car = fetch_car_for_update(&mut tx, &car_id).await?;

            if !car.is_available {
                return Err(validation_error(format!(
                    "car {} is currently not available",
                    car.name
                )));
            }

            booking.assign_car(Some(car.id));
        }

        ensure_unique_booking_id(&mut tx, &mut booking).await?;

        insert_booking(&mut tx, &booking).await?;
        insert_status_change(&mut tx, &created).await?;

        tx.commit().await?;

        tracing::info!(booking_id = %booking.booking_id, "booking created");

        notify_detached(self.notifier.clone(), booking.clone());

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn find_booking(&self, user: User, booking_id: &str) -> Result<Booking, Error> {
        self.authorize(&user, "read_booking")?;

        let mut conn = self.pool.acquire().await?;

        let query = format!(
            "SELECT {} FROM bookings WHERE booking_id = $1",
            BOOKING_COLUMNS
        );

        let row = conn
            .fetch_optional(sqlx::query(&query).bind(booking_id))
            .await?
            .ok_or_else(|| not_found_error("booking"))?;

        booking_from_row(&row)
    }

    #[tracing::instrument(skip(self))]
    async fn list_bookings(&self, user: User, filter: BookingFilter) -> Result<BookingPage, Error> {
        self.authorize(&user, "list_bookings")?;

        let status = filter.status.map(|s| s.name());
        let since = filter.date_filter.map(|f| f.since(Utc::now()));
        let pattern = filter.search_pattern();

        let mut conn = self.pool.acquire().await?;

        let total: i64 = conn
            .fetch_one(
                sqlx::query(&format!(
                    "SELECT COUNT(*) AS total FROM bookings WHERE {}",
                    BOOKING_FILTER
                ))
                .bind(status)
                .bind(filter.active_only)
                .bind(since)
                .bind(pattern.as_deref()),
            )
            .await?
            .try_get("total")?;

        let query = format!(
            "SELECT {} FROM bookings WHERE {} ORDER BY created_at DESC LIMIT $5 OFFSET $6",
            BOOKING_COLUMNS, BOOKING_FILTER
        );

        let rows = conn
            .fetch_all(
                sqlx::query(&query)
                    .bind(status)
                    .bind(filter.active_only)
                    .bind(since)
                    .bind(pattern.as_deref())
                    .bind(BOOKINGS_PER_PAGE)
                    .bind(filter.offset()),
            )
            .await?;

        Ok(BookingPage {
            bookings: rows.iter().map(booking_from_row).collect::<Result<_, _>>()?,
            page: filter.page(),
            per_page: BOOKINGS_PER_PAGE,
            total,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(
        &self,
        user: User,
        booking_id: &str,
        status: &str,
        notes: Option<String>,
    ) -> Result<Booking, Error> {
        self.authorize(&user, "update_status")?;

        let new_status: Status = status.parse()?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut booking = fetch_booking_for_update(&mut tx, booking_id).await?;

        let change = booking.change_status(new_status, &user.name, notes, self.policy)?;

        update_booking(&mut tx, &booking).await?;
        insert_status_change(&mut tx, &change).await?;

        tx.commit().await?;

        tracing::info!(
            old_status = change.old_status_name(),
            new_status = %change.new_status,
            "booking status updated"
        );

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn assign_car(
        &self,
        user: User,
        booking_id: &str,
        car_id: Option<Uuid>,
    ) -> Result<Booking, Error> {
        self.authorize(&user, "assign_car")?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut booking = fetch_booking_for_update(&mut tx, booking_id).await?;

        if let Some(car_id) = car_id {
            // only existence is checked; availability is the admin's call
            fetch_car_for_update(&mut tx, &car_id).await?;
        }

        booking.assign_car(car_id);

        update_booking(&mut tx, &booking).await?;

        tx.commit().await?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self, notes))]
    async fn update_admin_notes(
        &self,
        user: User,
        booking_id: &str,
        notes: Option<String>,
    ) -> Result<Booking, Error> {
        self.authorize(&user, "update_admin_notes")?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut booking = fetch_booking_for_update(&mut tx, booking_id).await?;

        booking.set_admin_notes(notes);

        update_booking(&mut tx, &booking).await?;

        tx.commit().await?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn archive_booking(&self, user: User, booking_id: &str) -> Result<Booking, Error> {
        self.authorize(&user, "archive_booking")?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut booking = fetch_booking_for_update(&mut tx, booking_id).await?;

        booking.archive();

        update_booking(&mut tx, &booking).await?;

        tx.commit().await?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_booking(&self, user: User, booking_id: &str) -> Result<(), Error> {
        self.authorize(&user, "delete_booking")?;

        let mut conn = self.pool.acquire().await?;

        // status history goes with it (ON DELETE CASCADE)
        let result = conn
            .execute(sqlx::query("DELETE FROM bookings WHERE booking_id = $1").bind(booking_id))
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found_error("booking"));
        }

        tracing::info!("booking deleted");

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn status_history(
        &self,
        user: User,
        booking_id: &str,
    ) -> Result<Vec<StatusChange>, Error> {
        self.authorize(&user, "read_status_history")?;

        let mut conn = self.pool.acquire().await?;

        let id: Uuid = conn
            .fetch_optional(sqlx::query("SELECT id FROM bookings WHERE booking_id = $1").bind(booking_id))
            .await?
            .ok_or_else(|| not_found_error("booking"))?
            .try_get("id")?;

        let rows = conn
            .fetch_all(
                sqlx::query(
                    "SELECT id, booking_id, old_status, new_status, changed_by, changed_at, notes FROM booking_status_changes WHERE booking_id = $1 ORDER BY changed_at DESC, seq DESC",
                )
                .bind(&id),
            )
            .await?;

        rows.iter().map(status_change_from_row).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn booking_summary(&self, user: User) -> Result<BookingSummary, Error> {
        self.authorize(&user, "read_summary")?;

        let mut conn = self.pool.acquire().await?;

        let mut counts: HashMap<Status, i64> = HashMap::new();

        let rows = conn
            .fetch_all(sqlx::query(
                "SELECT status, COUNT(*) AS count FROM bookings GROUP BY status",
            ))
            .await?;

        for row in rows.iter() {
            let status: String = row.try_get("status")?;
            let count: i64 = row.try_get("count")?;

            match status.parse::<Status>() {
                Ok(status) => *counts.entry(status).or_default() += count,
                Err(_) => tracing::warn!(%status, "booking with unknown status ignored in summary"),
            }
        }

        let month_start = month_start(Utc::now())?;
        let mut monthly_bookings = 0;
        let mut monthly_revenue = Decimal::ZERO;

        let mut results = conn.fetch(
            sqlx::query(
                "SELECT status, data->'pricing'->'price' AS price FROM bookings WHERE created_at >= $1",
            )
            .bind(&month_start),
        );

        while let Some(row) = results.try_next().await? {
            monthly_bookings += 1;

            let status: String = row.try_get("status")?;
            let billable = status
                .parse::<Status>()
                .map(|s| s.is_billable())
                .unwrap_or(false);

            if billable {
                let price: Option<serde_json::Value> = row.try_get("price")?;
                monthly_revenue += coerce_amount(&price.unwrap_or_default());
            }
        }

        let by_status = Status::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                label: status.label().into(),
                color: status.color().into(),
                count: counts.get(status).copied().unwrap_or(0),
            })
            .collect();

        Ok(BookingSummary {
            total: counts.values().sum(),
            by_status,
            month_start,
            monthly_bookings,
            monthly_revenue,
        })
    }
}
