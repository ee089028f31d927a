use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::User;
use crate::entities::{
    Booking, BookingRequest, Car, CarAvailability, CarCategory, CarType, CarUpdate, NewCar,
    Status, StatusChange,
};
use crate::error::Error;

pub const BOOKINGS_PER_PAGE: i64 = 20;

/// Window on `created_at` offered by the admin booking list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFilter {
    Today,
    /// Last 7 days.
    Week,
    /// Last 30 days.
    Month,
}

impl DateFilter {
    /// Earliest `created_at` that passes the filter, counted in whole UTC days.
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));

        match self {
            Self::Today => today,
            Self::Week => today - Duration::days(7),
            Self::Month => today - Duration::days(30),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BookingFilter {
    pub status: Option<Status>,
    #[serde(default)]
    pub active_only: bool,
    /// Matched against booking id, customer name and email, origin and
    /// destination.
    pub search: Option<String>,
    pub date_filter: Option<DateFilter>,
    /// 1-based.
    pub page: Option<i64>,
}

impl BookingFilter {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * BOOKINGS_PER_PAGE
    }

    /// `ILIKE` pattern for the search box, `None` when it is blank.
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookingPage {
    pub bookings: Vec<Booking>,
    pub page: i64,
    pub per_page: i64,
    /// Bookings matching the filter across all pages.
    pub total: i64,
}

impl BookingPage {
    pub fn num_pages(&self) -> i64 {
        ((self.total + self.per_page - 1) / self.per_page).max(1)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: Status,
    pub label: String,
    pub color: String,
    pub count: i64,
}

/// Figures shown on the admin dashboard.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookingSummary {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
    pub month_start: DateTime<Utc>,
    pub monthly_bookings: i64,
    /// Sum of confirmed and completed booking prices created this month.
    pub monthly_revenue: Decimal,
}

#[async_trait]
pub trait BookingAPI {
    async fn create_booking(&self, user: User, request: BookingRequest) -> Result<Booking, Error>;
    async fn find_booking(&self, user: User, booking_id: &str) -> Result<Booking, Error>;
    async fn list_bookings(&self, user: User, filter: BookingFilter) -> Result<BookingPage, Error>;
    async fn update_status(
        &self,
        user: User,
        booking_id: &str,
        status: &str,
        notes: Option<String>,
    ) -> Result<Booking, Error>;
    async fn assign_car(
        &self,
        user: User,
        booking_id: &str,
        car_id: Option<Uuid>,
    ) -> Result<Booking, Error>;
    async fn update_admin_notes(
        &self,
        user: User,
        booking_id: &str,
        notes: Option<String>,
    ) -> Result<Booking, Error>;
    async fn archive_booking(&self, user: User, booking_id: &str) -> Result<Booking, Error>;
    async fn delete_booking(&self, user: User, booking_id: &str) -> Result<(), Error>;
    async fn status_history(&self, user: User, booking_id: &str)
        -> Result<Vec<StatusChange>, Error>;
    async fn booking_summary(&self, user: User) -> Result<BookingSummary, Error>;
}

#[async_trait]
pub trait CarAPI {
    async fn create_car_type(
        &self,
        user: User,
        name: CarCategory,
        rate_per_km: Decimal,
        minimum_distance_cap: Decimal,
    ) -> Result<CarType, Error>;
    async fn list_car_types(&self, user: User) -> Result<Vec<CarType>, Error>;
    async fn create_car(&self, user: User, params: NewCar) -> Result<Car, Error>;
    async fn find_car(&self, user: User, id: Uuid) -> Result<Car, Error>;
    async fn list_available_cars(&self, user: User, car_type_id: Uuid) -> Result<Vec<Car>, Error>;
    async fn update_car(&self, user: User, id: Uuid, params: CarUpdate) -> Result<Car, Error>;
    async fn set_car_availability(
        &self,
        user: User,
        id: Uuid,
        is_available: bool,
    ) -> Result<Car, Error>;
    async fn car_availability(&self, user: User, id: Uuid) -> Result<CarAvailability, Error>;
    async fn delete_car(&self, user: User, id: Uuid) -> Result<(), Error>;
}

pub trait API: BookingAPI + CarAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;

#[test]
fn date_filter_since_test() {
    let now = DateTime::parse_from_rfc3339("2024-03-05T17:45:00Z")
        .unwrap()
        .with_timezone(&Utc);

    assert_eq!(DateFilter::Today.since(now).to_rfc3339(), "2024-03-05T00:00:00+00:00");
    assert_eq!(DateFilter::Week.since(now).to_rfc3339(), "2024-02-27T00:00:00+00:00");
    assert_eq!(DateFilter::Month.since(now).to_rfc3339(), "2024-02-04T00:00:00+00:00");
}

#[test]
fn booking_filter_paging_test() {
    let filter: BookingFilter = serde_json::from_value(serde_json::json!({
        "status": "confirmed",
        "search": "  Udaipur ",
        "date_filter": "week",
        "page": 3
    }))
    .unwrap();

    assert_eq!(filter.status, Some(Status::Confirmed));
    assert_eq!(filter.date_filter, Some(DateFilter::Week));
    assert_eq!(filter.offset(), 40);
    assert_eq!(filter.search_pattern().as_deref(), Some("%Udaipur%"));

    let blank = BookingFilter {
        search: Some("   ".into()),
        page: Some(0),
        ..BookingFilter::default()
    };
    assert_eq!(blank.page(), 1);
    assert_eq!(blank.offset(), 0);
    assert!(blank.search_pattern().is_none());
}

#[test]
fn booking_page_count_test() {
    let page = |total| BookingPage {
        bookings: vec![],
        page: 1,
        per_page: BOOKINGS_PER_PAGE,
        total,
    };

    assert_eq!(page(0).num_pages(), 1);
    assert_eq!(page(20).num_pages(), 1);
    assert_eq!(page(21).num_pages(), 2);
}
