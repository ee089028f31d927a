mod handlers;

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};

use crate::server::handlers::{actor::AdminToken, bookings, cars, dashboard};
use crate::{api::API, config::Config, error::unexpected_error, error::Error};

pub use crate::api::DynAPI;

pub async fn serve<T: API + Sync + Send + 'static>(api: T, config: &Config) -> Result<(), Error> {
    let api = Arc::new(api) as DynAPI;

    let app = Router::new()
        .route("/bookings", post(bookings::create).get(bookings::list))
        .route("/bookings/:booking_id", get(bookings::find).delete(bookings::delete))
        .route("/bookings/:booking_id/history", get(bookings::history))
        .route("/bookings/:booking_id/status", patch(bookings::update_status))
        .route("/bookings/:booking_id/car", patch(bookings::assign_car))
        .route("/bookings/:booking_id/notes", patch(bookings::update_notes))
        .route("/bookings/:booking_id/archive", patch(bookings::archive))
        .route("/dashboard/summary", get(dashboard::summary))
        .route("/car_types", post(cars::create_type).get(cars::list_types))
        .route("/car_types/:id/cars", get(cars::list_available))
        .route("/cars", post(cars::create))
        .route(
            "/cars/:id",
            get(cars::find).patch(cars::update).delete(cars::delete),
        )
        .route(
            "/cars/:id/availability",
            get(cars::availability).patch(cars::set_availability),
        )
        .layer(Extension(api))
        .layer(Extension(AdminToken(config.admin_token.clone())));

    tracing::info!("listening on {}", config.listen_addr);

    axum::Server::bind(&config.listen_addr)
        .serve(app.into_make_service())
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "server stopped");
            unexpected_error()
        })
}
