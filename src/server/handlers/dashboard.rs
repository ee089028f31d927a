use axum::extract::{Extension, Json};

use crate::api::BookingSummary;
use crate::error::Error;
use crate::server::handlers::actor::Actor;
use crate::server::DynAPI;

pub async fn summary(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
) -> Result<Json<BookingSummary>, Error> {
    let summary = api.booking_summary(user).await?;

    Ok(summary.into())
}
