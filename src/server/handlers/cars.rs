use axum::extract::{Extension, Json, Path};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Car, CarAvailability, CarType, CarUpdate, NewCar};
use crate::error::Error;
use crate::server::handlers::actor::Actor;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct CreateTypeParams {
    name: String,
    rate_per_km: Decimal,
    #[serde(default)]
    minimum_distance_cap: Decimal,
}

#[derive(Serialize, Deserialize)]
pub struct AvailabilityParams {
    is_available: bool,
}

pub async fn create_type(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Json(params): Json<CreateTypeParams>,
) -> Result<Json<CarType>, Error> {
    let car_type = api
        .create_car_type(
            user,
            params.name.parse()?,
            params.rate_per_km,
            params.minimum_distance_cap,
        )
        .await?;

    Ok(car_type.into())
}

pub async fn list_types(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
) -> Result<Json<Vec<CarType>>, Error> {
    let car_types = api.list_car_types(user).await?;

    Ok(car_types.into())
}

pub async fn list_available(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Path(car_type_id): Path<Uuid>,
) -> Result<Json<Vec<Car>>, Error> {
    let cars = api.list_available_cars(user, car_type_id).await?;

    Ok(cars.into())
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Json(params): Json<NewCar>,
) -> Result<Json<Car>, Error> {
    let car = api.create_car(user, params).await?;

    Ok(car.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Car>, Error> {
    let car = api.find_car(user, id).await?;

    Ok(car.into())
}

pub async fn update(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Path(id): Path<Uuid>,
    Json(params): Json<CarUpdate>,
) -> Result<Json<Car>, Error> {
    let car = api.update_car(user, id, params).await?;

    Ok(car.into())
}

pub async fn availability(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<CarAvailability>, Error> {
    let availability = api.car_availability(user, id).await?;

    Ok(availability.into())
}

pub async fn set_availability(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Path(id): Path<Uuid>,
    Json(params): Json<AvailabilityParams>,
) -> Result<Json<Car>, Error> {
    let car = api.set_car_availability(user, id, params.is_available).await?;

    Ok(car.into())
}

pub async fn delete(
    Extension(api): Extension<DynAPI>,
    Actor(user): Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<()>, Error> {
    api.delete_car(user, id).await?;

    Ok(().into())
}
