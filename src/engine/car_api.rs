use super::helpers::{fetch_car_for_update, save_car};
use super::Engine;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{types::Json, Acquire, Executor, Row};
use uuid::Uuid;

use crate::{
    api::CarAPI,
    auth::User,
    entities::{Car, CarAvailability, CarCategory, CarType, CarUpdate, NewCar},
    error::{not_found_error, validation_error, Error},
};

#[async_trait]
impl CarAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_car_type(
        &self,
        user: User,
        name: CarCategory,
        rate_per_km: Decimal,
        minimum_distance_cap: Decimal,
    ) -> Result<CarType, Error> {
        self.authorize(&user, "manage_car_types")?;

        let car_type = CarType::new(name, rate_per_km, minimum_distance_cap)?;

        let mut conn = self.pool.acquire().await?;

        let result = conn
            .execute(
                sqlx::query(
                    "INSERT INTO car_types (id, name, data) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
                )
                .bind(&car_type.id)
                .bind(name.name())
                .bind(Json(&car_type)),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(validation_error(format!("car type {} already exists", name)));
        }

        Ok(car_type)
    }

    #[tracing::instrument(skip(self))]
    async fn list_car_types(&self, user: User) -> Result<Vec<CarType>, Error> {
        self.authorize(&user, "list_car_types")?;

        let mut conn = self.pool.acquire().await?;

        let rows = conn
            .fetch_all(sqlx::query("SELECT data FROM car_types ORDER BY name"))
            .await?;

        rows.iter()
            .map(|row| {
                let Json(car_type): Json<CarType> = row.try_get("data")?;
                Ok(car_type)
            })
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn create_car(&self, user: User, params: NewCar) -> Result<Car, Error> {
        self.authorize(&user, "manage_cars")?;

        let car = Car::new(params)?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        tx.fetch_optional(sqlx::query("SELECT 1 FROM car_types WHERE id = $1").bind(&car.car_type_id))
            .await?
            .ok_or_else(|| not_found_error("car type"))?;

        let result = tx
            .execute(
                sqlx::query(
                    "INSERT INTO cars (id, car_type_id, registration_number, is_available, data) VALUES ($1, $2, $3, $4, $5) ON CONFLICT (registration_number) DO NOTHING",
                )
                .bind(&car.id)
                .bind(&car.car_type_id)
                .bind(&car.registration_number)
                .bind(car.is_available)
                .bind(Json(&car)),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(validation_error(format!(
                "a car with registration number {} already exists",
                car.registration_number
            )));
        }

        tx.commit().await?;

        tracing::info!(car_id = %car.id, "car created");

        Ok(car)
    }

    #[tracing::instrument(skip(self))]
    async fn find_car(&self, user: User, id: Uuid) -> Result<Car, Error> {
        self.authorize(&user, "manage_cars")?;

        let mut conn = self.pool.acquire().await?;

        let Json(car): Json<Car> = conn
            .fetch_optional(sqlx::query("SELECT data FROM cars WHERE id = $1").bind(&id))
            .await?
            .ok_or_else(|| not_found_error("car"))?
            .try_get("data")?;

        Ok(car)
    }

    #[tracing::instrument(skip(self))]
    async fn list_available_cars(&self, user: User, car_type_id: Uuid) -> Result<Vec<Car>, Error> {
        self.authorize(&user, "check_car_availability")?;

        let mut conn = self.pool.acquire().await?;

        let rows = conn
            .fetch_all(
                sqlx::query(
                    "SELECT data FROM cars WHERE car_type_id = $1 AND is_available ORDER BY data->>'name'",
                )
                .bind(&car_type_id),
            )
            .await?;

        rows.iter()
            .map(|row| {
                let Json(car): Json<Car> = row.try_get("data")?;
                Ok(car)
            })
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn update_car(&self, user: User, id: Uuid, params: CarUpdate) -> Result<Car, Error> {
        self.authorize(&user, "manage_cars")?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut car = fetch_car_for_update(&mut tx, &id).await?;
        car.apply(params)?;

        tx.fetch_optional(sqlx::query("SELECT 1 FROM car_types WHERE id = $1").bind(&car.car_type_id))
            .await?
            .ok_or_else(|| not_found_error("car type"))?;

        let taken = tx
            .fetch_optional(
                sqlx::query("SELECT 1 FROM cars WHERE registration_number = $1 AND id <> $2")
                    .bind(&car.registration_number)
                    .bind(&car.id),
            )
            .await?
            .is_some();

        if taken {
            return Err(validation_error(format!(
                "a car with registration number {} already exists",
                car.registration_number
            )));
        }

        save_car(&mut tx, &car).await?;

        tx.commit().await?;

        tracing::info!("car updated");

        Ok(car)
    }

    #[tracing::instrument(skip(self))]
    async fn set_car_availability(
        &self,
        user: User,
        id: Uuid,
        is_available: bool,
    ) -> Result<Car, Error> {
        self.authorize(&user, "manage_cars")?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut car = fetch_car_for_update(&mut tx, &id).await?;
        car.is_available = is_available;

        save_car(&mut tx, &car).await?;

        tx.commit().await?;

        Ok(car)
    }

    #[tracing::instrument(skip(self))]
    async fn car_availability(&self, user: User, id: Uuid) -> Result<CarAvailability, Error> {
        self.authorize(&user, "check_car_availability")?;

        let mut conn = self.pool.acquire().await?;

        let row = conn
            .fetch_optional(
                sqlx::query(
                    "SELECT c.data AS car, t.name AS car_type FROM cars c JOIN car_types t ON t.id = c.car_type_id WHERE c.id = $1",
                )
                .bind(&id),
            )
            .await?
            .ok_or_else(|| not_found_error("car"))?;

        let Json(car): Json<Car> = row.try_get("car")?;
        let car_type: String = row.try_get("car_type")?;

        Ok(CarAvailability {
            available: car.is_available,
            car_name: car.name,
            car_type: car_type.parse()?,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn delete_car(&self, user: User, id: Uuid) -> Result<(), Error> {
        self.authorize(&user, "manage_cars")?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        // the column is cleared by ON DELETE SET NULL, the document is not
        tx.execute(
            sqlx::query(
                "UPDATE bookings SET data = jsonb_set(data, '{assigned_car_id}', 'null') WHERE assigned_car_id = $1",
            )
            .bind(&id),
        )
        .await?;

        let result = tx
            .execute(sqlx::query("DELETE FROM cars WHERE id = $1").bind(&id))
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found_error("car"));
        }

        tx.commit().await?;

        tracing::info!("car deleted");

        Ok(())
    }
}
