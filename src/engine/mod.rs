mod booking_api;
mod car_api;
mod helpers;

use std::sync::Arc;

use oso::Oso;
use sqlx::{Executor, Pool, Postgres};

use crate::{
    api::API,
    auth::{authorizor, Platform, User},
    error::{unauthorized_error, Error},
    notify::{DynNotifier, LogNotifier},
    policy::TransitionPolicy,
};

type Database = Postgres;

pub struct Engine {
    pool: Pool<Database>,
    authorizor: Oso,
    policy: TransitionPolicy,
    notifier: DynNotifier,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub async fn new(
        pool: Pool<Database>,
        policy: TransitionPolicy,
        notifier: DynNotifier,
    ) -> Result<Self, Error> {
        // catalog
        pool.execute(
            "CREATE TABLE IF NOT EXISTS car_types (id UUID PRIMARY KEY, name VARCHAR(20) NOT NULL UNIQUE, data JSONB NOT NULL)",
        )
        .await?;
        pool.execute("CREATE TABLE IF NOT EXISTS cars (id UUID PRIMARY KEY, car_type_id UUID NOT NULL, registration_number VARCHAR(20) NOT NULL UNIQUE, is_available BOOLEAN NOT NULL DEFAULT TRUE, data JSONB NOT NULL, CONSTRAINT fk_car_car_type FOREIGN KEY(car_type_id) REFERENCES car_types(id) ON DELETE CASCADE)")
            .await?;

        // bookings
        pool.execute("CREATE TABLE IF NOT EXISTS bookings (id UUID PRIMARY KEY, booking_id VARCHAR(20) NOT NULL UNIQUE, status VARCHAR(20) NOT NULL, car_type_id UUID, assigned_car_id UUID, is_active BOOLEAN NOT NULL DEFAULT TRUE, created_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL, CONSTRAINT fk_booking_car_type FOREIGN KEY(car_type_id) REFERENCES car_types(id) ON DELETE SET NULL, CONSTRAINT fk_booking_car FOREIGN KEY(assigned_car_id) REFERENCES cars(id) ON DELETE SET NULL)")
            .await?;
        pool.execute("CREATE INDEX IF NOT EXISTS bookings_status_idx ON bookings (status)")
            .await?;

        // status history, append only
        pool.execute("CREATE TABLE IF NOT EXISTS booking_status_changes (seq BIGSERIAL PRIMARY KEY, id UUID NOT NULL UNIQUE, booking_id UUID NOT NULL, old_status VARCHAR(20) NOT NULL, new_status VARCHAR(20) NOT NULL, changed_by VARCHAR(100) NOT NULL, changed_at TIMESTAMPTZ NOT NULL, notes TEXT, CONSTRAINT fk_status_change_booking FOREIGN KEY(booking_id) REFERENCES bookings(id) ON DELETE CASCADE)")
            .await?;
        pool.execute("CREATE INDEX IF NOT EXISTS booking_status_changes_booking_idx ON booking_status_changes (booking_id, changed_at DESC)")
            .await?;

        Ok(Self {
            pool,
            authorizor: authorizor::new()?,
            policy,
            notifier,
        })
    }

    pub async fn with_defaults(pool: Pool<Database>) -> Result<Self, Error> {
        Self::new(pool, TransitionPolicy::default(), Arc::new(LogNotifier)).await
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }
}

impl Engine {
    pub fn authorize(&self, user: &User, action: &str) -> Result<(), Error> {
        if self
            .authorizor
            .is_allowed(user.clone(), action, Platform::default())?
        {
            return Ok(());
        }

        tracing::warn!(user = %user.name, action, "action not allowed");

        Err(unauthorized_error())
    }
}

impl API for Engine {}
