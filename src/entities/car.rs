use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::amount::validate_amount;
use crate::error::{validation_error, Error};

pub const MAX_REGISTRATION_NUMBER_LEN: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarCategory {
    #[serde(rename = "SUV")]
    Suv,
    Sedan,
    Hatchback,
}

impl CarCategory {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Suv => "SUV",
            Self::Sedan => "Sedan",
            Self::Hatchback => "Hatchback",
        }
    }

    /// Per-km rate used when a booking form names a category that has not
    /// been configured yet.
    pub fn default_rate_per_km(&self) -> Decimal {
        match self {
            Self::Hatchback => Decimal::new(12, 0),
            Self::Sedan => Decimal::new(15, 0),
            Self::Suv => Decimal::new(18, 0),
        }
    }
}

impl FromStr for CarCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "suv" => Ok(Self::Suv),
            "sedan" => Ok(Self::Sedan),
            "hatchback" => Ok(Self::Hatchback),
            _ => Err(validation_error(format!("unknown car type: {}", s))),
        }
    }
}

impl fmt::Display for CarCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CarType {
    pub id: Uuid,
    pub name: CarCategory,
    pub rate_per_km: Decimal,
    pub minimum_distance_cap: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl CarType {
    pub fn new(
        name: CarCategory,
        rate_per_km: Decimal,
        minimum_distance_cap: Decimal,
    ) -> Result<Self, Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            rate_per_km: validate_amount("rate per km", rate_per_km)?,
            minimum_distance_cap: validate_amount("minimum distance", minimum_distance_cap)?,
            is_active: true,
            created_at: Utc::now(),
        })
    }

    pub fn with_default_rate(name: CarCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            rate_per_km: name.default_rate_per_km(),
            minimum_distance_cap: Decimal::ZERO,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewCar {
    pub car_type_id: Uuid,
    pub name: String,
    pub registration_number: String,
    #[serde(default)]
    pub driver_name: String,
    #[serde(default)]
    pub driver_contact: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Car {
    pub id: Uuid,
    pub car_type_id: Uuid,
    pub name: String,
    pub registration_number: String,
    pub is_available: bool,
    pub driver_name: String,
    pub driver_contact: String,
    pub created_at: DateTime<Utc>,
}

/// Full replacement of a car's editable fields, as sent by the admin edit form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CarUpdate {
    pub car_type_id: Uuid,
    pub name: String,
    pub registration_number: String,
    #[serde(default)]
    pub driver_name: String,
    #[serde(default)]
    pub driver_contact: String,
    pub is_available: bool,
}

impl Car {
    pub fn new(params: NewCar) -> Result<Self, Error> {
        let (name, registration_number) = validate_car(&params.name, &params.registration_number)?;

        Ok(Self {
            id: Uuid::new_v4(),
            car_type_id: params.car_type_id,
            name,
            registration_number,
            is_available: true,
            driver_name: params.driver_name,
            driver_contact: params.driver_contact,
            created_at: Utc::now(),
        })
    }

    /// Leaves the car untouched when the update is invalid.
    pub fn apply(&mut self, update: CarUpdate) -> Result<(), Error> {
        let (name, registration_number) = validate_car(&update.name, &update.registration_number)?;

        self.car_type_id = update.car_type_id;
        self.name = name;
        self.registration_number = registration_number;
        self.driver_name = update.driver_name.trim().into();
        self.driver_contact = update.driver_contact.trim().into();
        self.is_available = update.is_available;

        Ok(())
    }
}

/// Returns the trimmed name and the normalized registration number.
fn validate_car(name: &str, registration_number: &str) -> Result<(String, String), Error> {
    let name = name.trim();
    let registration_number = registration_number.trim().to_uppercase();

    if name.is_empty() || registration_number.is_empty() {
        return Err(validation_error("car name and registration number are required"));
    }

    if registration_number.chars().count() > MAX_REGISTRATION_NUMBER_LEN {
        return Err(validation_error(format!(
            "registration number cannot be longer than {} characters",
            MAX_REGISTRATION_NUMBER_LEN
        )));
    }

    Ok((name.into(), registration_number))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CarAvailability {
    pub available: bool,
    pub car_name: String,
    pub car_type: CarCategory,
}

#[test]
fn car_category_parse_test() {
    assert_eq!("sedan".parse::<CarCategory>().unwrap(), CarCategory::Sedan);
    assert_eq!(" SUV ".parse::<CarCategory>().unwrap(), CarCategory::Suv);
    assert_eq!("Hatchback".parse::<CarCategory>().unwrap(), CarCategory::Hatchback);
    assert!("limo".parse::<CarCategory>().unwrap_err().is_validation_error());

    assert_eq!(serde_json::to_string(&CarCategory::Suv).unwrap(), "\"SUV\"");
}

#[test]
fn default_rates_test() {
    let hatchback = CarType::with_default_rate(CarCategory::Hatchback);
    assert_eq!(hatchback.rate_per_km, Decimal::new(12, 0));
    assert!(hatchback.is_active);

    assert_eq!(CarCategory::Sedan.default_rate_per_km(), Decimal::new(15, 0));
    assert_eq!(CarCategory::Suv.default_rate_per_km(), Decimal::new(18, 0));

    let err = CarType::new(CarCategory::Sedan, Decimal::new(-1, 0), Decimal::ZERO).unwrap_err();
    assert!(err.is_validation_error());
}

#[test]
fn new_car_test() {
    let car = Car::new(NewCar {
        car_type_id: Uuid::new_v4(),
        name: " Dzire ".into(),
        registration_number: "gj01ab1234".into(),
        driver_name: "Ramesh".into(),
        driver_contact: "9999999999".into(),
    })
    .unwrap();

    assert_eq!(car.name, "Dzire");
    assert_eq!(car.registration_number, "GJ01AB1234");
    assert!(car.is_available);

    let err = Car::new(NewCar {
        car_type_id: Uuid::new_v4(),
        name: "Innova".into(),
        registration_number: " ".into(),
        driver_name: String::new(),
        driver_contact: String::new(),
    })
    .unwrap_err();
    assert!(err.is_validation_error());
}

#[test]
fn registration_number_length_test() {
    let params = |registration_number: &str| NewCar {
        car_type_id: Uuid::new_v4(),
        name: "Innova".into(),
        registration_number: registration_number.into(),
        driver_name: String::new(),
        driver_contact: String::new(),
    };

    assert!(Car::new(params(&"A".repeat(20))).is_ok());
    assert!(Car::new(params(&format!("  {}  ", "A".repeat(20)))).is_ok());

    let err = Car::new(params(&"A".repeat(21))).unwrap_err();
    assert!(err.is_validation_error());
}

#[test]
fn apply_car_update_test() {
    let mut car = Car::new(NewCar {
        car_type_id: Uuid::new_v4(),
        name: "Dzire".into(),
        registration_number: "GJ01AB1234".into(),
        driver_name: "Ramesh".into(),
        driver_contact: "9999999999".into(),
    })
    .unwrap();

    let car_type_id = Uuid::new_v4();
    car.apply(CarUpdate {
        car_type_id,
        name: "Ertiga".into(),
        registration_number: " gj05cd9876 ".into(),
        driver_name: " Suresh ".into(),
        driver_contact: String::new(),
        is_available: false,
    })
    .unwrap();

    assert_eq!(car.car_type_id, car_type_id);
    assert_eq!(car.name, "Ertiga");
    assert_eq!(car.registration_number, "GJ05CD9876");
    assert_eq!(car.driver_name, "Suresh");
    assert!(!car.is_available);

    let err = car
        .apply(CarUpdate {
            car_type_id: Uuid::new_v4(),
            name: "Ertiga".into(),
            registration_number: "X".repeat(21),
            driver_name: String::new(),
            driver_contact: String::new(),
            is_available: true,
        })
        .unwrap_err();
    assert!(err.is_validation_error());
    assert_eq!(car.car_type_id, car_type_id);
    assert_eq!(car.registration_number, "GJ05CD9876");
    assert!(!car.is_available);
}
