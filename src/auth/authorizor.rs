use oso::{Oso, PolarClass};

use crate::auth::{Platform, User};
use crate::error::Error;

pub fn new() -> Result<Oso, Error> {
    let mut o = Oso::new();

    o.register_class(Platform::get_polar_class())?;
    o.register_class(User::get_polar_class())?;

    o.load_str(include_str!("rules.polar"))?;

    Ok(o)
}

#[cfg(test)]
const ADMIN_ACTIONS: [&str; 10] = [
    "list_bookings",
    "update_status",
    "assign_car",
    "update_admin_notes",
    "archive_booking",
    "delete_booking",
    "read_status_history",
    "read_summary",
    "manage_cars",
    "manage_car_types",
];

#[test]
fn customer_permissions_test() {
    let authorizor = new().unwrap();
    let customer = User::customer();

    for action in [
        "create_booking",
        "read_booking",
        "check_car_availability",
        "list_car_types",
    ] {
        let result = authorizor.is_allowed(customer.clone(), action, Platform::default());
        assert!(result.unwrap(), "customer should be allowed to {}", action);
    }

    for action in ADMIN_ACTIONS {
        let result = authorizor.is_allowed(customer.clone(), action, Platform::default());
        assert!(!result.unwrap(), "customer should not be allowed to {}", action);
    }
}

#[test]
fn admin_permissions_test() {
    let authorizor = new().unwrap();
    let admin = User::admin("admin1");

    for action in ADMIN_ACTIONS {
        let result = authorizor.is_allowed(admin.clone(), action, Platform::default());
        assert!(result.unwrap(), "admin should be allowed to {}", action);
    }

    let result = authorizor.is_allowed(admin.clone(), "create_booking", Platform::default());
    assert!(result.unwrap());
}

#[test]
fn system_permissions_test() {
    let authorizor = new().unwrap();

    let result = authorizor.is_allowed(User::system(), "update_status", Platform::default());
    assert!(result.unwrap());

    let impostor = User {
        name: "System".into(),
        roles: vec!["customer".into()],
    };
    let result = authorizor.is_allowed(impostor, "update_status", Platform::default());
    assert!(!result.unwrap());
}
