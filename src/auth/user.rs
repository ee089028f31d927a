use oso::PolarClass;
use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";
pub const SYSTEM_ROLE: &str = "system";

/// The actor behind a request. `name` is what the status history records as
/// `changed_by`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub roles: Vec<String>,
}

impl User {
    pub fn customer() -> Self {
        Self {
            name: "Customer".into(),
            roles: vec![],
        }
    }

    pub fn system() -> Self {
        Self {
            name: "System".into(),
            roles: vec![SYSTEM_ROLE.into()],
        }
    }

    pub fn admin(username: &str) -> Self {
        Self {
            name: username.into(),
            roles: vec![ADMIN_ROLE.into()],
        }
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE.into())
    }

    fn has_role(&self, role: String) -> bool {
        self.roles.iter().any(|x| x == &role)
    }
}

impl PolarClass for User {
    fn get_polar_class_builder() -> oso::ClassBuilder<User> {
        oso::Class::builder()
            .name("User")
            .add_attribute_getter("name", |recv: &User| recv.name.clone())
            .add_attribute_getter("roles", |recv: &User| recv.roles.clone())
            .add_method("has_role", User::has_role)
    }

    fn get_polar_class() -> oso::Class {
        let builder = User::get_polar_class_builder();
        builder.build()
    }
}

#[test]
fn user_roles_test() {
    assert!(User::admin("admin1").is_admin());
    assert_eq!(User::admin("admin1").name, "admin1");
    assert!(!User::customer().is_admin());
    assert!(!User::system().is_admin());
    assert_eq!(User::system().name, "System");
    assert_eq!(User::customer().name, "Customer");
}
