use async_trait::async_trait;
use axum::extract::{Extension, FromRequest, RequestParts};
use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::auth::User;
use crate::error::{unexpected_error, Error};

pub const ADMIN_USER_HEADER: &str = "x-admin-user";

/// Bearer token that unlocks the admin panel. `None` disables admin access.
#[derive(Clone, Debug)]
pub struct AdminToken(pub Option<String>);

/// The user a request acts as.
pub struct Actor(pub User);

#[async_trait]
impl<B: Send> FromRequest<B> for Actor {
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let Extension(AdminToken(token)) = Extension::<AdminToken>::from_request(req)
            .await
            .map_err(|_| unexpected_error())?;

        Ok(Actor(resolve_user(req.headers(), token.as_deref())))
    }
}

/// Anything short of a matching token and a non-empty admin name is a customer.
pub fn resolve_user(headers: &HeaderMap, token: Option<&str>) -> User {
    let token = match token {
        Some(token) => token,
        None => return User::customer(),
    };

    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let name = headers
        .get(ADMIN_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty());

    match (bearer, name) {
        (Some(bearer), Some(name)) if bearer == token => User::admin(name),
        _ => User::customer(),
    }
}

#[cfg(test)]
fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (key, value) in pairs {
        map.insert(*key, value.parse().unwrap());
    }
    map
}

#[test]
fn resolve_admin_test() {
    let user = resolve_user(
        &headers(&[("authorization", "Bearer secret"), ("x-admin-user", "admin1")]),
        Some("secret"),
    );

    assert!(user.is_admin());
    assert_eq!(user.name, "admin1");
}

#[test]
fn resolve_customer_test() {
    let wrong_token = resolve_user(
        &headers(&[("authorization", "Bearer nope"), ("x-admin-user", "admin1")]),
        Some("secret"),
    );
    assert!(!wrong_token.is_admin());
    assert_eq!(wrong_token.name, "Customer");

    let no_name = resolve_user(&headers(&[("authorization", "Bearer secret")]), Some("secret"));
    assert!(!no_name.is_admin());

    let disabled = resolve_user(
        &headers(&[("authorization", "Bearer secret"), ("x-admin-user", "admin1")]),
        None,
    );
    assert!(!disabled.is_admin());
}
