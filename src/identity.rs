//! Client identity resolution
//!
//! A durable per-visitor identifier is carried in a cookie. When the
//! cookie is absent a fresh id is generated as
//! `{uniform random u32}.{unix seconds}`; the random source and clock are
//! the only impure inputs, and [`resolve_client_id`] takes the generator
//! as a parameter so tests can substitute it.

use chrono::Utc;

use crate::types::{ClientIdentity, Cookie, RequestInfo, ResponseInfo};

/// Name of the client-id cookie.
pub const CLIENT_ID_COOKIE: &str = "ga4_client_id";

/// Cookie lifetime: one year.
pub const CLIENT_ID_COOKIE_MAX_AGE_SECS: i64 = 31_536_000;

/// Generate a fresh client id: `{random u32}.{current unix seconds}`.
pub fn generate_client_id() -> String {
    format!("{}.{}", rand::random::<u32>(), Utc::now().timestamp())
}

/// Resolve the client identity from the request's cookie, generating a
/// new id with `new_id` when no (non-empty) cookie exists.
pub fn resolve_client_id(request: &RequestInfo, new_id: impl FnOnce() -> String) -> ClientIdentity {
    match request.cookie(CLIENT_ID_COOKIE) {
        Some(id) if !id.is_empty() => ClientIdentity {
            id: id.to_string(),
            is_new: false,
        },
        _ => ClientIdentity {
            id: new_id(),
            is_new: true,
        },
    }
}

/// Schedule the client-id cookie on the response with the fixed one-year
/// expiry. Side effect only.
pub fn issue_cookie(response: &mut ResponseInfo, id: &str) {
    response.set_cookie(Cookie {
        name: CLIENT_ID_COOKIE.to_string(),
        value: id.to_string(),
        max_age_secs: CLIENT_ID_COOKIE_MAX_AGE_SECS,
    });
}
