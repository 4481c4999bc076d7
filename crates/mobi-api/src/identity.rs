//! Pre-validated caller identity
//!
//! The upstream gateway authenticates callers and forwards their identity in
//! `X-User-Id` / `X-User-Role` headers. These extractors turn the headers
//! into typed values and reject requests where they are missing or malformed.

use actix_web::{dev::Payload, error::ErrorUnauthorized, FromRequest, HttpRequest};
use mobi_core::AppError;
use std::future::{ready, Ready};
use tracing::{debug, warn};
use uuid::Uuid;

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the caller's role
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Identity of the authenticated caller
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user_id: Uuid,
    pub role: String,
}

impl CallerIdentity {
    /// Whether the caller has admin privileges
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}

fn header_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl FromRequest for CallerIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let raw_id = match header_value(req, USER_ID_HEADER) {
            Some(id) => id,
            None => {
                debug!("Missing {} header", USER_ID_HEADER);
                return ready(Err(ErrorUnauthorized(AppError::Unauthorized(format!(
                    "Missing {} header",
                    USER_ID_HEADER
                )))));
            }
        };

        let user_id = match Uuid::parse_str(&raw_id) {
            Ok(id) => id,
            Err(_) => {
                warn!("Malformed {} header: {}", USER_ID_HEADER, raw_id);
                return ready(Err(ErrorUnauthorized(AppError::Unauthorized(format!(
                    "Malformed {} header",
                    USER_ID_HEADER
                )))));
            }
        };

        let role = match header_value(req, USER_ROLE_HEADER) {
            Some(role) => role,
            None => {
                debug!("Missing {} header", USER_ROLE_HEADER);
                return ready(Err(ErrorUnauthorized(AppError::Unauthorized(format!(
                    "Missing {} header",
                    USER_ROLE_HEADER
                )))));
            }
        };

        ready(Ok(CallerIdentity { user_id, role }))
    }
}

/// Caller with the admin role
#[derive(Debug, Clone)]
pub struct AdminCaller {
    pub identity: CallerIdentity,
}

impl FromRequest for AdminCaller {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let identity = match CallerIdentity::from_request(req, payload).into_inner() {
            Ok(identity) => identity,
            Err(e) => return ready(Err(e)),
        };

        if !identity.is_admin() {
            warn!(
                user_id = %identity.user_id,
                role = %identity.role,
                "Caller attempted admin access without privileges"
            );
            return ready(Err(actix_web::error::ErrorForbidden(AppError::Forbidden)));
        }

        ready(Ok(AdminCaller { identity }))
    }
}
