// principal.rs
// Request principal extractor. Authentication lives upstream; it attaches
// the caller as `x-user-id` / `x-user-role` headers and this extractor only
// reads them back.

use std::str::FromStr;

use axum::{extract::FromRequestParts, http::request::Parts};
use mongodb::bson::oid::ObjectId;

use crate::error::AppError;
use crate::models::UserRole;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub id: ObjectId,
    pub role: UserRole,
}

impl Principal {
    /// Dashboards are role-gated: admins pass everywhere, everyone else only
    /// where their role is listed.
    pub fn require_role(&self, allowed: &[UserRole]) -> Result<(), AppError> {
        if self.role.is_admin() || allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .ok_or(AppError::Unauthorized)
        };
        let id = ObjectId::from_str(header(USER_ID_HEADER)?).map_err(|_| AppError::Unauthorized)?;
        let role = UserRole::parse(header(USER_ROLE_HEADER)?).ok_or(AppError::Unauthorized)?;
        Ok(Principal { id, role })
    }
}
