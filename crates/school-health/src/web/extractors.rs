//! Request extractors
//!
//! Identity arrives as headers set by the upstream authentication layer.
//! They are trusted as-is; this module only parses them.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::errors::AppError;

pub const PROFESSIONAL_ID_HEADER: &str = "x-profissional-id";
pub const HEALTH_UNIT_ID_HEADER: &str = "x-usf-id";
pub const MANAGER_HEADER: &str = "x-is-gestor";

/// Health professional making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub professional_id: i64,
    /// Family health unit the professional belongs to
    pub health_unit_id: Option<i64>,
    pub is_manager: bool,
}

impl AuthenticatedUser {
    /// Only managers may change enrollment data
    pub fn require_manager(&self, action: &str, resource: &str) -> Result<(), AppError> {
        if self.is_manager {
            Ok(())
        } else {
            Err(AppError::permission_denied(action, resource))
        }
    }

    fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let professional_id =
            header_i64(headers, PROFESSIONAL_ID_HEADER).ok_or(AppError::Unauthorized)?;
        let health_unit_id = header_i64(headers, HEALTH_UNIT_ID_HEADER);
        let is_manager = header_str(headers, MANAGER_HEADER)
            .map(|value| value.eq_ignore_ascii_case("true") || value == "1")
            .unwrap_or(false);

        Ok(Self {
            professional_id,
            health_unit_id,
            is_manager,
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    header_str(headers, name).and_then(|value| value.parse().ok())
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}

/// Query parameters for the progress event stream
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProgressEventQuery {
    /// Only stream events of this import run
    pub import_id: Option<Uuid>,
}
