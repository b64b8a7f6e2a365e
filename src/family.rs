use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::shared::{AppError, AppState};

/// Header carrying the tenant a request operates on
pub const FAMILY_HEADER: &str = "x-family-id";

/// Tenant scope threaded through every child, card and stamp operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FamilyId(pub i64);

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolves the family from the `x-family-id` header, falling back to the
/// configured default when the header is absent
#[async_trait]
impl FromRequestParts<AppState> for FamilyId {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(FAMILY_HEADER) else {
            return Ok(FamilyId(state.config.default_family_id));
        };

        header
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(FamilyId)
            .ok_or_else(|| {
                warn!("Rejecting request with malformed family header");
                AppError::Validation(format!("{FAMILY_HEADER} must be a positive integer"))
            })
    }
}
