use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::period::{PaySubPeriod, PeriodSelector};

/// Query parameters for the reconciled payment listing.
#[derive(Debug, Deserialize, Validate)]
pub struct PaymentRecordsQuery {
    #[validate(range(min = 1, max = 12))]
    pub month: i32,
    #[validate(range(min = 2000, max = 2200))]
    pub year: i32,
    /// P1, P2 or FULL; omitted means FULL on the session path and the
    /// link's bound period on the token path.
    pub period: Option<String>,
    pub token: Option<String>,
}

impl PaymentRecordsQuery {
    pub fn selector(&self) -> AppResult<Option<PeriodSelector>> {
        self.period.as_deref().map(PeriodSelector::parse).transpose()
    }
}

/// Body for the mark-paid / mark-pending mutations.
#[derive(Debug, Deserialize, Validate)]
pub struct MarkPaymentRequest {
    pub user_id: Uuid,
    pub period: PaySubPeriod,
    #[validate(range(min = 1, max = 12))]
    pub month: i32,
    #[validate(range(min = 2000, max = 2200))]
    pub year: i32,
    /// Display name stamped into `paid_by`. Ignored on the token path.
    #[validate(length(min = 1, max = 128))]
    pub actor: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSharedLinkRequest {
    #[validate(range(min = 1, max = 12))]
    pub month: i32,
    #[validate(range(min = 2000, max = 2200))]
    pub year: i32,
    pub period: PaySubPeriod,
}

#[derive(Debug, Serialize)]
pub struct SharedLinkResponse {
    pub url: String,
    pub token: String,
    pub month: i32,
    pub year: i32,
    pub period: PaySubPeriod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct DeleteSharedLinkResponse {
    pub success: bool,
}

/// Run validator annotations and fold failures into the app taxonomy.
pub fn validated<T: Validate>(value: T) -> AppResult<T> {
    value.validate().map_err(AppError::from)?;
    Ok(value)
}
