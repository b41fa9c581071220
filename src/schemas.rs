use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

pub fn validate_input<T: Validate>(input: &T) -> AppResult<()> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

pub fn clamp_limit_in_range(limit: Option<i64>, min: i64, max: i64) -> i64 {
    limit.unwrap_or(max).clamp(min, max)
}

fn default_true() -> bool {
    true
}
fn default_zero() -> f64 {
    0.0
}
fn default_agent_rate() -> f64 {
    1.0
}

// ── path params ──

#[derive(Debug, Clone, Deserialize)]
pub struct IdPath {
    pub id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantIdPath {
    pub tenant_id: Uuid,
}

// ── properties ──

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePropertyInput {
    pub estate_id: Option<Uuid>,
    pub landlord_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    #[validate(length(min = 1, max = 64))]
    pub house_number: String,
    pub house_type: Option<String>,
    #[validate(range(min = 0.0))]
    pub rent_amount: f64,
    #[serde(default = "default_zero")]
    #[validate(range(min = 0.0))]
    pub deposit_amount: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePropertyInput {
    pub estate_id: Option<Uuid>,
    pub landlord_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    #[validate(length(min = 1, max = 64))]
    pub house_number: String,
    pub house_type: Option<String>,
    #[validate(range(min = 0.0))]
    pub rent_amount: f64,
    #[serde(default = "default_zero")]
    #[validate(range(min = 0.0))]
    pub deposit_amount: f64,
    /// Administrative status override ("Vacant", "Under Maintenance", …).
    pub status: Option<String>,
    pub description: Option<String>,
}

// ── tenants ──

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTenantInput {
    pub property_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub move_in_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateTenantInput {
    pub property_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    pub is_active: bool,
}

// ── agents ──

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAgentInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default = "default_agent_rate")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub commission_rate: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateAgentInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub commission_rate: f64,
}

// ── rent payments ──

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RentPaymentInput {
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    #[validate(range(min = 0.0))]
    pub amount_paid: f64,
    #[serde(default = "default_zero")]
    #[validate(range(min = 0.0))]
    pub penalty_amount: f64,
    #[serde(default = "default_zero")]
    #[validate(range(min = 0.0))]
    pub balance_before: f64,
    pub payment_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    /// Billing month the payment settles, e.g. "2026-06".
    pub rent_month: Option<String>,
    pub payment_method: Option<String>,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
}

// ── queries ──

#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportPeriodQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonthQuery {
    /// "YYYY-MM"; defaults to the current month.
    pub month: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PenaltyQuery {
    pub amount: f64,
    pub days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommissionQuery {
    pub amount: f64,
    #[serde(default)]
    pub is_agent: bool,
}

#[cfg(test)]
mod tests {
    use super::clamp_limit_in_range;

    #[test]
    fn clamps_list_limits() {
        assert_eq!(clamp_limit_in_range(None, 1, 500), 500);
        assert_eq!(clamp_limit_in_range(Some(0), 1, 500), 1);
        assert_eq!(clamp_limit_in_range(Some(250), 1, 500), 250);
        assert_eq!(clamp_limit_in_range(Some(9000), 1, 500), 500);
    }
}
