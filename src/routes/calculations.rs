use axum::extract::Query;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::schemas::{CommissionQuery, PenaltyQuery};
use crate::services::finance;
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/utils/calculate-penalty",
            axum::routing::get(calculate_penalty),
        )
        .route(
            "/utils/calculate-commission",
            axum::routing::get(calculate_commission),
        )
}

async fn calculate_penalty(Query(query): Query<PenaltyQuery>) -> AppResult<Json<Value>> {
    let penalty = finance::late_payment_penalty(query.amount, query.days)?;
    Ok(Json(json!({ "penalty": finance::round2(penalty) })))
}

async fn calculate_commission(Query(query): Query<CommissionQuery>) -> AppResult<Json<Value>> {
    let commission = finance::commission(query.amount, query.is_agent)?;
    Ok(Json(json!({ "commission": finance::round2(commission) })))
}
