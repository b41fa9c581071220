use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::repository::ledger_store;
use crate::schemas::{
    clamp_limit_in_range, validate_input, IdPath, ListQuery, RentPaymentInput, TenantIdPath,
};
use crate::services::{ledger, reports};
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/rent-payments",
            axum::routing::get(list_payments).post(create_payment),
        )
        .route(
            "/rent-payments/defaulters",
            axum::routing::get(list_defaulters),
        )
        .route(
            "/rent-payments/tenant/{tenant_id}",
            axum::routing::get(payments_for_tenant),
        )
        .route(
            "/rent-payments/{id}",
            axum::routing::get(get_payment)
                .put(update_payment)
                .delete(delete_payment),
        )
}

async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    let limit = clamp_limit_in_range(query.limit, 1, ledger_store::PAYMENT_CAP);
    let payments = ledger_store::list_payments(pool, limit).await?;
    let tenants = ledger_store::list_tenants(pool, false).await?;
    let properties = ledger_store::list_properties(pool).await?;
    let estates = ledger_store::list_estates(pool).await?;

    let tenant_names: HashMap<Uuid, &str> = tenants
        .iter()
        .map(|tenant| (tenant.id, tenant.name.as_str()))
        .collect();
    let estate_names: HashMap<Uuid, &str> = estates
        .iter()
        .map(|estate| (estate.id, estate.name.as_str()))
        .collect();
    let houses: HashMap<Uuid, (&str, Option<Uuid>)> = properties
        .iter()
        .map(|property| (property.id, (property.house_number.as_str(), property.estate_id)))
        .collect();

    let rows: Vec<Value> = payments
        .iter()
        .map(|payment| {
            let mut row = serde_json::to_value(payment).unwrap_or(Value::Null);
            let (house_number, estate_id) = houses
                .get(&payment.property_id)
                .copied()
                .unwrap_or(("", None));
            let estate_name = estate_id
                .and_then(|id| estate_names.get(&id))
                .copied()
                .unwrap_or("");
            if let Some(object) = row.as_object_mut() {
                object.insert(
                    "tenant_name".to_string(),
                    json!(tenant_names.get(&payment.tenant_id).copied().unwrap_or("")),
                );
                object.insert("house_number".to_string(), json!(house_number));
                object.insert("estate_name".to_string(), json!(estate_name));
                object.insert(
                    "property_details".to_string(),
                    json!(if estate_name.is_empty() {
                        house_number.to_string()
                    } else {
                        format!("{estate_name} - {house_number}")
                    }),
                );
            }
            row
        })
        .collect();

    Ok(Json(json!({ "data": rows })))
}

async fn payments_for_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantIdPath>,
) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    // 404 for unknown tenants rather than an empty list.
    let _ = ledger_store::get_tenant(pool, path.tenant_id).await?;
    let payments = ledger_store::payments_for_tenant(pool, path.tenant_id).await?;
    Ok(Json(json!({ "data": payments })))
}

async fn list_defaulters(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    let tenants = ledger_store::list_tenants(pool, true).await?;
    let properties = ledger_store::list_properties(pool).await?;
    let estates = ledger_store::list_estates(pool).await?;
    let payments = ledger_store::list_payments(pool, ledger_store::PAYMENT_CAP).await?;

    let rows = reports::defaulters(
        &tenants,
        &properties,
        &estates,
        &payments,
        Utc::now().date_naive(),
        state.config.defaulter_overdue_days,
    );
    Ok(Json(json!({ "data": rows })))
}

async fn get_payment(
    State(state): State<AppState>,
    Path(path): Path<IdPath>,
) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    let payment = ledger_store::get_payment(pool, path.id).await?;
    Ok(Json(serde_json::to_value(payment).unwrap_or(Value::Null)))
}

async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<RentPaymentInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let pool = state.pool()?;
    let created = ledger::record_payment(pool, &payload).await?;
    tracing::info!(
        payment_id = %created.id,
        tenant_id = %created.tenant_id,
        amount_paid = created.amount_paid,
        balance_after = created.balance_after,
        "Payment recorded"
    );
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn update_payment(
    State(state): State<AppState>,
    Path(path): Path<IdPath>,
    Json(payload): Json<RentPaymentInput>,
) -> AppResult<Json<Value>> {
    validate_input(&payload)?;
    let pool = state.pool()?;
    let updated = ledger::revise_payment(pool, path.id, &payload).await?;
    Ok(Json(serde_json::to_value(updated).unwrap_or(Value::Null)))
}

async fn delete_payment(
    State(state): State<AppState>,
    Path(path): Path<IdPath>,
) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    ledger::remove_payment(pool, path.id).await?;
    Ok(Json(json!({ "message": "Payment deleted." })))
}
