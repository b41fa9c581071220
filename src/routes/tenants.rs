use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::repository::ledger_store;
use crate::schemas::{validate_input, CreateTenantInput, IdPath, UpdateTenantInput};
use crate::services::occupancy;
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/tenants",
            axum::routing::get(list_tenants).post(create_tenant),
        )
        .route("/tenants/active", axum::routing::get(list_active_tenants))
        .route(
            "/tenants/{id}",
            axum::routing::get(get_tenant)
                .put(update_tenant)
                .delete(delete_tenant),
        )
}

async fn list_tenants(State(state): State<AppState>) -> AppResult<Json<Value>> {
    tenant_listing(&state, false).await
}

async fn list_active_tenants(State(state): State<AppState>) -> AppResult<Json<Value>> {
    tenant_listing(&state, true).await
}

async fn tenant_listing(state: &AppState, only_active: bool) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    let tenants = ledger_store::list_tenants(pool, only_active).await?;
    let properties = ledger_store::list_properties(pool).await?;
    let estates = ledger_store::list_estates(pool).await?;

    let estate_names: HashMap<Uuid, &str> = estates
        .iter()
        .map(|estate| (estate.id, estate.name.as_str()))
        .collect();
    let property_by_id: HashMap<Uuid, _> = properties
        .iter()
        .map(|property| (property.id, property))
        .collect();

    let rows: Vec<Value> = tenants
        .iter()
        .map(|tenant| {
            let mut row = serde_json::to_value(tenant).unwrap_or(Value::Null);
            if let Some(object) = row.as_object_mut() {
                if let Some(property) = tenant
                    .property_id
                    .and_then(|property_id| property_by_id.get(&property_id))
                {
                    let estate_name = property
                        .estate_id
                        .and_then(|estate_id| estate_names.get(&estate_id))
                        .copied()
                        .unwrap_or("");
                    object.insert("house_number".to_string(), json!(property.house_number));
                    object.insert("house_type".to_string(), json!(property.house_type));
                    object.insert("rent_amount".to_string(), json!(property.rent_amount));
                    object.insert("estate_name".to_string(), json!(estate_name));
                }
            }
            row
        })
        .collect();

    Ok(Json(json!({ "data": rows })))
}

async fn get_tenant(
    State(state): State<AppState>,
    Path(path): Path<IdPath>,
) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    let tenant = ledger_store::get_tenant(pool, path.id).await?;
    let payments = ledger_store::payments_for_tenant(pool, path.id).await?;

    let mut row = serde_json::to_value(&tenant).unwrap_or(Value::Null);
    if let Some(object) = row.as_object_mut() {
        object.insert(
            "payments".to_string(),
            serde_json::to_value(&payments).unwrap_or(Value::Null),
        );
    }
    Ok(Json(row))
}

/// Create a tenant. An active tenancy claims its property (Vacant →
/// Occupied) in the same transaction; a non-Vacant property rejects the
/// whole request and nothing is written.
async fn create_tenant(
    State(state): State<AppState>,
    Json(payload): Json<CreateTenantInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let pool = state.pool()?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|error| AppError::Internal(format!("txn begin: {error}")))?;

    if payload.is_active {
        occupancy::claim_property(&mut tx, payload.property_id).await?;
    } else if !ledger_store::property_exists(&mut tx, payload.property_id).await? {
        return Err(AppError::NotFound("Property not found.".to_string()));
    }
    let created = ledger_store::insert_tenant(&mut tx, &payload).await?;

    tx.commit()
        .await
        .map_err(|error| AppError::Internal(format!("txn commit: {error}")))?;

    tracing::info!(tenant_id = %created.id, property_id = ?created.property_id, "Tenant created");
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

/// Update a tenant. Flipping `is_active` drives the occupancy machine:
/// deactivation releases the property, reactivation re-validates that the
/// target property is still Vacant before claiming it.
async fn update_tenant(
    State(state): State<AppState>,
    Path(path): Path<IdPath>,
    Json(payload): Json<UpdateTenantInput>,
) -> AppResult<Json<Value>> {
    validate_input(&payload)?;
    let pool = state.pool()?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|error| AppError::Internal(format!("txn begin: {error}")))?;

    let current = ledger_store::lock_tenant(&mut tx, path.id).await?;

    if current.is_active && !payload.is_active {
        if let Some(property_id) = current.property_id {
            occupancy::release_property(&mut tx, property_id).await?;
        }
    } else if !current.is_active && payload.is_active {
        let property_id = payload
            .property_id
            .or(current.property_id)
            .ok_or_else(|| {
                AppError::InvalidState("Tenant has no property to occupy.".to_string())
            })?;
        occupancy::claim_property(&mut tx, property_id).await?;
    }

    let updated = ledger_store::update_tenant(&mut tx, path.id, &payload).await?;

    tx.commit()
        .await
        .map_err(|error| AppError::Internal(format!("txn commit: {error}")))?;

    Ok(Json(serde_json::to_value(updated).unwrap_or(Value::Null)))
}

/// Delete a tenant, releasing their property back to Vacant.
async fn delete_tenant(
    State(state): State<AppState>,
    Path(path): Path<IdPath>,
) -> AppResult<Json<Value>> {
    let pool = state.pool()?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|error| AppError::Internal(format!("txn begin: {error}")))?;

    let current = ledger_store::lock_tenant(&mut tx, path.id).await?;
    if current.is_active {
        if let Some(property_id) = current.property_id {
            occupancy::release_property(&mut tx, property_id).await?;
        }
    }
    ledger_store::delete_tenant(&mut tx, path.id).await?;

    tx.commit()
        .await
        .map_err(|error| AppError::Internal(format!("txn commit: {error}")))?;

    Ok(Json(json!({ "message": "Tenant deleted." })))
}
