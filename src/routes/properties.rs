use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::{Property, PropertyStatus};
use crate::error::{AppError, AppResult};
use crate::repository::ledger_store;
use crate::schemas::{validate_input, CreatePropertyInput, IdPath, UpdatePropertyInput};
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/properties",
            axum::routing::get(list_properties).post(create_property),
        )
        .route(
            "/properties/vacant",
            axum::routing::get(list_vacant_properties),
        )
        .route(
            "/properties/{id}",
            axum::routing::get(get_property)
                .put(update_property)
                .delete(delete_property),
        )
}

async fn list_properties(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    let properties = ledger_store::list_properties(pool).await?;
    let tenants = ledger_store::list_tenants(pool, true).await?;
    let estates = ledger_store::list_estates(pool).await?;
    let agents = ledger_store::list_agents(pool).await?;
    let landlords = ledger_store::list_landlords(pool).await?;

    let estate_names: HashMap<Uuid, &str> = estates
        .iter()
        .map(|estate| (estate.id, estate.name.as_str()))
        .collect();
    let agent_names: HashMap<Uuid, &str> = agents
        .iter()
        .map(|agent| (agent.id, agent.name.as_str()))
        .collect();
    let landlord_names: HashMap<Uuid, &str> = landlords
        .iter()
        .map(|landlord| (landlord.id, landlord.name.as_str()))
        .collect();
    let active_tenant_by_property: HashMap<Uuid, &str> = tenants
        .iter()
        .filter_map(|tenant| {
            tenant
                .property_id
                .map(|property_id| (property_id, tenant.name.as_str()))
        })
        .collect();

    let rows: Vec<Value> = properties
        .iter()
        .map(|property| {
            decorate_property(
                property,
                &estate_names,
                &agent_names,
                &landlord_names,
                active_tenant_by_property.get(&property.id).copied(),
            )
        })
        .collect();

    Ok(Json(json!({ "data": rows })))
}

async fn list_vacant_properties(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    let properties = ledger_store::list_vacant_properties(pool).await?;
    Ok(Json(json!({ "data": properties })))
}

async fn get_property(
    State(state): State<AppState>,
    Path(path): Path<IdPath>,
) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    let property = ledger_store::get_property(pool, path.id).await?;
    let estates = ledger_store::list_estates(pool).await?;
    let agents = ledger_store::list_agents(pool).await?;
    let landlords = ledger_store::list_landlords(pool).await?;

    let estate_names: HashMap<Uuid, &str> = estates
        .iter()
        .map(|estate| (estate.id, estate.name.as_str()))
        .collect();
    let agent_names: HashMap<Uuid, &str> = agents
        .iter()
        .map(|agent| (agent.id, agent.name.as_str()))
        .collect();
    let landlord_names: HashMap<Uuid, &str> = landlords
        .iter()
        .map(|landlord| (landlord.id, landlord.name.as_str()))
        .collect();

    Ok(Json(decorate_property(
        &property,
        &estate_names,
        &agent_names,
        &landlord_names,
        None,
    )))
}

async fn create_property(
    State(state): State<AppState>,
    Json(payload): Json<CreatePropertyInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let pool = state.pool()?;
    // New properties always start Vacant; occupancy only changes through
    // tenant transitions or an explicit administrative update.
    let created = ledger_store::insert_property(pool, &payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn update_property(
    State(state): State<AppState>,
    Path(path): Path<IdPath>,
    Json(payload): Json<UpdatePropertyInput>,
) -> AppResult<Json<Value>> {
    validate_input(&payload)?;
    let pool = state.pool()?;

    let current = ledger_store::get_property(pool, path.id).await?;
    let status = match payload.status.as_deref() {
        Some(raw) => PropertyStatus::parse(raw)?,
        None => current.status,
    };

    let updated = ledger_store::update_property(pool, path.id, &payload, status).await?;
    Ok(Json(serde_json::to_value(updated).unwrap_or(Value::Null)))
}

async fn delete_property(
    State(state): State<AppState>,
    Path(path): Path<IdPath>,
) -> AppResult<Json<Value>> {
    let pool = state.pool()?;

    let active_tenants = ledger_store::count_active_tenants_for_property(pool, path.id).await?;
    if active_tenants > 0 {
        return Err(AppError::InvalidState(
            "Cannot delete a property with active tenants.".to_string(),
        ));
    }
    ledger_store::delete_property(pool, path.id).await?;
    Ok(Json(json!({ "message": "Property deleted." })))
}

fn decorate_property(
    property: &Property,
    estate_names: &HashMap<Uuid, &str>,
    agent_names: &HashMap<Uuid, &str>,
    landlord_names: &HashMap<Uuid, &str>,
    tenant_name: Option<&str>,
) -> Value {
    let mut row = serde_json::to_value(property).unwrap_or(Value::Null);
    if let Some(object) = row.as_object_mut() {
        object.insert(
            "estate_name".to_string(),
            json!(property
                .estate_id
                .and_then(|id| estate_names.get(&id))
                .copied()),
        );
        object.insert(
            "agent_name".to_string(),
            json!(property
                .agent_id
                .and_then(|id| agent_names.get(&id))
                .copied()),
        );
        object.insert(
            "landlord_name".to_string(),
            json!(property
                .landlord_id
                .and_then(|id| landlord_names.get(&id))
                .copied()),
        );
        if let Some(tenant) = tenant_name {
            object.insert("tenant_name".to_string(), json!(tenant));
        }
    }
    row
}
