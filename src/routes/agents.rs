use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::repository::ledger_store;
use crate::schemas::{validate_input, CreateAgentInput, IdPath, UpdateAgentInput};
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/agents", axum::routing::get(list_agents).post(create_agent))
        .route(
            "/agents/{id}",
            axum::routing::get(get_agent)
                .put(update_agent)
                .delete(delete_agent),
        )
}

async fn list_agents(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    let agents = ledger_store::list_agents(pool).await?;
    let properties = ledger_store::list_properties(pool).await?;

    let mut property_count: HashMap<Uuid, i64> = HashMap::new();
    let mut rent_value: HashMap<Uuid, f64> = HashMap::new();
    for property in &properties {
        let Some(agent_id) = property.agent_id else {
            continue;
        };
        *property_count.entry(agent_id).or_insert(0) += 1;
        *rent_value.entry(agent_id).or_insert(0.0) += property.rent_amount;
    }

    let rows: Vec<Value> = agents
        .iter()
        .map(|agent| {
            let mut row = serde_json::to_value(agent).unwrap_or(Value::Null);
            if let Some(object) = row.as_object_mut() {
                object.insert(
                    "property_count".to_string(),
                    json!(property_count.get(&agent.id).copied().unwrap_or(0)),
                );
                object.insert(
                    "total_rent_value".to_string(),
                    json!(rent_value.get(&agent.id).copied().unwrap_or(0.0)),
                );
            }
            row
        })
        .collect();

    Ok(Json(json!({ "data": rows })))
}

async fn get_agent(
    State(state): State<AppState>,
    Path(path): Path<IdPath>,
) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    let agent = ledger_store::get_agent(pool, path.id).await?;
    Ok(Json(serde_json::to_value(agent).unwrap_or(Value::Null)))
}

async fn create_agent(
    State(state): State<AppState>,
    Json(payload): Json<CreateAgentInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let pool = state.pool()?;
    let created = ledger_store::insert_agent(pool, &payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn update_agent(
    State(state): State<AppState>,
    Path(path): Path<IdPath>,
    Json(payload): Json<UpdateAgentInput>,
) -> AppResult<Json<Value>> {
    validate_input(&payload)?;
    let pool = state.pool()?;
    let updated = ledger_store::update_agent(pool, path.id, &payload).await?;
    Ok(Json(serde_json::to_value(updated).unwrap_or(Value::Null)))
}

async fn delete_agent(
    State(state): State<AppState>,
    Path(path): Path<IdPath>,
) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    ledger_store::delete_agent(pool, path.id).await?;
    Ok(Json(json!({ "message": "Agent deleted." })))
}
