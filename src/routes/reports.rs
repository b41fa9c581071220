use axum::extract::{Query, State};
use axum::Json;
use chrono::{Datelike, NaiveDate, Utc};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::repository::ledger_store::{self, PaymentDateField};
use crate::schemas::{MonthQuery, ReportPeriodQuery};
use crate::services::reports;
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/reports/rent-collection",
            axum::routing::get(rent_collection_report),
        )
        .route(
            "/reports/agent-earnings",
            axum::routing::get(agent_earnings_report),
        )
        .route("/reports/defaulters", axum::routing::get(defaulters_report))
        .route(
            "/reports/financial-summary",
            axum::routing::get(financial_summary_report),
        )
        .route(
            "/reports/revenue-breakdown",
            axum::routing::get(revenue_breakdown_report),
        )
}

async fn rent_collection_report(
    State(state): State<AppState>,
    Query(query): Query<ReportPeriodQuery>,
) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    let today = Utc::now().date_naive();
    let (start, end) = period_or_current_month(&query, today)?;

    let payments = ledger_store::list_payments_between(pool, PaymentDateField::Due, start, end).await?;
    let tenants = ledger_store::list_tenants(pool, false).await?;
    let properties = ledger_store::list_properties(pool).await?;
    let estates = ledger_store::list_estates(pool).await?;

    let rows = reports::rent_collection_rows(&payments, &tenants, &properties, &estates, today);
    Ok(Json(json!({
        "start_date": start,
        "end_date": end,
        "data": rows,
    })))
}

async fn agent_earnings_report(
    State(state): State<AppState>,
    Query(query): Query<ReportPeriodQuery>,
) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    let today = Utc::now().date_naive();
    let (start, end) = period_or_current_month(&query, today)?;

    let payments =
        ledger_store::list_payments_between(pool, PaymentDateField::Payment, start, end).await?;
    let agents = ledger_store::list_agents(pool).await?;
    let properties = ledger_store::list_properties(pool).await?;

    let rows = reports::agent_earnings(&agents, &properties, &payments);
    Ok(Json(json!({
        "start_date": start,
        "end_date": end,
        "data": rows,
    })))
}

async fn defaulters_report(State(state): State<AppState>) -> AppResult<Json<Value>> {
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

async fn financial_summary_report(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    let today = Utc::now().date_naive();
    let month = query
        .month
        .unwrap_or_else(|| format!("{:04}-{:02}", today.year(), today.month()));
    let (start, end) = reports::month_bounds(&month)?;

    let properties = ledger_store::list_properties(pool).await?;
    let tenants = ledger_store::list_tenants(pool, false).await?;
    let payments =
        ledger_store::list_payments_between(pool, PaymentDateField::Payment, start, end).await?;

    let summary = reports::financial_summary(&properties, &tenants, &payments, start, end);
    let mut body = serde_json::to_value(summary).unwrap_or(Value::Null);
    if let Some(object) = body.as_object_mut() {
        object.insert("month".to_string(), json!(month));
    }
    Ok(Json(body))
}

async fn revenue_breakdown_report(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let pool = state.pool()?;
    let today = Utc::now().date_naive();
    let cutoff = today
        .checked_sub_months(chrono::Months::new(1))
        .unwrap_or(today);

    let payments =
        ledger_store::list_payments_between(pool, PaymentDateField::Payment, cutoff, today).await?;
    let slices = reports::revenue_breakdown(&payments, today);
    Ok(Json(json!({ "data": slices })))
}

fn period_or_current_month(
    query: &ReportPeriodQuery,
    today: NaiveDate,
) -> AppResult<(NaiveDate, NaiveDate)> {
    match (query.start_date, query.end_date) {
        (Some(start), Some(end)) if start <= end => Ok((start, end)),
        (Some(start), Some(end)) => Err(crate::error::AppError::InvalidArgument(format!(
            "start_date {start} is after end_date {end}."
        ))),
        _ => reports::month_bounds(&format!("{:04}-{:02}", today.year(), today.month())),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::period_or_current_month;
    use crate::schemas::ReportPeriodQuery;

    #[test]
    fn defaults_to_the_current_month() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        let query = ReportPeriodQuery {
            start_date: None,
            end_date: None,
        };
        let (start, end) = period_or_current_month(&query, today).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 6, 30).unwrap());
    }

    #[test]
    fn rejects_inverted_ranges() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        let query = ReportPeriodQuery {
            start_date: NaiveDate::from_ymd_opt(2026, 6, 30),
            end_date: NaiveDate::from_ymd_opt(2026, 6, 1),
        };
        assert!(period_or_current_month(&query, today).is_err());
    }
}
