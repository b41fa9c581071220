use chrono::NaiveDate;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::domain::{
    Agent, Estate, Landlord, NewRentPayment, Property, PropertyStatus, RentPayment, Tenant,
};
use crate::error::{AppError, AppResult};
use crate::schemas::{
    CreateAgentInput, CreatePropertyInput, CreateTenantInput, UpdateAgentInput,
    UpdatePropertyInput, UpdateTenantInput,
};

// Upper bounds on list fetches; reports aggregate in-process, so the caps
// only exist to keep a runaway table from exhausting memory.
const DIRECTORY_CAP: i64 = 5_000;
pub const PAYMENT_CAP: i64 = 20_000;

/// Which date column a payment range filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentDateField {
    Payment,
    Due,
}

impl PaymentDateField {
    pub fn column(self) -> &'static str {
        match self {
            Self::Payment => "payment_date",
            Self::Due => "due_date",
        }
    }
}

// ── properties ──

pub async fn list_properties(pool: &PgPool) -> AppResult<Vec<Property>> {
    let rows = sqlx::query(
        "SELECT row_to_json(t) AS row FROM properties t ORDER BY t.created_at DESC LIMIT $1",
    )
    .bind(DIRECTORY_CAP)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;
    read_rows(rows).iter().map(Property::from_row).collect()
}

pub async fn list_vacant_properties(pool: &PgPool) -> AppResult<Vec<Property>> {
    let rows = sqlx::query(
        "SELECT row_to_json(t) AS row FROM properties t
         WHERE t.status = 'Vacant'
         ORDER BY t.created_at DESC LIMIT $1",
    )
    .bind(DIRECTORY_CAP)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;
    read_rows(rows).iter().map(Property::from_row).collect()
}

pub async fn get_property(pool: &PgPool, property_id: Uuid) -> AppResult<Property> {
    let row = sqlx::query("SELECT row_to_json(t) AS row FROM properties t WHERE t.id = $1")
        .bind(property_id)
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;
    let value = read_row(row).ok_or_else(|| AppError::NotFound("Property not found.".to_string()))?;
    Property::from_row(&value)
}

pub async fn insert_property(pool: &PgPool, input: &CreatePropertyInput) -> AppResult<Property> {
    let row = sqlx::query(
        "INSERT INTO properties (
            estate_id, landlord_id, agent_id, house_number, house_type,
            rent_amount, deposit_amount, status, description
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING row_to_json(properties.*) AS row",
    )
    .bind(input.estate_id)
    .bind(input.landlord_id)
    .bind(input.agent_id)
    .bind(&input.house_number)
    .bind(&input.house_type)
    .bind(input.rent_amount)
    .bind(input.deposit_amount)
    .bind(PropertyStatus::Vacant.as_str())
    .bind(&input.description)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)?;
    let value = read_row(row)
        .ok_or_else(|| AppError::Internal("Could not create property record.".to_string()))?;
    Property::from_row(&value)
}

pub async fn update_property(
    pool: &PgPool,
    property_id: Uuid,
    input: &UpdatePropertyInput,
    status: PropertyStatus,
) -> AppResult<Property> {
    let row = sqlx::query(
        "UPDATE properties SET
            estate_id = $2, landlord_id = $3, agent_id = $4, house_number = $5,
            house_type = $6, rent_amount = $7, deposit_amount = $8, status = $9,
            description = $10
         WHERE id = $1
         RETURNING row_to_json(properties.*) AS row",
    )
    .bind(property_id)
    .bind(input.estate_id)
    .bind(input.landlord_id)
    .bind(input.agent_id)
    .bind(&input.house_number)
    .bind(&input.house_type)
    .bind(input.rent_amount)
    .bind(input.deposit_amount)
    .bind(status.as_str())
    .bind(&input.description)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)?;
    let value = read_row(row).ok_or_else(|| AppError::NotFound("Property not found.".to_string()))?;
    Property::from_row(&value)
}

pub async fn delete_property(pool: &PgPool, property_id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM properties WHERE id = $1")
        .bind(property_id)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Property not found.".to_string()));
    }
    Ok(())
}

/// Current status with a row-level lock held for the rest of the
/// transaction, so a concurrent claim cannot slip between check and set.
pub async fn lock_property_status(
    conn: &mut PgConnection,
    property_id: Uuid,
) -> AppResult<PropertyStatus> {
    let row = sqlx::query("SELECT status FROM properties WHERE id = $1 FOR UPDATE")
        .bind(property_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| AppError::NotFound("Property not found.".to_string()))?;
    let status: String = row
        .try_get("status")
        .map_err(|_| AppError::Internal("Malformed properties row: bad 'status'.".to_string()))?;
    PropertyStatus::parse(&status)
        .map_err(|_| AppError::Internal(format!("Unexpected property status '{status}' in store.")))
}

pub async fn set_property_status(
    conn: &mut PgConnection,
    property_id: Uuid,
    status: PropertyStatus,
) -> AppResult<()> {
    sqlx::query("UPDATE properties SET status = $2 WHERE id = $1")
        .bind(property_id)
        .bind(status.as_str())
        .execute(&mut *conn)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

pub async fn count_active_tenants_for_property(
    pool: &PgPool,
    property_id: Uuid,
) -> AppResult<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*)::bigint AS total FROM tenants
         WHERE property_id = $1 AND is_active",
    )
    .bind(property_id)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)?;
    Ok(row.try_get::<i64, _>("total").unwrap_or(0))
}

// ── tenants ──

pub async fn list_tenants(pool: &PgPool, only_active: bool) -> AppResult<Vec<Tenant>> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT row_to_json(t) AS row FROM tenants t WHERE 1=1",
    );
    if only_active {
        query.push(" AND t.is_active");
    }
    query
        .push(" ORDER BY t.created_at DESC LIMIT ")
        .push_bind(DIRECTORY_CAP);
    let rows = query.build().fetch_all(pool).await.map_err(map_db_error)?;
    read_rows(rows).iter().map(Tenant::from_row).collect()
}

pub async fn get_tenant(pool: &PgPool, tenant_id: Uuid) -> AppResult<Tenant> {
    let row = sqlx::query("SELECT row_to_json(t) AS row FROM tenants t WHERE t.id = $1")
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;
    let value = read_row(row).ok_or_else(|| AppError::NotFound("Tenant not found.".to_string()))?;
    Tenant::from_row(&value)
}

/// Same as `get_tenant` but inside a transaction, locking the row so
/// concurrent occupancy transitions serialize.
pub async fn lock_tenant(conn: &mut PgConnection, tenant_id: Uuid) -> AppResult<Tenant> {
    let row = sqlx::query("SELECT row_to_json(t) AS row FROM tenants t WHERE t.id = $1 FOR UPDATE OF t")
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?;
    let value = read_row(row).ok_or_else(|| AppError::NotFound("Tenant not found.".to_string()))?;
    Tenant::from_row(&value)
}

pub async fn insert_tenant(
    conn: &mut PgConnection,
    input: &CreateTenantInput,
) -> AppResult<Tenant> {
    let row = sqlx::query(
        "INSERT INTO tenants (property_id, name, phone, email, move_in_date, is_active)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING row_to_json(tenants.*) AS row",
    )
    .bind(input.property_id)
    .bind(&input.name)
    .bind(&input.phone)
    .bind(&input.email)
    .bind(input.move_in_date)
    .bind(input.is_active)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_db_error)?;
    let value = read_row(row)
        .ok_or_else(|| AppError::Internal("Could not create tenant record.".to_string()))?;
    Tenant::from_row(&value)
}

pub async fn update_tenant(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    input: &UpdateTenantInput,
) -> AppResult<Tenant> {
    let row = sqlx::query(
        "UPDATE tenants SET
            property_id = $2, name = $3, phone = $4, email = $5,
            move_in_date = $6, move_out_date = $7, is_active = $8
         WHERE id = $1
         RETURNING row_to_json(tenants.*) AS row",
    )
    .bind(tenant_id)
    .bind(input.property_id)
    .bind(&input.name)
    .bind(&input.phone)
    .bind(&input.email)
    .bind(input.move_in_date)
    .bind(input.move_out_date)
    .bind(input.is_active)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_db_error)?;
    let value = read_row(row).ok_or_else(|| AppError::NotFound("Tenant not found.".to_string()))?;
    Tenant::from_row(&value)
}

pub async fn delete_tenant(conn: &mut PgConnection, tenant_id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
        .bind(tenant_id)
        .execute(&mut *conn)
        .await
        .map_err(map_db_error)?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Tenant not found.".to_string()));
    }
    Ok(())
}

pub async fn tenant_exists(conn: &mut PgConnection, tenant_id: Uuid) -> AppResult<bool> {
    let row = sqlx::query("SELECT 1 AS one FROM tenants WHERE id = $1")
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?;
    Ok(row.is_some())
}

pub async fn property_exists(conn: &mut PgConnection, property_id: Uuid) -> AppResult<bool> {
    let row = sqlx::query("SELECT 1 AS one FROM properties WHERE id = $1")
        .bind(property_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?;
    Ok(row.is_some())
}

// ── rent payments ──

pub async fn list_payments(pool: &PgPool, limit: i64) -> AppResult<Vec<RentPayment>> {
    let rows = sqlx::query(
        "SELECT row_to_json(t) AS row FROM rent_payments t
         ORDER BY t.payment_date DESC LIMIT $1",
    )
    .bind(limit.clamp(1, PAYMENT_CAP))
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;
    read_rows(rows).iter().map(RentPayment::from_row).collect()
}

pub async fn list_payments_between(
    pool: &PgPool,
    field: PaymentDateField,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<RentPayment>> {
    let mut query =
        QueryBuilder::<Postgres>::new("SELECT row_to_json(t) AS row FROM rent_payments t WHERE t.");
    query.push(field.column());
    query.push(" >= ").push_bind(start);
    query.push(" AND t.").push(field.column());
    query.push(" <= ").push_bind(end);
    query
        .push(" ORDER BY t.payment_date DESC LIMIT ")
        .push_bind(PAYMENT_CAP);
    let rows = query.build().fetch_all(pool).await.map_err(map_db_error)?;
    read_rows(rows).iter().map(RentPayment::from_row).collect()
}

pub async fn payments_for_tenant(pool: &PgPool, tenant_id: Uuid) -> AppResult<Vec<RentPayment>> {
    let rows = sqlx::query(
        "SELECT row_to_json(t) AS row FROM rent_payments t
         WHERE t.tenant_id = $1
         ORDER BY t.payment_date DESC LIMIT $2",
    )
    .bind(tenant_id)
    .bind(PAYMENT_CAP)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;
    read_rows(rows).iter().map(RentPayment::from_row).collect()
}

pub async fn get_payment(pool: &PgPool, payment_id: Uuid) -> AppResult<RentPayment> {
    let row = sqlx::query("SELECT row_to_json(t) AS row FROM rent_payments t WHERE t.id = $1")
        .bind(payment_id)
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;
    let value = read_row(row).ok_or_else(|| AppError::NotFound("Payment not found.".to_string()))?;
    RentPayment::from_row(&value)
}

pub async fn insert_payment(
    conn: &mut PgConnection,
    payment: &NewRentPayment,
) -> AppResult<RentPayment> {
    let row = sqlx::query(
        "INSERT INTO rent_payments (
            tenant_id, property_id, amount_paid, penalty_amount, balance_before,
            balance_after, payment_date, due_date, rent_month, payment_method,
            receipt_number, notes
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING row_to_json(rent_payments.*) AS row",
    )
    .bind(payment.tenant_id)
    .bind(payment.property_id)
    .bind(payment.amount_paid)
    .bind(payment.penalty_amount)
    .bind(payment.balance_before)
    .bind(payment.balance_after)
    .bind(payment.payment_date)
    .bind(payment.due_date)
    .bind(&payment.rent_month)
    .bind(&payment.payment_method)
    .bind(&payment.receipt_number)
    .bind(&payment.notes)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_db_error)?;
    let value = read_row(row)
        .ok_or_else(|| AppError::Internal("Could not create payment record.".to_string()))?;
    RentPayment::from_row(&value)
}

pub async fn update_payment(
    conn: &mut PgConnection,
    payment_id: Uuid,
    payment: &NewRentPayment,
) -> AppResult<RentPayment> {
    let row = sqlx::query(
        "UPDATE rent_payments SET
            tenant_id = $2, property_id = $3, amount_paid = $4, penalty_amount = $5,
            balance_before = $6, balance_after = $7, payment_date = $8, due_date = $9,
            rent_month = $10, payment_method = $11, receipt_number = $12, notes = $13
         WHERE id = $1
         RETURNING row_to_json(rent_payments.*) AS row",
    )
    .bind(payment_id)
    .bind(payment.tenant_id)
    .bind(payment.property_id)
    .bind(payment.amount_paid)
    .bind(payment.penalty_amount)
    .bind(payment.balance_before)
    .bind(payment.balance_after)
    .bind(payment.payment_date)
    .bind(payment.due_date)
    .bind(&payment.rent_month)
    .bind(&payment.payment_method)
    .bind(&payment.receipt_number)
    .bind(&payment.notes)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_db_error)?;
    let value = read_row(row).ok_or_else(|| AppError::NotFound("Payment not found.".to_string()))?;
    RentPayment::from_row(&value)
}

pub async fn delete_payment(pool: &PgPool, payment_id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM rent_payments WHERE id = $1")
        .bind(payment_id)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Payment not found.".to_string()));
    }
    Ok(())
}

// ── agents / landlords / estates ──

pub async fn list_agents(pool: &PgPool) -> AppResult<Vec<Agent>> {
    let rows = sqlx::query(
        "SELECT row_to_json(t) AS row FROM agents t ORDER BY t.created_at DESC LIMIT $1",
    )
    .bind(DIRECTORY_CAP)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;
    read_rows(rows).iter().map(Agent::from_row).collect()
}

pub async fn get_agent(pool: &PgPool, agent_id: Uuid) -> AppResult<Agent> {
    let row = sqlx::query("SELECT row_to_json(t) AS row FROM agents t WHERE t.id = $1")
        .bind(agent_id)
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;
    let value = read_row(row).ok_or_else(|| AppError::NotFound("Agent not found.".to_string()))?;
    Agent::from_row(&value)
}

pub async fn insert_agent(pool: &PgPool, input: &CreateAgentInput) -> AppResult<Agent> {
    let row = sqlx::query(
        "INSERT INTO agents (name, phone, email, commission_rate)
         VALUES ($1, $2, $3, $4)
         RETURNING row_to_json(agents.*) AS row",
    )
    .bind(&input.name)
    .bind(&input.phone)
    .bind(&input.email)
    .bind(input.commission_rate)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)?;
    let value =
        read_row(row).ok_or_else(|| AppError::Internal("Could not create agent record.".to_string()))?;
    Agent::from_row(&value)
}

pub async fn update_agent(
    pool: &PgPool,
    agent_id: Uuid,
    input: &UpdateAgentInput,
) -> AppResult<Agent> {
    let row = sqlx::query(
        "UPDATE agents SET name = $2, phone = $3, email = $4, commission_rate = $5
         WHERE id = $1
         RETURNING row_to_json(agents.*) AS row",
    )
    .bind(agent_id)
    .bind(&input.name)
    .bind(&input.phone)
    .bind(&input.email)
    .bind(input.commission_rate)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)?;
    let value = read_row(row).ok_or_else(|| AppError::NotFound("Agent not found.".to_string()))?;
    Agent::from_row(&value)
}

pub async fn delete_agent(pool: &PgPool, agent_id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM agents WHERE id = $1")
        .bind(agent_id)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Agent not found.".to_string()));
    }
    Ok(())
}

pub async fn list_landlords(pool: &PgPool) -> AppResult<Vec<Landlord>> {
    let rows = sqlx::query(
        "SELECT row_to_json(t) AS row FROM landlords t ORDER BY t.created_at DESC LIMIT $1",
    )
    .bind(DIRECTORY_CAP)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;
    read_rows(rows).iter().map(Landlord::from_row).collect()
}

pub async fn list_estates(pool: &PgPool) -> AppResult<Vec<Estate>> {
    let rows = sqlx::query(
        "SELECT row_to_json(t) AS row FROM estates t ORDER BY t.created_at DESC LIMIT $1",
    )
    .bind(DIRECTORY_CAP)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;
    read_rows(rows).iter().map(Estate::from_row).collect()
}

// ── helpers ──

fn read_rows(rows: Vec<PgRow>) -> Vec<Value> {
    rows.into_iter()
        .filter_map(|row| row.try_get::<Option<Value>, _>("row").ok().flatten())
        .collect()
}

fn read_row(row: Option<PgRow>) -> Option<Value> {
    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
}

fn map_db_error(error: sqlx::Error) -> AppError {
    let message = error.to_string();
    tracing::error!(db_error = %message, "Database query failed");

    let lower = message.to_ascii_lowercase();
    if message.contains("23505") || lower.contains("duplicate key value violates unique constraint")
    {
        return AppError::Conflict("Duplicate value violates a unique constraint.".to_string());
    }
    if message.contains("23503") || lower.contains("violates foreign key constraint") {
        return AppError::NotFound("Referenced record does not exist.".to_string());
    }
    AppError::Internal("Database operation failed.".to_string())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use sqlx::{Postgres, QueryBuilder};

    use super::PaymentDateField;

    #[test]
    fn date_field_columns() {
        assert_eq!(PaymentDateField::Payment.column(), "payment_date");
        assert_eq!(PaymentDateField::Due.column(), "due_date");
    }

    #[test]
    fn range_query_binds_both_bounds() {
        let start = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        let field = PaymentDateField::Due;

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT row_to_json(t) AS row FROM rent_payments t WHERE t.",
        );
        query.push(field.column());
        query.push(" >= ").push_bind(start);
        query.push(" AND t.").push(field.column());
        query.push(" <= ").push_bind(end);
        query.push(" ORDER BY t.payment_date DESC LIMIT ").push_bind(20_000_i64);

        let sql = query.sql();
        assert!(
            sql.contains("t.due_date >= $1 AND t.due_date <= $2"),
            "unexpected SQL: {sql}"
        );
        assert!(sql.contains("LIMIT $3"), "unexpected SQL: {sql}");
    }
}
