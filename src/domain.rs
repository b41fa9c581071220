use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Lifecycle of a managed property. Wire format matches the ledger's
/// `properties.status` column ("Under Maintenance" keeps its space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum PropertyStatus {
    Vacant,
    Occupied,
    UnderMaintenance,
    Reserved,
}

impl PropertyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vacant => "Vacant",
            Self::Occupied => "Occupied",
            Self::UnderMaintenance => "Under Maintenance",
            Self::Reserved => "Reserved",
        }
    }

    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "vacant" => Ok(Self::Vacant),
            "occupied" => Ok(Self::Occupied),
            "under maintenance" | "under_maintenance" => Ok(Self::UnderMaintenance),
            "reserved" => Ok(Self::Reserved),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown property status '{other}'."
            ))),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Property {
    pub id: Uuid,
    pub estate_id: Option<Uuid>,
    pub landlord_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub house_number: String,
    pub house_type: Option<String>,
    pub rent_amount: f64,
    pub deposit_amount: f64,
    pub status: PropertyStatus,
    pub description: Option<String>,
}

impl Property {
    pub fn from_row(row: &Value) -> AppResult<Self> {
        Ok(Self {
            id: require_uuid(row, "properties", "id")?,
            estate_id: value_uuid(row, "estate_id"),
            landlord_id: value_uuid(row, "landlord_id"),
            agent_id: value_uuid(row, "agent_id"),
            house_number: require_str(row, "properties", "house_number")?,
            house_type: value_str(row, "house_type"),
            rent_amount: require_f64(row, "properties", "rent_amount")?,
            deposit_amount: value_f64(row, "deposit_amount").unwrap_or(0.0),
            status: PropertyStatus::parse(&require_str(row, "properties", "status")?)
                .map_err(|_| malformed("properties", "status"))?,
            description: value_str(row, "description"),
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Tenant {
    pub id: Uuid,
    pub property_id: Option<Uuid>,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
}

impl Tenant {
    pub fn from_row(row: &Value) -> AppResult<Self> {
        Ok(Self {
            id: require_uuid(row, "tenants", "id")?,
            property_id: value_uuid(row, "property_id"),
            name: require_str(row, "tenants", "name")?,
            phone: value_str(row, "phone"),
            email: value_str(row, "email"),
            is_active: value_bool(row, "is_active").unwrap_or(true),
            move_in_date: value_date(row, "move_in_date"),
            move_out_date: value_date(row, "move_out_date"),
        })
    }

    /// Whether this tenancy overlaps the given period. Used when deriving
    /// expected rent and occupancy for a reporting month.
    pub fn leased_during(&self, period_start: NaiveDate, period_end: NaiveDate) -> bool {
        let Some(move_in) = self.move_in_date else {
            return false;
        };
        move_in <= period_end && self.move_out_date.is_none_or(|out| out >= period_start)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RentPayment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub amount_paid: f64,
    pub penalty_amount: f64,
    pub balance_before: f64,
    pub balance_after: f64,
    pub payment_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub rent_month: Option<String>,
    pub payment_method: Option<String>,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
}

impl RentPayment {
    pub fn from_row(row: &Value) -> AppResult<Self> {
        Ok(Self {
            id: require_uuid(row, "rent_payments", "id")?,
            tenant_id: require_uuid(row, "rent_payments", "tenant_id")?,
            property_id: require_uuid(row, "rent_payments", "property_id")?,
            amount_paid: require_f64(row, "rent_payments", "amount_paid")?,
            penalty_amount: value_f64(row, "penalty_amount").unwrap_or(0.0),
            balance_before: value_f64(row, "balance_before").unwrap_or(0.0),
            balance_after: require_f64(row, "rent_payments", "balance_after")?,
            payment_date: value_date(row, "payment_date")
                .ok_or_else(|| malformed("rent_payments", "payment_date"))?,
            due_date: value_date(row, "due_date"),
            rent_month: value_str(row, "rent_month"),
            payment_method: value_str(row, "payment_method"),
            receipt_number: value_str(row, "receipt_number"),
            notes: value_str(row, "notes"),
        })
    }
}

/// Fully-derived payment row ready to persist. `balance_after` is always
/// computed server-side, never taken from the client.
#[derive(Debug, Clone)]
pub struct NewRentPayment {
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub amount_paid: f64,
    pub penalty_amount: f64,
    pub balance_before: f64,
    pub balance_after: f64,
    pub payment_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub rent_month: Option<String>,
    pub payment_method: Option<String>,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub commission_rate: f64,
}

impl Agent {
    pub fn from_row(row: &Value) -> AppResult<Self> {
        Ok(Self {
            id: require_uuid(row, "agents", "id")?,
            name: require_str(row, "agents", "name")?,
            phone: value_str(row, "phone"),
            email: value_str(row, "email"),
            commission_rate: value_f64(row, "commission_rate").unwrap_or(1.0),
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Landlord {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub commission_rate: f64,
}

impl Landlord {
    pub fn from_row(row: &Value) -> AppResult<Self> {
        Ok(Self {
            id: require_uuid(row, "landlords", "id")?,
            name: require_str(row, "landlords", "name")?,
            phone: value_str(row, "phone"),
            email: value_str(row, "email"),
            commission_rate: value_f64(row, "commission_rate").unwrap_or(5.0),
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Estate {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
}

impl Estate {
    pub fn from_row(row: &Value) -> AppResult<Self> {
        Ok(Self {
            id: require_uuid(row, "estates", "id")?,
            name: require_str(row, "estates", "name")?,
            location: value_str(row, "location"),
        })
    }
}

// ── row parsing helpers ──
//
// Query results arrive as `row_to_json` objects; these helpers are the only
// place raw rows are touched, so the calculation core above never sees an
// untyped map.

pub fn value_str(row: &Value, key: &str) -> Option<String> {
    row.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

pub fn value_f64(row: &Value, key: &str) -> Option<f64> {
    match row.get(key) {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn value_bool(row: &Value, key: &str) -> Option<bool> {
    match row.get(key) {
        Some(Value::Bool(flag)) => Some(*flag),
        Some(Value::Number(number)) => number.as_i64().map(|value| value != 0),
        Some(Value::String(text)) => {
            let lower = text.trim().to_ascii_lowercase();
            Some(lower == "true" || lower == "1")
        }
        _ => None,
    }
}

pub fn value_uuid(row: &Value, key: &str) -> Option<Uuid> {
    row.get(key)
        .and_then(Value::as_str)
        .and_then(|text| Uuid::parse_str(text.trim()).ok())
}

/// Accepts plain dates and timestamp strings (the date part is kept).
pub fn value_date(row: &Value, key: &str) -> Option<NaiveDate> {
    let text = row.get(key).and_then(Value::as_str)?.trim();
    let date_part = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn require_str(row: &Value, table: &str, key: &str) -> AppResult<String> {
    value_str(row, key).ok_or_else(|| malformed(table, key))
}

fn require_f64(row: &Value, table: &str, key: &str) -> AppResult<f64> {
    value_f64(row, key).ok_or_else(|| malformed(table, key))
}

fn require_uuid(row: &Value, table: &str, key: &str) -> AppResult<Uuid> {
    value_uuid(row, key).ok_or_else(|| malformed(table, key))
}

fn malformed(table: &str, key: &str) -> AppError {
    AppError::Internal(format!("Malformed {table} row: bad or missing '{key}'."))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{value_date, value_f64, Property, PropertyStatus, RentPayment, Tenant};

    #[test]
    fn parses_status_wire_strings() {
        assert_eq!(
            PropertyStatus::parse("Under Maintenance").unwrap(),
            PropertyStatus::UnderMaintenance
        );
        assert_eq!(
            PropertyStatus::parse(" vacant ").unwrap(),
            PropertyStatus::Vacant
        );
        assert!(PropertyStatus::parse("Demolished").is_err());
        assert_eq!(PropertyStatus::UnderMaintenance.as_str(), "Under Maintenance");
    }

    #[test]
    fn numbers_may_arrive_as_strings() {
        let row = json!({ "a": 25000.0, "b": "25000.50", "c": "x" });
        assert_eq!(value_f64(&row, "a"), Some(25000.0));
        assert_eq!(value_f64(&row, "b"), Some(25000.50));
        assert_eq!(value_f64(&row, "c"), None);
    }

    #[test]
    fn dates_tolerate_timestamp_suffixes() {
        let row = json!({ "d": "2026-06-01", "t": "2026-06-01T08:30:00+00:00" });
        assert_eq!(value_date(&row, "d").unwrap().to_string(), "2026-06-01");
        assert_eq!(value_date(&row, "t").unwrap().to_string(), "2026-06-01");
    }

    #[test]
    fn parses_a_property_row() {
        let row = json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "house_number": "A4",
            "rent_amount": 25000.0,
            "status": "Vacant"
        });
        let property = Property::from_row(&row).unwrap();
        assert_eq!(property.house_number, "A4");
        assert_eq!(property.status, PropertyStatus::Vacant);
        assert_eq!(property.deposit_amount, 0.0);
        assert!(property.estate_id.is_none());
    }

    #[test]
    fn rejects_payment_rows_missing_amounts() {
        let row = json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "tenant_id": "550e8400-e29b-41d4-a716-446655440001",
            "property_id": "550e8400-e29b-41d4-a716-446655440002",
            "payment_date": "2026-06-01"
        });
        assert!(RentPayment::from_row(&row).is_err());
    }

    #[test]
    fn tenancy_period_overlap() {
        let row = json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "name": "Grace W.",
            "is_active": true,
            "move_in_date": "2026-03-15"
        });
        let tenant = Tenant::from_row(&row).unwrap();
        let start = chrono::NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        assert!(tenant.leased_during(start, end));

        let early_start = chrono::NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let early_end = chrono::NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        assert!(!tenant.leased_during(early_start, early_end));
    }
}
