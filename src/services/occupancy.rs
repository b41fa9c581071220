use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::PropertyStatus;
use crate::error::{AppError, AppResult};
use crate::repository::ledger_store;

/// A property can only be claimed for a new or reactivated tenancy while it
/// is Vacant. Occupied, reserved and under-maintenance properties all reject.
pub fn ensure_claimable(status: PropertyStatus) -> AppResult<()> {
    if status == PropertyStatus::Vacant {
        return Ok(());
    }
    Err(AppError::InvalidState(format!(
        "Property is not available (currently {}).",
        status.as_str()
    )))
}

/// Status a property falls back to when its tenant leaves. Administrative
/// states (Under Maintenance, Reserved) are left untouched.
pub fn released_status(status: PropertyStatus) -> Option<PropertyStatus> {
    match status {
        PropertyStatus::Occupied => Some(PropertyStatus::Vacant),
        _ => None,
    }
}

/// Vacant → Occupied, atomically. The status row is locked for the duration
/// of the surrounding transaction, so two concurrent claims serialize and
/// the loser sees Occupied.
pub async fn claim_property(conn: &mut PgConnection, property_id: Uuid) -> AppResult<()> {
    let status = ledger_store::lock_property_status(conn, property_id).await?;
    ensure_claimable(status)?;
    ledger_store::set_property_status(conn, property_id, PropertyStatus::Occupied).await
}

/// Occupied → Vacant when a tenant is deactivated or deleted.
pub async fn release_property(conn: &mut PgConnection, property_id: Uuid) -> AppResult<()> {
    let status = ledger_store::lock_property_status(conn, property_id).await?;
    if let Some(next) = released_status(status) {
        ledger_store::set_property_status(conn, property_id, next).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ensure_claimable, released_status};
    use crate::domain::PropertyStatus;

    #[test]
    fn only_vacant_properties_are_claimable() {
        assert!(ensure_claimable(PropertyStatus::Vacant).is_ok());
        assert!(ensure_claimable(PropertyStatus::Occupied).is_err());
        assert!(ensure_claimable(PropertyStatus::UnderMaintenance).is_err());
        assert!(ensure_claimable(PropertyStatus::Reserved).is_err());
    }

    #[test]
    fn release_only_touches_occupied_properties() {
        assert_eq!(
            released_status(PropertyStatus::Occupied),
            Some(PropertyStatus::Vacant)
        );
        assert_eq!(released_status(PropertyStatus::Vacant), None);
        assert_eq!(released_status(PropertyStatus::UnderMaintenance), None);
        assert_eq!(released_status(PropertyStatus::Reserved), None);
    }
}
