use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::{NewRentPayment, RentPayment};
use crate::error::{AppError, AppResult};
use crate::repository::ledger_store;
use crate::schemas::RentPaymentInput;
use crate::services::finance;

/// Derive the persistable row from a submitted payment. `balance_after` is
/// recomputed here on every create and edit.
fn draft_from_input(input: &RentPaymentInput) -> AppResult<NewRentPayment> {
    let balance_after =
        finance::post_payment(input.balance_before, input.penalty_amount, input.amount_paid)?;
    Ok(NewRentPayment {
        tenant_id: input.tenant_id,
        property_id: input.property_id,
        amount_paid: input.amount_paid,
        penalty_amount: input.penalty_amount,
        balance_before: input.balance_before,
        balance_after,
        payment_date: input
            .payment_date
            .unwrap_or_else(|| Utc::now().date_naive()),
        due_date: input.due_date,
        rent_month: input.rent_month.clone(),
        payment_method: input.payment_method.clone(),
        receipt_number: input.receipt_number.clone(),
        notes: input.notes.clone(),
    })
}

/// Post a new payment. The referenced tenant and property are verified in
/// the same transaction as the insert, so a failed lookup writes nothing.
pub async fn record_payment(pool: &PgPool, input: &RentPaymentInput) -> AppResult<RentPayment> {
    let draft = draft_from_input(input)?;

    let mut tx = begin(pool).await?;
    ensure_references(&mut tx, input).await?;
    let created = ledger_store::insert_payment(&mut tx, &draft).await?;
    commit(tx).await?;
    Ok(created)
}

/// Re-derive and replace an existing ledger row.
pub async fn revise_payment(
    pool: &PgPool,
    payment_id: Uuid,
    input: &RentPaymentInput,
) -> AppResult<RentPayment> {
    let draft = draft_from_input(input)?;

    let mut tx = begin(pool).await?;
    ensure_references(&mut tx, input).await?;
    let updated = ledger_store::update_payment(&mut tx, payment_id, &draft).await?;
    commit(tx).await?;
    Ok(updated)
}

pub async fn remove_payment(pool: &PgPool, payment_id: Uuid) -> AppResult<()> {
    ledger_store::delete_payment(pool, payment_id).await
}

async fn ensure_references(conn: &mut PgConnection, input: &RentPaymentInput) -> AppResult<()> {
    if !ledger_store::tenant_exists(conn, input.tenant_id).await? {
        return Err(AppError::NotFound("Tenant not found.".to_string()));
    }
    if !ledger_store::property_exists(conn, input.property_id).await? {
        return Err(AppError::NotFound("Property not found.".to_string()));
    }
    Ok(())
}

async fn begin(pool: &PgPool) -> AppResult<sqlx::Transaction<'_, sqlx::Postgres>> {
    pool.begin()
        .await
        .map_err(|error| AppError::Internal(format!("txn begin: {error}")))
}

async fn commit(tx: sqlx::Transaction<'_, sqlx::Postgres>) -> AppResult<()> {
    tx.commit()
        .await
        .map_err(|error| AppError::Internal(format!("txn commit: {error}")))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::draft_from_input;
    use crate::schemas::RentPaymentInput;

    fn input(balance_before: f64, penalty: f64, paid: f64) -> RentPaymentInput {
        RentPaymentInput {
            tenant_id: Uuid::from_u128(1),
            property_id: Uuid::from_u128(2),
            amount_paid: paid,
            penalty_amount: penalty,
            balance_before,
            payment_date: NaiveDate::from_ymd_opt(2026, 6, 5),
            due_date: NaiveDate::from_ymd_opt(2026, 6, 1),
            rent_month: Some("2026-06".to_string()),
            payment_method: Some("mpesa".to_string()),
            receipt_number: None,
            notes: None,
        }
    }

    #[test]
    fn derives_balance_after_from_submitted_figures() {
        let draft = draft_from_input(&input(25000.0, 500.0, 25500.0)).unwrap();
        assert_eq!(draft.balance_after, 0.0);

        let draft = draft_from_input(&input(25000.0, 0.0, 10000.0)).unwrap();
        assert_eq!(draft.balance_after, 15000.0);
        assert_eq!(
            draft.payment_date,
            NaiveDate::from_ymd_opt(2026, 6, 5).unwrap()
        );
    }

    #[test]
    fn rejects_non_finite_figures() {
        assert!(draft_from_input(&input(f64::NAN, 0.0, 10.0)).is_err());
    }
}
