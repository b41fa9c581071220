use crate::error::{AppError, AppResult};

/// Daily compounding rate applied to late balances (0.5%/day).
pub const DAILY_PENALTY_RATE: f64 = 0.005;
/// Share of collected rent paid out to an agent.
pub const AGENT_COMMISSION_RATE: f64 = 0.01;
/// Share of collected rent retained by the company (landlord side).
pub const COMPANY_COMMISSION_RATE: f64 = 0.05;

/// Compounding late-payment penalty:
/// `outstanding × (1 + r)^days − outstanding`.
///
/// Days before the due date never accrue a penalty, so negative
/// `days_past_due` clamps to zero instead of producing a credit.
pub fn late_payment_penalty(outstanding: f64, days_past_due: i64) -> AppResult<f64> {
    if !outstanding.is_finite() || outstanding < 0.0 {
        return Err(AppError::InvalidArgument(
            "Outstanding amount must be a non-negative number.".to_string(),
        ));
    }
    let days = days_past_due.max(0);
    let days = i32::try_from(days).map_err(|_| {
        AppError::InvalidArgument("Days past due is out of range.".to_string())
    })?;
    Ok(outstanding * (1.0 + DAILY_PENALTY_RATE).powi(days) - outstanding)
}

/// Commission on a rent amount: 1% for agents, 5% for the company.
pub fn commission(rent_amount: f64, is_agent: bool) -> AppResult<f64> {
    if !rent_amount.is_finite() || rent_amount < 0.0 {
        return Err(AppError::InvalidArgument(
            "Rent amount must be a non-negative number.".to_string(),
        ));
    }
    let rate = if is_agent {
        AGENT_COMMISSION_RATE
    } else {
        COMPANY_COMMISSION_RATE
    };
    Ok(rent_amount * rate)
}

/// Balance carried after posting a payment, floored at zero:
/// `max(0, balance_before + penalty_amount − amount_paid)`.
pub fn post_payment(balance_before: f64, penalty_amount: f64, amount_paid: f64) -> AppResult<f64> {
    for (label, value) in [
        ("balance_before", balance_before),
        ("penalty_amount", penalty_amount),
        ("amount_paid", amount_paid),
    ] {
        if !value.is_finite() {
            return Err(AppError::InvalidArgument(format!(
                "{label} must be a finite number."
            )));
        }
    }
    Ok(round2((balance_before + penalty_amount - amount_paid).max(0.0)))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::{commission, late_payment_penalty, post_payment, round2};

    #[test]
    fn no_penalty_on_or_before_the_due_date() {
        assert_eq!(late_payment_penalty(20000.0, 0).unwrap(), 0.0);
        assert_eq!(late_payment_penalty(20000.0, -5).unwrap(), 0.0);
        assert_eq!(late_payment_penalty(0.0, 14).unwrap(), 0.0);
    }

    #[test]
    fn penalty_compounds_daily() {
        let penalty = late_payment_penalty(20000.0, 10).unwrap();
        let expected = 20000.0 * 1.005_f64.powi(10) - 20000.0;
        assert!((penalty - expected).abs() < 1e-9);
        assert_eq!(round2(penalty), 1022.80);
    }

    #[test]
    fn penalty_grows_with_days_overdue() {
        let mut previous = 0.0;
        for days in 1..=60 {
            let penalty = late_payment_penalty(15000.0, days).unwrap();
            assert!(penalty > previous, "day {days} did not grow the penalty");
            previous = penalty;
        }
    }

    #[test]
    fn rejects_invalid_penalty_inputs() {
        assert!(late_payment_penalty(-1.0, 5).is_err());
        assert!(late_payment_penalty(f64::NAN, 5).is_err());
        assert!(late_payment_penalty(f64::INFINITY, 5).is_err());
    }

    #[test]
    fn commission_split() {
        assert_eq!(commission(45000.0, true).unwrap(), 450.0);
        assert_eq!(commission(45000.0, false).unwrap(), 2250.0);
        assert_eq!(commission(0.0, true).unwrap(), 0.0);
        assert!(commission(-45000.0, false).is_err());
        assert!(commission(f64::NAN, true).is_err());
    }

    #[test]
    fn balance_after_floors_at_zero() {
        // Overpayment clears the balance rather than going negative.
        assert_eq!(post_payment(25000.0, 500.0, 25500.0).unwrap(), 0.0);
        assert_eq!(post_payment(25000.0, 500.0, 40000.0).unwrap(), 0.0);
    }

    #[test]
    fn balance_after_carries_the_shortfall() {
        assert_eq!(post_payment(25000.0, 0.0, 10000.0).unwrap(), 15000.0);
        assert_eq!(post_payment(25000.0, 500.0, 10000.0).unwrap(), 15500.0);
    }

    #[test]
    fn balance_after_is_rounded_to_cents() {
        // 0.1 + 0.2 would otherwise leak binary dust into the ledger.
        assert_eq!(post_payment(0.1, 0.2, 0.0).unwrap(), 0.3);
        assert!(post_payment(f64::NAN, 0.0, 0.0).is_err());
    }
}
