use std::collections::{HashMap, HashSet};

use chrono::{Months, NaiveDate};
use uuid::Uuid;

use crate::domain::{Agent, Estate, Property, RentPayment, Tenant};
use crate::error::{AppError, AppResult};
use crate::services::finance::round2;

/// Display classification of a single ledger row. This is the one place the
/// Paid/Partial/Overdue derivation lives; every consumer goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum PaymentStatus {
    Paid,
    Partial,
    Overdue,
    Pending,
}

pub fn classify_payment(
    amount_paid: f64,
    rent_amount: f64,
    due_date: Option<NaiveDate>,
    today: NaiveDate,
) -> PaymentStatus {
    if amount_paid >= rent_amount {
        return PaymentStatus::Paid;
    }
    if amount_paid > 0.0 {
        return PaymentStatus::Partial;
    }
    match due_date {
        Some(due) if due < today => PaymentStatus::Overdue,
        _ => PaymentStatus::Pending,
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FinancialSummary {
    pub total_revenue: f64,
    pub total_expected: f64,
    pub collection_rate: f64,
    pub outstanding_amount: f64,
    pub total_properties: i64,
    pub occupied_properties: i64,
    pub vacant_properties: i64,
    pub occupancy_rate: f64,
}

/// Collection and occupancy figures for one period. Expected rent counts
/// each property with a tenancy overlapping the period once; collected rent
/// sums payments dated inside it. Both rates are defined as 0 when their
/// denominator is 0 and never leave [0, 100].
pub fn financial_summary(
    properties: &[Property],
    tenants: &[Tenant],
    payments: &[RentPayment],
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> FinancialSummary {
    let property_by_id: HashMap<Uuid, &Property> =
        properties.iter().map(|property| (property.id, property)).collect();

    let mut occupied: HashSet<Uuid> = HashSet::new();
    let mut total_expected = 0.0;
    for tenant in tenants {
        if !tenant.leased_during(period_start, period_end) {
            continue;
        }
        let Some(property_id) = tenant.property_id else {
            continue;
        };
        let Some(property) = property_by_id.get(&property_id) else {
            continue;
        };
        if occupied.insert(property_id) {
            total_expected += property.rent_amount;
        }
    }

    let in_period = |payment: &&RentPayment| {
        payment.payment_date >= period_start && payment.payment_date <= period_end
    };
    let total_revenue: f64 = payments
        .iter()
        .filter(in_period)
        .map(|payment| payment.amount_paid)
        .sum();

    let mut paid_by_property: HashMap<Uuid, f64> = HashMap::new();
    for payment in payments.iter().filter(in_period) {
        *paid_by_property.entry(payment.property_id).or_insert(0.0) += payment.amount_paid;
    }
    let outstanding_amount: f64 = occupied
        .iter()
        .map(|property_id| {
            let rent = property_by_id
                .get(property_id)
                .map(|property| property.rent_amount)
                .unwrap_or(0.0);
            rent - paid_by_property.get(property_id).copied().unwrap_or(0.0)
        })
        .sum();

    let total_properties = properties.len() as i64;
    let occupied_properties = occupied.len() as i64;
    let collection_rate = if total_expected > 0.0 {
        round2(((total_revenue / total_expected) * 100.0).clamp(0.0, 100.0))
    } else {
        0.0
    };
    let occupancy_rate = if total_properties > 0 {
        round2((occupied_properties as f64 / total_properties as f64) * 100.0)
    } else {
        0.0
    };

    FinancialSummary {
        total_revenue: round2(total_revenue),
        total_expected: round2(total_expected),
        collection_rate,
        outstanding_amount: round2(outstanding_amount.max(0.0)),
        total_properties,
        occupied_properties,
        vacant_properties: total_properties - occupied_properties,
        occupancy_rate,
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DefaulterRow {
    pub tenant_id: Uuid,
    pub tenant: String,
    pub phone: Option<String>,
    pub property: String,
    pub rent_amount: f64,
    pub outstanding_balance: f64,
    pub last_payment_date: Option<NaiveDate>,
    pub days_overdue: i64,
}

/// Active tenants who either owe money or have gone quiet. A tenant is
/// listed when the derived outstanding balance is positive, or when more
/// than `grace_days` have passed since their last payment (since move-in if
/// they have never paid). Sorted by outstanding balance, largest first.
pub fn defaulters(
    tenants: &[Tenant],
    properties: &[Property],
    estates: &[Estate],
    payments: &[RentPayment],
    today: NaiveDate,
    grace_days: i64,
) -> Vec<DefaulterRow> {
    let property_by_id: HashMap<Uuid, &Property> =
        properties.iter().map(|property| (property.id, property)).collect();
    let estate_names: HashMap<Uuid, &str> = estates
        .iter()
        .map(|estate| (estate.id, estate.name.as_str()))
        .collect();

    let mut history_by_tenant: HashMap<Uuid, Vec<&RentPayment>> = HashMap::new();
    for payment in payments {
        history_by_tenant
            .entry(payment.tenant_id)
            .or_default()
            .push(payment);
    }
    for history in history_by_tenant.values_mut() {
        history.sort_by_key(|payment| payment.payment_date);
    }

    let mut rows = Vec::new();
    for tenant in tenants {
        if !tenant.is_active {
            continue;
        }
        let Some(property_id) = tenant.property_id else {
            continue;
        };
        let Some(property) = property_by_id.get(&property_id) else {
            continue;
        };

        let empty = Vec::new();
        let history = history_by_tenant.get(&tenant.id).unwrap_or(&empty);
        let outstanding_balance = outstanding_for(property.rent_amount, history);

        let last_payment_date = history.last().map(|payment| payment.payment_date);
        let days_overdue = last_payment_date
            .or(tenant.move_in_date)
            .map(|since| (today - since).num_days().max(0))
            .unwrap_or(0);

        if outstanding_balance <= 0.0 && days_overdue <= grace_days {
            continue;
        }

        rows.push(DefaulterRow {
            tenant_id: tenant.id,
            tenant: tenant.name.clone(),
            phone: tenant.phone.clone(),
            property: property_label(property, &estate_names),
            rent_amount: property.rent_amount,
            outstanding_balance,
            last_payment_date,
            days_overdue,
        });
    }

    rows.sort_by(|left, right| {
        right
            .outstanding_balance
            .total_cmp(&left.outstanding_balance)
    });
    rows
}

/// Balance still owed for the current cycle: the full rent when no payment
/// was ever recorded, zero when the most recent payment settled the ledger,
/// otherwise rent minus everything paid since the last settling payment.
fn outstanding_for(rent_amount: f64, history: &[&RentPayment]) -> f64 {
    let Some(latest) = history.last() else {
        return rent_amount;
    };
    if latest.balance_after <= 0.0 {
        return 0.0;
    }
    let paid_since: f64 = history
        .iter()
        .rev()
        .take_while(|payment| payment.balance_after > 0.0)
        .map(|payment| payment.amount_paid)
        .sum();
    round2((rent_amount - paid_since).max(0.0))
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RentCollectionRow {
    pub tenant: String,
    pub property: String,
    pub rent_amount: f64,
    pub amount_paid: f64,
    pub status: PaymentStatus,
    pub payment_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
}

/// Per-payment report rows with joined tenant/property labels and the
/// centralized status classification.
pub fn rent_collection_rows(
    payments: &[RentPayment],
    tenants: &[Tenant],
    properties: &[Property],
    estates: &[Estate],
    today: NaiveDate,
) -> Vec<RentCollectionRow> {
    let tenant_names: HashMap<Uuid, &str> = tenants
        .iter()
        .map(|tenant| (tenant.id, tenant.name.as_str()))
        .collect();
    let property_by_id: HashMap<Uuid, &Property> =
        properties.iter().map(|property| (property.id, property)).collect();
    let estate_names: HashMap<Uuid, &str> = estates
        .iter()
        .map(|estate| (estate.id, estate.name.as_str()))
        .collect();

    payments
        .iter()
        .map(|payment| {
            let property = property_by_id.get(&payment.property_id);
            let rent_amount = property.map(|property| property.rent_amount).unwrap_or(0.0);
            RentCollectionRow {
                tenant: tenant_names
                    .get(&payment.tenant_id)
                    .map(|name| (*name).to_string())
                    .unwrap_or_else(|| "Unknown tenant".to_string()),
                property: property
                    .map(|property| property_label(property, &estate_names))
                    .unwrap_or_else(|| "Unknown property".to_string()),
                rent_amount,
                amount_paid: payment.amount_paid,
                status: classify_payment(payment.amount_paid, rent_amount, payment.due_date, today),
                payment_date: payment.payment_date,
                due_date: payment.due_date,
            }
        })
        .collect()
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AgentEarningsRow {
    pub agent: String,
    pub property_count: i64,
    pub total_rent_collected: f64,
    pub commission_rate: f64,
    pub commission_earned: f64,
}

/// Earnings per agent over an already range-filtered payment set. Each agent
/// earns their own `commission_rate` (a percentage) of rent collected across
/// their portfolio; agents with no collections in the period are omitted.
pub fn agent_earnings(
    agents: &[Agent],
    properties: &[Property],
    payments: &[RentPayment],
) -> Vec<AgentEarningsRow> {
    let agent_by_property: HashMap<Uuid, Uuid> = properties
        .iter()
        .filter_map(|property| property.agent_id.map(|agent_id| (property.id, agent_id)))
        .collect();

    let mut collected_by_agent: HashMap<Uuid, f64> = HashMap::new();
    let mut properties_by_agent: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
    for payment in payments {
        let Some(agent_id) = agent_by_property.get(&payment.property_id) else {
            continue;
        };
        *collected_by_agent.entry(*agent_id).or_insert(0.0) += payment.amount_paid;
        properties_by_agent
            .entry(*agent_id)
            .or_default()
            .insert(payment.property_id);
    }

    let mut rows: Vec<AgentEarningsRow> = agents
        .iter()
        .filter_map(|agent| {
            let total = collected_by_agent.get(&agent.id).copied()?;
            let property_count = properties_by_agent
                .get(&agent.id)
                .map(|set| set.len() as i64)
                .unwrap_or(0);
            Some(AgentEarningsRow {
                agent: agent.name.clone(),
                property_count,
                total_rent_collected: round2(total),
                commission_rate: agent.commission_rate,
                commission_earned: round2(total * agent.commission_rate / 100.0),
            })
        })
        .collect();

    rows.sort_by(|left, right| right.commission_earned.total_cmp(&left.commission_earned));
    rows
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RevenueSlice {
    pub category: &'static str,
    pub amount: f64,
}

/// Trailing-month revenue split into rent, late fees and other income. The
/// three buckets are summed independently; "Other Income" has no source in
/// the ledger yet and reports zero.
pub fn revenue_breakdown(payments: &[RentPayment], today: NaiveDate) -> Vec<RevenueSlice> {
    let cutoff = today
        .checked_sub_months(Months::new(1))
        .unwrap_or(today);

    let mut rent = 0.0;
    let mut late_fees = 0.0;
    for payment in payments {
        if payment.payment_date < cutoff {
            continue;
        }
        rent += payment.amount_paid;
        if payment.penalty_amount > 0.0 {
            late_fees += payment.penalty_amount;
        }
    }

    vec![
        RevenueSlice {
            category: "Rent",
            amount: round2(rent),
        },
        RevenueSlice {
            category: "Late Fees",
            amount: round2(late_fees),
        },
        RevenueSlice {
            category: "Other Income",
            amount: 0.0,
        },
    ]
}

/// First and last day of a "YYYY-MM" month string.
pub fn month_bounds(month: &str) -> AppResult<(NaiveDate, NaiveDate)> {
    let invalid = || AppError::InvalidArgument(format!("Invalid month '{month}', expected YYYY-MM."));
    let (year_raw, month_raw) = month.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year_raw.parse().map_err(|_| invalid())?;
    let month_number: u32 = month_raw.parse().map_err(|_| invalid())?;
    let start = NaiveDate::from_ymd_opt(year, month_number, 1).ok_or_else(invalid)?;
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;
    Ok((start, end))
}

fn property_label(property: &Property, estate_names: &HashMap<Uuid, &str>) -> String {
    match property
        .estate_id
        .and_then(|estate_id| estate_names.get(&estate_id))
    {
        Some(estate) => format!("{estate} - {}", property.house_number),
        None => property.house_number.clone(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::{
        agent_earnings, classify_payment, defaulters, financial_summary, month_bounds,
        rent_collection_rows, revenue_breakdown, PaymentStatus,
    };
    use crate::domain::{Agent, Estate, Property, PropertyStatus, RentPayment, Tenant};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn property(id: u128, rent: f64, status: PropertyStatus) -> Property {
        Property {
            id: Uuid::from_u128(id),
            estate_id: None,
            landlord_id: None,
            agent_id: None,
            house_number: format!("H{id}"),
            house_type: None,
            rent_amount: rent,
            deposit_amount: 0.0,
            status,
            description: None,
        }
    }

    fn tenant(id: u128, property: u128, move_in: NaiveDate) -> Tenant {
        Tenant {
            id: Uuid::from_u128(id),
            property_id: Some(Uuid::from_u128(property)),
            name: format!("Tenant {id}"),
            phone: None,
            email: None,
            is_active: true,
            move_in_date: Some(move_in),
            move_out_date: None,
        }
    }

    fn payment(
        id: u128,
        tenant: u128,
        property: u128,
        paid: f64,
        balance_after: f64,
        on: NaiveDate,
    ) -> RentPayment {
        RentPayment {
            id: Uuid::from_u128(id),
            tenant_id: Uuid::from_u128(tenant),
            property_id: Uuid::from_u128(property),
            amount_paid: paid,
            penalty_amount: 0.0,
            balance_before: 0.0,
            balance_after,
            payment_date: on,
            due_date: Some(on),
            rent_month: None,
            payment_method: None,
            receipt_number: None,
            notes: None,
        }
    }

    #[test]
    fn classification_matrix() {
        let today = date(2026, 6, 15);
        assert_eq!(
            classify_payment(25000.0, 25000.0, Some(date(2026, 6, 1)), today),
            PaymentStatus::Paid
        );
        assert_eq!(
            classify_payment(10000.0, 25000.0, Some(date(2026, 6, 1)), today),
            PaymentStatus::Partial
        );
        assert_eq!(
            classify_payment(0.0, 25000.0, Some(date(2026, 6, 1)), today),
            PaymentStatus::Overdue
        );
        assert_eq!(
            classify_payment(0.0, 25000.0, Some(date(2026, 6, 30)), today),
            PaymentStatus::Pending
        );
        assert_eq!(
            classify_payment(0.0, 25000.0, None, today),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn occupancy_rate_from_leased_properties() {
        let properties: Vec<Property> = (1..=10)
            .map(|id| property(id, 20000.0, PropertyStatus::Vacant))
            .collect();
        let tenants: Vec<Tenant> = (1..=7)
            .map(|id| tenant(100 + id, id, date(2026, 1, 1)))
            .collect();

        let summary = financial_summary(
            &properties,
            &tenants,
            &[],
            date(2026, 6, 1),
            date(2026, 6, 30),
        );
        assert_eq!(summary.occupancy_rate, 70.0);
        assert_eq!(summary.occupied_properties, 7);
        assert_eq!(summary.vacant_properties, 3);
        assert_eq!(summary.total_expected, 140000.0);
        // Nothing collected yet.
        assert_eq!(summary.collection_rate, 0.0);
        assert_eq!(summary.outstanding_amount, 140000.0);
    }

    #[test]
    fn rates_are_zero_when_denominators_are_zero() {
        let summary = financial_summary(&[], &[], &[], date(2026, 6, 1), date(2026, 6, 30));
        assert_eq!(summary.occupancy_rate, 0.0);
        assert_eq!(summary.collection_rate, 0.0);
        assert_eq!(summary.total_properties, 0);
    }

    #[test]
    fn collection_rate_is_clamped_to_one_hundred() {
        let properties = vec![property(1, 20000.0, PropertyStatus::Occupied)];
        let tenants = vec![tenant(101, 1, date(2026, 1, 1))];
        // Tenant prepaid two months inside the window.
        let payments = vec![payment(1, 101, 1, 40000.0, 0.0, date(2026, 6, 5))];

        let summary = financial_summary(
            &properties,
            &tenants,
            &payments,
            date(2026, 6, 1),
            date(2026, 6, 30),
        );
        assert_eq!(summary.collection_rate, 100.0);
        assert_eq!(summary.total_revenue, 40000.0);
        assert_eq!(summary.outstanding_amount, 0.0);
    }

    #[test]
    fn never_paid_tenant_defaults_with_days_since_move_in() {
        let today = date(2026, 6, 15);
        let properties = vec![property(1, 25000.0, PropertyStatus::Occupied)];
        let tenants = vec![tenant(101, 1, today - chrono::Duration::days(45))];

        let rows = defaulters(&tenants, &properties, &[], &[], today, 30);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].days_overdue, 45);
        assert_eq!(rows[0].outstanding_balance, 25000.0);
        assert!(rows[0].last_payment_date.is_none());
    }

    #[test]
    fn settled_tenant_is_not_a_defaulter() {
        let today = date(2026, 6, 15);
        let properties = vec![property(1, 25000.0, PropertyStatus::Occupied)];
        let tenants = vec![tenant(101, 1, date(2026, 1, 1))];
        let payments = vec![payment(1, 101, 1, 25000.0, 0.0, date(2026, 6, 1))];

        let rows = defaulters(&tenants, &properties, &[], &payments, today, 30);
        assert!(rows.is_empty());
    }

    #[test]
    fn partial_payer_owes_the_remainder_and_sorts_first() {
        let today = date(2026, 6, 15);
        let properties = vec![
            property(1, 25000.0, PropertyStatus::Occupied),
            property(2, 18000.0, PropertyStatus::Occupied),
        ];
        let tenants = vec![
            tenant(101, 1, date(2026, 1, 1)),
            tenant(102, 2, date(2026, 1, 1)),
        ];
        let payments = vec![
            // Paid 10k of 25k this cycle.
            payment(1, 101, 1, 10000.0, 15000.0, date(2026, 6, 2)),
            // Paid 15k of 18k.
            payment(2, 102, 2, 15000.0, 3000.0, date(2026, 6, 3)),
        ];

        let rows = defaulters(&tenants, &properties, &[], &payments, today, 30);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].outstanding_balance, 15000.0);
        assert_eq!(rows[1].outstanding_balance, 3000.0);
    }

    #[test]
    fn collection_rows_join_labels_and_classify() {
        let today = date(2026, 6, 15);
        let mut housed = property(1, 25000.0, PropertyStatus::Occupied);
        housed.estate_id = Some(Uuid::from_u128(9));
        let estates = vec![Estate {
            id: Uuid::from_u128(9),
            name: "Green Court".to_string(),
            location: None,
        }];
        let tenants = vec![tenant(101, 1, date(2026, 1, 1))];
        let payments = vec![payment(1, 101, 1, 10000.0, 15000.0, date(2026, 6, 2))];

        let rows = rent_collection_rows(&payments, &tenants, &[housed], &estates, today);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].property, "Green Court - H1");
        assert_eq!(rows[0].tenant, "Tenant 101");
        assert_eq!(rows[0].status, PaymentStatus::Partial);
    }

    #[test]
    fn agent_earnings_use_each_agents_rate() {
        let mut managed = property(1, 45000.0, PropertyStatus::Occupied);
        managed.agent_id = Some(Uuid::from_u128(7));
        let agents = vec![
            Agent {
                id: Uuid::from_u128(7),
                name: "Achieng O.".to_string(),
                phone: None,
                email: None,
                commission_rate: 2.5,
            },
            Agent {
                id: Uuid::from_u128(8),
                name: "Idle Agent".to_string(),
                phone: None,
                email: None,
                commission_rate: 1.0,
            },
        ];
        let payments = vec![payment(1, 101, 1, 45000.0, 0.0, date(2026, 6, 5))];

        let rows = agent_earnings(&agents, &[managed], &payments);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].agent, "Achieng O.");
        assert_eq!(rows[0].property_count, 1);
        assert_eq!(rows[0].commission_earned, 1125.0);
    }

    #[test]
    fn revenue_breakdown_buckets() {
        let today = date(2026, 6, 15);
        let mut recent = payment(1, 101, 1, 25000.0, 0.0, date(2026, 6, 1));
        recent.penalty_amount = 500.0;
        let stale = payment(2, 101, 1, 9000.0, 0.0, date(2026, 1, 1));

        let slices = revenue_breakdown(&[recent, stale], today);
        assert_eq!(slices[0].category, "Rent");
        assert_eq!(slices[0].amount, 25000.0);
        assert_eq!(slices[1].category, "Late Fees");
        assert_eq!(slices[1].amount, 500.0);
        assert_eq!(slices[2].category, "Other Income");
        assert_eq!(slices[2].amount, 0.0);
    }

    #[test]
    fn month_bounds_cover_whole_months() {
        assert_eq!(
            month_bounds("2026-06").unwrap(),
            (date(2026, 6, 1), date(2026, 6, 30))
        );
        assert_eq!(
            month_bounds("2026-02").unwrap(),
            (date(2026, 2, 1), date(2026, 2, 28))
        );
        assert_eq!(
            month_bounds("2028-02").unwrap(),
            (date(2028, 2, 1), date(2028, 2, 29))
        );
        assert!(month_bounds("June 2026").is_err());
        assert!(month_bounds("2026-13").is_err());
    }
}
