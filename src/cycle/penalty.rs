//! Penalty Accrual.
//!
//! Penalties are recomputed from `(amount, due_date, now)` on every sweep,
//! never accumulated, so concurrent sweeps cannot lose updates.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::bill::{Bill, BillingKind};
use super::dates::calendar_days_overdue;
use super::term::round_cents;
use super::BillingPolicy;

/// Penalty and total for one bill at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Accrual {
    pub days_overdue: i64,
    /// Overdue days that attract a penalty; capped at one term for rent.
    pub effective_days: i64,
    /// Full terms missed; always 0 for utilities.
    pub months_overdue: i64,
    pub penalty: f64,
    pub total_due: f64,
}

/// Rent: 1% of the base amount per overdue day, capped at one full term, plus
/// one extra base charge per fully missed term.
pub fn rent_accrual(
    amount: f64,
    term_days: u32,
    due: DateTime<Utc>,
    now: DateTime<Utc>,
    rate: f64,
) -> Accrual {
    let days_overdue = calendar_days_overdue(due, now);
    if days_overdue == 0 {
        return Accrual {
            days_overdue: 0,
            effective_days: 0,
            months_overdue: 0,
            penalty: 0.0,
            total_due: amount,
        };
    }

    let term = i64::from(term_days.max(1));
    let effective_days = days_overdue.min(term);
    let months_overdue = days_overdue / term;
    let penalty = round_cents(amount * rate * effective_days as f64);
    let total_due = round_cents(amount * (1 + months_overdue) as f64 + penalty);

    Accrual {
        days_overdue,
        effective_days,
        months_overdue,
        penalty,
        total_due,
    }
}

/// Utilities: 1% of the base cost per overdue day, uncapped, no compounding.
// TODO: confirm with product whether utilities should compound per missed term like rent.
pub fn utility_accrual(amount: f64, due: DateTime<Utc>, now: DateTime<Utc>, rate: f64) -> Accrual {
    let days_overdue = calendar_days_overdue(due, now);
    let penalty = round_cents(amount * rate * days_overdue as f64);
    Accrual {
        days_overdue,
        effective_days: days_overdue,
        months_overdue: 0,
        penalty,
        total_due: round_cents(amount + penalty),
    }
}

/// Accrual for `bill` at `now`, using the rule for its kind.
pub fn accrue(bill: &Bill, now: DateTime<Utc>, policy: &BillingPolicy) -> Accrual {
    match bill.kind {
        BillingKind::Rent => rent_accrual(
            bill.amount,
            bill.term_days,
            bill.due_date,
            now,
            policy.rent_penalty_rate,
        ),
        _ => utility_accrual(bill.amount, bill.due_date, now, policy.utility_penalty_rate),
    }
}

/// Apply an accrual to a non-paid bill. Returns whether anything changed.
///
/// A penalty already on the bill is never lowered; a clock that moved
/// backwards leaves the stored values alone.
pub fn apply(bill: &mut Bill, accrual: &Accrual) -> bool {
    if accrual.penalty < bill.penalty {
        return false;
    }
    let changed = accrual.penalty != bill.penalty || accrual.total_due != bill.total_due;
    bill.penalty = accrual.penalty;
    bill.total_due = accrual.total_due;
    changed
}
