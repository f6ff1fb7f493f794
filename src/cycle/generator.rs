//! Cycle Generator: bill and due dates plus base charge for a new cycle.

use chrono::NaiveDate;

use super::bill::{Bill, CyclePlan, NextCycle, Usage};
use super::dates::{add_days, end_of_day, end_of_month, next_billing_date, start_of_day};
use super::term::{round_cents, PaymentTerm};
use super::BillingPolicy;
use crate::error::{BillingError, Result};

/// Days in a utility cycle.
const UTILITY_TERM_DAYS: u32 = 30;

/// A meter reading supplied when generating a utility bill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterReading {
    pub current: f64,
    /// Defaults to the previous bill's current reading.
    pub previous: Option<f64>,
}

/// Consumption times rate. Fails when the meter went backwards.
pub fn measure_usage(previous: f64, current: f64, rate: f64) -> Result<Usage> {
    if current < previous {
        return Err(BillingError::NegativeConsumption { previous, current });
    }
    Ok(Usage {
        previous_reading: previous,
        current_reading: current,
        rate,
    })
}

/// First rent cycle, anchored at the lease start.
pub fn first_rent_cycle(
    term: PaymentTerm,
    anchor: NaiveDate,
    monthly_rent: f64,
) -> Result<CyclePlan> {
    let due = add_days(anchor, i64::from(term.days()))?;
    Ok(CyclePlan {
        bill_date: start_of_day(anchor),
        due_date: end_of_day(due),
        amount: term.rent_for(monthly_rent),
        term_days: term.days(),
        usage: None,
    })
}

/// Dates of the rent cycle after `previous`.
///
/// Uses the successor dates fixed at approval; a bill without them is
/// anchored at its own due date.
pub fn rent_successor(previous: &Bill) -> Result<NextCycle> {
    if let Some(next) = previous.next_cycle {
        return Ok(next);
    }
    let anchor = previous.due_date.date_naive();
    let due = add_days(anchor, i64::from(previous.term_days))?;
    Ok(NextCycle {
        bill_date: start_of_day(anchor),
        due_date: end_of_day(due),
    })
}

/// Rent cycle following a paid bill.
pub fn next_rent_cycle(
    previous: &Bill,
    term: PaymentTerm,
    monthly_rent: f64,
) -> Result<CyclePlan> {
    let next = rent_successor(previous)?;
    Ok(CyclePlan {
        bill_date: next.bill_date,
        due_date: next.due_date,
        amount: term.rent_for(monthly_rent),
        term_days: term.days(),
        usage: None,
    })
}

/// First utility bill: one cycle after lease start, due after one more cycle plus grace.
pub fn first_utility_cycle(
    rent_start: NaiveDate,
    reading: MeterReading,
    rate: f64,
    policy: &BillingPolicy,
) -> Result<CyclePlan> {
    let previous = reading
        .previous
        .ok_or(BillingError::MissingField("previous_reading"))?;
    let usage = measure_usage(previous, reading.current, rate)?;
    let dates = first_utility_dates(rent_start, policy)?;

    Ok(CyclePlan {
        bill_date: dates.bill_date,
        due_date: dates.due_date,
        amount: round_cents(usage.consumption() * rate),
        term_days: UTILITY_TERM_DAYS,
        usage: Some(usage),
    })
}

/// Dates of a tenant's first utility cycle.
pub fn first_utility_dates(rent_start: NaiveDate, policy: &BillingPolicy) -> Result<NextCycle> {
    let offset = i64::from(policy.utility_first_bill_offset_days);
    let grace = i64::from(policy.utility_grace_days);
    let bill_date = add_days(rent_start, offset)?;
    let due_date = add_days(bill_date, offset + grace)?;
    Ok(NextCycle {
        bill_date: start_of_day(bill_date),
        due_date: end_of_day(due_date),
    })
}

/// Dates of the utility cycle after one billed on `bill_date`.
pub fn next_utility_dates(bill_date: NaiveDate, policy: &BillingPolicy) -> Result<NextCycle> {
    let next_bill = next_billing_date(bill_date)?;
    let due = add_days(end_of_month(next_bill)?, i64::from(policy.utility_grace_days))?;
    Ok(NextCycle {
        bill_date: start_of_day(next_bill),
        due_date: end_of_day(due),
    })
}

/// Utility cycle following `previous`, billed on the same day of the next month.
pub fn next_utility_cycle(
    previous: &Bill,
    reading: MeterReading,
    rate: f64,
    policy: &BillingPolicy,
) -> Result<CyclePlan> {
    let prior_reading = reading
        .previous
        .or_else(|| previous.usage.map(|u| u.current_reading))
        .ok_or(BillingError::MissingField("previous_reading"))?;
    let usage = measure_usage(prior_reading, reading.current, rate)?;
    let next = match previous.next_cycle {
        Some(next) => next,
        None => next_utility_dates(previous.bill_date.date_naive(), policy)?,
    };

    Ok(CyclePlan {
        bill_date: next.bill_date,
        due_date: next.due_date,
        amount: round_cents(usage.consumption() * rate),
        term_days: UTILITY_TERM_DAYS,
        usage: Some(usage),
    })
}
