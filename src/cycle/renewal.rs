//! Auto-generation trigger policy.
//!
//! Rent bills are generated proactively: immediately once a lease has
//! started, then again a fixed lead time before each following due date.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use super::bill::{Bill, BillingKind};
use super::dates::start_of_day;
use super::generator::rent_successor;
use crate::error::Result;

/// Whether a rent bill should be generated now.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RenewalDecision {
    Generate,
    LeaseNotStarted { starts_at: DateTime<Utc> },
    AlreadyCurrent { bill_id: String },
    NotYetDue { opens_at: DateTime<Utc> },
}

/// When the bill for the cycle after `paid` may be generated.
///
/// The lead window is `lead_days` or the whole next cycle, whichever is shorter.
pub fn renewal_opens_at(paid: &Bill, lead_days: u32) -> Result<DateTime<Utc>> {
    let next = rent_successor(paid)?;
    let lead_start = next
        .due_date
        .checked_sub_signed(Duration::days(i64::from(lead_days)))
        .unwrap_or(next.bill_date);
    Ok(lead_start.max(next.bill_date))
}

/// Decide whether to generate the next rent bill for a tenant.
///
/// `latest` is the tenant's most recent rent bill by bill date, if any.
pub fn decide(
    latest: Option<&Bill>,
    rent_start: NaiveDate,
    now: DateTime<Utc>,
    lead_days: u32,
) -> Result<RenewalDecision> {
    let starts_at = start_of_day(rent_start);
    if now < starts_at {
        return Ok(RenewalDecision::LeaseNotStarted { starts_at });
    }
    let Some(bill) = latest else {
        return Ok(RenewalDecision::Generate);
    };
    if bill.is_current() {
        return Ok(RenewalDecision::AlreadyCurrent {
            bill_id: bill.id.clone(),
        });
    }
    let opens_at = renewal_opens_at(bill, lead_days)?;
    Ok(if now >= opens_at {
        RenewalDecision::Generate
    } else {
        RenewalDecision::NotYetDue { opens_at }
    })
}

/// Tenants and kinds with a generation attempt currently running.
#[derive(Debug, Default)]
pub struct InFlight {
    keys: Mutex<HashSet<(String, BillingKind)>>,
}

impl InFlight {
    fn keys(&self) -> MutexGuard<'_, HashSet<(String, BillingKind)>> {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim the slot for `(tenant_id, kind)`. `None` if another attempt holds it.
    pub fn try_begin(&self, tenant_id: &str, kind: BillingKind) -> Option<InFlightGuard<'_>> {
        let key = (tenant_id.to_string(), kind);
        if !self.keys().insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard { owner: self, key })
    }

    #[cfg(test)]
    fn is_busy(&self, tenant_id: &str, kind: BillingKind) -> bool {
        self.keys().contains(&(tenant_id.to_string(), kind))
    }
}

/// Releases its in-flight slot when dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: (String, BillingKind),
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.keys().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::bill::{CyclePlan, NewBill, NextCycle, PaymentStatus};
    use crate::cycle::dates::end_of_day;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn paid_bill(next_bill: NaiveDate, next_due: NaiveDate) -> Bill {
        let mut bill = Bill::from_new(
            "BILL-1".to_string(),
            NewBill {
                tenant_id: "t1".to_string(),
                building_id: "b1".to_string(),
                kind: BillingKind::Rent,
                cycle: 1,
                plan: CyclePlan {
                    bill_date: start_of_day(d(2024, 1, 1)),
                    due_date: end_of_day(d(2024, 1, 31)),
                    amount: 1000.0,
                    term_days: 30,
                    usage: None,
                },
            },
        );
        bill.payment_status = PaymentStatus::Paid;
        bill.next_cycle = Some(NextCycle {
            bill_date: start_of_day(next_bill),
            due_date: end_of_day(next_due),
        });
        bill
    }

    #[test]
    fn first_bill_waits_for_lease_start() {
        let decision = decide(None, d(2024, 3, 1), start_of_day(d(2024, 2, 1)), 10).unwrap();
        assert_eq!(
            decision,
            RenewalDecision::LeaseNotStarted {
                starts_at: start_of_day(d(2024, 3, 1))
            }
        );
        assert_eq!(
            decide(None, d(2024, 3, 1), start_of_day(d(2024, 3, 1)), 10).unwrap(),
            RenewalDecision::Generate
        );
    }

    #[test]
    fn paid_bill_renews_ten_days_before_next_due() {
        let bill = paid_bill(d(2024, 1, 20), d(2024, 2, 19));
        let opens = end_of_day(d(2024, 2, 9));
        assert_eq!(renewal_opens_at(&bill, 10).unwrap(), opens);
        assert_eq!(
            decide(Some(&bill), d(2024, 1, 1), start_of_day(d(2024, 2, 1)), 10).unwrap(),
            RenewalDecision::NotYetDue { opens_at: opens }
        );
        assert_eq!(
            decide(Some(&bill), d(2024, 1, 1), start_of_day(d(2024, 2, 10)), 10).unwrap(),
            RenewalDecision::Generate
        );
    }

    #[test]
    fn short_cycle_opens_at_its_start() {
        let bill = paid_bill(d(2024, 2, 10), d(2024, 2, 13));
        assert_eq!(renewal_opens_at(&bill, 10).unwrap(), start_of_day(d(2024, 2, 10)));
    }

    #[test]
    fn current_bill_blocks_renewal() {
        let mut bill = paid_bill(d(2024, 1, 20), d(2024, 2, 19));
        bill.payment_status = PaymentStatus::Submitted;
        assert_eq!(
            decide(Some(&bill), d(2024, 1, 1), start_of_day(d(2024, 3, 1)), 10).unwrap(),
            RenewalDecision::AlreadyCurrent {
                bill_id: "BILL-1".to_string()
            }
        );
    }

    #[test]
    fn unrepresentable_successor_is_an_error() {
        let mut bill = paid_bill(d(2024, 1, 20), d(2024, 2, 19));
        bill.next_cycle = None;
        bill.term_days = u32::MAX;
        assert!(decide(Some(&bill), d(2024, 1, 1), start_of_day(d(2024, 3, 1)), 10).is_err());
    }

    #[test]
    fn in_flight_slot_is_exclusive_until_dropped() {
        let in_flight = InFlight::default();
        let guard = in_flight.try_begin("t1", BillingKind::Rent).unwrap();
        assert!(in_flight.try_begin("t1", BillingKind::Rent).is_none());
        assert!(in_flight.try_begin("t1", BillingKind::Water).is_some());
        drop(guard);
        assert!(!in_flight.is_busy("t1", BillingKind::Rent));
        assert!(in_flight.try_begin("t1", BillingKind::Rent).is_some());
    }
}
