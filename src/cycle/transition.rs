//! Payment Transition: guarded moves through the payment lifecycle.
//!
//! Each function validates its guard before touching the bill, so a failed
//! transition leaves the record exactly as it was.

use chrono::{DateTime, Utc};

use super::bill::{Bill, NextCycle, PaymentStatus};
use super::dates::{add_days, end_of_day};
use super::generator::next_utility_dates;
use super::penalty::accrue;
use super::BillingPolicy;
use crate::error::{BillingError, Result};

const SUBMITTABLE: &[PaymentStatus] = &[PaymentStatus::Pending, PaymentStatus::Rejected];
const APPROVABLE: &[PaymentStatus] = &[PaymentStatus::Submitted];

fn guard(bill: &Bill, action: &'static str, allowed: &[PaymentStatus]) -> Result<()> {
    if allowed.contains(&bill.payment_status) {
        Ok(())
    } else {
        Err(BillingError::invalid_state(
            &bill.id,
            action,
            bill.payment_status,
            allowed,
        ))
    }
}

/// pending|rejected -> submitted.
pub fn submit_proof(bill: &mut Bill, proof: &str, now: DateTime<Utc>) -> Result<()> {
    let proof = proof.trim();
    if proof.is_empty() {
        return Err(BillingError::EmptyProof);
    }
    guard(bill, "submit proof for", SUBMITTABLE)?;

    bill.payment_status = PaymentStatus::Submitted;
    bill.payment_proof_url = Some(proof.to_string());
    bill.submitted_at = Some(now);
    bill.rejection_reason = None;
    Ok(())
}

/// submitted -> rejected, utility bills only.
pub fn reject(bill: &mut Bill, reason: &str) -> Result<()> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(BillingError::EmptyReason);
    }
    if !bill.kind.is_utility() {
        return Err(BillingError::RejectNotSupported(bill.kind));
    }
    guard(bill, "reject", APPROVABLE)?;

    bill.payment_status = PaymentStatus::Rejected;
    bill.rejection_reason = Some(reason.to_string());
    Ok(())
}

/// Length in days of the rent cycle that starts when a bill is approved at `now`.
///
/// Paid on time: a full term. Paid late: the term minus the whole days
/// elapsed since the due instant, floored at zero, so the schedule stays
/// anchored instead of sliding forward.
pub fn rent_cycle_after_approval(bill: &Bill, now: DateTime<Utc>) -> i64 {
    let term = i64::from(bill.term_days);
    if now < bill.due_date {
        return term;
    }
    let days_late = (now - bill.due_date).num_days();
    (term - days_late).max(0)
}

/// Successor cycle dates fixed when `bill` is approved at `now`.
pub fn next_cycle_on_approval(
    bill: &Bill,
    now: DateTime<Utc>,
    policy: &BillingPolicy,
) -> Result<NextCycle> {
    if bill.kind.is_utility() {
        return next_utility_dates(bill.bill_date.date_naive(), policy);
    }
    let length = rent_cycle_after_approval(bill, now);
    let due = add_days(now.date_naive(), length)?;
    Ok(NextCycle {
        bill_date: now,
        due_date: end_of_day(due),
    })
}

/// submitted -> paid.
///
/// Records what was owed at approval, fixes the next cycle's dates and
/// resets the penalty.
pub fn approve(bill: &mut Bill, now: DateTime<Utc>, policy: &BillingPolicy) -> Result<()> {
    guard(bill, "approve", APPROVABLE)?;
    let next = next_cycle_on_approval(bill, now, policy)?;
    let owed = accrue(bill, now, policy).total_due.max(bill.total_due);

    bill.payment_status = PaymentStatus::Paid;
    bill.paid_at = Some(now);
    bill.amount_paid = Some(owed);
    bill.penalty = 0.0;
    bill.total_due = bill.amount;
    bill.next_cycle = Some(next);
    Ok(())
}

/// Fails unless `bill` is still awaiting payment.
pub fn checkout_allowed(bill: &Bill) -> Result<()> {
    guard(bill, "start checkout for", SUBMITTABLE)
}

/// Record a gateway checkout reference on a bill that is still awaiting payment.
pub fn attach_checkout(bill: &mut Bill, tx_ref: &str) -> Result<()> {
    checkout_allowed(bill)?;
    bill.checkout_ref = Some(tx_ref.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::bill::{BillingKind, CyclePlan, NewBill};
    use crate::cycle::dates::start_of_day;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bill(kind: BillingKind) -> Bill {
        Bill::from_new(
            "BILL-1".to_string(),
            NewBill {
                tenant_id: "t1".to_string(),
                building_id: "b1".to_string(),
                kind,
                cycle: 1,
                plan: CyclePlan {
                    bill_date: start_of_day(d(2024, 1, 1)),
                    due_date: end_of_day(d(2024, 1, 31)),
                    amount: 1000.0,
                    term_days: 30,
                    usage: None,
                },
            },
        )
    }

    fn submitted(kind: BillingKind) -> Bill {
        let mut bill = bill(kind);
        submit_proof(&mut bill, "https://proofs/1.png", start_of_day(d(2024, 1, 15))).unwrap();
        bill
    }

    #[test]
    fn approve_on_pending_is_rejected_without_mutation() {
        let mut pending = bill(BillingKind::Rent);
        let before = pending.clone();
        let err = approve(&mut pending, start_of_day(d(2024, 1, 20)), &BillingPolicy::default())
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidState { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Precondition);
        assert_eq!(pending, before);
    }

    #[test]
    fn approve_twice_fails_the_second_time() {
        let policy = BillingPolicy::default();
        let mut bill = submitted(BillingKind::Rent);
        approve(&mut bill, start_of_day(d(2024, 1, 20)), &policy).unwrap();
        let after_first = bill.clone();
        assert!(approve(&mut bill, start_of_day(d(2024, 1, 21)), &policy).is_err());
        assert_eq!(bill, after_first);
    }

    #[test]
    fn early_payment_gets_a_full_term() {
        let mut bill = submitted(BillingKind::Rent);
        approve(&mut bill, start_of_day(d(2024, 1, 20)), &BillingPolicy::default()).unwrap();
        let next = bill.next_cycle.unwrap();
        assert_eq!(next.bill_date, start_of_day(d(2024, 1, 20)));
        assert_eq!(next.due_date, end_of_day(d(2024, 2, 19)));
        assert_eq!(bill.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn late_payment_compresses_the_next_cycle() {
        let mut bill = submitted(BillingKind::Rent);
        approve(&mut bill, start_of_day(d(2024, 2, 10)), &BillingPolicy::default()).unwrap();
        assert_eq!(bill.next_cycle.unwrap().due_date, end_of_day(d(2024, 3, 2)));
        assert_eq!(bill.amount_paid, Some(1100.0));
        assert_eq!(bill.penalty, 0.0);
    }

    #[test]
    fn very_late_payment_floors_cycle_at_zero() {
        let bill = submitted(BillingKind::Rent);
        assert_eq!(rent_cycle_after_approval(&bill, start_of_day(d(2024, 6, 1))), 0);
    }

    #[test]
    fn approval_with_unrepresentable_due_date_leaves_bill_untouched() {
        let mut bill = submitted(BillingKind::Rent);
        bill.term_days = u32::MAX;
        let before = bill.clone();
        let err = approve(&mut bill, start_of_day(d(2024, 1, 20)), &BillingPolicy::default())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert_eq!(bill, before);
    }

    #[test]
    fn checkout_needs_an_unpaid_bill() {
        let mut bill = submitted(BillingKind::Rent);
        assert!(checkout_allowed(&bill).is_err());
        assert!(attach_checkout(&mut bill, "tx-1").is_err());
        assert_eq!(bill.checkout_ref, None);

        let mut pending = self::bill(BillingKind::Rent);
        attach_checkout(&mut pending, "tx-1").unwrap();
        assert_eq!(pending.checkout_ref.as_deref(), Some("tx-1"));
    }

    #[test]
    fn empty_proof_is_invalid() {
        let mut bill = bill(BillingKind::Rent);
        assert!(matches!(
            submit_proof(&mut bill, "  ", start_of_day(d(2024, 1, 2))),
            Err(BillingError::EmptyProof)
        ));
        assert_eq!(bill.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn rent_cannot_be_rejected() {
        let mut bill = submitted(BillingKind::Rent);
        assert!(matches!(
            reject(&mut bill, "blurry"),
            Err(BillingError::RejectNotSupported(BillingKind::Rent))
        ));
    }

    #[test]
    fn rejected_utility_bill_accepts_new_proof() {
        let mut bill = submitted(BillingKind::Water);
        reject(&mut bill, "amount does not match").unwrap();
        assert_eq!(bill.payment_status, PaymentStatus::Rejected);
        submit_proof(&mut bill, "https://proofs/2.png", start_of_day(d(2024, 1, 16))).unwrap();
        assert_eq!(bill.payment_status, PaymentStatus::Submitted);
        assert_eq!(bill.rejection_reason, None);
    }
}
