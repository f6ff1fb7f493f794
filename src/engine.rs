//! The billing engine: the single entry point that generates cycles,
//! accrues penalties and applies payment transitions against a store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Directory, Tenant};
use crate::cycle::dates::start_of_day;
use crate::cycle::generator::{
    first_rent_cycle, first_utility_cycle, first_utility_dates, next_rent_cycle,
    next_utility_cycle, next_utility_dates, rent_successor,
};
use crate::cycle::renewal::{decide, RenewalDecision};
use crate::cycle::{
    penalty, transition, Bill, BillingKind, BillingPolicy, CyclePlan, InFlight, MeterReading,
    NewBill, NextCycle, PaymentStatus,
};
use crate::error::{BillingError, Result};
use crate::gateway::{CheckoutRequest, PaymentGateway};
use crate::store::{BillStore, Created};

/// What a generation request did.
///
/// Everything except `Generated` is informational: the request was valid
/// but there was nothing to create yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Generated { bill: Bill },
    AlreadyCurrent { bill: Bill },
    LeaseNotStarted { starts_at: DateTime<Utc> },
    LeaseEnded { ended_on: NaiveDate },
    TenantInactive,
    NotResponsible,
    InFlight,
}

impl GenerationOutcome {
    pub fn bill(&self) -> Option<&Bill> {
        match self {
            Self::Generated { bill } | Self::AlreadyCurrent { bill } => Some(bill),
            _ => None,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    pub id: String,
    pub error: String,
}

/// Result of a penalty sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub scanned: u32,
    pub updated: u32,
    pub failures: Vec<RowFailure>,
}

/// Result of a renewal pass over every tenant.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenewalReport {
    pub generated: Vec<Bill>,
    pub waiting: u32,
    pub failures: Vec<RowFailure>,
}

/// A started gateway checkout.
#[derive(Debug, Clone, Serialize)]
pub struct Checkout {
    pub bill_id: String,
    pub tx_ref: String,
    pub amount: f64,
    pub checkout_url: String,
}

pub struct BillingEngine<S, D> {
    store: S,
    directory: D,
    policy: BillingPolicy,
    in_flight: InFlight,
}

impl<S: BillStore, D: Directory> BillingEngine<S, D> {
    pub fn new(store: S, directory: D, policy: BillingPolicy) -> Self {
        Self {
            store,
            directory,
            policy,
            in_flight: InFlight::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn policy(&self) -> &BillingPolicy {
        &self.policy
    }

    /// Generate the next bill for a tenant and kind.
    ///
    /// Utility kinds need a meter reading. At most one generation per tenant
    /// and kind runs at a time, and the store refuses a second current bill.
    pub fn generate(
        &self,
        tenant_id: &str,
        kind: BillingKind,
        reading: Option<MeterReading>,
        now: DateTime<Utc>,
    ) -> Result<GenerationOutcome> {
        let tenant = self.directory.get_tenant(tenant_id)?;
        if let Some(outcome) = self.not_applicable(&tenant, kind, now) {
            debug!(tenant_id, %kind, ?outcome, "Generation not applicable");
            return Ok(outcome);
        }

        let Some(_slot) = self.in_flight.try_begin(tenant_id, kind) else {
            debug!(tenant_id, %kind, "Generation already in flight");
            return Ok(GenerationOutcome::InFlight);
        };

        let latest = self.store.latest_bill(tenant_id, kind)?;
        if let Some(bill) = latest.as_ref().filter(|bill| bill.is_current()) {
            return Ok(GenerationOutcome::AlreadyCurrent { bill: bill.clone() });
        }

        let plan = self.plan(&tenant, kind, latest.as_ref(), reading)?;
        let new = NewBill {
            tenant_id: tenant.id.clone(),
            building_id: tenant.building_id.clone(),
            kind,
            cycle: latest.as_ref().map_or(1, |bill| bill.cycle + 1),
            plan,
        };

        match self.store.create_bill(new)? {
            Created::Inserted(bill) => {
                info!(
                    bill_id = %bill.id,
                    tenant_id,
                    %kind,
                    cycle = bill.cycle,
                    due_date = %bill.due_date,
                    amount = bill.amount,
                    "Bill generated"
                );
                Ok(GenerationOutcome::Generated { bill })
            }
            Created::Existing(bill) => Ok(GenerationOutcome::AlreadyCurrent { bill }),
        }
    }

    fn not_applicable(
        &self,
        tenant: &Tenant,
        kind: BillingKind,
        now: DateTime<Utc>,
    ) -> Option<GenerationOutcome> {
        if !tenant.active {
            return Some(GenerationOutcome::TenantInactive);
        }
        if !tenant.is_responsible_for(kind) {
            return Some(GenerationOutcome::NotResponsible);
        }
        let starts_at = start_of_day(tenant.rent_start_date);
        if now < starts_at {
            return Some(GenerationOutcome::LeaseNotStarted { starts_at });
        }
        match tenant.rent_end_date {
            Some(ended_on) if tenant.lease_ended(now.date_naive()) => {
                Some(GenerationOutcome::LeaseEnded { ended_on })
            }
            _ => None,
        }
    }

    fn plan(
        &self,
        tenant: &Tenant,
        kind: BillingKind,
        latest: Option<&Bill>,
        reading: Option<MeterReading>,
    ) -> Result<CyclePlan> {
        if kind == BillingKind::Rent {
            let term = tenant.term()?;
            return match latest {
                Some(previous) => next_rent_cycle(previous, term, tenant.monthly_rent),
                None => first_rent_cycle(term, tenant.rent_start_date, tenant.monthly_rent),
            };
        }

        let reading = reading.ok_or(BillingError::MissingField("current_reading"))?;
        let rate = self
            .directory
            .get_latest_rate(&tenant.building_id)?
            .for_kind(kind)
            .ok_or_else(|| BillingError::RateNotFound(tenant.building_id.clone()))?;
        match latest {
            Some(previous) => next_utility_cycle(previous, reading, rate, &self.policy),
            None => first_utility_cycle(tenant.rent_start_date, reading, rate, &self.policy),
        }
    }

    /// Dates of the current cycle, or of the one the next generation would create.
    ///
    /// Nothing is stored; use it for a "next due date" placeholder before the
    /// first bill exists.
    pub fn preview(&self, tenant_id: &str, kind: BillingKind) -> Result<NextCycle> {
        let tenant = self.directory.get_tenant(tenant_id)?;
        let latest = self.store.latest_bill(tenant_id, kind)?;
        match latest {
            Some(bill) if bill.is_current() => Ok(NextCycle {
                bill_date: bill.bill_date,
                due_date: bill.due_date,
            }),
            Some(bill) if kind == BillingKind::Rent => rent_successor(&bill),
            Some(bill) => match bill.next_cycle {
                Some(next) => Ok(next),
                None => next_utility_dates(bill.bill_date.date_naive(), &self.policy),
            },
            None if kind == BillingKind::Rent => {
                let plan = first_rent_cycle(tenant.term()?, tenant.rent_start_date, 0.0)?;
                Ok(NextCycle {
                    bill_date: plan.bill_date,
                    due_date: plan.due_date,
                })
            }
            None => first_utility_dates(tenant.rent_start_date, &self.policy),
        }
    }

    /// Recompute penalty and total due for every non-paid bill.
    ///
    /// Each bill is updated on its own; a failure is logged, recorded in the
    /// report and does not stop the sweep.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let outstanding = self.store.outstanding_bills()?;
        let mut report = SweepReport::default();

        for bill in outstanding {
            report.scanned += 1;
            let before = bill.version;
            let result = self.store.update_bill(&bill.id, &mut |bill| {
                if bill.payment_status.is_terminal() {
                    return Ok(false);
                }
                let accrual = penalty::accrue(bill, now, &self.policy);
                Ok(penalty::apply(bill, &accrual))
            });

            match result {
                Ok(updated) if updated.version != before => {
                    debug!(bill_id = %updated.id, penalty = updated.penalty, "Penalty updated");
                    report.updated += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(bill_id = %bill.id, error = %e, "Failed to update penalty");
                    report.failures.push(RowFailure {
                        id: bill.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            scanned = report.scanned,
            updated = report.updated,
            failed = report.failures.len(),
            "Penalty sweep completed"
        );
        Ok(report)
    }

    /// Attach payment proof to a bill.
    pub fn submit_proof(&self, bill_id: &str, proof: &str, now: DateTime<Utc>) -> Result<Bill> {
        let bill = self
            .store
            .update_bill(bill_id, &mut |bill| {
                transition::submit_proof(bill, proof, now).map(|_| true)
            })?;
        info!(bill_id, "Payment proof submitted");
        Ok(bill)
    }

    /// Attach payment proof to a tenant's current bill of `kind`.
    ///
    /// Fails with a precondition error when no bill has been generated.
    pub fn submit_current_proof(
        &self,
        tenant_id: &str,
        kind: BillingKind,
        proof: &str,
        now: DateTime<Utc>,
    ) -> Result<Bill> {
        if proof.trim().is_empty() {
            return Err(BillingError::EmptyProof);
        }
        let current = self
            .store
            .find_current_bill(tenant_id, kind)?
            .ok_or_else(|| BillingError::BillNotGenerated {
                tenant: tenant_id.to_string(),
                kind,
            })?;
        self.submit_proof(&current.id, proof, now)
    }

    /// Approve a submitted bill and fix the next cycle's dates.
    ///
    /// The status check and the update happen in one store operation, so a
    /// retried approval cannot advance the cycle twice.
    pub fn approve(&self, bill_id: &str, now: DateTime<Utc>) -> Result<Bill> {
        let bill = self.store.update_bill(bill_id, &mut |bill| {
            transition::approve(bill, now, &self.policy).map(|_| true)
        })?;
        info!(
            bill_id,
            amount_paid = bill.amount_paid.unwrap_or(bill.amount),
            next_due = ?bill.next_cycle.map(|next| next.due_date),
            "Bill approved"
        );
        Ok(bill)
    }

    /// Send a submitted utility bill back to the tenant.
    pub fn reject(&self, bill_id: &str, reason: &str) -> Result<Bill> {
        let bill = self
            .store
            .update_bill(bill_id, &mut |bill| transition::reject(bill, reason).map(|_| true))?;
        info!(bill_id, reason, "Payment proof rejected");
        Ok(bill)
    }

    /// Apply the rent auto-generation policy to every tenant.
    pub fn renew_all(&self, now: DateTime<Utc>) -> Result<RenewalReport> {
        let mut report = RenewalReport::default();

        for tenant in self.directory.tenants()? {
            if !tenant.active || tenant.lease_ended(now.date_naive()) {
                continue;
            }
            match self.renew(&tenant, now) {
                Ok(Some(bill)) => report.generated.push(bill),
                Ok(None) => report.waiting += 1,
                Err(e) => {
                    warn!(tenant_id = %tenant.id, error = %e, "Renewal failed");
                    report.failures.push(RowFailure {
                        id: tenant.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            generated = report.generated.len(),
            waiting = report.waiting,
            failed = report.failures.len(),
            "Renewal pass completed"
        );
        Ok(report)
    }

    fn renew(&self, tenant: &Tenant, now: DateTime<Utc>) -> Result<Option<Bill>> {
        let latest = self.store.latest_bill(&tenant.id, BillingKind::Rent)?;
        let decision = decide(
            latest.as_ref(),
            tenant.rent_start_date,
            now,
            self.policy.renewal_lead_days,
        )?;
        if decision != RenewalDecision::Generate {
            debug!(tenant_id = %tenant.id, ?decision, "No renewal");
            return Ok(None);
        }
        let outcome = self.generate(&tenant.id, BillingKind::Rent, None, now)?;
        Ok(match outcome {
            GenerationOutcome::Generated { bill } => Some(bill),
            _ => None,
        })
    }

    /// Start a gateway checkout for a bill's current total.
    ///
    /// The reference is stored only after the gateway accepted the transaction.
    pub fn start_checkout(
        &self,
        bill_id: &str,
        currency: &str,
        gateway: &dyn PaymentGateway,
        now: DateTime<Utc>,
    ) -> Result<Checkout> {
        let bill = self.store.get_bill(bill_id)?;
        transition::checkout_allowed(&bill)?;
        let tenant = self.directory.get_tenant(&bill.tenant_id)?;
        let amount = penalty::accrue(&bill, now, &self.policy)
            .total_due
            .max(bill.total_due);

        let tx_ref = format!("{}-{}", bill_id, now.timestamp());
        let checkout_url = gateway.initialize_transaction(&CheckoutRequest {
            tx_ref: tx_ref.clone(),
            amount,
            currency: currency.to_string(),
            customer_name: tenant.name.clone(),
            customer_email: tenant.email.clone(),
        })?;
        let bill = self.store.update_bill(bill_id, &mut |bill| {
            transition::attach_checkout(bill, &tx_ref).map(|_| true)
        })?;
        info!(bill_id, %tx_ref, amount, "Checkout started");

        Ok(Checkout {
            bill_id: bill.id,
            tx_ref,
            amount,
            checkout_url,
        })
    }

    /// Verify a bill's checkout with the gateway and approve it on success.
    pub fn settle(
        &self,
        bill_id: &str,
        gateway: &dyn PaymentGateway,
        now: DateTime<Utc>,
    ) -> Result<Bill> {
        let bill = self.store.get_bill(bill_id)?;
        let tx_ref = bill
            .checkout_ref
            .clone()
            .ok_or_else(|| BillingError::NoTransaction {
                bill: bill_id.to_string(),
            })?;

        let status = gateway.verify_transaction(&tx_ref)?;
        if !status.is_success() {
            return Err(BillingError::UnverifiedTransaction {
                tx_ref,
                status: status.to_string(),
            });
        }

        let proof = format!("gateway:{tx_ref}");
        let bill = self.store.update_bill(bill_id, &mut |bill| {
            if matches!(
                bill.payment_status,
                PaymentStatus::Pending | PaymentStatus::Rejected
            ) {
                transition::submit_proof(bill, &proof, now)?;
            }
            transition::approve(bill, now, &self.policy).map(|_| true)
        })?;
        info!(bill_id, %tx_ref, "Gateway payment verified and approved");
        Ok(bill)
    }
}
