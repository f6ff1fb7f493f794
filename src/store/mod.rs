//! Storage for bills.
//!
//! Implement [`BillStore`] to persist the ledger elsewhere. Both shipped
//! stores serialize every operation, which makes `create_bill` and
//! `update_bill` atomic with respect to each other.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use chrono::Datelike;

use crate::config::State;
use crate::cycle::{Bill, BillingKind, NewBill};
use crate::error::{BillingError, Result};

/// Result of inserting a bill.
#[derive(Debug, Clone, PartialEq)]
pub enum Created {
    Inserted(Bill),
    /// A current bill, or a bill for the same cycle start, already existed.
    Existing(Bill),
}

/// Which bills to return from [`BillStore::bills`].
#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    pub tenant_id: Option<String>,
    pub kind: Option<BillingKind>,
    pub outstanding_only: bool,
}

impl BillFilter {
    pub fn tenant(tenant_id: &str) -> Self {
        Self {
            tenant_id: Some(tenant_id.to_string()),
            ..Self::default()
        }
    }

    pub fn outstanding() -> Self {
        Self {
            outstanding_only: true,
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: BillingKind) -> Self {
        self.kind = Some(kind);
        self
    }

    fn matches(&self, bill: &Bill) -> bool {
        self.tenant_id.as_deref().map_or(true, |t| bill.tenant_id == t)
            && self.kind.map_or(true, |k| bill.kind == k)
            && (!self.outstanding_only || bill.is_current())
    }
}

/// A mutation applied by [`BillStore::update_bill`].
///
/// Runs against a copy of the stored bill. `Ok(true)` commits the copy,
/// `Ok(false)` leaves the record untouched, and an error aborts without
/// writing anything.
pub type Mutation<'a> = &'a mut dyn FnMut(&mut Bill) -> Result<bool>;

pub trait BillStore: Send + Sync {
    fn get_bill(&self, id: &str) -> Result<Bill>;

    /// Matching bills ordered by bill date, oldest first.
    fn bills(&self, filter: &BillFilter) -> Result<Vec<Bill>>;

    /// Insert a new bill unless the tenant already has a current bill of
    /// that kind, or a bill starting at the same instant.
    fn create_bill(&self, new: NewBill) -> Result<Created>;

    /// Conditionally update one bill; see [`Mutation`].
    fn update_bill(&self, id: &str, mutation: Mutation<'_>) -> Result<Bill>;

    /// Most recent bill for a tenant and kind, paid or not.
    fn latest_bill(&self, tenant_id: &str, kind: BillingKind) -> Result<Option<Bill>> {
        Ok(self
            .bills(&BillFilter::tenant(tenant_id).with_kind(kind))?
            .pop())
    }

    /// The one non-paid bill for a tenant and kind, if any.
    fn find_current_bill(&self, tenant_id: &str, kind: BillingKind) -> Result<Option<Bill>> {
        let filter = BillFilter {
            outstanding_only: true,
            ..BillFilter::tenant(tenant_id).with_kind(kind)
        };
        Ok(self.bills(&filter)?.pop())
    }

    fn outstanding_bills(&self) -> Result<Vec<Bill>> {
        self.bills(&BillFilter::outstanding())
    }
}

/// Format a bill id from a template such as `BILL-{year}-{seq:04}`.
pub fn format_bill_number(format: &str, year: i32, seq: u32) -> String {
    format
        .replace("{year}", &year.to_string())
        .replace("{seq:04}", &format!("{:04}", seq))
        .replace("{seq:05}", &format!("{:05}", seq))
        .replace("{seq:03}", &format!("{:03}", seq))
        .replace("{seq}", &seq.to_string())
}

fn select(state: &State, filter: &BillFilter) -> Vec<Bill> {
    let mut bills: Vec<Bill> = state
        .bills
        .iter()
        .filter(|bill| filter.matches(bill))
        .cloned()
        .collect();
    bills.sort_by(|a, b| a.bill_date.cmp(&b.bill_date).then(a.cycle.cmp(&b.cycle)));
    bills
}

fn insert_unique(state: &mut State, new: NewBill, number_format: &str) -> Created {
    let clash = state.bills.iter().find(|bill| {
        bill.tenant_id == new.tenant_id
            && bill.kind == new.kind
            && (bill.is_current() || bill.bill_date == new.plan.bill_date)
    });
    if let Some(existing) = clash {
        return Created::Existing(existing.clone());
    }

    let seq = state.counter.last_number + 1;
    let id = format_bill_number(number_format, new.plan.bill_date.year(), seq);
    state.counter.last_number = seq;

    let bill = Bill::from_new(id, new);
    state.bills.push(bill.clone());
    Created::Inserted(bill)
}

/// Apply `mutation` to a copy of bill `id`; returns the bill and whether it was written.
fn apply_update(state: &mut State, id: &str, mutation: Mutation<'_>) -> Result<(Bill, bool)> {
    let slot = state
        .bills
        .iter_mut()
        .find(|bill| bill.id == id)
        .ok_or_else(|| BillingError::BillNotFound(id.to_string()))?;

    let mut draft = slot.clone();
    if !mutation(&mut draft)? {
        return Ok((slot.clone(), false));
    }
    draft.version = slot.version + 1;
    *slot = draft;
    Ok((slot.clone(), true))
}
