//! The billing-cycle engine's pure rules: dates, terms, penalties and
//! payment transitions. Nothing in here touches storage.

pub mod bill;
pub mod dates;
pub mod generator;
pub mod penalty;
pub mod renewal;
pub mod term;
pub mod transition;

pub use bill::{
    Bill, BillingKind, CyclePlan, DisplayStatus, NewBill, NextCycle, PaymentStatus, Usage,
};
pub use generator::MeterReading;
pub use penalty::Accrual;
pub use renewal::{InFlight, RenewalDecision};
pub use term::PaymentTerm;

/// Tunable rates and offsets for cycle computation.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingPolicy {
    /// Fraction of the rent charged per overdue day.
    pub rent_penalty_rate: f64,
    /// Fraction of the utility cost charged per overdue day.
    pub utility_penalty_rate: f64,
    /// Days from lease start to the first utility bill, and that bill's cycle length.
    pub utility_first_bill_offset_days: u32,
    pub utility_grace_days: u32,
    /// How long before the next due date a renewal bill is generated.
    pub renewal_lead_days: u32,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            rent_penalty_rate: 0.01,
            utility_penalty_rate: 0.01,
            utility_first_bill_offset_days: 30,
            utility_grace_days: 5,
            renewal_lead_days: 10,
        }
    }
}
