use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BillingError;

/// What a bill charges for. Each tenant has at most one current bill per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingKind {
    Rent,
    Electricity,
    Water,
    Generator,
}

impl BillingKind {
    pub const ALL: [BillingKind; 4] = [Self::Rent, Self::Electricity, Self::Water, Self::Generator];

    pub fn is_utility(self) -> bool {
        !matches!(self, Self::Rent)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rent => "rent",
            Self::Electricity => "electricity",
            Self::Water => "water",
            Self::Generator => "generator",
        }
    }
}

impl fmt::Display for BillingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingKind {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let name = normalized
            .strip_prefix("utility:")
            .unwrap_or(normalized.as_str());
        match name {
            "rent" => Ok(Self::Rent),
            "electricity" => Ok(Self::Electricity),
            "water" => Ok(Self::Water),
            "generator" => Ok(Self::Generator),
            _ => Err(BillingError::InvalidKind(s.to_string())),
        }
    }
}

/// Stored payment lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Submitted,
    Rejected,
    #[serde(alias = "approved")]
    Paid,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
        };
        f.write_str(s)
    }
}

/// Status as shown to a user. `Overdue` is derived and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Pending,
    Overdue,
    Submitted,
    Rejected,
    Paid,
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Overdue => "OVERDUE",
            Self::Submitted => "SUBMITTED",
            Self::Rejected => "REJECTED",
            Self::Paid => "PAID",
        };
        f.write_str(s)
    }
}

/// Meter readings behind a utility charge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub previous_reading: f64,
    pub current_reading: f64,
    pub rate: f64,
}

impl Usage {
    pub fn consumption(&self) -> f64 {
        self.current_reading - self.previous_reading
    }
}

/// Dates of the cycle that follows a paid bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextCycle {
    pub bill_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// Cycle dates and base charge produced by the generator, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CyclePlan {
    pub bill_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub amount: f64,
    pub term_days: u32,
    pub usage: Option<Usage>,
}

/// A bill that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBill {
    pub tenant_id: String,
    pub building_id: String,
    pub kind: BillingKind,
    pub cycle: u32,
    pub plan: CyclePlan,
}

/// One billing cycle for one tenant and kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: String,
    pub tenant_id: String,
    pub building_id: String,
    pub kind: BillingKind,
    /// 1-based cycle sequence for this tenant and kind.
    pub cycle: u32,
    /// Bumped on every stored mutation.
    #[serde(default)]
    pub version: u64,
    pub bill_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub original_due_date: DateTime<Utc>,
    pub term_days: u32,
    pub amount: f64,
    #[serde(default)]
    pub penalty: f64,
    pub total_due: f64,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_proof_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_paid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cycle: Option<NextCycle>,
}

impl Bill {
    pub fn from_new(id: String, new: NewBill) -> Self {
        let NewBill {
            tenant_id,
            building_id,
            kind,
            cycle,
            plan,
        } = new;
        Self {
            id,
            tenant_id,
            building_id,
            kind,
            cycle,
            version: 1,
            bill_date: plan.bill_date,
            due_date: plan.due_date,
            original_due_date: plan.due_date,
            term_days: plan.term_days,
            amount: plan.amount,
            penalty: 0.0,
            total_due: plan.amount,
            payment_status: PaymentStatus::Pending,
            usage: plan.usage,
            payment_proof_url: None,
            submitted_at: None,
            rejection_reason: None,
            checkout_ref: None,
            paid_at: None,
            amount_paid: None,
            next_cycle: None,
        }
    }

    pub fn is_current(&self) -> bool {
        !self.payment_status.is_terminal()
    }

    pub fn display_status(&self, now: DateTime<Utc>) -> DisplayStatus {
        match self.payment_status {
            PaymentStatus::Paid => DisplayStatus::Paid,
            PaymentStatus::Submitted => DisplayStatus::Submitted,
            PaymentStatus::Pending | PaymentStatus::Rejected if now > self.due_date => {
                DisplayStatus::Overdue
            }
            PaymentStatus::Pending => DisplayStatus::Pending,
            PaymentStatus::Rejected => DisplayStatus::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::dates::{end_of_day, start_of_day};
    use chrono::NaiveDate;

    fn sample() -> Bill {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let due = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        Bill::from_new(
            "BILL-1".to_string(),
            NewBill {
                tenant_id: "t1".to_string(),
                building_id: "b1".to_string(),
                kind: BillingKind::Rent,
                cycle: 1,
                plan: CyclePlan {
                    bill_date: start_of_day(start),
                    due_date: end_of_day(due),
                    amount: 1000.0,
                    term_days: 30,
                    usage: None,
                },
            },
        )
    }

    #[test]
    fn parses_kinds_with_utility_prefix() {
        assert_eq!("rent".parse::<BillingKind>().unwrap(), BillingKind::Rent);
        assert_eq!(
            "utility:water".parse::<BillingKind>().unwrap(),
            BillingKind::Water
        );
        assert_eq!(
            "Electricity".parse::<BillingKind>().unwrap(),
            BillingKind::Electricity
        );
        assert!("gas".parse::<BillingKind>().is_err());
    }

    #[test]
    fn new_bill_starts_pending_with_anchor() {
        let bill = sample();
        assert_eq!(bill.payment_status, PaymentStatus::Pending);
        assert_eq!(bill.original_due_date, bill.due_date);
        assert_eq!(bill.total_due, 1000.0);
        assert!(bill.due_date >= bill.bill_date);
    }

    #[test]
    fn overdue_is_derived_from_due_date() {
        let bill = sample();
        let before = start_of_day(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        let after = start_of_day(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(bill.display_status(before), DisplayStatus::Pending);
        assert_eq!(bill.display_status(after), DisplayStatus::Overdue);

        let mut submitted = bill.clone();
        submitted.payment_status = PaymentStatus::Submitted;
        assert_eq!(submitted.display_status(after), DisplayStatus::Submitted);
    }

    #[test]
    fn approved_is_read_as_paid() {
        let status: PaymentStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(status, PaymentStatus::Paid);
    }
}
