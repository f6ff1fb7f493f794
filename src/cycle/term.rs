use serde::{Deserialize, Serialize};

use crate::error::{BillingError, Result};

/// Raw terms up to this value are months, anything above is days.
const MONTH_TERM_LIMIT: i64 = 12;
const DAYS_PER_MONTH: u32 = 30;

/// A tenant's payment term, normalized to days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentTerm(u32);

impl PaymentTerm {
    /// Normalize a raw term: 1..=12 are months of 30 days, larger values are days.
    pub fn from_raw(raw: i64) -> Result<Self> {
        if raw < 1 {
            return Err(BillingError::InvalidPaymentTerm(raw));
        }
        if raw <= MONTH_TERM_LIMIT {
            return Ok(Self(raw as u32 * DAYS_PER_MONTH));
        }
        u32::try_from(raw)
            .map(Self)
            .map_err(|_| BillingError::InvalidPaymentTerm(raw))
    }

    pub fn days(self) -> u32 {
        self.0
    }

    /// Rent owed for one full term at `monthly_rent`.
    pub fn rent_for(self, monthly_rent: f64) -> f64 {
        round_cents(monthly_rent * f64::from(self.0) / f64::from(DAYS_PER_MONTH))
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_terms_are_months() {
        for raw in 1..=12 {
            assert_eq!(PaymentTerm::from_raw(raw).unwrap().days(), raw as u32 * 30);
        }
    }

    #[test]
    fn large_terms_are_days() {
        for raw in [13, 30, 45, 90, 365] {
            assert_eq!(PaymentTerm::from_raw(raw).unwrap().days(), raw as u32);
        }
    }

    #[test]
    fn rejects_non_positive_terms() {
        assert!(PaymentTerm::from_raw(0).is_err());
        assert!(PaymentTerm::from_raw(-3).is_err());
    }

    #[test]
    fn rent_scales_with_term() {
        assert_eq!(PaymentTerm::from_raw(30).unwrap().rent_for(1000.0), 1000.0);
        assert_eq!(PaymentTerm::from_raw(3).unwrap().rent_for(1000.0), 3000.0);
        assert_eq!(PaymentTerm::from_raw(45).unwrap().rent_for(1000.0), 1500.0);
    }
}
