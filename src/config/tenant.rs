use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cycle::{BillingKind, PaymentTerm};
use crate::error::Result;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Tenant {
    /// Filled from the table name in tenants.toml.
    #[serde(skip)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub building_id: String,
    /// Raw term: 1..=12 means months, anything larger means days.
    pub payment_term: i64,
    pub rent_start_date: NaiveDate,
    #[serde(default)]
    pub rent_end_date: Option<NaiveDate>,
    pub monthly_rent: f64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub utilities: UtilityResponsibility,
}

/// Which utilities the tenant pays for directly.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default)]
pub struct UtilityResponsibility {
    #[serde(default)]
    pub electricity: bool,
    #[serde(default)]
    pub water: bool,
    #[serde(default)]
    pub generator: bool,
}

impl Tenant {
    pub fn term(&self) -> Result<PaymentTerm> {
        PaymentTerm::from_raw(self.payment_term)
    }

    pub fn is_responsible_for(&self, kind: BillingKind) -> bool {
        match kind {
            BillingKind::Rent => true,
            BillingKind::Electricity => self.utilities.electricity,
            BillingKind::Water => self.utilities.water,
            BillingKind::Generator => self.utilities.generator,
        }
    }

    pub fn lease_ended(&self, today: NaiveDate) -> bool {
        self.rent_end_date.is_some_and(|end| today > end)
    }
}

fn default_active() -> bool {
    true
}
