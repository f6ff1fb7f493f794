use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cycle::BillingKind;

/// Per-unit utility prices for one building, effective from `created_at`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UtilityRate {
    pub building_id: String,
    pub electricity: f64,
    pub water: f64,
    pub generator: f64,
    pub created_at: DateTime<Utc>,
}

impl UtilityRate {
    /// Unit price for a utility kind. Rent has no unit price.
    pub fn for_kind(&self, kind: BillingKind) -> Option<f64> {
        match kind {
            BillingKind::Rent => None,
            BillingKind::Electricity => Some(self.electricity),
            BillingKind::Water => Some(self.water),
            BillingKind::Generator => Some(self.generator),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct RateBook {
    #[serde(default, rename = "rate")]
    pub rates: Vec<UtilityRate>,
}

impl RateBook {
    /// Most recent rate for a building by creation time.
    pub fn latest(&self, building_id: &str) -> Option<&UtilityRate> {
        self.rates
            .iter()
            .filter(|rate| rate.building_id == building_id)
            .max_by_key(|rate| rate.created_at)
    }
}
