use std::collections::HashMap;

use super::rate::{RateBook, UtilityRate};
use super::tenant::Tenant;
use crate::error::{BillingError, Result};

/// Read access to tenant and utility-rate records owned by the surrounding system.
pub trait Directory: Send + Sync {
    fn get_tenant(&self, tenant_id: &str) -> Result<Tenant>;

    /// Most recent rate configuration for a building.
    fn get_latest_rate(&self, building_id: &str) -> Result<UtilityRate>;

    /// All tenants, sorted by id.
    fn tenants(&self) -> Result<Vec<Tenant>>;
}

/// Tenants and rates loaded from tenants.toml and rates.toml.
#[derive(Debug, Default)]
pub struct Roster {
    tenants: HashMap<String, Tenant>,
    rates: RateBook,
}

impl Roster {
    pub fn new(tenants: HashMap<String, Tenant>, rates: RateBook) -> Self {
        let tenants = tenants
            .into_iter()
            .map(|(id, mut tenant)| {
                tenant.id = id.clone();
                (id, tenant)
            })
            .collect();
        Self { tenants, rates }
    }

    pub fn rates(&self) -> &RateBook {
        &self.rates
    }
}

impl Directory for Roster {
    fn get_tenant(&self, tenant_id: &str) -> Result<Tenant> {
        self.tenants
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| BillingError::TenantNotFound(tenant_id.to_string()))
    }

    fn get_latest_rate(&self, building_id: &str) -> Result<UtilityRate> {
        self.rates
            .latest(building_id)
            .cloned()
            .ok_or_else(|| BillingError::RateNotFound(building_id.to_string()))
    }

    fn tenants(&self) -> Result<Vec<Tenant>> {
        let mut tenants: Vec<Tenant> = self.tenants.values().cloned().collect();
        tenants.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tenants)
    }
}
