use serde::{Deserialize, Serialize};

use crate::cycle::BillingPolicy;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub billing: BillingSettings,
    #[serde(default)]
    pub gateway: Option<GatewaySettings>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BillingSettings {
    pub number_format: String,
    pub currency: String,
    pub currency_symbol: String,
    #[serde(default = "default_penalty_rate")]
    pub rent_penalty_rate: f64,
    #[serde(default = "default_penalty_rate")]
    pub utility_penalty_rate: f64,
    #[serde(default = "default_utility_offset")]
    pub utility_first_bill_offset_days: u32,
    #[serde(default = "default_grace_days")]
    pub utility_grace_days: u32,
    #[serde(default = "default_lead_days")]
    pub renewal_lead_days: u32,
}

impl BillingSettings {
    pub fn policy(&self) -> BillingPolicy {
        BillingPolicy {
            rent_penalty_rate: self.rent_penalty_rate,
            utility_penalty_rate: self.utility_penalty_rate,
            utility_first_bill_offset_days: self.utility_first_bill_offset_days,
            utility_grace_days: self.utility_grace_days,
            renewal_lead_days: self.renewal_lead_days,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GatewaySettings {
    pub base_url: String,
    /// Name of the environment variable holding the secret key.
    pub secret_key_env: String,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_penalty_rate() -> f64 {
    0.01
}

fn default_utility_offset() -> u32 {
    30
}

fn default_grace_days() -> u32 {
    5
}

fn default_lead_days() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    10
}
