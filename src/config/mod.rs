mod rate;
mod roster;
mod settings;
mod state;
mod tenant;

pub use rate::{RateBook, UtilityRate};
pub use roster::{Directory, Roster};
pub use settings::{BillingSettings, Config, GatewaySettings};
pub use state::{Counter, State};
pub use tenant::{Tenant, UtilityResponsibility};

use crate::error::{BillingError, Result};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (XDG, falling back to ~/.rentcycle/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "rentcycle") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = std::env::var_os("HOME").map(PathBuf::from).ok_or_else(|| {
        BillingError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".rentcycle"))
}

fn load_toml<T: DeserializeOwned>(path: PathBuf) -> Result<T> {
    if !path.exists() {
        return Err(BillingError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| BillingError::ConfigParse { path, source: e })
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    load_toml(config_dir.join("config.toml"))
}

/// Load tenants.toml as a HashMap keyed by tenant id
pub fn load_tenants(config_dir: &Path) -> Result<HashMap<String, Tenant>> {
    load_toml(config_dir.join("tenants.toml"))
}

/// Load rates.toml
pub fn load_rates(config_dir: &Path) -> Result<RateBook> {
    load_toml(config_dir.join("rates.toml"))
}

/// Load tenants and rates together
pub fn load_roster(config_dir: &Path) -> Result<Roster> {
    Ok(Roster::new(load_tenants(config_dir)?, load_rates(config_dir)?))
}

/// Load state.toml (empty ledger if missing)
pub fn load_state(config_dir: &Path) -> Result<State> {
    let path = config_dir.join("state.toml");
    if !path.exists() {
        return Ok(State::default());
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| BillingError::ConfigParse { path, source: e })
}

/// Save state.toml, replacing the previous file in one rename
pub fn save_state(config_dir: &Path, state: &State) -> Result<()> {
    let path = config_dir.join("state.toml");
    let content = toml::to_string_pretty(state).map_err(|e| {
        BillingError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })?;
    let tmp = config_dir.join("state.toml.tmp");
    fs::write(&tmp, content)?;
    fs::rename(tmp, path)?;
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[billing]
number_format = "BILL-{year}-{seq:04}"  # e.g., BILL-2026-0001
currency = "USD"
currency_symbol = "$"
rent_penalty_rate = 0.01                # 1% of rent per overdue day
utility_penalty_rate = 0.01             # 1% of utility cost per overdue day
utility_first_bill_offset_days = 30     # first utility bill one cycle after lease start
utility_grace_days = 5
renewal_lead_days = 10                  # issue the next rent bill this long before it is due

# [gateway]
# base_url = "https://api.chapa.co/v1"
# secret_key_env = "RENTCYCLE_GATEWAY_KEY"
# callback_url = "https://example.com/payments/callback"   # optional
# timeout_secs = 10
"#;

/// Template content for tenants.toml
pub const TENANTS_TEMPLATE: &str = r#"# Define your tenants here. The table name (e.g., [unit-4b]) is used
# as the tenant identifier in every command.
#
# payment_term: 1-12 is a number of months (30 days each), larger values
# are a number of days.
#
# Example:
#   rentcycle generate --tenant example-tenant --kind rent

[example-tenant]
name = "Example Tenant"
email = "tenant@example.com"    # optional, used for gateway checkout
building_id = "main-building"
payment_term = 1
rent_start_date = "2024-01-01"
# rent_end_date = "2025-01-01"  # optional
monthly_rent = 1000.00

[example-tenant.utilities]
electricity = true
water = true
generator = false
"#;

/// Template content for rates.toml
pub const RATES_TEMPLATE: &str = r#"# Per-unit utility prices by building. When a building has several
# entries the one with the latest created_at applies.

[[rate]]
building_id = "main-building"
electricity = 5.0
water = 2.5
generator = 8.0
created_at = "2024-01-01T00:00:00Z"
"#;
