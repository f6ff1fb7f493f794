use serde::{Deserialize, Serialize};

use crate::cycle::Bill;

/// Contents of state.toml: the id counter and the append-only bill ledger.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct State {
    #[serde(default)]
    pub counter: Counter,
    #[serde(default)]
    pub bills: Vec<Bill>,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Counter {
    pub last_number: u32,
}
