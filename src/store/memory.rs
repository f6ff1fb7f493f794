use std::sync::{Mutex, MutexGuard};

use super::{apply_update, insert_unique, select, BillFilter, BillStore, Created, Mutation};
use crate::config::State;
use crate::cycle::{Bill, NewBill};
use crate::error::Result;

/// In-process bill ledger, for tests and embedding.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    number_format: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_number_format("BILL-{year}-{seq:04}")
    }

    pub fn with_number_format(number_format: &str) -> Self {
        Self {
            state: Mutex::new(State::default()),
            number_format: number_format.to_string(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BillStore for MemoryStore {
    fn get_bill(&self, id: &str) -> Result<Bill> {
        self.update_bill(id, &mut |_| Ok(false))
    }

    fn bills(&self, filter: &BillFilter) -> Result<Vec<Bill>> {
        Ok(select(&self.state(), filter))
    }

    fn create_bill(&self, new: NewBill) -> Result<Created> {
        Ok(insert_unique(&mut self.state(), new, &self.number_format))
    }

    fn update_bill(&self, id: &str, mutation: Mutation<'_>) -> Result<Bill> {
        apply_update(&mut self.state(), id, mutation).map(|(bill, _)| bill)
    }
}
