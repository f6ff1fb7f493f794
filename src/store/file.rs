use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{apply_update, insert_unique, select, BillFilter, BillStore, Created, Mutation};
use crate::config::{load_state, save_state, State};
use crate::cycle::{Bill, NewBill};
use crate::error::{BillingError, Result};

/// Bill ledger kept in `state.toml` inside the config directory.
///
/// Every call re-reads the file, so several short-lived processes see each
/// other's writes; calls within one process are serialized by a lock.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    number_format: String,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn open(dir: &Path, number_format: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            number_format: number_format.to_string(),
            lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read(&self) -> Result<State> {
        load_state(&self.dir).map_err(unavailable)
    }

    fn write(&self, state: &State) -> Result<()> {
        save_state(&self.dir, state).map_err(unavailable)
    }
}

/// IO failures surface as a transient store outage.
fn unavailable(err: BillingError) -> BillingError {
    match err {
        BillingError::Io(io) => BillingError::Store(io.to_string()),
        other => other,
    }
}

impl BillStore for FileStore {
    fn get_bill(&self, id: &str) -> Result<Bill> {
        let _guard = self.lock();
        let state = self.read()?;
        state
            .bills
            .into_iter()
            .find(|bill| bill.id == id)
            .ok_or_else(|| BillingError::BillNotFound(id.to_string()))
    }

    fn bills(&self, filter: &BillFilter) -> Result<Vec<Bill>> {
        let _guard = self.lock();
        Ok(select(&self.read()?, filter))
    }

    fn create_bill(&self, new: NewBill) -> Result<Created> {
        let _guard = self.lock();
        let mut state = self.read()?;
        let created = insert_unique(&mut state, new, &self.number_format);
        if matches!(created, Created::Inserted(_)) {
            self.write(&state)?;
        }
        Ok(created)
    }

    fn update_bill(&self, id: &str, mutation: Mutation<'_>) -> Result<Bill> {
        let _guard = self.lock();
        let mut state = self.read()?;
        let (bill, written) = apply_update(&mut state, id, mutation)?;
        if written {
            self.write(&state)?;
        }
        Ok(bill)
    }
}
