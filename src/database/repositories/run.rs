use chrono::Utc;
use uuid::Uuid;

use crate::database::models::PayrollRun;
use crate::database::store::{MemoryStore, StoreError};

use super::REPLACE_ATTEMPTS;

#[derive(Clone)]
pub struct PayrollRunRepository {
    store: MemoryStore,
}

impl PayrollRunRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    pub async fn insert(&self, run: PayrollRun) -> Result<PayrollRun, StoreError> {
        self.store.insert_run(run).await
    }

    pub async fn find_by_period(&self, month: u32, year: i32) -> Option<PayrollRun> {
        self.store.find_run_by_period(month, year).await
    }

    /// Read-modify-write cycle for the period's run document, retried a
    /// bounded number of times on version conflicts.
    pub async fn mutate<F>(&self, id: Uuid, apply: F) -> Result<Option<PayrollRun>, StoreError>
    where
        F: Fn(&mut PayrollRun),
    {
        let mut attempts = 0;
        loop {
            let Some(mut run) = self.store.find_run(id).await else {
                return Ok(None);
            };
            apply(&mut run);
            run.updated_at = Utc::now();
            match self.store.replace_run(run).await {
                Ok(saved) => return Ok(Some(saved)),
                Err(StoreError::NotFound(_)) => {}
                Err(StoreError::Conflict(_)) if attempts + 1 < REPLACE_ATTEMPTS => {
                    attempts += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
