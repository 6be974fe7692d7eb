use chrono::Utc;
use uuid::Uuid;

use crate::database::models::Payroll;
use crate::database::store::{MemoryStore, StoreError};

use super::REPLACE_ATTEMPTS;

#[derive(Clone)]
pub struct PayrollRepository {
    store: MemoryStore,
}

impl PayrollRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    pub async fn insert(&self, payroll: Payroll) -> Result<Payroll, StoreError> {
        self.store.insert_payroll(payroll).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Option<Payroll> {
        self.store.find_payroll(id).await
    }

    pub async fn find_by_worker_period(
        &self,
        worker_id: &str,
        month: u32,
        year: i32,
    ) -> Option<Payroll> {
        self.store
            .find_payroll_by_worker_period(worker_id, month, year)
            .await
    }

    /// Payrolls of one period, ordered by worker name for stable listings.
    pub async fn list_by_period(&self, month: u32, year: i32) -> Vec<Payroll> {
        let mut payrolls = self.store.list_payrolls(month, year).await;
        payrolls.sort_by(|a, b| {
            a.worker_name
                .cmp(&b.worker_name)
                .then_with(|| a.worker_id.cmp(&b.worker_id))
        });
        payrolls
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.store.delete_payroll(id).await
    }

    /// Version-checked replace for callers that decide against writing after
    /// reading (status no-ops), where `mutate` would commit regardless.
    pub async fn replace(&self, payroll: Payroll) -> Result<Payroll, StoreError> {
        self.store.replace_payroll(payroll).await
    }

    /// Read-modify-write cycle with a bounded retry on version conflicts.
    ///
    /// `apply` runs on a fresh copy of the document on every attempt and may
    /// bail out with a domain error. Totals are re-derived and `updatedAt`
    /// refreshed before the document goes back, so callers only touch the
    /// fields they care about. Returns `Ok(None)` when the payroll does not
    /// exist.
    pub async fn mutate<E, F>(&self, id: Uuid, mut apply: F) -> Result<Option<Payroll>, E>
    where
        F: FnMut(&mut Payroll) -> Result<(), E>,
        E: From<StoreError>,
    {
        let mut attempts = 0;
        loop {
            let Some(mut payroll) = self.store.find_payroll(id).await else {
                return Ok(None);
            };
            apply(&mut payroll)?;
            payroll.recalculate();
            payroll.updated_at = Utc::now();
            match self.store.replace_payroll(payroll).await {
                Ok(saved) => return Ok(Some(saved)),
                // Deleted between the read and the write; the retry read
                // settles it as gone.
                Err(StoreError::NotFound(_)) => {}
                Err(StoreError::Conflict(_)) if attempts + 1 < REPLACE_ATTEMPTS => {
                    attempts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
