use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{PayStub, format_document_number};
use crate::database::store::{MemoryStore, StoreError};

use super::REPLACE_ATTEMPTS;

#[derive(Clone)]
pub struct PayStubRepository {
    store: MemoryStore,
}

impl PayStubRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    pub async fn insert(&self, stub: PayStub) -> Result<PayStub, StoreError> {
        self.store.insert_pay_stub(stub).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Option<PayStub> {
        self.store.find_pay_stub(id).await
    }

    pub async fn find_by_payroll(&self, payroll_id: Uuid) -> Option<PayStub> {
        self.store.find_pay_stub_by_payroll(payroll_id).await
    }

    /// Stubs of one period, ordered by document number (that is, by issue
    /// order).
    pub async fn list_by_period(&self, month: u32, year: i32) -> Vec<PayStub> {
        let mut stubs = self.store.list_pay_stubs(month, year).await;
        stubs.sort_by(|a, b| a.document_number.cmp(&b.document_number));
        stubs
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.store.delete_pay_stub(id).await
    }

    /// Version-checked replace for callers that decide against writing after
    /// reading (the signing flow), where `mutate` would commit regardless.
    pub async fn replace(&self, stub: PayStub) -> Result<PayStub, StoreError> {
        self.store.replace_pay_stub(stub).await
    }

    /// Draws the next document number for the period. Each call burns a
    /// sequence value, so a number is never issued twice even when the
    /// insert that follows loses a race.
    pub async fn next_document_number(&self, month: u32, year: i32) -> String {
        let sequence = self.store.next_document_sequence(month, year).await;
        format_document_number(month, year, sequence)
    }

    /// Read-modify-write cycle for a stub, retried a bounded number of times
    /// on version conflicts.
    pub async fn mutate<F>(&self, id: Uuid, apply: F) -> Result<Option<PayStub>, StoreError>
    where
        F: Fn(&mut PayStub),
    {
        let mut attempts = 0;
        loop {
            let Some(mut stub) = self.store.find_pay_stub(id).await else {
                return Ok(None);
            };
            apply(&mut stub);
            stub.updated_at = Utc::now();
            match self.store.replace_pay_stub(stub).await {
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
