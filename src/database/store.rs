use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{PayStub, Payroll, PayrollRun};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Duplicate key: {0}")]
    Duplicate(String),
    #[error("Write conflict: {0}")]
    Conflict(String),
}

#[derive(Default)]
struct StoreInner {
    payrolls: HashMap<Uuid, Payroll>,
    // (workerId, month, year) -> payroll id
    payroll_periods: HashMap<(String, u32, i32), Uuid>,
    runs: HashMap<Uuid, PayrollRun>,
    // (month, year) -> run id
    run_periods: HashMap<(u32, i32), Uuid>,
    pay_stubs: HashMap<Uuid, PayStub>,
    stubs_by_payroll: HashMap<Uuid, Uuid>,
    stub_numbers: HashMap<String, Uuid>,
    // (month, year) -> last issued document sequence; never reset
    sequences: HashMap<(u32, i32), u32>,
}

/// In-memory document store standing in for the persistence layer. All writes
/// go through one lock, and replacements compare the document version before
/// committing, so unique keys and read-modify-write cycles stay correct under
/// concurrent access.
///
/// Cloning is cheap and every clone sees the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub async fn insert_payroll(&self, payroll: Payroll) -> Result<Payroll, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.payrolls.contains_key(&payroll.id) {
            return Err(StoreError::Duplicate(format!("payroll id {}", payroll.id)));
        }
        let period_key = (payroll.worker_id.clone(), payroll.month, payroll.year);
        if inner.payroll_periods.contains_key(&period_key) {
            return Err(StoreError::Duplicate(format!(
                "payroll already exists for worker {} in {}/{}",
                payroll.worker_id, payroll.month, payroll.year
            )));
        }
        inner.payroll_periods.insert(period_key, payroll.id);
        inner.payrolls.insert(payroll.id, payroll.clone());
        Ok(payroll)
    }

    pub async fn find_payroll(&self, id: Uuid) -> Option<Payroll> {
        self.inner.read().await.payrolls.get(&id).cloned()
    }

    pub async fn find_payroll_by_worker_period(
        &self,
        worker_id: &str,
        month: u32,
        year: i32,
    ) -> Option<Payroll> {
        let inner = self.inner.read().await;
        let id = inner
            .payroll_periods
            .get(&(worker_id.to_string(), month, year))?;
        inner.payrolls.get(id).cloned()
    }

    pub async fn list_payrolls(&self, month: u32, year: i32) -> Vec<Payroll> {
        self.inner
            .read()
            .await
            .payrolls
            .values()
            .filter(|p| p.month == month && p.year == year)
            .cloned()
            .collect()
    }

    /// Replaces a payroll if the caller's version matches the stored one.
    /// The committed document comes back with its version bumped. Natural-key
    /// fields (workerId, month, year) do not change after insert and are not
    /// re-indexed here.
    pub async fn replace_payroll(&self, payroll: Payroll) -> Result<Payroll, StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .payrolls
            .get_mut(&payroll.id)
            .ok_or_else(|| StoreError::NotFound(format!("payroll {}", payroll.id)))?;
        if stored.version != payroll.version {
            return Err(StoreError::Conflict(format!(
                "payroll {} was modified concurrently (version {} != {})",
                payroll.id, stored.version, payroll.version
            )));
        }
        let mut committed = payroll;
        committed.version += 1;
        *stored = committed.clone();
        Ok(committed)
    }

    /// Removes a payroll. Refuses while a pay stub references it, since the
    /// stub's snapshot would otherwise point at nothing.
    pub async fn delete_payroll(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.stubs_by_payroll.contains_key(&id) {
            return Err(StoreError::Conflict(format!(
                "payroll {id} has an issued pay stub"
            )));
        }
        let Some(payroll) = inner.payrolls.remove(&id) else {
            return Ok(false);
        };
        inner
            .payroll_periods
            .remove(&(payroll.worker_id.clone(), payroll.month, payroll.year));
        Ok(true)
    }

    pub async fn insert_run(&self, run: PayrollRun) -> Result<PayrollRun, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.runs.contains_key(&run.id) {
            return Err(StoreError::Duplicate(format!("run id {}", run.id)));
        }
        if inner.run_periods.contains_key(&(run.month, run.year)) {
            return Err(StoreError::Duplicate(format!(
                "payroll run already exists for {}/{}",
                run.month, run.year
            )));
        }
        inner.run_periods.insert((run.month, run.year), run.id);
        inner.runs.insert(run.id, run.clone());
        Ok(run)
    }

    pub async fn find_run(&self, id: Uuid) -> Option<PayrollRun> {
        self.inner.read().await.runs.get(&id).cloned()
    }

    pub async fn find_run_by_period(&self, month: u32, year: i32) -> Option<PayrollRun> {
        let inner = self.inner.read().await;
        let id = inner.run_periods.get(&(month, year))?;
        inner.runs.get(id).cloned()
    }

    pub async fn replace_run(&self, run: PayrollRun) -> Result<PayrollRun, StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .runs
            .get_mut(&run.id)
            .ok_or_else(|| StoreError::NotFound(format!("payroll run {}", run.id)))?;
        if stored.version != run.version {
            return Err(StoreError::Conflict(format!(
                "payroll run {} was modified concurrently (version {} != {})",
                run.id, stored.version, run.version
            )));
        }
        let mut committed = run;
        committed.version += 1;
        *stored = committed.clone();
        Ok(committed)
    }

    pub async fn insert_pay_stub(&self, stub: PayStub) -> Result<PayStub, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.pay_stubs.contains_key(&stub.id) {
            return Err(StoreError::Duplicate(format!("pay stub id {}", stub.id)));
        }
        if inner.stubs_by_payroll.contains_key(&stub.payroll_id) {
            return Err(StoreError::Duplicate(format!(
                "pay stub already exists for payroll {}",
                stub.payroll_id
            )));
        }
        if inner.stub_numbers.contains_key(&stub.document_number) {
            return Err(StoreError::Duplicate(format!(
                "document number {} already issued",
                stub.document_number
            )));
        }
        inner.stubs_by_payroll.insert(stub.payroll_id, stub.id);
        inner
            .stub_numbers
            .insert(stub.document_number.clone(), stub.id);
        inner.pay_stubs.insert(stub.id, stub.clone());
        Ok(stub)
    }

    pub async fn find_pay_stub(&self, id: Uuid) -> Option<PayStub> {
        self.inner.read().await.pay_stubs.get(&id).cloned()
    }

    pub async fn find_pay_stub_by_payroll(&self, payroll_id: Uuid) -> Option<PayStub> {
        let inner = self.inner.read().await;
        let id = inner.stubs_by_payroll.get(&payroll_id)?;
        inner.pay_stubs.get(id).cloned()
    }

    pub async fn list_pay_stubs(&self, month: u32, year: i32) -> Vec<PayStub> {
        self.inner
            .read()
            .await
            .pay_stubs
            .values()
            .filter(|s| s.month == month && s.year == year)
            .cloned()
            .collect()
    }

    pub async fn replace_pay_stub(&self, stub: PayStub) -> Result<PayStub, StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .pay_stubs
            .get_mut(&stub.id)
            .ok_or_else(|| StoreError::NotFound(format!("pay stub {}", stub.id)))?;
        if stored.version != stub.version {
            return Err(StoreError::Conflict(format!(
                "pay stub {} was modified concurrently (version {} != {})",
                stub.id, stored.version, stub.version
            )));
        }
        let mut committed = stub;
        committed.version += 1;
        *stored = committed.clone();
        Ok(committed)
    }

    /// Removes a pay stub. A signed stub is a legal record and stays put.
    pub async fn delete_pay_stub(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.pay_stubs.get(&id) {
            None => return Ok(false),
            Some(stub) if stub.signed_by_employee => {
                return Err(StoreError::Conflict(format!("pay stub {id} is signed")));
            }
            Some(_) => {}
        }
        if let Some(stub) = inner.pay_stubs.remove(&id) {
            inner.stubs_by_payroll.remove(&stub.payroll_id);
            inner.stub_numbers.remove(&stub.document_number);
        }
        Ok(true)
    }

    /// Next document sequence for a period. Allocated numbers are never handed
    /// out twice, even when the stub they were meant for is discarded.
    pub async fn next_document_sequence(&self, month: u32, year: i32) -> u32 {
        let mut inner = self.inner.write().await;
        let counter = inner.sequences.entry((month, year)).or_insert(0);
        *counter += 1;
        *counter
    }
}
