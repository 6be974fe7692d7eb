pub mod config;
pub mod database;
pub mod error;
pub mod money;
pub mod services;
pub mod tax;

pub use config::Config;
pub use database::{MemoryStore, StoreError};
pub use error::EngineError;
pub use services::{BatchService, PayStubService, PayrollService};

use database::repositories::{PayStubRepository, PayrollRepository, PayrollRunRepository};

/// The assembled engine: one service per concern, all sharing a store.
pub struct Engine {
    pub payrolls: PayrollService,
    pub batches: BatchService,
    pub pay_stubs: PayStubService,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self::with_store(config, MemoryStore::new())
    }

    /// Wires the services around an existing store, for callers that share
    /// one store across engines or pre-seed it.
    pub fn with_store(config: Config, store: MemoryStore) -> Self {
        let payroll_repository = PayrollRepository::new(store.clone());
        let run_repository = PayrollRunRepository::new(store.clone());
        let pay_stub_repository = PayStubRepository::new(store.clone());

        Engine {
            payrolls: PayrollService::new(payroll_repository.clone()),
            batches: BatchService::new(config, payroll_repository.clone(), run_repository),
            pay_stubs: PayStubService::new(pay_stub_repository, payroll_repository),
        }
    }
}
