pub mod payroll;
pub mod paystub;
pub mod run;

// Re-export all repositories for easy importing
pub use payroll::PayrollRepository;
pub use paystub::PayStubRepository;
pub use run::PayrollRunRepository;

// How often a read-modify-write cycle retries before giving up and
// surfacing the version conflict.
pub(crate) const REPLACE_ATTEMPTS: usize = 5;
