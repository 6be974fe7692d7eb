pub(crate) mod macros;

pub mod payroll;
pub mod paystub;
pub mod run;
pub mod worker;

// Re-export all models for easy importing
pub use payroll::*;
pub use paystub::*;
pub use run::*;
pub use worker::*;
