pub mod batch;
pub mod payroll;
pub mod paystub;

pub use batch::BatchService;
pub use payroll::PayrollService;
pub use paystub::PayStubService;

use crate::error::EngineError;

pub(crate) fn ensure_valid_month(month: u32) -> Result<(), EngineError> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(EngineError::invalid_state(format!(
            "month {month} is out of range (1-12)"
        )))
    }
}
