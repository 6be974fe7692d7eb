use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payroll::PayrollStatus;
use super::worker::{ContractKind, WorkerRecord};

/// Aggregated result of processing one period's roster. One document per
/// (month, year); re-running a batch replaces its entries and totals
/// wholesale instead of merging into them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollRun {
    pub id: Uuid,
    pub version: i64,
    pub month: u32,
    pub year: i32,
    pub status: PayrollStatus,
    pub employee_count: i64,
    pub total_gross: BigDecimal,
    pub total_deductions: BigDecimal,
    pub total_net: BigDecimal,
    pub fallback_count: i64,
    pub entries: Vec<PayrollRunEntry>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PayrollRun {
    pub fn new(month: u32, year: i32) -> Self {
        let now = Utc::now();
        PayrollRun {
            id: Uuid::new_v4(),
            version: 0,
            month,
            year,
            status: PayrollStatus::default(),
            employee_count: 0,
            total_gross: BigDecimal::from(0),
            total_deductions: BigDecimal::from(0),
            total_net: BigDecimal::from(0),
            fallback_count: 0,
            entries: Vec::new(),
            processed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One worker's line in a payroll run. Statutory withholdings live here and
/// on the pay stub snapshot; the per-worker payroll document only carries its
/// own line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollRunEntry {
    pub worker_id: String,
    pub worker_name: String,
    pub payroll_id: Uuid,
    pub contract: ContractKind,
    pub gross_salary: BigDecimal,
    pub social_security: BigDecimal,
    pub income_tax: BigDecimal,
    pub other_deductions: BigDecimal,
    pub total_benefits: BigDecimal,
    pub total_additionals: BigDecimal,
    pub total_deductions: BigDecimal,
    pub net_salary: BigDecimal,
    pub used_fallback: bool,
}

/// A roster row the batch could not process, with the reason it was passed
/// over. Skips never abort the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedWorker {
    pub worker_id: String,
    pub worker_name: String,
    pub reason: String,
}

impl SkippedWorker {
    pub fn new(worker: &WorkerRecord, reason: impl Into<String>) -> Self {
        SkippedWorker {
            worker_id: worker.worker_id.clone(),
            worker_name: worker.name.clone(),
            reason: reason.into(),
        }
    }
}

/// What a batch run hands back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub run: PayrollRun,
    pub processed: Vec<PayrollRunEntry>,
    pub skipped: Vec<SkippedWorker>,
}
