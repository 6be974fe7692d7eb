use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payroll::{Adjustment, AdjustmentKind, Payroll};

/// Sequential document number, unique per period: `YYYYMM-NNNNN`.
pub fn format_document_number(month: u32, year: i32, sequence: u32) -> String {
    format!("{year:04}{month:02}-{sequence:05}")
}

/// One line of a pay stub: the adjustment as configured plus the currency
/// amount it resolved to at issue time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayStubLine {
    pub name: String,
    pub description: Option<String>,
    pub kind: AdjustmentKind,
    pub value: BigDecimal,
    pub resolved_value: BigDecimal,
}

impl PayStubLine {
    fn from_adjustment(item: &Adjustment, base: &BigDecimal) -> Self {
        PayStubLine {
            name: item.name.clone(),
            description: item.description.clone(),
            kind: item.kind.clone(),
            value: item.value.clone(),
            resolved_value: item.resolved_value(base),
        }
    }
}

/// Printable snapshot of a completed payroll. Totals and lines are copied at
/// generation time and never re-derived, so later payroll edits leave an
/// issued stub untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayStub {
    pub id: Uuid,
    pub version: i64,
    pub payroll_id: Uuid,
    pub worker_id: String,
    pub worker_name: String,
    pub month: u32,
    pub year: i32,
    pub document_number: String,
    pub base_gross_salary: BigDecimal,
    pub total_deductions: BigDecimal,
    pub total_benefits: BigDecimal,
    pub total_additionals: BigDecimal,
    pub net_salary: BigDecimal,
    pub deductions: Vec<PayStubLine>,
    pub benefits: Vec<PayStubLine>,
    pub additionals: Vec<PayStubLine>,
    pub signed_by_employee: bool,
    pub signature_date: Option<DateTime<Utc>>,
    pub signature_ip: Option<String>,
    pub signature_token: Option<String>,
    pub pdf_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PayStub {
    pub fn from_payroll(payroll: &Payroll, document_number: String) -> Self {
        let now = Utc::now();
        let base = &payroll.base_gross_salary;
        PayStub {
            id: Uuid::new_v4(),
            version: 0,
            payroll_id: payroll.id,
            worker_id: payroll.worker_id.clone(),
            worker_name: payroll.worker_name.clone(),
            month: payroll.month,
            year: payroll.year,
            document_number,
            base_gross_salary: payroll.base_gross_salary.clone(),
            total_deductions: payroll.total_deductions.clone(),
            total_benefits: payroll.total_benefits.clone(),
            total_additionals: payroll.total_additionals.clone(),
            net_salary: payroll.net_salary.clone(),
            deductions: payroll
                .deductions
                .iter()
                .map(|item| PayStubLine::from_adjustment(item, base))
                .collect(),
            benefits: payroll
                .benefits
                .iter()
                .map(|item| PayStubLine::from_adjustment(item, base))
                .collect(),
            additionals: payroll
                .additionals
                .iter()
                .map(|item| PayStubLine::from_adjustment(item, base))
                .collect(),
            signed_by_employee: false,
            signature_date: None,
            signature_ip: None,
            signature_token: None,
            pdf_url: None,
            notes: payroll.notes.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}
