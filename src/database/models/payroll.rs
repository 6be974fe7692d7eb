use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use crate::money;

string_enum! {
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum PayrollStatus {
        Draft => "draft",
        Processing => "processing",
        Completed => "completed",
        Canceled => "canceled"
    }
}

impl Default for PayrollStatus {
    fn default() -> Self {
        PayrollStatus::Draft
    }
}

impl PayrollStatus {
    /// Line items and the base salary may change while drafting and again
    /// after completion (late corrections). Never mid-run, never once canceled.
    pub fn allows_item_changes(&self) -> bool {
        matches!(self, PayrollStatus::Draft | PayrollStatus::Completed)
    }

    pub fn can_transition_to(&self, next: &PayrollStatus) -> bool {
        match self {
            PayrollStatus::Draft => !matches!(next, PayrollStatus::Draft),
            PayrollStatus::Processing => {
                matches!(next, PayrollStatus::Completed | PayrollStatus::Canceled)
            }
            PayrollStatus::Completed | PayrollStatus::Canceled => false,
        }
    }
}

string_enum! {
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum AdjustmentKind {
        Percentage => "percentage",
        Fixed => "fixed"
    }
}

string_enum! {
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum AdjustmentCategory {
        Deduction => "deduction",
        Benefit => "benefit",
        Additional => "additional"
    }
}

/// A named line item attached to a payroll. `value` is either a fixed
/// currency amount or a percentage of the base gross salary, depending on
/// `kind`. The sign is taken as given; negative values are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub kind: AdjustmentKind,
    pub value: BigDecimal,
}

impl Adjustment {
    pub fn new(input: AdjustmentInput) -> Self {
        Adjustment {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            kind: input.kind,
            value: input.value,
        }
    }

    /// Currency amount this item contributes against the given base salary,
    /// rounded to cents.
    pub fn resolved_value(&self, base: &BigDecimal) -> BigDecimal {
        match self.kind {
            AdjustmentKind::Percentage => {
                money::to_cents(&(base * &self.value / BigDecimal::from(100)))
            }
            AdjustmentKind::Fixed => money::to_cents(&self.value),
        }
    }
}

/// Sum of the resolved values of a line-item collection. Items are rounded
/// individually first, so this total matches what a reader gets by adding up
/// the printed lines.
pub fn resolve_total(items: &[Adjustment], base: &BigDecimal) -> BigDecimal {
    let total = items
        .iter()
        .fold(BigDecimal::from(0), |acc, item| acc + item.resolved_value(base));
    money::to_cents(&total)
}

/// Per-worker payroll for one month. One document per (workerId, month, year).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payroll {
    pub id: Uuid,
    pub version: i64,
    pub worker_id: String,
    pub worker_name: String,
    pub month: u32,
    pub year: i32,
    pub status: PayrollStatus,
    pub base_gross_salary: BigDecimal,
    pub deductions: Vec<Adjustment>,
    pub benefits: Vec<Adjustment>,
    pub additionals: Vec<Adjustment>,
    pub total_deductions: BigDecimal,
    pub total_benefits: BigDecimal,
    pub total_additionals: BigDecimal,
    pub net_salary: BigDecimal,
    pub processed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayrollInput {
    pub worker_id: String,
    pub worker_name: String,
    pub month: u32,
    pub year: i32,
    pub base_gross_salary: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentInput {
    pub name: String,
    pub description: Option<String>,
    pub kind: AdjustmentKind,
    pub value: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAdjustmentInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub kind: Option<AdjustmentKind>,
    pub value: Option<BigDecimal>,
}

impl Payroll {
    pub fn new(input: CreatePayrollInput) -> Self {
        let now = Utc::now();
        let mut payroll = Payroll {
            id: Uuid::new_v4(),
            version: 0,
            worker_id: input.worker_id,
            worker_name: input.worker_name,
            month: input.month,
            year: input.year,
            status: PayrollStatus::default(),
            base_gross_salary: money::to_cents(&input.base_gross_salary),
            deductions: Vec::new(),
            benefits: Vec::new(),
            additionals: Vec::new(),
            total_deductions: BigDecimal::from(0),
            total_benefits: BigDecimal::from(0),
            total_additionals: BigDecimal::from(0),
            net_salary: BigDecimal::from(0),
            processed_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        payroll.recalculate();
        payroll
    }

    /// Re-derives every stored total from the line items and base salary.
    /// Idempotent: calling it twice in a row changes nothing.
    pub fn recalculate(&mut self) {
        self.total_deductions = resolve_total(&self.deductions, &self.base_gross_salary);
        self.total_benefits = resolve_total(&self.benefits, &self.base_gross_salary);
        self.total_additionals = resolve_total(&self.additionals, &self.base_gross_salary);
        self.net_salary = money::to_cents(
            &(&self.base_gross_salary + &self.total_additionals + &self.total_benefits
                - &self.total_deductions),
        );
    }

    pub fn items_mut(&mut self, category: &AdjustmentCategory) -> &mut Vec<Adjustment> {
        match category {
            AdjustmentCategory::Deduction => &mut self.deductions,
            AdjustmentCategory::Benefit => &mut self.benefits,
            AdjustmentCategory::Additional => &mut self.additionals,
        }
    }

    /// Looks an adjustment up by id across all three collections.
    pub fn adjustment_mut(&mut self, adjustment_id: Uuid) -> Option<&mut Adjustment> {
        self.deductions
            .iter_mut()
            .chain(self.benefits.iter_mut())
            .chain(self.additionals.iter_mut())
            .find(|item| item.id == adjustment_id)
    }

    /// Removes an adjustment by id from whichever collection holds it.
    pub fn take_adjustment(&mut self, adjustment_id: Uuid) -> Option<Adjustment> {
        for items in [
            &mut self.deductions,
            &mut self.benefits,
            &mut self.additionals,
        ] {
            if let Some(index) = items.iter().position(|item| item.id == adjustment_id) {
                return Some(items.remove(index));
            }
        }
        None
    }
}
