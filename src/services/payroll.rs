use bigdecimal::BigDecimal;
use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{
    Adjustment, AdjustmentCategory, AdjustmentInput, CreatePayrollInput, Payroll, PayrollStatus,
    UpdateAdjustmentInput,
};
use crate::database::repositories::{PayrollRepository, REPLACE_ATTEMPTS};
use crate::database::store::StoreError;
use crate::error::EngineError;
use crate::money;

use super::ensure_valid_month;

#[derive(Clone)]
pub struct PayrollService {
    payroll_repository: PayrollRepository,
}

impl PayrollService {
    pub fn new(payroll_repository: PayrollRepository) -> Self {
        Self { payroll_repository }
    }

    pub async fn create_payroll(&self, input: CreatePayrollInput) -> Result<Payroll, EngineError> {
        ensure_valid_month(input.month)?;

        let worker_id = input.worker_id.trim().to_string();
        if worker_id.is_empty() {
            return Err(EngineError::invalid_state(
                "worker id must not be empty".to_string(),
            ));
        }

        let payroll = Payroll::new(CreatePayrollInput {
            worker_id,
            ..input
        });
        match self.payroll_repository.insert(payroll).await {
            Ok(saved) => Ok(saved),
            // The period is already taken for this worker.
            Err(StoreError::Duplicate(message)) => Err(EngineError::invalid_state(message)),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_payroll(&self, payroll_id: Uuid) -> Result<Payroll, EngineError> {
        self.payroll_repository
            .find_by_id(payroll_id)
            .await
            .ok_or_else(|| payroll_not_found(payroll_id))
    }

    pub async fn list_payrolls(&self, month: u32, year: i32) -> Result<Vec<Payroll>, EngineError> {
        ensure_valid_month(month)?;
        Ok(self.payroll_repository.list_by_period(month, year).await)
    }

    /// Adds a line item to one of the three collections. Totals come back
    /// recalculated.
    pub async fn add_adjustment(
        &self,
        payroll_id: Uuid,
        category: AdjustmentCategory,
        input: AdjustmentInput,
    ) -> Result<Payroll, EngineError> {
        let adjustment = Adjustment::new(input);
        self.payroll_repository
            .mutate::<EngineError, _>(payroll_id, |payroll| {
                ensure_items_mutable(payroll)?;
                payroll.items_mut(&category).push(adjustment.clone());
                Ok(())
            })
            .await?
            .ok_or_else(|| payroll_not_found(payroll_id))
    }

    /// Partial update of a line item, looked up by id across all three
    /// collections.
    pub async fn update_adjustment(
        &self,
        payroll_id: Uuid,
        adjustment_id: Uuid,
        input: UpdateAdjustmentInput,
    ) -> Result<Payroll, EngineError> {
        self.payroll_repository
            .mutate::<EngineError, _>(payroll_id, |payroll| {
                ensure_items_mutable(payroll)?;
                let adjustment = payroll
                    .adjustment_mut(adjustment_id)
                    .ok_or_else(|| adjustment_not_found(adjustment_id))?;
                if let Some(name) = &input.name {
                    adjustment.name = name.clone();
                }
                if let Some(description) = &input.description {
                    adjustment.description = Some(description.clone());
                }
                if let Some(kind) = &input.kind {
                    adjustment.kind = kind.clone();
                }
                if let Some(value) = &input.value {
                    adjustment.value = value.clone();
                }
                Ok(())
            })
            .await?
            .ok_or_else(|| payroll_not_found(payroll_id))
    }

    pub async fn remove_adjustment(
        &self,
        payroll_id: Uuid,
        adjustment_id: Uuid,
    ) -> Result<Payroll, EngineError> {
        self.payroll_repository
            .mutate::<EngineError, _>(payroll_id, |payroll| {
                ensure_items_mutable(payroll)?;
                payroll
                    .take_adjustment(adjustment_id)
                    .ok_or_else(|| adjustment_not_found(adjustment_id))?;
                Ok(())
            })
            .await?
            .ok_or_else(|| payroll_not_found(payroll_id))
    }

    pub async fn set_base_salary(
        &self,
        payroll_id: Uuid,
        amount: BigDecimal,
    ) -> Result<Payroll, EngineError> {
        self.payroll_repository
            .mutate::<EngineError, _>(payroll_id, |payroll| {
                ensure_items_mutable(payroll)?;
                payroll.base_gross_salary = money::to_cents(&amount);
                Ok(())
            })
            .await?
            .ok_or_else(|| payroll_not_found(payroll_id))
    }

    pub async fn set_notes(
        &self,
        payroll_id: Uuid,
        notes: Option<String>,
    ) -> Result<Payroll, EngineError> {
        self.payroll_repository
            .mutate::<EngineError, _>(payroll_id, |payroll| {
                ensure_items_mutable(payroll)?;
                payroll.notes = notes.clone();
                Ok(())
            })
            .await?
            .ok_or_else(|| payroll_not_found(payroll_id))
    }

    /// Drives the payroll to `completed` or `canceled`. Repeating a request
    /// the payroll already satisfies is a no-op; anything the state machine
    /// forbids is an error. `processedAt` is stamped on the first completion
    /// and never overwritten.
    pub async fn set_status(
        &self,
        payroll_id: Uuid,
        status: PayrollStatus,
    ) -> Result<Payroll, EngineError> {
        if !matches!(
            status,
            PayrollStatus::Completed | PayrollStatus::Canceled
        ) {
            return Err(EngineError::invalid_state(format!(
                "payroll status can only be set to completed or canceled, not {status}"
            )));
        }

        let mut attempts = 0;
        loop {
            let mut payroll = self
                .payroll_repository
                .find_by_id(payroll_id)
                .await
                .ok_or_else(|| payroll_not_found(payroll_id))?;

            if payroll.status == status {
                return Ok(payroll);
            }
            if !payroll.status.can_transition_to(&status) {
                return Err(EngineError::invalid_state(format!(
                    "payroll {} cannot move from {} to {}",
                    payroll.id, payroll.status, status
                )));
            }

            payroll.status = status.clone();
            if payroll.status == PayrollStatus::Completed && payroll.processed_at.is_none() {
                payroll.processed_at = Some(Utc::now());
            }
            payroll.updated_at = Utc::now();

            match self.payroll_repository.replace(payroll).await {
                Ok(saved) => return Ok(saved),
                Err(StoreError::NotFound(_)) => {}
                Err(StoreError::Conflict(_)) if attempts + 1 < REPLACE_ATTEMPTS => {
                    attempts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Removes a payroll outright. Refused once a pay stub has been issued
    /// against it.
    pub async fn delete_payroll(&self, payroll_id: Uuid) -> Result<(), EngineError> {
        match self.payroll_repository.delete(payroll_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(payroll_not_found(payroll_id)),
            Err(StoreError::Conflict(message)) => Err(EngineError::invalid_state(message)),
            Err(err) => Err(err.into()),
        }
    }
}

fn ensure_items_mutable(payroll: &Payroll) -> Result<(), EngineError> {
    if payroll.status.allows_item_changes() {
        Ok(())
    } else {
        Err(EngineError::invalid_state(format!(
            "payroll {} is {} and cannot be modified",
            payroll.id, payroll.status
        )))
    }
}

fn payroll_not_found(payroll_id: Uuid) -> EngineError {
    EngineError::not_found(format!("payroll {payroll_id}"))
}

fn adjustment_not_found(adjustment_id: Uuid) -> EngineError {
    EngineError::not_found(format!("adjustment {adjustment_id}"))
}
