use bigdecimal::BigDecimal;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use uuid::Uuid;

use crate::config::Config;
use crate::database::models::{
    BatchOutcome, ContractKind, CreatePayrollInput, Payroll, PayrollRun, PayrollRunEntry,
    PayrollStatus, SkippedWorker, WorkerRecord,
};
use crate::database::repositories::{PayrollRepository, PayrollRunRepository};
use crate::database::store::StoreError;
use crate::error::EngineError;
use crate::money;
use crate::tax;

use super::ensure_valid_month;

#[derive(Clone)]
pub struct BatchService {
    payroll_repository: PayrollRepository,
    run_repository: PayrollRunRepository,
    config: Config,
}

impl BatchService {
    pub fn new(
        config: Config,
        payroll_repository: PayrollRepository,
        run_repository: PayrollRunRepository,
    ) -> Self {
        Self {
            payroll_repository,
            run_repository,
            config,
        }
    }

    /// Processes a whole roster for one period.
    ///
    /// Workers are handled concurrently up to the configured width. A worker
    /// that cannot be processed is reported in the outcome and never takes
    /// the rest of the batch down with it. The period's run document ends up
    /// with its entries and totals replaced wholesale, so re-running a batch
    /// is idempotent instead of double-counting.
    pub async fn process_batch(
        &self,
        month: u32,
        year: i32,
        workers: Vec<WorkerRecord>,
    ) -> Result<BatchOutcome, EngineError> {
        ensure_valid_month(month)?;
        let run = self.begin_run(month, year).await?;
        log::info!(
            "processing payroll batch {}/{} with {} roster rows",
            month,
            year,
            workers.len()
        );

        let results: Vec<Result<PayrollRunEntry, SkippedWorker>> = stream::iter(workers)
            .map(|worker| self.process_worker(month, year, worker))
            .buffer_unordered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        let mut entries = Vec::new();
        let mut skipped = Vec::new();
        for result in results {
            match result {
                Ok(entry) => entries.push(entry),
                Err(skip) => {
                    log::warn!(
                        "skipping worker {:?} in {}/{}: {}",
                        skip.worker_id,
                        month,
                        year,
                        skip.reason
                    );
                    skipped.push(skip);
                }
            }
        }
        // Deterministic order no matter how the concurrent work interleaved.
        entries.sort_by(|a, b| {
            a.worker_name
                .cmp(&b.worker_name)
                .then_with(|| a.worker_id.cmp(&b.worker_id))
        });

        let run = self.commit_run(run.id, month, year, entries).await?;
        log::info!(
            "payroll batch {}/{} done: {} processed, {} skipped, total net {}",
            month,
            year,
            run.employee_count,
            skipped.len(),
            run.total_net
        );
        Ok(BatchOutcome {
            processed: run.entries.clone(),
            run,
            skipped,
        })
    }

    /// Finds or creates the period's run document and marks it processing.
    /// Prior entries are discarded up front so a crashed re-run never leaves
    /// a half-merged picture behind.
    async fn begin_run(&self, month: u32, year: i32) -> Result<PayrollRun, EngineError> {
        let run = match self.run_repository.find_by_period(month, year).await {
            Some(run) => run,
            None => match self.run_repository.insert(PayrollRun::new(month, year)).await {
                Ok(run) => run,
                // Lost the create race; another batch owns the document now.
                Err(StoreError::Duplicate(_)) => self
                    .run_repository
                    .find_by_period(month, year)
                    .await
                    .ok_or_else(|| run_not_found(month, year))?,
                Err(err) => return Err(err.into()),
            },
        };

        self.run_repository
            .mutate(run.id, |run| {
                run.status = PayrollStatus::Processing;
                run.entries.clear();
            })
            .await?
            .ok_or_else(|| run_not_found(month, year))
    }

    /// Folds the processed entries into the run document: totals replaced,
    /// never merged into previous ones.
    async fn commit_run(
        &self,
        run_id: Uuid,
        month: u32,
        year: i32,
        entries: Vec<PayrollRunEntry>,
    ) -> Result<PayrollRun, EngineError> {
        let mut total_gross = BigDecimal::from(0);
        let mut total_deductions = BigDecimal::from(0);
        let mut total_net = BigDecimal::from(0);
        let mut fallback_count = 0i64;
        for entry in &entries {
            total_gross += &entry.gross_salary;
            total_deductions += &entry.total_deductions;
            total_net += &entry.net_salary;
            if entry.used_fallback {
                fallback_count += 1;
            }
        }
        let total_gross = money::to_cents(&total_gross);
        let total_deductions = money::to_cents(&total_deductions);
        let total_net = money::to_cents(&total_net);

        self.run_repository
            .mutate(run_id, move |run| {
                run.entries = entries.clone();
                run.employee_count = entries.len() as i64;
                run.total_gross = total_gross.clone();
                run.total_deductions = total_deductions.clone();
                run.total_net = total_net.clone();
                run.fallback_count = fallback_count;
                run.status = PayrollStatus::Completed;
                if run.processed_at.is_none() {
                    run.processed_at = Some(Utc::now());
                }
            })
            .await?
            .ok_or_else(|| run_not_found(month, year))
    }

    /// Processes a single roster row into a run entry, creating or refreshing
    /// the worker's payroll for the period along the way. Every failure mode
    /// turns into a skip; the siblings keep going.
    async fn process_worker(
        &self,
        month: u32,
        year: i32,
        worker: WorkerRecord,
    ) -> Result<PayrollRunEntry, SkippedWorker> {
        let worker_id = worker.worker_id.trim().to_string();
        if worker_id.is_empty() {
            return Err(SkippedWorker::new(&worker, "missing worker id"));
        }

        // The only place float input enters the engine. A salary that is not
        // a finite number becomes a zero gross, flagged for review.
        let (gross, used_fallback) = match money::validated_amount(worker.monthly_salary) {
            Some(amount) => (money::to_cents(&amount), false),
            None => {
                log::warn!(
                    "worker {}: salary {} is not a finite amount, falling back to 0",
                    worker_id,
                    worker.monthly_salary
                );
                (money::to_cents(&BigDecimal::from(0)), true)
            }
        };

        let payroll = match self
            .payroll_repository
            .find_by_worker_period(&worker_id, month, year)
            .await
        {
            Some(payroll) => payroll,
            None => {
                let fresh = Payroll::new(CreatePayrollInput {
                    worker_id: worker_id.clone(),
                    worker_name: worker.name.clone(),
                    month,
                    year,
                    base_gross_salary: gross.clone(),
                });
                match self.payroll_repository.insert(fresh).await {
                    Ok(payroll) => payroll,
                    // Another worker task or a manual create got there first.
                    Err(StoreError::Duplicate(_)) => {
                        match self
                            .payroll_repository
                            .find_by_worker_period(&worker_id, month, year)
                            .await
                        {
                            Some(payroll) => payroll,
                            None => {
                                return Err(SkippedWorker::new(
                                    &worker,
                                    "payroll vanished while processing",
                                ));
                            }
                        }
                    }
                    Err(err) => return Err(SkippedWorker::new(&worker, err.to_string())),
                }
            }
        };

        if payroll.status == PayrollStatus::Canceled {
            return Err(SkippedWorker::new(
                &worker,
                "payroll is canceled for this period",
            ));
        }

        // Refresh the aggregate from the roster and walk it through the
        // lifecycle. An already completed payroll keeps its status and its
        // original processedAt; this is the correction path.
        let refresh = self
            .payroll_repository
            .mutate::<EngineError, _>(payroll.id, |payroll| {
                payroll.worker_name = worker.name.clone();
                payroll.base_gross_salary = gross.clone();
                if payroll.status == PayrollStatus::Draft {
                    payroll.status = PayrollStatus::Processing;
                }
                Ok(())
            })
            .await;
        match refresh {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(SkippedWorker::new(&worker, "payroll vanished while processing"));
            }
            Err(err) => return Err(SkippedWorker::new(&worker, err.to_string())),
        }

        let social_security = match worker.contract {
            ContractKind::Salaried => tax::statutory_withholding(&self.config.tax_tables, &gross),
            ContractKind::Contractor => money::to_cents(&BigDecimal::from(0)),
        };
        let income_tax = tax::income_tax_withholding(
            &self.config.tax_tables,
            &gross,
            &social_security,
            worker.dependents,
        );

        let completed = self
            .payroll_repository
            .mutate::<EngineError, _>(payroll.id, |payroll| {
                if payroll.status == PayrollStatus::Processing {
                    payroll.status = PayrollStatus::Completed;
                }
                if payroll.status == PayrollStatus::Completed && payroll.processed_at.is_none() {
                    payroll.processed_at = Some(Utc::now());
                }
                Ok(())
            })
            .await;
        let payroll = match completed {
            Ok(Some(payroll)) => payroll,
            Ok(None) => {
                return Err(SkippedWorker::new(&worker, "payroll vanished while processing"));
            }
            Err(err) => return Err(SkippedWorker::new(&worker, err.to_string())),
        };

        let total_deductions =
            money::to_cents(&(&payroll.total_deductions + &social_security + &income_tax));
        let net_salary = money::to_cents(
            &(&gross + &payroll.total_additionals + &payroll.total_benefits - &total_deductions),
        );

        Ok(PayrollRunEntry {
            worker_id,
            worker_name: payroll.worker_name.clone(),
            payroll_id: payroll.id,
            contract: worker.contract.clone(),
            gross_salary: gross,
            social_security,
            income_tax,
            other_deductions: payroll.total_deductions.clone(),
            total_benefits: payroll.total_benefits.clone(),
            total_additionals: payroll.total_additionals.clone(),
            total_deductions,
            net_salary,
            used_fallback,
        })
    }
}

fn run_not_found(month: u32, year: i32) -> EngineError {
    EngineError::not_found(format!("payroll run {month}/{year}"))
}
