use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{PayStub, PayrollStatus};
use crate::database::repositories::{PayStubRepository, PayrollRepository, REPLACE_ATTEMPTS};
use crate::database::store::StoreError;
use crate::error::EngineError;

use super::ensure_valid_month;

/// Generate an opaque signature acknowledgement token
fn generate_signature_token() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                                abcdefghijklmnopqrstuvwxyz\
                                0123456789";
    const TOKEN_LEN: usize = 32;
    let mut rng = rand::rng();

    (0..TOKEN_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[derive(Clone)]
pub struct PayStubService {
    pay_stub_repository: PayStubRepository,
    payroll_repository: PayrollRepository,
}

impl PayStubService {
    pub fn new(
        pay_stub_repository: PayStubRepository,
        payroll_repository: PayrollRepository,
    ) -> Self {
        Self {
            pay_stub_repository,
            payroll_repository,
        }
    }

    /// Issues the pay stub for a completed payroll: a frozen snapshot of its
    /// amounts under a fresh sequential document number. Idempotent; asking
    /// again returns the stub that already exists.
    pub async fn generate(&self, payroll_id: Uuid) -> Result<PayStub, EngineError> {
        if let Some(existing) = self.pay_stub_repository.find_by_payroll(payroll_id).await {
            log::debug!(
                "pay stub {} already issued for payroll {}",
                existing.document_number,
                payroll_id
            );
            return Ok(existing);
        }

        let payroll = self
            .payroll_repository
            .find_by_id(payroll_id)
            .await
            .ok_or_else(|| EngineError::not_found(format!("payroll {payroll_id}")))?;
        if payroll.status != PayrollStatus::Completed {
            return Err(EngineError::invalid_state(format!(
                "pay stub requires a completed payroll, {} is {}",
                payroll.id, payroll.status
            )));
        }

        let document_number = self
            .pay_stub_repository
            .next_document_number(payroll.month, payroll.year)
            .await;
        let stub = PayStub::from_payroll(&payroll, document_number);

        match self.pay_stub_repository.insert(stub).await {
            Ok(stub) => {
                log::info!(
                    "issued pay stub {} for worker {} ({}/{})",
                    stub.document_number,
                    stub.worker_id,
                    stub.month,
                    stub.year
                );
                Ok(stub)
            }
            // Someone generated concurrently; their stub stands, our drawn
            // number stays burned.
            Err(StoreError::Duplicate(_)) => self
                .pay_stub_repository
                .find_by_payroll(payroll_id)
                .await
                .ok_or_else(|| {
                    EngineError::not_found(format!("pay stub for payroll {payroll_id}"))
                }),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get(&self, stub_id: Uuid) -> Result<PayStub, EngineError> {
        self.pay_stub_repository
            .find_by_id(stub_id)
            .await
            .ok_or_else(|| stub_not_found(stub_id))
    }

    pub async fn get_by_payroll(&self, payroll_id: Uuid) -> Result<PayStub, EngineError> {
        self.pay_stub_repository
            .find_by_payroll(payroll_id)
            .await
            .ok_or_else(|| EngineError::not_found(format!("pay stub for payroll {payroll_id}")))
    }

    pub async fn list(&self, month: u32, year: i32) -> Result<Vec<PayStub>, EngineError> {
        ensure_valid_month(month)?;
        Ok(self.pay_stub_repository.list_by_period(month, year).await)
    }

    /// Records the employee's acknowledgement: signature flag, timestamp,
    /// client address and an opaque token. Signing is one-way; once signed,
    /// further calls return the stub as-is and the original signature fields
    /// survive untouched.
    pub async fn sign(&self, stub_id: Uuid, client_ip: &str) -> Result<PayStub, EngineError> {
        let mut attempts = 0;
        loop {
            let mut stub = self
                .pay_stub_repository
                .find_by_id(stub_id)
                .await
                .ok_or_else(|| stub_not_found(stub_id))?;

            if stub.signed_by_employee {
                log::debug!("pay stub {} is already signed", stub.document_number);
                return Ok(stub);
            }

            stub.signed_by_employee = true;
            stub.signature_date = Some(Utc::now());
            stub.signature_ip = Some(client_ip.to_string());
            stub.signature_token = Some(generate_signature_token());
            stub.updated_at = Utc::now();

            match self.pay_stub_repository.replace(stub).await {
                Ok(saved) => {
                    log::info!(
                        "pay stub {} signed from {}",
                        saved.document_number,
                        client_ip
                    );
                    return Ok(saved);
                }
                Err(StoreError::NotFound(_)) => {}
                // A concurrent signer may have won; the re-read decides.
                Err(StoreError::Conflict(_)) if attempts + 1 < REPLACE_ATTEMPTS => {
                    attempts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Points the stub at its rendered document. The engine only stores the
    /// location; rendering lives elsewhere.
    pub async fn attach_pdf_url(
        &self,
        stub_id: Uuid,
        pdf_url: String,
    ) -> Result<PayStub, EngineError> {
        self.pay_stub_repository
            .mutate(stub_id, |stub| {
                stub.pdf_url = Some(pdf_url.clone());
            })
            .await?
            .ok_or_else(|| stub_not_found(stub_id))
    }

    /// Removes an unsigned stub so the payroll can be corrected and reissued.
    /// A signed stub stays; its document number is a record.
    pub async fn delete(&self, stub_id: Uuid) -> Result<(), EngineError> {
        match self.pay_stub_repository.delete(stub_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(stub_not_found(stub_id)),
            Err(StoreError::Conflict(message)) => Err(EngineError::invalid_state(message)),
            Err(err) => Err(err.into()),
        }
    }
}

fn stub_not_found(stub_id: Uuid) -> EngineError {
    EngineError::not_found(format!("pay stub {stub_id}"))
}
