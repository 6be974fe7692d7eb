use bigdecimal::BigDecimal;
use std::env;
use std::str::FromStr;

use fake::Fake;
use fake::faker::name::en::Name;

use payroll_engine::config::Config;
use payroll_engine::database::models::{
    AdjustmentInput, AdjustmentKind, ContractKind, CreatePayrollInput, Payroll, PayrollStatus,
    WorkerRecord,
};
use payroll_engine::tax::TaxTables;
use payroll_engine::Engine;

// Engine wired against a fresh in-memory store
pub struct TestContext {
    pub engine: Engine,
    pub config: Config,
}

impl TestContext {
    pub fn new() -> Self {
        setup_test_env();
        let config = test_config();
        TestContext {
            engine: Engine::new(config.clone()),
            config,
        }
    }
}

pub fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        batch_concurrency: 4,
        tax_table_path: None,
        tax_tables: TaxTables::default(),
    }
}

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

// Mock data generators
pub struct MockData;

impl MockData {
    pub fn worker(worker_id: &str, monthly_salary: f64) -> WorkerRecord {
        WorkerRecord {
            worker_id: worker_id.to_string(),
            name: Name().fake(),
            contract: ContractKind::Salaried,
            monthly_salary,
            dependents: 0,
        }
    }

    #[allow(dead_code)]
    pub fn named_worker(worker_id: &str, name: &str, monthly_salary: f64) -> WorkerRecord {
        WorkerRecord {
            worker_id: worker_id.to_string(),
            name: name.to_string(),
            contract: ContractKind::Salaried,
            monthly_salary,
            dependents: 0,
        }
    }

    #[allow(dead_code)]
    pub fn contractor(worker_id: &str, monthly_salary: f64) -> WorkerRecord {
        WorkerRecord {
            worker_id: worker_id.to_string(),
            name: Name().fake(),
            contract: ContractKind::Contractor,
            monthly_salary,
            dependents: 0,
        }
    }

    pub fn payroll_input(worker_id: &str, month: u32, year: i32, base: &str) -> CreatePayrollInput {
        CreatePayrollInput {
            worker_id: worker_id.to_string(),
            worker_name: Name().fake(),
            month,
            year,
            base_gross_salary: dec(base),
        }
    }

    pub fn fixed_adjustment(name: &str, value: &str) -> AdjustmentInput {
        AdjustmentInput {
            name: name.to_string(),
            description: None,
            kind: AdjustmentKind::Fixed,
            value: dec(value),
        }
    }

    pub fn percentage_adjustment(name: &str, value: &str) -> AdjustmentInput {
        AdjustmentInput {
            name: name.to_string(),
            description: Some(format!("{value}% of base")),
            kind: AdjustmentKind::Percentage,
            value: dec(value),
        }
    }
}

// Creates a payroll and drives it straight to completed, the precondition
// for pay stub generation.
#[allow(dead_code)]
pub async fn completed_payroll(
    ctx: &TestContext,
    worker_id: &str,
    month: u32,
    year: i32,
    base: &str,
) -> Payroll {
    let payroll = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input(worker_id, month, year, base))
        .await
        .expect("Failed to create payroll");
    ctx.engine
        .payrolls
        .set_status(payroll.id, PayrollStatus::Completed)
        .await
        .expect("Failed to complete payroll")
}

pub fn setup_test_env() {
    unsafe {
        env::set_var("RUST_LOG", "debug");
    }
    let _ = env_logger::builder().is_test(true).try_init();
}
