use anyhow::Result;
use std::env;

use crate::tax::TaxTables;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub batch_concurrency: usize,
    pub tax_table_path: Option<String>,
    pub tax_tables: TaxTables,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_env_only()
    }

    /// Load configuration from environment variables only (without loading .env files)
    /// This is useful for testing where you want to control the environment directly
    pub fn from_env_only() -> Result<Self> {
        let tax_table_path = env::var("TAX_TABLE_PATH").ok();
        let tax_tables = match &tax_table_path {
            Some(path) => TaxTables::from_json_file(path)?,
            None => TaxTables::default(),
        };

        Ok(Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            batch_concurrency: env::var("BATCH_CONCURRENCY")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4)
                .max(1),
            tax_table_path,
            tax_tables,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
