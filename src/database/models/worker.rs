use serde::{Deserialize, Serialize};

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ContractKind {
        Salaried => "salaried",
        Contractor => "contractor"
    }
}

impl Default for ContractKind {
    fn default() -> Self {
        ContractKind::Salaried
    }
}

/// One row of the roster handed to a batch run. This is external input: the
/// salary arrives as a float and the id as free text, so both get validated
/// before anything is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRecord {
    pub worker_id: String,
    pub name: String,
    #[serde(default)]
    pub contract: ContractKind,
    pub monthly_salary: f64,
    #[serde(default)]
    pub dependents: u32,
}
