use anyhow::Context;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::str::FromStr;
use thiserror::Error;

use crate::money;

/// One tier of a progressive table. `offset` is the tax accumulated over all
/// lower tiers, so the amount for a base landing in this tier is
/// `offset + (base - lower) * rate / 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub lower: BigDecimal,
    pub rate: BigDecimal,
    pub offset: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeTaxTable {
    pub exemption_threshold: BigDecimal,
    pub per_dependent_deduction: BigDecimal,
    pub flat_deduction: BigDecimal,
    pub brackets: Vec<Bracket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxTables {
    pub social_security: Vec<Bracket>,
    pub income_tax: IncomeTaxTable,
    pub employer_contribution_rate: BigDecimal,
}

#[derive(Error, Debug)]
pub enum TaxTableError {
    #[error("{0} bracket table is empty")]
    Empty(&'static str),
    #[error("{0} bracket table must start at 0, found {1}")]
    BadFirstBound(&'static str, BigDecimal),
    #[error("{0} bracket table bounds must be strictly ascending")]
    Unsorted(&'static str),
    #[error("{0} bracket table has a negative rate")]
    NegativeRate(&'static str),
}

impl Default for TaxTables {
    fn default() -> Self {
        TaxTables {
            social_security: vec![
                bracket("0", "2.5", "0"),
                bracket("1500", "5", "37.50"),
                bracket("4000", "7.5", "162.50"),
                bracket("8000", "10", "462.50"),
                bracket("15000", "12.5", "1162.50"),
            ],
            income_tax: IncomeTaxTable {
                exemption_threshold: dec("2500"),
                per_dependent_deduction: dec("150"),
                flat_deduction: dec("500"),
                brackets: vec![
                    bracket("0", "0", "0"),
                    bracket("2000", "15", "0"),
                    bracket("4500", "20", "375"),
                    bracket("9000", "25", "1275"),
                ],
            },
            employer_contribution_rate: dec("12.5"),
        }
    }
}

impl TaxTables {
    /// Loads a bracket-table file (JSON, camelCase fields) and validates it.
    pub fn from_json_file(path: &str) -> anyhow::Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading tax tables from {path}"))?;
        let tables: TaxTables = serde_json::from_str(&contents)
            .with_context(|| format!("parsing tax tables in {path}"))?;
        tables
            .validate()
            .with_context(|| format!("validating tax tables in {path}"))?;
        Ok(tables)
    }

    pub fn validate(&self) -> Result<(), TaxTableError> {
        validate_brackets("social security", &self.social_security)?;
        validate_brackets("income tax", &self.income_tax.brackets)?;
        Ok(())
    }
}

fn validate_brackets(label: &'static str, brackets: &[Bracket]) -> Result<(), TaxTableError> {
    let Some(first) = brackets.first() else {
        return Err(TaxTableError::Empty(label));
    };
    if first.lower != BigDecimal::from(0) {
        return Err(TaxTableError::BadFirstBound(label, first.lower.clone()));
    }
    for b in brackets {
        if b.rate < BigDecimal::from(0) {
            return Err(TaxTableError::NegativeRate(label));
        }
    }
    for pair in brackets.windows(2) {
        if pair[1].lower <= pair[0].lower {
            return Err(TaxTableError::Unsorted(label));
        }
        // Offsets that disagree with the accumulated lower tiers make the
        // schedule jump at a boundary. Tolerated, but worth flagging.
        let expected =
            &pair[0].offset + (&pair[1].lower - &pair[0].lower) * &pair[0].rate / BigDecimal::from(100);
        if money::to_cents(&expected) != money::to_cents(&pair[1].offset) {
            log::warn!(
                "{} bracket table is discontinuous at {}: offset {} (expected {})",
                label,
                pair[1].lower,
                pair[1].offset,
                expected
            );
        }
    }
    Ok(())
}

fn bracket_for<'a>(brackets: &'a [Bracket], amount: &BigDecimal) -> Option<&'a Bracket> {
    brackets.iter().rev().find(|b| amount >= &b.lower)
}

fn progressive_amount(brackets: &[Bracket], amount: &BigDecimal) -> BigDecimal {
    if amount <= &BigDecimal::from(0) {
        return money::to_cents(&BigDecimal::from(0));
    }
    let Some(tier) = bracket_for(brackets, amount) else {
        return money::to_cents(&BigDecimal::from(0));
    };
    money::to_cents(&(&tier.offset + (amount - &tier.lower) * &tier.rate / BigDecimal::from(100)))
}

/// Social-security style withholding on the full base salary.
pub fn statutory_withholding(tables: &TaxTables, base_salary: &BigDecimal) -> BigDecimal {
    progressive_amount(&tables.social_security, base_salary)
}

/// Income tax on the base salary after prior withholdings and deductions.
///
/// Salaries at or under the exemption threshold owe nothing. Otherwise the
/// taxable amount is the base minus the prior withholding, a per-dependent
/// deduction, and the flat deduction, floored at zero before the bracket
/// lookup.
pub fn income_tax_withholding(
    tables: &TaxTables,
    base_salary: &BigDecimal,
    prior_withholding: &BigDecimal,
    dependents: u32,
) -> BigDecimal {
    let table = &tables.income_tax;
    if base_salary <= &table.exemption_threshold {
        return money::to_cents(&BigDecimal::from(0));
    }
    let dependent_deduction = &table.per_dependent_deduction * BigDecimal::from(dependents);
    let taxable = base_salary - prior_withholding - dependent_deduction - &table.flat_deduction;
    progressive_amount(&table.brackets, &taxable)
}

/// Employer-side contribution. Informational: never withheld from the worker.
pub fn employer_contribution(tables: &TaxTables, base_salary: &BigDecimal) -> BigDecimal {
    if base_salary <= &BigDecimal::from(0) {
        return money::to_cents(&BigDecimal::from(0));
    }
    money::to_cents(&(base_salary * &tables.employer_contribution_rate / BigDecimal::from(100)))
}

fn bracket(lower: &str, rate: &str, offset: &str) -> Bracket {
    Bracket {
        lower: dec(lower),
        rate: dec(rate),
        offset: dec(offset),
    }
}

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).expect("valid decimal literal")
}
