use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CityClass {
    #[default]
    #[serde(alias = "Metro")]
    Metro,
    #[serde(alias = "NonMetro", alias = "nonMetro", alias = "non_metro")]
    NonMetro,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Old,
    New,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Old => f.write_str("old"),
            Regime::New => f.write_str("new"),
        }
    }
}

/// Salary structure as extracted from a payslip or Form 16.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollSnapshot {
    pub gross_salary: i64,
    pub basic_salary: i64,
    pub hra_received: i64,
    pub provident_fund: i64,
    #[serde(default)]
    pub allowances: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialProfile {
    #[serde(default)]
    pub city_class: CityClass,
    #[serde(default)]
    pub annual_rent: Option<i64>,
    /// Voluntary 80C investments. Provident fund is counted separately from the payroll.
    #[serde(default)]
    pub section_80c_investments: i64,
    #[serde(default)]
    pub health_premium: i64,
    #[serde(default)]
    pub payroll: Option<PayrollSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxAnalysisResult {
    pub tax_old: i64,
    pub tax_new: i64,
    pub hra_exempt: i64,
    pub section_80c_utilized: i64,
    /// Signed: negative means the cap is already exceeded.
    pub gap_80c: i64,
    pub gap_80d: i64,
    pub taxable_income_old: i64,
    pub taxable_income_new: i64,
}

impl TaxAnalysisResult {
    /// Ties go to the new regime.
    pub fn best_regime(&self) -> Regime {
        if self.tax_old < self.tax_new {
            Regime::Old
        } else {
            Regime::New
        }
    }

    pub fn min_tax(&self) -> i64 {
        self.tax_old.min(self.tax_new)
    }

    pub fn taxable_income(&self, regime: Regime) -> i64 {
        match regime {
            Regime::Old => self.taxable_income_old,
            Regime::New => self.taxable_income_new,
        }
    }

    pub fn tax(&self, regime: Regime) -> i64 {
        match regime {
            Regime::Old => self.tax_old,
            Regime::New => self.tax_new,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalPlan {
    pub regime: Regime,
    pub taxable_income: i64,
    pub tax_liability: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub tax_before: i64,
    pub tax_after: i64,
    pub savings: i64,
    pub final_plan: FinalPlan,
    pub applied: Vec<RecommendationCategory>,
}

/// Deduction headroom a recommendation fills, listed in application priority.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum RecommendationCategory {
    #[serde(rename = "80C-gap")]
    Section80c,
    #[serde(rename = "80D-gap")]
    Section80d,
}

impl RecommendationCategory {
    pub const PRIORITY: [RecommendationCategory; 2] = [
        RecommendationCategory::Section80c,
        RecommendationCategory::Section80d,
    ];

    pub fn id(self) -> &'static str {
        match self {
            RecommendationCategory::Section80c => "80C-gap",
            RecommendationCategory::Section80d => "80D-gap",
        }
    }
}

impl fmt::Display for RecommendationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for RecommendationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "80c-gap" | "80c" => Ok(RecommendationCategory::Section80c),
            "80d-gap" | "80d" => Ok(RecommendationCategory::Section80d),
            other => Err(format!("unknown recommendation id: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: &'static str,
    pub category: RecommendationCategory,
    pub title: String,
    pub description: String,
    pub required_amount: i64,
    pub estimated_tax_savings: i64,
}
