use tracing::debug;

use super::error::{EngineError, Result};
use super::types::{CityClass, FinancialProfile, Regime, TaxAnalysisResult};

pub const SECTION_80C_CAP: i64 = 150_000;
pub const SECTION_80D_CAP: i64 = 25_000;
pub const STANDARD_DEDUCTION: i64 = 50_000;
pub const PROFESSIONAL_TAX: i64 = 2_400;

const CESS_MULTIPLIER: f64 = 1.04;

/// Upper limit and marginal rate of each slab above the exempt limit.
struct SlabSchedule {
    exempt_limit: i64,
    rebate_limit: i64,
    slabs: &'static [(f64, f64)],
}

const NEW_REGIME: SlabSchedule = SlabSchedule {
    exempt_limit: 300_000,
    rebate_limit: 700_000,
    slabs: &[
        (300_000.0, 0.0),
        (700_000.0, 0.05),
        (1_000_000.0, 0.10),
        (1_200_000.0, 0.15),
        (1_500_000.0, 0.20),
        (f64::INFINITY, 0.30),
    ],
};

const OLD_REGIME: SlabSchedule = SlabSchedule {
    exempt_limit: 250_000,
    rebate_limit: 500_000,
    slabs: &[
        (250_000.0, 0.0),
        (500_000.0, 0.05),
        (1_000_000.0, 0.20),
        (f64::INFINITY, 0.30),
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeductionGaps {
    pub section_80c: i64,
    pub section_80d: i64,
}

/// Rent-based exemption: the least of actual HRA, rent above 10% of basic,
/// and the city share of basic. Zero when no rent is paid.
pub fn hra_exemption(
    basic_salary: i64,
    hra_received: i64,
    rent_paid: i64,
    city_class: CityClass,
) -> i64 {
    if rent_paid <= 0 {
        return 0;
    }

    let basic = basic_salary as f64;
    let actual_hra = hra_received as f64;
    let rent_over_basic = (rent_paid as f64 - 0.10 * basic).max(0.0);
    let city_share = match city_class {
        CityClass::Metro => 0.50 * basic,
        CityClass::NonMetro => 0.40 * basic,
    };

    actual_hra.min(rent_over_basic).min(city_share) as i64
}

pub fn section_80c_utilization(provident_fund: i64, voluntary_investments: i64) -> i64 {
    provident_fund
        .saturating_add(voluntary_investments)
        .min(SECTION_80C_CAP)
}

pub fn estimate_tax(taxable_income: i64, regime: Regime) -> i64 {
    let schedule = match regime {
        Regime::New => &NEW_REGIME,
        Regime::Old => &OLD_REGIME,
    };

    if taxable_income <= schedule.exempt_limit {
        return 0;
    }
    // Section 87A rebate waives the whole liability up to this limit.
    if taxable_income <= schedule.rebate_limit {
        return 0;
    }

    let income = taxable_income as f64;
    let mut tax = 0.0;
    let mut previous_limit = schedule.exempt_limit as f64;
    for &(limit, rate) in schedule.slabs {
        if income > limit {
            tax += (limit - previous_limit) * rate;
            previous_limit = limit;
        } else {
            tax += (income - previous_limit) * rate;
            break;
        }
    }

    (tax * CESS_MULTIPLIER) as i64
}

pub fn deduction_gaps(section_80c_utilized: i64, health_premium: i64) -> DeductionGaps {
    DeductionGaps {
        section_80c: SECTION_80C_CAP.saturating_sub(section_80c_utilized),
        section_80d: SECTION_80D_CAP.saturating_sub(health_premium),
    }
}

pub fn analyze(profile: &FinancialProfile) -> Result<TaxAnalysisResult> {
    let payroll = profile
        .payroll
        .as_ref()
        .ok_or(EngineError::MissingData("payroll snapshot"))?;

    let hra_exempt = hra_exemption(
        payroll.basic_salary,
        payroll.hra_received,
        profile.annual_rent.unwrap_or(0),
        profile.city_class,
    );
    let section_80c_utilized =
        section_80c_utilization(payroll.provident_fund, profile.section_80c_investments);

    let taxable_income_old = payroll
        .gross_salary
        .saturating_sub(hra_exempt)
        .saturating_sub(STANDARD_DEDUCTION)
        .saturating_sub(section_80c_utilized)
        .saturating_sub(profile.health_premium)
        .saturating_sub(PROFESSIONAL_TAX)
        .max(0);
    let taxable_income_new = payroll.gross_salary.saturating_sub(STANDARD_DEDUCTION).max(0);

    let tax_old = estimate_tax(taxable_income_old, Regime::Old);
    let tax_new = estimate_tax(taxable_income_new, Regime::New);
    let gaps = deduction_gaps(section_80c_utilized, profile.health_premium);

    debug!(
        taxable_income_old,
        taxable_income_new, tax_old, tax_new, hra_exempt, section_80c_utilized, "analyzed profile"
    );

    Ok(TaxAnalysisResult {
        tax_old,
        tax_new,
        hra_exempt,
        section_80c_utilized,
        gap_80c: gaps.section_80c,
        gap_80d: gaps.section_80d,
        taxable_income_old,
        taxable_income_new,
    })
}
