use tracing::debug;

use super::engine::{SECTION_80C_CAP, SECTION_80D_CAP, analyze};
use super::error::Result;
use super::types::{
    FinalPlan, FinancialProfile, Recommendation, RecommendationCategory, SimulationResult,
    TaxAnalysisResult,
};

/// Applies the first `accepted_count` categories in priority order. Counts
/// beyond the number of categories have no further effect.
pub fn simulate(profile: &FinancialProfile, accepted_count: usize) -> Result<SimulationResult> {
    let tiers = accepted_count.min(RecommendationCategory::PRIORITY.len());
    simulate_categories(profile, &RecommendationCategory::PRIORITY[..tiers])
}

/// Fills the headroom of each selected category on a private copy of the
/// profile and compares the best liability before and after.
pub fn simulate_categories(
    profile: &FinancialProfile,
    categories: &[RecommendationCategory],
) -> Result<SimulationResult> {
    let before = analyze(profile)?;

    let mut scenario = profile.clone();
    let mut applied = Vec::new();
    for category in RecommendationCategory::PRIORITY {
        if categories.contains(&category) && apply_category(&mut scenario, &before, category) {
            applied.push(category);
        }
    }

    let after = analyze(&scenario)?;
    let regime = after.best_regime();
    let tax_before = before.min_tax();
    let tax_after = after.min_tax();

    debug!(tax_before, tax_after, %regime, applied = applied.len(), "simulated recommendations");

    Ok(SimulationResult {
        tax_before,
        tax_after,
        savings: tax_before - tax_after,
        final_plan: FinalPlan {
            regime,
            taxable_income: after.taxable_income(regime),
            tax_liability: after.tax(regime),
        },
        applied,
    })
}

pub fn recommendations(profile: &FinancialProfile) -> Result<Vec<Recommendation>> {
    let baseline = analyze(profile)?;

    let mut out = Vec::new();
    for category in RecommendationCategory::PRIORITY {
        let required_amount = category_gap(&baseline, category);
        if required_amount <= 0 {
            continue;
        }
        let outcome = simulate_categories(profile, &[category])?;
        let (title, description) = match category {
            RecommendationCategory::Section80c => (
                "Top up Section 80C investments".to_string(),
                format!(
                    "Invest Rs {required_amount} more in ELSS, PPF or life cover to reach the Rs {SECTION_80C_CAP} limit."
                ),
            ),
            RecommendationCategory::Section80d => (
                "Buy or extend health insurance".to_string(),
                format!(
                    "Pay Rs {required_amount} more in health premiums to use the Rs {SECTION_80D_CAP} Section 80D limit."
                ),
            ),
        };
        out.push(Recommendation {
            id: category.id(),
            category,
            title,
            description,
            required_amount,
            estimated_tax_savings: outcome.savings,
        });
    }
    Ok(out)
}

fn category_gap(analysis: &TaxAnalysisResult, category: RecommendationCategory) -> i64 {
    match category {
        RecommendationCategory::Section80c => analysis.gap_80c,
        RecommendationCategory::Section80d => analysis.gap_80d,
    }
}

fn apply_category(
    scenario: &mut FinancialProfile,
    baseline: &TaxAnalysisResult,
    category: RecommendationCategory,
) -> bool {
    let gap = category_gap(baseline, category);
    if gap <= 0 {
        return false;
    }
    match category {
        RecommendationCategory::Section80c => scenario.section_80c_investments += gap,
        RecommendationCategory::Section80d => scenario.health_premium += gap,
    }
    true
}
