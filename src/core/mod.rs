mod engine;
mod error;
mod simulator;
mod types;

pub use engine::{
    DeductionGaps, PROFESSIONAL_TAX, SECTION_80C_CAP, SECTION_80D_CAP, STANDARD_DEDUCTION,
    analyze, deduction_gaps, estimate_tax, hra_exemption, section_80c_utilization,
};
pub use error::{EngineError, Result};
pub use simulator::{recommendations, simulate, simulate_categories};
pub use types::{
    CityClass, FinalPlan, FinancialProfile, PayrollSnapshot, Recommendation,
    RecommendationCategory, Regime, SimulationResult, TaxAnalysisResult,
};
