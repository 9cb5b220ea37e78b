// src/engine.rs

use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use tax_rules::{AgeBand, RegimeRules, TaxRulesStore};

use crate::capital_gains::compute_capital_gains_tax;
use crate::deductions::DeductionCalculator;
use crate::error::CalculationError;
use crate::models::{
    Breakdown, CalculationOptions, IncomeTax, RegimeComparison, RegimeFailurePolicy,
    RegimeResult, SalaryBreakdown, TakeHome, TaxpayerProfile,
};
use crate::relief;
use crate::slabs::slab_breakup;
use crate::utils::round_rupee;

/// Computes per-regime salary and tax breakdowns against a frozen rules store.
///
/// Cheap to clone and safe to share between threads; every calculation is a
/// pure function of the profile, the options and the store.
#[derive(Debug, Clone)]
pub struct SalaryBreakdownEngine {
    store: Arc<TaxRulesStore>,
}

impl SalaryBreakdownEngine {
    pub fn new(store: TaxRulesStore) -> Self {
        SalaryBreakdownEngine {
            store: Arc::new(store),
        }
    }

    pub fn from_shared(store: Arc<TaxRulesStore>) -> Self {
        SalaryBreakdownEngine { store }
    }

    pub fn store(&self) -> &TaxRulesStore {
        &self.store
    }

    pub fn calculate_salary_breakdown(
        &self,
        profile: &TaxpayerProfile,
        options: &CalculationOptions,
    ) -> Result<SalaryBreakdown, CalculationError> {
        if options.regimes.is_empty() {
            return Err(CalculationError::NoRegimesRequested);
        }

        let fy = options.fy.trim();
        let document = self
            .store
            .get(fy)
            .ok_or_else(|| CalculationError::RulesNotFound { fy: fy.to_string() })?;

        let profile = profile.sanitized();
        let mut regimes = BTreeMap::new();
        let mut errors = BTreeMap::new();
        let mut first_error = None;

        for name in &options.regimes {
            let Some(rules) = document.regime(name) else {
                let err = CalculationError::UnsupportedRegime {
                    fy: fy.to_string(),
                    regime: name.clone(),
                };
                if options.failure_policy == RegimeFailurePolicy::FailFast {
                    return Err(err);
                }
                warn!("Skipping regime: {}", err);
                errors.insert(name.clone(), err.to_string());
                if first_error.is_none() {
                    first_error = Some(err);
                }
                continue;
            };

            let result = calculate_regime(&profile, fy, name, rules);
            regimes.insert(name.clone(), result);
        }

        if regimes.is_empty() {
            if let Some(err) = first_error {
                return Err(err);
            }
        }

        let comparison = compare(&regimes);
        Ok(SalaryBreakdown {
            financial_year: fy.to_string(),
            regimes,
            errors,
            comparison,
        })
    }
}

fn calculate_regime(profile: &TaxpayerProfile, fy: &str, name: &str, rules: &RegimeRules) -> RegimeResult {
    let band = AgeBand::from_age(profile.age);
    let gross_salary = profile.gross_salary();

    let deductions = DeductionCalculator::new(rules).compute(profile, gross_salary, band);
    let taxable_income =
        (gross_salary - deductions.total + profile.income_from_other_sources).max(0.0);

    let slabs = slab_breakup(taxable_income, rules.slabs_for(band));
    let slab_tax: f64 = slabs.iter().map(|charge| charge.tax).sum();
    let relief = relief::apply(slab_tax, taxable_income, rules, band);
    let capital_gains = compute_capital_gains_tax(profile.stcg, profile.ltcg, rules);
    let total = round_rupee(relief.total + capital_gains.total);

    let employee_pf = profile.employee_pf();
    let annual_take_home = gross_salary - employee_pf - profile.nps_employee - relief.total;

    debug!(
        "{}/{}: gross {:.0}, taxable {:.0}, slab tax {:.0}, total tax {:.0}",
        fy, name, gross_salary, taxable_income, slab_tax, total
    );

    RegimeResult {
        regime: name.to_string(),
        financial_year: fy.to_string(),
        gross_salary,
        ctc: profile.ctc(),
        taxable_income,
        breakdown: Breakdown {
            deductions: deductions.sections,
            standard_deduction: deductions.standard_deduction,
            total_deductions: deductions.total,
            income_from_other_sources: profile.income_from_other_sources,
            employee_pf,
            employer_pf: profile.employer_pf(),
            nps_employee: profile.nps_employee,
            nps_employer: profile.nps_employer,
        },
        income_tax: IncomeTax {
            slab_tax,
            slabs,
            rebate: relief.rebate,
            tax_after_rebate: relief.tax_after_rebate,
            surcharge: relief.surcharge,
            cess: relief.cess,
            salary_tax: relief.total,
            capital_gains,
            total,
        },
        take_home: TakeHome {
            annual: annual_take_home,
            monthly: annual_take_home / 12.0,
        },
    }
}

// Ties go to the regime that sorts first
fn compare(regimes: &BTreeMap<String, RegimeResult>) -> Option<RegimeComparison> {
    if regimes.len() < 2 {
        return None;
    }

    let mut best: Option<&RegimeResult> = None;
    let mut highest_tax = 0.0_f64;
    for result in regimes.values() {
        highest_tax = highest_tax.max(result.income_tax.total);
        if best.map_or(true, |b| result.income_tax.total < b.income_tax.total) {
            best = Some(result);
        }
    }

    best.map(|b| RegimeComparison {
        recommended_regime: b.regime.clone(),
        lowest_tax: b.income_tax.total,
        highest_tax,
        savings: highest_tax - b.income_tax.total,
    })
}
