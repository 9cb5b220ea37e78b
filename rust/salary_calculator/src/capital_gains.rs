// src/capital_gains.rs

use tax_rules::RegimeRules;

use crate::models::CapitalGainsTax;
use crate::utils::clamp_amount;

/// Flat-rate tax on short and long term gains, outside the slab system.
/// The 87A rebate never applies here; cess does.
pub fn compute_capital_gains_tax(stcg: f64, ltcg: f64, rules: &RegimeRules) -> CapitalGainsTax {
    let cg = &rules.capital_gains;

    let stcg_tax = clamp_amount(stcg) * cg.stcg_rate;
    let ltcg_taxable = (clamp_amount(ltcg) - cg.ltcg_exemption).max(0.0);
    let ltcg_tax = ltcg_taxable * cg.ltcg_rate;
    let cess = (stcg_tax + ltcg_tax) * rules.cess_rate;

    CapitalGainsTax {
        stcg_tax,
        ltcg_taxable,
        ltcg_tax,
        cess,
        total: stcg_tax + ltcg_tax + cess,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tax_rules::{BuiltinRules, RulesFetcher};

    fn rules(regime: &str) -> RegimeRules {
        BuiltinRules
            .fetch_rules_for_fy("2025-26")
            .unwrap()
            .regime(regime)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_zero_gains_zero_tax() {
        let tax = compute_capital_gains_tax(0.0, 0.0, &rules("old"));
        assert_eq!(tax, CapitalGainsTax::default());
    }

    #[test]
    fn test_stcg_and_ltcg_taxed_independently() {
        let tax = compute_capital_gains_tax(300000.0, 200000.0, &rules("new_post_2025"));

        assert!((tax.stcg_tax - 60000.0).abs() < 1e-6);
        assert_eq!(tax.ltcg_taxable, 75000.0);
        assert!((tax.ltcg_tax - 9375.0).abs() < 1e-6);
        assert!((tax.cess - 2775.0).abs() < 1e-6);
        assert!((tax.total - 72150.0).abs() < 1e-6);
    }

    #[test]
    fn test_ltcg_within_exemption() {
        let tax = compute_capital_gains_tax(0.0, 100000.0, &rules("old"));
        assert_eq!(tax.ltcg_taxable, 0.0);
        assert_eq!(tax.total, 0.0);
    }

    #[test]
    fn test_negative_gains_clamped() {
        let tax = compute_capital_gains_tax(-50000.0, -1.0, &rules("new"));
        assert_eq!(tax.total, 0.0);
    }
}
