// src/relief.rs

use tax_rules::models::RebateRules;
use tax_rules::{AgeBand, RegimeRules};

use crate::slabs::compute_slab_tax;
use crate::utils::clamp_amount;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReliefOutcome {
    pub gross_tax: f64,
    pub rebate: f64,
    pub tax_after_rebate: f64,
    pub surcharge: f64,
    pub cess: f64,
    pub total: f64,
}

/// Applies the 87A rebate, then surcharge, then cess on slab tax.
pub fn apply(gross_tax: f64, taxable_income: f64, rules: &RegimeRules, band: AgeBand) -> ReliefOutcome {
    let gross_tax = clamp_amount(gross_tax);
    let taxable_income = clamp_amount(taxable_income);

    let rebate = section_87a_rebate(gross_tax, taxable_income, &rules.rebate);
    let tax_after_rebate = (gross_tax - rebate).max(0.0);
    let surcharge = surcharge(tax_after_rebate, taxable_income, rules, band);
    let cess = (tax_after_rebate + surcharge) * rules.cess_rate;

    ReliefOutcome {
        gross_tax,
        rebate,
        tax_after_rebate,
        surcharge,
        cess,
        total: (tax_after_rebate + surcharge + cess).max(0.0),
    }
}

fn section_87a_rebate(gross_tax: f64, taxable_income: f64, rules: &RebateRules) -> f64 {
    if taxable_income <= rules.threshold {
        return gross_tax.min(rules.cap);
    }

    // Marginal relief: tax may not exceed the income above the threshold
    if rules.marginal_relief {
        let excess = taxable_income - rules.threshold;
        if gross_tax > excess {
            return gross_tax - excess;
        }
    }

    0.0
}

fn surcharge(tax: f64, taxable_income: f64, rules: &RegimeRules, band: AgeBand) -> f64 {
    let Some(index) = rules
        .surcharge
        .iter()
        .rposition(|b| taxable_income > b.threshold)
    else {
        return 0.0;
    };

    let current = &rules.surcharge[index];
    let full = tax * current.rate;

    // Tax plus surcharge may exceed the liability at the threshold by no
    // more than the income above it.
    let previous_rate = match index {
        0 => 0.0,
        i => rules.surcharge[i - 1].rate,
    };
    let at_threshold = compute_slab_tax(current.threshold, rules.slabs_for(band)) * (1.0 + previous_rate);
    let ceiling = at_threshold + (taxable_income - current.threshold);

    if tax + full > ceiling {
        (ceiling - tax).max(0.0)
    } else {
        full
    }
}
