// src/slabs.rs

use tax_rules::Slab;

use crate::models::SlabCharge;
use crate::utils::clamp_amount;

/// Progressive tax on `taxable_income`, before rebate, surcharge and cess.
pub fn compute_slab_tax(taxable_income: f64, slabs: &[Slab]) -> f64 {
    slab_breakup(taxable_income, slabs)
        .iter()
        .map(|charge| charge.tax)
        .sum()
}

/// Tax charged within each slab the income reaches, lowest slab first.
pub fn slab_breakup(taxable_income: f64, slabs: &[Slab]) -> Vec<SlabCharge> {
    let income = clamp_amount(taxable_income);
    let mut charges = Vec::new();

    for slab in slabs {
        if income <= slab.lower {
            break;
        }

        let top = slab.upper.map_or(income, |upper| upper.min(income));
        let taxed_amount = top - slab.lower;

        charges.push(SlabCharge {
            lower: slab.lower,
            upper: slab.upper,
            rate: slab.rate,
            taxed_amount,
            tax: taxed_amount * slab.rate,
        });
    }

    charges
}
