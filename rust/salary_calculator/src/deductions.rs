// src/deductions.rs

use log::debug;
use std::collections::BTreeMap;
use tax_rules::models::HraRules;
use tax_rules::{AgeBand, RegimeRules, Section};

use crate::models::TaxpayerProfile;
use crate::utils::clamp_amount;

pub const HRA_EXEMPTION: &str = "HRA";
pub const OTHER_DEDUCTIONS: &str = "other";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeductionSummary {
    pub sections: BTreeMap<String, f64>,
    pub standard_deduction: f64,
    pub total: f64,
}

/// Deductions allowed by one regime's rules.
pub struct DeductionCalculator<'a> {
    rules: &'a RegimeRules,
}

impl<'a> DeductionCalculator<'a> {
    pub fn new(rules: &'a RegimeRules) -> Self {
        DeductionCalculator { rules }
    }

    /// `min(claimed, cap)`; zero for unknown sections, negative claims, or
    /// regimes without section caps.
    pub fn compute_section_deduction(&self, section_code: &str, claimed: f64, band: AgeBand) -> f64 {
        let Ok(section) = section_code.parse::<Section>() else {
            return 0.0;
        };
        self.capped(section, claimed, band)
    }

    fn capped(&self, section: Section, claimed: f64, band: AgeBand) -> f64 {
        match &self.rules.section_caps {
            Some(caps) => clamp_amount(claimed).min(caps.cap_for(section, band)),
            None => 0.0,
        }
    }

    pub fn compute_hra_exemption(&self, basic: f64, hra: f64, rent_paid: f64, lives_in_metro: bool) -> f64 {
        match &self.rules.hra {
            Some(hra_rules) => compute_hra_exemption(basic, hra, rent_paid, lives_in_metro, hra_rules),
            None => 0.0,
        }
    }

    /// Flat deduction on salary income, never more than the salary itself.
    pub fn compute_standard_deduction(&self, gross_salary: f64) -> f64 {
        self.rules.standard_deduction.min(clamp_amount(gross_salary))
    }

    pub fn compute(&self, profile: &TaxpayerProfile, gross_salary: f64, band: AgeBand) -> DeductionSummary {
        let standard_deduction = self.compute_standard_deduction(gross_salary);
        let mut sections = BTreeMap::new();

        if self.rules.allows_itemized_deductions() {
            let hra_exemption = self.compute_hra_exemption(
                profile.basic,
                profile.hra,
                profile.rent_paid,
                profile.lives_in_metro,
            );
            if hra_exemption > 0.0 {
                sections.insert(HRA_EXEMPTION.to_string(), hra_exemption);
            }

            for (section, claimed) in claimed_by_section(profile) {
                let allowed = self.capped(section, claimed, band);
                if allowed > 0.0 {
                    sections.insert(section.code().to_string(), allowed);
                }
            }

            let other = clamp_amount(profile.other_deductions);
            if other > 0.0 {
                sections.insert(OTHER_DEDUCTIONS.to_string(), other);
            }
        }

        let total = standard_deduction + sections.values().sum::<f64>();
        DeductionSummary {
            sections,
            standard_deduction,
            total,
        }
    }
}

/// Three-way minimum: HRA received, rent over a share of basic, and a
/// metro/non-metro share of basic.
pub fn compute_hra_exemption(
    basic: f64,
    hra: f64,
    rent_paid: f64,
    lives_in_metro: bool,
    rules: &HraRules,
) -> f64 {
    let basic = clamp_amount(basic);
    let rent_paid = clamp_amount(rent_paid);
    if rent_paid == 0.0 {
        return 0.0;
    }

    let rent_over_basic = (rent_paid - rules.rent_excess_percent_of_basic * basic).max(0.0);
    let share = if lives_in_metro {
        rules.metro_percent_of_basic
    } else {
        rules.non_metro_percent_of_basic
    };

    clamp_amount(hra).min(rent_over_basic).min(share * basic)
}

// Employee PF counts toward 80C and employee NPS toward 80CCD(1B)
fn claimed_by_section(profile: &TaxpayerProfile) -> BTreeMap<Section, f64> {
    let mut claimed = BTreeMap::new();

    for (code, amount) in &profile.investments {
        match code.parse::<Section>() {
            Ok(section) => *claimed.entry(section).or_insert(0.0) += clamp_amount(*amount),
            Err(()) => debug!("Ignoring claim under unknown section {}", code),
        }
    }

    let employee_pf = profile.employee_pf();
    if employee_pf > 0.0 {
        *claimed.entry(Section::Sec80C).or_insert(0.0) += employee_pf;
    }
    let nps_employee = clamp_amount(profile.nps_employee);
    if nps_employee > 0.0 {
        *claimed.entry(Section::Sec80CCD1B).or_insert(0.0) += nps_employee;
    }

    claimed
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::assert_le;
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
    fn test_section_deduction_is_capped() {
        let old = rules("old");
        let calc = DeductionCalculator::new(&old);

        assert_eq!(calc.compute_section_deduction("80C", 200000.0, AgeBand::General), 150000.0);
        assert_eq!(calc.compute_section_deduction("80C", 90000.0, AgeBand::General), 90000.0);
        assert_eq!(calc.compute_section_deduction("80D", 40000.0, AgeBand::General), 25000.0);
        assert_eq!(calc.compute_section_deduction("80D", 40000.0, AgeBand::Senior), 40000.0);
        assert_eq!(calc.compute_section_deduction("80D", 90000.0, AgeBand::SuperSenior), 50000.0);
        assert_eq!(calc.compute_section_deduction("80CCD1B", 75000.0, AgeBand::General), 50000.0);
    }

    #[test]
    fn test_section_deduction_degrades_to_zero() {
        let old = rules("old");
        let calc = DeductionCalculator::new(&old);

        assert_eq!(calc.compute_section_deduction("80G", 10000.0, AgeBand::General), 0.0);
        assert_eq!(calc.compute_section_deduction("80C", -10000.0, AgeBand::General), 0.0);

        let new = rules("new");
        let calc = DeductionCalculator::new(&new);
        assert_eq!(calc.compute_section_deduction("80C", 150000.0, AgeBand::General), 0.0);
    }

    #[test]
    fn test_section_deduction_never_exceeds_claim_or_cap() {
        let old = rules("old");
        let calc = DeductionCalculator::new(&old);
        let caps = old.section_caps.clone().unwrap();

        for code in ["80C", "80D", "80CCD1B"] {
            let section: Section = code.parse().unwrap();
            for step in 0..40 {
                let claimed = step as f64 * 7500.0;
                let allowed = calc.compute_section_deduction(code, claimed, AgeBand::General);
                assert_le!(allowed, claimed.min(caps.cap_for(section, AgeBand::General)));
                assert!(allowed >= 0.0);
            }
        }
    }

    #[test]
    fn test_hra_exemption_three_way_minimum() {
        let old = rules("old");
        let calc = DeductionCalculator::new(&old);

        // metro share of basic binds: min(200000, 240000 - 30000, 150000)
        assert_eq!(calc.compute_hra_exemption(300000.0, 200000.0, 240000.0, true), 150000.0);
        // non-metro: min(200000, 210000, 120000)
        assert_eq!(calc.compute_hra_exemption(300000.0, 200000.0, 240000.0, false), 120000.0);
        // rent over 10% of basic binds: min(150000, 60000 - 30000, 150000)
        assert_eq!(calc.compute_hra_exemption(300000.0, 150000.0, 60000.0, true), 30000.0);
        // actual HRA binds
        assert_eq!(calc.compute_hra_exemption(300000.0, 50000.0, 240000.0, true), 50000.0);
    }

    #[test]
    fn test_hra_exemption_edge_cases() {
        let old = rules("old");
        let calc = DeductionCalculator::new(&old);

        assert_eq!(calc.compute_hra_exemption(300000.0, 150000.0, 0.0, true), 0.0);
        assert_eq!(calc.compute_hra_exemption(300000.0, 150000.0, 20000.0, true), 0.0);
        assert_eq!(calc.compute_hra_exemption(300000.0, 0.0, 240000.0, true), 0.0);

        let new = rules("new");
        assert_eq!(
            DeductionCalculator::new(&new).compute_hra_exemption(300000.0, 150000.0, 240000.0, true),
            0.0
        );
    }

    #[test]
    fn test_standard_deduction_by_regime() {
        let old = rules("old");
        let post = rules("new_post_2025");

        assert_eq!(DeductionCalculator::new(&old).compute_standard_deduction(600000.0), 50000.0);
        assert_eq!(DeductionCalculator::new(&post).compute_standard_deduction(600000.0), 75000.0);
        assert_eq!(DeductionCalculator::new(&post).compute_standard_deduction(40000.0), 40000.0);
        assert_eq!(DeductionCalculator::new(&post).compute_standard_deduction(0.0), 0.0);
    }

    #[test]
    fn test_compute_old_regime() {
        let old = rules("old");
        let profile = TaxpayerProfile {
            basic: 500000.0,
            hra: 200000.0,
            employee_pf_percent: 12.0,
            nps_employee: 20000.0,
            rent_paid: 180000.0,
            lives_in_metro: false,
            other_deductions: 5000.0,
            investments: BTreeMap::from([
                ("80C".to_string(), 100000.0),
                ("80D".to_string(), 30000.0),
                ("80CCD1B".to_string(), 20000.0),
                ("80G".to_string(), 10000.0),
            ]),
            ..Default::default()
        };

        let summary = DeductionCalculator::new(&old).compute(&profile, profile.gross_salary(), AgeBand::General);

        // HRA: min(200000, 180000 - 50000, 200000)
        assert_eq!(summary.sections[HRA_EXEMPTION], 130000.0);
        // 80C: 100000 + PF 60000, capped
        assert_eq!(summary.sections["80C"], 150000.0);
        assert_eq!(summary.sections["80D"], 25000.0);
        // 80CCD1B: 20000 + employee NPS 20000
        assert_eq!(summary.sections["80CCD1B"], 40000.0);
        assert_eq!(summary.sections[OTHER_DEDUCTIONS], 5000.0);
        assert!(!summary.sections.contains_key("80G"));
        assert_eq!(summary.standard_deduction, 50000.0);
        assert_eq!(summary.total, 400000.0);
    }

    #[test]
    fn test_compute_new_regime_ignores_claims() {
        let new = rules("new_post_2025");
        let profile = TaxpayerProfile {
            basic: 500000.0,
            hra: 200000.0,
            rent_paid: 180000.0,
            other_deductions: 5000.0,
            investments: BTreeMap::from([("80C".to_string(), 150000.0)]),
            ..Default::default()
        };

        let summary = DeductionCalculator::new(&new).compute(&profile, profile.gross_salary(), AgeBand::General);

        assert!(summary.sections.is_empty());
        assert_eq!(summary.standard_deduction, 75000.0);
        assert_eq!(summary.total, 75000.0);
    }

    #[test]
    fn test_compute_without_claims() {
        let old = rules("old");
        let profile = TaxpayerProfile {
            basic: 250000.0,
            ..Default::default()
        };

        let summary = DeductionCalculator::new(&old).compute(&profile, profile.gross_salary(), AgeBand::General);
        assert!(summary.sections.is_empty());
        assert_eq!(summary.total, 50000.0);
    }
}
