// src/models.rs

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::utils::{
    clamp_amount, clamp_percent, lenient_age, lenient_amount, lenient_amounts, lenient_flag,
};

/// Annual salary components and declarations for one calculation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxpayerProfile {
    #[serde(deserialize_with = "lenient_amount")]
    pub basic: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub hra: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub conveyance: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub special_allowances: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub lta: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub bonus: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub other_taxable: f64,

    // Percent of basic, 0-100
    #[serde(deserialize_with = "lenient_amount")]
    pub employee_pf_percent: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub employer_pf_percent: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub nps_employee: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub nps_employer: f64,

    #[serde(deserialize_with = "lenient_amount")]
    pub other_deductions: f64,
    #[serde(deserialize_with = "lenient_amounts")]
    pub investments: BTreeMap<String, f64>, // Section code, claimed amount

    #[serde(deserialize_with = "lenient_amount")]
    pub rent_paid: f64,
    #[serde(deserialize_with = "lenient_flag")]
    pub lives_in_metro: bool,
    #[serde(deserialize_with = "lenient_age")]
    pub age: u32,
    pub state: Option<String>,

    #[serde(deserialize_with = "lenient_amount")]
    pub income_from_other_sources: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub stcg: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub ltcg: f64,
}

impl TaxpayerProfile {
    /// Copy with every amount clamped to a usable, non-negative value.
    pub fn sanitized(&self) -> TaxpayerProfile {
        let clean = TaxpayerProfile {
            basic: clamp_amount(self.basic),
            hra: clamp_amount(self.hra),
            conveyance: clamp_amount(self.conveyance),
            special_allowances: clamp_amount(self.special_allowances),
            lta: clamp_amount(self.lta),
            bonus: clamp_amount(self.bonus),
            other_taxable: clamp_amount(self.other_taxable),
            employee_pf_percent: clamp_percent(self.employee_pf_percent),
            employer_pf_percent: clamp_percent(self.employer_pf_percent),
            nps_employee: clamp_amount(self.nps_employee),
            nps_employer: clamp_amount(self.nps_employer),
            other_deductions: clamp_amount(self.other_deductions),
            investments: self
                .investments
                .iter()
                .map(|(section, amount)| (section.clone(), clamp_amount(*amount)))
                .collect(),
            rent_paid: clamp_amount(self.rent_paid),
            lives_in_metro: self.lives_in_metro,
            age: self.age,
            state: self.state.clone(),
            income_from_other_sources: clamp_amount(self.income_from_other_sources),
            stcg: clamp_amount(self.stcg),
            ltcg: clamp_amount(self.ltcg),
        };

        if &clean != self {
            debug!("Clamped out-of-range profile amounts to zero");
        }
        clean
    }

    pub fn gross_salary(&self) -> f64 {
        self.basic
            + self.hra
            + self.conveyance
            + self.special_allowances
            + self.lta
            + self.bonus
            + self.other_taxable
    }

    pub fn employee_pf(&self) -> f64 {
        self.basic * clamp_percent(self.employee_pf_percent) / 100.0
    }

    pub fn employer_pf(&self) -> f64 {
        self.basic * clamp_percent(self.employer_pf_percent) / 100.0
    }

    pub fn ctc(&self) -> f64 {
        self.gross_salary() + self.employer_pf() + self.nps_employer
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegimeFailurePolicy {
    /// The first unsupported regime fails the whole request.
    #[default]
    FailFast,
    /// Unsupported regimes are reported under `errors`, the rest are computed.
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationOptions {
    pub fy: String,
    pub regimes: Vec<String>,
    #[serde(default)]
    pub failure_policy: RegimeFailurePolicy,
}

impl CalculationOptions {
    pub fn new(fy: &str, regimes: &[&str]) -> Self {
        CalculationOptions {
            fy: fy.to_string(),
            regimes: regimes.iter().map(|r| r.to_string()).collect(),
            failure_policy: RegimeFailurePolicy::FailFast,
        }
    }

    pub fn with_policy(mut self, failure_policy: RegimeFailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlabCharge {
    pub lower: f64,
    pub upper: Option<f64>,
    pub rate: f64,
    pub taxed_amount: f64,
    pub tax: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalGainsTax {
    pub stcg_tax: f64,
    pub ltcg_taxable: f64,
    pub ltcg_tax: f64,
    pub cess: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    /// Per-section deductions; always empty for standard-only regimes.
    pub deductions: BTreeMap<String, f64>,
    pub standard_deduction: f64,
    pub total_deductions: f64,
    pub income_from_other_sources: f64,
    pub employee_pf: f64,
    pub employer_pf: f64,
    pub nps_employee: f64,
    pub nps_employer: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeTax {
    pub slab_tax: f64,
    pub slabs: Vec<SlabCharge>,
    pub rebate: f64,
    pub tax_after_rebate: f64,
    pub surcharge: f64,
    pub cess: f64,
    pub salary_tax: f64,
    pub capital_gains: CapitalGainsTax,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeHome {
    pub annual: f64,
    pub monthly: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegimeResult {
    pub regime: String,
    pub financial_year: String,
    pub gross_salary: f64,
    pub ctc: f64,
    pub taxable_income: f64,
    pub breakdown: Breakdown,
    pub income_tax: IncomeTax,
    pub take_home: TakeHome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegimeComparison {
    pub recommended_regime: String,
    pub lowest_tax: f64,
    pub highest_tax: f64,
    pub savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryBreakdown {
    pub financial_year: String,
    pub regimes: BTreeMap<String, RegimeResult>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<RegimeComparison>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownRequest {
    #[serde(default)]
    pub profile: TaxpayerProfile,
    #[serde(default)]
    pub fy: Option<String>,
    #[validate(length(min = 1, max = 8))]
    pub regimes: Vec<String>,
    #[serde(default)]
    pub failure_policy: RegimeFailurePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorResponse {
            success: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_from_partial_form() {
        let profile: TaxpayerProfile = serde_json::from_str(
            r#"{
                "basic": "300000",
                "hra": 150000,
                "specialAllowances": "",
                "investments": {"80C": "1,50,000"},
                "livesInMetro": true,
                "age": 30
            }"#,
        )
        .unwrap();

        assert_eq!(profile.basic, 300000.0);
        assert_eq!(profile.hra, 150000.0);
        assert_eq!(profile.special_allowances, 0.0);
        assert_eq!(profile.investments["80C"], 150000.0);
        assert!(profile.lives_in_metro);
        assert_eq!(profile.rent_paid, 0.0);
        assert_eq!(profile.state, None);

        for age in [r#"-1"#, r#""""#, r#"null"#] {
            let body = format!(
                r#"{{"basic": 500000, "bonus": -5, "hra": "", "livesInMetro": null, "age": {}}}"#,
                age
            );
            let profile: TaxpayerProfile = serde_json::from_str(&body).unwrap();
            assert_eq!(profile.age, 0, "age {}", age);
            assert!(!profile.lives_in_metro);
            assert_eq!(profile.hra, 0.0);
            assert_eq!(profile.sanitized().bonus, 0.0);
        }
    }

    #[test]
    fn test_sanitized_clamps_negatives() {
        let profile = TaxpayerProfile {
            basic: -100.0,
            bonus: f64::NAN,
            employee_pf_percent: 250.0,
            investments: BTreeMap::from([("80C".to_string(), -5000.0)]),
            ..Default::default()
        };

        let clean = profile.sanitized();
        assert_eq!(clean.basic, 0.0);
        assert_eq!(clean.bonus, 0.0);
        assert_eq!(clean.employee_pf_percent, 100.0);
        assert_eq!(clean.investments["80C"], 0.0);
    }

    #[test]
    fn test_gross_salary_and_ctc() {
        let profile = TaxpayerProfile {
            basic: 600000.0,
            hra: 240000.0,
            conveyance: 19200.0,
            special_allowances: 100800.0,
            lta: 20000.0,
            bonus: 50000.0,
            other_taxable: 10000.0,
            employee_pf_percent: 12.0,
            employer_pf_percent: 12.0,
            nps_employer: 30000.0,
            ..Default::default()
        };

        assert_eq!(profile.gross_salary(), 1040000.0);
        assert_eq!(profile.employee_pf(), 72000.0);
        assert_eq!(profile.employer_pf(), 72000.0);
        assert_eq!(profile.ctc(), 1142000.0);
    }

    #[test]
    fn test_validate_breakdown_request() {
        let request: BreakdownRequest =
            serde_json::from_str(r#"{"regimes": ["old", "new"]}"#).unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.failure_policy, RegimeFailurePolicy::FailFast);

        let request: BreakdownRequest =
            serde_json::from_str(r#"{"fy": "2025-26", "regimes": []}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_failure_policy_wire_names() {
        let request: BreakdownRequest =
            serde_json::from_str(r#"{"regimes": ["old"], "failurePolicy": "partial"}"#).unwrap();
        assert_eq!(request.failure_policy, RegimeFailurePolicy::Partial);
    }
}
