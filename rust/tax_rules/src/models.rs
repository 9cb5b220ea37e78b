// src/models.rs

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::error::RulesError;

/// Indian financial year, 1 April to 31 March, written as `"2025-26"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FinancialYear {
    start_year: i32,
}

impl FinancialYear {
    pub fn new(start_year: i32) -> Self {
        FinancialYear { start_year }
    }

    pub fn parse(s: &str) -> Result<Self, RulesError> {
        let invalid = || RulesError::InvalidFinancialYear(s.to_string());

        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        if start.len() != 4 || end.len() != 2 {
            return Err(invalid());
        }
        let start_year: i32 = start.parse().map_err(|_| invalid())?;
        let end_suffix: i32 = end.parse().map_err(|_| invalid())?;
        if (start_year + 1) % 100 != end_suffix {
            return Err(invalid());
        }

        Ok(FinancialYear { start_year })
    }

    /// The financial year a given date falls in.
    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= 4 {
            FinancialYear::new(date.year())
        } else {
            FinancialYear::new(date.year() - 1)
        }
    }

    // `current_date` is mockable, otherwise today's date is used
    pub fn current(current_date: Option<NaiveDate>) -> Self {
        let today = current_date.unwrap_or_else(|| Utc::now().naive_utc().date());
        Self::containing(today)
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn starts_on(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year, 4, 1)
    }

    pub fn ends_on(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year + 1, 3, 31)
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.start_year, (self.start_year + 1) % 100)
    }
}

impl FromStr for FinancialYear {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FinancialYear::parse(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgeBand {
    General,
    Senior,
    SuperSenior,
}

impl AgeBand {
    pub fn from_age(age: u32) -> Self {
        match age {
            0..=59 => AgeBand::General,
            60..=79 => AgeBand::Senior,
            _ => AgeBand::SuperSenior,
        }
    }
}

/// Deduction sections a taxpayer can claim under the old regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Sec80C,
    Sec80D,
    Sec80CCD1B,
}

impl Section {
    pub fn code(&self) -> &'static str {
        match self {
            Section::Sec80C => "80C",
            Section::Sec80D => "80D",
            Section::Sec80CCD1B => "80CCD1B",
        }
    }
}

impl FromStr for Section {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "80C" => Ok(Section::Sec80C),
            "80D" => Ok(Section::Sec80D),
            "80CCD1B" | "80CCD(1B)" => Ok(Section::Sec80CCD1B),
            _ => Err(()),
        }
    }
}

/// One progressive bracket. `upper: None` means no upper limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Slab {
    #[validate(range(min = 0.0))]
    pub lower: f64,
    #[serde(default)]
    pub upper: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub rate: f64,
}

impl Slab {
    pub fn new(lower: f64, upper: Option<f64>, rate: f64) -> Self {
        Slab { lower, upper, rate }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RebateRules {
    #[validate(range(min = 0.0))]
    pub threshold: f64,
    #[validate(range(min = 0.0))]
    pub cap: f64,
    #[serde(default)]
    pub marginal_relief: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SurchargeBand {
    #[validate(range(min = 0.0))]
    pub threshold: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AgeBandedCap {
    #[validate(range(min = 0.0))]
    pub general: f64,
    #[validate(range(min = 0.0))]
    pub senior: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SectionCaps {
    #[serde(rename = "80C")]
    #[validate(range(min = 0.0))]
    pub sec_80c: f64,
    #[serde(rename = "80D")]
    pub sec_80d: AgeBandedCap,
    #[serde(rename = "80CCD1B")]
    #[validate(range(min = 0.0))]
    pub sec_80ccd1b: f64,
}

impl SectionCaps {
    pub fn cap_for(&self, section: Section, band: AgeBand) -> f64 {
        match section {
            Section::Sec80C => self.sec_80c,
            Section::Sec80D => match band {
                AgeBand::General => self.sec_80d.general,
                AgeBand::Senior | AgeBand::SuperSenior => self.sec_80d.senior,
            },
            Section::Sec80CCD1B => self.sec_80ccd1b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HraRules {
    #[validate(range(min = 0.0, max = 1.0))]
    pub metro_percent_of_basic: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub non_metro_percent_of_basic: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub rent_excess_percent_of_basic: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CapitalGainsRules {
    #[validate(range(min = 0.0, max = 1.0))]
    pub stcg_rate: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub ltcg_rate: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub ltcg_exemption: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeductionMode {
    /// HRA exemption and chapter VI-A sections are allowed.
    Itemized,
    /// Only the regime's own standard deduction applies.
    StandardOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegimeRules {
    pub deduction_mode: DeductionMode,
    pub slabs: Vec<Slab>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub senior_slabs: Option<Vec<Slab>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_senior_slabs: Option<Vec<Slab>>,
    #[validate(range(min = 0.0))]
    pub standard_deduction: f64,
    pub rebate: RebateRules,
    #[serde(default)]
    pub surcharge: Vec<SurchargeBand>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub cess_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_caps: Option<SectionCaps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hra: Option<HraRules>,
    pub capital_gains: CapitalGainsRules,
}

impl RegimeRules {
    pub fn allows_itemized_deductions(&self) -> bool {
        self.deduction_mode == DeductionMode::Itemized
    }

    /// Slab table for an age band, falling back to the general table.
    pub fn slabs_for(&self, band: AgeBand) -> &[Slab] {
        let banded = match band {
            AgeBand::General => None,
            AgeBand::Senior => self.senior_slabs.as_ref(),
            AgeBand::SuperSenior => self
                .super_senior_slabs
                .as_ref()
                .or(self.senior_slabs.as_ref()),
        };
        banded.unwrap_or(&self.slabs)
    }

    pub fn check(&self, fy: &str, regime: &str) -> Result<(), RulesError> {
        let invalid = |reason: String| RulesError::Invalid {
            fy: fy.to_string(),
            regime: regime.to_string(),
            reason,
        };

        self.validate()?;
        self.rebate.validate()?;
        self.capital_gains.validate()?;

        let tables = [
            Some(&self.slabs),
            self.senior_slabs.as_ref(),
            self.super_senior_slabs.as_ref(),
        ];
        for table in tables.into_iter().flatten() {
            for slab in table {
                slab.validate()?;
            }
            check_slab_coverage(table).map_err(invalid)?;

            // Income at the rebate threshold must come out tax-free
            let due = tax_at(table, self.rebate.threshold);
            if due > self.rebate.cap + 1e-6 {
                return Err(invalid(format!(
                    "rebate cap {} is below slab tax {} at threshold {}",
                    self.rebate.cap, due, self.rebate.threshold
                )));
            }
        }

        let mut previous = None;
        for band in &self.surcharge {
            band.validate()?;
            if previous.map_or(false, |p| band.threshold <= p) {
                return Err(invalid("surcharge thresholds must increase".to_string()));
            }
            previous = Some(band.threshold);
        }

        if self.allows_itemized_deductions() {
            let caps = self
                .section_caps
                .as_ref()
                .ok_or_else(|| invalid("itemized regime without section caps".to_string()))?;
            caps.validate()?;
            caps.sec_80d.validate()?;
            self.hra
                .as_ref()
                .ok_or_else(|| invalid("itemized regime without HRA rules".to_string()))?
                .validate()?;
        }

        Ok(())
    }
}

fn tax_at(slabs: &[Slab], income: f64) -> f64 {
    slabs
        .iter()
        .filter(|slab| income > slab.lower)
        .map(|slab| {
            let top = slab.upper.map_or(income, |upper| income.min(upper));
            (top - slab.lower) * slab.rate
        })
        .sum()
}

/// Slabs must start at 0, be contiguous and end with an open upper bound.
fn check_slab_coverage(slabs: &[Slab]) -> Result<(), String> {
    let first = slabs.first().ok_or("slab table is empty")?;
    if first.lower != 0.0 {
        return Err(format!("first slab starts at {} instead of 0", first.lower));
    }

    for (i, slab) in slabs.iter().enumerate() {
        let is_last = i + 1 == slabs.len();
        match (slab.upper, is_last) {
            (None, true) => {}
            (None, false) => return Err(format!("slab {} is unbounded but not last", i)),
            (Some(_), true) => return Err("last slab must have no upper bound".to_string()),
            (Some(upper), false) => {
                if upper <= slab.lower {
                    return Err(format!("slab {} has upper {} <= lower {}", i, upper, slab.lower));
                }
                if slabs[i + 1].lower != upper {
                    return Err(format!("gap or overlap after slab {} at {}", i, upper));
                }
            }
        }
    }

    Ok(())
}

/// Every regime's rules for one financial year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesDocument {
    pub financial_year: String,
    pub regimes: BTreeMap<String, RegimeRules>,
}

impl RulesDocument {
    pub fn regime(&self, name: &str) -> Option<&RegimeRules> {
        self.regimes.get(name)
    }

    pub fn regime_names(&self) -> impl Iterator<Item = &str> {
        self.regimes.keys().map(String::as_str)
    }

    pub fn check(&self) -> Result<(), RulesError> {
        FinancialYear::parse(&self.financial_year)?;
        for (name, rules) in &self.regimes {
            rules.check(&self.financial_year, name)?;
        }
        Ok(())
    }
}
