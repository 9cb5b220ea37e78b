// src/store.rs

use log::{info, warn};
use std::collections::HashMap;

use crate::error::RulesError;
use crate::loader::RulesFetcher;
use crate::models::{FinancialYear, RegimeRules, RulesDocument};

/// Validated rules keyed by financial year.
///
/// Populated before calculations start, then shared read-only (typically
/// behind an `Arc`).
#[derive(Debug, Clone, Default)]
pub struct TaxRulesStore {
    documents: HashMap<String, RulesDocument>,
}

impl TaxRulesStore {
    pub fn new() -> Self {
        TaxRulesStore::default()
    }

    pub fn fetch_rules_for_fy(
        &mut self,
        fy: &str,
        fetcher: &dyn RulesFetcher,
    ) -> Result<(), RulesError> {
        let fy = FinancialYear::parse(fy)?.to_string();
        let document = fetcher.fetch_rules_for_fy(&fy)?;
        if document.financial_year != fy {
            return Err(RulesError::Mismatch {
                fy,
                found: document.financial_year,
            });
        }
        self.install(document)
    }

    /// Adds an already fetched document, replacing any earlier one for its year.
    pub fn install(&mut self, document: RulesDocument) -> Result<(), RulesError> {
        if let Err(e) = document.check() {
            warn!("Rejected rules for {}: {}", document.financial_year, e);
            return Err(e);
        }

        let fy = FinancialYear::parse(&document.financial_year)?.to_string();
        info!(
            "Loaded rules for {} ({})",
            fy,
            document.regime_names().collect::<Vec<_>>().join(", ")
        );
        self.documents.insert(fy, document);
        Ok(())
    }

    pub fn get(&self, fy: &str) -> Option<&RulesDocument> {
        self.documents.get(fy.trim())
    }

    pub fn regime(&self, fy: &str, regime: &str) -> Option<&RegimeRules> {
        self.get(fy).and_then(|document| document.regime(regime))
    }

    pub fn contains(&self, fy: &str) -> bool {
        self.get(fy).is_some()
    }

    pub fn financial_years(&self) -> Vec<&str> {
        let mut years: Vec<&str> = self.documents.keys().map(String::as_str).collect();
        years.sort_unstable();
        years
    }
}
