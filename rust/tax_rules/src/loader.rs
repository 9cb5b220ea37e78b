// src/loader.rs

use lazy_static::lazy_static;
use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::RulesError;
use crate::models::{FinancialYear, RulesDocument};

/// Source of per-financial-year rules documents.
pub trait RulesFetcher {
    fn fetch_rules_for_fy(&self, fy: &str) -> Result<RulesDocument, RulesError>;
}

lazy_static! {
    static ref BUILTIN_DOCUMENTS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("2024-25", include_str!("../data/fy2024-25.json"));
        m.insert("2025-26", include_str!("../data/fy2025-26.json"));
        m
    };
}

/// Rules documents compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRules;

impl BuiltinRules {
    pub fn financial_years() -> Vec<&'static str> {
        let mut years: Vec<&'static str> = BUILTIN_DOCUMENTS.keys().copied().collect();
        years.sort_unstable();
        years
    }
}

impl RulesFetcher for BuiltinRules {
    fn fetch_rules_for_fy(&self, fy: &str) -> Result<RulesDocument, RulesError> {
        let fy = FinancialYear::parse(fy)?.to_string();
        let raw = BUILTIN_DOCUMENTS
            .get(fy.as_str())
            .ok_or_else(|| RulesError::NotFound(fy.clone()))?;
        Ok(serde_json::from_str(raw)?)
    }
}

/// Reads `<dir>/fy<fy>.json`, e.g. `rules/fy2025-26.json`.
#[derive(Debug, Clone)]
pub struct JsonDirectoryFetcher {
    dir: PathBuf,
}

impl JsonDirectoryFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonDirectoryFetcher { dir: dir.into() }
    }

    pub fn path_for(&self, fy: &FinancialYear) -> PathBuf {
        self.dir.join(format!("fy{}.json", fy))
    }
}

impl RulesFetcher for JsonDirectoryFetcher {
    fn fetch_rules_for_fy(&self, fy: &str) -> Result<RulesDocument, RulesError> {
        let parsed = FinancialYear::parse(fy)?;
        let path = self.path_for(&parsed);
        debug!("Reading rules for {} from {}", parsed, path.display());

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RulesError::NotFound(parsed.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Fetches `<base_url>/rules/<fy>` from a remote rules service.
pub async fn fetch_remote_rules(
    client: &reqwest::Client,
    base_url: &str,
    fy: &str,
) -> Result<RulesDocument, RulesError> {
    let parsed = FinancialYear::parse(fy)?;
    let url = format!("{}/rules/{}", base_url.trim_end_matches('/'), parsed);
    info!("Fetching rules for {} from {}", parsed, url);

    let response = client.get(&url).send().await?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(RulesError::NotFound(parsed.to_string()));
    }

    let document = response.error_for_status()?.json::<RulesDocument>().await?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_builtin_years() {
        assert_eq!(BuiltinRules::financial_years(), vec!["2024-25", "2025-26"]);
    }

    #[test]
    fn test_builtin_documents_are_valid() {
        for fy in BuiltinRules::financial_years() {
            let document = BuiltinRules.fetch_rules_for_fy(fy).unwrap();
            assert_eq!(document.financial_year, fy);
            document.check().unwrap();
        }
    }

    #[test]
    fn test_builtin_regimes() {
        let document = BuiltinRules.fetch_rules_for_fy("2025-26").unwrap();
        let names: Vec<&str> = document.regime_names().collect();
        assert_eq!(names, vec!["new", "new_post_2025", "old"]);

        let document = BuiltinRules.fetch_rules_for_fy("2024-25").unwrap();
        assert!(document.regime("new_post_2025").is_none());
    }

    #[test]
    fn test_builtin_unknown_year() {
        match BuiltinRules.fetch_rules_for_fy("1990-91") {
            Err(RulesError::NotFound(fy)) => assert_eq!(fy, "1990-91"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_malformed_year() {
        assert!(matches!(
            BuiltinRules.fetch_rules_for_fy("FY25"),
            Err(RulesError::InvalidFinancialYear(_))
        ));
    }

    #[test]
    fn test_json_directory_fetcher() {
        let dir = env::temp_dir().join(format!("tax_rules_loader_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("fy2025-26.json"),
            include_str!("../data/fy2025-26.json"),
        )
        .unwrap();

        let fetcher = JsonDirectoryFetcher::new(&dir);
        let document = fetcher.fetch_rules_for_fy("2025-26").unwrap();
        assert_eq!(document.financial_year, "2025-26");

        assert!(matches!(
            fetcher.fetch_rules_for_fy("2030-31"),
            Err(RulesError::NotFound(_))
        ));

        fs::write(dir.join("fy2026-27.json"), "{ not json").unwrap();
        assert!(matches!(
            fetcher.fetch_rules_for_fy("2026-27"),
            Err(RulesError::Parse(_))
        ));

        fs::remove_dir_all(&dir).unwrap();
    }
}
