// src/lib.rs

pub mod error;
pub mod loader;
pub mod models;
pub mod store;

pub use error::RulesError;
pub use loader::{fetch_remote_rules, BuiltinRules, JsonDirectoryFetcher, RulesFetcher};
pub use models::{AgeBand, FinancialYear, RegimeRules, RulesDocument, Section, Slab};
pub use store::TaxRulesStore;
