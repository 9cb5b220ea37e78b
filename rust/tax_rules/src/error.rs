// src/error.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("No tax rules found for financial year {0}")]
    NotFound(String),

    #[error("Invalid financial year format: {0}")]
    InvalidFinancialYear(String),

    #[error("Rules for {fy} were published as {found}")]
    Mismatch { fy: String, found: String },

    #[error("Invalid rules for {fy}/{regime}: {reason}")]
    Invalid {
        fy: String,
        regime: String,
        reason: String,
    },

    #[error("Rules failed validation: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse rules document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to fetch remote rules: {0}")]
    Http(#[from] reqwest::Error),
}
