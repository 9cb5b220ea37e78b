// src/error.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use tax_rules::RulesError;
use thiserror::Error;

use crate::models::ErrorResponse;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalculationError {
    #[error("No tax rules loaded for financial year {fy}")]
    RulesNotFound { fy: String },

    #[error("Regime '{regime}' is not supported for financial year {fy}")]
    UnsupportedRegime { fy: String, regime: String },

    #[error("At least one regime must be requested")]
    NoRegimesRequested,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Calculation(#[from] CalculationError),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Rules(#[from] RulesError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Calculation(CalculationError::RulesNotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Calculation(CalculationError::UnsupportedRegime { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Calculation(CalculationError::NoRegimesRequested) => StatusCode::BAD_REQUEST,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Rules(RulesError::InvalidFinancialYear(_)) => StatusCode::BAD_REQUEST,
            ApiError::Rules(RulesError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Rules(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.to_string()))
    }
}
