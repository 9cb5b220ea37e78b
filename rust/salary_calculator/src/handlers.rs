// src/handlers.rs

use crate::engine::SalaryBreakdownEngine;
use crate::error::{ApiError, CalculationError};
use crate::models::{BreakdownRequest, CalculationOptions};
use actix_web::{get, post, web, HttpResponse, Responder};
use tax_rules::FinancialYear;
use validator::Validate;

#[post("/salary-breakdown")]
pub async fn salary_breakdown(
    engine: web::Data<SalaryBreakdownEngine>,
    request: web::Json<BreakdownRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    request.validate()?;

    // Without an explicit year, use the one containing today
    let fy = match request.fy.as_deref().map(str::trim) {
        Some(fy) if !fy.is_empty() => FinancialYear::parse(fy)?,
        _ => FinancialYear::current(None),
    };

    let options = CalculationOptions {
        fy: fy.to_string(),
        regimes: request.regimes,
        failure_policy: request.failure_policy,
    };

    let breakdown = engine.calculate_salary_breakdown(&request.profile, &options)?;
    Ok(HttpResponse::Ok().json(breakdown))
}

#[get("/rules/{fy}")]
pub async fn rules_for_year(
    engine: web::Data<SalaryBreakdownEngine>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let fy = FinancialYear::parse(&path.into_inner())?.to_string();
    let document = engine
        .store()
        .get(&fy)
        .ok_or(CalculationError::RulesNotFound { fy: fy.clone() })?;

    Ok(HttpResponse::Ok().json(document))
}

#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("OK")
}
