// src/lib.rs

pub mod capital_gains;
pub mod config;
pub mod deductions;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod relief;
pub mod slabs;
pub mod utils;

use actix_web::error::InternalError;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use log::{info, warn};
use tax_rules::{fetch_remote_rules, BuiltinRules, JsonDirectoryFetcher, RulesError, TaxRulesStore};

use crate::config::Config;
use crate::engine::SalaryBreakdownEngine;
use crate::handlers::{health_check, rules_for_year, salary_breakdown};
use crate::models::ErrorResponse;

/// Registers the JSON error handler and all routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let message = format!("Malformed request body: {}", err);
        InternalError::from_response(err, HttpResponse::BadRequest().json(ErrorResponse::new(message)))
            .into()
    });

    cfg.app_data(json_config)
        .service(salary_breakdown)
        .service(rules_for_year)
        .service(health_check);
}

/// Loads every configured financial year, remote first, then a rules
/// directory, then the built-in documents.
pub async fn build_engine(config: &Config) -> Result<SalaryBreakdownEngine, RulesError> {
    let mut store = TaxRulesStore::new();
    let client = reqwest::Client::new();

    for fy in &config.preload_years {
        if let Some(url) = &config.rules_url {
            let document = fetch_remote_rules(&client, url, fy).await?;
            store.install(document)?;
            continue;
        }

        if let Some(dir) = &config.rules_dir {
            match store.fetch_rules_for_fy(fy, &JsonDirectoryFetcher::new(dir)) {
                Ok(()) => continue,
                Err(RulesError::NotFound(_)) => {
                    warn!("No rules for {} in {}, using built-in rules", fy, dir.display())
                }
                Err(e) => return Err(e),
            }
        }

        store.fetch_rules_for_fy(fy, &BuiltinRules)?;
    }

    Ok(SalaryBreakdownEngine::new(store))
}

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let engine = build_engine(&config)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    let engine = web::Data::new(engine);

    info!("Starting salary calculator at http://{}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(engine.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
