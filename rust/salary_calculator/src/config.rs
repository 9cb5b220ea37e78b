// src/config.rs

use log::info;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use tax_rules::FinancialYear;
use thiserror::Error;

pub const DEFAULT_PRELOAD_FY: &str = "2024-25,2025-26";

#[derive(Debug, Error, PartialEq)]
#[error("Invalid {key} value {value:?}: {reason}")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub preload_years: Vec<String>,
    pub rules_dir: Option<PathBuf>,
    pub rules_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let preload = try_load::<String, _>(&lookup, "SALARY_PRELOAD_FY", DEFAULT_PRELOAD_FY)?;

        Ok(Config {
            host: try_load(&lookup, "SALARY_HOST", "127.0.0.1")?,
            port: try_load(&lookup, "SALARY_PORT", "8080")?,
            preload_years: parse_years("SALARY_PRELOAD_FY", &preload)?,
            rules_dir: optional(&lookup, "SALARY_RULES_DIR").map(PathBuf::from),
            rules_url: optional(&lookup, "SALARY_RULES_URL"),
        })
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn try_load<T, F>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let value = optional(lookup, key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse::<T>().map_err(|e| ConfigError {
        key: key.to_string(),
        value: value.clone(),
        reason: e.to_string(),
    })
}

fn parse_years(key: &str, raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|fy| !fy.is_empty())
        .map(|fy| {
            FinancialYear::parse(fy)
                .map(|parsed| parsed.to_string())
                .map_err(|e| ConfigError {
                    key: key.to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                })
        })
        .collect()
}
