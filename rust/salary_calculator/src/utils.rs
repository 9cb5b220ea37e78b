// src/utils.rs

use serde::{de, Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Negative, NaN and infinite amounts count as zero.
pub fn clamp_amount(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

pub fn clamp_percent(value: f64) -> f64 {
    clamp_amount(value).min(100.0)
}

pub fn round_rupee(value: f64) -> f64 {
    let rounded = value.round();
    // avoid serializing -0
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

// Form fields arrive as numbers, numeric strings ("1,50,000"), blanks or null
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

fn parse_raw_amount<E: de::Error>(raw: Option<RawAmount>) -> Result<f64, E> {
    match raw {
        None => Ok(0.0),
        Some(RawAmount::Number(n)) => Ok(n),
        Some(RawAmount::Text(s)) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            if cleaned.is_empty() {
                Ok(0.0)
            } else {
                cleaned.parse::<f64>().map_err(de::Error::custom)
            }
        }
    }
}

pub fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    parse_raw_amount(Option::<RawAmount>::deserialize(deserializer)?)
}

/// Whole years; negative, blank or missing ages count as zero.
pub fn lenient_age<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let years = parse_raw_amount::<D::Error>(Option::<RawAmount>::deserialize(deserializer)?)?;
    Ok(clamp_amount(years).floor().min(u32::MAX as f64) as u32)
}

/// Missing or null checkboxes count as unchecked.
pub fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

pub fn lenient_amounts<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Option<RawAmount>>>::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|(section, amount)| parse_raw_amount(amount).map(|value| (section, value)))
        .collect()
}
