pub mod config;
pub mod dose;
pub mod streak;
pub mod summary;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Read a JSON snapshot handed over by the persistence layer.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> adherence_core::Result<T> {
    tracing::debug!("Reading {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Parse an RFC 3339 instant, defaulting to now.
pub fn instant_or_now(value: Option<&str>) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match value {
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .map_err(|e| format!("invalid timestamp '{s}': {e}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
