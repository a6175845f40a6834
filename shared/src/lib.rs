use chrono::{DateTime, NaiveDateTime, Utc};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum_macros::{AsRefStr, EnumString};

/// Body of a successful `POST /predict`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionResponse {
    pub success: bool,
    pub timestamp: String,
    pub diagnosis: String,
    pub confidence: f64,
    pub risk_level: String,
    pub probability_scores: ProbabilityScores,
    pub recommendations: Vec<String>,
    pub model_info: ModelInfo,
    pub disclaimer: String,
}

/// Per-class probabilities in percent. The server does not promise they sum to 100.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProbabilityScores {
    #[serde(rename = "NORMAL")]
    pub normal: f64,
    #[serde(rename = "PNEUMONIA")]
    pub pneumonia: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelInfo {
    pub model_name: String,
    pub recall: String,
    pub false_negative_rate: String,
    pub note: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub version: String,
    pub timestamp: String,
}

/// User-facing failure. `code` is the HTTP status, or 0 when no response was received.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default)]
    pub code: u16,
}

/// Free-form metadata returned by `GET /model-info`.
pub type ModelInfoMap = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Diagnosis {
    Normal,
    Pneumonia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Unknown,
}

/// Opaque handle to an image the user picked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
pub struct ImageRef(String);

impl ErrorResponse {
    pub fn new(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    pub fn without_code(message: impl Into<String>) -> Self {
        Self::new(message, 0)
    }
}

impl PredictionResponse {
    /// Interprets the server label. The label itself is kept verbatim in `diagnosis`.
    pub fn diagnosis_kind(&self) -> Option<Diagnosis> {
        Diagnosis::from_str(self.diagnosis.trim()).ok()
    }

    pub fn risk(&self) -> RiskLevel {
        RiskLevel::from_str(self.risk_level.trim()).unwrap_or(RiskLevel::Unknown)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

impl ImageRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }
}

impl From<&Path> for ImageRef {
    fn from(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

impl From<&str> for ImageRef {
    fn from(uri: &str) -> Self {
        Self(uri.to_string())
    }
}

// Python backends commonly emit naive ISO-8601 without an offset; those are read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
