use crate::viewmodel::UiState;
use shared::{Diagnosis, ModelInfoMap, PredictionResponse, RiskLevel};
use std::fmt;

const RULE: &str = "----------------------------------------";

pub fn render_health(healthy: bool) -> &'static str {
    if healthy { "Online" } else { "Waking Up..." }
}

pub fn render_state(state: &UiState) -> String {
    match state {
        UiState::Success(response) => render_prediction(response),
        UiState::Error(message) => render_failure(message),
        UiState::Loading => "Analyzing...\n".to_string(),
        UiState::Idle => "No results available\n".to_string(),
    }
}

pub fn render_failure(message: &str) -> String {
    format!("Analysis Failed\n{}\n", message)
}

pub fn render_prediction(response: &PredictionResponse) -> String {
    PredictionReport(response).to_string()
}

pub fn render_model_info(info: &ModelInfoMap) -> String {
    ModelInfoReport(info).to_string()
}

/// The result screen as plain text.
pub struct PredictionReport<'a>(pub &'a PredictionResponse);

impl fmt::Display for PredictionReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let response = self.0;
        let headline = match response.diagnosis_kind() {
            Some(Diagnosis::Pneumonia) => "Pneumonia Detected",
            Some(Diagnosis::Normal) => "Normal",
            None => response.diagnosis.as_str(),
        };
        let risk = match response.risk() {
            RiskLevel::Unknown => response.risk_level.to_uppercase(),
            level => level.to_string(),
        };

        writeln!(f, "Analysis Result")?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "{}", headline)?;
        writeln!(f, "Confidence: {:.2}%", response.confidence)?;
        writeln!(f, "Risk level: {}", risk)?;
        if let Some(issued_at) = response.issued_at() {
            writeln!(f, "Analyzed at: {}", issued_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        }

        writeln!(f, "\nProbability Analysis")?;
        writeln!(f, "  Normal:    {:>6.2}%", response.probability_scores.normal)?;
        writeln!(f, "  Pneumonia: {:>6.2}%", response.probability_scores.pneumonia)?;

        writeln!(f, "\nModel Details")?;
        writeln!(f, "  Model:  {}", response.model_info.model_name)?;
        writeln!(f, "  Recall: {}", response.model_info.recall)?;
        if !response.model_info.note.is_empty() {
            writeln!(f, "  {}", response.model_info.note)?;
        }

        if !response.recommendations.is_empty() {
            writeln!(f, "\nRecommendations")?;
            for (index, recommendation) in response.recommendations.iter().enumerate() {
                writeln!(f, "  {}. {}", index + 1, recommendation)?;
            }
        }

        writeln!(f, "\nImportant Disclaimer")?;
        writeln!(f, "{}", response.disclaimer)
    }
}

/// `/model-info` entries, sorted by key.
pub struct ModelInfoReport<'a>(pub &'a ModelInfoMap);

impl fmt::Display for ModelInfoReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        writeln!(f, "Model Info")?;
        for (key, value) in entries {
            match value.as_str() {
                Some(text) => writeln!(f, "  {}: {}", key, text)?,
                None => writeln!(f, "  {}: {}", key, value)?,
            }
        }
        Ok(())
    }
}
