use serde::{Deserialize, Serialize};

/// Response body of the prediction service, carried verbatim.
///
/// Nothing here validates the body. The accessors only read the shape the
/// service is known to produce, for the result view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationResult(serde_json::Value);

impl EvaluationResult {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }

    /// Typed reading of `{probabilidad, nivel_riesgo, factores_influyentes}`.
    pub fn assessment(&self) -> Option<RiskAssessment> {
        serde_json::from_value(self.0.clone()).ok()
    }

    /// The service reports some internal failures as 200 + `{"error": "..."}`.
    pub fn service_error(&self) -> Option<&str> {
        self.0.get("error").and_then(|v| v.as_str())
    }
}

impl From<serde_json::Value> for EvaluationResult {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// The service's prediction, when the body has the expected shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Percentage, 0-100, two decimals.
    #[serde(rename = "probabilidad")]
    pub probability: f64,
    #[serde(rename = "nivel_riesgo")]
    pub risk_level: String,
    #[serde(rename = "factores_influyentes", default)]
    pub influencing_factors: Vec<String>,
}

impl RiskAssessment {
    /// Band from the label, falling back to the probability thresholds.
    pub fn band(&self) -> RiskBand {
        RiskBand::from_label(&self.risk_level)
            .unwrap_or_else(|| RiskBand::from_probability(self.probability))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Moderate,
    High,
}

impl RiskBand {
    pub const HIGH_THRESHOLD: f64 = 65.0;
    pub const MODERATE_THRESHOLD: f64 = 35.0;

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "bajo" | "low" => Some(Self::Low),
            "moderado" | "moderate" => Some(Self::Moderate),
            "alto" | "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn from_probability(percent: f64) -> Self {
        if percent >= Self::HIGH_THRESHOLD {
            Self::High
        } else if percent >= Self::MODERATE_THRESHOLD {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Low => "Low risk",
            Self::Moderate => "Moderate risk",
            Self::High => "High risk",
        }
    }
}
