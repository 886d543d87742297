//! Query plan models.

use serde::{Deserialize, Serialize};

/// Confidence of a query taken from the predefined table.
pub const PREDEFINED_CONFIDENCE: f64 = 1.0;
/// Confidence of a hand-written template hit.
pub const TEMPLATE_CONFIDENCE: f64 = 0.9;
/// Confidence of a query produced by the text-generation service.
pub const GENERATED_CONFIDENCE: f64 = 0.7;
/// Confidence of the canned fallback.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Below this confidence the response suggests rephrasing.
pub const LOW_CONFIDENCE_HINT_THRESHOLD: f64 = 0.6;

/// Where a query came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryOrigin {
    Predefined,
    TemplateMatched,
    Generated,
    FallbackGenerated,
}

impl std::fmt::Display for QueryOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Predefined => write!(f, "predefined"),
            Self::TemplateMatched => write!(f, "template-matched"),
            Self::Generated => write!(f, "generated"),
            Self::FallbackGenerated => write!(f, "fallback-generated"),
        }
    }
}

/// Qualitative confidence label, display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

impl ConfidenceLabel {
    pub fn from_score(confidence: f64) -> Self {
        if confidence > 0.8 {
            Self::High
        } else if confidence > 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// A query ready to run, with how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub sql: String,
    pub origin: QueryOrigin,
    /// Heuristic in [0, 1]; display only.
    pub confidence: f64,
    /// Name of the ready-made query, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl QueryPlan {
    pub fn new(sql: impl Into<String>, origin: QueryOrigin, confidence: f64) -> Self {
        Self {
            sql: sql.into(),
            origin,
            confidence: confidence.clamp(0.0, 1.0),
            name: None,
        }
    }

    pub fn predefined(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::new(sql, QueryOrigin::Predefined, PREDEFINED_CONFIDENCE).with_name(name)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn confidence_label(&self) -> ConfidenceLabel {
        ConfidenceLabel::from_score(self.confidence)
    }

    pub fn is_low_confidence(&self) -> bool {
        self.confidence < LOW_CONFIDENCE_HINT_THRESHOLD
    }
}
