use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// One short situation description, a single line of generator output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scenario(String);

impl Scenario {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scenario {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

// ---------------------------------------------------------------------------
// ValidationOutcome
// ---------------------------------------------------------------------------

/// A decoded `{result, reason}` judgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub reason: String,
}

impl ValidationOutcome {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            passed: true,
            reason: reason.into(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ContentDraft
// ---------------------------------------------------------------------------

/// Generated content plus its rewrite audit trail.
///
/// Once `rewritten` is set, `original_text` holds the text that existed before
/// the first rewrite and is never replaced by later rewrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDraft {
    pub text: String,
    pub attempt_index: u32,
    pub rewritten: bool,
    pub original_text: Option<String>,
}

impl ContentDraft {
    pub fn new(text: impl Into<String>, attempt_index: u32) -> Self {
        Self {
            text: text.into(),
            attempt_index,
            rewritten: false,
            original_text: None,
        }
    }

    /// Replace the text with a rewrite, capturing the pre-rewrite text on the first call.
    pub fn apply_rewrite(&mut self, rewritten: impl Into<String>) {
        let rewritten = rewritten.into();
        if !self.rewritten {
            self.original_text = Some(std::mem::replace(&mut self.text, rewritten));
            self.rewritten = true;
        } else {
            self.text = rewritten;
        }
    }

    /// The text before any rewrite.
    pub fn pre_rewrite_text(&self) -> &str {
        self.original_text.as_deref().unwrap_or(&self.text)
    }

    /// The final text if a rewrite happened.
    pub fn rewritten_text(&self) -> Option<&str> {
        self.rewritten.then_some(self.text.as_str())
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// A catalog entry. Read-only from the workflow's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(alias = "k3_code")]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub core_selling_point: String,
    #[serde(default, alias = "product_selling_points")]
    pub selling_points: String,
    #[serde(default)]
    pub formula_source: String,
    #[serde(default)]
    pub usage_method: String,
}

/// The single product recommended for a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecommendedProduct {
    pub code: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub selling_points: String,
    pub formula_source: String,
}

impl RecommendedProduct {
    /// Flatten the product into the descriptor handed to the rewrite stage.
    pub fn context_string(&self) -> String {
        let mut parts: Vec<String> = [&self.name, &self.description, &self.price]
            .into_iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
        if !self.selling_points.trim().is_empty() {
            parts.push(format!("selling points:{}", self.selling_points.trim()));
        }
        if !self.formula_source.trim().is_empty() {
            parts.push(format!("formula source:{}", self.formula_source.trim()));
        }
        parts.join("-")
    }
}

impl From<&ProductRecord> for RecommendedProduct {
    fn from(record: &ProductRecord) -> Self {
        Self {
            code: record.code.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            price: record.price.to_string(),
            selling_points: record.selling_points.clone(),
            formula_source: record.formula_source.clone(),
        }
    }
}

/// Outcome of the recommendation stage for one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub success: bool,
    pub reason: String,
    pub error: Option<String>,
    pub product: Option<RecommendedProduct>,
}

impl RecommendationRecord {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: String::new(),
            error: Some(error.into()),
            product: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Status and stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    Success,
    RewriteSuccess,
    ContentFailed,
    ValidationFailed,
    ScenarioFailed,
    Exception,
}

impl FinalStatus {
    pub const ALL: [FinalStatus; 6] = [
        FinalStatus::Success,
        FinalStatus::RewriteSuccess,
        FinalStatus::ContentFailed,
        FinalStatus::ValidationFailed,
        FinalStatus::ScenarioFailed,
        FinalStatus::Exception,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RewriteSuccess => "rewrite_success",
            Self::ContentFailed => "content_failed",
            Self::ValidationFailed => "validation_failed",
            Self::ScenarioFailed => "scenario_failed",
            Self::Exception => "exception",
        }
    }
}

impl fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Furthest pipeline stage a scenario reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    ScenarioValidation,
    ContentGeneration,
    ContentValidation,
    ProductRecommendation,
    Rewrite,
    Completed,
}

impl ProcessingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScenarioValidation => "scenario_validation",
            Self::ContentGeneration => "content_generation",
            Self::ContentValidation => "content_validation",
            Self::ProductRecommendation => "product_recommendation",
            Self::Rewrite => "rewrite",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ResultRecord
// ---------------------------------------------------------------------------

/// Terminal summary of one scenario's pass through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub user_input: String,
    pub persona: String,
    pub scenario: Scenario,
    pub scenario_validation: Option<ValidationOutcome>,
    pub draft: Option<ContentDraft>,
    pub content_validation: Option<ValidationOutcome>,
    pub recommendation: RecommendationRecord,
    pub stage_reached: ProcessingStage,
    pub final_status: FinalStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ResultRecord {
    pub fn scenario_passed(&self) -> bool {
        self.scenario_validation.as_ref().is_some_and(|v| v.passed)
    }

    pub fn content_passed(&self) -> bool {
        self.content_validation.as_ref().is_some_and(|v| v.passed)
    }

    /// Counts as usable output: both judgments passed and the pipeline finished cleanly.
    pub fn is_valid(&self) -> bool {
        self.scenario_passed() && self.content_passed() && self.final_status == FinalStatus::Success
    }

    /// Final content text, after any rewrite.
    pub fn content(&self) -> Option<&str> {
        self.draft.as_ref().map(|d| d.text.as_str())
    }

    pub fn product(&self) -> Option<&RecommendedProduct> {
        self.recommendation.product.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_captures_original_once() {
        let mut draft = ContentDraft::new("first", 0);
        assert!(draft.rewritten_text().is_none());

        draft.apply_rewrite("second");
        draft.apply_rewrite("third");

        assert!(draft.rewritten);
        assert_eq!(draft.text, "third");
        assert_eq!(draft.original_text.as_deref(), Some("first"));
        assert_eq!(draft.pre_rewrite_text(), "first");
        assert_eq!(draft.rewritten_text(), Some("third"));
    }

    #[test]
    fn unrewritten_draft_reports_its_own_text() {
        let draft = ContentDraft::new("plain", 2);
        assert_eq!(draft.pre_rewrite_text(), "plain");
        assert_eq!(draft.attempt_index, 2);
    }

    #[test]
    fn context_string_skips_blank_optional_parts() {
        let mut product = RecommendedProduct {
            code: "03.11.01".to_string(),
            name: "Mugwort Patch".to_string(),
            description: "warming patch".to_string(),
            price: "39.9".to_string(),
            selling_points: String::new(),
            formula_source: "  ".to_string(),
        };
        assert_eq!(product.context_string(), "Mugwort Patch-warming patch-39.9");

        product.selling_points = "eases cold feet".to_string();
        product.formula_source = "Compendium of Materia Medica".to_string();
        assert_eq!(
            product.context_string(),
            "Mugwort Patch-warming patch-39.9-selling points:eases cold feet-formula source:Compendium of Materia Medica"
        );
    }

    #[test]
    fn status_strings_match_serde_names() {
        for status in FinalStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.as_str());
        }
        assert_eq!(
            serde_json::to_value(ProcessingStage::ProductRecommendation).unwrap(),
            "product_recommendation"
        );
    }
}
