// Per-scenario state threaded through every stage of one scenario's run.

use chrono::{DateTime, Utc};
use copyflow_common::{
    ContentDraft, FinalStatus, ProcessingStage, RecommendationRecord, ResultRecord, Scenario,
    ValidationOutcome,
};

use crate::prompts::{ContentCheck, ContentRequest, RewriteRequest, ScenarioCheck};

/// Where a scenario is in the pipeline. `Terminal` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ScenarioValidating,
    /// Generate and validate cycles, driven by the retry controller.
    Content,
    Recommending,
    Rewriting,
    Terminal(FinalStatus),
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Terminal(_))
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioState {
    pub user_input: String,
    pub persona: String,
    pub scenario: Scenario,
    pub scenario_validation: Option<ValidationOutcome>,
    pub draft: Option<ContentDraft>,
    pub content_validation: Option<ValidationOutcome>,
    /// Latest validator reason. Replaced, never appended.
    pub feedback: String,
    /// Generate+validate cycles started so far.
    pub attempts: u32,
    pub recommendation: RecommendationRecord,
    pub stage: ProcessingStage,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScenarioState {
    pub fn new(user_input: impl Into<String>, persona: impl Into<String>, scenario: Scenario) -> Self {
        Self {
            user_input: user_input.into(),
            persona: persona.into(),
            scenario,
            scenario_validation: None,
            draft: None,
            content_validation: None,
            feedback: String::new(),
            attempts: 0,
            recommendation: RecommendationRecord::default(),
            stage: ProcessingStage::ScenarioValidation,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn scenario_check(&self) -> ScenarioCheck {
        ScenarioCheck {
            scenario: self.scenario.clone(),
            persona: self.persona.clone(),
            user_input: self.user_input.clone(),
        }
    }

    pub fn content_request(&self) -> ContentRequest {
        ContentRequest {
            scenario: self.scenario.clone(),
            persona: self.persona.clone(),
            user_input: self.user_input.clone(),
            feedback: self.feedback.clone(),
        }
    }

    pub fn content_check(&self, content: &str) -> ContentCheck {
        ContentCheck {
            content: content.to_string(),
            scenario: self.scenario.clone(),
            persona: self.persona.clone(),
        }
    }

    pub fn rewrite_request(&self, content: &str, product_context: Option<String>) -> RewriteRequest {
        RewriteRequest {
            content: content.to_string(),
            persona: self.persona.clone(),
            scenario: self.scenario.clone(),
            product_context,
        }
    }

    /// Freeze into a record.
    pub fn finish(self, final_status: FinalStatus) -> ResultRecord {
        ResultRecord {
            user_input: self.user_input,
            persona: self.persona,
            scenario: self.scenario,
            scenario_validation: self.scenario_validation,
            draft: self.draft,
            content_validation: self.content_validation,
            recommendation: self.recommendation,
            stage_reached: self.stage,
            final_status,
            error: self.error,
            created_at: self.created_at,
        }
    }
}
