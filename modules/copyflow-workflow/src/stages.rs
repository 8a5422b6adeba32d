// One adapter shape for every stage: build a prompt, call the service, decode.

use copyflow_common::{RecommendationRecord, Scenario, ValidationOutcome};
use tracing::debug;

use crate::envelope::{decode_judgment, non_empty_text, parse_scenarios, recommendation_record};
use crate::error::ServiceError;
use crate::prompts::{
    content_check_prompt, content_prompt, recommendation_prompt, rewrite_prompt,
    scenario_check_prompt, scenario_prompt, ContentCheck, ContentRequest, RecommendationRequest,
    RewriteRequest, ScenarioCheck, ScenarioRequest,
};
use crate::service::{ContentService, PromptContext, StageKind};

pub struct StageAdapter<I, O> {
    kind: StageKind,
    build_prompt: fn(&I) -> PromptContext,
    decode: fn(&str) -> O,
}

impl<I, O> StageAdapter<I, O> {
    pub fn new(
        kind: StageKind,
        build_prompt: fn(&I) -> PromptContext,
        decode: fn(&str) -> O,
    ) -> Self {
        Self {
            kind,
            build_prompt,
            decode,
        }
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn prompt(&self, input: &I) -> PromptContext {
        (self.build_prompt)(input)
    }

    pub fn decode(&self, raw: &str) -> O {
        (self.decode)(raw)
    }

    /// Service failures propagate; decoding never fails.
    pub async fn run(&self, service: &dyn ContentService, input: &I) -> Result<O, ServiceError> {
        let context = self.prompt(input);
        debug!(
            stage = %self.kind,
            inputs = context.inputs.len(),
            query_len = context.query.len(),
            "Invoking stage"
        );
        let raw = service.invoke(self.kind, &context).await?;
        Ok(self.decode(&raw))
    }
}

/// The full set of stage adapters one orchestrator owns.
pub struct Stages {
    pub scenario_generator: StageAdapter<ScenarioRequest, Vec<Scenario>>,
    pub scenario_validator: StageAdapter<ScenarioCheck, ValidationOutcome>,
    pub content_generator: StageAdapter<ContentRequest, Option<String>>,
    pub content_validator: StageAdapter<ContentCheck, ValidationOutcome>,
    pub product_recommender: StageAdapter<RecommendationRequest, RecommendationRecord>,
    pub content_rewriter: StageAdapter<RewriteRequest, Option<String>>,
}

impl Stages {
    pub fn standard() -> Self {
        Self {
            scenario_generator: StageAdapter::new(
                StageKind::ScenarioGenerator,
                scenario_prompt,
                parse_scenarios,
            ),
            scenario_validator: StageAdapter::new(
                StageKind::ScenarioValidator,
                scenario_check_prompt,
                decode_judgment,
            ),
            content_generator: StageAdapter::new(
                StageKind::ContentGenerator,
                content_prompt,
                non_empty_text,
            ),
            content_validator: StageAdapter::new(
                StageKind::ContentValidator,
                content_check_prompt,
                decode_judgment,
            ),
            product_recommender: StageAdapter::new(
                StageKind::ProductRecommender,
                recommendation_prompt,
                recommendation_record,
            ),
            content_rewriter: StageAdapter::new(
                StageKind::ContentRewriter,
                rewrite_prompt,
                non_empty_text,
            ),
        }
    }
}

impl Default for Stages {
    fn default() -> Self {
        Self::standard()
    }
}
