// Bounded generate→validate cycles with feedback carry-forward.

use copyflow_common::{ContentDraft, FinalStatus, ProcessingStage};
use tracing::{info, warn};

use crate::service::ContentService;
use crate::stages::Stages;
use crate::state::{Phase, ScenarioState};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// How the content phase of one scenario ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentResolution {
    /// A draft passed validation.
    Validated,
    /// Retries ran out and the style rewrite fallback produced text.
    Rewritten,
    /// The final attempt could not generate a draft.
    GenerationFailed,
    /// Retries ran out and the fallback rewrite did not help.
    ValidationFailed,
}

impl ContentResolution {
    /// Phase the orchestrator moves to next.
    pub fn next_phase(self) -> Phase {
        match self {
            Self::Validated => Phase::Recommending,
            Self::Rewritten => Phase::Terminal(FinalStatus::RewriteSuccess),
            Self::GenerationFailed => Phase::Terminal(FinalStatus::ContentFailed),
            Self::ValidationFailed => Phase::Terminal(FinalStatus::ValidationFailed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Generation,
    ValidatorCall,
    Rejected,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryController {
    max_retries: u32,
}

impl Default for RetryController {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryController {
    /// At least one cycle always runs.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Drive the content phase for one scenario, updating `state` in place.
    pub async fn resolve(
        &self,
        stages: &Stages,
        service: &dyn ContentService,
        state: &mut ScenarioState,
    ) -> ContentResolution {
        let mut last_failure = Failure::Generation;

        for attempt in 0..self.max_retries {
            state.attempts = attempt + 1;
            state.stage = ProcessingStage::ContentGeneration;

            let request = state.content_request();
            let text = match stages.content_generator.run(service, &request).await {
                Ok(Some(text)) => text,
                Ok(None) => {
                    warn!(scenario = %state.scenario, attempt, "Content generator returned nothing");
                    state.error = Some(format!("empty content on attempt {}", attempt + 1));
                    last_failure = Failure::Generation;
                    continue;
                }
                Err(e) => {
                    warn!(scenario = %state.scenario, attempt, error = %e, "Content generation failed");
                    state.error = Some(e.to_string());
                    last_failure = Failure::Generation;
                    continue;
                }
            };

            state.stage = ProcessingStage::ContentValidation;
            let check = state.content_check(&text);
            state.draft = Some(ContentDraft::new(text, attempt));

            match stages.content_validator.run(service, &check).await {
                Ok(outcome) if outcome.passed => {
                    info!(scenario = %state.scenario, attempt, "Content passed validation");
                    state.content_validation = Some(outcome);
                    state.error = None;
                    return ContentResolution::Validated;
                }
                Ok(outcome) => {
                    warn!(
                        scenario = %state.scenario,
                        attempt,
                        reason = outcome.reason.as_str(),
                        "Content rejected"
                    );
                    state.feedback = outcome.reason.clone();
                    state.content_validation = Some(outcome);
                    last_failure = Failure::Rejected;
                }
                Err(e) => {
                    warn!(scenario = %state.scenario, attempt, error = %e, "Content validator call failed");
                    state.error = Some(e.to_string());
                    last_failure = Failure::ValidatorCall;
                }
            }
        }

        match last_failure {
            Failure::Generation => return ContentResolution::GenerationFailed,
            // The last draft was never judged; nothing to rescue.
            Failure::ValidatorCall => return ContentResolution::ValidationFailed,
            Failure::Rejected => {}
        }

        info!(
            scenario = %state.scenario,
            attempts = state.attempts,
            "Retries exhausted, trying rewrite fallback"
        );
        self.fallback(stages, service, state).await
    }

    /// Style-only rewrite of the last draft.
    async fn fallback(
        &self,
        stages: &Stages,
        service: &dyn ContentService,
        state: &mut ScenarioState,
    ) -> ContentResolution {
        let Some(last_text) = state.draft.as_ref().map(|d| d.text.clone()) else {
            return ContentResolution::ValidationFailed;
        };

        state.stage = ProcessingStage::Rewrite;
        let request = state.rewrite_request(&last_text, None);

        match stages.content_rewriter.run(service, &request).await {
            Ok(Some(rewritten)) => {
                if let Some(draft) = state.draft.as_mut() {
                    draft.apply_rewrite(rewritten);
                }
                info!(scenario = %state.scenario, "Fallback rewrite succeeded");
                ContentResolution::Rewritten
            }
            Ok(None) => {
                warn!(scenario = %state.scenario, "Fallback rewrite returned nothing");
                state.error = Some("fallback rewrite returned empty content".to_string());
                ContentResolution::ValidationFailed
            }
            Err(e) => {
                warn!(scenario = %state.scenario, error = %e, "Fallback rewrite failed");
                state.error = Some(format!("fallback rewrite failed: {e}"));
                ContentResolution::ValidationFailed
            }
        }
    }
}
