// Top-level controller: generate scenarios, then run each one through the
// per-scenario state machine and append exactly one record per scenario.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use copyflow_common::{
    recommendation_candidates, FinalStatus, ProcessingStage, ProductCatalog, ProductRecord,
    RecommendationRecord, ResultRecord, Scenario, ValidationOutcome,
};
use futures::FutureExt;
use tracing::{error, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::collector::ResultCollector;
use crate::envelope::recommendation_record;
use crate::error::WorkflowError;
use crate::prompts::{RecommendationRequest, ScenarioRequest};
use crate::retry::{RetryController, DEFAULT_MAX_RETRIES};
use crate::service::ContentService;
use crate::stages::Stages;
use crate::state::{Phase, ScenarioState};
use crate::stats::CollectorStats;

#[derive(Debug, Clone, TypedBuilder)]
pub struct WorkflowSettings {
    #[builder(setter(into))]
    pub persona: String,
    #[builder(default = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,
    /// Pin every scenario to this catalog product instead of asking the recommender.
    #[builder(default)]
    pub product_code: Option<String>,
}

/// Outcome of one call to [`WorkflowOrchestrator::run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub scenarios: usize,
    /// Stats over this run's records only.
    pub stats: CollectorStats,
}

pub struct WorkflowOrchestrator {
    stages: Stages,
    service: Arc<dyn ContentService>,
    catalog: Arc<dyn ProductCatalog>,
    settings: WorkflowSettings,
    retry: RetryController,
    collector: ResultCollector,
}

impl WorkflowOrchestrator {
    pub fn new(
        service: Arc<dyn ContentService>,
        catalog: Arc<dyn ProductCatalog>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            stages: Stages::standard(),
            service,
            catalog,
            retry: RetryController::new(settings.max_retries),
            settings,
            collector: ResultCollector::new(),
        }
    }

    pub fn with_stages(mut self, stages: Stages) -> Self {
        self.stages = stages;
        self
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn collector(&self) -> &ResultCollector {
        &self.collector
    }

    pub fn clear_results(&self) {
        self.collector.clear();
    }

    /// Generate scenarios for `user_input` and process every one of them.
    ///
    /// Only scenario generation can fail the run; everything after that is
    /// recorded per scenario.
    pub async fn run(&self, user_input: &str) -> Result<RunSummary, WorkflowError> {
        let scenarios = self.generate_scenarios(user_input).await?;
        Ok(self.process_scenarios(user_input, scenarios).await)
    }

    pub async fn generate_scenarios(&self, user_input: &str) -> Result<Vec<Scenario>, WorkflowError> {
        let request = ScenarioRequest {
            persona: self.settings.persona.clone(),
            topic: user_input.to_string(),
            date: Utc::now().format("%Y-%m-%d").to_string(),
            product: self.pinned_product().map(|p| ScenarioRequest::describe_product(&p)),
        };

        let scenarios = self
            .stages
            .scenario_generator
            .run(self.service.as_ref(), &request)
            .await
            .map_err(WorkflowError::ScenarioGeneration)?;

        info!(count = scenarios.len(), topic = user_input, "Generated scenarios");
        Ok(scenarios)
    }

    /// Process `scenarios` in order, appending one record per scenario.
    pub async fn process_scenarios(&self, user_input: &str, scenarios: Vec<Scenario>) -> RunSummary {
        let run_id = Uuid::new_v4();
        let total = scenarios.len();
        info!(%run_id, scenarios = total, "Starting run");

        let mut records = Vec::with_capacity(total);
        for (index, scenario) in scenarios.into_iter().enumerate() {
            info!(%run_id, index = index + 1, total, scenario = %scenario, "Processing scenario");
            let record = self.process_one(user_input, scenario).await;
            info!(
                %run_id,
                index = index + 1,
                status = %record.final_status,
                stage = %record.stage_reached,
                "Scenario finished"
            );
            self.collector.append(record.clone());
            records.push(record);
        }

        let stats = CollectorStats::from_records(&records);
        info!(%run_id, total, valid = stats.valid, "Run complete");
        RunSummary {
            run_id,
            scenarios: total,
            stats,
        }
    }

    /// Per-scenario boundary: errors and panics become `exception` records.
    async fn process_one(&self, user_input: &str, scenario: Scenario) -> ResultRecord {
        let mut state = ScenarioState::new(user_input, &self.settings.persona, scenario);

        let outcome = AssertUnwindSafe(self.drive(&mut state)).catch_unwind().await;

        match outcome {
            Ok(Ok(status)) => state.finish(status),
            Ok(Err(e)) => {
                let detail = format!("{e:#}");
                error!(scenario = %state.scenario, error = detail.as_str(), "Scenario failed");
                state.error = Some(detail);
                state.finish(FinalStatus::Exception)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(scenario = %state.scenario, panic = message.as_str(), "Scenario panicked");
                state.error = Some(format!("panic: {message}"));
                state.finish(FinalStatus::Exception)
            }
        }
    }

    async fn drive(&self, state: &mut ScenarioState) -> Result<FinalStatus> {
        let mut phase = Phase::ScenarioValidating;
        loop {
            phase = match phase {
                Phase::ScenarioValidating => self.validate_scenario(state).await,
                Phase::Content => self
                    .retry
                    .resolve(&self.stages, self.service.as_ref(), state)
                    .await
                    .next_phase(),
                Phase::Recommending => {
                    self.recommend(state).await?;
                    Phase::Rewriting
                }
                Phase::Rewriting => {
                    self.polish(state).await?;
                    Phase::Terminal(FinalStatus::Success)
                }
                Phase::Terminal(status) => return Ok(status),
            };
        }
    }

    async fn validate_scenario(&self, state: &mut ScenarioState) -> Phase {
        state.stage = ProcessingStage::ScenarioValidation;
        let check = state.scenario_check();

        let outcome = match self
            .stages
            .scenario_validator
            .run(self.service.as_ref(), &check)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(scenario = %state.scenario, error = %e, "Scenario validator call failed");
                state.error = Some(e.to_string());
                ValidationOutcome::fail(e.to_string())
            }
        };

        let passed = outcome.passed;
        if passed {
            info!(scenario = %state.scenario, "Scenario passed validation");
        } else {
            warn!(scenario = %state.scenario, reason = outcome.reason.as_str(), "Scenario rejected");
        }
        state.scenario_validation = Some(outcome);

        if passed {
            Phase::Content
        } else {
            Phase::Terminal(FinalStatus::ScenarioFailed)
        }
    }

    async fn recommend(&self, state: &mut ScenarioState) -> Result<()> {
        state.stage = ProcessingStage::ProductRecommendation;

        let record = match &self.settings.product_code {
            Some(code) => match self.catalog.lookup_by_code(code) {
                Some(product) => recommendation_record(&pinned_payload(&product)?),
                None => RecommendationRecord::failed(format!("no product with code {code}")),
            },
            None => {
                let content = state
                    .draft
                    .as_ref()
                    .map(|d| d.text.clone())
                    .context("no validated draft to recommend for")?;
                let goods_list = serde_json::to_string(&recommendation_candidates(
                    self.catalog.as_ref(),
                ))
                .context("failed to encode goods_list")?;
                let request = RecommendationRequest {
                    content,
                    scenario: state.scenario.clone(),
                    persona: state.persona.clone(),
                    goods_list,
                };
                match self
                    .stages
                    .product_recommender
                    .run(self.service.as_ref(), &request)
                    .await
                {
                    Ok(record) => record,
                    Err(e) => RecommendationRecord::failed(e.to_string()),
                }
            }
        };

        match (&record.product, &record.error) {
            (Some(product), _) => info!(
                scenario = %state.scenario,
                code = product.code.as_str(),
                name = product.name.as_str(),
                "Product recommended"
            ),
            (None, Some(err)) => warn!(scenario = %state.scenario, error = err.as_str(), "Recommendation failed"),
            (None, None) => info!(scenario = %state.scenario, "No product recommended"),
        }

        state.recommendation = record;
        Ok(())
    }

    /// Product-aware rewrite of the validated draft. Without a product (none
    /// recommended, or the recommendation failed) the validated draft passes
    /// through untouched; there is no style-only rewrite here. A failed
    /// rewrite keeps the validated text.
    async fn polish(&self, state: &mut ScenarioState) -> Result<()> {
        state.stage = ProcessingStage::Rewrite;

        let Some(product) = state.recommendation.product.as_ref() else {
            state.stage = ProcessingStage::Completed;
            return Ok(());
        };

        let content = state
            .draft
            .as_ref()
            .map(|d| d.text.clone())
            .context("no validated draft to rewrite")?;
        let request = state.rewrite_request(&content, Some(product.context_string()));

        match self
            .stages
            .content_rewriter
            .run(self.service.as_ref(), &request)
            .await
        {
            Ok(Some(rewritten)) => {
                if let Some(draft) = state.draft.as_mut() {
                    draft.apply_rewrite(rewritten);
                }
                info!(scenario = %state.scenario, "Rewrote content with product context");
            }
            Ok(None) => {
                warn!(scenario = %state.scenario, "Rewrite returned nothing, keeping validated text");
                state.error = Some("rewrite returned empty content".to_string());
            }
            Err(e) => {
                warn!(scenario = %state.scenario, error = %e, "Rewrite failed, keeping validated text");
                state.error = Some(format!("rewrite failed: {e}"));
            }
        }

        state.stage = ProcessingStage::Completed;
        Ok(())
    }

    fn pinned_product(&self) -> Option<ProductRecord> {
        let code = self.settings.product_code.as_deref()?;
        let product = self.catalog.lookup_by_code(code);
        if product.is_none() {
            warn!(code, "Pinned product code not found in catalog");
        }
        product
    }
}

/// The `goods` payload the recommender would have returned for `product`.
fn pinned_payload(product: &ProductRecord) -> Result<String> {
    let payload = serde_json::json!({
        "goods": {
            "k3_code": product.code,
            "name": product.name,
            "description": product.description,
            "price": product.price,
            "product_selling_points": product.selling_points,
            "formula_source": product.formula_source,
        },
        "reason": "pinned product",
    });
    serde_json::to_string(&payload).context("failed to encode pinned product")
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
