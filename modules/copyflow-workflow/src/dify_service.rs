use std::collections::HashMap;

use async_trait::async_trait;
use copyflow_common::AppConfig;
use dify_client::{CompletionRequest, DifyClient};
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::service::{ContentService, PromptContext, StageKind};

/// [`ContentService`] backed by one Dify completion application per stage.
pub struct DifyContentService {
    clients: HashMap<StageKind, DifyClient>,
    user: String,
}

impl DifyContentService {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            clients: HashMap::new(),
            user: user.into(),
        }
    }

    /// Build clients for every stage that has an application key.
    pub fn from_config(config: &AppConfig) -> Self {
        let http = reqwest::Client::new();
        let keys = [
            (StageKind::ScenarioGenerator, &config.scenario_generator_key),
            (StageKind::ScenarioValidator, &config.scenario_validator_key),
            (StageKind::ContentGenerator, &config.content_generator_key),
            (StageKind::ContentValidator, &config.content_validator_key),
            (StageKind::ProductRecommender, &config.product_recommender_key),
            (StageKind::ContentRewriter, &config.content_rewriter_key),
        ];

        let mut service = Self::new(&config.dify_user);
        for (stage, key) in keys {
            match key {
                Some(key) => {
                    let client =
                        DifyClient::new(key, &config.dify_base_url).with_http(http.clone());
                    service = service.with_client(stage, client);
                }
                None => warn!(stage = %stage, "No Dify application key, stage calls will fail"),
            }
        }
        service
    }

    pub fn with_client(mut self, stage: StageKind, client: DifyClient) -> Self {
        self.clients.insert(stage, client);
        self
    }

    pub fn is_configured(&self, stage: StageKind) -> bool {
        self.clients.contains_key(&stage)
    }
}

#[async_trait]
impl ContentService for DifyContentService {
    async fn invoke(
        &self,
        stage: StageKind,
        context: &PromptContext,
    ) -> Result<String, ServiceError> {
        let client = self
            .clients
            .get(&stage)
            .ok_or(ServiceError::Unconfigured(stage))?;

        let request = CompletionRequest::new(&context.query, &self.user)
            .inputs(context.inputs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let response = client.completion(&request).await?;

        if let Some(usage) = response.usage() {
            debug!(
                stage = %stage,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Dify usage"
            );
        }

        response
            .text()
            .map(str::to_string)
            .ok_or(ServiceError::EmptyResponse(stage))
    }
}
