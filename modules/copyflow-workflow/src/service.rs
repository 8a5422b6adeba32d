// Boundary to the generative backend.
//
// Every stage call goes through ContentService. The orchestrator only ever
// sees decoded outputs or a ServiceError; prompt wording is owned by whatever
// sits behind the trait.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;

use crate::error::ServiceError;

// ---------------------------------------------------------------------------
// StageKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    ScenarioGenerator,
    ScenarioValidator,
    ContentGenerator,
    ContentValidator,
    ProductRecommender,
    ContentRewriter,
}

impl StageKind {
    pub const ALL: [StageKind; 6] = [
        StageKind::ScenarioGenerator,
        StageKind::ScenarioValidator,
        StageKind::ContentGenerator,
        StageKind::ContentValidator,
        StageKind::ProductRecommender,
        StageKind::ContentRewriter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScenarioGenerator => "scenario_generator",
            Self::ScenarioValidator => "scenario_validator",
            Self::ContentGenerator => "content_generator",
            Self::ContentValidator => "content_validator",
            Self::ProductRecommender => "product_recommender",
            Self::ContentRewriter => "content_rewriter",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PromptContext
// ---------------------------------------------------------------------------

/// Query text plus named inputs for one stage call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContext {
    pub query: String,
    pub inputs: BTreeMap<String, String>,
}

impl PromptContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            inputs: BTreeMap::new(),
        }
    }

    pub fn input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inputs.get(key).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// ContentService
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ContentService: Send + Sync {
    /// Run one stage and return the raw model text.
    async fn invoke(&self, stage: StageKind, context: &PromptContext)
        -> Result<String, ServiceError>;
}
