pub mod collector;
pub mod dify_service;
pub mod envelope;
pub mod error;
pub mod export;
pub mod orchestrator;
pub mod prompts;
pub mod retry;
pub mod service;
pub mod stages;
pub mod state;
pub mod stats;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use collector::ResultCollector;
pub use dify_service::DifyContentService;
pub use error::{ExportError, ServiceError, WorkflowError};
pub use export::{export, export_to_dir};
pub use orchestrator::{RunSummary, WorkflowOrchestrator, WorkflowSettings};
pub use retry::{ContentResolution, RetryController};
pub use service::{ContentService, PromptContext, StageKind};
pub use stages::{StageAdapter, Stages};
pub use stats::CollectorStats;
