// Test doubles for the workflow.
//
// - ScriptedService (ContentService): per-stage reply queues, fallback
//   replies, predicate rules for fault injection, and a call log that doubles
//   as a call-count spy.
// - StaticCatalog (ProductCatalog): in-memory products with a lookup counter.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use copyflow_common::{ProductCatalog, ProductRecord};

use crate::error::ServiceError;
use crate::service::{ContentService, PromptContext, StageKind};

// ---------------------------------------------------------------------------
// Envelope helpers
// ---------------------------------------------------------------------------

pub fn pass_json(reason: &str) -> String {
    serde_json::json!({ "result": true, "reason": reason }).to_string()
}

pub fn fail_json(reason: &str) -> String {
    serde_json::json!({ "result": false, "reason": reason }).to_string()
}

// ---------------------------------------------------------------------------
// ScriptedService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(ServiceError),
    Panic(String),
}

type Predicate = Box<dyn Fn(StageKind, &PromptContext) -> bool + Send + Sync>;

struct Rule {
    predicate: Predicate,
    reply: Reply,
}

/// Replies are resolved in order: the first matching rule, then the stage's
/// queue, then the stage's fallback. A stage with none of these fails with
/// `ServiceError::Unconfigured`.
pub struct ScriptedService {
    rules: Vec<Rule>,
    queues: Mutex<HashMap<StageKind, VecDeque<Reply>>>,
    fallbacks: HashMap<StageKind, Reply>,
    calls: Mutex<Vec<(StageKind, PromptContext)>>,
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedService {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            queues: Mutex::new(HashMap::new()),
            fallbacks: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn enqueue(self, stage: StageKind, reply: Reply) -> Self {
        self.queues
            .lock()
            .unwrap()
            .entry(stage)
            .or_default()
            .push_back(reply);
        self
    }

    /// Queue one text reply for `stage`.
    pub fn on(self, stage: StageKind, text: impl Into<String>) -> Self {
        self.enqueue(stage, Reply::Text(text.into()))
    }

    /// Queue one failure for `stage`.
    pub fn on_error(self, stage: StageKind, error: ServiceError) -> Self {
        self.enqueue(stage, Reply::Fail(error))
    }

    /// Reply used whenever the stage's queue is empty.
    pub fn always(mut self, stage: StageKind, text: impl Into<String>) -> Self {
        self.fallbacks.insert(stage, Reply::Text(text.into()));
        self
    }

    pub fn when<F>(mut self, predicate: F, reply: Reply) -> Self
    where
        F: Fn(StageKind, &PromptContext) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            predicate: Box::new(predicate),
            reply,
        });
        self
    }

    /// Fail every call whose query or inputs mention `needle`.
    pub fn fail_mentioning(self, needle: &str, error: ServiceError) -> Self {
        let needle = needle.to_string();
        self.when(move |_, ctx| mentions(ctx, &needle), Reply::Fail(error))
    }

    /// Panic on every call whose query or inputs mention `needle`.
    pub fn panic_mentioning(self, needle: &str) -> Self {
        let message = format!("scripted panic for {needle}");
        let needle = needle.to_string();
        self.when(move |_, ctx| mentions(ctx, &needle), Reply::Panic(message))
    }

    pub fn calls(&self) -> Vec<(StageKind, PromptContext)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, stage: StageKind) -> Vec<PromptContext> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, ctx)| ctx.clone())
            .collect()
    }

    pub fn call_count(&self, stage: StageKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == stage)
            .count()
    }

    fn next_reply(&self, stage: StageKind, context: &PromptContext) -> Option<Reply> {
        if let Some(rule) = self
            .rules
            .iter()
            .find(|rule| (rule.predicate)(stage, context))
        {
            return Some(rule.reply.clone());
        }
        let queued = self
            .queues
            .lock()
            .unwrap()
            .get_mut(&stage)
            .and_then(VecDeque::pop_front);
        queued.or_else(|| self.fallbacks.get(&stage).cloned())
    }
}

fn mentions(context: &PromptContext, needle: &str) -> bool {
    context.query.contains(needle) || context.inputs.values().any(|v| v.contains(needle))
}

#[async_trait]
impl ContentService for ScriptedService {
    async fn invoke(
        &self,
        stage: StageKind,
        context: &PromptContext,
    ) -> Result<String, ServiceError> {
        self.calls.lock().unwrap().push((stage, context.clone()));

        match self.next_reply(stage, context) {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(error)) => Err(error),
            Some(Reply::Panic(message)) => panic!("{message}"),
            None => Err(ServiceError::Unconfigured(stage)),
        }
    }
}

// ---------------------------------------------------------------------------
// StaticCatalog
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StaticCatalog {
    products: Vec<ProductRecord>,
    lookups: AtomicUsize,
}

impl StaticCatalog {
    pub fn new(products: Vec<ProductRecord>) -> Self {
        Self {
            products,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ProductCatalog for StaticCatalog {
    fn lookup_by_code(&self, code: &str) -> Option<ProductRecord> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.products.iter().find(|p| p.code == code.trim()).cloned()
    }

    fn list_all(&self) -> Vec<ProductRecord> {
        self.products.clone()
    }
}

/// A sellable product with the given code, name and price.
pub fn product(code: &str, name: &str, price: f64) -> ProductRecord {
    ProductRecord {
        code: code.to_string(),
        name: name.to_string(),
        description: format!("{name} description"),
        price,
        category: "tea".to_string(),
        brand: "house".to_string(),
        core_selling_point: format!("{name} core point"),
        selling_points: format!("{name} selling points"),
        formula_source: String::new(),
        usage_method: String::new(),
    }
}
