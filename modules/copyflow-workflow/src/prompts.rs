// Stage inputs and how they become prompt contexts.
//
// The named inputs match the variables declared by the Dify applications
// behind each stage. Prompt wording itself lives in those applications.

use copyflow_common::{ProductRecord, Scenario};

use crate::service::PromptContext;

/// Inputs longer than this are cut before reaching the content validator.
pub const VALIDATOR_SCENARIO_LIMIT: usize = 48;

/// Placeholder sent when there is no validator feedback yet.
pub const NO_SUGGESTION: &str = "none";

// ---------------------------------------------------------------------------
// Scenario generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ScenarioRequest {
    pub persona: String,
    pub topic: String,
    pub date: String,
    /// Descriptor of a pinned product, if the run has one.
    pub product: Option<String>,
}

impl ScenarioRequest {
    /// `product: <name>; selling points: <points>`
    pub fn describe_product(product: &ProductRecord) -> String {
        format!(
            "product: {}; selling points: {}",
            product.name.trim(),
            product.selling_points.trim()
        )
    }
}

pub fn scenario_prompt(request: &ScenarioRequest) -> PromptContext {
    let query = if request.topic.trim().is_empty() {
        request.persona.clone()
    } else {
        request.topic.clone()
    };
    let context = PromptContext::new(query)
        .input("persona", &request.persona)
        .input("date", &request.date);
    match &request.product {
        Some(product) => context.input("product", product),
        None => context,
    }
}

// ---------------------------------------------------------------------------
// Scenario validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ScenarioCheck {
    pub scenario: Scenario,
    pub persona: String,
    pub user_input: String,
}

pub fn scenario_check_prompt(check: &ScenarioCheck) -> PromptContext {
    PromptContext::new("Check whether this scenario is plausible and usable for the persona")
        .input("scene", check.scenario.as_str())
        .input("persona", &check.persona)
        .input("user_input", &check.user_input)
}

// ---------------------------------------------------------------------------
// Content generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub scenario: Scenario,
    pub persona: String,
    pub user_input: String,
    /// Most recent validator reason, empty on the first attempt.
    pub feedback: String,
}

pub fn content_prompt(request: &ContentRequest) -> PromptContext {
    let suggestion = if request.feedback.trim().is_empty() {
        NO_SUGGESTION
    } else {
        request.feedback.as_str()
    };
    PromptContext::new(request.scenario.as_str())
        .input("persona", &request.persona)
        .input("user_input", &request.user_input)
        .input("suggestion", suggestion)
}

// ---------------------------------------------------------------------------
// Content validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ContentCheck {
    pub content: String,
    pub scenario: Scenario,
    pub persona: String,
}

pub fn content_check_prompt(check: &ContentCheck) -> PromptContext {
    let scenario: String = check
        .scenario
        .as_str()
        .chars()
        .take(VALIDATOR_SCENARIO_LIMIT)
        .collect();
    PromptContext::new("Check whether this copy fits the scenario, the persona and the guidelines")
        .input("content_to_validate", &check.content)
        .input("scenario", scenario)
        .input("persona", &check.persona)
}

// ---------------------------------------------------------------------------
// Product recommendation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub content: String,
    pub scenario: Scenario,
    pub persona: String,
    /// JSON array of candidate goods.
    pub goods_list: String,
}

pub fn recommendation_prompt(request: &RecommendationRequest) -> PromptContext {
    PromptContext::new("Recommend the single product that best matches this copy and scenario")
        .input("content", &request.content)
        .input("scenario", request.scenario.as_str())
        .input("persona", &request.persona)
        .input("goods_list", &request.goods_list)
}

// ---------------------------------------------------------------------------
// Rewrite
// ---------------------------------------------------------------------------

/// Shared by the style-only fallback and the product-aware polish; only
/// `product_context` differs.
#[derive(Debug, Clone)]
pub struct RewriteRequest {
    pub content: String,
    pub persona: String,
    pub scenario: Scenario,
    pub product_context: Option<String>,
}

pub fn rewrite_prompt(request: &RewriteRequest) -> PromptContext {
    let context = PromptContext::new(&request.content)
        .input("persona", &request.persona)
        .input("scenario", request.scenario.as_str());
    match &request.product_context {
        Some(goods) => context.input("goods", goods),
        None => context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_sends_no_suggestion() {
        let mut request = ContentRequest {
            scenario: Scenario::new("cold office afternoon"),
            persona: "tea lover".to_string(),
            user_input: String::new(),
            feedback: String::new(),
        };
        assert_eq!(content_prompt(&request).get("suggestion"), Some(NO_SUGGESTION));

        request.feedback = "too short".to_string();
        let context = content_prompt(&request);
        assert_eq!(context.get("suggestion"), Some("too short"));
        assert_eq!(context.query, "cold office afternoon");
    }

    #[test]
    fn validator_scenario_is_cut_on_char_boundary() {
        let check = ContentCheck {
            content: "copy".to_string(),
            scenario: Scenario::new("雨".repeat(60)),
            persona: "p".to_string(),
        };
        let context = content_check_prompt(&check);
        assert_eq!(
            context.get("scenario").map(|s| s.chars().count()),
            Some(VALIDATOR_SCENARIO_LIMIT)
        );
    }

    #[test]
    fn rewrite_shape_differs_only_by_goods() {
        let mut request = RewriteRequest {
            content: "draft".to_string(),
            persona: "p".to_string(),
            scenario: Scenario::new("s"),
            product_context: None,
        };
        let plain = rewrite_prompt(&request);
        assert!(plain.get("goods").is_none());

        request.product_context = Some("Ginger Tea-warming-29.9".to_string());
        let aware = rewrite_prompt(&request);
        assert_eq!(aware.get("goods"), Some("Ginger Tea-warming-29.9"));
        assert_eq!(aware.query, plain.query);
        assert_eq!(aware.inputs.len(), plain.inputs.len() + 1);
    }

    #[test]
    fn scenario_prompt_falls_back_to_persona_query() {
        let request = ScenarioRequest {
            persona: "night-shift nurse".to_string(),
            topic: "  ".to_string(),
            date: "2025-01-01".to_string(),
            product: None,
        };
        let context = scenario_prompt(&request);
        assert_eq!(context.query, "night-shift nurse");
        assert_eq!(context.get("date"), Some("2025-01-01"));
        assert!(context.get("product").is_none());
    }
}
