//! Decoding of semi-structured model output.
//!
//! Model replies are usually JSON, often wrapped in markdown fences, and not
//! always the shape that was asked for. Nothing in here returns an error to
//! the pipeline: malformed judgments become failed outcomes, malformed
//! recommendations become failed recommendation records, and scenario lists
//! fall back to one-per-line text.

use copyflow_common::{RecommendationRecord, RecommendedProduct, Scenario, ValidationOutcome};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Strip a surrounding markdown code fence (with or without a language tag).
pub fn strip_fences(raw: &str) -> &str {
    let text = raw.trim();
    let Some(body) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line, if any.
    let body = match body.find('\n') {
        Some(newline) if is_language_tag(&body[..newline]) => &body[newline + 1..],
        Some(_) => body,
        None => strip_inline_tag(body),
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// ```` ```json {...}``` ```` on a single line: drop the tag before a JSON body.
fn strip_inline_tag(body: &str) -> &str {
    let Some((tag, rest)) = body.split_once(char::is_whitespace) else {
        return body;
    };
    let rest = rest.trim_start();
    if !tag.is_empty() && is_language_tag(tag) && rest.starts_with(['{', '[']) {
        rest
    } else {
        body
    }
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

// ---------------------------------------------------------------------------
// Judgments
// ---------------------------------------------------------------------------

/// Decode a `{result, reason}` judgment. Never fails.
pub fn decode_judgment(raw: &str) -> ValidationOutcome {
    let body = strip_fences(raw);
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => ValidationOutcome {
            passed: map.get("result").is_some_and(truthy),
            reason: map.get("reason").map(value_to_string).unwrap_or_default(),
        },
        Ok(other) => {
            warn!(kind = json_kind(&other), "Judgment is not a JSON object");
            ValidationOutcome::fail(format!(
                "failed to parse judgment: expected an object, got {}",
                json_kind(&other)
            ))
        }
        Err(e) => {
            warn!(error = %e, response = raw, "Failed to parse judgment");
            ValidationOutcome::fail(format!("failed to parse judgment: {e}"))
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "pass" | "yes" | "1"
        ),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Scenario lists
// ---------------------------------------------------------------------------

/// Decode the scenario generator's reply.
///
/// Accepted shapes, in order: a JSON array of strings, an object with a
/// `scenes` array, a `{ [...] }` wrapper around an array, and finally plain
/// text with one scenario per non-empty line.
pub fn parse_scenarios(raw: &str) -> Vec<Scenario> {
    let body = strip_fences(raw);

    let items = match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => Some(items),
        Ok(Value::Object(mut map)) => match map.remove("scenes") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        Ok(_) => None,
        Err(_) => unwrap_braced_array(body),
    };

    match items {
        Some(items) => items
            .iter()
            .map(value_to_string)
            .filter_map(non_blank_scenario)
            .collect(),
        None => body.lines().filter_map(non_blank_scenario).collect(),
    }
}

/// `{\n["a", "b"]\n}` is not valid JSON but some prompts produce it.
fn unwrap_braced_array(body: &str) -> Option<Vec<Value>> {
    let inner = body.strip_prefix('{')?.strip_suffix('}')?.trim();
    if !inner.starts_with('[') {
        return None;
    }
    match serde_json::from_str::<Value>(inner) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn non_blank_scenario<S: AsRef<str>>(text: S) -> Option<Scenario> {
    let text = text.as_ref().trim();
    (!text.is_empty()).then(|| Scenario::new(text))
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

/// One product entry as the recommender returns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GoodsEntry {
    #[serde(default, alias = "code", alias = "id", deserialize_with = "lenient_string")]
    pub k3_code: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, alias = "desc", deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_selling_points: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub formula_source: String,
}

impl From<GoodsEntry> for RecommendedProduct {
    fn from(entry: GoodsEntry) -> Self {
        Self {
            code: entry.k3_code,
            name: entry.name,
            description: entry.description,
            price: entry.price,
            selling_points: entry.product_selling_points,
            formula_source: entry.formula_source,
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(&Value::deserialize(deserializer)?))
}

#[derive(Debug, Deserialize)]
struct RecommendationPayload {
    #[serde(default)]
    goods: Option<GoodsEntry>,
    #[serde(default)]
    goods_list: Option<Vec<GoodsEntry>>,
    #[serde(default, deserialize_with = "lenient_string")]
    reason: String,
}

/// Which schema the recommendation came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecommendationPick {
    /// Singular `goods` object.
    Single(GoodsEntry),
    /// First element of the legacy `goods_list` array.
    Legacy(GoodsEntry),
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecommendation {
    pub pick: RecommendationPick,
    pub reason: String,
}

impl DecodedRecommendation {
    pub fn into_record(self) -> RecommendationRecord {
        let product = match self.pick {
            RecommendationPick::Single(entry) | RecommendationPick::Legacy(entry) => {
                Some(RecommendedProduct::from(entry))
            }
            RecommendationPick::Absent => None,
        };
        RecommendationRecord {
            success: true,
            reason: self.reason,
            error: None,
            product,
        }
    }
}

/// Decode a recommendation payload, preferring `goods` over `goods_list`.
pub fn decode_recommendation(raw: &str) -> Result<DecodedRecommendation, serde_json::Error> {
    let payload: RecommendationPayload = serde_json::from_str(strip_fences(raw))?;

    let pick = match (payload.goods, payload.goods_list) {
        (Some(goods), _) => RecommendationPick::Single(goods),
        (None, Some(list)) => match list.into_iter().next() {
            Some(first) => RecommendationPick::Legacy(first),
            None => RecommendationPick::Absent,
        },
        (None, None) => RecommendationPick::Absent,
    };

    Ok(DecodedRecommendation {
        pick,
        reason: payload.reason,
    })
}

/// Decode straight into a record; a malformed payload is a failed recommendation.
pub fn recommendation_record(raw: &str) -> RecommendationRecord {
    match decode_recommendation(raw) {
        Ok(decoded) => decoded.into_record(),
        Err(e) => {
            warn!(error = %e, response = raw, "Failed to parse recommendation");
            RecommendationRecord::failed(format!("failed to parse recommendation: {e}"))
        }
    }
}

/// Trimmed text, or `None` when the model returned nothing.
pub fn non_empty_text(raw: &str) -> Option<String> {
    let text = raw.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn fence_on_one_line_keeps_body() {
        assert_eq!(strip_fences("```{\"result\": true}```"), "{\"result\": true}");
        assert_eq!(
            strip_fences("```json {\"result\": true, \"reason\": \"ok\"}```"),
            "{\"result\": true, \"reason\": \"ok\"}"
        );
        assert_eq!(strip_fences("```json [\"a\", \"b\"]```"), "[\"a\", \"b\"]");
        assert_eq!(strip_fences("```plain words here```"), "plain words here");
    }

    #[test]
    fn decodes_single_line_tagged_judgment() {
        let outcome = decode_judgment("```json {\"result\": true, \"reason\": \"ok\"}```");
        assert_eq!(outcome, ValidationOutcome::pass("ok"));
    }

    #[test]
    fn decodes_fenced_judgment() {
        let outcome = decode_judgment("```json\n{\"result\": true, \"reason\": \"fits persona\"}\n```");
        assert_eq!(outcome, ValidationOutcome::pass("fits persona"));
    }

    #[test]
    fn decoding_is_idempotent() {
        let raw = r#"{"result": false, "reason": "too short"}"#;
        assert_eq!(decode_judgment(raw), decode_judgment(raw));
    }

    #[test]
    fn coerces_result_values() {
        assert!(decode_judgment(r#"{"result": "PASS"}"#).passed);
        assert!(decode_judgment(r#"{"result": "yes"}"#).passed);
        assert!(decode_judgment(r#"{"result": 1}"#).passed);
        assert!(!decode_judgment(r#"{"result": 0}"#).passed);
        assert!(!decode_judgment(r#"{"result": "nope"}"#).passed);
        assert!(!decode_judgment(r#"{"reason": "no verdict"}"#).passed);
    }

    #[test]
    fn missing_reason_defaults_to_empty() {
        assert_eq!(decode_judgment(r#"{"result": true}"#).reason, "");
        assert_eq!(decode_judgment(r#"{"result": true, "reason": 3}"#).reason, "3");
    }

    #[test]
    fn malformed_judgment_is_a_failed_outcome() {
        let outcome = decode_judgment("looks good to me!");
        assert!(!outcome.passed);
        assert!(outcome.reason.starts_with("failed to parse judgment"));

        let outcome = decode_judgment("[true]");
        assert!(!outcome.passed);
        assert!(outcome.reason.contains("array"));
    }

    #[test]
    fn scenarios_from_json_array() {
        let scenarios = parse_scenarios("```json\n[\"rainy commute\", \"\", \"late night tea\"]\n```");
        assert_eq!(
            scenarios,
            vec![Scenario::new("rainy commute"), Scenario::new("late night tea")]
        );
    }

    #[test]
    fn scenarios_from_scenes_object() {
        let scenarios = parse_scenarios(r#"{"scenes": ["a", "b"]}"#);
        assert_eq!(scenarios.len(), 2);
    }

    #[test]
    fn scenarios_from_braced_array() {
        let scenarios = parse_scenarios("{\n[\"first\", \"second\"]\n}");
        assert_eq!(scenarios, vec![Scenario::new("first"), Scenario::new("second")]);
    }

    #[test]
    fn scenarios_from_plain_lines() {
        let scenarios = parse_scenarios("  first line \n\n second line\n   \n");
        assert_eq!(
            scenarios,
            vec![Scenario::new("first line"), Scenario::new("second line")]
        );
    }

    #[test]
    fn recommendation_prefers_singular_goods() {
        let decoded = decode_recommendation(
            r#"{"goods": {"k3_code": "A1", "name": "Ginger Tea", "price": 29.9},
                "goods_list": [{"k3_code": "B2", "name": "Other"}],
                "reason": "warming"}"#,
        )
        .unwrap();

        match &decoded.pick {
            RecommendationPick::Single(entry) => {
                assert_eq!(entry.name, "Ginger Tea");
                assert_eq!(entry.price, "29.9");
            }
            other => panic!("expected Single, got {other:?}"),
        }
        assert_eq!(decoded.reason, "warming");
    }

    #[test]
    fn recommendation_falls_back_to_first_list_entry() {
        let record = recommendation_record(
            r#"{"goods_list": [{"code": "B2", "name": "Patch", "desc": "warm"}, {"code": "C3"}]}"#,
        );
        let product = record.product.unwrap();
        assert_eq!(product.code, "B2");
        assert_eq!(product.description, "warm");
        assert!(record.success);
    }

    #[test]
    fn recommendation_without_goods_is_absent() {
        let decoded = decode_recommendation(r#"{"goods": null, "goods_list": [], "reason": "none fit"}"#)
            .unwrap();
        assert_eq!(decoded.pick, RecommendationPick::Absent);

        let record = decoded.into_record();
        assert!(record.success);
        assert!(record.product.is_none());
    }

    #[test]
    fn malformed_recommendation_is_recorded_not_raised() {
        let record = recommendation_record("I recommend the tea");
        assert!(!record.success);
        assert!(record
            .error
            .unwrap()
            .starts_with("failed to parse recommendation:"));
    }

    #[test]
    fn blank_text_is_none() {
        assert_eq!(non_empty_text("  \n "), None);
        assert_eq!(non_empty_text(" draft "), Some("draft".to_string()));
    }
}
