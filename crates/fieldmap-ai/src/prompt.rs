//! Prompt construction and response parsing.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use fieldmap_model::{Suggestion, SuggestionRequest, Unavailable};

const INSTRUCTIONS: &str = "You map fields of a business-entity intake document onto the fields \
of a target form. For each unmapped source field, pick the target field that should hold its \
value, if any. Only use target names from the list below, spelled exactly as given. Never map \
one target twice. Give a confidence between 0.0 and 1.0 and a short reason.\n\
Respond with JSON only, in this shape:\n\
{\"mappings\":[{\"source\":\"<source path>\",\"target\":\"<target name>\",\"confidence\":0.0,\"reasoning\":\"...\"}]}\n";

#[derive(Serialize)]
struct PromptField<'a> {
    path: &'a str,
    value: &'a Value,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct PromptTarget<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    hints: &'a [String],
}

/// Renders the single batched prompt for a request.
pub fn build_prompt(request: &SuggestionRequest) -> String {
    let fields: Vec<PromptField<'_>> = request
        .unmapped_fields
        .iter()
        .map(|field| PromptField {
            path: &field.path,
            value: &field.value,
            kind: field.inferred_type.as_str(),
        })
        .collect();
    let targets: Vec<PromptTarget<'_>> = request
        .unfilled_targets
        .iter()
        .map(|target| PromptTarget {
            name: &target.path,
            hints: &target.hints,
        })
        .collect();

    let mut prompt = String::from(INSTRUCTIONS);
    prompt.push_str("\n## Unmapped source fields\n");
    prompt.push_str(&serde_json::to_string_pretty(&fields).unwrap_or_default());
    prompt.push_str("\n\n## Empty target fields\n");
    prompt.push_str(&serde_json::to_string_pretty(&targets).unwrap_or_default());
    prompt.push('\n');
    prompt
}

/// Extracts suggestions from free-form model output.
///
/// The outermost JSON object and the outermost JSON array in the text are
/// tried in the order they start; the first one that is `{"mappings": [...]}`
/// or a bare array wins. Items that do not parse as a suggestion are skipped.
pub fn parse_suggestions(text: &str) -> Result<Vec<Suggestion>, Unavailable> {
    let mut failure = Unavailable::Malformed("response contains no JSON".to_string());
    for span in json_spans(text) {
        match suggestion_items(span) {
            Ok(items) => return Ok(keep_suggestions(items)),
            Err(error) => failure = error,
        }
    }
    Err(failure)
}

fn suggestion_items(span: &str) -> Result<Vec<Value>, Unavailable> {
    let parsed: Value = serde_json::from_str(span)
        .map_err(|error| Unavailable::Malformed(format!("response is not valid JSON: {error}")))?;
    match parsed {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("mappings") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(Unavailable::Malformed(
                "response has no mappings array".to_string(),
            )),
        },
        _ => Err(Unavailable::Malformed(
            "response is not an object or array".to_string(),
        )),
    }
}

fn keep_suggestions(items: Vec<Value>) -> Vec<Suggestion> {
    let total = items.len();
    let suggestions: Vec<Suggestion> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if suggestions.len() < total {
        debug!(
            skipped = total - suggestions.len(),
            "skipped malformed suggestion items"
        );
    }
    suggestions
}

/// Outermost `{...}` and `[...]` spans, earliest start first.
fn json_spans(text: &str) -> Vec<&str> {
    let mut spans: Vec<(usize, &str)> = [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| {
            let start = text.find(open)?;
            let end = text.rfind(close)?;
            (start < end).then(|| (start, &text[start..=end]))
        })
        .collect();
    spans.sort_by_key(|(start, _)| *start);
    spans.into_iter().map(|(_, span)| span).collect()
}
