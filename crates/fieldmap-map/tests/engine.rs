use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

use fieldmap_map::{EngineConfig, FieldMappingEngine, MappingError, default_rules};
use fieldmap_model::{
    FieldDescriptor, MappingRule, Strategy, Suggestion, SuggestionProvider, SuggestionRequest,
    Unavailable,
};

mod common;

use common::{BrokenStore, MemoryStore};

/// Returns canned suggestions and counts calls.
struct CannedProvider {
    response: Result<Vec<Suggestion>, Unavailable>,
    calls: AtomicUsize,
}

impl CannedProvider {
    fn new(response: Result<Vec<Suggestion>, Unavailable>) -> Arc<Self> {
        Arc::new(Self {
            response,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SuggestionProvider for CannedProvider {
    fn suggest(&self, _request: &SuggestionRequest) -> Result<Vec<Suggestion>, Unavailable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

fn suggestion(source: &str, target: &str, confidence: f64) -> Suggestion {
    Suggestion {
        source: source.to_string(),
        target: target.to_string(),
        confidence,
        reasoning: String::new(),
    }
}

fn engine_with(rules: Vec<MappingRule>) -> FieldMappingEngine {
    FieldMappingEngine::new(Arc::new(MemoryStore(rules)))
}

#[test]
fn exact_rules_fan_out_one_source() {
    let engine = engine_with(vec![
        MappingRule::exact("payload.name.legal_name", "CD_Legal_Name").with_priority(10),
        MappingRule::exact("payload.name.legal_name", "CD_LLC_Name").with_priority(10),
    ]);
    let source = json!({"payload": {"name": {"legal_name": "Acme LLC"}}});
    let skeleton = json!({"CD_Legal_Name": null, "CD_LLC_Name": null});

    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("resolve document");

    assert_eq!(
        resolved.document,
        json!({"CD_Legal_Name": "Acme LLC", "CD_LLC_Name": "Acme LLC"})
    );
    assert_eq!(resolved.report.mapped_count, 2);
    assert_eq!(resolved.report.mapped_source_count, 1);
    assert!((resolved.report.accuracy - 1.0).abs() < f64::EPSILON);
    assert_eq!(resolved.report.count_for(Strategy::Exact), 2);
    assert!(resolved.report.unmapped_target.is_empty());
}

#[test]
fn context_rules_keep_sections_apart() {
    let engine = engine_with(vec![
        MappingRule::context("principal_address", "PA_{field}").with_priority(30),
        MappingRule::context("registered_agent.Address", "RA_{field}").with_priority(30),
    ]);
    let source = json!({
        "principal_address": {"city": "Pune"},
        "registered_agent": {"Address": {"city": "Boston"}}
    });
    let skeleton = json!({"PA_City": "", "RA_City": ""});

    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("resolve document");

    assert_eq!(resolved.document["PA_City"], "Pune");
    assert_eq!(resolved.document["RA_City"], "Boston");
    assert_eq!(resolved.report.count_for(Strategy::Context), 2);
}

#[test]
fn semantic_matches_respect_sections_without_rules() {
    let engine = FieldMappingEngine::without_store();
    let source = json!({
        "principal_address": {"city": "Pune"},
        "registered_agent": {"Address": {"city": "Boston"}}
    });
    let skeleton = json!({"RA_City": null, "PA_City": null});

    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("resolve document");

    assert_eq!(resolved.document["PA_City"], "Pune");
    assert_eq!(resolved.document["RA_City"], "Boston");
    assert_eq!(resolved.report.count_for(Strategy::Semantic), 2);
}

#[test]
fn failing_store_degrades_to_semantic_matching() {
    let engine = FieldMappingEngine::new(Arc::new(BrokenStore));
    let source = json!({"company": {"email": "ops@acme.test", "notes": "n/a"}});
    let skeleton = json!({"Email": null, "Legal_Name": null});

    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("a store outage must not fail the run");

    assert!(!resolved.diagnostics.store_available);
    assert_eq!(resolved.diagnostics.rules_loaded, 0);
    assert_eq!(resolved.document["Email"], "ops@acme.test");
    assert_eq!(resolved.report.mapped_count, 1);
    assert_eq!(resolved.report.count_for(Strategy::Semantic), 1);
    assert_eq!(resolved.report.unmapped_target, vec!["Legal_Name".to_string()]);
}

#[test]
fn lower_priority_number_wins_a_contested_target() {
    let engine = engine_with(vec![
        MappingRule::exact("a.x", "T").with_priority(50),
        MappingRule::exact("b.y", "T").with_priority(5),
    ]);
    let source = json!({"a": {"x": "first"}, "b": {"y": "second"}});
    let skeleton = json!({"T": null});

    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("resolve document");

    assert_eq!(resolved.document["T"], "second");
    assert_eq!(resolved.report.mapped_count, 1);
    assert_eq!(resolved.report.unmapped_source, vec!["a.x".to_string()]);
}

#[test]
fn prefilled_skeleton_values_are_kept() {
    let engine = engine_with(vec![MappingRule::exact("a.x", "T")]);
    let source = json!({"a": {"x": "incoming"}});
    let skeleton = json!({"T": "already set", "U": null});

    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("resolve document");

    assert_eq!(resolved.document["T"], "already set");
    assert!(resolved.mappings.is_empty());
    assert_eq!(resolved.report.total_target_fields, 2);
    assert_eq!(resolved.report.unmapped_target, vec!["U".to_string()]);
}

#[test]
fn empty_source_values_are_never_applied() {
    let engine = engine_with(vec![
        MappingRule::exact("a.blank", "T"),
        MappingRule::exact("a.missing", "U"),
    ]);
    let source = json!({"a": {"blank": "   ", "missing": null}});
    let skeleton = json!({"T": null, "U": null});

    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("resolve document");

    assert!(resolved.mappings.is_empty());
    assert_eq!(resolved.document, skeleton);
}

#[test]
fn templated_targets_outside_the_schema_are_discarded() {
    let engine = engine_with(vec![
        MappingRule::pattern(r"misc\.(\w+)", "data.{field}").with_priority(20),
    ]);
    let source = json!({"misc": {"reference": "R-1"}});
    let skeleton = json!({"data": {"Other": null}});

    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("resolve document");

    assert!(resolved.mappings.is_empty());
    assert_eq!(resolved.document, skeleton);
    assert!(resolved.document["data"].get("reference").is_none());
}

#[test]
fn pattern_rules_fill_nested_targets() {
    let engine = engine_with(vec![
        MappingRule::pattern(r"EntityType\.(\w+)", "data.EntityType.{field}").with_priority(20),
    ]);
    let source = json!({"1": {"EntityType": {"Code": "LLC"}}});
    let skeleton = json!({"data": {"EntityType": {"Code": null}}});

    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("resolve document");

    assert_eq!(resolved.document["data"]["EntityType"]["Code"], "LLC");
    assert_eq!(resolved.report.count_for(Strategy::Pattern), 1);
}

#[test]
fn dotted_skeleton_keys_are_filled_in_place() {
    let engine = engine_with(vec![MappingRule::exact(
        "payload.name.legal_name",
        "Entity Name (e.g. Acme Inc.)",
    )]);
    let source = json!({"payload": {"name": {"legal_name": "Acme LLC"}}});
    let skeleton = json!({"Entity Name (e.g. Acme Inc.)": null});

    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("resolve document");

    assert_eq!(
        resolved.document,
        json!({"Entity Name (e.g. Acme Inc.)": "Acme LLC"})
    );
    assert_eq!(resolved.report.mapped_count, 1);
}

#[test]
fn section_scoped_source_beats_an_earlier_unscoped_one() {
    let engine = FieldMappingEngine::without_store();
    let source = json!({
        "city": "Springfield",
        "registered_agent": {"city": "Boston"}
    });
    let skeleton = json!({"RA_City": null});

    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("resolve document");

    assert_eq!(resolved.document, json!({"RA_City": "Boston"}));
    assert_eq!(resolved.report.unmapped_source, vec!["city".to_string()]);
}

#[test]
fn resolved_document_keeps_skeleton_key_order() {
    let engine = engine_with(vec![MappingRule::exact("a.x", "Zeta")]);
    let source = json!({"a": {"x": "value"}});
    let skeleton: Value =
        serde_json::from_str(r#"{"Zeta": null, "Alpha": null, "Mid": {"b": null, "a": null}}"#)
            .expect("parse skeleton");

    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("resolve document");

    let written = serde_json::to_string(&resolved.document).expect("serialize");
    assert_eq!(
        written,
        r#"{"Zeta":"value","Alpha":null,"Mid":{"b":null,"a":null}}"#
    );
    assert_eq!(
        resolved.report.unmapped_target,
        vec!["Alpha".to_string(), "Mid.b".to_string(), "Mid.a".to_string()]
    );
}

#[test]
fn runs_are_idempotent() {
    let engine = engine_with(default_rules());
    let source = json!({
        "payload": {
            "name": {"legal_name": "Acme LLC"},
            "principal_address": {"city": "Pune", "state": "MH", "zip_code": "411001"},
            "registered_agent": {
                "key_personnel_name": "Jane Roe",
                "address": {"city": "Boston", "state": "MA"}
            }
        }
    });
    let skeleton = json!({
        "CD_Legal_Name": null,
        "PA_City": null,
        "PA_State": null,
        "PA_Postal_Code": null,
        "RA_Name": null,
        "RA_City": null,
        "RA_State": null
    });

    let first = engine
        .resolve_document(&source, &skeleton)
        .expect("first run");
    let second = engine
        .resolve_document(&source, &skeleton)
        .expect("second run");

    assert_eq!(first.document, second.document);
    assert_eq!(first.mappings, second.mappings);
    assert_eq!(first.report, second.report);
    assert_eq!(first.document["RA_City"], "Boston");
    assert_eq!(first.document["PA_City"], "Pune");
    assert_eq!(first.document["RA_Name"], "Jane Roe");
}

fn low_coverage_case() -> (Value, Value, Vec<MappingRule>) {
    let source = json!({
        "payload": {"name": {"legal_name": "Acme"}},
        "misc": {"foo": "1", "bar": "2", "baz": "3", "qux": "4"}
    });
    let skeleton = json!({"CD_Legal_Name": null, "Other_Field": null});
    let rules = vec![MappingRule::exact("payload.name.legal_name", "CD_Legal_Name")];
    (source, skeleton, rules)
}

#[test]
fn ai_suggestions_only_add_mappings() {
    let (source, skeleton, rules) = low_coverage_case();
    let deterministic = engine_with(rules.clone())
        .resolve_document(&source, &skeleton)
        .expect("deterministic run");

    let provider = CannedProvider::new(Ok(vec![
        suggestion("misc.foo", "CD_Legal_Name", 0.99),
        suggestion("misc.bar", "Other_Field", 0.8),
        suggestion("misc.baz", "Not_A_Field", 0.9),
        suggestion("misc.qux", "Other_Field", 0.3),
    ]));
    let engine = engine_with(rules).with_provider(provider.clone());
    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("ai-assisted run");

    assert_eq!(provider.calls(), 1);
    assert!(resolved.diagnostics.ai_invoked);
    assert_eq!(resolved.diagnostics.ai_accepted, 1);
    assert_eq!(resolved.document["CD_Legal_Name"], "Acme");
    assert_eq!(resolved.document["Other_Field"], "2");
    for mapping in &deterministic.mappings {
        assert!(resolved.mappings.contains(mapping));
    }
    assert_eq!(resolved.report.count_for(Strategy::Ai), 1);
}

#[test]
fn ai_is_skipped_when_coverage_is_sufficient() {
    let (source, skeleton, rules) = low_coverage_case();
    let provider = CannedProvider::new(Ok(vec![suggestion("misc.bar", "Other_Field", 0.8)]));
    let engine = engine_with(rules)
        .with_provider(provider.clone())
        .with_config(EngineConfig::default().with_coverage_threshold(0.2));

    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("resolve document");

    assert_eq!(provider.calls(), 0);
    assert!(!resolved.diagnostics.ai_invoked);
    assert!(resolved.document["Other_Field"].is_null());
}

#[test]
fn disabled_ai_is_never_called() {
    let (source, skeleton, rules) = low_coverage_case();
    let provider = CannedProvider::new(Ok(vec![suggestion("misc.bar", "Other_Field", 0.8)]));
    let engine = engine_with(rules)
        .with_provider(provider.clone())
        .with_config(EngineConfig::default().with_ai_enabled(false));

    engine
        .resolve_document(&source, &skeleton)
        .expect("resolve document");

    assert_eq!(provider.calls(), 0);
}

#[test]
fn unavailable_ai_keeps_deterministic_results() {
    let (source, skeleton, rules) = low_coverage_case();
    let provider = CannedProvider::new(Err(Unavailable::CredentialsExhausted));
    let engine = engine_with(rules).with_provider(provider.clone());

    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("an ai outage must not fail the run");

    assert_eq!(provider.calls(), 1);
    assert_eq!(resolved.diagnostics.ai_accepted, 0);
    assert_eq!(resolved.report.mapped_count, 1);
    assert_eq!(resolved.document["CD_Legal_Name"], "Acme");
}

#[test]
fn malformed_inputs_raise() {
    let engine = FieldMappingEngine::without_store();

    let error = engine
        .resolve_document(&json!("not a document"), &json!({"T": null}))
        .expect_err("scalar source");
    assert_eq!(error, MappingError::MalformedSource { found: "string" });

    let error = engine
        .resolve_document(&json!({"a": 1}), &json!([1, 2]))
        .expect_err("array skeleton");
    assert_eq!(error, MappingError::MalformedTarget { found: "array" });
}

#[test]
fn resolve_fields_fills_every_descriptor() {
    let engine = engine_with(default_rules());
    let source = json!({
        "1": {
            "Payload": {
                "Name": {"Legal_Name": "Acme LLC"},
                "Registered_Agent": {"contact_no": 5551234}
            }
        }
    });
    let descriptors = vec![
        FieldDescriptor::new("Entity Name").with_hint("Name of the entity"),
        FieldDescriptor::new("Contact_No"),
        FieldDescriptor::new("Unrelated Box"),
        FieldDescriptor::new("Entity Name"),
    ];

    let resolved = engine
        .resolve_fields(&source, &descriptors)
        .expect("resolve fields");

    assert_eq!(resolved.fields.len(), 3);
    assert_eq!(resolved.fields["Entity Name"], "Acme LLC");
    assert_eq!(resolved.fields["Contact_No"], "5551234");
    assert_eq!(resolved.fields["Unrelated Box"], "");
    assert_eq!(resolved.report.total_target_fields, 3);
}

#[test]
fn report_matches_document_resolution() {
    let engine = engine_with(default_rules());
    let source = json!({"payload": {"name": {"legal_name": "Acme LLC"}, "extra": "x"}});
    let skeleton = json!({"CD_Legal_Name": null, "Unused": null});

    let report = engine.report(&source, &skeleton).expect("report");
    let resolved = engine
        .resolve_document(&source, &skeleton)
        .expect("resolve document");

    assert_eq!(report, resolved.report);
    assert_eq!(report.total_source_fields, 2);
    assert!((report.accuracy - 0.5).abs() < f64::EPSILON);
}
