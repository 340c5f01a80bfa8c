use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, info_span, warn};

use fieldmap_ai::PooledSuggestionProvider;
use fieldmap_cli::config::AppConfig;
use fieldmap_cli::logging::redact_value;
use fieldmap_map::{FieldMappingEngine, RuleRepository, RuleStore, RunDiagnostics, value_text};
use fieldmap_model::{FieldDescriptor, MappingReport, MappingRule, ResolvedMapping, RuleKey};

use crate::cli::{ReportArgs, ResolveArgs, RuleKeyArgs, RulesCommand};
use crate::summary::{print_report, print_rules};

pub fn run_resolve(config: &AppConfig, args: &ResolveArgs) -> Result<()> {
    let span = info_span!("resolve_command", source = %args.source.display());
    let _guard = span.enter();
    let start = Instant::now();

    let engine = build_engine(config, args.no_ai);
    let source = read_json(&args.source)?;

    let (output, mappings, report, diagnostics) = if let Some(path) = &args.skeleton {
        let skeleton = read_json(path)?;
        let resolved = engine
            .resolve_document(&source, &skeleton)
            .context("resolve document")?;
        (
            resolved.document,
            resolved.mappings,
            resolved.report,
            resolved.diagnostics,
        )
    } else if let Some(path) = &args.fields {
        let descriptors = read_descriptors(path)?;
        let resolved = engine
            .resolve_fields(&source, &descriptors)
            .context("resolve fields")?;
        (
            serde_json::to_value(&resolved.fields)?,
            resolved.mappings,
            resolved.report,
            resolved.diagnostics,
        )
    } else {
        bail!("either --skeleton or --fields is required");
    };
    log_applied(&mappings);

    if let Some(path) = &args.output {
        write_json(path, &output)?;
        info!(path = %path.display(), "result written");
        emit_report(&report, &diagnostics, args.json)?;
    } else if args.json {
        print_json(&json!({
            "result": output,
            "report": report,
            "diagnostics": diagnostics,
        }))?;
    } else {
        print_json(&output)?;
        print_report(&report, &diagnostics);
    }

    info!(
        mapped = report.mapped_count,
        duration_ms = start.elapsed().as_millis(),
        "resolve command complete"
    );
    Ok(())
}

pub fn run_report(config: &AppConfig, args: &ReportArgs) -> Result<()> {
    let span = info_span!("report_command", source = %args.source.display());
    let _guard = span.enter();

    let engine = build_engine(config, args.no_ai);
    let source = read_json(&args.source)?;
    let skeleton = read_json(&args.skeleton)?;
    let resolved = engine
        .resolve_document(&source, &skeleton)
        .context("build mapping report")?;
    emit_report(&resolved.report, &resolved.diagnostics, args.json)
}

pub fn run_rules(config: &AppConfig, command: &RulesCommand) -> Result<()> {
    let path = &config.store.path;
    let span = info_span!("rules_command", store = %path.display());
    let _guard = span.enter();

    let repository = RuleRepository::open(path)
        .with_context(|| format!("open rule store {}", path.display()))?;

    match command {
        RulesCommand::List { all, json } => {
            let listed = if *all {
                repository.list_all()
            } else {
                repository.list()
            };
            let rules = listed.context("list rules")?;
            if *json {
                print_json(&rules)?;
            } else {
                print_rules(&rules);
            }
        }
        RulesCommand::Add { file } => {
            let rules = read_rules(file)?;
            let count = repository.add_rules(rules).context("add rules")?;
            println!("Stored {count} rule(s).");
        }
        RulesCommand::Remove(key) => {
            let key = rule_key(key);
            if !repository.remove_rule(&key).context("remove rule")? {
                bail!("no rule {key}");
            }
            println!("Removed {key}.");
        }
        RulesCommand::Update {
            key,
            confidence,
            priority,
        } => {
            let key = rule_key(key);
            if !repository
                .update_rule(&key, *confidence, *priority)
                .context("update rule")?
            {
                bail!("no rule {key}");
            }
            println!("Updated {key}.");
        }
        RulesCommand::SetActive { key, active } => {
            let key = rule_key(key);
            if !repository
                .set_active(&key, *active)
                .context("change rule state")?
            {
                bail!("no rule {key}");
            }
            let state = if *active { "enabled" } else { "disabled" };
            println!("Rule {key} {state}.");
        }
        RulesCommand::Seed => {
            let count = repository.seed_defaults().context("seed default rules")?;
            println!("Seeded {count} default rule(s).");
        }
    }

    repository.close().context("close rule store")?;
    Ok(())
}

/// Wires the store and the AI provider; either one failing only degrades the run.
fn build_engine(config: &AppConfig, no_ai: bool) -> FieldMappingEngine {
    let store_path = &config.store.path;
    let mut engine = match RuleRepository::open(store_path) {
        Ok(repository) => FieldMappingEngine::new(Arc::new(repository)),
        Err(error) => {
            warn!(
                path = %store_path.display(),
                error = %error,
                "rule store unavailable, continuing with built-in vocabulary"
            );
            FieldMappingEngine::without_store()
        }
    };

    let ai_enabled = config.ai.enabled && !no_ai;
    if ai_enabled {
        match PooledSuggestionProvider::from_config(&config.ai) {
            Ok(Some(provider)) => {
                debug!(credentials = provider.pool().len(), "ai fallback configured");
                engine = engine.with_provider(Arc::new(provider));
            }
            Ok(None) => debug!("ai fallback not configured"),
            Err(error) => warn!(error = %error, "ai fallback unavailable"),
        }
    }
    engine.with_config(config.engine_config().with_ai_enabled(ai_enabled))
}

fn log_applied(mappings: &[ResolvedMapping]) {
    for mapping in mappings {
        debug!(
            source = %mapping.source_path,
            target = %mapping.target_path,
            strategy = %mapping.strategy,
            value = redact_value(&value_text(&mapping.applied_value)),
            "applied"
        );
    }
}

fn emit_report(report: &MappingReport, diagnostics: &RunDiagnostics, json: bool) -> Result<()> {
    if json {
        print_json(&json!({ "report": report, "diagnostics": diagnostics }))
    } else {
        print_report(report, diagnostics);
        Ok(())
    }
}

fn rule_key(args: &RuleKeyArgs) -> RuleKey {
    RuleKey::new(&args.source, &args.target)
}

fn read_json(path: &Path) -> Result<Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse JSON in {}", path.display()))
}

fn read_descriptors(path: &Path) -> Result<Vec<FieldDescriptor>> {
    let value = read_json(path)?;
    serde_json::from_value(value)
        .with_context(|| format!("{} is not a list of field descriptors", path.display()))
}

/// Accepts a single rule object or an array of rules.
fn read_rules(path: &Path) -> Result<Vec<MappingRule>> {
    let value = read_json(path)?;
    let rules = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|rule| vec![rule])
    };
    rules.with_context(|| format!("{} does not contain mapping rules", path.display()))
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("write {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
