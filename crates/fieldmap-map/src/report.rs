//! Mapping report construction.

use std::collections::{BTreeMap, BTreeSet};

use fieldmap_model::{MappingReport, ResolvedMapping, SourcePath, Strategy, TargetField};

/// Builds the report for one run.
///
/// Pure: the same inputs always give the same report. Prefilled targets
/// count toward the total but are neither mapped nor unmapped.
pub fn build_report(
    leaves: &[SourcePath],
    targets: &[TargetField],
    mappings: &[ResolvedMapping],
) -> MappingReport {
    let mapped_sources: BTreeSet<&str> = mappings
        .iter()
        .map(|mapping| mapping.source_path.as_str())
        .collect();
    let mapped_targets: BTreeSet<&str> = mappings
        .iter()
        .map(|mapping| mapping.target_path.as_str())
        .collect();
    let unmapped_source = leaves
        .iter()
        .filter(|leaf| !mapped_sources.contains(leaf.path.as_str()))
        .map(|leaf| leaf.path.clone())
        .collect();
    let unmapped_target = targets
        .iter()
        .filter(|target| !target.prefilled && !mapped_targets.contains(target.path.as_str()))
        .map(|target| target.path.clone())
        .collect();
    let mapped_source_count = leaves
        .iter()
        .filter(|leaf| mapped_sources.contains(leaf.path.as_str()))
        .count();
    let accuracy = if leaves.is_empty() {
        0.0
    } else {
        (mapped_source_count as f64 / leaves.len() as f64).clamp(0.0, 1.0)
    };
    MappingReport {
        total_source_fields: leaves.len(),
        total_target_fields: targets.len(),
        mapped_count: mappings.len(),
        mapped_source_count,
        accuracy,
        mappings: mappings.to_vec(),
        unmapped_source,
        unmapped_target,
        by_strategy: strategy_breakdown(mappings),
    }
}

/// Resolved-mapping counts per strategy, with every strategy present.
pub fn strategy_breakdown(mappings: &[ResolvedMapping]) -> BTreeMap<Strategy, usize> {
    let mut counts: BTreeMap<Strategy, usize> =
        Strategy::ALL.iter().map(|strategy| (*strategy, 0)).collect();
    for mapping in mappings {
        *counts.entry(mapping.strategy).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn resolved(source: &str, target: &str, strategy: Strategy) -> ResolvedMapping {
        ResolvedMapping {
            source_path: source.to_string(),
            target_path: target.to_string(),
            strategy,
            applied_value: json!("v"),
            confidence: 1.0,
        }
    }

    #[test]
    fn fan_out_counts_mappings_but_not_sources_twice() {
        let leaves = vec![
            SourcePath::new("a", json!("v")),
            SourcePath::new("b", json!("w")),
        ];
        let targets = vec![
            TargetField::new("T1"),
            TargetField::new("T2"),
            TargetField::new("T3"),
        ];
        let mappings = vec![
            resolved("a", "T1", Strategy::Exact),
            resolved("a", "T2", Strategy::Exact),
        ];
        let report = build_report(&leaves, &targets, &mappings);
        assert_eq!(report.mapped_count, 2);
        assert_eq!(report.mapped_source_count, 1);
        assert!((report.accuracy - 0.5).abs() < 1e-9);
        assert_eq!(report.unmapped_source, vec!["b"]);
        assert_eq!(report.unmapped_target, vec!["T3"]);
        assert_eq!(report.count_for(Strategy::Exact), 2);
        assert_eq!(report.count_for(Strategy::Ai), 0);
    }

    #[test]
    fn empty_source_has_zero_accuracy() {
        let report = build_report(&[], &[TargetField::new("T")], &[]);
        assert_eq!(report.accuracy, 0.0);
        assert_eq!(report.unmapped_target, vec!["T"]);
    }
}
