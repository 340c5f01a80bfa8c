use std::fs;
use std::path::PathBuf;

use fieldmap_map::{RuleRepository, RuleStore, StoreError, StoredRuleCatalogue, default_rules};
use fieldmap_model::{MappingRule, ModelError, RuleKey, Strategy};

fn temp_repo_dir(name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("fieldmap_repo_{name}_{stamp}"));
    dir
}

fn cleanup_dir(dir: &PathBuf) {
    let _ = fs::remove_dir_all(dir);
}

fn sample_rules() -> Vec<MappingRule> {
    vec![
        MappingRule::exact("payload.name.legal_name", "CD_Legal_Name").with_priority(10),
        MappingRule::pattern(r"State\.(\w+)", "data.State.{field}").with_priority(20),
        MappingRule::context("principal_address", "PA_{field}").with_priority(30),
    ]
}

#[test]
fn repository_add_and_list() {
    let dir = temp_repo_dir("add");
    let repo = RuleRepository::open(dir.join("rules.json")).expect("open repo");

    assert!(repo.list().expect("list").is_empty());
    let written = repo.add_rules(sample_rules()).expect("add rules");
    assert_eq!(written, 3);

    let rules = repo.list().expect("list");
    assert_eq!(rules.len(), 3);
    assert_eq!(rules[0].strategy(), Strategy::Exact);
    assert_eq!(rules[1].strategy(), Strategy::Pattern);
    assert_eq!(rules[2].strategy(), Strategy::Context);
    assert!(repo.path().exists());

    cleanup_dir(&dir);
}

#[test]
fn repository_upsert_is_idempotent() {
    let dir = temp_repo_dir("upsert");
    let repo = RuleRepository::open(dir.join("rules.json")).expect("open repo");

    repo.add_rules(sample_rules()).expect("add rules");
    repo.add_rules(sample_rules()).expect("add rules again");
    assert_eq!(repo.list_all().expect("list all").len(), 3);

    repo.add_rule(
        MappingRule::exact("payload.name.legal_name", "CD_Legal_Name").with_priority(1),
    )
    .expect("replace rule");
    let rules = repo.list_all().expect("list all");
    assert_eq!(rules.len(), 3);
    let replaced = rules
        .iter()
        .find(|rule| rule.strategy() == Strategy::Exact)
        .expect("exact rule");
    assert_eq!(replaced.priority, 1);

    cleanup_dir(&dir);
}

#[test]
fn repository_remove_rule() {
    let dir = temp_repo_dir("remove");
    let repo = RuleRepository::open(dir.join("rules.json")).expect("open repo");
    repo.add_rules(sample_rules()).expect("add rules");

    let key = RuleKey::new("payload.name.legal_name", "CD_Legal_Name");
    assert!(repo.remove_rule(&key).expect("remove"));
    assert!(!repo.remove_rule(&key).expect("remove again"));
    assert_eq!(repo.list().expect("list").len(), 2);

    cleanup_dir(&dir);
}

#[test]
fn repository_update_rule() {
    let dir = temp_repo_dir("update");
    let repo = RuleRepository::open(dir.join("rules.json")).expect("open repo");
    repo.add_rules(sample_rules()).expect("add rules");

    let key = RuleKey::new("principal_address", "PA_{field}");
    assert!(repo.update_rule(&key, 0.6, 5).expect("update"));
    let first = repo.list().expect("list").remove(0);
    assert_eq!(first.key(), key);
    assert!((first.confidence - 0.6).abs() < f64::EPSILON);

    let missing = RuleKey::new("nowhere", "Nothing");
    assert!(!repo.update_rule(&missing, 0.6, 5).expect("update missing"));

    let error = repo.update_rule(&key, 1.5, 5).expect_err("confidence out of range");
    assert!(matches!(
        error,
        StoreError::InvalidRule(ModelError::InvalidConfidence { .. })
    ));

    cleanup_dir(&dir);
}

#[test]
fn inactive_rules_are_not_listed() {
    let dir = temp_repo_dir("inactive");
    let repo = RuleRepository::open(dir.join("rules.json")).expect("open repo");
    repo.add_rules(sample_rules()).expect("add rules");

    let key = RuleKey::new(r"State\.(\w+)", "data.State.{field}");
    assert!(repo.set_active(&key, false).expect("deactivate"));
    assert_eq!(repo.list().expect("list").len(), 2);
    assert_eq!(repo.list_all().expect("list all").len(), 3);

    assert!(repo.set_active(&key, true).expect("reactivate"));
    assert_eq!(repo.list().expect("list").len(), 3);

    cleanup_dir(&dir);
}

#[test]
fn invalid_rules_are_rejected() {
    let dir = temp_repo_dir("invalid");
    let repo = RuleRepository::open(dir.join("rules.json")).expect("open repo");

    let error = repo
        .add_rule(MappingRule::pattern(r"State\.(\w+", "data.State.{field}"))
        .expect_err("unbalanced pattern");
    assert!(matches!(error, StoreError::InvalidPattern { .. }));

    let error = repo
        .add_rule(MappingRule::context("principal_address", "PA_City"))
        .expect_err("template without placeholder");
    assert!(matches!(
        error,
        StoreError::InvalidRule(ModelError::MissingPlaceholder { .. })
    ));

    let error = repo
        .add_rules(vec![
            MappingRule::exact("a", "b"),
            MappingRule::exact("", "c"),
        ])
        .expect_err("empty path");
    assert!(matches!(error, StoreError::InvalidRule(ModelError::EmptyPath { .. })));
    assert!(repo.list_all().expect("list all").is_empty());
    assert!(!repo.path().exists());

    cleanup_dir(&dir);
}

#[test]
fn seed_defaults_is_repeatable() {
    let dir = temp_repo_dir("seed");
    let repo = RuleRepository::open(dir.join("rules.json")).expect("open repo");

    let seeded = repo.seed_defaults().expect("seed");
    assert_eq!(seeded, default_rules().len());
    repo.seed_defaults().expect("seed again");
    assert_eq!(repo.list_all().expect("list all").len(), default_rules().len());

    let priorities: Vec<u32> = repo
        .list()
        .expect("list")
        .iter()
        .map(|rule| rule.priority)
        .collect();
    let mut sorted = priorities.clone();
    sorted.sort_unstable();
    assert_eq!(priorities, sorted);

    cleanup_dir(&dir);
}

#[test]
fn catalogue_persists_across_open_and_close() {
    let dir = temp_repo_dir("persist");
    let path = dir.join("nested").join("rules.json");

    let repo = RuleRepository::open(&path).expect("open repo");
    repo.add_rules(sample_rules()).expect("add rules");
    repo.close().expect("close repo");

    let contents = fs::read_to_string(&path).expect("read catalogue");
    let stored: StoredRuleCatalogue = serde_json::from_str(&contents).expect("parse catalogue");
    assert_eq!(stored.version, "1.0");
    assert!(stored.saved_at.is_some());
    assert_eq!(stored.rules.len(), 3);
    assert!(!path.with_extension("json.tmp").exists());

    let reopened = RuleRepository::open(&path).expect("reopen repo");
    assert_eq!(reopened.list().expect("list"), sample_rules());

    cleanup_dir(&dir);
}

#[test]
fn corrupt_catalogue_fails_to_open() {
    let dir = temp_repo_dir("corrupt");
    fs::create_dir_all(&dir).expect("create dir");
    let path = dir.join("rules.json");
    fs::write(&path, "{ not json").expect("write file");

    let error = RuleRepository::open(&path).expect_err("corrupt catalogue");
    assert!(matches!(error, StoreError::Parse { .. }));

    cleanup_dir(&dir);
}
