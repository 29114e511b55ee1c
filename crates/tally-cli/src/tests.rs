//! CLI command tests

use std::fs;

use rust_decimal::Decimal;

use crate::commands;

fn write_csv(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("statement.csv");
    fs::write(
        &path,
        "Date,Description,Amount\n\
         01/05/2024,NETFLIX.COM,-15.00\n\
         01/06/2024,STARBUCKS #1234,-5.50\n\
         01/07/2024,CORNER SUPERMARKET,-42.17\n",
    )
    .unwrap();
    path
}

#[test]
fn test_import_command_runs() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path());
    commands::cmd_import(&csv, "USD", false).unwrap();
    commands::cmd_import(&csv, "USD", true).unwrap();
}

#[test]
fn test_analyze_command_runs_with_explicit_store() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path());
    let store = dir.path().join("overrides.json");
    commands::cmd_analyze(&csv, "USD", None, Decimal::TWO, false, Some(&store)).unwrap();
    commands::cmd_analyze(&csv, "USD", None, Decimal::TWO, true, Some(&store)).unwrap();
}

#[test]
fn test_correct_then_analyze_uses_override() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path());
    let store_path = dir.path().join("overrides.json");

    commands::cmd_correct("STARBUCKS #1234", "Eating Out", Some(&store_path)).unwrap();

    // The correction lands in the store under the normalized key
    let store = commands::open_store(Some(&store_path)).unwrap();
    use tally_core::FeedbackStore;
    assert_eq!(
        store.get("starbucks 1234").as_deref(),
        Some("Eating Out")
    );

    // And analyze keeps working against the same store
    commands::cmd_analyze(&csv, "USD", None, Decimal::TWO, false, Some(&store_path)).unwrap();
}

#[test]
fn test_effective_rules_put_user_rules_first() {
    let dir = tempfile::tempdir().unwrap();
    let rules_path = dir.path().join("rules.toml");
    fs::write(
        &rules_path,
        "[[rule]]\nkeyword = \"starbucks\"\ncategory = \"Treats\"\n",
    )
    .unwrap();

    let rules = commands::effective_rules(Some(&rules_path)).unwrap();
    assert_eq!(rules[0].keyword, "starbucks");
    assert_eq!(rules[0].category, "Treats");
    // Built-ins follow
    assert!(rules.len() > 1);
}

#[test]
fn test_rules_command_runs() {
    commands::cmd_rules(None).unwrap();
}
