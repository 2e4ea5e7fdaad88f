use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn cli(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ledgerwise_cli").unwrap();
    cmd.env("LEDGERWISE_CLI_SCRIPT", "1")
        .env("LEDGERWISE_HOME", home.path())
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn script_mode_reports_ratios() {
    let home = TempDir::new().unwrap();
    let input = "\
add income amount=3240 source=Salary timestamp=2024-06-01
add expenses amount=2864 category=Rent timestamp=2024-06-02
ratios 2024-06
exit
";

    cli(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Saved $3,240.00 to income"))
        .stdout(contains("Savings Rate"))
        .stdout(contains("11.6%"))
        .stdout(contains("88.4%"));

    let aggregate = home
        .path()
        .join("data")
        .join("users")
        .join("default-64656661756c74")
        .join("aggregate.json");
    let json = std::fs::read_to_string(aggregate).unwrap();
    assert!(json.contains("\"2024-06\""));
}

#[test]
fn record_without_api_key_saves_generic_row() {
    let home = TempDir::new().unwrap();

    cli(&home)
        .write_stdin("record Paid 12 dollars for lunch\nexit\n")
        .assert()
        .success()
        .stdout(contains("generic record"))
        .stdout(contains("Successfully saved to expenses"))
        .stdout(contains("Failed to parse transaction, using generic data"));
}

#[test]
fn typos_get_suggestions_and_errors_go_to_stderr() {
    let home = TempDir::new().unwrap();

    cli(&home)
        .write_stdin("ratio\nhistory zero\nversion\n")
        .assert()
        .success()
        .stdout(contains("Unknown command `ratio`"))
        .stdout(contains("Did you mean `ratios`?"))
        .stdout(contains("Ledgerwise 0.1.0"))
        .stderr(contains("invalid month count `zero`"));
}

#[test]
fn users_are_isolated() {
    let home = TempDir::new().unwrap();
    let input = "\
user alice
add expenses amount=50 category=Food timestamp=2024-06-03
user bob
breakdown
";

    cli(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Switched to user `bob`"))
        .stdout(contains("Saved $50.00 to expenses"))
        .stdout(contains("No expenses recorded."));
}
