use std::env;
use std::sync::{Mutex, OnceLock};

use abasto_cli::commands::{doctor, migrate, seed};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("ABASTO_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_fails_on_unreachable_database() {
    with_env(&[("ABASTO_DATABASE_URL", "sqlite:///nonexistent-dir/abasto.db")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 4, "expected connectivity failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "db_connectivity");
    });
}

#[test]
fn seed_returns_dataset_summary() {
    with_env(&[("ABASTO_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected successful seed run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("3 companies"));
        assert!(message.contains("6 products"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_env(&[("ABASTO_DATABASE_URL", "sqlite::memory:")], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);

        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn doctor_reports_pass_with_valid_env() {
    with_env(&[("ABASTO_DATABASE_URL", "sqlite::memory:")], || {
        let output = doctor::run(true);
        let payload = parse_payload(&output);
        assert_eq!(payload["overall_status"], "pass");

        let checks = payload["checks"].as_array().expect("checks should be an array");
        let names: Vec<&str> =
            checks.iter().filter_map(|check| check["name"].as_str()).collect();
        assert_eq!(names, vec!["config_validation", "database_connectivity", "schema_readiness"]);
    });
}

#[test]
fn doctor_reports_failure_when_database_is_unreachable() {
    with_env(&[("ABASTO_DATABASE_URL", "sqlite:///nonexistent-dir/abasto.db")], || {
        let output = doctor::run(true);
        let payload = parse_payload(&output);
        assert_eq!(payload["overall_status"], "fail");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "ABASTO_DATABASE_URL",
        "ABASTO_DATABASE_MAX_CONNECTIONS",
        "ABASTO_DATABASE_TIMEOUT_SECS",
        "ABASTO_RESPONSE_WINDOW_SECS",
        "ABASTO_MAX_INSTANCE",
        "ABASTO_TIMEOUT_ATTEMPTS",
        "ABASTO_WORKER_POLL_SECS",
        "ABASTO_LOG_LEVEL",
        "ABASTO_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, previous) in previous_values {
        match previous {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}
