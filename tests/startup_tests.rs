//! The binary must refuse to start on invalid configuration.

use std::process::{Command, Output};

const SHORT_SECRET: &str = "too-short-secret";

fn run_with(vars: &[(&str, &str)]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cms-api"))
        .env_clear()
        .envs(vars.iter().copied())
        // Keep dotenvy from picking up a developer's .env.
        .current_dir(std::env::temp_dir())
        .output()
        .expect("spawn cms-api")
}

#[test]
fn exits_non_zero_without_configuration() {
    let output = run_with(&[]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    for key in ["DATABASE_URL", "AUTH_URL", "AUTH_SECRET", "PUBLIC_API_URL"] {
        assert!(stderr.contains(key), "stderr does not name {key}: {stderr}");
    }
}

#[test]
fn short_secret_is_named_but_never_printed() {
    let output = run_with(&[
        ("DATABASE_URL", "file:./dev.db"),
        ("AUTH_URL", "http://localhost:3000"),
        ("AUTH_SECRET", SHORT_SECRET),
        ("PUBLIC_API_URL", "http://localhost:8000"),
        ("API_PORT", "0"),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stderr.contains("AUTH_SECRET"), "{stderr}");
    assert!(!stderr.contains(SHORT_SECRET));
    assert!(!stdout.contains(SHORT_SECRET));
}
