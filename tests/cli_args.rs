//! Integration tests for CLI argument handling
//!
//! Runs the built binary; nothing here reaches the network.

use std::process::Command;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_esi-gate"))
        .args(args)
        .env_remove("ESI_TOKEN")
        .env_remove("ESI_REDIS_URL")
        .output()
        .expect("Failed to execute esi-gate")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("esi-gate"), "Help should mention esi-gate");
    assert!(stdout.contains("killmail"), "Help should list subcommands");
    assert!(stdout.contains("--redis-url"), "Help should mention --redis-url");
}

#[test]
fn test_missing_subcommand_fails() {
    let output = run_cli(&[]);
    assert!(!output.status.success());
}

#[test]
fn test_non_numeric_id_is_rejected() {
    let output = run_cli(&["character", "not-a-number"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid value"), "Unexpected stderr: {}", stderr);
}

#[test]
fn test_assets_without_token_is_rejected() {
    let output = run_cli(&["assets", "90000001"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--token"), "Unexpected stderr: {}", stderr);
}

#[test]
fn test_get_with_full_url_is_rejected() {
    let output = run_cli(&["get", "https://esi.evetech.net/latest/status/"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid path"), "Unexpected stderr: {}", stderr);
}

#[test]
fn test_invalid_base_url_reports_config_error() {
    let output = run_cli(&["--base-url", "not a url", "status"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not a url"), "Unexpected stderr: {}", stderr);
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use esi_gate::cli::{parse_path_arg, Cli, Command};
    use esi_gate::EsiConfig;

    #[test]
    fn test_cli_structure_with_token() {
        let cli = Cli::parse_from(["esi-gate", "structure", "1035466617946", "--token", "abc"]);
        assert_eq!(
            cli.command,
            Command::Structure {
                id: 1_035_466_617_946,
                token: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_cli_limits() {
        let cli = Cli::parse_from(["esi-gate", "limits"]);
        assert_eq!(cli.command, Command::Limits);
    }

    #[test]
    fn test_parse_path_arg_trims_whitespace() {
        assert_eq!(parse_path_arg("  /status/ ").unwrap(), "/status/");
    }

    #[test]
    fn test_user_agent_flag_reaches_config() {
        let cli = Cli::parse_from(["esi-gate", "--user-agent", "tool/3.1 (a@b.c)", "status"]);
        assert_eq!(cli.apply(EsiConfig::default()).user_agent, "tool/3.1 (a@b.c)");
    }
}
