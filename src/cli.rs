//! Command-line interface for esi-gate
//!
//! Global flags override the `ESI_*` environment configuration; each
//! subcommand maps onto one typed accessor and prints its result as JSON.

use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;

use crate::cache::CacheBackend;
use crate::config::EsiConfig;
use crate::error::EsiError;
use crate::esi::EsiClient;
use crate::retry::RequestContext;

/// Error types for the command-line front end
#[derive(Debug, Error)]
pub enum CliError {
    /// The raw path is empty or names a full URL
    #[error("Invalid path: '{0}'. Expected an API path such as /status/")]
    InvalidPath(String),

    /// The upstream call behind a command failed
    #[error(transparent)]
    Esi(#[from] EsiError),

    /// A result could not be rendered as JSON
    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// esi-gate - cached, budget-aware access to the EVE Swagger Interface
#[derive(Parser, Debug)]
#[command(name = "esi-gate")]
#[command(about = "Cached, retrying ESI client with error-budget tracking")]
#[command(version)]
pub struct Cli {
    /// Use a shared Redis cache instead of process memory
    #[arg(long, global = true, env = "ESI_REDIS_URL", value_name = "URL")]
    pub redis_url: Option<String>,

    /// Compliance User-Agent, e.g. "myapp/1.0 (me@example.org)"
    #[arg(long, global = true, value_name = "UA")]
    pub user_agent: Option<String>,

    /// Upstream base URL including the version segment
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Server status
    Status,
    /// Public character information
    Character { id: i64 },
    /// Public corporation information
    Corporation { id: i64 },
    /// Public alliance information and member corporations
    Alliance { id: i64 },
    /// A killmail by ID and hash
    Killmail { id: i64, hash: String },
    /// Every asset page of a character
    Assets {
        character_id: i64,
        #[arg(long, env = "ESI_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// A player-owned structure
    Structure {
        id: i64,
        #[arg(long, env = "ESI_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Raw JSON for any path
    Get {
        #[arg(value_parser = parse_path_arg)]
        path: String,
        #[arg(long, env = "ESI_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Current error budget after a status request
    Limits,
}

/// Normalizes a raw API path, adding the leading slash if missing.
///
/// # Arguments
/// * `s` - The path argument from the command line
///
/// # Returns
/// * `Ok(String)` with a leading `/`
/// * `Err(CliError::InvalidPath)` if the path is empty or a full URL
pub fn parse_path_arg(s: &str) -> Result<String, CliError> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed.contains("://") {
        return Err(CliError::InvalidPath(s.to_string()));
    }
    if trimmed.starts_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("/{trimmed}"))
    }
}

impl Cli {
    /// Applies flag overrides on top of `config`
    pub fn apply(&self, mut config: EsiConfig) -> EsiConfig {
        if let Some(url) = self.redis_url.as_ref().filter(|u| !u.is_empty()) {
            config.cache = CacheBackend::Redis { url: url.clone() };
        }
        if let Some(agent) = &self.user_agent {
            config.user_agent = agent.clone();
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        config
    }
}

#[derive(Debug, Serialize)]
struct AllianceReport<A, C> {
    alliance: A,
    corporations: C,
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, CliError> {
    Ok(serde_json::to_value(value)?)
}

/// Runs one command against `client`.
///
/// # Arguments
/// * `client` - The configured ESI client
/// * `ctx` - Cancellation and caller identity for every request the command makes
/// * `command` - The parsed subcommand
///
/// # Returns
/// * `Ok(Value)` with the JSON to print
/// * `Err(CliError::Esi)` if an upstream call fails
/// * `Err(CliError::Output)` if the result cannot be rendered
pub async fn execute(
    client: &EsiClient,
    ctx: &RequestContext,
    command: &Command,
) -> Result<serde_json::Value, CliError> {
    match command {
        Command::Status => to_json(&client.get_status_with_cache(ctx).await?),
        Command::Character { id } => to_json(&client.get_character_with_cache(ctx, *id).await?),
        Command::Corporation { id } => {
            to_json(&client.get_corporation_with_cache(ctx, *id).await?)
        }
        Command::Alliance { id } => {
            let (alliance, corporations) = futures::try_join!(
                client.get_alliance_with_cache(ctx, *id),
                client.get_alliance_corporations_with_cache(ctx, *id),
            )?;
            to_json(&AllianceReport {
                alliance,
                corporations,
            })
        }
        Command::Killmail { id, hash } => {
            to_json(&client.get_killmail_with_cache(ctx, *id, hash).await?)
        }
        Command::Assets {
            character_id,
            token,
        } => to_json(
            &client
                .get_character_assets_with_cache(ctx, *character_id, token)
                .await?,
        ),
        Command::Structure { id, token } => {
            to_json(&client.get_structure_with_cache(ctx, *id, token).await?)
        }
        Command::Get { path, token } => {
            to_json(&client.get_raw(ctx, path, token.as_deref()).await?)
        }
        Command::Limits => {
            client.get_status(ctx).await?;
            to_json(&client.error_limits())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_arg_keeps_leading_slash() {
        assert_eq!(parse_path_arg("/status/").unwrap(), "/status/");
    }

    #[test]
    fn test_parse_path_arg_adds_leading_slash() {
        assert_eq!(parse_path_arg("universe/types/587/").unwrap(), "/universe/types/587/");
    }

    #[test]
    fn test_parse_path_arg_rejects_urls_and_empty() {
        let err = parse_path_arg("https://esi.evetech.net/latest/status/").unwrap_err();
        assert!(err.to_string().contains("Invalid path"));
        assert!(parse_path_arg("   ").is_err());
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from(["esi-gate", "status"]);
        assert_eq!(cli.command, Command::Status);
        assert!(!cli.json_logs);
    }

    #[test]
    fn test_cli_parse_killmail() {
        let cli = Cli::parse_from(["esi-gate", "killmail", "113456789", "0a1b2c"]);
        assert_eq!(
            cli.command,
            Command::Killmail {
                id: 113_456_789,
                hash: "0a1b2c".to_string()
            }
        );
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "esi-gate",
            "character",
            "90000001",
            "--base-url",
            "http://localhost:8080/latest",
            "--json-logs",
        ]);
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:8080/latest"));
        assert!(cli.json_logs);
    }

    #[test]
    fn test_cli_get_normalizes_path() {
        let cli = Cli::parse_from(["esi-gate", "get", "status/"]);
        assert_eq!(
            cli.command,
            Command::Get {
                path: "/status/".to_string(),
                token: None
            }
        );
    }

    #[test]
    fn test_cli_assets_takes_token_flag() {
        let cli = Cli::parse_from(["esi-gate", "assets", "90000001", "--token", "sso"]);
        assert_eq!(
            cli.command,
            Command::Assets {
                character_id: 90_000_001,
                token: "sso".to_string()
            }
        );
    }

    #[test]
    fn test_to_json_failure_is_an_output_error() {
        let mut bad = std::collections::HashMap::new();
        bad.insert((1, 2), "tuple keys are not valid JSON object keys");

        let err = to_json(&bad).unwrap_err();

        assert!(matches!(err, CliError::Output(_)));
        assert!(err.to_string().starts_with("Failed to render output"));
    }

    #[test]
    fn test_upstream_errors_pass_through_unchanged() {
        let err = CliError::from(EsiError::Cancelled);

        assert!(matches!(err, CliError::Esi(EsiError::Cancelled)));
        assert_eq!(err.to_string(), "Request cancelled");
    }

    #[test]
    fn test_apply_overrides_config() {
        let cli = Cli::parse_from([
            "esi-gate",
            "--redis-url",
            "redis://127.0.0.1:6379",
            "--user-agent",
            "scanner/2.0 (ops@example.org)",
            "status",
        ]);

        let config = cli.apply(EsiConfig::default());

        assert_eq!(
            config.cache,
            CacheBackend::Redis {
                url: "redis://127.0.0.1:6379".to_string()
            }
        );
        assert_eq!(config.user_agent, "scanner/2.0 (ops@example.org)");
        assert_eq!(config.base_url, crate::config::DEFAULT_BASE_URL);
    }

    #[test]
    fn test_apply_without_flags_keeps_config() {
        let cli = Cli {
            redis_url: None,
            ..Cli::parse_from(["esi-gate", "status"])
        };

        assert_eq!(cli.apply(EsiConfig::default()), EsiConfig::default());
    }
}
