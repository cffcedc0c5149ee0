use std::path::{Path, PathBuf};

use acecloud_provider::{ProviderConfig, ResourceData, ResourceKind};
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

/// Drive AceCloud resources through their lifecycle from the command line.
///
/// Resource state lives in a JSON file that is read before and rewritten
/// after every command.
#[derive(Parser, Debug)]
#[command(name = "acecloud", version, about, long_about = None)]
struct Cli {
    /// JSON file with provider settings (api_endpoint, api_key, region,
    /// project_id). Anything missing falls back to ACECLOUD_* env vars.
    #[arg(long, global = true)]
    provider: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the resource described by --config
    Create {
        #[command(flatten)]
        target: Target,
        /// JSON file with the resource attributes
        #[arg(long)]
        config: PathBuf,
    },
    /// Refresh computed attributes
    Read {
        #[command(flatten)]
        target: Target,
    },
    /// Apply a changed configuration
    Update {
        #[command(flatten)]
        target: Target,
        /// JSON file with the new resource attributes
        #[arg(long)]
        config: PathBuf,
    },
    /// Destroy the resource
    Delete {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Args, Debug)]
struct Target {
    /// Resource type: acecloud_vm or acecloud_key_pair
    #[arg(long)]
    kind: ResourceKind,

    /// State file for this resource
    #[arg(long)]
    state: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let provider_config = match &cli.provider {
        Some(path) => ProviderConfig::from_attributes(&read_object(path)?)?,
        None => ProviderConfig::from_env()?,
    };
    let registry = acecloud_provider::configure(&provider_config)?;

    match cli.command {
        Command::Create { target, config } => {
            if target.state.exists() && load_state(&target.state)?.id().is_some() {
                bail!(
                    "{} already tracks a {}; delete it first",
                    target.state.display(),
                    target.kind
                );
            }
            let mut data = ResourceData::new(read_object(&config)?);
            registry.resource(target.kind)?.create(&mut data).await?;
            save_state(&target.state, &data)?;
        }
        Command::Read { target } => {
            let mut data = load_state(&target.state)?;
            registry.resource(target.kind)?.read(&mut data).await?;
            if data.id().is_none() {
                tracing::warn!(kind = %target.kind, "resource is gone; state cleared");
            }
            save_state(&target.state, &data)?;
        }
        Command::Update { target, config } => {
            let mut data = load_state(&target.state)?;
            data.plan(read_object(&config)?);
            registry.resource(target.kind)?.update(&mut data).await?;
            save_state(&target.state, &data)?;
        }
        Command::Delete { target } => {
            let mut data = load_state(&target.state)?;
            registry.resource(target.kind)?.delete(&mut data).await?;
            save_state(&target.state, &data)?;
        }
    }

    Ok(())
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("{} must contain a JSON object", path.display()),
    }
}

fn load_state(path: &Path) -> Result<ResourceData> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read state {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("corrupt state file {}", path.display()))
}

fn save_state(path: &Path, data: &ResourceData) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json + "\n")
        .with_context(|| format!("failed to write state {}", path.display()))?;
    tracing::info!(state = %path.display(), id = ?data.id(), "state saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_update() {
        let cli = Cli::try_parse_from([
            "acecloud",
            "update",
            "--kind",
            "acecloud_vm",
            "--state",
            "vm.json",
            "--config",
            "vm.tf.json",
        ])
        .unwrap();
        match cli.command {
            Command::Update { target, config } => {
                assert_eq!(target.kind, ResourceKind::Vm);
                assert_eq!(config, PathBuf::from("vm.tf.json"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(
            Cli::try_parse_from(["acecloud", "read", "--kind", "acecloud_volume", "--state", "x"])
                .is_err()
        );
    }
}
