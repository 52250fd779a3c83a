// OpenSoul Gate - Main Entry Point
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// CLI over the gateway's trust and path decisions.
// Usage:
//   opensoul-gate [--dev | --profile <name>] paths [--json]       # Resolved state/config/oauth paths
//   opensoul-gate check-origin --origin <o> --host <h>           # One-shot origin check
//   opensoul-gate status                                         # Profile, paths, port, allowlist size
//   opensoul-gate format-command "<opensoul ...>"                # Add the active profile flag
//
// --dev / --profile must come before the subcommand; they are folded into
// the environment (OPENSOUL_PROFILE, OPENSOUL_STATE_DIR, ...) before any
// path is resolved.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use opensoul_gate::{
    config::{resolve_gateway_port, OpenSoulConfig},
    env::EnvSnapshot,
    gate::{self, ConnectionRequest},
    paths::{self, HostFs, PathInputs},
    profile,
};

#[derive(Parser)]
#[command(name = "opensoul-gate")]
#[command(author = "Joseph Stone")]
#[command(version)]
#[command(about = "OpenSoul gateway - origin trust checks and state/config path resolution")]
#[command(after_help = "Global profile flags (before the subcommand):\n  --dev              Use the dev profile (~/.opensoul-dev, port 19001)\n  --profile <name>   Use a named profile (~/.opensoul-<name>)")]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print resolved state dir, config path and OAuth locations
    Paths {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// One-shot origin check, exits 1 when the connection would be refused
    CheckOrigin {
        /// Origin header value
        #[arg(long)]
        origin: Option<String>,

        /// Host header value
        #[arg(long)]
        host: Option<String>,

        /// Extra trusted origin on top of gateway.controlUi.allowedOrigins (repeatable)
        #[arg(long = "allow")]
        allow: Vec<String>,
    },

    /// Show gateway status
    Status,

    /// Rewrite an `opensoul ...` command line for the active profile
    FormatCommand {
        command: String,
    },
}

fn main() -> Result<()> {
    let profile_args = profile::parse_profile_args(std::env::args().collect())?;
    let cli = Cli::parse_from(&profile_args.argv);

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).try_init();

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let mut env = EnvSnapshot::from_process();
    if let Some(name) = &profile_args.profile {
        profile::apply_profile_env(name, &mut env, &paths::system_home_dir, &cwd);
    }

    let fs = HostFs;
    let inputs = PathInputs::new(&env, &paths::system_home_dir, &cwd, &fs);
    let resolved = paths::resolve_paths(&inputs);

    match &cli.command {
        Commands::Paths { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else {
                println!("State:  {}", resolved.state_dir.display());
                println!("Config: {}", resolved.config_path.display());
                println!("OAuth:  {}", resolved.oauth_path.display());
                println!("Logs:   {}", resolved.logs_dir.display());
                println!("Token:  {}", resolved.gateway_token_path.display());
            }
        }

        Commands::CheckOrigin { origin, host, allow } => {
            let config = OpenSoulConfig::load(&resolved.config_path)
                .with_context(|| format!("Failed to load config {:?}", resolved.config_path))?;

            let mut allowlist = config.allowed_origins().to_vec();
            allowlist.extend(allow.iter().cloned());

            let request = ConnectionRequest {
                host: host.clone(),
                origin: origin.clone(),
            };
            let decision = gate::process_with(&request, &allowlist);

            println!("{}", serde_json::to_string_pretty(&decision)?);

            if !decision.allowed {
                std::process::exit(1);
            }
        }

        Commands::Status => {
            let config = OpenSoulConfig::load(&resolved.config_path)
                .with_context(|| format!("Failed to load config {:?}", resolved.config_path))?;

            println!("OpenSoul Gate v{}", env!("CARGO_PKG_VERSION"));
            println!("Profile: {}", inputs.profile_name().unwrap_or("default"));
            println!();
            println!("State:   {}", resolved.state_dir.display());
            println!("Config:  {}{}", resolved.config_path.display(),
                if resolved.config_path.exists() { "" } else { " (missing)" });
            println!("OAuth:   {}", resolved.oauth_path.display());
            println!();
            println!("Gateway port: {}", resolve_gateway_port(&env, &config));
            println!("Bind:         {:?}", config.gateway.bind);
            println!("Trusted origins: {} configured (+ same-host, loopback, desktop)",
                config.allowed_origins().len());
        }

        Commands::FormatCommand { command } => {
            println!("{}", profile::format_cli_command(command, &env));
        }
    }

    Ok(())
}
