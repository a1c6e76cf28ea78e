//! rasctl - Remote Access VPN control CLI
//!
//! Creates IKEv2/EAP VPN profiles in a phone book, dials them and reports
//! their state

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use librasctl::ras::{default_service, LinkStatus, RasManager};
use librasctl::{RasctlConfig, RasctlError};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "rasctl")]
#[command(about = "Remote access VPN control - create, dial and monitor IKEv2 profiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Phone book file (overrides the configured one)
    #[arg(short, long, global = true)]
    phonebook: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format: text, json
    #[arg(short = 'o', long, default_value = "text", global = true)]
    output: String,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or overwrite a VPN profile
    Create {
        name: String,
        server: String,
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        secret: String,
    },
    /// Delete a VPN profile (entries live in their phone book file)
    Delete,
    /// Dial a VPN profile
    Connect {
        name: String,
        /// Wait until the connection is up
        #[arg(short, long)]
        wait: bool,
    },
    /// Hang up a VPN connection
    Disconnect { name: String },
    /// Connection status (exit 0 connected, 1 not connected, 2 query error)
    Status { name: String },
    /// Show stored profile properties
    Show { name: String },
    /// List active connections
    List,
    /// Translate a remote access error code
    Error { code: u32 },
    /// Print the effective profile policy
    Policy,
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.verbose {
        "debug"
    } else {
        &cli.log_level
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rasctl={},librasctl={}", log_level, log_level)));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<RasctlConfig> {
    match &cli.config {
        Some(path) => RasctlConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(RasctlConfig::default()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("JSON serialization error")?);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> Result<i32> {
    let config = load_config(cli)?;
    let phonebook = cli.phonebook.clone().unwrap_or_else(|| config.phonebook.clone());
    let manager = RasManager::new(default_service(), config.policy.clone());
    let json = cli.output == "json";

    match &cli.command {
        Commands::Create { name, server, username, secret } => {
            let created = manager
                .create_profile(name, server, username, secret, &phonebook)
                .await
                .with_context(|| format!("Failed to create profile '{}'", name))?;

            if json {
                print_json(&created.profile)?;
            } else {
                println!("Profile '{}' written to {}", name, phonebook.display());
            }
            if let Some(e) = &created.credential_error {
                eprintln!("Warning: EAP credentials were not stored: {}", e);
            }
        }
        Commands::Delete => {
            manager.delete_profile()?;
            println!("Nothing to delete: remove the entry from its phone book file");
        }
        Commands::Connect { name, wait } => {
            let handle = manager
                .connect(name, &phonebook)
                .await
                .with_context(|| format!("Failed to connect '{}'", name))?;
            println!("Dialing '{}' (handle {})", name, handle);

            if *wait {
                manager
                    .wait_for_connected(name, config.wait.timeout(), config.wait.poll_interval())
                    .await
                    .with_context(|| format!("'{}' did not come up", name))?;
                println!("'{}' connected", name);
            }
        }
        Commands::Disconnect { name } => {
            manager
                .disconnect(name)
                .await
                .with_context(|| format!("Failed to disconnect '{}'", name))?;
            println!("Hang-up requested for '{}'", name);
        }
        Commands::Status { name } => {
            let status = match manager.status(name).await {
                Ok(status) => status,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return Ok(2);
                }
            };

            if json {
                print_json(&serde_json::json!({ "name": name, "status": status }))?;
            } else {
                println!("{}: {}", name, status);
            }
            return Ok(match status {
                LinkStatus::Connected => 0,
                LinkStatus::NotConnected => 1,
            });
        }
        Commands::Show { name } => {
            let profile = manager
                .read_profile(name, &phonebook)
                .await
                .with_context(|| format!("Failed to read profile '{}'", name))?;

            if json {
                print_json(&profile)?;
            } else {
                println!("Profile: {}", profile.name);
                println!("  Server: {}", profile.server_address);
                println!("  Device: {} ({})", profile.device_name, profile.device_type);
                println!("  Strategy: {}", profile.strategy);
                println!("  Protocols: {:?}", profile.network_protocols);
                println!("  Options: {:?}", profile.security_options);
                println!("  Additional options: {:?}", profile.entry_options);
                println!(
                    "  Redial: {} times, {}s pause",
                    profile.redial.count, profile.redial.pause_seconds
                );
            }
        }
        Commands::List => {
            let connections = manager.active_connections().await.context("Failed to list connections")?;

            if json {
                print_json(&connections)?;
            } else if connections.is_empty() {
                println!("No active connections");
            } else {
                println!("{:<32} {:<12} DEVICE", "NAME", "HANDLE");
                for connection in connections {
                    println!(
                        "{:<32} {:<12} {}",
                        connection.entry_name,
                        connection.handle.to_string(),
                        connection.device_name
                    );
                }
            }
        }
        Commands::Error { code } => match manager.describe_error(*code) {
            Some(text) => println!("{}: {}", code, text),
            None => {
                eprintln!("Error: {}", RasctlError::platform("Error lookup", *code, None));
                return Ok(1);
            }
        },
        Commands::Policy => {
            if json {
                print_json(manager.policy())?;
            } else {
                print!("{}", toml::to_string_pretty(manager.policy()).context("TOML serialization error")?);
            }
        }
    }

    Ok(0)
}
