use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use roster_core::config::Config;
use roster_core::core_contact::{construct_group, ContactId, GroupId, PermissionLevel};
use roster_core::core_events::ContactEvent;
use roster_core::core_gateway::{RawMember, Session};
use roster_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use roster_core::metrics::init_metrics;
use roster_core::test_utils::{test_session_key, wait_until, MockGateway, TestGroupBuilder};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the moderation scenario against an in-memory server
    Simulate {
        /// Mute duration in seconds
        #[arg(short, long, default_value_t = 60)]
        duration: i64,
    },
    /// Print the effective configuration as TOML
    ShowConfig,
}

const OWNER: u32 = 1;
const ADMIN: u32 = 2;
const MEMBER: u32 = 3;
const NEWCOMER: u32 = 4;
const GROUP: GroupId = GroupId(12_345_678);

fn effective_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    config.validate()?;
    Ok(config)
}

async fn simulate(config: &Config, duration: i64) -> Result<()> {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_group_info(
        GROUP.to_internal_id(),
        TestGroupBuilder::new(OWNER)
            .name("simulation")
            .admin(ADMIN)
            .member(MEMBER)
            .build(),
    );
    info!(group_id = %GROUP, internal_id = %GROUP.to_internal_id(), "Simulated server ready");

    for operator in [OWNER, ADMIN, MEMBER] {
        let session = Session::from_config(
            config,
            ContactId(operator),
            test_session_key(),
            gateway.clone(),
        );
        let group = construct_group(&session, GROUP).await?;
        let me = group.get_member(ContactId(operator))?;

        for target in [OWNER, ADMIN, MEMBER] {
            if target == operator {
                continue;
            }
            let target = group.get_member(ContactId(target))?;
            match target.mute(duration).await {
                Ok(muted) => info!(operator = %me, member = %target, muted, "Mute attempted"),
                Err(e) => warn!(operator = %me, member = %target, error = %e, "Mute failed"),
            }
        }

        session.events().emit(ContactEvent::MemberJoined {
            group_id: GROUP,
            member: RawMember::new(NEWCOMER, PermissionLevel::Member),
        });
        wait_until(Duration::from_secs(1), || group.contains_member(ContactId(NEWCOMER)))
            .await
            .context("Synchronizer did not apply the join")?;
        info!(group = %group, members = group.member_count(), "Join applied from event bus");

        let snapshot = group.refresh().await?;
        info!(group = %group, members = snapshot.members.len(), "Snapshot refreshed from server");

        let quit = group.quit().await?;
        info!(operator = %me, response = ?quit, "Quit requested");

        group.close().await;
    }

    info!(mute_calls = gateway.mute_calls().len(), "Simulation finished");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = effective_config(&args)?;

    let log_config = LogConfig::from_config(&config.logging).unwrap_or_else(|e| {
        eprintln!("{}, using 'info'", e);
        LogConfig::new(LogLevel::Info)
    });
    init_logging_with_config(log_config)?;
    init_metrics();

    match args.command {
        Some(Command::Simulate { duration }) => simulate(&config, duration).await?,
        Some(Command::ShowConfig) => print!("{}", config.to_toml()?),
        None => info!("No command specified. Use --help for usage information."),
    }

    Ok(())
}
