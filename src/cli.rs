use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config_loader::{load_config, LifeLogConfig};
use crate::event_record::{EventSource, RawEvent};
use crate::exporter;
use crate::lifelog_core::LifeLogCore;
use crate::schedule::{spawn_sweeper, DailyTicker};
use crate::web::build_router;

/// Top-level CLI interface for the life log
#[derive(Parser)]
#[command(
    name = "lifelog",
    version,
    about = "Bounded, deduplicated browsing activity log"
)]
pub struct Cli {
    /// Path to a TOML config file (default: ./lifelog.toml)
    #[arg(long, global = true, env = "LIFELOG_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SourceArg {
    History,
    Tab,
}

impl From<SourceArg> for EventSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::History => EventSource::History,
            SourceArg::Tab => EventSource::Tab,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API and run the daily retention sweep
    Serve {
        /// Host/IP to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to bind
        #[arg(long)]
        port: Option<u16>,
    },

    /// Record one visit
    Record {
        #[arg(short, long)]
        url: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long, value_enum, default_value = "history")]
        source: SourceArg,
    },

    /// Show the most recent entries
    Recent {
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Show aggregate statistics
    Stats,

    /// Turn automatic logging on or off
    Toggle {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Show whether logging is enabled
    Status,

    /// Purge entries past the retention threshold now
    Sweep,

    /// Delete every entry
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Export entries as CSV
    Export {
        /// File or directory; defaults to ./life-log-<date>.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

impl Cli {
    pub fn resolve_config(&self) -> anyhow::Result<LifeLogConfig> {
        let mut config = load_config(self.config.as_deref()).context("failed to load config")?;
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        Ok(config)
    }
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let config = cli.resolve_config()?;

    if let Commands::Config = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let core = Arc::new(
        LifeLogCore::open(config)
            .await
            .context("failed to open life log")?,
    );

    match cli.command {
        Commands::Serve { host, port } => {
            let server = &core.config().server;
            let host = host.unwrap_or_else(|| server.host.clone());
            let port = port.unwrap_or(server.port);

            let ticker = DailyTicker::new(core.clock().now(), chrono::Duration::hours(24));
            let sweeps = spawn_sweeper(core.sweeper(), ticker, core.clock());

            let listener = tokio::net::TcpListener::bind((host.as_str(), port))
                .await
                .with_context(|| format!("failed to bind {host}:{port}"))?;
            info!("listening on {}", listener.local_addr()?);
            axum::serve(listener, build_router(Arc::clone(&core)))
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;
            sweeps.abort();
        }
        Commands::Record { url, title, source } => {
            let outcome = core.admit(RawEvent::new(url, title, source.into())).await?;
            println!("{}", outcome.label());
        }
        Commands::Recent { limit } => {
            let limit = limit.unwrap_or(core.config().query.default_recent_limit);
            for entry in core.recent(limit).await? {
                println!(
                    "{}  {:<30}  {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.domain,
                    entry.display_title()
                );
            }
        }
        Commands::Stats => {
            let stats = core.stats().await?;
            println!("today:   {}", stats.today_entries);
            println!("total:   {}", stats.total_entries);
            println!("domains: {}", stats.unique_domains);
            for (rank, d) in stats.top_domains.iter().enumerate() {
                println!("  {}. {} ({})", rank + 1, d.domain, d.count);
            }
        }
        Commands::Toggle { state } => {
            let enabled = core.set_logging(matches!(state, Switch::On)).await?;
            println!("logging {}", if enabled { "enabled" } else { "disabled" });
        }
        Commands::Status => {
            println!(
                "logging {}",
                if core.logging_enabled() { "enabled" } else { "disabled" }
            );
        }
        Commands::Sweep => {
            let report = core.sweep().await?;
            println!("removed {} old entries", report.removed_count);
        }
        Commands::Clear { yes } => {
            if !yes {
                bail!("refusing to delete all entries without --yes");
            }
            core.clear_all().await?;
            println!("all entries deleted");
        }
        Commands::Export { output } => {
            let entries = core.recent(exporter::EXPORT_LIMIT).await?;
            if entries.is_empty() {
                bail!("no entries to export");
            }
            let target = output.unwrap_or_else(|| PathBuf::from("."));
            let path = exporter::export_to_path(&entries, &target, core.clock().now())?;
            println!("exported {} entries to {}", entries.len(), path.display());
        }
        // printed before the store was opened
        Commands::Config => {}
    }

    Ok(())
}
