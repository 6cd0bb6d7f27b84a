use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use devwatch::api::{DeviceApi, HttpClient};
use devwatch::cli::{self, OutputFormat};
use devwatch::pages::StatusFilter;
use devwatch::report::{DateRange, ReportKind};
use devwatch::{config, logging, web};

#[derive(Debug, Parser)]
#[command(name = "devwatch")]
#[command(about = "Dashboard and reports for a fleet of monitored devices")]
#[command(version)]
struct App {
    /// Override the monitoring server base URL (e.g. http://localhost:5000)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the web dashboard
    Serve {
        /// Listen address (default: server.bind_addr from config)
        #[arg(long)]
        addr: Option<String>,
    },
    /// List registered devices
    Devices {
        /// Case-insensitive match on hostname, device id or platform
        #[arg(long)]
        search: Option<String>,
        /// Status filter: all (default), active, inactive
        #[arg(long, default_value = "all")]
        filter: String,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show one device: info, current stats, power events and history
    Device {
        /// Device identifier
        id: String,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Generate a report: usage, uptime, events, performance
    Report {
        /// Report type
        kind: String,
        /// Date range: today, week (default), month, all
        #[arg(long, default_value = "week")]
        range: String,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Fleet headline numbers: total uptime, average session, most active, power events
    QuickStats {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Print a live fleet summary until Enter is pressed
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value = "30")]
        interval: u64,
    },
    /// Check configuration and monitoring server reachability
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective configuration and its sources
    Show,
    /// Write a default config to ~/.devwatch/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set one value, e.g. `general.api_base_url http://host:5000`
    Set { key: String, value: String },
    /// Restore the global config file to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    let loaded = config::load();
    let mut cfg = loaded.config.clone();
    if let Some(url) = app.api_url {
        cfg.general.api_base_url = url;
    }
    logging::init(&cfg.logging);
    loaded.log_warnings();

    let api = || HttpClient::from_config(&cfg.general);

    match app.command {
        Commands::Serve { addr } => web::serve(&cfg, addr.as_deref()),
        Commands::Devices {
            search,
            filter,
            format,
        } => {
            let filter: StatusFilter = filter.parse()?;
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_devices(&api(), search.as_deref(), filter, fmt)
        }
        Commands::Device { id, format } => {
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_device(&api(), &id, &cfg, fmt)
        }
        Commands::Report {
            kind,
            range,
            format,
        } => {
            let kind: ReportKind = kind.parse()?;
            let range: DateRange = range.parse()?;
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_report(&api(), kind, range, &cfg, fmt)
        }
        Commands::QuickStats { format } => {
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_quick_stats(&api(), &cfg, fmt)
        }
        Commands::Watch { interval } => {
            let client: Arc<dyn DeviceApi> = Arc::new(api());
            cli::run_watch(client, Duration::from_secs(interval.max(1)))
        }
        Commands::Health => cli::run_health(&api(), &cfg),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
