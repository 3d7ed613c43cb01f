use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gcp_interconnect::config::Config;
use gcp_interconnect::error::describe_error;
use gcp_interconnect::gcp::auth::{GcpCredentials, StaticToken, TokenSource};
use gcp_interconnect::gcp::client::{InterconnectClient, WaitOptions};
use gcp_interconnect::gcp::http::GcpHttpClient;
use gcp_interconnect::gcp::transport::{ComputeTransport, RestTransport};
use gcp_interconnect::Operation;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Manage GCP Cloud Interconnects and partner attachments
#[derive(Parser, Debug)]
#[command(name = "gcp-interconnect", version, about, long_about = None)]
struct Args {
    /// GCP project to use
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// GCP region for attachments
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Compute API base URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Use this OAuth2 access token instead of ambient credentials
    #[arg(long, global = true)]
    access_token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60, global = true)]
    timeout_secs: u64,

    /// Remember project and region for later runs
    #[arg(long, global = true)]
    save: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List interconnects in the project
    Interconnects,
    /// List attachments in the region
    Attachments,
    /// Show one attachment
    Get { attachment: String },
    /// Look up an interconnect by exact name
    FindInterconnect { name: String },
    /// Look up an attachment by exact name
    FindAttachment { name: String },
    /// Delete an attachment
    Delete {
        attachment: String,
        /// Wait for the delete operation to finish
        #[arg(long)]
        wait: bool,
    },
    /// Create a PARTNER_PROVIDER attachment
    Create {
        /// Pairing key handed out by the partner
        #[arg(long)]
        pairing_key: String,
        /// Attachment name
        #[arg(long)]
        name: String,
        /// Bandwidth, e.g. BPS_1G
        #[arg(long)]
        bandwidth: String,
        /// Interconnect to attach to
        #[arg(long)]
        interconnect: String,
        /// 802.1Q VLAN tag
        #[arg(long)]
        vlan: u16,
        /// Partner metadata as key=value (interconnect_name, partner_name, portal_url)
        #[arg(long = "metadata", value_name = "KEY=VALUE", required = true)]
        metadata: Vec<String>,
        /// Wait for the insert operation to finish
        #[arg(long)]
        wait: bool,
    },
    /// Wait for a regional operation to finish
    Wait {
        operation: String,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gcp-interconnect started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gcp-interconnect").join("gcp-interconnect.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".gcp-interconnect").join("gcp-interconnect.log");
    }
    PathBuf::from("gcp-interconnect.log")
}

/// Split `key=value` arguments
fn parse_metadata(entries: &[String]) -> Result<Vec<(String, String)>> {
    entries
        .iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .with_context(|| format!("Expected KEY=VALUE, got '{}'", entry))
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        },
    };

    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            match err.downcast_ref::<gcp_interconnect::Error>() {
                Some(api_err) => eprintln!("Error: {}", describe_error(api_err)),
                None => eprintln!("Error: {err:#}"),
            }
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let mut config = Config::load();

    let project = args
        .project
        .clone()
        .or_else(|| config.effective_project())
        .context("No GCP project configured. Set GOOGLE_CLOUD_PROJECT or use --project")?;
    let region = args
        .region
        .clone()
        .unwrap_or_else(|| config.effective_region());
    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| config.effective_endpoint());

    tracing::info!("Using project: {}, region: {}, endpoint: {}", project, region, endpoint);

    if args.save {
        config
            .remember(&project, &region)
            .context("Failed to save configuration")?;
    }

    let credentials: Arc<dyn TokenSource> = match args.access_token {
        Some(token) => Arc::new(StaticToken::new(token)),
        None => Arc::new(GcpCredentials::from_environment().await?),
    };
    let http = GcpHttpClient::with_timeout(Duration::from_secs(args.timeout_secs))?;
    let transport = RestTransport::with_endpoint(credentials, &endpoint)?.with_http(http);
    let client = InterconnectClient::new(&project, &region, transport);

    match args.command {
        Command::Interconnects => print_json(&client.list_interconnects().await?)?,
        Command::Attachments => print_json(&client.list_attachments().await?)?,
        Command::Get { attachment } => print_json(&client.get_attachment(&attachment).await?)?,
        Command::FindInterconnect { name } => match client.find_interconnect_by_name(&name).await? {
            Some(interconnect) => print_json(&interconnect)?,
            None => {
                eprintln!("No interconnect named '{}'", name);
                return Ok(ExitCode::FAILURE);
            },
        },
        Command::FindAttachment { name } => match client.find_attachment_by_name(&name).await? {
            Some(attachment) => print_json(&attachment)?,
            None => {
                eprintln!("No attachment named '{}' in {}", name, region);
                return Ok(ExitCode::FAILURE);
            },
        },
        Command::Delete { attachment, wait } => {
            let operation = client.delete_attachment(&attachment).await?;
            finish(&client, operation, wait).await?;
        },
        Command::Create {
            pairing_key,
            name,
            bandwidth,
            interconnect,
            vlan,
            metadata,
            wait,
        } => {
            let metadata = parse_metadata(&metadata)?;
            let created = client
                .create_partner_attachment(
                    &pairing_key,
                    &name,
                    &bandwidth,
                    &interconnect,
                    vlan,
                    metadata,
                )
                .await?;
            match created {
                Some(operation) => finish(&client, operation, wait).await?,
                None => {
                    eprintln!("Interconnect '{}' not found, nothing created", interconnect);
                    return Ok(ExitCode::FAILURE);
                },
            }
        },
        Command::Wait { operation, timeout } => {
            let current = client
                .transport()
                .get_operation(&project, &region, &operation)
                .await?;
            let options = WaitOptions {
                timeout: Duration::from_secs(timeout),
                ..Default::default()
            };
            print_json(&client.wait_for_operation(&current, options).await?)?;
        },
    }

    Ok(ExitCode::SUCCESS)
}

/// Print the operation, optionally after waiting for it
async fn finish(
    client: &InterconnectClient<RestTransport>,
    operation: Operation,
    wait: bool,
) -> Result<()> {
    let operation = if wait {
        client
            .wait_for_operation(&operation, WaitOptions::default())
            .await?
    } else {
        operation
    };
    print_json(&operation)
}
