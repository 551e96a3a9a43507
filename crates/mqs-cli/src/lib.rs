//! # MQS CLI
//!
//! Command-line interface for the MQS message queue service.
//!
//! This module provides CLI commands for:
//! - Sending, peeking, deleting and re-hiding messages
//! - Continuous consumption through the receive worker pool
//! - Queue administration (create, update, inspect, delete, list)
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. the file given by `--config` or `MQS_CONFIG` (TOML, JSON or YAML)
//! 3. environment variables prefixed `MQS__`, e.g.
//!    `MQS__CLIENT__ENDPOINT=http://1234.mqs-cn-hangzhou.aliyuncs.com`
//! 4. command-line flags

use clap::{CommandFactory, Parser, Subcommand};
use mqs_client::{
    ClientConfig, ErrorKind, ListQueuesOptions, Location, MessageReceiveResponse,
    MessageSendRequest, MqsClient, MqsError, MqsQueue, QueueAttributeResponse, QueueAttributes,
    QueueCreation, QueueManager, QueueName, Queues, ReceiptHandle, ReceiveOutputs,
    ReceiveWorkerPool, WorkerPoolConfig,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// CLI Structure
// ============================================================================

/// MQS CLI - send, receive and administer MQS queues
#[derive(Parser)]
#[command(name = "mqs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Client for the MQS message queue service")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MQS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level or filter directive
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Service endpoint, overrides configuration
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Access key id, overrides configuration
    #[arg(long)]
    pub access_key_id: Option<String>,

    /// Access key secret, overrides configuration
    #[arg(long)]
    pub access_key_secret: Option<String>,

    /// HTTP proxy for all requests, overrides configuration
    #[arg(long)]
    pub proxy: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Send a message
    Send {
        /// Queue name
        queue: QueueName,

        /// Message body
        body: String,

        /// Seconds before the message becomes visible
        #[arg(long, default_value_t = 0)]
        delay_seconds: u32,

        /// Message priority
        #[arg(long, default_value_t = MessageSendRequest::DEFAULT_PRIORITY)]
        priority: u32,
    },

    /// Receive messages continuously until interrupted
    Receive {
        /// Queue name
        queue: QueueName,

        /// Number of concurrent long-poll workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Long-poll wait per request, 0-30 seconds
        #[arg(long)]
        wait_seconds: Option<u32>,

        /// Receive up to this many messages per request, 1-16
        #[arg(long)]
        batch_size: Option<u32>,

        /// Delete each message after printing it
        #[arg(long)]
        delete: bool,

        /// Stop after this many messages, at least 1
        #[arg(short = 'n', long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        limit: Option<usize>,
    },

    /// Show the next message without changing its visibility
    Peek {
        /// Queue name
        queue: QueueName,
    },

    /// Delete a received message
    Delete {
        /// Queue name
        queue: QueueName,

        /// Receipt handle of the delivery
        receipt_handle: String,
    },

    /// Hide a received message for a number of seconds
    ChangeVisibility {
        /// Queue name
        queue: QueueName,

        /// Receipt handle of the delivery
        receipt_handle: String,

        /// New visibility timeout, 1-43200 seconds
        seconds: u32,
    },

    /// Queue administration commands
    Queue {
        /// Owner account id, overrides configuration
        #[arg(long)]
        owner_id: Option<String>,

        /// Region: beijing, hangzhou or qingdao, overrides configuration
        #[arg(long)]
        location: Option<Location>,

        #[command(subcommand)]
        action: QueueCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

// ============================================================================
// Queue Commands
// ============================================================================

/// Queue administration subcommands
#[derive(Subcommand)]
pub enum QueueCommands {
    /// Create a queue
    Create {
        /// Queue name
        name: QueueName,

        #[command(flatten)]
        attributes: QueueAttributeArgs,
    },

    /// Overwrite the attributes of a queue
    Set {
        /// Queue name
        name: QueueName,

        #[command(flatten)]
        attributes: QueueAttributeArgs,
    },

    /// Show queue attributes
    Get {
        /// Queue name
        name: QueueName,
    },

    /// Delete a queue
    Delete {
        /// Queue name
        name: QueueName,
    },

    /// List queues
    List {
        /// Continue after this marker
        #[arg(long)]
        marker: Option<String>,

        /// Page size, 1-1000
        #[arg(long)]
        ret_number: Option<u32>,

        /// Only list queues with this name prefix
        #[arg(long)]
        prefix: Option<String>,
    },
}

/// Queue attributes accepted by `queue create` and `queue set`
#[derive(Debug, Clone, PartialEq, Eq, clap::Args)]
pub struct QueueAttributeArgs {
    /// Default delivery delay, 0-60480 seconds
    #[arg(long, default_value_t = 0)]
    pub delay_seconds: u32,

    /// Maximum message size, 1024-65536 bytes
    #[arg(long, default_value_t = 65536)]
    pub max_message_size: u32,

    /// Message retention, 60-129600 seconds
    #[arg(long, default_value_t = 129600)]
    pub message_retention_period: u32,

    /// Visibility timeout, 1-43200 seconds
    #[arg(long, default_value_t = 30)]
    pub visibility_timeout: u32,

    /// Default long-poll wait, 0-30 seconds
    #[arg(long, default_value_t = 0)]
    pub polling_wait_seconds: u32,
}

impl From<&QueueAttributeArgs> for QueueAttributes {
    fn from(args: &QueueAttributeArgs) -> Self {
        Self {
            delay_seconds: args.delay_seconds,
            max_message_size: args.max_message_size,
            message_retention_period: args.message_retention_period,
            visibility_timeout: args.visibility_timeout,
            polling_wait_seconds: args.polling_wait_seconds,
        }
    }
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("MQS error: {0}")]
    Mqs(#[from] MqsError),

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("Command failed: {message}")]
    CommandFailed { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output formatting failed: {0}")]
    Output(#[from] serde_json::Error),
}

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Missing required configuration: {key}")]
    MissingRequired { key: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

// ============================================================================
// Configuration Types
// ============================================================================

/// CLI configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Connection settings
    pub client: ClientConfig,

    /// Defaults for `queue` commands
    pub queue_manager: QueueManagerSettings,

    /// Defaults for `receive`
    pub receive: ReceiveSettings,
}

/// Owner and region used by queue administration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueueManagerSettings {
    pub owner_id: Option<String>,
    pub location: Option<String>,
}

/// Worker pool defaults for `receive`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReceiveSettings {
    pub workers: usize,
    pub wait_seconds: Option<u32>,
    pub channel_capacity: usize,
    pub stop_timeout_seconds: u64,
}

impl Default for ReceiveSettings {
    fn default() -> Self {
        Self {
            workers: mqs_client::worker_pool::DEFAULT_WORKERS,
            wait_seconds: None,
            channel_capacity: 16,
            stop_timeout_seconds: mqs_client::worker_pool::DEFAULT_STOP_TIMEOUT.as_secs(),
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    run(cli).await
}

/// Execute a parsed command line
pub async fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Completions { shell } = &cli.command {
        return execute_completions_command(*shell);
    }

    let mut config = load_configuration(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);

    let format = cli.format;
    match cli.command {
        Commands::Send {
            queue,
            body,
            delay_seconds,
            priority,
        } => {
            let request = MessageSendRequest::new(body)
                .with_delay_seconds(delay_seconds)
                .with_priority(priority);
            execute_send_command(&config, queue, request, format).await
        }
        Commands::Receive {
            queue,
            workers,
            wait_seconds,
            batch_size,
            delete,
            limit,
        } => {
            let pool_config = WorkerPoolConfig {
                workers: workers.unwrap_or(config.receive.workers),
                wait_seconds: wait_seconds.or(config.receive.wait_seconds),
                batch_size,
                stop_timeout: Duration::from_secs(config.receive.stop_timeout_seconds),
            };
            execute_receive_command(&config, queue, pool_config, delete, limit, format).await
        }
        Commands::Peek { queue } => execute_peek_command(&config, queue, format).await,
        Commands::Delete {
            queue,
            receipt_handle,
        } => execute_delete_command(&config, queue, ReceiptHandle::new(receipt_handle)).await,
        Commands::ChangeVisibility {
            queue,
            receipt_handle,
            seconds,
        } => {
            execute_change_visibility_command(
                &config,
                queue,
                ReceiptHandle::new(receipt_handle),
                seconds,
                format,
            )
            .await
        }
        Commands::Queue {
            owner_id,
            location,
            action,
        } => {
            if let Some(owner_id) = owner_id {
                config.queue_manager.owner_id = Some(owner_id);
            }
            if let Some(location) = location {
                config.queue_manager.location = Some(location.to_string());
            }
            execute_queue_command(&config, action, format).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}

// ============================================================================
// Setup
// ============================================================================

/// Initialize logging based on CLI arguments.
///
/// `RUST_LOG` takes precedence over `--log-level`. Logs go to stderr so that
/// command output on stdout stays machine readable.
pub fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .map_err(|e| CliError::InvalidArgument {
            arg: "log-level".to_string(),
            message: e.to_string(),
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if cli.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| CliError::CommandFailed {
        message: format!("Failed to initialize logging: {}", e),
    })
}

/// Load configuration from an optional file and `MQS__` environment variables
pub fn load_configuration(config_path: Option<&Path>) -> Result<CliConfig, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = config_path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        info!(path = %path.display(), "Loading configuration file");
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let settings = builder
        .add_source(config::Environment::with_prefix("MQS").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Apply command-line connection flags on top of loaded configuration
pub fn apply_overrides(config: &mut CliConfig, cli: &Cli) {
    if let Some(endpoint) = &cli.endpoint {
        config.client.endpoint = endpoint.clone();
    }
    if let Some(access_key_id) = &cli.access_key_id {
        config.client.access_key_id = access_key_id.clone();
    }
    if let Some(access_key_secret) = &cli.access_key_secret {
        config.client.access_key_secret = access_key_secret.clone();
    }
    if let Some(proxy) = &cli.proxy {
        config.client.proxy = Some(proxy.clone());
    }
}

fn open_queue(config: &CliConfig, queue: QueueName) -> Result<MqsQueue, CliError> {
    let client = MqsClient::new(&config.client)?;
    Ok(MqsQueue::new(queue, Arc::new(client)))
}

/// Resolve owner id and region for queue administration
pub fn queue_manager_target(config: &CliConfig) -> Result<(String, Location), ConfigError> {
    let owner_id = config
        .queue_manager
        .owner_id
        .as_deref()
        .map(str::trim)
        .filter(|owner_id| !owner_id.is_empty())
        .ok_or_else(|| ConfigError::MissingRequired {
            key: "queue_manager.owner_id".to_string(),
        })?;

    let location = config
        .queue_manager
        .location
        .as_deref()
        .ok_or_else(|| ConfigError::MissingRequired {
            key: "queue_manager.location".to_string(),
        })?
        .parse::<Location>()
        .map_err(|e| ConfigError::InvalidValue {
            key: "queue_manager.location".to_string(),
            message: e.to_string(),
        })?;

    Ok((owner_id.to_string(), location))
}

// ============================================================================
// Message Commands
// ============================================================================

async fn execute_send_command(
    config: &CliConfig,
    queue: QueueName,
    request: MessageSendRequest,
    format: OutputFormat,
) -> Result<(), CliError> {
    info!(queue = %queue, delay_seconds = request.delay_seconds, "Sending message");

    let queue = open_queue(config, queue)?;
    let response = queue.send_message(&request).await?;

    match format {
        OutputFormat::Text => println!("{}", response.message_id),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "message_id": response.message_id,
                "message_body_md5": response.message_body_md5,
            }))?
        ),
    }
    Ok(())
}

async fn execute_receive_command(
    config: &CliConfig,
    queue: QueueName,
    pool_config: WorkerPoolConfig,
    delete: bool,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let queue = open_queue(config, queue)?;
    let pool = ReceiveWorkerPool::new(queue.clone(), pool_config)?;
    let (outputs, mut messages, mut errors) =
        ReceiveOutputs::bounded(config.receive.channel_capacity.max(1));

    pool.start(outputs)?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut received = 0usize;
    let outcome = loop {
        tokio::select! {
            result = &mut shutdown => {
                info!("Interrupted, stopping receive workers");
                break result.map_err(CliError::from);
            }
            Some(message) = messages.recv() => {
                match format_message(&message, format) {
                    Ok(line) => println!("{}", line),
                    Err(e) => break Err(e),
                }
                if delete {
                    if let Err(e) = queue.delete_message(&message.receipt_handle).await {
                        warn!(error = %e, message_id = %message.message_id, "Failed to delete message");
                    }
                }

                received += 1;
                if limit.is_some_and(|limit| received >= limit) {
                    break Ok(());
                }
            }
            Some(error) = errors.recv() => {
                if error.kind() == Some(ErrorKind::MessageNotExist) {
                    debug!("No message available");
                } else {
                    warn!(error = %error, "Receive failed");
                }
            }
            else => break Ok(()),
        }
    };

    // Closing the outputs releases workers blocked on publish
    drop(messages);
    drop(errors);
    let report = pool.stop().await;
    info!(
        received = received,
        stopped = report.stopped,
        abandoned = report.abandoned,
        "Receive finished"
    );

    outcome
}

async fn execute_peek_command(
    config: &CliConfig,
    queue: QueueName,
    format: OutputFormat,
) -> Result<(), CliError> {
    let queue = open_queue(config, queue)?;
    let message = queue.peek_message().await?;

    println!("{}", format_message(&message, format)?);
    Ok(())
}

async fn execute_delete_command(
    config: &CliConfig,
    queue: QueueName,
    receipt_handle: ReceiptHandle,
) -> Result<(), CliError> {
    let queue = open_queue(config, queue)?;
    queue.delete_message(&receipt_handle).await?;

    info!(queue = %queue.name(), "Message deleted");
    Ok(())
}

async fn execute_change_visibility_command(
    config: &CliConfig,
    queue: QueueName,
    receipt_handle: ReceiptHandle,
    seconds: u32,
    format: OutputFormat,
) -> Result<(), CliError> {
    let queue = open_queue(config, queue)?;
    let response = queue
        .change_message_visibility(&receipt_handle, seconds)
        .await?;

    match format {
        OutputFormat::Text => println!(
            "{}\t{}",
            response.receipt_handle, response.next_visible_time
        ),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "receipt_handle": response.receipt_handle.as_str(),
                "next_visible_time": response.next_visible_time,
            }))?
        ),
    }
    Ok(())
}

// ============================================================================
// Queue Commands
// ============================================================================

async fn execute_queue_command(
    config: &CliConfig,
    action: QueueCommands,
    format: OutputFormat,
) -> Result<(), CliError> {
    let (owner_id, location) = queue_manager_target(config)?;
    let manager = QueueManager::for_location(&owner_id, location, config.client.clone())?;

    match action {
        QueueCommands::Create { name, attributes } => {
            match manager
                .create_queue(&name, &QueueAttributes::from(&attributes))
                .await? {
                QueueCreation::Created => println!("created {}", name),
                QueueCreation::AlreadyExists => {
                    println!("{} already exists with the same attributes", name)
                }
            }
        }
        QueueCommands::Set { name, attributes } => {
            manager
                .set_queue_attributes(&name, &QueueAttributes::from(&attributes))
                .await?;
            println!("updated {}", name);
        }
        QueueCommands::Get { name } => {
            let attributes = manager.get_queue_attributes(&name).await?;
            println!("{}", format_queue_attributes(&attributes, format)?);
        }
        QueueCommands::Delete { name } => {
            manager.delete_queue(&name).await?;
            println!("deleted {}", name);
        }
        QueueCommands::List {
            marker,
            ret_number,
            prefix,
        } => {
            let options = ListQueuesOptions {
                marker,
                ret_number,
                prefix,
            };
            let queues = manager.list_queues(&options).await?;
            println!("{}", format_queues(&queues, format)?);
        }
    }

    Ok(())
}

fn execute_completions_command(shell: clap_complete::Shell) -> Result<(), CliError> {
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "mqs", &mut std::io::stdout());
    Ok(())
}

// ============================================================================
// Output Formatting
// ============================================================================

/// Render a received message
pub fn format_message(
    message: &MessageReceiveResponse,
    format: OutputFormat,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Text => Ok(format!(
            "{}\t{}\t{}\t{}",
            message.message_id,
            message.receipt_handle,
            message.dequeue_count,
            message.body_text()
        )),
        OutputFormat::Json => Ok(serde_json::to_string(&serde_json::json!({
            "message_id": message.message_id,
            "receipt_handle": message.receipt_handle.as_str(),
            "body": message.body_text(),
            "body_md5": message.message_body_md5,
            "enqueue_time": message.enqueue_time,
            "next_visible_time": message.next_visible_time,
            "first_dequeue_time": message.first_dequeue_time,
            "dequeue_count": message.dequeue_count,
            "priority": message.priority,
        }))?),
    }
}

/// Render queue attributes
pub fn format_queue_attributes(
    attributes: &QueueAttributeResponse,
    format: OutputFormat,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Text => Ok([
            format!("name: {}", attributes.queue_name),
            format!("delay_seconds: {}", attributes.delay_seconds),
            format!("max_message_size: {}", attributes.max_message_size),
            format!(
                "message_retention_period: {}",
                attributes.message_retention_period
            ),
            format!("visibility_timeout: {}", attributes.visibility_timeout),
            format!("polling_wait_seconds: {}", attributes.polling_wait_seconds),
            format!("active_messages: {}", attributes.active_messages),
            format!("inactive_messages: {}", attributes.inactive_messages),
            format!("delay_messages: {}", attributes.delay_messages),
        ]
        .join("\n")),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(attributes)?),
    }
}

/// Render one page of a queue listing
pub fn format_queues(queues: &Queues, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Text => {
            let mut lines: Vec<String> = queues
                .queues
                .iter()
                .map(|queue| queue.queue_url.clone())
                .collect();
            if let Some(marker) = &queues.next_marker {
                lines.push(format!("next marker: {}", marker));
            }
            Ok(lines.join("\n"))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
            "queues": queues.queues.iter().map(|q| q.queue_url.as_str()).collect::<Vec<_>>(),
            "next_marker": queues.next_marker,
        }))?),
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
