use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use skipper::cleanup;
use skipper::config::ServiceConfig;
use skipper::launcher::ExecutionType;
use skipper::orchestrator::JobOrchestrator;
use skipper::shutdown::shutdown_token;
use skipper::spec::JobSpec;
use skipper::status::{JobDetail, JobListing};

#[derive(Parser, Debug)]
#[command(name = "skipper")]
#[command(version)]
#[command(about = "Submit and track distributed jobs on a framework launcher")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Job management commands
    Job {
        #[command(flatten)]
        endpoints: EndpointArgs,

        #[command(subcommand)]
        command: JobCommands,
    },

    /// Sweep aged staged job directories
    Sweep {
        #[command(flatten)]
        endpoints: EndpointArgs,

        /// Sweep interval in seconds; runs once and exits when omitted
        #[arg(long)]
        interval: Option<u64>,

        /// Remove staged directories older than this many seconds
        #[arg(long, default_value = "604800")]
        ttl: u64,
    },
}

// =============================================================================
// Shared Endpoint Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct EndpointArgs {
    /// Framework launcher webservice URI
    #[arg(long, short = 'l', default_value = "http://127.0.0.1:9086")]
    launcher: String,

    /// Distributed filesystem root URI
    #[arg(long, default_value = "hdfs://127.0.0.1:9000")]
    fs_uri: String,

    /// Local staging root for job artifacts
    #[arg(long, default_value = "/tmp/skipper/jobs")]
    staging_root: PathBuf,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

impl EndpointArgs {
    fn service_config(&self) -> ServiceConfig {
        ServiceConfig::new(
            self.launcher.clone(),
            self.fs_uri.clone(),
            self.staging_root.clone(),
        )
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// Job Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum JobCommands {
    /// Submit a job spec to the cluster
    Submit {
        /// Path to the job spec JSON file
        #[arg(long, short = 'f')]
        file: PathBuf,

        /// Submitting username (the remote filesystem identity)
        #[arg(long, short = 'u')]
        user: String,
    },
    /// Get status of a specific job
    Status {
        /// The job name
        name: String,
    },
    /// List all jobs, newest first
    List,
    /// Delete a job
    Delete {
        /// The job name
        name: String,

        /// Requesting username
        #[arg(long, short = 'u')]
        user: String,

        /// Requester has admin rights
        #[arg(long)]
        admin: bool,
    },
    /// Start or stop a submitted job
    Exec {
        /// The job name
        name: String,

        /// START or STOP
        execution_type: String,
    },
}

// =============================================================================
// Command Handlers
// =============================================================================

async fn handle_submit(
    orchestrator: &JobOrchestrator,
    file: &PathBuf,
    user: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| format!("cannot read {}: {e}", file.display()))?;
    let spec: JobSpec = serde_json::from_str(&raw)?;

    orchestrator.submit(user, &spec).await?;
    println!("Job submitted successfully!");
    println!("Name: {}", spec.job_name);
    Ok(())
}

async fn handle_status(
    orchestrator: &JobOrchestrator,
    name: &str,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let detail = orchestrator.get(name).await?;
    match output {
        OutputFormat::Json => print_json(&detail)?,
        OutputFormat::Table => print_status_table(&detail),
    }
    Ok(())
}

fn print_status_table(detail: &JobDetail) {
    let status = &detail.status;
    println!("Name:       {}", status.name);
    println!("State:      {}", status.state);
    if let Some(user) = &status.username {
        println!("User:       {}", user);
    }
    if let Some(sub) = &status.sub_state {
        println!("Sub-state:  {}", sub);
    }
    println!("Retries:    {}", status.retries);
    if let Some(t) = status.created_time {
        println!("Created:    {}", t.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(t) = status.completed_time {
        println!("Completed:  {}", t.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(app_id) = &status.app_id {
        println!("App ID:     {}", app_id);
    }
    if let Some(url) = &status.app_tracking_url {
        println!("Tracking:   {}", url);
    }
    if let Some(code) = status.app_exit_code {
        println!("Exit code:  {}", code);
    }
    if let Some(exit_type) = &status.app_exit_type {
        println!("Exit type:  {}", exit_type);
    }

    if !detail.task_roles.is_empty() {
        println!();
        println!("{:<16} {:<6} {:<24} {:<16} GPUS", "ROLE", "TASK", "CONTAINER", "IP");
        println!("{}", "-".repeat(72));
        for role in &detail.task_roles {
            for task in &role.task_statuses {
                println!(
                    "{:<16} {:<6} {:<24} {:<16} {}",
                    role.name,
                    task.task_index,
                    task.container_id.as_deref().unwrap_or("-"),
                    task.container_ip.as_deref().unwrap_or("-"),
                    task.container_gpus
                        .map_or_else(|| "-".to_string(), |g| g.to_string()),
                );
            }
        }
    }
}

async fn handle_list(
    orchestrator: &JobOrchestrator,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let listing = orchestrator.list().await?;
    match output {
        OutputFormat::Json => print_json(&listing)?,
        OutputFormat::Table => print_list_table(&listing),
    }
    Ok(())
}

fn print_list_table(listing: &JobListing) {
    if listing.jobs.is_empty() && listing.failed.is_empty() {
        println!("No jobs found.");
        return;
    }

    println!("{:<32} {:<12} {:<8} CREATED", "NAME", "STATE", "RETRIES");
    println!("{}", "-".repeat(72));
    for job in &listing.jobs {
        let created = job
            .created_time
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
        println!(
            "{:<32} {:<12} {:<8} {}",
            job.name,
            job.state.to_string(),
            job.retries,
            created
        );
    }

    if !listing.failed.is_empty() {
        println!();
        println!("Could not fetch {} job(s):", listing.failed.len());
        for failure in &listing.failed {
            println!("  {}: {}", failure.name, failure.reason);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_sweep(
    endpoints: EndpointArgs,
    interval: Option<u64>,
    ttl: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = endpoints.service_config().staging;
    config.cleanup_ttl = Duration::from_secs(ttl);

    match interval {
        None => {
            let removed = cleanup::sweep_once(&config).await;
            println!("Removed {} staged job directories", removed);
        }
        Some(secs) => {
            let shutdown = shutdown_token();
            cleanup::run(config, Duration::from_secs(secs), shutdown).await;
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Job { endpoints, command } => {
            let orchestrator = JobOrchestrator::new(endpoints.service_config());

            match command {
                JobCommands::Submit { file, user } => {
                    handle_submit(&orchestrator, &file, &user).await?;
                }
                JobCommands::Status { name } => {
                    handle_status(&orchestrator, &name, &endpoints.output).await?;
                }
                JobCommands::List => {
                    handle_list(&orchestrator, &endpoints.output).await?;
                }
                JobCommands::Delete { name, user, admin } => {
                    orchestrator.delete(&name, &user, admin).await?;
                    println!("Job {} deleted", name);
                }
                JobCommands::Exec {
                    name,
                    execution_type,
                } => {
                    let execution: ExecutionType = execution_type.parse()?;
                    orchestrator.set_execution_type(&name, execution).await?;
                    println!("Job {} {}", name, execution.as_str().to_lowercase());
                }
            }
        }
        Commands::Sweep {
            endpoints,
            interval,
            ttl,
        } => {
            run_sweep(endpoints, interval, ttl).await?;
        }
    }

    Ok(())
}
