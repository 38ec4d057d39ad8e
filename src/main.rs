use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::Channel;
use tracing_subscriber::EnvFilter;

use jobrelay::config::{
    host_port, resolve_addr, CoordinatorConfig, CoordinatorTlsConfig, TlsConfig, WorkerConfig,
    DEFAULT_CLIENT_PORT, DEFAULT_TLS_DOMAIN, DEFAULT_WORKER_PORT,
};
use jobrelay::grpc::{channel, CoordinatorServer};
use jobrelay::proto::client_service_client::ClientServiceClient;
use jobrelay::proto::{ListJobsRequest, SubmitJobRequest};
use jobrelay::render::render_table;
use jobrelay::scheduler::{Job, JobStore};
use jobrelay::shutdown::install_shutdown_handler;
use jobrelay::tls::{CoordinatorIdentity, PeerTls};
use jobrelay::worker::run_worker;

#[derive(Parser, Debug)]
#[command(name = "jobrelay")]
#[command(version)]
#[command(about = "Distributes shell-command jobs to polling workers over mutual TLS")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the coordinator (client and worker listeners)
    Coordinator(CoordinatorArgs),

    /// Run a pool of workers against a coordinator
    Worker(WorkerArgs),

    /// Submit or list jobs
    Job {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: JobCommands,
    },
}

// =============================================================================
// Coordinator Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct CoordinatorArgs {
    /// Hostname or IP to bind both listeners to
    #[arg(long, default_value = "127.0.0.1")]
    addr: String,

    /// Port for client communication (submit, list)
    #[arg(long, default_value_t = DEFAULT_CLIENT_PORT)]
    client_port: u16,

    /// Port for worker communication (lease, report, list)
    #[arg(long, default_value_t = DEFAULT_WORKER_PORT)]
    worker_port: u16,

    /// Path to the coordinator certificate (PEM format)
    #[arg(long, default_value = ".server_keys/server.crt")]
    cert: PathBuf,

    /// Path to the coordinator private key (PEM format)
    #[arg(long, default_value = ".server_keys/server.key")]
    key: PathBuf,

    /// Path to the CA certificate that signs client certificates (PEM format)
    #[arg(long, default_value = ".client_keys/ca.crt")]
    client_ca_cert: PathBuf,

    /// Path to the CA certificate that signs worker certificates (PEM format).
    /// When set, workers must present a certificate.
    #[arg(long)]
    worker_ca_cert: Option<PathBuf>,
}

// =============================================================================
// Worker Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct WorkerArgs {
    /// Coordinator hostname or IP
    #[arg(long, short = 'a', default_value = "127.0.0.1")]
    addr: String,

    /// Coordinator worker port
    #[arg(long, default_value_t = DEFAULT_WORKER_PORT)]
    port: u16,

    /// Path to the CA certificate used to verify the coordinator (PEM format)
    #[arg(long, default_value = ".server_keys/ca.crt")]
    ca_cert: PathBuf,

    /// Path to the worker certificate (PEM format)
    #[arg(long, requires = "key")]
    cert: Option<PathBuf>,

    /// Path to the worker private key (PEM format)
    #[arg(long, requires = "cert")]
    key: Option<PathBuf>,

    /// Server name expected in the coordinator certificate
    #[arg(long, default_value = DEFAULT_TLS_DOMAIN)]
    tls_domain: String,

    /// Number of concurrent pollers
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Wait between lease attempts when no job is available
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Delivery attempts per status report (at least 2)
    #[arg(long, default_value_t = 3)]
    report_attempts: u32,
}

// =============================================================================
// Client Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Coordinator hostname or IP
    #[arg(long, short = 'a', default_value = "127.0.0.1")]
    addr: String,

    /// Coordinator client port
    #[arg(long, default_value_t = DEFAULT_CLIENT_PORT)]
    port: u16,

    /// Path to the CA certificate used to verify the coordinator (PEM format)
    #[arg(long, default_value = ".server_keys/ca.crt")]
    ca_cert: PathBuf,

    /// Path to the client certificate (PEM format), required for submission
    #[arg(long, default_value = ".client_keys/client.crt")]
    cert: PathBuf,

    /// Path to the client private key (PEM format)
    #[arg(long, default_value = ".client_keys/client.key")]
    key: PathBuf,

    /// Server name expected in the coordinator certificate
    #[arg(long, default_value = DEFAULT_TLS_DOMAIN)]
    tls_domain: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum JobCommands {
    /// Submit a new job
    Submit {
        /// The shell command to execute (e.g., "echo hello")
        command: String,

        /// Print the job listing after submitting
        #[arg(long)]
        list: bool,
    },
    /// List all jobs known to the coordinator
    List,
}

// =============================================================================
// Helper Functions
// =============================================================================

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

async fn create_client_channel(args: &ClientArgs) -> Result<Channel, Box<dyn std::error::Error>> {
    let tls = PeerTls::load(&TlsConfig {
        ca_cert_path: Some(args.ca_cert.clone()),
        cert_path: Some(args.cert.clone()),
        key_path: Some(args.key.clone()),
    })
    .await?;

    let addr = host_port(&args.addr, args.port);
    Ok(channel::connect(&addr, &args.tls_domain, &tls).await?)
}

// =============================================================================
// Coordinator and Worker
// =============================================================================

async fn run_coordinator(args: CoordinatorArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = CoordinatorConfig::new(
        resolve_addr(&args.addr, args.client_port).await?,
        resolve_addr(&args.addr, args.worker_port).await?,
    )
    .with_tls(CoordinatorTlsConfig {
        cert_path: Some(args.cert),
        key_path: Some(args.key),
        client_ca_cert_path: Some(args.client_ca_cert),
        worker_ca_cert_path: args.worker_ca_cert,
    });

    // Certificate problems are fatal at startup.
    let identity = CoordinatorIdentity::load(&config.tls)
        .await
        .map_err(|e| format!("TLS certificate loading failed: {}", e))?;

    let shutdown = install_shutdown_handler()?;
    let server = CoordinatorServer::new(config, Arc::new(JobStore::new()), identity);
    server.run(shutdown).await?;
    Ok(())
}

async fn run_workers(args: WorkerArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = WorkerConfig {
        coordinator_addr: host_port(&args.addr, args.port),
        tls_domain: args.tls_domain,
        tls: TlsConfig {
            ca_cert_path: Some(args.ca_cert),
            cert_path: args.cert,
            key_path: args.key,
        },
        pool_size: args.workers,
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        report_attempts: args.report_attempts,
        ..WorkerConfig::default()
    };

    let shutdown = install_shutdown_handler()?;
    run_worker(config, shutdown).await?;
    Ok(())
}

// =============================================================================
// Client Command Handlers
// =============================================================================

async fn handle_job_submit(
    client: &mut ClientServiceClient<Channel>,
    command: String,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = match client.submit_job(SubmitJobRequest { command }).await {
        Ok(response) => response.into_inner(),
        Err(status) => {
            eprintln!("Error: Job submission failed: {}", status.message());
            std::process::exit(1);
        }
    };

    let job = Job::try_from(response.job.ok_or("Coordinator returned no job")?)?;
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&job)?),
        OutputFormat::Table => {
            println!("Job added to queue");
            println!("Job ID: {}", job.id);
        }
    }
    Ok(())
}

async fn handle_job_list(
    client: &mut ClientServiceClient<Channel>,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = client.list_jobs(ListJobsRequest {}).await?.into_inner();
    let jobs = response
        .jobs
        .into_iter()
        .map(Job::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&jobs)?),
        OutputFormat::Table => print!("{}", render_table(&jobs)),
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
        Commands::Coordinator(coordinator_args) => {
            run_coordinator(coordinator_args).await?;
        }
        Commands::Worker(worker_args) => {
            run_workers(worker_args).await?;
        }
        Commands::Job { client, command } => {
            let channel = create_client_channel(&client).await?;
            let mut grpc_client = ClientServiceClient::new(channel);

            match command {
                JobCommands::Submit { command: cmd, list } => {
                    handle_job_submit(&mut grpc_client, cmd, &client.output).await?;
                    if list {
                        handle_job_list(&mut grpc_client, &client.output).await?;
                    }
                }
                JobCommands::List => {
                    handle_job_list(&mut grpc_client, &client.output).await?;
                }
            }
        }
    }

    Ok(())
}
