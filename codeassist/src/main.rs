use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codeassist::config::{DEFAULT_MAX_LENGTH, MAX_LENGTH_RANGE};
use codeassist::{
    ApiServer, ApiServerConfig, AssistantConfig, CodeAssistant, CodeRequest, CommandModel,
    Language, LocalFactory,
};
use codeassist_core::monitor::APP_STARTUP;
use codeassist_core::{
    Accelerator, DeviceReport, NoAccelerator, NvidiaSmi, ResourceManager, SystemReport,
};

/// Environment variable consulted when `--model-cmd` is not given
const MODEL_CMD_ENV: &str = "CODEASSIST_MODEL_CMD";

#[derive(Parser)]
#[command(name = "codeassist")]
#[command(about = "Documentation-grounded code generation", long_about = None)]
struct Cli {
    /// Directory of reference documentation (.md, .txt, .rst)
    #[arg(long, default_value = "./docs")]
    docs_dir: PathBuf,

    /// Data directory for the search index
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Model command line; `{max_length}` is replaced per call
    #[arg(short, long)]
    model_cmd: Option<String>,

    /// Also write log lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Skip accelerator detection
    #[arg(long)]
    cpu_only: bool,

    /// Accelerator device index
    #[arg(long, default_value = "0")]
    device_index: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Generate code for a single task
    Ask {
        /// What the code should do
        task: String,

        /// Python, JavaScript, Java, C++ or SQL
        #[arg(short, long, default_value = "python")]
        language: Language,

        /// Requested generation length
        #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
        max_length: usize,

        /// Skip the explanation of the generated code
        #[arg(long)]
        no_explain: bool,

        /// Print the reference documentation used
        #[arg(long)]
        show_context: bool,
    },

    /// Rebuild the documentation index
    Refresh,

    /// Show host load and accelerator status
    Device {
        /// Print the raw report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "codeassist=info,codeassist_core=info".into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

fn detect_accelerator(cli: &Cli) -> Arc<dyn Accelerator> {
    if cli.cpu_only {
        return Arc::new(NoAccelerator);
    }

    let smi = NvidiaSmi::detect(cli.device_index);
    if smi.is_available() {
        Arc::new(smi)
    } else {
        Arc::new(NoAccelerator)
    }
}

fn create_assistant(cli: &Cli, resources: ResourceManager) -> Result<CodeAssistant> {
    let command_line = cli
        .model_cmd
        .clone()
        .or_else(|| std::env::var(MODEL_CMD_ENV).ok())
        .with_context(|| {
            format!("No model command configured; pass --model-cmd or set {MODEL_CMD_ENV}")
        })?;
    let model = CommandModel::from_command_line(&command_line)?;

    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => dirs::data_local_dir()
            .map(|d| d.join("codeassist"))
            .unwrap_or_else(|| PathBuf::from("./data")),
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {:?}", data_dir))?;

    let factory = LocalFactory::new(&cli.docs_dir, data_dir.join("search_index"), model);
    let assistant = CodeAssistant::new(Arc::new(factory), resources, AssistantConfig::default())?;
    Ok(assistant)
}

fn print_system_report(report: &SystemReport) {
    match &report.host {
        Some(host) => {
            println!("CPU Usage: {:.1}%", host.cpu_percent);
            println!(
                "RAM Usage: {:.1}% ({:.0} / {:.0} MB)",
                host.ram_percent, host.ram_used_mb, host.ram_total_mb
            );
        }
        None => println!("Host usage unavailable"),
    }

    match &report.accelerator {
        DeviceReport::Unavailable => println!("Running on CPU (no accelerator detected)"),
        DeviceReport::Full { info } | DeviceReport::Partial { info, .. } => {
            println!("Accelerator: {}", info.name.as_deref().unwrap_or("unknown"));
            println!("  Backend:     {}", info.backend);
            if let Some(version) = &info.runtime_version {
                println!("  CUDA:        {}", version);
            }
            if let (Some(used), Some(total)) = (info.memory_used_mb, info.memory_total_mb) {
                println!("  Memory:      {:.0} / {:.0} MB", used, total);
            }
            if let Some(util) = info.utilization_percent {
                println!("  Utilization: {:.0}%", util);
            }
            if let DeviceReport::Partial { failures, .. } = &report.accelerator {
                for failure in failures {
                    println!("  (unavailable: {})", failure);
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let resources = ResourceManager::new(detect_accelerator(&cli));

    match cli.command {
        Commands::Serve { ref host, port } => {
            let assistant = Arc::new(create_assistant(&cli, resources)?);
            assistant.monitor().start(APP_STARTUP);

            if let Err(e) = assistant.warm_up().await {
                // requests retry construction on their own
                error!("Components not ready at startup: {}", e);
            }
            let _maintenance = assistant.spawn_maintenance();
            assistant.monitor().end(APP_STARTUP);

            println!("Starting API server on http://{}:{}", host, port);
            println!("Endpoints:");
            println!("  GET  /health       - Health check");
            println!("  POST /api/generate - Generate code");
            println!("  POST /api/refresh  - Rebuild documentation index");
            println!("  GET  /api/device   - Host load and accelerator status");
            println!("  GET  /api/stats    - Cache and timing statistics");

            let config = ApiServerConfig {
                host: host.clone(),
                port,
            };
            ApiServer::new(config, assistant).start().await?;
        }

        Commands::Ask {
            ref task,
            language,
            max_length,
            no_explain,
            show_context,
        } => {
            if !MAX_LENGTH_RANGE.contains(&max_length) {
                anyhow::bail!(
                    "--max-length must be between {} and {}",
                    MAX_LENGTH_RANGE.start(),
                    MAX_LENGTH_RANGE.end()
                );
            }

            let assistant = create_assistant(&cli, resources)?;
            let request = CodeRequest::new(language, task.clone())
                .with_max_length(max_length)
                .with_explanation(!no_explain)
                .with_context(show_context);

            let response = assistant.handle(request).await?;

            println!("```{}", response.code_fence);
            println!("{}", response.code);
            println!("```");

            if let Some(explanation) = &response.explanation {
                println!("\nExplanation:\n{}", explanation);
            }

            if let Some(references) = &response.references {
                println!("\nReference Documentation Used:");
                for (i, doc) in references.iter().enumerate() {
                    let source = doc.source.as_deref().unwrap_or("unknown source");
                    println!("\n[Reference {}] {}", i + 1, source);
                    println!("{}", doc.content);
                }
            }
        }

        Commands::Refresh => {
            let assistant = create_assistant(&cli, resources)?;
            assistant.refresh_documents().await?;
            info!("Documentation index rebuilt from {:?}", cli.docs_dir);
            println!("Database refreshed successfully!");
        }

        Commands::Device { json } => {
            let report = resources.system_report().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_system_report(&report);
            }
        }
    }

    Ok(())
}
