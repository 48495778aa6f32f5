//! `task-dispatcher` command-line entry point.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use task_dispatcher::builders::{build_dispatcher, build_load_sampler, build_registry, open_store};
use task_dispatcher::config::{DispatcherConfig, StoreBackendConfig};
use task_dispatcher::core::{AppResult, AuditLog, NewTask, QueueStore};
use task_dispatcher::util::init_tracing;

#[derive(Parser)]
#[command(name = "task-dispatcher")]
#[command(about = "Poll a task queue and launch admitted tasks as OS processes")]
struct Cli {
    /// JSON configuration file (defaults apply when omitted)
    #[arg(short, long, global = true, env = "DISPATCHER_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler loop until the process is killed
    Run,
    /// Insert a pending task into the configured store
    Enqueue {
        /// Registered task type
        #[arg(short = 't', long = "type")]
        process_type: String,
        /// Template parameter as name=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Validate the configuration and list registered task types
    CheckConfig,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))?;
    if name.trim().is_empty() {
        return Err(format!("empty parameter name in `{raw}`"));
    }
    Ok((name.trim().to_string(), value.to_string()))
}

fn load_config(path: Option<&PathBuf>) -> AppResult<DispatcherConfig> {
    match path {
        Some(path) => DispatcherConfig::from_file(path)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(DispatcherConfig::default()),
    }
}

fn main() -> AppResult<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Run => {
            let audit = AuditLog::to_files(&cfg.logs.operator_path, &cfg.logs.client_path)
                .context("opening audit logs")?;
            let mut dispatcher = build_dispatcher(&cfg, open_store, build_load_sampler, audit)?;
            info!(
                types = dispatcher.registry().len(),
                max_global = cfg.max_global_concurrent,
                poll_interval_secs = cfg.poll_interval_secs,
                "dispatcher starting"
            );
            dispatcher.run()
        }
        Commands::Enqueue {
            process_type,
            params,
        } => {
            if cfg.store == StoreBackendConfig::InMemory {
                bail!("enqueue needs a persistent store; configure `store` in the config file");
            }
            let store = open_store(&cfg)?;
            let mut task = NewTask::new(process_type);
            for (name, value) in params {
                task = task.with_param(name, value);
            }
            let task = store.enqueue(task)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
            Ok(())
        }
        Commands::CheckConfig => {
            cfg.validate().map_err(anyhow::Error::msg)?;
            let registry = build_registry(&cfg)?;
            println!(
                "ok: {} task type(s), max_global_concurrent={}, cpu_threshold_percent={}, \
                 poll_interval_secs={}",
                registry.len(),
                cfg.max_global_concurrent,
                cfg.cpu_threshold_percent,
                cfg.poll_interval_secs
            );
            for name in registry.names() {
                if let Some(descriptor) = registry.get(name) {
                    println!(
                        "  {name}: max_concurrent={} command={:?}",
                        descriptor.max_concurrent, descriptor.command_template
                    );
                }
            }
            Ok(())
        }
    }
}
