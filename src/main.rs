use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use dbsleuth::agent::{
    ControllerConfig, Decider, Describer, LoopController, Planner, TaskOutcome, ToolDispatcher,
    TraceLogger,
};
use dbsleuth::config::Config;
use dbsleuth::domain::Task;
use dbsleuth::llm::{AnthropicClient, AnthropicConfig, LlmClient};
use dbsleuth::tools::{
    AnalyzeStructureTool, DbGateway, ExecuteQueryTool, FinalAnswerTool, GetTablesTool,
    HttpDbGateway, TableStructureTool, ToolRegistry,
};

/// Default task goal: the datacenter inquiry this agent was built around
const DEFAULT_GOAL: &str = "Return the dc_id of every active datacenter whose manager is an \
inactive user (is_active = 0 in the users table).";

#[derive(Parser)]
#[command(name = "dbsleuth", about = "Agent loop for database schema discovery and querying")]
struct Cli {
    /// Task goal to solve; defaults to the datacenter inquiry
    #[arg(short, long)]
    task: Option<String>,

    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the cycle budget
    #[arg(long)]
    max_cycles: Option<u32>,

    /// Print every trace entry after the run
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dbsleuth")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("dbsleuth.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_controller(config: &Config) -> Result<LoopController> {
    let gateway: Arc<dyn DbGateway> = Arc::new(HttpDbGateway::new(
        config.gateway.resolve_api_url()?,
        config.gateway.resolve_report_url()?,
        config.gateway.resolve_api_key()?,
        Duration::from_millis(config.gateway.timeout_ms),
    )?);

    let llm: Arc<dyn LlmClient> = Arc::new(AnthropicClient::new(AnthropicConfig {
        model: config.llm.model.clone(),
        max_tokens: config.llm.max_tokens,
        timeout: Duration::from_millis(config.llm.timeout_ms),
    })?);

    let registry = Arc::new(ToolRegistry::builtin());

    let mut dispatcher = ToolDispatcher::new(registry.clone());
    dispatcher.register(Box::new(GetTablesTool::new(gateway.clone())));
    dispatcher.register(Box::new(TableStructureTool::new(gateway.clone())));
    dispatcher.register(Box::new(ExecuteQueryTool::new(gateway.clone())));
    dispatcher.register(Box::new(AnalyzeStructureTool::new(llm.clone())));
    dispatcher.register(Box::new(FinalAnswerTool::new(gateway)));

    let mut controller = LoopController::new(
        registry.clone(),
        Planner::new(llm.clone(), registry.clone()),
        Decider::new(llm.clone(), registry),
        Describer::new(llm),
        dispatcher,
    )
    .with_config(ControllerConfig {
        max_cycles: config.agent.max_cycles,
        deadline: config.agent.deadline_ms.map(Duration::from_millis),
        reflect: config.agent.reflect,
    });

    if let Some(path) = &config.agent.log_path {
        controller = controller.with_trace_logger(TraceLogger::new(path));
    }

    Ok(controller)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging()?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(max_cycles) = cli.max_cycles {
        config.agent.max_cycles = max_cycles;
    }

    let goal = cli.task.clone().unwrap_or_else(|| DEFAULT_GOAL.to_string());
    let task = Task::new(goal);

    println!("{} {}", "Task:".cyan(), task.goal);
    info!("Starting task {}", task.id);

    let controller = build_controller(&config)?;
    let report = controller.run(&task).await;

    if cli.verbose {
        for (i, entry) in report.trace.entries().iter().enumerate() {
            let status = if entry.result.is_ok() {
                "ok".green()
            } else {
                "error".red()
            };
            println!(
                "{:>3}. {} [{}] {}",
                i + 1,
                entry.action.tool_name,
                status,
                entry
                    .result
                    .error_detail
                    .as_deref()
                    .unwrap_or_default()
            );
        }
    }

    println!(
        "{} {} cycles, {} trace entries",
        "Run:".cyan(),
        report.cycles,
        report.trace.len()
    );

    match report.outcome {
        TaskOutcome::Completed { answer } => {
            println!("{} {}", "Answer:".green().bold(), answer.join(", "));
            Ok(())
        }
        TaskOutcome::Exhausted => {
            println!("{}", "Budget exhausted before a final answer".yellow());
            eyre::bail!("task exhausted after {} cycles", report.cycles)
        }
        TaskOutcome::Fatal { reason } => {
            println!("{} {}", "Fatal:".red().bold(), reason);
            eyre::bail!("task aborted: {}", reason)
        }
    }
}
