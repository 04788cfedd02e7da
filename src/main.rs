//! Forager CLI
//!
//! 入口：加载配置、初始化日志与 Oracle，构建内置能力注册表并运行一次编排。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use forager::config::{load_config, AppConfig};
use forager::core::{Goal, Run, RunEvent, RunStatus, Specialization, StrategyOrchestrator};
use forager::oracle::OracleAdapter;
use forager::tools::{builtin_registry, ActionDispatcher};

#[derive(Parser)]
#[command(name = "forager")]
#[command(about = "Goal-driven web reconnaissance orchestrator", long_about = None)]
struct Cli {
    /// Explicit config file (layered over config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the orchestrator against a target
    Run {
        /// Target URI
        target: String,
        /// Natural-language objective
        objective: String,
        /// api-discovery | secret-discovery | content-extraction | client-scripting
        #[arg(long, short = 's')]
        specialization: Option<Specialization>,
        /// Attempt budget (defaults to orchestrator.attempt_budget)
        #[arg(long, short = 'b')]
        budget: Option<usize>,
        /// Oracle backend override: auto | openai | deepseek | offline
        #[arg(long)]
        oracle: Option<String>,
        /// Print the final run as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the built-in capabilities
    Capabilities,
}

fn load(path: Option<PathBuf>) -> AppConfig {
    match load_config(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            AppConfig::default()
        }
    }
}

fn print_event(ev: &RunEvent) {
    match ev {
        RunEvent::AttemptStarted { attempt, budget, strategy } => {
            eprintln!("== attempt {attempt}/{budget} [{strategy}]")
        }
        RunEvent::StatusChanged { status } => eprintln!("   status -> {status}"),
        RunEvent::ActionsPlanned { capabilities } => eprintln!("   planned: {}", capabilities.join(", ")),
        RunEvent::StepRecorded { index, capability, succeeded, error } => match error {
            Some(e) if !succeeded => eprintln!("   step {index} {capability}: FAILED ({e})"),
            _ => eprintln!("   step {index} {capability}: ok"),
        },
        RunEvent::Verified { success, confidence } => {
            eprintln!("   verified: success={success} confidence={confidence:.2}")
        }
        RunEvent::StrategySuggested { attempt, strategy } => {
            eprintln!("   next strategy for attempt {attempt}: {strategy}")
        }
        RunEvent::Finished { status, .. } => eprintln!("== finished: {status}"),
    }
}

fn print_summary(run: &Run) {
    println!("run:        {}", run.id);
    println!("status:     {}", run.status);
    println!("strategy:   {}", run.strategy);
    println!("attempts:   {}", run.attempts);
    match run.confidence {
        Some(c) => println!("confidence: {c:.2}"),
        None => println!("confidence: -"),
    }
    println!("steps:");
    for step in &run.steps {
        let outcome = match &step.error {
            Some(e) => format!("failed: {e}"),
            None => "ok".to_string(),
        };
        println!("  {:>3}. [attempt {}] {} -> {}", step.index, step.attempt, step.action.capability, outcome);
    }
    if let Some(result) = &run.result {
        println!("result:");
        println!("{}", serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string()));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    forager::observability::init(cli.verbose);
    let mut cfg = load(cli.config);

    match cli.command {
        Commands::Capabilities => {
            let registry = builtin_registry(&cfg.capabilities);
            for (name, description) in registry.descriptions() {
                println!("{name:<18} {description}");
            }
            Ok(())
        }
        Commands::Run {
            target,
            objective,
            specialization,
            budget,
            oracle,
            json,
        } => {
            if let Some(backend) = oracle {
                cfg.oracle.backend = backend;
            }
            let adapter = match OracleAdapter::from_config(&cfg.oracle) {
                Ok(a) => a,
                Err(e) => {
                    tracing::warn!(error = %e, "oracle initialization failed, using offline heuristic");
                    OracleAdapter::offline()
                }
            };

            let registry = builtin_registry(&cfg.capabilities);
            let budget = budget.unwrap_or(cfg.orchestrator.attempt_budget);
            let mut goal = Goal::new(target, objective);
            if let Some(s) = specialization {
                goal = goal.with_specialization(s);
            }

            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<RunEvent>();
            let printer = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    print_event(&ev);
                }
            });

            let orchestrator = StrategyOrchestrator::new(
                Arc::new(adapter),
                cfg.orchestrator.clone(),
                ActionDispatcher::new(cfg.capabilities.timeout_secs),
            )
            .with_events(tx);

            let run = tokio::select! {
                run = orchestrator.run_orchestration(goal, &registry, budget) => run,
                _ = tokio::signal::ctrl_c() => {
                    eprintln!("interrupted, run discarded");
                    std::process::exit(130);
                }
            };
            drop(orchestrator);
            printer.await.context("event printer task failed")?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&run).context("Failed to serialize run")?
                );
            } else {
                print_summary(&run);
            }

            if run.status != RunStatus::Completed {
                std::process::exit(2);
            }
            Ok(())
        }
    }
}
