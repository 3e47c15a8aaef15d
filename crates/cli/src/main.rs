use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use relay_engine::{ExecutionEngine, ExecutionEvent, ExecutionRequest, SimulatedAdapter, parse_workflow_file};
use relay_types::ExecutionStatus;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("validate", sub)) => validate_cmd(sub),
        Some(("run", sub)) => run_cmd(sub).await,
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn build_cli() -> Command {
    Command::new("relay")
        .about("Run and validate declarative automation workflows")
        .subcommand(
            Command::new("validate").about("Validate a workflow document").arg(
                Arg::new("file")
                    .long("file")
                    .short('f')
                    .required(true)
                    .action(ArgAction::Set)
                    .help("Path to workflow YAML/JSON"),
            ),
        )
        .subcommand(
            Command::new("run")
                .about("Execute a workflow against an input payload")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .short('f')
                        .required(true)
                        .action(ArgAction::Set)
                        .help("Path to workflow YAML/JSON"),
                )
                .arg(
                    Arg::new("input")
                        .long("input")
                        .short('i')
                        .action(ArgAction::Set)
                        .help("Trigger payload as inline JSON; defaults to the document's triggerData"),
                )
                .arg(
                    Arg::new("failure-rate")
                        .long("failure-rate")
                        .action(ArgAction::Set)
                        .help("Failure probability for unmapped app ids (0.0 to 1.0)"),
                ),
        )
}

fn validate_cmd(matches: &ArgMatches) -> Result<()> {
    let file = matches.get_one::<String>("file").context("expected --file")?;
    let definition = parse_workflow_file(file)?;
    println!(
        "workflow '{}' is valid ({} steps, {} branch paths)",
        definition.id,
        definition.steps.len(),
        definition.branch_paths.len()
    );
    Ok(())
}

async fn run_cmd(matches: &ArgMatches) -> Result<()> {
    let file = matches.get_one::<String>("file").context("expected --file")?;
    let definition = parse_workflow_file(file)?;

    let input = matches
        .get_one::<String>("input")
        .map(|raw| serde_json::from_str(raw).context("--input is not valid JSON"))
        .transpose()?;
    let request = ExecutionRequest::from_definition(&definition, input);

    let mut adapter = SimulatedAdapter::new();
    if let Some(raw) = matches.get_one::<String>("failure-rate") {
        let rate: f64 = raw.parse().context("--failure-rate is not a number")?;
        adapter = adapter.with_failure_rate(rate);
    }

    let (engine, mut events) = ExecutionEngine::new(Arc::new(adapter));
    let logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let execution = engine
        .start_execution(request)
        .await
        .with_context(|| format!("failed to start workflow '{}'", definition.id))?;
    drop(engine);
    let _ = logger.await;

    println!("{}", serde_json::to_string_pretty(&execution)?);
    if execution.status == ExecutionStatus::Failed {
        anyhow::bail!("execution failed: {}", execution.error.unwrap_or_else(|| "unknown error".into()));
    }
    Ok(())
}

fn log_event(event: &ExecutionEvent) {
    match event {
        ExecutionEvent::Started { execution_id, workflow_id } => {
            info!(%execution_id, %workflow_id, "execution started");
        }
        ExecutionEvent::StatusChanged { status } => {
            info!(?status, "status changed");
        }
        ExecutionEvent::StepStarted { index, step_id, path_id } => {
            info!(index, %step_id, path_id = path_id.as_deref().unwrap_or("main"), "step started");
        }
        ExecutionEvent::StepFinished { index, result, path_id } => {
            info!(
                index,
                step_id = %result.step_id,
                status = ?result.status,
                path_id = path_id.as_deref().unwrap_or("main"),
                "step finished"
            );
        }
        ExecutionEvent::Finished { execution } => {
            if let Some(error) = &execution.error {
                warn!(execution_id = %execution.id, %error, "execution finished with error");
            } else {
                info!(execution_id = %execution.id, status = ?execution.status, "execution finished");
            }
        }
    }
}
