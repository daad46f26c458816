//! mg - mealgraph command-line entry point

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use mealgraph::checkpoint::CheckpointStore;
use mealgraph::cli::{Cli, Command, OutputFormat, get_log_path};
use mealgraph::config::Config;
use mealgraph::domain::{Recipe, Rule, UserPreferences, ValidationReport, ValidationSource};
use mealgraph::events::{create_event_bus, spawn_event_logger};
use mealgraph::llm::create_client;
use mealgraph::pipeline::{Pipeline, PipelineState, RunStatus};
use mealgraph::rules::{RuleBook, corrective_action, evaluate};
use mealgraph::schema::{StageOutput, parse_recipe};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;
    config.rules.validate().context("Invalid rules configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run { prefs, format, events } => cmd_run(&config, &prefs, format, events.as_deref()).await,
        Command::Check { prefs, recipe, format } => cmd_check(&config, &prefs, &recipe, format),
        Command::Rules => cmd_rules(&config),
    }
}

async fn cmd_run(config: &Config, prefs_path: &Path, format: OutputFormat, events: Option<&Path>) -> Result<()> {
    debug!(?prefs_path, ?format, ?events, "cmd_run: called");
    config.validate()?;
    let prefs = UserPreferences::load(prefs_path)?;

    let client = create_client(&config.llm)?;
    info!(provider = %config.llm.provider, model = config.llm.model(), "Created LLM client");
    let checkpoints = CheckpointStore::spawn();
    let root = std::env::current_dir().context("Failed to read current directory")?;
    let mut pipeline = Pipeline::from_config(config, client, checkpoints.clone(), root)?;

    let logger = match events {
        Some(path) => {
            let bus = create_event_bus();
            let handle = spawn_event_logger(&bus, path)?;
            pipeline = pipeline.with_events(Arc::clone(&bus));
            Some(handle)
        }
        None => None,
    };

    let outcome = pipeline.run(prefs).await;

    // Dropping the pipeline closes the bus so the logger can drain and exit
    drop(pipeline);
    if let Some(handle) = logger {
        handle.await.context("Event logger task failed")?;
    }
    let _ = checkpoints.shutdown().await;

    let state = outcome?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state)?),
        OutputFormat::Text => print_state(&state),
    }
    Ok(())
}

fn cmd_check(config: &Config, prefs_path: &Path, recipe_path: &Path, format: OutputFormat) -> Result<()> {
    debug!(?prefs_path, ?recipe_path, "cmd_check: called");
    let prefs = UserPreferences::load(prefs_path)?;
    let content = fs::read_to_string(recipe_path)
        .with_context(|| format!("Failed to read recipe from {}", recipe_path.display()))?;
    let recipe = load_recipe(&content)
        .map_err(|reason| eyre!("Recipe in {} is not usable: {}", recipe_path.display(), reason))?;

    let book = RuleBook::from_config(&config.rules);
    let report = ValidationReport::new(evaluate(&recipe, &prefs, &book), 0, ValidationSource::Local);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("{}", recipe.name.bold());
            print_report(&report, &book);
        }
    }
    Ok(())
}

/// Read a recipe file as JSON, falling back to YAML
fn load_recipe(content: &str) -> std::result::Result<Recipe, String> {
    match parse_recipe(content) {
        StageOutput::Parsed(recipe) => Ok(recipe),
        StageOutput::Malformed { reason, .. } => {
            let recipe: Recipe = serde_yaml::from_str(content).map_err(|_| reason)?;
            match recipe.shape_problem() {
                Some(problem) => Err(problem),
                None => Ok(recipe),
            }
        }
    }
}

fn cmd_rules(config: &Config) -> Result<()> {
    debug!("cmd_rules: called");
    let book = RuleBook::from_config(&config.rules);
    for rule in Rule::ALL {
        let fix = corrective_action(rule);
        println!("{}", rule.as_str().cyan().bold());
        println!("  {}", book.describe(rule));
        println!("  {} {}", "fix:".dimmed(), fix.action);
    }
    Ok(())
}

fn print_report(report: &ValidationReport, book: &RuleBook) {
    for result in &report.results {
        let status = if result.passed() {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        println!("  {} {:<28} {}", status, result.rule.as_str(), book.describe(result.rule).dimmed());
    }
}

fn print_state(state: &PipelineState) {
    let recipe = &state.recipe;
    let status = match state.status {
        RunStatus::Completed => state.status.to_string().green(),
        RunStatus::Degraded => state.status.to_string().yellow(),
        RunStatus::Running => state.status.to_string().normal(),
    };
    println!("{} {} ({})", "Run".bold(), state.run_id.short(), status);
    println!();

    if recipe.is_empty() {
        println!("{}", "No recipe was produced.".red());
    } else {
        println!("{}", recipe.name.bold());
        if !recipe.description.is_empty() {
            println!("{}", recipe.description);
        }
        println!(
            "{} kcal, {} g protein, {}",
            recipe.calories, recipe.protein, recipe.cook_time
        );
        if state.was_edited() && state.draft.is_some() {
            println!("{}", "(revised after validation)".italic());
        }
        println!();
        println!("{}", "Ingredients".underline());
        for i in &recipe.ingredients {
            println!("  - {} {} {}", i.quantity, i.unit, i.name);
        }
        println!();
        println!("{}", "Instructions".underline());
        for (n, step) in recipe.instructions.iter().enumerate() {
            println!("  {}. {}", n + 1, step);
        }
        if !recipe.tips.is_empty() {
            println!();
            println!("{} {}", "Tip:".bold(), recipe.tips);
        }
    }

    if let Some(report) = &state.validation {
        println!();
        println!("{}", "Checks".underline());
        for result in &report.results {
            let mark = if result.passed() { "✓".green() } else { "✗".red() };
            println!("  {} {}", mark, result.rule);
        }
    }

    if !state.shopping_list.is_empty() {
        println!();
        println!("{}", "Shopping list".underline());
        for (department, items) in state.shopping_list.departments() {
            println!("  {}", department.bold());
            for item in items {
                println!("    - {} {} {}", item.quantity, item.unit, item.item);
            }
        }
    }

    if state.is_degraded() {
        println!();
        println!("{}", "Degraded stages".yellow().underline());
        for d in &state.degraded {
            println!("  {}: {}", d.stage, d.reason);
        }
    }
}
