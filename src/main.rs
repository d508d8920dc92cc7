// flowsense - learns when you run your workflows and suggests the next one
//
// This is the main entry point. Parses CLI args and dispatches to handlers.

use anyhow::{anyhow, bail, Context as _};
use flowsense_lib::{
    config::DATA_DIR,
    core::{ActionLog, InteractionStore, WorkflowCatalog},
    db::{DetectedIntent, PredictionFeedback, UserInteraction},
    intelligence::{ContextDetector, InteractionContext, PredictiveModel},
    Database, FlowsenseError, ModelConfig,
};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let command = &args[1];

    let result = match command.as_str() {
        "record" => handle_record(&args[2..]).await,
        "predict" => handle_predict(&args[2..]).await,
        "opportunities" => handle_opportunities(&args[2..]).await,
        "feedback" => handle_feedback(&args[2..]).await,
        "stats" => handle_stats().await,
        "version" | "-v" | "--version" => {
            println!("flowsense v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        _ => {
            print_usage();
            Err(anyhow!("Unknown command: {}", command))
        }
    };

    // Library errors get the friendly message; the rest bubble up as-is
    if let Err(err) = &result {
        if let Some(flowsense_err) = err.downcast_ref::<FlowsenseError>() {
            eprintln!("✗ {}", flowsense_err.user_message());
            std::process::exit(1);
        }
    }

    result
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn handle_record(args: &[String]) -> anyhow::Result<()> {
    let mut workflow_id: Option<String> = None;
    let mut hour: Option<u32> = None;
    let mut success = true;
    let mut duration = 0.0;
    let mut intent = "run_workflow".to_string();
    let mut app: Option<String> = None;
    let mut project: Option<String> = None;
    let mut rating: Option<u8> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--hour" => {
                i += 1;
                hour = Some(parse_hour(args.get(i))?);
            }
            "--failed" => success = false,
            "--duration" => {
                i += 1;
                duration = parse_duration(args.get(i))?;
            }
            "--intent" => {
                i += 1;
                if let Some(value) = args.get(i) {
                    intent = value.clone();
                }
            }
            "--app" => {
                i += 1;
                app = args.get(i).cloned();
            }
            "--project" => {
                i += 1;
                project = args.get(i).cloned();
            }
            "--rating" => {
                i += 1;
                rating = Some(parse_rating(args.get(i))?);
            }
            flag if flag.starts_with("--") => bail!("Unknown option for record: {}", flag),
            arg => workflow_id = Some(arg.to_string()),
        }
        i += 1;
    }

    let Some(workflow_id) = workflow_id else {
        bail!("No workflow id provided. Usage: flowsense record <workflow-id> [options]");
    };

    let mut context = current_context(hour)?;
    context.active_application = app;
    if let Some(project) = project {
        context.project_type = project.parse().ok();
    }

    let db = Arc::new(get_database().await?);
    let store = InteractionStore::rehydrate(Arc::clone(&db)).await?;
    context.recent_workflows = store
        .recent(5)
        .await
        .into_iter()
        .filter_map(|i| i.workflow_id)
        .collect();

    let mut interaction = UserInteraction::workflow_run(workflow_id.clone(), context)
        .with_success(success)
        .with_duration(duration);
    interaction.intent = DetectedIntent::new(intent, 1.0);
    interaction.feedback_rating = rating;

    store.save(interaction).await?;
    println!("✓ Recorded run of '{}'", workflow_id);

    Ok(())
}

async fn handle_predict(args: &[String]) -> anyhow::Result<()> {
    let mut hour: Option<u32> = None;
    let mut catalog_path: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--hour" => {
                i += 1;
                hour = Some(parse_hour(args.get(i))?);
            }
            "--catalog" => {
                i += 1;
                catalog_path = Some(PathBuf::from(flag_value("--catalog", args.get(i))?));
            }
            other => bail!("Unknown option for predict: {}", other),
        }
        i += 1;
    }

    let db = Arc::new(get_database().await?);
    let model = load_model(Arc::clone(&db)).await?;

    let catalog_path = match catalog_path {
        Some(path) => path,
        None => data_dir()?.join("workflows.json"),
    };
    let workflows = WorkflowCatalog::load_or_infer(&catalog_path, &db).await?;

    let mut context = current_context(hour)?;
    context.recent_workflows = model
        .store()
        .recent(5)
        .await
        .into_iter()
        .filter_map(|i| i.workflow_id)
        .collect();

    let predictions = model.predict_workflows(&context, &workflows).await;
    let threshold = model.confidence_threshold().await;

    if predictions.is_empty() {
        println!(
            "No workflow clears the {:.0}% confidence bar right now.",
            threshold * 100.0
        );
        return Ok(());
    }

    println!("\nSuggested workflows for {:02}:00", context.hour_of_day);
    println!("{}", "=".repeat(60));
    for (i, prediction) in predictions.iter().enumerate() {
        println!(
            "\n{}. {} (confidence: {:.0}%)",
            i + 1,
            prediction.workflow_name,
            prediction.confidence * 100.0
        );
        println!("   {}", prediction.reasoning);
        if let Some(temporal) = &prediction.temporal_context {
            println!("   {}", temporal);
        }
        if !prediction.contextual_factors.is_empty() {
            println!("   factors: {}", prediction.contextual_factors.join(", "));
        }
    }
    println!("\n{}", "=".repeat(60));
    println!("Tell flowsense how it did: flowsense feedback <workflow-id> accept|reject");

    Ok(())
}

async fn handle_opportunities(args: &[String]) -> anyhow::Result<()> {
    let Some(path) = args.first() else {
        bail!("No action log provided. Usage: flowsense opportunities <file>");
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read action log {}", path))?;
    let log = ActionLog::from_lines(&text);

    let db = Arc::new(get_database().await?);
    let model = load_model(db).await?;
    let opportunities = model.identify_automation_opportunities(log.actions()).await;

    if opportunities.is_empty() {
        println!("No repeated sequences worth automating in {} actions.", log.len());
        return Ok(());
    }

    println!("\nAutomation opportunities");
    println!("{}", "=".repeat(60));
    for (i, opportunity) in opportunities.iter().enumerate() {
        println!(
            "\n{}. {} (seen {} times, confidence: {:.0}%)",
            i + 1,
            opportunity.suggested_workflow_name,
            opportunity.frequency,
            opportunity.confidence * 100.0
        );
        println!("   Sequence: {}", opportunity.action_sequence.join(" → "));
        println!(
            "   Would have saved about {:.0}s",
            opportunity.estimated_time_saving_secs
        );
    }
    println!("\n{}", "=".repeat(60));

    Ok(())
}

async fn handle_feedback(args: &[String]) -> anyhow::Result<()> {
    let (Some(prediction_id), Some(verdict)) = (args.first(), args.get(1)) else {
        bail!("Usage: flowsense feedback <workflow-id> accept|reject");
    };

    let accepted = match verdict.as_str() {
        "accept" | "yes" | "y" => true,
        "reject" | "no" | "n" => false,
        other => bail!("Expected accept or reject, got '{}'", other),
    };

    let db = Arc::new(get_database().await?);
    let model = load_model(db).await?;
    let before = model.confidence_threshold().await;

    model
        .record_feedback(PredictionFeedback::new(prediction_id.clone(), accepted))
        .await?;

    let after = model.confidence_threshold().await;
    println!(
        "✓ Feedback recorded. Confidence bar: {:.0}% → {:.0}%",
        before * 100.0,
        after * 100.0
    );

    Ok(())
}

async fn handle_stats() -> anyhow::Result<()> {
    let db = Arc::new(get_database().await?);
    let db_stats = db.stats().await?;
    let model = load_model(db).await?;
    let stats = model.statistics().await;

    println!("\nflowsense Status");
    println!("{}", "=".repeat(60));
    println!("  Interactions:       {}", db_stats.total_interactions);
    println!("  Feedback:           {}", stats.total_feedback);
    println!("    accepted:         {}", stats.accepted);
    println!("    rejected:         {}", stats.rejected);
    println!("  Acceptance rate:    {:.0}%", stats.acceptance_rate * 100.0);
    println!("  Recent acceptance:  {:.0}%", stats.window_acceptance_rate * 100.0);
    println!("  Confidence bar:     {:.0}%", stats.confidence_threshold * 100.0);
    println!("{}", "=".repeat(60));

    Ok(())
}

fn current_context(hour: Option<u32>) -> anyhow::Result<InteractionContext> {
    let cwd = env::current_dir()?;
    let mut context = ContextDetector::detect(&cwd);

    if let Some(hour) = hour {
        context.hour_of_day = hour;
    }

    Ok(context)
}

fn flag_value<'a>(flag: &str, value: Option<&'a String>) -> anyhow::Result<&'a str> {
    match value {
        Some(value) if !value.starts_with("--") => Ok(value.as_str()),
        _ => bail!("{} needs a value", flag),
    }
}

fn parse_flag<T>(flag: &str, value: Option<&String>) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = flag_value(flag, value)?;
    raw.parse()
        .map_err(|e| anyhow!("Invalid value '{}' for {}: {}", raw, flag, e))
}

fn parse_hour(value: Option<&String>) -> anyhow::Result<u32> {
    let hour: u32 = parse_flag("--hour", value)?;
    if hour > 23 {
        bail!("--hour must be between 0 and 23, got {}", hour);
    }
    Ok(hour)
}

fn parse_duration(value: Option<&String>) -> anyhow::Result<f64> {
    let secs: f64 = parse_flag("--duration", value)?;
    if !secs.is_finite() || secs < 0.0 {
        bail!("--duration must be a non-negative number of seconds, got {}", secs);
    }
    Ok(secs)
}

fn parse_rating(value: Option<&String>) -> anyhow::Result<u8> {
    let rating: u8 = parse_flag("--rating", value)?;
    if !(1..=5).contains(&rating) {
        bail!("--rating must be between 1 and 5, got {}", rating);
    }
    Ok(rating)
}

async fn load_model(db: Arc<Database>) -> anyhow::Result<PredictiveModel> {
    let config = ModelConfig::load()?;
    let store = InteractionStore::rehydrate(Arc::clone(&db)).await?;
    Ok(PredictiveModel::restore(store, config, db).await?)
}

fn data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(DATA_DIR))
}

async fn get_database() -> anyhow::Result<Database> {
    Ok(Database::new(data_dir()?.join("history.db")).await?)
}

fn print_usage() {
    println!(
        r#"flowsense v{} - suggests your next workflow before you ask

USAGE:
    flowsense <COMMAND> [OPTIONS]

COMMANDS:
    record <workflow-id>        Record a workflow run
        --hour H                  Override the hour of day (0-23)
        --failed                  Mark the run as failed
        --duration S              Run time in seconds
        --intent T                Detected intent type
        --app A                   Active application
        --project P               Project type (rust, node, python, ...)
        --rating N                Feedback rating 1-5
    predict                     Suggest workflows for right now
        --hour H                  Predict for a different hour
        --catalog FILE            Workflow catalog (JSON array)
    opportunities <file>        Find repeated actions worth automating
    feedback <id> accept|reject Tell flowsense whether a suggestion helped
    stats                       Show feedback and threshold stats
    version                     Show version
    help                        Show this help

EXAMPLES:
    flowsense record morning-standup
    flowsense predict --hour 9
    flowsense opportunities ~/.bash_history
    flowsense feedback morning-standup accept

Set RUST_LOG=debug to see what the model is doing.
"#,
        env!("CARGO_PKG_VERSION")
    );
}
