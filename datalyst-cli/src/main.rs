//! Datalyst CLI - ask a SQLite database questions in plain language.
#![allow(clippy::print_stdout)]

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use datalyst::config::{DEFAULT_DATABASE_URL, DEFAULT_MODEL, DEFAULT_STATE_DIR, sqlite_path};
use datalyst::database::demo::create_demo_database;
use datalyst::database::{Database, SqliteDatabase};
use datalyst::providers::GeminiClient;
use datalyst::{DataAnalyst, QueryRequest, Settings};
use datalyst_cli::{ChatRepl, Evaluator, SAMPLE_CASES, render};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Datalyst - natural language to SQL
#[derive(Parser, Debug)]
#[command(name = "datalyst")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Database URL (`sqlite:///path` or a bare path)
    #[arg(long, global = true, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database: String,

    /// Gemini model name
    #[arg(long, global = true, env = "MODEL_NAME", default_value = DEFAULT_MODEL)]
    model: String,

    /// Directory for session, memory and metrics files
    #[arg(long, global = true, env = "DATALYST_STATE_DIR", default_value = DEFAULT_STATE_DIR)]
    state_dir: PathBuf,

    /// Messages kept per session
    #[arg(long, global = true, env = "MAX_CONVERSATION_HISTORY")]
    max_history: Option<usize>,

    /// Restore saved state on start
    #[arg(long, global = true)]
    restore: bool,

    /// Log level when `RUST_LOG` is unset
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "INFO")]
    log_level: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat (default)
    Chat {
        /// Suggest a chart for each answer
        #[arg(long)]
        chart: bool,
    },
    /// Ask a single question
    Ask {
        /// The question
        question: String,
        /// Suggest a chart for the answer
        #[arg(long)]
        chart: bool,
    },
    /// Print the database schema
    Schema,
    /// Create the sample e-commerce database
    SetupDemo {
        /// Output file
        #[arg(long, default_value = "sample_data.db")]
        path: PathBuf,
    },
    /// Run the built-in evaluation suite
    Evaluate {
        /// Results file
        #[arg(long, default_value = "logs/evaluation_results.json")]
        output: PathBuf,
    },
}

fn init_tracing(verbose: bool, log_level: &str) {
    let filter = if verbose {
        EnvFilter::new("datalyst=debug,datalyst_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = log_level.to_lowercase();
            EnvFilter::new(format!("datalyst={level},datalyst_cli={level}"))
        })
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

async fn build_analyst(args: &Args) -> anyhow::Result<DataAnalyst> {
    let settings =
        Settings::from_env().context("Make sure your .env file has a valid GOOGLE_API_KEY")?;

    let db_path = sqlite_path(&args.database)?;
    let database = SqliteDatabase::open(&db_path)
        .with_context(|| {
            format!(
                "cannot open {} (run `datalyst setup-demo` first?)",
                db_path.display()
            )
        })?;

    let model = GeminiClient::new(settings.google_api_key.as_str())?
        .model(args.model.as_str())
        .with_temperature(settings.temperature)
        .with_max_output_tokens(settings.max_output_tokens);

    let config = settings
        .analyst_config()
        .with_max_history(args.max_history.unwrap_or(settings.max_history))
        .with_state_dir(args.state_dir.clone())
        .with_restore_on_start(args.restore);

    let analyst = DataAnalyst::builder()
        .database(database)
        .model(model)
        .config(config)
        .build()
        .await?;
    Ok(analyst)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose, &args.log_level);

    match args.command.as_ref().unwrap_or(&Command::Chat { chart: false }) {
        Command::Chat { chart } => {
            let analyst = build_analyst(&args).await?;
            let mut repl = ChatRepl::new(analyst).with_visualization(*chart);
            let outcome = repl.run().await;
            repl.into_inner().close().await;
            outcome?;
        }
        Command::Ask { question, chart } => {
            let mut analyst = build_analyst(&args).await?;
            let request = QueryRequest::new(question.as_str()).with_visualization(*chart);
            let response = analyst.query(request).await?;
            println!("{}", render::response(&response));
            analyst.close().await;
        }
        Command::Schema => {
            let db_path = sqlite_path(&args.database)?;
            let database = SqliteDatabase::open(&db_path)?;
            println!("{}", render::schema(&database.schema().await?));
        }
        Command::SetupDemo { path } => {
            println!("Creating sample database at {}...", path.display());
            let summary = create_demo_database(path)?;
            println!("{summary}");
            println!("Database setup complete.");
        }
        Command::Evaluate { output } => {
            let mut analyst = build_analyst(&args).await?;
            let mut evaluator = Evaluator::new(&mut analyst);
            let summary = evaluator.run(&SAMPLE_CASES).await?;

            for result in evaluator.results() {
                let status = if result.passed { "PASS" } else { "FAIL" };
                println!(
                    "Test {}/{}: {} [{status}] ({:.2}s)",
                    result.test_id,
                    SAMPLE_CASES.len(),
                    result.description,
                    result.response_time
                );
            }
            println!("\n{summary}");

            evaluator.save(output).await?;
            println!("Results saved to {}", output.display());
            analyst.close().await;
        }
    }

    Ok(())
}
