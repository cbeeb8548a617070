//! Quarry CLI - command-line access to hosted search indexes

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use quarry_core::{PageSource, Record};
use quarry_rs::{Browser, Config, RequestOptions, SearchClient, TaskId};
use serde_json::Value;
use std::path::{Path, PathBuf};

mod telemetry;

#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(about = "Query and manage hosted search indexes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path; QUARRY_* environment variables are used when it is missing
    #[arg(short, long, value_name = "FILE", global = true, default_value = "quarry.json")]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write JSON logs to this directory
    #[arg(long, value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a full-text query
    Search { index: String, query: String },
    /// Fetch one object by objectID
    Get { index: String, object_id: String },
    /// Add or replace the objects in a JSON array file
    Save {
        index: String,
        file: PathBuf,
        /// Wait until the write is published
        #[arg(long)]
        wait: bool,
    },
    /// Delete objects by objectID
    Delete {
        index: String,
        #[arg(required = true)]
        object_ids: Vec<String>,
        #[arg(long)]
        wait: bool,
    },
    /// Print every object, rule or synonym as one JSON line each
    Browse {
        index: String,
        #[arg(long, value_enum, default_value_t = BrowseKind::Objects)]
        kind: BrowseKind,
    },
    /// Show, or wait for, the status of a task
    Task {
        index: String,
        task_id: u64,
        #[arg(long)]
        wait: bool,
        /// Status query budget when waiting
        #[arg(long, value_name = "N")]
        max_attempts: Option<u32>,
    },
    /// Print the index settings
    Settings { index: String },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum BrowseKind {
    Objects,
    Rules,
    Synonyms,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = telemetry::init_telemetry(cli.verbose, cli.log_dir.as_deref())?;

    let config = load_config(&cli.config)?;
    tracing::debug!("quarry starting");
    tracing::debug!("  App id: {}", config.app_id);
    tracing::debug!("  Read host: {}", config.read_host());
    tracing::debug!("  Write host: {}", config.write_host());
    tracing::debug!(
        "  Timeouts: connect={}s, read={}s, write={}s",
        config.connect_timeout_secs,
        config.read_timeout_secs,
        config.write_timeout_secs
    );

    let client = SearchClient::new(&config).context("Failed to create search client")?;
    run(&client, cli.command).await
}

/// Load `path` when it exists, otherwise build the config from the environment
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let path_str = path
            .to_str()
            .with_context(|| format!("Config path is not valid UTF-8: {}", path.display()))?;
        return Ok(Config::load_with_env(path_str)?);
    }

    tracing::debug!("{} not found, reading configuration from environment", path.display());
    Config::from_env().context("No config file and QUARRY_APP_ID / QUARRY_API_KEY are not set")
}

async fn run(client: &SearchClient, command: Commands) -> Result<()> {
    let options = RequestOptions::new();

    match command {
        Commands::Search { index, query } => {
            let response = client.init_index(index).search(&query, &options).await?;
            print_json(&response)
        }
        Commands::Get { index, object_id } => {
            let object: Record = client
                .init_index(index)
                .get_object(&object_id, &options)
                .await?;
            print_json(&object)
        }
        Commands::Save { index, file, wait } => {
            let records = read_records(&file)?;
            let index = client.init_index(index);
            let response = index.save_objects(&records, &options).await?;
            tracing::info!(
                "Saved {} objects (task {})",
                response.object_ids.len(),
                response.task_id
            );
            if wait {
                index.wait_task(response.task_id, &options).await?;
            }
            print_json(&response)
        }
        Commands::Delete {
            index,
            object_ids,
            wait,
        } => {
            let ids: Vec<&str> = object_ids.iter().map(String::as_str).collect();
            let index = client.init_index(index);
            let response = index.delete_objects(&ids, &options).await?;
            if wait {
                index.wait_task(response.task_id, &options).await?;
            }
            print_json(&response)
        }
        Commands::Browse { index, kind } => {
            let index = client.init_index(index);
            let count = match kind {
                BrowseKind::Objects => print_lines(index.browse(&options)?).await?,
                BrowseKind::Rules => print_lines(index.browse_rules(&options)).await?,
                BrowseKind::Synonyms => print_lines(index.browse_synonyms(&options)).await?,
            };
            tracing::info!("Browsed {} {:?} from {}", count, kind, index.name());
            Ok(())
        }
        Commands::Task {
            index,
            task_id,
            wait,
            max_attempts,
        } => {
            let index = client.init_index(index);
            let task_id = TaskId(task_id);
            let status = match (wait, max_attempts) {
                (false, _) => index.get_task(task_id, &options).await?,
                (true, None) => index.wait_task(task_id, &options).await?,
                (true, Some(n)) => index.wait_task_with_attempts(task_id, n, &options).await?,
            };
            print_json(&status)
        }
        Commands::Settings { index } => {
            let settings = client.init_index(index).get_settings(&options).await?;
            print_json(&settings)
        }
    }
}

/// Records from a file holding a JSON array of objects
fn read_records(path: &Path) -> Result<Vec<Value>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    match value {
        Value::Array(records) => Ok(records),
        _ => bail!("{} must contain a JSON array of objects", path.display()),
    }
}

/// Print each browsed item as one JSON line
async fn print_lines<S>(browser: Browser<S>) -> Result<usize>
where
    S: PageSource<Item = Record> + 'static,
    S::Cursor: 'static,
{
    let mut items = Box::pin(browser.into_stream());
    let mut count = 0;
    while let Some(item) = items.next().await {
        println!("{}", serde_json::to_string(&item?)?);
        count += 1;
    }
    Ok(count)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
