use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use braintrust_pack::actions::{UpsertDatasetRow, delete_dataset_row, upsert_dataset_row};
use braintrust_pack::api::BraintrustApi;
use braintrust_pack::blob::Blob;
use braintrust_pack::config::{ApiKey, ConfigLoader};
use braintrust_pack::domain::DatasetId;
use braintrust_pack::error::PackError;
use braintrust_pack::fetcher::HttpFetcher;
use braintrust_pack::output::JsonOutput;
use braintrust_pack::tables;

#[derive(Parser)]
#[command(name = "bt-pack")]
#[command(about = "Braintrust projects, datasets and experiments as tables and actions")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Get a project object by its id")]
    GetProject { id: String },
    #[command(about = "Resolve an experiment id from project and experiment names")]
    GetExperimentId { project: String, experiment: String },
    #[command(about = "Sync a table")]
    Sync(SyncArgs),
    #[command(about = "Add or update a row in a dataset")]
    UpsertRow(UpsertArgs),
    #[command(about = "Delete a row from a dataset")]
    DeleteRow(DeleteArgs),
}

#[derive(Args)]
struct SyncArgs {
    #[command(subcommand)]
    table: Table,
}

#[derive(Subcommand)]
enum Table {
    #[command(about = "List of projects")]
    Projects,
    #[command(about = "List of datasets with their project names")]
    Datasets,
    #[command(about = "List of experiments")]
    Experiments,
    #[command(about = "Scores of the latest experiment in a project")]
    ProjectScores {
        project: String,
        #[arg(long)]
        prefix: Option<String>,
    },
    #[command(about = "Score summary of one experiment")]
    ExperimentScores { experiment_id: String },
    #[command(about = "Metric summary of one experiment")]
    ExperimentMetrics { experiment_id: String },
    #[command(about = "Logged events of one experiment")]
    ExperimentLogs {
        project: String,
        experiment: String,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Args)]
struct UpsertArgs {
    #[arg(long)]
    dataset_id: String,
    #[arg(long, help = "JSON string representation of the input")]
    input: String,
    #[arg(long, help = "JSON string representation of the expected blob")]
    expected: Option<String>,
    #[arg(long, help = "JSON string representation of the metadata blob")]
    metadata: Option<String>,
    #[arg(long, help = "Row id; derived from the dataset id and input when omitted")]
    id: Option<String>,
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long)]
    enforce_valid_json: bool,
}

#[derive(Args)]
struct DeleteArgs {
    #[arg(long)]
    dataset_id: String,
    #[arg(long)]
    id: String,
}

#[derive(Serialize)]
struct RowIdResult {
    row_id: String,
}

#[derive(Serialize)]
struct DeleteResult {
    deleted: bool,
}

#[derive(Serialize)]
struct ExperimentIdResult {
    experiment_id: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<PackError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PackError) -> u8 {
    if error.is_user_facing() {
        2
    } else if error.is_remote_failure() {
        3
    } else {
        1
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let api_key = ApiKey::from_env()?;
    let api = BraintrustApi::new(HttpFetcher::new(&config, &api_key)?, &config);

    match cli.command {
        Commands::GetProject { id } => print(&api.fetch_project(&id)?),
        Commands::GetExperimentId {
            project,
            experiment,
        } => print(&ExperimentIdResult {
            experiment_id: api.resolve_experiment_id(&project, &experiment)?,
        }),
        Commands::Sync(args) => run_sync(&api, args.table),
        Commands::UpsertRow(args) => {
            let dataset_id: DatasetId = args.dataset_id.parse()?;
            let row = UpsertDatasetRow {
                input: Blob::from(args.input),
                expected: Blob::from(args.expected),
                metadata: Blob::from(args.metadata),
                id: args.id,
                tags: (!args.tags.is_empty()).then_some(args.tags),
                enforce_valid_json: args.enforce_valid_json,
            };
            let row_id = upsert_dataset_row(&api, &dataset_id, &row)?;
            print(&RowIdResult { row_id })
        }
        Commands::DeleteRow(args) => {
            let dataset_id: DatasetId = args.dataset_id.parse()?;
            let deleted = delete_dataset_row(&api, &dataset_id, &args.id)?;
            print(&DeleteResult { deleted })
        }
    }
}

fn run_sync(api: &BraintrustApi<HttpFetcher>, table: Table) -> miette::Result<()> {
    match table {
        Table::Projects => print(&tables::sync_projects(api)?),
        Table::Datasets => print(&tables::sync_datasets(api)?),
        Table::Experiments => print(&tables::sync_experiments(api)?),
        Table::ProjectScores { project, prefix } => print(&tables::sync_project_scores(
            api,
            &project,
            prefix.as_deref(),
        )?),
        Table::ExperimentScores { experiment_id } => {
            print(&tables::sync_experiment_scores(api, &experiment_id)?)
        }
        Table::ExperimentMetrics { experiment_id } => {
            print(&tables::sync_experiment_metrics(api, &experiment_id)?)
        }
        Table::ExperimentLogs {
            project,
            experiment,
            limit,
        } => print(&tables::sync_experiment_logs(
            api,
            &project,
            &experiment,
            limit,
        )?),
    }
}

fn print<T: Serialize>(value: &T) -> miette::Result<()> {
    JsonOutput::print_json(value).into_diagnostic()
}
