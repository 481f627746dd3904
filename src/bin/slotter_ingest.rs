use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use slotter_ingest::{
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::transaction_file,
    events::{self, Event, EventSender},
    repositories::{
        IngestionStores, LocationRepository, NewTransactionFile, TransactionFileRepository,
        TransactionRecordRepository, WarehouseRepository,
    },
    services::ingestion::{IngestReport, IngestTarget, IngestionService},
};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => handle_migrate(&context).await?,
        Commands::Warehouse(command) => handle_warehouse_command(&context, command, cli.json).await?,
        Commands::Ingest(args) => handle_ingest(&context, args, cli.json).await?,
        Commands::File(command) => handle_file_command(&context, command, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "slotter-ingest",
    about = "Ingest inventory transaction files into warehouse locations and items",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    #[command(subcommand)]
    Warehouse(WarehouseCommands),
    /// Register a transaction file and ingest its rows
    Ingest(IngestArgs),
    #[command(subcommand)]
    File(FileCommands),
}

#[derive(Subcommand)]
enum WarehouseCommands {
    /// Create a warehouse for a company
    Create(CreateWarehouseArgs),
}

#[derive(Args)]
struct CreateWarehouseArgs {
    #[arg(long)]
    company: Uuid,
    #[arg(long)]
    name: String,
}

#[derive(Args)]
struct IngestArgs {
    #[arg(long)]
    company: Uuid,
    #[arg(long)]
    warehouse: Uuid,
    /// CSV or XLSX file to ingest
    path: PathBuf,
}

#[derive(Subcommand)]
enum FileCommands {
    /// Show a transaction file with its record, location and item counts
    Show {
        id: Uuid,
    },
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        if config.auto_migrate {
            db::run_migrations(&db_pool)
                .await
                .context("failed to run migrations")?;
        }
        let db = Arc::new(db_pool);

        let (event_tx, event_rx) = mpsc::channel::<Event>(config.event_channel_capacity);
        tokio::spawn(events::process_events(event_rx));

        Ok(Self {
            config,
            db,
            event_sender: EventSender::new(event_tx),
        })
    }

    fn ingestion_service(&self) -> IngestionService {
        IngestionService::new(IngestionStores::from_db(self.db.clone()), &self.config.ingest)
            .with_event_sender(self.event_sender.clone())
    }
}

async fn handle_migrate(context: &CliContext) -> Result<()> {
    db::run_migrations(&context.db)
        .await
        .context("failed to run migrations")?;
    println!("Migrations applied");
    Ok(())
}

async fn handle_warehouse_command(
    context: &CliContext,
    command: WarehouseCommands,
    json: bool,
) -> Result<()> {
    match command {
        WarehouseCommands::Create(args) => {
            let warehouse = WarehouseRepository::new(context.db.clone())
                .create(args.company, &args.name)
                .await
                .context("failed to create warehouse")?;

            if json {
                print_json(&warehouse)?;
            } else {
                println!("Created warehouse {} ({})", warehouse.name, warehouse.id);
            }
        }
    }
    Ok(())
}

async fn handle_ingest(context: &CliContext, args: IngestArgs, json: bool) -> Result<()> {
    let file_name = args
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} has no file name", args.path.display()))?;
    let bytes = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("failed to read {}", args.path.display()))?;

    let file = TransactionFileRepository::new(context.db.clone())
        .create(NewTransactionFile {
            company_id: args.company,
            warehouse_id: args.warehouse,
            file_name: file_name.clone(),
            file_path_url: args.path.display().to_string(),
        })
        .await
        .context("failed to register transaction file")?;
    info!(transaction_file_id = %file.id, "registered transaction file");

    let target = IngestTarget {
        transaction_file_id: file.id,
        company_id: args.company,
        warehouse_id: args.warehouse,
    };
    let report = context
        .ingestion_service()
        .ingest(&bytes, &file_name, target)
        .await
        .with_context(|| format!("failed to ingest {}", args.path.display()))?;

    if json {
        print_json(&IngestOutput {
            transaction_file: &file,
            report: &report,
        })?;
    } else {
        render_report(&file, &report);
    }
    Ok(())
}

async fn handle_file_command(context: &CliContext, command: FileCommands, json: bool) -> Result<()> {
    match command {
        FileCommands::Show { id } => {
            let files = TransactionFileRepository::new(context.db.clone());
            let file = files
                .find_by_id(id)
                .await?
                .ok_or_else(|| anyhow!("transaction file {} not found", id))?;

            let summary = FileSummary {
                records: TransactionRecordRepository::new(context.db.clone())
                    .count_by_transaction_file(id)
                    .await?,
                locations: files.count_locations(id).await?,
                items: files.count_items(id).await?,
                location_paths: LocationRepository::new(context.db.clone())
                    .list_by_transaction_file(id)
                    .await?
                    .into_iter()
                    .map(|l| l.location_path)
                    .collect(),
                file,
            };

            if json {
                print_json(&summary)?;
            } else {
                println!(
                    "{} ({}) • warehouse {} • {} records • {} locations • {} items",
                    summary.file.file_name,
                    summary.file.id,
                    summary.file.warehouse_id,
                    summary.records,
                    summary.locations,
                    summary.items
                );
                for path in &summary.location_paths {
                    println!("  - {}", path);
                }
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct IngestOutput<'a> {
    transaction_file: &'a transaction_file::Model,
    report: &'a IngestReport,
}

#[derive(Serialize)]
struct FileSummary {
    file: transaction_file::Model,
    records: u64,
    locations: u64,
    items: u64,
    location_paths: Vec<String>,
}

fn render_report(file: &transaction_file::Model, report: &IngestReport) {
    println!("Ingested {} ({})", file.file_name, file.id);
    println!(
        "  records created: {} of {} rows ({} skipped, {} unresolved)",
        report.records_created, report.rows_read, report.rows_skipped, report.rows_unresolved
    );
    println!(
        "  locations: {} created, {} existing",
        report.locations_created, report.locations_reused
    );
    println!(
        "  items: {} created, {} existing",
        report.items_created, report.items_reused
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
