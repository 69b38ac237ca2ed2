use book_etl_lib::{handoff, logger, pipeline};
use book_etl_lib::{HandoffEnvelope, ListingExtractor, PageFetcher, PipelineConfig, PostgresStore, ScheduleSpec};

use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "book_etl",
    about = "Fetch book listings and store them in Postgres, one step per subcommand"
)]
struct Cli {
    /// JSON pipeline config; built-in defaults are used when omitted
    #[arg(long, global = true, env = "BOOK_ETL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape listings and write them to the handoff file
    Fetch {
        #[arg(long)]
        count: Option<usize>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Create the destination table if it does not exist
    CreateTable,
    /// Insert the handed-off listings row by row
    Insert {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Run fetch, create-table and insert once, in order
    Run {
        #[arg(long)]
        count: Option<usize>,
    },
    /// Print the schedule and step chain for the orchestrator as JSON
    Describe,
}

fn main() -> Result<(), Box<dyn Error>> {
    logger::init();
    let cli = Cli::parse();
    let config = PipelineConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Fetch { count, out } => {
            let fetcher = PageFetcher::new(&config.fetch)?;
            let extractor = ListingExtractor::new(&config.selectors)?;
            let count = count.unwrap_or(config.target_count);

            let batch = pipeline::fetch_book_data(&fetcher, &extractor, count, config.max_pages);
            let path = out.unwrap_or_else(|| config.handoff_path.clone());
            handoff::write_handoff(&path, &HandoffEnvelope::new(batch))?;
        }
        Command::CreateTable => {
            let mut store = connect(&config)?;
            pipeline::create_table(&mut store)?;
        }
        Command::Insert { input } => {
            let path = input.unwrap_or_else(|| config.handoff_path.clone());
            let envelope = handoff::read_handoff(&path)?;
            let mut store = connect(&config)?;
            pipeline::insert_book_data(&mut store, &envelope.records)?;
        }
        Command::Run { count } => {
            let fetcher = PageFetcher::new(&config.fetch)?;
            let extractor = ListingExtractor::new(&config.selectors)?;
            let mut store = connect(&config)?;
            let count = count.unwrap_or(config.target_count);

            let summary = pipeline::run_once(&fetcher, &extractor, &mut store, count, config.max_pages)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Describe => {
            let spec = ScheduleSpec::from_config(&config);
            println!("{}", serde_json::to_string_pretty(&spec)?);
        }
    }

    Ok(())
}

fn connect(config: &PipelineConfig) -> Result<PostgresStore, Box<dyn Error>> {
    let conn_str = config.resolve_connection()?;
    info!("Connecting with profile '{}'", config.connection_profile);
    Ok(PostgresStore::connect(&conn_str, &config.table)?)
}
