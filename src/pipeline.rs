//! The three pipeline steps and the policy the orchestrator schedules them with.
//!
//! Steps run in a fixed chain: `fetch_book_data` -> `create_table` ->
//! `insert_book_data`. Inside one process the batch is passed along directly;
//! across processes it travels through a handoff file.

use chrono::NaiveDate;
use log::{debug, info};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{PipelineConfig, ScheduleConfig};
use crate::error::Result;
use crate::extractor::ListingExtractor;
use crate::fetcher::PageSource;
use crate::paginator::{Paginator, StopReason};
use crate::record::RunBatch;
use crate::sink::{BookStore, RecordSink};

pub const FETCH_STEP: &str = "fetch_book_data";
pub const CREATE_TABLE_STEP: &str = "create_table";
pub const INSERT_STEP: &str = "insert_book_data";

/// Gathers up to `count` distinct listings. A page failure is logged and the
/// partial batch returned; an empty batch is rejected later by the insert step.
pub fn fetch_book_data<S: PageSource>(
    source: &S,
    extractor: &ListingExtractor,
    count: usize,
    max_pages: u32,
) -> RunBatch {
    let harvest = Paginator::new(source, extractor, max_pages).collect(count);
    match &harvest.stop {
        StopReason::TargetReached => {
            info!("Fetched {} books from {} pages", harvest.batch.len(), harvest.pages_fetched)
        }
        StopReason::FetchFailed(e) => debug!(
            "Fetch stopped early on page {}: returning {} of {} books",
            e.page(),
            harvest.batch.len(),
            count
        ),
        StopReason::PageLimit => debug!(
            "Fetch stopped at page limit: returning {} of {} books",
            harvest.batch.len(),
            count
        ),
    }
    harvest.batch
}

pub fn create_table<B: BookStore>(store: &mut B) -> Result<()> {
    RecordSink::new(store).create_table()
}

pub fn insert_book_data<B: BookStore>(store: &mut B, batch: &RunBatch) -> Result<Vec<i64>> {
    RecordSink::new(store).insert_batch(batch)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub fetched: usize,
    pub inserted: usize,
}

/// Runs all three steps once, in order, stopping at the first failure.
pub fn run_once<S: PageSource, B: BookStore>(
    source: &S,
    extractor: &ListingExtractor,
    store: &mut B,
    count: usize,
    max_pages: u32,
) -> Result<RunSummary> {
    let run_id = Uuid::new_v4();
    info!("Starting run {}", run_id);

    let batch = fetch_book_data(source, extractor, count, max_pages);
    create_table(store)?;
    let ids = insert_book_data(store, &batch)?;

    let summary = RunSummary {
        run_id,
        fetched: batch.len(),
        inserted: ids.len(),
    };
    info!("Run {} finished: {} fetched, {} inserted", run_id, summary.fetched, summary.inserted);
    Ok(summary)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSpec {
    pub task_id: String,
    pub upstream: Option<String>,
    /// Subcommand the orchestrator invokes for this step.
    pub command: Vec<String>,
}

/// Everything an external scheduler needs to run the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSpec {
    pub dag_id: String,
    pub description: String,
    pub owner: String,
    pub start_date: NaiveDate,
    pub schedule_interval_secs: u64,
    pub depends_on_past: bool,
    pub retries: u32,
    pub retry_delay_secs: u64,
    pub steps: Vec<StepSpec>,
}

impl ScheduleSpec {
    pub fn from_config(config: &PipelineConfig) -> Self {
        let schedule: &ScheduleConfig = &config.schedule;
        let count = config.target_count.to_string();
        let handoff = config.handoff_path.display().to_string();

        let steps = vec![
            StepSpec {
                task_id: FETCH_STEP.to_string(),
                upstream: None,
                command: vec!["fetch".into(), "--count".into(), count, "--out".into(), handoff.clone()],
            },
            StepSpec {
                task_id: CREATE_TABLE_STEP.to_string(),
                upstream: Some(FETCH_STEP.to_string()),
                command: vec!["create-table".into()],
            },
            StepSpec {
                task_id: INSERT_STEP.to_string(),
                upstream: Some(CREATE_TABLE_STEP.to_string()),
                command: vec!["insert".into(), "--input".into(), handoff],
            },
        ];

        ScheduleSpec {
            dag_id: schedule.dag_id.clone(),
            description: schedule.description.clone(),
            owner: schedule.owner.clone(),
            start_date: schedule.start_date,
            schedule_interval_secs: u64::from(schedule.interval_days) * 24 * 60 * 60,
            depends_on_past: schedule.depends_on_past,
            retries: schedule.retries,
            retry_delay_secs: schedule.retry_delay_minutes * 60,
            steps,
        }
    }
}
