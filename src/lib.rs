pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod handoff;
pub mod logger;
pub mod paginator;
pub mod pipeline;
pub mod record;
pub mod sink;

// Exporting types for convenience
pub use config::PipelineConfig;
pub use error::{FetchError, PipelineError};
pub use extractor::ListingExtractor;
pub use fetcher::{PageFetcher, PageSource};
pub use handoff::HandoffEnvelope;
pub use paginator::{Harvest, Paginator, StopReason};
pub use pipeline::{RunSummary, ScheduleSpec};
pub use record::{ListingRecord, RunBatch};
pub use sink::{BookStore, PostgresStore, RecordSink};
