use std::collections::HashSet;
use log::{info, warn};

use crate::error::FetchError;
use crate::extractor::ListingExtractor;
use crate::fetcher::PageSource;
use crate::record::RunBatch;

#[derive(Debug)]
pub enum StopReason {
    TargetReached,
    FetchFailed(FetchError),
    PageLimit,
}

#[derive(Debug)]
pub struct Harvest {
    pub batch: RunBatch,
    pub stop: StopReason,
    pub pages_fetched: u32,
}

impl Harvest {
    pub fn is_partial(&self) -> bool {
        !matches!(self.stop, StopReason::TargetReached)
    }
}

pub struct Paginator<'a, S: PageSource> {
    source: &'a S,
    extractor: &'a ListingExtractor,
    max_pages: u32,
}

impl<'a, S: PageSource> Paginator<'a, S> {
    pub fn new(source: &'a S, extractor: &'a ListingExtractor, max_pages: u32) -> Self {
        Paginator { source, extractor, max_pages }
    }

    /// Walks result pages from 1 until `target` distinct listings are
    /// gathered, a page fails to load, or the page cap is hit. A failed page
    /// ends the walk without an error; whatever was gathered is returned.
    pub fn collect(&self, target: usize) -> Harvest {
        let mut batch = RunBatch::new();
        let mut seen = HashSet::new();
        let mut page = 1u32;
        let mut pages_fetched = 0u32;

        let stop = loop {
            if batch.len() >= target {
                break StopReason::TargetReached;
            }
            if page > self.max_pages {
                warn!("Page limit of {} reached with {} of {} books", self.max_pages, batch.len(), target);
                break StopReason::PageLimit;
            }

            match self.source.fetch_page(page) {
                Ok(html) => {
                    pages_fetched += 1;
                    let records = self.extractor.extract(&html, &mut seen);
                    info!("Page {} yielded {} new books", page, records.len());
                    batch.extend(records);
                    page += 1;
                }
                Err(e) => {
                    warn!("Failed to retrieve the page: {}. Stopping with {} books.", e, batch.len());
                    break StopReason::FetchFailed(e);
                }
            }
        };

        batch.truncate(target);
        Harvest { batch, stop, pages_fetched }
    }
}
