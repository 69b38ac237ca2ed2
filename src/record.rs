use serde::{Deserialize, Serialize};

/// One book listing as shown on the results page. Every field is kept as the
/// display string the page rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub title: String,
    pub author: String,
    pub price: String,
    pub rating: String,
}

impl ListingRecord {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        price: impl Into<String>,
        rating: impl Into<String>,
    ) -> Self {
        ListingRecord {
            title: title.into(),
            author: author.into(),
            price: price.into(),
            rating: rating.into(),
        }
    }
}

/// Ordered records produced by a single run and handed whole to the sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunBatch {
    records: Vec<ListingRecord>,
}

impl RunBatch {
    pub fn new() -> Self {
        RunBatch::default()
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = ListingRecord>) {
        self.records.extend(records);
    }

    /// Keeps the first `limit` records.
    pub fn truncate(&mut self, limit: usize) {
        self.records.truncate(limit);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ListingRecord> {
        self.records.iter()
    }

    pub fn titles(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.title.as_str()).collect()
    }
}

impl From<Vec<ListingRecord>> for RunBatch {
    fn from(records: Vec<ListingRecord>) -> Self {
        RunBatch { records }
    }
}

impl FromIterator<ListingRecord> for RunBatch {
    fn from_iter<I: IntoIterator<Item = ListingRecord>>(iter: I) -> Self {
        RunBatch {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RunBatch {
    type Item = &'a ListingRecord;
    type IntoIter = std::slice::Iter<'a, ListingRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
