use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use log::debug;

use crate::config::SelectorConfig;
use crate::error::PipelineError;
use crate::record::ListingRecord;

pub struct ListingExtractor {
    container: Selector,
    title: Selector,
    author: Selector,
    price: Selector,
    rating: Selector,
}

impl ListingExtractor {
    pub fn new(config: &SelectorConfig) -> Result<Self, PipelineError> {
        Ok(ListingExtractor {
            container: parse_selector(&config.container)?,
            title: parse_selector(&config.title)?,
            author: parse_selector(&config.author)?,
            price: parse_selector(&config.price)?,
            rating: parse_selector(&config.rating)?,
        })
    }

    /// Pulls complete listings out of one results page. Titles already in
    /// `seen` are dropped, new ones are added to it.
    pub fn extract(&self, html: &str, seen: &mut HashSet<String>) -> Vec<ListingRecord> {
        let document = Html::parse_document(html);
        let mut records = Vec::new();
        let mut incomplete = 0usize;

        for container in document.select(&self.container) {
            let fields = (
                first_text(&container, &self.title),
                first_text(&container, &self.author),
                first_text(&container, &self.price),
                first_text(&container, &self.rating),
            );

            let (title, author, price, rating) = match fields {
                (Some(t), Some(a), Some(p), Some(r)) => (t, a, p, r),
                _ => {
                    incomplete += 1;
                    continue;
                }
            };

            if !seen.insert(title.clone()) {
                debug!("Skipping duplicate title: {}", title);
                continue;
            }

            records.push(ListingRecord { title, author, price, rating });
        }

        if incomplete > 0 {
            debug!("Skipped {} incomplete result items", incomplete);
        }
        records
    }
}

fn parse_selector(raw: &str) -> Result<Selector, PipelineError> {
    Selector::parse(raw).map_err(|e| PipelineError::Selector {
        selector: raw.to_string(),
        reason: format!("{:?}", e),
    })
}

fn first_text(container: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    container
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, author: &str, price: &str, rating: &str) -> String {
        format!(
            r#"<div class="s-result-item">
                 <h2><span class="a-size-medium a-text-normal">{title}</span></h2>
                 <a class="a-size-base a-link-normal">{author}</a>
                 <span class="a-price"><span class="a-price-whole">{price}</span></span>
                 <i><span class="a-icon-alt">{rating}</span></i>
               </div>"#
        )
    }

    fn page(items: &[String]) -> String {
        format!("<html><body><div class=\"s-main-slot\">{}</div></body></html>", items.join(""))
    }

    fn extractor() -> ListingExtractor {
        ListingExtractor::new(&SelectorConfig::default()).unwrap()
    }

    #[test]
    fn test_extracts_trimmed_fields() {
        let html = page(&[item("  Designing Data-Intensive Applications \n", " Martin Kleppmann ", "38.", "4.8 out of 5 stars")]);
        let mut seen = HashSet::new();
        let records = extractor().extract(&html, &mut seen);

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0],
            ListingRecord::new(
                "Designing Data-Intensive Applications",
                "Martin Kleppmann",
                "38.",
                "4.8 out of 5 stars"
            )
        );
        assert!(seen.contains("Designing Data-Intensive Applications"));
    }

    #[test]
    fn test_skips_items_missing_a_field() {
        let no_price = r#"<div class="s-result-item">
                <span class="a-text-normal">Fundamentals of Data Engineering</span>
                <a class="a-size-base">Joe Reis</a>
                <span class="a-icon-alt">4.7 out of 5 stars</span>
            </div>"#
            .to_string();
        let html = page(&[no_price, item("B", "Author B", "20.", "4.0 out of 5 stars")]);

        let records = extractor().extract(&html, &mut HashSet::new());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "B");
    }

    #[test]
    fn test_duplicate_titles_within_page_are_dropped() {
        let html = page(&[
            item("A", "First", "10.", "4.0 out of 5 stars"),
            item("A", "Second", "11.", "3.0 out of 5 stars"),
            item("B", "Third", "12.", "5.0 out of 5 stars"),
        ]);
        let records = extractor().extract(&html, &mut HashSet::new());

        assert_eq!(records.iter().map(|r| r.title.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(records[0].author, "First");
    }

    #[test]
    fn test_titles_seen_on_earlier_pages_are_dropped() {
        let mut seen = HashSet::new();
        seen.insert("A".to_string());
        let html = page(&[item("A", "x", "1.", "1"), item("a", "y", "2.", "2")]);

        let records = extractor().extract(&html, &mut seen);
        // exact, case-sensitive match
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "a");
    }

    #[test]
    fn test_page_without_results() {
        let records = extractor().extract("<html><body><p>No results</p></body></html>", &mut HashSet::new());
        assert!(records.is_empty());
    }

    #[test]
    fn test_invalid_selector() {
        let config = SelectorConfig {
            title: "span[".to_string(),
            ..SelectorConfig::default()
        };
        assert!(matches!(
            ListingExtractor::new(&config),
            Err(PipelineError::Selector { .. })
        ));
    }
}
