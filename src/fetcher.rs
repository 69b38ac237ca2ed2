use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, REFERER, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;
use log::{debug, info};
use url::Url;

use crate::config::{FetchConfig, HeaderProfile};
use crate::error::{FetchError, PipelineError};

/// Anything that can hand back the raw markup of a numbered results page.
pub trait PageSource {
    fn fetch_page(&self, page: u32) -> Result<String, FetchError>;
}

pub struct PageFetcher {
    client: Client,
    endpoint: Url,
    search_term: String,
}

impl PageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, PipelineError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            PipelineError::Config(format!("invalid endpoint {:?}: {}", config.endpoint, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(header_map(&config.headers)?)
            .cookie_store(true)
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(PageFetcher {
            client,
            endpoint,
            search_term: config.search_term.clone(),
        })
    }

    /// `{endpoint}?k={search term}&page={page}`
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("k", &self.search_term)
            .append_pair("page", &page.to_string());
        url
    }
}

impl PageSource for PageFetcher {
    fn fetch_page(&self, page: u32) -> Result<String, FetchError> {
        let url = self.page_url(page);
        info!("Visiting: {}", url);

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|source| FetchError::Transport { page, source })?;

        let status = resp.status();
        if status != StatusCode::OK {
            debug!("Page {} answered {}", page, status);
            return Err(FetchError::Status { page, status: status.as_u16() });
        }

        resp.text().map_err(|source| FetchError::Transport { page, source })
    }
}

fn header_map(profile: &HeaderProfile) -> Result<HeaderMap, PipelineError> {
    let entries = [
        (REFERER, &profile.referer),
        (USER_AGENT, &profile.user_agent),
        (HeaderName::from_static("sec-ch-ua"), &profile.sec_ch_ua),
        (HeaderName::from_static("sec-ch-ua-mobile"), &profile.sec_ch_ua_mobile),
        (HeaderName::from_static("sec-ch-ua-platform"), &profile.sec_ch_ua_platform),
    ];

    let mut headers = HeaderMap::new();
    for (name, value) in entries {
        let value = HeaderValue::from_str(value).map_err(|e| {
            PipelineError::Config(format!("invalid value for header {}: {}", name, e))
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}
