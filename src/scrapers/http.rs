//! The HTTP seam used by the sheet fetcher.
//!
//! [`FetchText`] is the only thing the fetcher knows about the network, so
//! tests can swap [`HttpClient`] for an in-memory table of canned responses.

use reqwest::Client;
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Status and decoded body of one GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub status: u16,
    pub body: String,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// HTTP 200 with at least one comma or newline; rejects most error pages.
    pub fn is_usable_csv(&self) -> bool {
        self.status == 200 && (self.body.contains(',') || self.body.contains('\n'))
    }
}

/// Trait for fetching a URL as text.
pub trait FetchText {
    /// GET `url`, giving up after `timeout`.
    ///
    /// Non-2xx responses are returned as values; only transport failures
    /// are errors.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Fetched, Box<dyn Error>>;
}

/// [`FetchText`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

impl FetchText for HttpClient {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Fetched, Box<dyn Error>> {
        let t0 = Instant::now();
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(
            status,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "GET finished"
        );
        Ok(Fetched { status, body })
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Canned responses keyed by exact URL; any other URL fails like a refused connection.
    #[derive(Debug, Default)]
    pub struct FakeWeb {
        pages: HashMap<String, Fetched>,
        pub requests: RefCell<Vec<String>>,
    }

    impl FakeWeb {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, status: u16, body: &str) -> Self {
            self.pages.insert(
                url.to_string(),
                Fetched {
                    status,
                    body: body.to_string(),
                },
            );
            self
        }

        pub fn was_requested(&self, url: &str) -> bool {
            self.requests.borrow().iter().any(|u| u == url)
        }
    }

    impl FetchText for FakeWeb {
        async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Fetched, Box<dyn Error>> {
            self.requests.borrow_mut().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| format!("connection refused: {url}").into())
        }
    }
}
