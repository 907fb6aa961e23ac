//! Blocking HTTP downloads with a bounded timeout and retries.

use std::thread;
use std::time::Duration;

use pfr_core::config::HttpConfig;
use pfr_util::errors::PfrError;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Shared HTTP client for metadata requests.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retries: u32,
    retry_delay: Duration,
}

impl HttpClient {
    /// Build a client from the `[http]` configuration table.
    pub fn new(config: &HttpConfig) -> Result<Self, PfrError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PfrError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            retries: config.retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// GET `url` as text. Returns `Ok(None)` on 404.
    ///
    /// Connect failures, timeouts and 5xx responses are retried with a
    /// linearly growing delay.
    pub fn get_text(&self, url: &str) -> Result<Option<String>, PfrError> {
        let mut last_err = String::new();

        for attempt in 0..=self.retries {
            if attempt > 0 {
                thread::sleep(self.retry_delay * attempt);
                tracing::debug!("retrying {url} (attempt {})", attempt + 1);
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status == StatusCode::NOT_FOUND {
                        return Ok(None);
                    }
                    if status.is_server_error() {
                        last_err = format!("HTTP {status} from {url}");
                        continue;
                    }
                    if !status.is_success() {
                        return Err(PfrError::Network {
                            message: format!("HTTP {status} fetching {url}"),
                        });
                    }
                    let text = resp.text().map_err(|e| PfrError::Network {
                        message: format!("Failed to read response from {url}: {e}"),
                    })?;
                    return Ok(Some(text));
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_err = e.to_string();
                    continue;
                }
                Err(e) => {
                    return Err(PfrError::Network {
                        message: format!("Request to {url} failed: {e}"),
                    });
                }
            }
        }

        Err(PfrError::Network {
            message: format!(
                "Failed after {} attempts for {url}: {last_err}",
                self.retries + 1
            ),
        })
    }

    /// GET `url` and decode the body as JSON. Returns `Ok(None)` on 404.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, PfrError> {
        match self.get_text(url)? {
            Some(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|e| PfrError::Network {
                    message: format!("Invalid JSON from {url}: {e}"),
                }),
            None => Ok(None),
        }
    }
}
