//! Outbound submission of a validated dataset.
//!
//! One attempt is exactly one `POST` of the dataset as a JSON array. There is
//! no retry: a failed attempt is reported and the caller decides whether to
//! submit again.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fieldmap::{Config, Submitter};
//!
//! let submitter = Submitter::from_config(&Config::from_env()?)?;
//! let outcome = submitter.submit(&dataset).await;
//! println!("{}", outcome);
//! ```

use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

use crate::api::logs::{log_error, log_info, log_success};
use crate::config::{validate_endpoint, Config};
use crate::error::{ConfigError, SubmitError};
use crate::models::{Dataset, SubmissionOutcome};

/// HTTP client bound to the configured endpoint
#[derive(Clone)]
pub struct Submitter {
    client: reqwest::Client,
    endpoint: String,
}

impl Submitter {
    /// Create a submitter for `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let endpoint = endpoint.into();
        validate_endpoint(&endpoint)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(config.endpoint.clone(), config.request_timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send the dataset and report the terminal outcome.
    ///
    /// An empty dataset fails with `no data` before any connection is made.
    pub async fn submit(&self, dataset: &Dataset) -> SubmissionOutcome {
        match self.send(dataset).await {
            Ok(()) => SubmissionOutcome::Succeeded,
            Err(e) => SubmissionOutcome::Failed(e),
        }
    }

    /// Single POST attempt.
    pub async fn send(&self, dataset: &Dataset) -> Result<(), SubmitError> {
        if dataset.is_empty() {
            log_error("No data to submit");
            return Err(SubmitError::NoDataToSubmit);
        }

        log_info(format!("Submitting {} records to {}", dataset.len(), self.endpoint));

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(dataset)
            .send()
            .await
            .map_err(|e| {
                log_error(format!("Transport error: {}", e));
                SubmitError::TransportError(e.to_string())
            })?;

        let status = response.status();
        tracing::debug!(%status, endpoint = %self.endpoint, "submission response");

        if !status.is_success() {
            log_error(format!("Endpoint rejected the submission: HTTP {}", status));
            return Err(SubmitError::RequestRejected { status: status.as_u16() });
        }

        log_success(format!("Endpoint accepted {} records (HTTP {})", dataset.len(), status));
        Ok(())
    }
}
