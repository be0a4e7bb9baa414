//! Metrics sampling: one HTTP GET against the client node's monitoring
//! endpoint, and extraction of the sync-progress marker from the
//! Prometheus-style text exposition.

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::debug;

/// Metric the gate watches: how far the node's local state sync has
/// progressed.
pub const STATE_MARKER_METRIC: &str = "papyrus_state_marker";

/// A `papyrus_state_marker` line was found but its value could not be read.
///
/// Fatal for the run; extraction never retries or skips a bad line.
#[derive(Debug, Error)]
pub enum MarkerError {
    /// The metric line carries no value token after the name.
    #[error("metric line `{line}` has no value token")]
    MissingValue { line: String },
    /// The trailing token is not an integer.
    #[error("metric value `{token}` is not an integer")]
    NotAnInteger {
        token: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Fetch the full metrics exposition from `url`.
///
/// One GET, no retry, no timeout beyond the client defaults. The body is
/// returned whatever the HTTP status: a non-200 page simply fails marker
/// extraction downstream. Transport errors are fatal.
pub async fn fetch_metrics(url: &str) -> Result<String> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("failed to query metrics endpoint {url}"))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .with_context(|| format!("failed to read metrics body from {url}"))?;

    debug!(url, status = %status, bytes = body.len(), "fetched metrics");
    Ok(body)
}

/// Extract the state marker from a metrics exposition.
///
/// Scans for the first line whose first whitespace-separated token is
/// exactly [`STATE_MARKER_METRIC`] and parses that line's trailing token as
/// an integer. Returns `Ok(None)` when no line matches; the caller decides
/// what absence means. A matching line with an unreadable value is an
/// error, never an absence.
pub fn extract_state_marker(body: &str) -> Result<Option<i64>, MarkerError> {
    for line in body.lines() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some(STATE_MARKER_METRIC) {
            continue;
        }

        let token = match tokens.last() {
            Some(token) => token,
            None => {
                return Err(MarkerError::MissingValue {
                    line: line.to_owned(),
                });
            }
        };

        let marker = token.parse::<i64>().map_err(|source| MarkerError::NotAnInteger {
            token: token.to_owned(),
            source,
        })?;
        return Ok(Some(marker));
    }

    Ok(None)
}
