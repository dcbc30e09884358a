#![forbid(unsafe_code)]
//! Outbound HTTP policy: bounded timeout, exponential retry on 5xx only.

use std::time::Duration;

use crate::error::CenterError;

pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const BACKOFF_SECS: [u64; 3] = [1, 2, 4];

pub(crate) fn http_agent() -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build()
}

/// Runs `attempt` until it succeeds, fails with a non-retryable status, or
/// exhausts the backoff ladder. 4xx is never retried.
pub(crate) fn call_with_retry(
    what: &'static str,
    attempt: impl Fn() -> Result<ureq::Response, ureq::Error>,
) -> Result<serde_json::Value, CenterError> {
    let mut tries = 0usize;
    loop {
        match attempt() {
            Ok(response) => {
                return response.into_json::<serde_json::Value>().map_err(|err| {
                    CenterError::Store(ax_storage::StoreError::Io(err))
                });
            }
            Err(ureq::Error::Status(status, response)) => {
                if (500..600).contains(&status) && tries < BACKOFF_SECS.len() {
                    let delay = BACKOFF_SECS[tries];
                    tries += 1;
                    tracing::warn!(what, status, delay, "upstream 5xx, retrying");
                    std::thread::sleep(Duration::from_secs(delay));
                    continue;
                }
                let detail = response
                    .into_string()
                    .ok()
                    .filter(|body| !body.trim().is_empty())
                    .unwrap_or_else(|| format!("{what} answered {status}"));
                return Err(classify_status(status, detail));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(CenterError::Store(ax_storage::StoreError::Io(
                    std::io::Error::new(std::io::ErrorKind::Other, err.to_string()),
                )));
            }
        }
    }
}

fn classify_status(status: u16, detail: String) -> CenterError {
    match status {
        401 | 403 => CenterError::Unauthorized(detail),
        404 => CenterError::NotFound {
            entity: "resource",
            id: detail,
        },
        429 => CenterError::RateLimited(detail),
        400..=499 => CenterError::BadRequest(detail),
        _ => CenterError::Store(ax_storage::StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            detail,
        ))),
    }
}
