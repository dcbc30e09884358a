#![forbid(unsafe_code)]
//! Subscription verification against the hosted context endpoint.

use crate::error::CenterError;
use crate::http::{call_with_retry, http_agent};
use crate::NerveCenter;

#[derive(Clone, Debug)]
pub struct SubscriptionStatus {
    pub valid: bool,
    pub plan: String,
    pub valid_until: Option<String>,
}

pub(crate) struct RemoteVerifier {
    agent: ureq::Agent,
    base_url: String,
    secret: String,
}

impl RemoteVerifier {
    pub(crate) fn new(base_url: String, secret: String) -> Self {
        Self {
            agent: http_agent(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret,
        }
    }

    fn verify(&self) -> Result<SubscriptionStatus, CenterError> {
        let url = format!("{}/v1/verify", self.base_url);
        let response = call_with_retry("verify endpoint", || {
            self.agent
                .get(&url)
                .set("Authorization", &format!("Bearer {}", self.secret))
                .call()
        })?;

        Ok(SubscriptionStatus {
            valid: response
                .get("valid")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            plan: response
                .get("plan")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            valid_until: response
                .get("validUntil")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }
}

impl NerveCenter {
    pub fn verify_subscription(&self) -> Result<SubscriptionStatus, CenterError> {
        let Some(remote) = &self.remote else {
            return Err(CenterError::NotConfigured(
                "SHARED_CONTEXT_API_URL / SHARED_CONTEXT_API_SECRET are not set".to_string(),
            ));
        };
        remote.verify()
    }
}
