#![forbid(unsafe_code)]
//! Bearer auth: raw `sk_sc_` API keys or HS256 session JWTs.

use ax_nerve::CenterError;
use axum::http::HeaderMap;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::app::AppState;

type HmacSha256 = Hmac<Sha256>;

const API_KEY_PREFIX: &str = "sk_sc_";

#[derive(Debug)]
pub(crate) struct Principal {
    pub(crate) owner_id: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// API keys never hit a user table: the owner identity is the key's
/// fingerprint, which keeps projects stable per key without a signup flow.
fn api_key_owner(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut fingerprint = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        fingerprint.push_str(&format!("{byte:02x}"));
    }
    format!("key_{fingerprint}")
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn verify_jwt(secret: &str, token: &str) -> Result<Principal, CenterError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CenterError::Unauthorized("malformed session token".to_string()));
    };

    let header_raw = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| CenterError::Unauthorized("malformed session token".to_string()))?;
    let header: serde_json::Value = serde_json::from_slice(&header_raw)
        .map_err(|_| CenterError::Unauthorized("malformed session token".to_string()))?;
    if header.get("alg").and_then(|v| v.as_str()) != Some("HS256") {
        return Err(CenterError::Unauthorized("unsupported token algorithm".to_string()));
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| CenterError::Unauthorized("malformed session token".to_string()))?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| CenterError::Unauthorized("invalid session secret".to_string()))?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| CenterError::Unauthorized("invalid session token".to_string()))?;

    let payload_raw = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| CenterError::Unauthorized("malformed session token".to_string()))?;
    let payload: serde_json::Value = serde_json::from_slice(&payload_raw)
        .map_err(|_| CenterError::Unauthorized("malformed session token".to_string()))?;

    if let Some(exp) = payload.get("exp").and_then(|v| v.as_i64())
        && exp < unix_now()
    {
        return Err(CenterError::Unauthorized("session token expired".to_string()));
    }

    let owner = payload
        .get("sub")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|sub| !sub.is_empty())
        .ok_or_else(|| CenterError::Unauthorized("session token missing subject".to_string()))?;

    Ok(Principal {
        owner_id: owner.to_string(),
    })
}

pub(crate) fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Principal, CenterError> {
    let Some(token) = bearer_token(headers) else {
        return Err(CenterError::Unauthorized("missing bearer token".to_string()));
    };

    if token.starts_with(API_KEY_PREFIX) {
        return Ok(Principal {
            owner_id: api_key_owner(token),
        });
    }

    let Some(secret) = &state.session_secret else {
        return Err(CenterError::NotConfigured(
            "APP_SESSION_SECRET is not set; session tokens cannot be verified".to_string(),
        ));
    };
    verify_jwt(secret, token)
}

#[cfg(test)]
pub(crate) fn make_jwt(secret: &str, sub: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload =
        URL_SAFE_NO_PAD.encode(serde_json::json!({ "sub": sub, "exp": exp }).to_string());
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{header}.{payload}.{signature}")
}
