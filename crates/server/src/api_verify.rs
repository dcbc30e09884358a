#![forbid(unsafe_code)]

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::app::AppState;
use crate::auth::authenticate;
use crate::error::fail;

const VALIDITY_WINDOW_DAYS: i64 = 30;

pub(crate) async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let _principal = match authenticate(&state, &headers) {
        Ok(principal) => principal,
        Err(err) => return fail(state.production, &err),
    };

    let valid_until = (OffsetDateTime::now_utc() + time::Duration::days(VALIDITY_WINDOW_DAYS))
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string());
    (
        StatusCode::OK,
        Json(json!({
            "valid": true,
            "plan": state.plan,
            "validUntil": valid_until,
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::{auth_headers, test_state};
    use crate::auth::make_jwt;
    use axum::extract::State;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn api_key_is_accepted() {
        let state = test_state();
        let (status, body) = verify(State(state), auth_headers()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.0["valid"].as_bool(), Some(true));
        assert_eq!(body.0["plan"].as_str(), Some("team"));
        assert!(body.0["validUntil"].as_str().is_some());
    }

    #[tokio::test]
    async fn session_jwt_is_accepted() {
        let state = test_state();
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        let token = make_jwt("sekret", "user-1", now + 600);
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
        );
        let (status, _body) = verify(State(state), headers).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let state = test_state();
        let (status, _body) = verify(State(state), HeaderMap::new()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
