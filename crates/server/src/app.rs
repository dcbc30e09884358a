#![forbid(unsafe_code)]

use axum::Router;
use axum::routing::{get, post};
use ax_nerve::NerveCenter;
use std::sync::Arc;
use tokio::sync::Mutex;

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Clone)]
pub(crate) struct AppState {
    /// The facade mutex: every state-touching request serialises here.
    pub(crate) center: Arc<Mutex<NerveCenter>>,
    pub(crate) session_secret: Option<String>,
    pub(crate) default_project: String,
    pub(crate) plan: String,
    /// Production trims error bodies down to the stable category string.
    pub(crate) production: bool,
}

impl AppState {
    pub(crate) fn new(center: NerveCenter) -> Self {
        Self {
            center: Arc::new(Mutex::new(center)),
            session_secret: env_non_empty("APP_SESSION_SECRET"),
            default_project: env_non_empty("PROJECT_NAME").unwrap_or_else(|| "default".to_string()),
            plan: env_non_empty("AXIS_PLAN").unwrap_or_else(|| "team".to_string()),
            production: std::env::var("AXIS_ENV").as_deref() == Ok("production"),
        }
    }

    pub(crate) fn project_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.default_project)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::AppState;
    use ax_nerve::{CenterConfig, NerveCenter};
    use ax_storage::SqliteStore;
    use axum::http::{HeaderMap, HeaderValue};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    pub(crate) fn test_state() -> AppState {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "ax_server_test_{}_{nonce}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let store = SqliteStore::open(dir.join("shared.db")).expect("open store");
        let config = CenterConfig {
            instructions_dir: dir.join(".axis/instructions"),
            ..CenterConfig::default()
        };
        AppState {
            center: Arc::new(Mutex::new(NerveCenter::new(Box::new(store), config))),
            session_secret: Some("sekret".to_string()),
            default_project: "default".to_string(),
            plan: "team".to_string(),
            production: false,
        }
    }

    pub(crate) fn auth_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer sk_sc_test-key"),
        );
        headers
    }
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/jobs", get(crate::api_jobs::jobs_list).post(crate::api_jobs::jobs_action))
        .route(
            "/v1/locks",
            get(crate::api_locks::locks_list).post(crate::api_locks::locks_action),
        )
        .route("/v1/sessions/sync", post(crate::api_sessions::sessions_sync))
        .route(
            "/v1/sessions/finalize",
            post(crate::api_sessions::sessions_finalize),
        )
        .route("/v1/embed", post(crate::api_search::embed))
        .route("/v1/search", post(crate::api_search::search))
        .route("/v1/verify", get(crate::api_verify::verify))
        .with_state(state)
}
