#![forbid(unsafe_code)]

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::app::AppState;
use crate::auth::authenticate;
use crate::error::{bad_request, fail};

#[derive(Deserialize)]
pub(crate) struct SessionsSyncReq {
    title: Option<String>,
    context: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    metadata: Option<Value>,
    #[serde(rename = "projectName")]
    project_name: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct SessionsFinalizeReq {
    #[serde(rename = "projectName")]
    project_name: Option<String>,
    content: Option<String>,
}

pub(crate) async fn sessions_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SessionsSyncReq>,
) -> (StatusCode, Json<Value>) {
    let principal = match authenticate(&state, &headers) {
        Ok(principal) => principal,
        Err(err) => return fail(state.production, &err),
    };
    let Some(title) = req.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
        return bad_request(state.production, "title is required");
    };
    let Some(context) = req.context.as_deref() else {
        return bad_request(state.production, "context is required");
    };

    let mut center = state.center.lock().await;
    let project_name = state.project_name(req.project_name.as_deref()).to_string();
    let project_id = match center.resolve_project(&project_name, &principal.owner_id) {
        Ok(id) => id,
        Err(err) => return fail(state.production, &err),
    };
    match center.sync_session(&project_id, title, context) {
        Ok(session_id) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "sessionId": session_id,
                "projectId": project_id,
            })),
        ),
        Err(err) => fail(state.production, &err),
    }
}

pub(crate) async fn sessions_finalize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SessionsFinalizeReq>,
) -> (StatusCode, Json<Value>) {
    let principal = match authenticate(&state, &headers) {
        Ok(principal) => principal,
        Err(err) => return fail(state.production, &err),
    };

    let mut center = state.center.lock().await;
    let project_name = state.project_name(req.project_name.as_deref()).to_string();
    let project_id = match center.resolve_project(&project_name, &principal.owner_id) {
        Ok(id) => id,
        Err(err) => return fail(state.production, &err),
    };

    // A closing note from the client lands in the notepad before the
    // archive is cut, so it survives in the session record.
    if let Some(content) = req.content.as_deref().map(str::trim).filter(|c| !c.is_empty())
        && let Err(err) = center.update_shared_context(&project_id, "api", content)
    {
        return fail(state.production, &err);
    }

    match center.finalize_session(&project_id) {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({ "success": true, "archivePath": outcome.archive_path })),
        ),
        Err(err) => fail(state.production, &err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::{auth_headers, test_state};
    use axum::extract::State;

    #[tokio::test]
    async fn sync_returns_session_and_project_ids() {
        let state = test_state();
        let (status, body) = sessions_sync(
            State(state),
            auth_headers(),
            Json(SessionsSyncReq {
                title: Some("Planning call".to_string()),
                context: Some("full transcript".to_string()),
                metadata: None,
                project_name: Some("proj".to_string()),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.0["success"].as_bool(), Some(true));
        assert!(body.0["sessionId"].as_str().is_some());
        assert!(body.0["projectId"].as_str().is_some());
    }

    #[tokio::test]
    async fn finalize_reports_archive_path() {
        let state = test_state();
        let (status, body) = sessions_finalize(
            State(state),
            auth_headers(),
            Json(SessionsFinalizeReq {
                project_name: Some("proj".to_string()),
                content: Some("wrap-up notes".to_string()),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.0["success"].as_bool(), Some(true));
        assert!(body.0["archivePath"].as_str().is_some());
    }
}
