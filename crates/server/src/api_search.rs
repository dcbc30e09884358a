#![forbid(unsafe_code)]

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::app::AppState;
use crate::auth::authenticate;
use crate::error::{bad_request, fail};

const DEFAULT_SEARCH_COUNT: usize = 8;

#[derive(Deserialize)]
pub(crate) struct EmbedItem {
    content: String,
    #[serde(default)]
    metadata: Option<Value>,
}

#[derive(Deserialize)]
pub(crate) struct EmbedReq {
    items: Vec<EmbedItem>,
    #[serde(rename = "projectName")]
    project_name: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct SearchReq {
    query: Option<String>,
    count: Option<usize>,
    #[serde(rename = "projectName")]
    project_name: Option<String>,
}

pub(crate) async fn embed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<EmbedReq>,
) -> (StatusCode, Json<Value>) {
    let principal = match authenticate(&state, &headers) {
        Ok(principal) => principal,
        Err(err) => return fail(state.production, &err),
    };
    if req.items.is_empty() {
        return bad_request(state.production, "items must not be empty");
    }

    let mut center = state.center.lock().await;
    let project_name = state.project_name(req.project_name.as_deref()).to_string();
    let project_id = match center.resolve_project(&project_name, &principal.owner_id) {
        Ok(id) => id,
        Err(err) => return fail(state.production, &err),
    };

    let items = req
        .items
        .into_iter()
        .map(|item| (item.content, item.metadata.unwrap_or_else(|| json!({}))))
        .collect();
    match center.index_items(&project_id, items) {
        Ok(ids) => (StatusCode::OK, Json(json!({ "results": ids }))),
        Err(err) => fail(state.production, &err),
    }
}

pub(crate) async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SearchReq>,
) -> (StatusCode, Json<Value>) {
    let principal = match authenticate(&state, &headers) {
        Ok(principal) => principal,
        Err(err) => return fail(state.production, &err),
    };
    let Some(query) = req.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
        return bad_request(state.production, "query is required");
    };

    let mut center = state.center.lock().await;
    let project_name = state.project_name(req.project_name.as_deref()).to_string();
    let project_id = match center.resolve_project(&project_name, &principal.owner_id) {
        Ok(id) => id,
        Err(err) => return fail(state.production, &err),
    };

    match center.search(&project_id, query, req.count.unwrap_or(DEFAULT_SEARCH_COUNT)) {
        Ok(hits) => {
            let results: Vec<Value> = hits
                .iter()
                .map(|hit| {
                    json!({
                        "id": hit.id,
                        "content": hit.content,
                        "metadata": hit.metadata,
                        "similarity": hit.similarity,
                    })
                })
                .collect();
            (StatusCode::OK, Json(json!({ "results": results })))
        }
        Err(err) => fail(state.production, &err),
    }
}
