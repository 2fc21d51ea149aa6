use axum::extract::{RawQuery, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::{info, trace};

use super::state::AppState;
use crate::ui::pages::comparison::render_comparison_page;
use crate::ui::pages::dashboard::render_dashboard_page;
use crate::ui::pages::table::render_table_page;
use crate::ui::params::{
    apply_pair_edit, comparison_href, parse_comparison_request, parse_expanded, parse_pair_edit,
    parse_table_request, SearchParams,
};

pub const DASHBOARD_PATH: &str = "/institutions/dashboard";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to(DASHBOARD_PATH) }))
        .route("/health", get(health))
        .route("/institutions/table", get(institutions_table))
        .route(DASHBOARD_PATH, get(institutions_dashboard))
        .route("/comparison/new", get(comparison))
        .route("/cache/revalidate", post(revalidate))
        .with_state(state)
}

fn search_params(query: Option<String>) -> SearchParams {
    SearchParams::parse(query.as_deref().unwrap_or_default())
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "cachedEntries": state.cache.len() }))
}

async fn institutions_table(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Html<String> {
    let request = parse_table_request(&search_params(query));
    trace!(?request, "institutions table");
    let result = state.queries.fetch_page(&request).await;
    Html(render_table_page(request, result))
}

async fn institutions_dashboard(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.dashboard.snapshot().await;
    Html(render_dashboard_page(snapshot))
}

async fn comparison(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let params = search_params(query);
    let request = parse_comparison_request(&params, &state.comparison.field_groups());
    let expanded = parse_expanded(&params);

    if let Some(edit) = parse_pair_edit(&params) {
        let updated = apply_pair_edit(&request, edit);
        return Redirect::to(&comparison_href(&updated, &expanded)).into_response();
    }

    let page = state.comparison.load(&request).await;
    Html(render_comparison_page(page, request, expanded)).into_response()
}

async fn revalidate(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let params = search_params(query);
    let Some(tag) = params.get("tag").filter(|tag| !tag.is_empty()) else {
        return (
            axum::http::StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing tag" })),
        )
            .into_response();
    };
    let removed = state.cache.invalidate_tag(tag);
    info!(tag, removed, "cache revalidated");
    Json(json!({ "tag": tag, "removed": removed })).into_response()
}
