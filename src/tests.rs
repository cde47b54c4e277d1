use super::*;
use crate::capabilities::{DomHandle, ElementId};
use crate::chart::ChartKind;
use crate::directory::USERS_ENDPOINT;
use crate::fakes::FakeHttp;
use crate::selection::PRESENCE_WEEKDAY_PREFIX;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use serde_json::json;
use std::time::Duration;
use tower::ServiceExt;

fn state_with(http: Arc<FakeHttp>) -> AppState {
    let page = Arc::new(Page::new());
    AppState {
        directory: Arc::new(UserDirectoryLoader::new(http, page.clone())),
        page,
        title: Arc::from("Presence by weekday"),
    }
}

fn directory_http() -> Arc<FakeHttp> {
    let http = Arc::new(FakeHttp::new());
    http.respond(
        USERS_ENDPOINT,
        json!([{"user_id": 10, "name": "User 10"}, {"user_id": 11, "name": "User 11"}]),
    );
    http
}

async fn get(state: &AppState, uri: &str) -> Response<Body> {
    router(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn wait_for(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

async fn body_text(resp: Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let state = state_with(directory_http());
    let resp = get(&state, "/health").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_index_while_loading() {
    let state = state_with(directory_http());
    let html = body_text(get(&state, "/").await).await;

    assert!(html.contains("<div id=\"loading\">Loading...</div>"));
    assert!(html.contains("http-equiv=\"refresh\""));
    assert!(html.contains("<select id=\"user_id\" name=\"user_id\" onchange=\"this.form.submit()\" hidden>"));
}

#[tokio::test]
async fn test_index_after_directory_load() {
    let state = state_with(directory_http());
    state.directory.load().await.unwrap();

    let html = body_text(get(&state, "/").await).await;

    assert!(html.contains("<option value=\"10\">User 10</option>"));
    assert!(html.contains("<option value=\"11\">User 11</option>"));
    assert!(html.contains("<div id=\"loading\" hidden>"));
}

#[tokio::test]
async fn test_select_known_user_raises_change() {
    let state = state_with(directory_http());
    state.directory.load().await.unwrap();
    let mut changes = state.page.on_change();

    let resp = get(&state, "/select?user_id=11").await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/");
    assert_eq!(changes.recv().await.as_deref(), Some("11"));
    assert_eq!(state.page.selected_value(), "11");
}

#[tokio::test]
async fn test_select_unknown_user_is_not_found() {
    let state = state_with(directory_http());
    state.directory.load().await.unwrap();

    let resp = get(&state, "/select?user_id=99").await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(state.page.selected_value(), "");
}

#[tokio::test]
async fn test_select_placeholder() {
    let state = state_with(directory_http());
    state.directory.load().await.unwrap();
    let mut changes = state.page.on_change();

    let resp = get(&state, "/select").await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(changes.recv().await.as_deref(), Some(""));
}

#[tokio::test]
async fn test_reload_repopulates_directory() {
    let http = Arc::new(FakeHttp::new());
    http.fail(USERS_ENDPOINT, "connection refused");
    let state = state_with(http.clone());
    state.directory.load().await.unwrap_err();
    assert!(state.page.is_visible(ElementId::ErrorBanner));

    http.respond(USERS_ENDPOINT, json!([{"user_id": 1, "name": "Alice"}]));
    let resp = get(&state, "/reload").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    wait_for(|| !state.page.options().is_empty()).await;
    assert!(!state.page.is_visible(ElementId::ErrorBanner));
    assert_eq!(http.calls().len(), 2);
}

#[tokio::test]
async fn test_page_snapshot() {
    let state = state_with(directory_http());
    state.directory.load().await.unwrap();
    state.page.show(ElementId::ChartContainer);

    let body: serde_json::Value =
        serde_json::from_str(&body_text(get(&state, "/api/page").await).await).unwrap();

    assert_eq!(body["loading_visible"], false);
    assert_eq!(body["select_visible"], true);
    assert_eq!(body["chart_visible"], true);
    assert_eq!(body["options"][0], json!({"value": "10", "label": "User 10"}));
    assert_eq!(body["selected"], "");
    assert!(body["notice"].is_null());
}

#[tokio::test]
async fn test_reload_dropping_selected_user_resets_view() {
    let http = directory_http();
    http.respond("/api/v1/presence_weekday/10", json!([["Mon", 1], ["Tue", 2]]));
    let state = state_with(http.clone());
    let renderer = ChartRenderer::new(Arc::new(SvgCharts::new()), ChartKind::Pie);
    let controller = Arc::new(UserSelectionController::new(
        http.clone(),
        state.page.clone(),
        PRESENCE_WEEKDAY_PREFIX,
        renderer.into_callback(),
    ));
    let listener = controller.attach();
    state.directory.load().await.unwrap();

    get(&state, "/select?user_id=10").await;
    wait_for(|| state.page.is_visible(ElementId::ChartContainer)).await;

    http.respond(USERS_ENDPOINT, json!([{"user_id": 11, "name": "User 11"}]));
    let resp = get(&state, "/reload").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    wait_for(|| {
        state.page.options().len() == 1 && !state.page.is_visible(ElementId::ChartContainer)
    })
    .await;

    let body: serde_json::Value =
        serde_json::from_str(&body_text(get(&state, "/api/page").await).await).unwrap();
    assert_eq!(body["selected"], "");
    assert_eq!(body["chart_visible"], false);
    assert_eq!(body["loading_visible"], false);
    assert_eq!(body["options"], json!([{"value": "11", "label": "User 11"}]));
    listener.abort();
}
