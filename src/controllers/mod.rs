use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use crate::types::AppState;

mod bookmarks;
mod docs;
mod extract;
mod healthz;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
            user_id = Empty,
        )
    });

    // Static segments win over `:param` and `*path`. Documents may not live at
    // the paths those routes answer; under `/bookmarks/<x>` they are reached
    // through the bookmark route's GET and PUT.
    Router::new()
        .route("/healthz", get(healthz::healthz))
        .route("/api/docs", get(docs::list_docs).post(docs::create_doc))
        .route("/api/docs/categories", get(docs::list_categories))
        .route("/api/docs/bookmarks", get(bookmarks::list_bookmarks))
        .route("/api/docs/bookmarks/order", put(bookmarks::reorder_bookmarks))
        .route(
            "/api/docs/bookmarks/:document_id",
            post(bookmarks::add_bookmark)
                .delete(bookmarks::remove_bookmark)
                .get(docs::get_doc_under_bookmarks)
                .put(docs::update_doc_under_bookmarks),
        )
        .route(
            "/api/docs/by-id/:id",
            get(docs::get_doc_by_id).put(docs::update_doc_by_id),
        )
        .route(
            "/api/docs/*path",
            get(docs::get_doc_by_path).put(docs::update_doc_by_path),
        )
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(trace)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
