//! ToDo HTTP API（axum）
//!
//! `handler → TodoService → TodoRepository` の三層構成。
//! ストレージは `AppState` に注入する（本番は DynamoDB、ローカル・テストはインメモリ）。

pub mod error;
pub mod handlers;
pub mod request;
pub mod response;

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    handler::Handler,
    http::{Method, Request, Response},
    routing::{self, MethodRouter},
    BoxError, Router,
};
use domain::{TodoRepository, TodoService, TodoServiceImpl};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Span;

pub use error::ApiError;

/// アプリケーションの共有状態
#[derive(Clone)]
pub struct AppState {
    service: Arc<dyn TodoService>,
}

impl AppState {
    pub fn new(service: Arc<dyn TodoService>) -> Self {
        Self { service }
    }

    /// 指定したストレージで `TodoServiceImpl` を組み立てる
    pub fn with_repository<R>(repo: R) -> Self
    where
        R: TodoRepository + 'static,
    {
        Self::new(Arc::new(TodoServiceImpl::new(repo)))
    }
}

/// メソッド・パス・ハンドラの組
struct Route {
    method: Method,
    path: &'static str,
    handler: MethodRouter<AppState>,
}

impl Route {
    fn get<H, T>(path: &'static str, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self {
            method: Method::GET,
            path,
            handler: routing::get(handler),
        }
    }

    fn post<H, T>(path: &'static str, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self {
            method: Method::POST,
            path,
            handler: routing::post(handler),
        }
    }

    fn put<H, T>(path: &'static str, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self {
            method: Method::PUT,
            path,
            handler: routing::put(handler),
        }
    }

    fn delete<H, T>(path: &'static str, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self {
            method: Method::DELETE,
            path,
            handler: routing::delete(handler),
        }
    }
}

/// ルータと起動時ログの両方がこの一覧から作られる
fn route_table() -> Vec<Route> {
    vec![
        Route::get("/", handlers::health),
        Route::get("/todo", handlers::list_todos),
        Route::post("/todo", handlers::create_todo),
        Route::get("/todo/:id", handlers::get_todo),
        Route::put("/todo/:id", handlers::update_todo),
        Route::delete("/todo/:id", handlers::delete_todo),
    ]
}

/// 登録されているルートの一覧（起動時ログ用）
pub fn routes() -> Vec<(Method, &'static str)> {
    route_table()
        .into_iter()
        .map(|route| (route.method, route.path))
        .collect()
}

/// ルータを構築して返す
///
/// `request_timeout` はハンドラ全体（ストレージ呼び出しを含む）の期限。
pub fn app(state: AppState, request_timeout: Duration) -> Router {
    route_table()
        .into_iter()
        // 同じパスのメソッドは axum がまとめる
        .fold(Router::new(), |router, route| {
            router.route(route.path, route.handler)
        })
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                    timeout_error(err, request_timeout)
                }))
                .timeout(request_timeout),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| shared::http_request_span(request))
                .on_response(|response: &Response<Body>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    tracing::info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis() as u64,
                        "request completed"
                    );
                }),
        )
}

/// 期限切れは他の内部エラーと同じ 500 の共通レスポンスにする
fn timeout_error(err: BoxError, request_timeout: Duration) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::Internal(format!("request exceeded deadline of {request_timeout:?}"))
    } else {
        ApiError::Internal(format!("unhandled middleware error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body, http::StatusCode};
    use infrastructure::InMemoryTodoRepository;
    use tower::ServiceExt; // for `oneshot`

    fn test_app() -> Router {
        app(
            AppState::with_repository(InMemoryTodoRepository::new()),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn get_root_reports_healthy() {
        let request = Request::builder()
            .method("GET")
            .uri("/")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["code"], 200);
        assert_eq!(json["message"], "Services run properly");
    }

    #[tokio::test]
    async fn unknown_route_returns_not_found_envelope() {
        let request = Request::builder()
            .method("GET")
            .uri("/todos")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Item not found");
    }

    #[test]
    fn routes_cover_all_operations() {
        let routes = routes();

        assert_eq!(routes.len(), 6);
        assert!(routes.contains(&(Method::PUT, "/todo/:id")));
        assert!(routes.contains(&(Method::DELETE, "/todo/:id")));
    }

    #[test]
    fn elapsed_deadline_is_internal_error() {
        let err: BoxError = Box::new(tower::timeout::error::Elapsed::new());

        let api_error = timeout_error(err, Duration::from_millis(50));

        assert!(matches!(api_error, ApiError::Internal(detail) if detail.contains("deadline")));
    }
}
