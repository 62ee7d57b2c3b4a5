//! HTTP Middleware
//!
//! 请求耗时与 HTTP 状态码错误日志

use std::time::Instant;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// 超过该耗时（毫秒）的成功请求以 info 级别记录
pub const SLOW_REQUEST_MS: u128 = 5_000;

/// HTTP 访问日志中间件
///
/// 4xx/5xx 记录 warn/error，成功但耗时较长的请求（通常是生成请求）记录 info。
/// 业务错误（errno != 0）在 ApiError::into_response() 中记录
pub async fn access_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let latency_ms = started.elapsed().as_millis();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            latency_ms,
            "HTTP server error"
        );
    } else if status == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(method = %method, uri = %uri, latency_ms, "Request body exceeds limit");
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            latency_ms,
            "HTTP client error"
        );
    } else if latency_ms >= SLOW_REQUEST_MS {
        tracing::info!(method = %method, uri = %uri, latency_ms, "Slow request");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::DefaultBodyLimit,
        http::Request as HttpRequest,
        routing::{get, post},
        Router,
    };
    use tower::util::ServiceExt;

    async fn ok_handler() -> &'static str {
        "OK"
    }

    async fn missing_handler() -> StatusCode {
        StatusCode::NOT_FOUND
    }

    async fn echo_handler(body: String) -> String {
        body
    }

    fn create_test_router() -> Router {
        Router::new()
            .route("/api/ping", get(ok_handler))
            .route("/generated/missing.png", get(missing_handler))
            .route("/api/upload", post(echo_handler))
            .layer(DefaultBodyLimit::max(8))
            .layer(axum::middleware::from_fn(access_logging_middleware))
    }

    #[tokio::test]
    async fn test_ok_response_passes_through() {
        let app = create_test_router();
        let request = HttpRequest::builder()
            .uri("/api/ping")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_client_error_passes_through() {
        let app = create_test_router();
        let request = HttpRequest::builder()
            .uri("/generated/missing.png")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let app = create_test_router();
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/api/upload")
            .body(Body::from("0123456789abcdef"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
