//! HTTP middleware (CORS, 404 handler)

use axum::extract::Request;
use axum::http::{HeaderValue, Method, header};
use axum::response::IntoResponse;
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::types::ApiError;

/// Allowed browser origins, from the configured frontend URL(s)
#[derive(Debug, Clone)]
pub struct AllowedOrigins {
    origins: Vec<String>,
    any: bool,
}

impl AllowedOrigins {
    /// Parse a comma-separated origin list; `*` allows any origin
    pub fn new(frontend_url: &str) -> Self {
        let origins: Vec<String> = frontend_url
            .split(',')
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        let any = origins.iter().any(|o| o == "*");
        Self { origins, any }
    }

    /// Check if an origin is allowed
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.any || self.origins.iter().any(|o| o == origin)
    }

    fn as_header_values(&self) -> Vec<HeaderValue> {
        self.origins.iter().filter_map(|o| o.parse().ok()).collect()
    }
}

/// Create CORS layer
///
/// Credentials are only allowed for an explicit origin list.
pub fn cors(allowed: &AllowedOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            header::CACHE_CONTROL,
        ]);

    if allowed.any {
        layer.allow_origin(AllowOrigin::any())
    } else {
        layer
            .allow_origin(AllowOrigin::list(allowed.as_header_values()))
            .allow_credentials(true)
    }
}

/// Handle 404 Not Found with logging
pub async fn handle_404(req: Request) -> impl IntoResponse {
    tracing::debug!(method = %req.method(), uri = %req.uri(), "[404] Route not found");
    ApiError::not_found(
        "ROUTE_NOT_FOUND",
        format!("Route {} {} not found", req.method(), req.uri().path()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_allowed_origins_list() {
        let allowed = AllowedOrigins::new("http://localhost:5173/, https://qa.example.com");
        assert!(allowed.is_allowed("http://localhost:5173"));
        assert!(allowed.is_allowed("https://qa.example.com"));
        assert!(!allowed.is_allowed("https://evil.example.com"));
    }

    #[test]
    fn test_allowed_origins_wildcard() {
        let allowed = AllowedOrigins::new("*");
        assert!(allowed.is_allowed("https://anything.example.com"));
    }

    #[tokio::test]
    async fn test_handle_404_returns_json_error() {
        let req = Request::builder()
            .uri("/api/nope")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = handle_404(req).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
