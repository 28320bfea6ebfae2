//! Configurable CORS headers.

use crate::config::AppConfig;
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tracing::warn;

/// Build the CORS layer from the configured allow lists.
///
/// `*` in an allow list means any value. Browsers reject credentials combined
/// with a wildcard, so credentials are dropped in that case. Unparseable
/// entries are skipped.
pub fn cors_layer(cfg: &AppConfig) -> CorsLayer {
    let wildcard = |list: &[String]| list.iter().any(|v| v == "*");
    let any_origin = wildcard(&cfg.cors_allowed_origins);
    let any_method = wildcard(&cfg.cors_allowed_methods);
    let any_header = wildcard(&cfg.cors_allowed_headers);

    let origins = if any_origin {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(parse_all::<HeaderValue>(&cfg.cors_allowed_origins, "origin"))
    };
    let methods = if any_method {
        AllowMethods::from(Any)
    } else {
        AllowMethods::list(parse_all::<Method>(&cfg.cors_allowed_methods, "method"))
    };
    let headers = if any_header {
        AllowHeaders::from(Any)
    } else {
        AllowHeaders::list(parse_all::<HeaderName>(&cfg.cors_allowed_headers, "header"))
    };

    let mut credentials = cfg.cors_allow_credentials;
    if credentials && (any_origin || any_method || any_header) {
        warn!("CORS credentials cannot be combined with `*`; disabling credentials");
        credentials = false;
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(credentials)
}

fn parse_all<T: std::str::FromStr>(values: &[String], what: &str) -> Vec<T> {
    values
        .iter()
        .filter_map(|v| match v.trim().parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                warn!(value = %v, "ignoring invalid CORS {}", what);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    async fn allow_origin_for(cfg: &AppConfig, origin: &str) -> Option<String> {
        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .layer(cors_layer(cfg));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", origin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        response
            .headers()
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn listed_origin_is_allowed() {
        let cfg = AppConfig {
            cors_allowed_origins: vec!["https://a.example".into()],
            cors_allowed_methods: vec!["GET".into(), "not a method".into()],
            ..AppConfig::default()
        };

        assert_eq!(
            allow_origin_for(&cfg, "https://a.example").await.as_deref(),
            Some("https://a.example")
        );
        assert_eq!(allow_origin_for(&cfg, "https://b.example").await, None);
    }

    #[tokio::test]
    async fn empty_lists_allow_nothing() {
        assert_eq!(
            allow_origin_for(&AppConfig::default(), "https://a.example").await,
            None
        );
    }

    #[tokio::test]
    async fn wildcard_with_credentials_does_not_panic() {
        let cfg = AppConfig {
            cors_allowed_origins: vec!["*".into()],
            cors_allow_credentials: true,
            ..AppConfig::default()
        };

        assert_eq!(
            allow_origin_for(&cfg, "https://any.example").await.as_deref(),
            Some("*")
        );
    }
}
