use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router, middleware,
    routing::get,
};
use octofhir_core::ResourceTypeRegistry;
use tower_http::trace::TraceLayer;

use crate::{
    client::{DynFhirClient, HttpFhirClient},
    codec::{DocumentCodec, JsonCodec},
    config::AppConfig,
    handlers,
    middleware as app_middleware,
    ui::{PageCache, TemplateSource},
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub client: DynFhirClient,
    pub registry: Arc<ResourceTypeRegistry>,
    pub codec: Arc<dyn DocumentCodec>,
    pub pages: Arc<PageCache>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let client = HttpFhirClient::new(&config.client)?;
        Self::with_client(config, Arc::new(client))
    }

    /// Build state around an existing client.
    pub fn with_client(config: AppConfig, client: DynFhirClient) -> anyhow::Result<Self> {
        let registry =
            ResourceTypeRegistry::standard().with_extra(&config.fhir.extra_resource_types)?;
        let source = match &config.ui.pages_dir {
            Some(dir) => TemplateSource::Directory(dir.clone()),
            None => TemplateSource::Embedded,
        };

        Ok(Self {
            client,
            registry: Arc::new(registry),
            codec: Arc::new(JsonCodec::default()),
            pages: Arc::new(PageCache::new(source)),
            config: Arc::new(config),
        })
    }

    /// In debug mode, drop cached templates so edits show up on the next render.
    pub fn refresh_pages(&self) {
        if self.config.ui.debug {
            self.pages.invalidate();
        }
    }
}

pub struct OctofhirTester {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    Router::new()
        .route("/", get(handlers::index).post(handlers::submit))
        .route("/healthz", get(handlers::healthz))
        .route("/{name}", get(handlers::resource))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("http.status_code", tracing::field::display(res.status().as_u16()));
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        // Outside the trace layer so the span sees the id
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn build(self) -> anyhow::Result<OctofhirTester> {
        let addr = self.config.addr();
        let state = AppState::from_config(self.config)?;
        Ok(OctofhirTester {
            addr,
            app: build_app(state),
        })
    }
}

impl OctofhirTester {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState::from_config(AppConfig::default()).unwrap();
        build_app(state)
    }

    #[tokio::test]
    async fn test_healthz_and_request_id() {
        let res = app()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_request_id_is_preserved() {
        let res = app()
            .oneshot(
                Request::get("/healthz")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_static_asset_is_served() {
        let res = app()
            .oneshot(Request::get("/PublicTester.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "text/css");
    }

    #[tokio::test]
    async fn test_unknown_page_is_not_found() {
        let res = app()
            .oneshot(Request::get("/missing.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_submission_is_bad_request() {
        let res = app()
            .oneshot(
                Request::post("/")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("method=read&resourceName=Patient"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"No ID specified");
    }

    /// State reading templates from a temp dir, with `result.html` already cached.
    async fn state_with_cached_page(debug: bool, dir: &std::path::Path) -> AppState {
        std::fs::write(dir.join("result.html"), "<pre>{{resultBody}}</pre>").unwrap();
        let mut cfg = AppConfig::default();
        cfg.ui.debug = debug;
        cfg.ui.pages_dir = Some(dir.to_path_buf());
        let state = AppState::from_config(cfg).unwrap();
        assert!(state.pages.get("result.html").await.unwrap().is_some());
        assert_eq!(state.pages.cached_len(), 1);
        state
    }

    fn bogus_submission() -> Request<Body> {
        Request::post("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("method=bogus"))
            .unwrap()
    }

    #[tokio::test]
    async fn test_debug_mode_invalidates_pages_per_request() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_cached_page(true, dir.path()).await;

        let res = build_app(state.clone())
            .oneshot(bogus_submission())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.pages.cached_len(), 0);

        assert!(state.pages.get("result.html").await.unwrap().is_some());
        let res = build_app(state.clone())
            .oneshot(Request::get("/missing.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(state.pages.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_pages_stay_cached_without_debug() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_cached_page(false, dir.path()).await;

        let res = build_app(state.clone())
            .oneshot(bogus_submission())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = build_app(state.clone())
            .oneshot(Request::get("/missing.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(state.pages.cached_len(), 1);
    }

    #[test]
    fn test_invalid_extra_resource_type_fails_state() {
        let mut cfg = AppConfig::default();
        cfg.fhir.extra_resource_types = vec!["not valid".into()];
        assert!(AppState::from_config(cfg).is_err());
    }
}
