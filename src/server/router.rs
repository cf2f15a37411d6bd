use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;

use super::api::api_router;
use super::{download, simple, upload};
use crate::config::Settings;
use crate::packages::{Ingestor, PackageStorage};
use crate::stats::DownloadStats;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub settings: Arc<Settings>,
    pub storage: PackageStorage,
    pub ingestor: Ingestor,
    pub stats: DownloadStats,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, settings: Settings) -> Self {
        let storage = PackageStorage::new(&settings.packages.directory);
        let ingestor = Ingestor::new(store.clone(), storage.clone());
        let stats = DownloadStats::new(store.clone(), settings.download_stats.clone());

        Self {
            store,
            settings: Arc::new(settings),
            storage,
            ingestor,
            stats,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.settings.packages.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route(
            "/",
            post(upload::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/simple", get(simple::index))
        .route("/simple/", get(simple::index))
        .route("/simple/{name}", get(simple::package_links))
        .route("/simple/{name}/", get(simple::package_links))
        .route("/packages/{*path}", get(download::download))
        .nest("/api", api_router())
        .layer(ServiceBuilder::new().layer(middleware::from_fn(log_request)))
        .with_state(state)
}
