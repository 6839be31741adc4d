use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::Config;
use crate::db::Storage;
use crate::handlers::{
    health,
    images::{create_image, list_images},
    microposts::{create_micropost, list_microposts},
};
use crate::upload::UploadStore;

/// Everything a handler needs, injected once at router construction.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(storage: Storage, uploads: UploadStore) -> Self {
        Self { storage, uploads }
    }
}

pub fn app_router(state: AppState, cfg: &Config) -> Router {
    let upload_prefix = format!("/{}", state.uploads.url_prefix().trim_matches('/'));
    let uploaded_files = ServeDir::new(state.uploads.dir());

    let router = Router::new()
        .route("/health", get(health))
        .route("/microposts", post(create_micropost).get(list_microposts))
        .route(
            "/images",
            post(create_image)
                .get(list_images)
                .layer(DefaultBodyLimit::max(cfg.max_upload_bytes)),
        );
    // axum refuses to nest at the root.
    let router = if upload_prefix == "/" {
        router.fallback_service(uploaded_files)
    } else {
        router.nest_service(&upload_prefix, uploaded_files)
    };

    router
        .layer(cors_layer(&cfg.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|e| warn!(origin = %origin, error = %e, "ignoring invalid CORS origin"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}
