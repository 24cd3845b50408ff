pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::{AppConfig, NamingKind};
use crate::services::file_service::FileService;
use crate::services::naming::{CounterNaming, NamingStrategy, TimestampNaming};
use crate::services::notifier::ProgressHub;
use crate::services::storage::LocalStorage;
use crate::services::upload_service::UploadService;
use axum::{
    Router,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::files::list::list_files,
        api::handlers::files::upload::upload_file,
        api::handlers::files::manage::delete_file,
        api::handlers::files::manage::rename_file,
        api::handlers::events::progress_events,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::files::FileEntryResponse,
            api::handlers::files::RenameForm,
            api::handlers::files::UploadForm,
            api::handlers::health::HealthResponse,
            models::ProgressEvent,
            models::StoredFile,
        )
    ),
    modifiers(&SessionCookie),
    tags(
        (name = "files", description = "Upload and file management endpoints"),
        (name = "events", description = "Live upload progress"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

struct SessionCookie;

impl utoipa::Modify for SessionCookie {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                    api::middleware::auth::SESSION_COOKIE,
                ))),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<LocalStorage>,
    pub file_service: Arc<FileService>,
    pub upload_service: Arc<UploadService>,
    pub hub: ProgressHub,
    pub config: AppConfig,
}

impl AppState {
    /// Wires storage, the progress hub and both services from configuration.
    pub fn from_config(config: AppConfig) -> Self {
        let naming: Arc<dyn NamingStrategy> = match config.naming_strategy {
            NamingKind::Timestamp => Arc::new(TimestampNaming),
            NamingKind::Counter => Arc::new(CounterNaming::new()),
        };
        let storage = Arc::new(LocalStorage::new(config.upload_dir.clone(), naming));
        let hub = ProgressHub::new(config.event_buffer);

        let file_service = Arc::new(FileService::new(storage.clone()));
        let upload_service = Arc::new(UploadService::new(
            storage.clone(),
            hub.clone(),
            config.progress_interval(),
        ));

        Self {
            storage,
            file_service,
            upload_service,
            hub,
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    // Add 10MB buffer for multipart overhead
    let upload_limit = state.config.max_file_size + 10 * 1024 * 1024;

    let protected = Router::new()
        .route(
            "/upload",
            post(api::handlers::files::upload_file)
                .layer(axum::extract::DefaultBodyLimit::max(upload_limit)),
        )
        .route("/delete/:filename", post(api::handlers::files::delete_file))
        .route("/rename/:filename", post(api::handlers::files::rename_file))
        .route_layer(from_fn_with_state(
            state.clone(),
            api::middleware::auth::auth_middleware,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(api::handlers::files::list_files))
        .route("/health", get(api::handlers::health::health_check))
        .route("/events", get(api::handlers::events::progress_events))
        .merge(protected)
        .nest_service(
            &state.config.public_path,
            ServeDir::new(state.storage.root()),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
