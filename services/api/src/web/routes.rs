//! services/api/src/web/routes.rs
//!
//! Assembles the HTTP router: citizen endpoints, static photo files, Swagger UI
//! and the cross-cutting layers.

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::web::{
    rest::{
        check_file_handler, citizens_by_national_id_handler, create_citizen_handler,
        delete_citizen_handler, get_citizen_handler, list_citizens_handler,
        list_upload_files_handler, search_citizens_handler, test_route_handler,
        update_citizen_handler, visit_history_handler, ApiDoc,
    },
    state::AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Public path prefix of the citizen endpoints.
pub const CITIZEN_BASE_PATH: &str = "/api/citizen";

/// Public path prefix under which stored photos are served.
pub const UPLOADS_PATH: &str = "/uploads";

/// Request body cap; leaves room for a maximum-size photo plus the text fields.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// The citizen endpoints, relative to `CITIZEN_BASE_PATH`.
pub fn citizen_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_citizen_handler).get(list_citizens_handler))
        .route("/search", get(search_citizens_handler))
        .route("/test", get(test_route_handler))
        .route("/test-files", get(list_upload_files_handler))
        .route("/check-file/{filename}", get(check_file_handler))
        .route(
            "/by-national-id/{national_id}",
            get(citizens_by_national_id_handler),
        )
        .route("/visit-history/{national_id}", get(visit_history_handler))
        .route(
            "/{id}",
            get(get_citizen_handler)
                .put(update_citizen_handler)
                .delete(delete_citizen_handler),
        )
}

/// Builds the complete application router.
pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let uploads = ServeDir::new(&app_state.config.uploads_dir);

    let api_router = Router::new()
        .nest(CITIZEN_BASE_PATH, citizen_routes())
        .nest_service(UPLOADS_PATH, uploads)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
