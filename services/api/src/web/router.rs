//! services/api/src/web/router.rs
//!
//! Assembles the HTTP router: public and protected routes, body limits, CORS,
//! and the Swagger UI.

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use crate::web::{
    auth::{account_handler, login_handler, register_handler},
    middleware::require_auth,
    notifications::{
        list_consultations_handler, list_notifications_handler, mark_notification_seen_handler,
    },
    rest::{
        analyze_contract_handler, create_contract_handler, delete_contract_handler,
        export_contract_handler, generate_contract_handler, get_contract_handler,
        list_contracts_handler, update_contract_handler, ApiDoc,
    },
    state::AppState,
    upload::{list_uploaded_handler, upload_contract_handler},
};

pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let config = app_state.config.clone();

    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::CorsOrigin {
            origin: config.cors_origin.clone(),
            reason: e.to_string(),
        })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/contracts/generate", post(generate_contract_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/account", get(account_handler))
        .route(
            "/contracts",
            post(create_contract_handler).get(list_contracts_handler),
        )
        .route(
            "/contracts/{id}",
            get(get_contract_handler)
                .put(update_contract_handler)
                .delete(delete_contract_handler),
        )
        .route(
            "/contracts/analyze/{contract_id}",
            get(analyze_contract_handler),
        )
        .route("/contracts/export/{id}/pdf", get(export_contract_handler))
        .route("/upload/contract", post(upload_contract_handler))
        .route("/upload/contracts", get(list_uploaded_handler))
        .route("/consultations", get(list_consultations_handler))
        .route("/notifications", get(list_notifications_handler))
        .route(
            "/notifications/{id}/seen",
            put(mark_notification_seen_handler),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fixture_llm::FixtureAiDelegate;
    use crate::config::Config;
    use contract_core::testing::InMemoryDatabase;

    #[test]
    fn invalid_cors_origin_is_a_startup_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests(dir.path().join("uploads"), dir.path().join("exports"));
        config.cors_origin = "http://bad\norigin".to_string();
        let state = Arc::new(AppState::new(
            Arc::new(config),
            Arc::new(InMemoryDatabase::new()),
            Arc::new(FixtureAiDelegate),
        ));

        match build_router(state) {
            Err(ApiError::CorsOrigin { origin, .. }) => assert_eq!(origin, "http://bad\norigin"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("router built with an invalid origin"),
        }
    }
}
