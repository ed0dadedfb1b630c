//! Actix Web surface exposing the detection pipeline.
//!
//! Three endpoints: `/health` for liveness, `/api/models/info` for class
//! tables, and `/api/detect-weapons` for the detection pipeline itself. The
//! transport stays thin: handlers validate nothing beyond JSON shape and
//! hand straight off to the orchestrator on the blocking pool.

use std::sync::Arc;

use actix_web::{
    App, HttpResponse, HttpServer, http::Method, middleware::DefaultHeaders, web,
};
use anyhow::{Context, Result};
use tracing::info;

use crate::detect::{
    config::ServeConfig,
    data::{DetectRequest, HealthResponse, ModelInfo, ModelsInfoResponse, ModelsLoaded},
    error::DetectError,
    orchestrator,
    registry::{BEST_MODEL, LAST_MODEL, ModelRegistry},
};

/// Shared state backing HTTP handlers.
pub(crate) struct ServerState {
    registry: Arc<ModelRegistry>,
}

/// Run the detection server until the process is stopped.
pub(crate) fn run(config: ServeConfig, registry: Arc<ModelRegistry>) -> Result<()> {
    actix_web::rt::System::new()
        .block_on(async move {
            info!(
                "detection server listening on {}:{} ({})",
                config.host,
                config.port,
                if registry.simulation_mode() {
                    "simulation mode"
                } else {
                    "ai mode"
                }
            );

            HttpServer::new(move || {
                App::new()
                    .app_data(web::Data::new(ServerState {
                        registry: registry.clone(),
                    }))
                    .app_data(json_config())
                    .wrap(cors_headers())
                    .service(
                        web::resource("/health")
                            .route(web::get().to(health_handler))
                            .route(web::method(Method::OPTIONS).to(preflight_handler)),
                    )
                    .service(
                        web::resource("/api/models/info")
                            .route(web::get().to(models_info_handler))
                            .route(web::method(Method::OPTIONS).to(preflight_handler)),
                    )
                    .service(
                        web::resource("/api/detect-weapons")
                            .route(web::post().to(detect_handler))
                            .route(web::method(Method::OPTIONS).to(preflight_handler)),
                    )
            })
            .bind((config.host.as_str(), config.port))?
            .run()
            .await
        })
        .context("detection server failed")
}

/// Request body ceiling. Base64 inflates an image by a third, so this admits
/// source images up to roughly 24 MiB before the extractor rejects the body.
const JSON_PAYLOAD_LIMIT: usize = 32 * 1024 * 1024;

/// JSON extractor tuned for base64 image payloads; parse failures map into
/// the structured error shape instead of actix's default body.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_PAYLOAD_LIMIT)
        .error_handler(|err, _req| {
            DetectError::BadRequest(format!("unparseable request body: {err}")).into()
        })
}

/// The original deployment fronts a browser dashboard, so every response
/// carries permissive CORS headers.
fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add(("Access-Control-Allow-Headers", "Content-Type"))
        .add(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
}

/// Answer CORS preflight with an empty 200 so browsers accept the
/// cross-origin request; the headers come from the middleware.
async fn preflight_handler() -> HttpResponse {
    HttpResponse::Ok().finish()
}

async fn health_handler(state: web::Data<ServerState>) -> HttpResponse {
    let registry = &state.registry;
    HttpResponse::Ok().json(HealthResponse {
        status: if registry.ai_available() {
            "healthy"
        } else {
            "ai_unavailable"
        },
        ai_available: registry.ai_available(),
        models_loaded: ModelsLoaded {
            best_model: registry.is_ready(BEST_MODEL),
            last_model: registry.is_ready(LAST_MODEL),
        },
        mode: registry.simulation_mode().then_some("simulation"),
    })
}

async fn models_info_handler(state: web::Data<ServerState>) -> HttpResponse {
    let registry = &state.registry;
    let (best_loaded, best_classes) = registry.info(BEST_MODEL);
    let (last_loaded, last_classes) = registry.info(LAST_MODEL);
    HttpResponse::Ok().json(ModelsInfoResponse {
        ai_available: registry.ai_available(),
        best_model: ModelInfo {
            loaded: best_loaded,
            classes: best_classes,
        },
        last_model: ModelInfo {
            loaded: last_loaded,
            classes: last_classes,
        },
        mode: registry.simulation_mode().then_some("simulation"),
    })
}

/// `POST /api/detect-weapons`: decode, infer, annotate, respond.
///
/// The pipeline is CPU-bound (image decode plus a model forward pass), so it
/// runs on the blocking pool rather than stalling an executor thread.
async fn detect_handler(
    state: web::Data<ServerState>,
    body: web::Json<DetectRequest>,
) -> Result<HttpResponse, DetectError> {
    let registry = state.registry.clone();
    let request = body.into_inner();

    let response = web::block(move || orchestrator::handle_detect(&registry, request))
        .await
        .map_err(|err| DetectError::Internal(format!("detection worker failed: {err}")))??;

    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    use super::*;

    fn app_state() -> web::Data<ServerState> {
        let mut registry = ModelRegistry::new();
        registry.enable_simulation();
        web::Data::new(ServerState {
            registry: Arc::new(registry),
        })
    }

    #[actix_web::test]
    async fn health_reports_simulation_mode() {
        let app = test::init_service(
            App::new()
                .app_data(app_state())
                .route("/health", web::get().to(health_handler)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "ai_unavailable");
        assert_eq!(body["ai_available"], false);
        assert_eq!(body["models_loaded"]["best_model"], false);
        assert_eq!(body["models_loaded"]["last_model"], false);
        assert_eq!(body["mode"], "simulation");
    }

    #[actix_web::test]
    async fn models_info_lists_empty_class_tables_when_nothing_is_loaded() {
        let app = test::init_service(
            App::new()
                .app_data(app_state())
                .route("/api/models/info", web::get().to(models_info_handler)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/models/info").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["best_model"]["loaded"], false);
        assert!(body["best_model"]["classes"].as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn missing_image_field_yields_a_structured_400() {
        let app = test::init_service(
            App::new()
                .app_data(app_state())
                .app_data(json_config())
                .route("/api/detect-weapons", web::post().to(detect_handler)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/detect-weapons")
            .set_json(json!({ "model": "best" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("image"));
    }

    #[actix_web::test]
    async fn preflight_answers_2xx_with_cors_headers() {
        let app = test::init_service(
            App::new()
                .app_data(app_state())
                .app_data(json_config())
                .wrap(cors_headers())
                .service(
                    web::resource("/api/detect-weapons")
                        .route(web::post().to(detect_handler))
                        .route(web::method(Method::OPTIONS).to(preflight_handler)),
                ),
        )
        .await;

        let req = test::TestRequest::with_uri("/api/detect-weapons")
            .method(Method::OPTIONS)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers();
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
        assert_eq!(
            headers.get("access-control-allow-methods").unwrap(),
            "GET, POST, OPTIONS"
        );
    }

    #[actix_web::test]
    async fn unparseable_body_yields_a_structured_400() {
        let app = test::init_service(
            App::new()
                .app_data(app_state())
                .app_data(json_config())
                .route("/api/detect-weapons", web::post().to(detect_handler)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/detect-weapons")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }
}
