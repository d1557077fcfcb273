use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use serde::Serialize;
use shared::{ApiResponse, ClassifyUrlRequest};
use std::path::PathBuf;
use std::time::Instant;

use crate::classifier::{ClassificationService, ClassifyError, Upload};
use crate::config::AppConfig;
use crate::intake::IntakeError;
use crate::prompt::SCHEMA_VERSION;

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub schema_version: u32,
    pub config: HealthConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthConfig {
    pub model: String,
    pub data_dir: Option<String>,
    pub log_level: String,
    pub max_image_bytes: usize,
}

impl From<&AppConfig> for HealthConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.model.name.clone(),
            data_dir: config
                .storage
                .data_dir
                .as_ref()
                .map(|d| d.display().to_string()),
            log_level: config.log_level.0.clone(),
            max_image_bytes: config.intake.max_image_bytes,
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: PathBuf) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid request body: {}", err);
        let response = HttpResponse::BadRequest().json(ApiResponse::<()>::failure(message));
        actix_web::error::InternalError::from_response(err, response).into()
    });

    cfg.app_data(json_config)
        .service(
            web::scope("/api/v1")
                .route("/classify", web::post().to(classify_upload))
                .route("/classify-url", web::post().to(classify_url))
                .route("/health", web::get().to(health)),
        )
        .service(Files::new("/", frontend_dir).index_file("index.html"));
}

pub fn status_for(err: &ClassifyError) -> StatusCode {
    match err {
        ClassifyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ClassifyError::Intake(IntakeError::UnsupportedFormat(_)) => StatusCode::BAD_REQUEST,
        ClassifyError::Intake(IntakeError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
        ClassifyError::Intake(IntakeError::Fetch(_)) => StatusCode::BAD_GATEWAY,
        ClassifyError::ExternalModel(_) => StatusCode::BAD_GATEWAY,
        ClassifyError::UnparsableResponse(_) => StatusCode::BAD_GATEWAY,
        ClassifyError::ExternalModelTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

fn error_response(err: &ClassifyError) -> HttpResponse {
    error!("{} failure: {}", err.kind(), err);
    HttpResponse::build(status_for(err)).json(ApiResponse::<()>::failure(err.to_string()))
}

async fn read_upload(payload: &mut Multipart, max_bytes: usize) -> Result<Upload, ClassifyError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ClassifyError::InvalidRequest(format!("malformed multipart body: {}", e)))?
    {
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        if field.name() != Some(UPLOAD_FIELD) && file_name.is_none() {
            continue;
        }
        let content_type = field.content_type().map(|m| m.essence_str().to_string());

        let mut image_data = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| {
                ClassifyError::InvalidRequest(format!("failed to read upload: {}", e))
            })?;
            if image_data.len() + data.len() > max_bytes {
                return Err(IntakeError::TooLarge {
                    size: (image_data.len() + data.len()) as u64,
                    limit: max_bytes,
                }
                .into());
            }
            image_data.extend_from_slice(&data);
        }

        if image_data.is_empty() {
            return Err(ClassifyError::InvalidRequest("uploaded file is empty".into()));
        }
        return Ok(Upload {
            file_name,
            content_type,
            data: image_data,
        });
    }
    Err(ClassifyError::InvalidRequest(format!(
        "no '{}' field in upload",
        UPLOAD_FIELD
    )))
}

async fn classify_upload(
    service: web::Data<ClassificationService>,
    mut payload: Multipart,
) -> HttpResponse {
    let started = Instant::now();
    let upload = match read_upload(&mut payload, service.intake().max_image_bytes()).await {
        Ok(upload) => upload,
        Err(e) => return error_response(&e),
    };
    let file_name = upload.file_name.clone().unwrap_or_default();
    info!("Received image classification request: {}", file_name);

    match service.classify_upload(upload).await {
        Ok(result) => {
            info!(
                "Classified image '{}' (total endpoint time: {:.2}s)",
                file_name,
                started.elapsed().as_secs_f64()
            );
            HttpResponse::Ok().json(ApiResponse::ok(result))
        }
        Err(e) => error_response(&e),
    }
}

async fn classify_url(
    service: web::Data<ClassificationService>,
    request: web::Json<ClassifyUrlRequest>,
) -> HttpResponse {
    let started = Instant::now();
    let url = request.into_inner().url;
    info!("Received image URL classification request: {}", url);

    match service.classify_url(&url).await {
        Ok(result) => {
            info!(
                "Classified image URL '{}' (total endpoint time: {:.2}s)",
                url,
                started.elapsed().as_secs_f64()
            );
            HttpResponse::Ok().json(ApiResponse::ok(result))
        }
        Err(e) => error_response(&e),
    }
}

async fn health(config: web::Data<HealthConfig>) -> HttpResponse {
    info!("Health check requested");
    HttpResponse::Ok().json(ApiResponse::ok(HealthStatus {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        schema_version: SCHEMA_VERSION,
        config: config.get_ref().clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::{Reply, StubModel, service};
    use crate::intake::tests::{encoded, http_response, serve_once};
    use actix_web::http::header::CONTENT_TYPE;
    use actix_web::{App, test};
    use image::ImageFormat;
    use serde_json::Value;
    use shared::{ClassificationResult, Rating};

    const BOUNDARY: &str = "X-BRAND-SAFETY-BOUNDARY";

    fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n",
            b = BOUNDARY
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/v1/classify")
            .insert_header((
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
    }

    fn app_parts(reply: Reply) -> (web::Data<ClassificationService>, web::Data<HealthConfig>) {
        (
            web::Data::new(service(StubModel::new(reply), None)),
            web::Data::new(HealthConfig::from(&AppConfig::default())),
        )
    }

    macro_rules! init_app {
        ($reply:expr) => {{
            let (service, health) = app_parts($reply);
            let dir = tempfile::tempdir().unwrap();
            test::init_service(
                App::new()
                    .app_data(service)
                    .app_data(health)
                    .configure(|cfg| configure_routes(cfg, dir.path().to_path_buf())),
            )
            .await
        }};
    }

    const GOOD_REPLY: &str = r#"{
        "AdultContent": {"rating": "low", "confidence": 97, "explanation": "No nudity"},
        "Alcohol": {"rating": "high", "confidence": 88, "explanation": "Beer bottles"}
    }"#;

    #[actix_web::test]
    async fn upload_returns_success_envelope() {
        let app = init_app!(Reply::Text(GOOD_REPLY.into()));
        let body = multipart_body("file", "beer.png", "image/png", &encoded(20, 10, ImageFormat::Png));
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let envelope: ApiResponse<ClassificationResult> = test::read_body_json(resp).await;
        assert!(envelope.success);
        assert!(envelope.error.is_none());
        let result = envelope.data.unwrap();
        assert_eq!(result.judgments.len(), 8);
        assert_eq!(
            result.judgment(shared::Category::Alcohol).unwrap().rating,
            Rating::High
        );
    }

    #[actix_web::test]
    async fn unsupported_upload_is_rejected_with_400() {
        let app = init_app!(Reply::Text(GOOD_REPLY.into()));
        let body = multipart_body("file", "notes.txt", "text/plain", b"just text");
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let envelope: Value = test::read_body_json(resp).await;
        assert_eq!(envelope["success"], false);
        assert!(envelope["data"].is_null());
        assert!(envelope["error"].as_str().unwrap().contains("Unsupported image format"));
    }

    #[actix_web::test]
    async fn missing_file_field_is_invalid_request() {
        let app = init_app!(Reply::Text(GOOD_REPLY.into()));
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
            b = BOUNDARY
        )
        .into_bytes();
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn unparsable_model_reply_is_502_without_data() {
        let app = init_app!(Reply::Text("I cannot help with that.".into()));
        let body = multipart_body("file", "a.png", "image/png", &encoded(8, 8, ImageFormat::Png));
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let envelope: Value = test::read_body_json(resp).await;
        assert_eq!(envelope["success"], false);
        assert!(envelope["data"].is_null());
    }

    #[actix_web::test]
    async fn oversized_upload_is_413() {
        let intake = crate::intake::ImageIntake::new(crate::config::IntakeConfig {
            max_image_bytes: 64,
            ..Default::default()
        })
        .unwrap();
        let service = ClassificationService::new(
            intake,
            StubModel::new(Reply::Text(GOOD_REPLY.into())),
            std::time::Duration::from_secs(1),
            None,
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service))
                .configure(|cfg| configure_routes(cfg, PathBuf::from("/nonexistent"))),
        )
        .await;
        let body = multipart_body("file", "big.png", "image/png", &[0u8; 512]);
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let envelope: Value = test::read_body_json(resp).await;
        assert!(envelope["error"].as_str().unwrap().contains("too large"));
    }

    #[actix_web::test]
    async fn model_timeout_is_504() {
        let app = init_app!(Reply::Hang);
        let body = multipart_body("file", "a.png", "image/png", &encoded(8, 8, ImageFormat::Png));
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[actix_web::test]
    async fn classify_url_rejects_non_http_urls() {
        let app = init_app!(Reply::Text(GOOD_REPLY.into()));
        let req = test::TestRequest::post()
            .uri("/api/v1/classify-url")
            .set_json(ClassifyUrlRequest {
                url: "ftp://example.com/a.png".into(),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let envelope: Value = test::read_body_json(resp).await;
        assert!(envelope["error"].as_str().unwrap().contains("unsupported URL scheme"));
    }

    #[actix_web::test]
    async fn classify_url_round_trip_keeps_the_url_as_reference() {
        let app = init_app!(Reply::Text(GOOD_REPLY.into()));
        let png = encoded(30, 20, ImageFormat::Png);
        let url = serve_once(http_response("200 OK", "image/png", &png));
        let req = test::TestRequest::post()
            .uri("/api/v1/classify-url")
            .set_json(ClassifyUrlRequest { url: url.clone() })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let envelope: ApiResponse<ClassificationResult> = test::read_body_json(resp).await;
        assert!(envelope.success);
        let result = envelope.data.unwrap();
        assert_eq!(result.image_reference, url);
        assert_eq!(result.judgments.len(), 8);
        assert_eq!(
            result.judgment(shared::Category::AdultContent).unwrap().rating,
            Rating::Low
        );
    }

    #[actix_web::test]
    async fn classify_url_with_bad_body_gets_envelope() {
        let app = init_app!(Reply::Text(GOOD_REPLY.into()));
        let req = test::TestRequest::post()
            .uri("/api/v1/classify-url")
            .insert_header((CONTENT_TYPE, "application/json"))
            .set_payload("{\"link\": 1}")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let envelope: Value = test::read_body_json(resp).await;
        assert_eq!(envelope["success"], false);
    }

    #[actix_web::test]
    async fn health_reports_config_without_secrets() {
        let app = init_app!(Reply::Text(GOOD_REPLY.into()));
        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let envelope: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["data"]["status"], "ok");
        assert_eq!(envelope["data"]["config"]["model"], "gpt-4o");
        assert!(envelope["data"]["config"].get("api_key").is_none());
    }

    #[::core::prelude::v1::test]
    fn taxonomy_maps_to_status_codes() {
        let too_large = ClassifyError::Intake(IntakeError::TooLarge { size: 2, limit: 1 });
        assert_eq!(status_for(&too_large), StatusCode::PAYLOAD_TOO_LARGE);
        let timeout = ClassifyError::ExternalModelTimeout(std::time::Duration::from_secs(1));
        assert_eq!(status_for(&timeout), StatusCode::GATEWAY_TIMEOUT);
    }
}
